//! Error taxonomy for session resolution, dispatch and the interactive loop.
//!
//! Collaborator errors keep their kind when they cross into [`AppError`]:
//! configuration problems stay `Configuration`, remote failures stay
//! `Backend`. Two cases are deliberately separate variants so callers can
//! tell them apart:
//!
//! - `Authentication`: the up-front credential probe of the interactive loop
//!   failed, no command was read.
//! - `LogWrite`: the command executed remotely but recording it failed.

use std::io;

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required connection field is empty. `flag` names the flag that
    /// supplies it.
    #[error("{field} is not set: to set {field} add {flag}")]
    MissingCredential {
        field: &'static str,
        flag: &'static str,
    },

    #[error("{0}")]
    InvalidArgument(&'static str),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("credentials check failed: {0}")]
    Authentication(#[source] BackendError),

    #[error("log error: {0}")]
    LogWrite(#[source] io::Error),

    /// Reading operator input or writing output failed.
    #[error("terminal i/o error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    pub fn missing_address() -> Self {
        AppError::MissingCredential {
            field: "address",
            flag: "-a host:port",
        }
    }

    pub fn missing_password() -> Self {
        AppError::MissingCredential {
            field: "password",
            flag: "-p password",
        }
    }

    pub fn command_not_set() -> Self {
        AppError::InvalidArgument("command is not set")
    }
}
