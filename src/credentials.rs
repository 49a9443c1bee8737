//! Credential resolution.
//!
//! Connection parameters come from two places, resolved with this priority:
//!
//! 1. **Overrides** - Values given on the command line (highest priority)
//! 2. **Profile** - The selected environment in the profile file
//!
//! When the overrides already carry both address and password the profile
//! file is not read at all, so a broken or missing file never gets in the way
//! of a fully specified invocation.

use std::path::PathBuf;

use tracing::debug;

use crate::config::{ConfigSource, DEFAULT_CONFIG_ENV, Profile};
use crate::error::AppError;
use crate::session::{ProtocolKind, Session};

/// Merge `overrides` with the profile named `env` (or `"default"`).
///
/// Fields already set in `overrides` are kept. A missing profile leaves the
/// remaining fields empty.
pub fn resolve(
    overrides: Session,
    source: &dyn ConfigSource,
    env: Option<&str>,
) -> Result<Session, AppError> {
    if overrides.has_credentials() {
        debug!("Address and password supplied, skipping profile file");
        return Ok(overrides);
    }

    let config = source.load()?;
    let env = env.filter(|e| !e.is_empty()).unwrap_or(DEFAULT_CONFIG_ENV);

    match config.profile(env) {
        Some(profile) => {
            debug!("Using profile '{}'", env);
            Ok(fill_from_profile(overrides, profile))
        }
        None => {
            debug!("Profile '{}' not found, using overrides only", env);
            Ok(overrides)
        }
    }
}

fn fill_from_profile(overrides: Session, profile: &Profile) -> Session {
    let address = if overrides.address.is_empty() {
        profile.address.clone()
    } else {
        overrides.address
    };

    let password = if overrides.password.is_empty() {
        profile.password.clone()
    } else {
        overrides.password
    };

    let log = overrides
        .log
        .or_else(|| (!profile.log.is_empty()).then(|| PathBuf::from(&profile.log)));

    let protocol = overrides
        .protocol
        .or_else(|| ProtocolKind::from_name(&profile.protocol));

    Session {
        address,
        password,
        protocol,
        log,
    }
}
