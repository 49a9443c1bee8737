//! Remote console client for game and application servers.
//!
//! The crate is organized into the following modules:
//!
//! - `cli`: Command-line flags
//! - `session`: Resolved connection parameters and protocol kinds
//! - `config`: Profile file loading (the fallback configuration source)
//! - `credentials`: Merging command-line overrides with profile values
//! - `backend`: Protocol backends (RCON, Telnet, WebRCON) behind a common trait
//! - `executor`: One-shot command execution and credential validation
//! - `interactive`: The interactive read loop
//! - `logger`: Append-only command log
//! - `error`: Error taxonomy shared by the modules above

pub mod backend;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod interactive;
pub mod logger;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::AppError;
pub use executor::Dispatcher;
pub use session::{ProtocolKind, Session};
