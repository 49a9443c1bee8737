//! Backend error type and retry classification.
//!
//! Connection attempts are retried only for transient failures. Errors are
//! classified into three groups:
//!
//! 1. **Authentication failures (NOT retryable)**: a wrong password will not
//!    become right by retrying, and repeated attempts can get the client
//!    banned by the server.
//!
//! 2. **Connection errors (retryable)**: refused, reset, timed out,
//!    unreachable networks and similar transient conditions.
//!
//! 3. **Everything else (NOT retryable)**: protocol violations, malformed
//!    addresses and unexpected responses.
//!
//! Authentication takes precedence: an I/O error whose message mentions an
//! authentication failure is never retried even if it also looks like a
//! connection problem.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Message fragments that mark an error as an authentication failure.
const AUTH_ERRORS: &[&str] = &[
    "authentication failed",
    "password incorrect",
    "unauthorized",
    "forbidden",
    "permission denied",
];

/// Message fragments that mark an I/O error as transient.
const RETRYABLE_ERRORS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "timeout",
    "network is unreachable",
    "no route to host",
    "host is down",
    "temporary failure",
    "resource temporarily unavailable",
    "broken pipe",
];

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to {address} timed out after {after:?}")]
    DialTimeout { address: String, after: Duration },

    #[error("timed out waiting for response")]
    Timeout,

    #[error("authentication failed")]
    AuthFailed,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed by remote server")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tungstenite::Error> for BackendError {
    fn from(err: tungstenite::Error) -> Self {
        BackendError::WebSocket(Box::new(err))
    }
}

impl BackendError {
    /// Whether a connection attempt that failed with this error is worth
    /// repeating.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::AuthFailed => false,
            BackendError::DialTimeout { .. } => true,
            BackendError::Connect { source, .. } | BackendError::Io(source) => {
                is_retryable_io(source)
            }
            BackendError::WebSocket(err) => match err.as_ref() {
                tungstenite::Error::Io(source) => is_retryable_io(source),
                _ => false,
            },
            BackendError::InvalidAddress { .. }
            | BackendError::Timeout
            | BackendError::Protocol(_)
            | BackendError::Closed
            | BackendError::Json(_) => false,
        }
    }
}

fn is_retryable_io(err: &io::Error) -> bool {
    let message = err.to_string().to_lowercase();

    // Authentication failures are NOT retryable (checked first for priority)
    if AUTH_ERRORS.iter().any(|pattern| message.contains(pattern)) {
        return false;
    }

    if matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
    ) {
        return true;
    }

    RETRYABLE_ERRORS
        .iter()
        .any(|pattern| message.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error(kind: io::ErrorKind, message: &str) -> io::Error {
        io::Error::new(kind, message.to_string())
    }

    fn connect_error(kind: io::ErrorKind, message: &str) -> BackendError {
        BackendError::Connect {
            address: "127.0.0.1:27015".to_string(),
            source: io_error(kind, message),
        }
    }

    mod auth_errors_not_retryable {
        use super::*;

        #[test]
        fn test_auth_failed() {
            assert!(!BackendError::AuthFailed.is_retryable());
        }

        #[test]
        fn test_auth_message_wins_over_connection_kind() {
            let err = connect_error(
                io::ErrorKind::ConnectionReset,
                "connection reset: authentication failed",
            );
            assert!(!err.is_retryable());
        }

        #[test]
        fn test_password_incorrect_message() {
            let err = BackendError::Io(io_error(io::ErrorKind::Other, "Password incorrect"));
            assert!(!err.is_retryable());
        }
    }

    mod connection_errors_retryable {
        use super::*;

        #[test]
        fn test_connection_refused() {
            let err = connect_error(io::ErrorKind::ConnectionRefused, "refused");
            assert!(err.is_retryable());
        }

        #[test]
        fn test_connection_reset() {
            let err = connect_error(io::ErrorKind::ConnectionReset, "reset");
            assert!(err.is_retryable());
        }

        #[test]
        fn test_dial_timeout() {
            let err = BackendError::DialTimeout {
                address: "127.0.0.1:27015".to_string(),
                after: Duration::from_secs(5),
            };
            assert!(err.is_retryable());
        }

        #[test]
        fn test_network_unreachable_by_message() {
            let err = connect_error(io::ErrorKind::Other, "Network is unreachable (os error 101)");
            assert!(err.is_retryable());
        }

        #[test]
        fn test_no_route_to_host_by_message() {
            let err = connect_error(io::ErrorKind::Other, "No route to host");
            assert!(err.is_retryable());
        }

        #[test]
        fn test_websocket_io_error() {
            let err: BackendError =
                tungstenite::Error::Io(io_error(io::ErrorKind::ConnectionRefused, "refused"))
                    .into();
            assert!(err.is_retryable());
        }
    }

    mod permanent_errors {
        use super::*;

        #[test]
        fn test_invalid_address() {
            let err = BackendError::InvalidAddress {
                address: "host:port".to_string(),
                reason: "invalid port".to_string(),
            };
            assert!(!err.is_retryable());
        }

        #[test]
        fn test_response_timeout_is_not_a_connect_failure() {
            assert!(!BackendError::Timeout.is_retryable());
        }

        #[test]
        fn test_protocol_error() {
            assert!(!BackendError::Protocol("bad packet".to_string()).is_retryable());
        }

        #[test]
        fn test_unknown_io_error() {
            let err = connect_error(io::ErrorKind::Other, "something went wrong");
            assert!(!err.is_retryable());
        }

        #[test]
        fn test_websocket_protocol_error() {
            let err: BackendError = tungstenite::Error::ConnectionClosed.into();
            assert!(!err.is_retryable());
        }
    }
}
