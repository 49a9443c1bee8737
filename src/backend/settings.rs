//! Connection settings shared by all protocol backends.
//!
//! Values are resolved with a three-tier priority:
//!
//! 1. **Parameter** - Explicitly provided value, e.g. from `--timeout` (highest priority)
//! 2. **Environment Variable** - Value from environment variable (or `.env`)
//! 3. **Default** - Built-in default value (lowest priority)
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RCON_DIAL_TIMEOUT` | 5s | Connection timeout in seconds |
//! | `RCON_DEADLINE` | 5s | Read deadline for a single response in seconds |
//! | `RCON_MAX_RETRIES` | 0 | Retry attempts for transient connection failures |
//! | `RCON_RETRY_DELAY_MS` | 250ms | Initial retry delay in milliseconds |

use std::env;
use std::time::Duration;

/// Default connection timeout in seconds
pub(crate) const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 5;

/// Default response read deadline in seconds
pub(crate) const DEFAULT_DEADLINE_SECS: u64 = 5;

/// Default maximum retry attempts for a connection
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default retry delay in milliseconds
pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 250;

/// Maximum retry delay cap
pub(crate) const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

pub(crate) const DIAL_TIMEOUT_ENV_VAR: &str = "RCON_DIAL_TIMEOUT";

pub(crate) const DEADLINE_ENV_VAR: &str = "RCON_DEADLINE";

pub(crate) const MAX_RETRIES_ENV_VAR: &str = "RCON_MAX_RETRIES";

pub(crate) const RETRY_DELAY_MS_ENV_VAR: &str = "RCON_RETRY_DELAY_MS";

/// Timeouts and retry policy used when talking to a remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub dial_timeout: Duration,
    pub deadline: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ConnectionSettings {
    /// Resolve all settings. `timeout_secs` overrides both the dial timeout
    /// and the read deadline.
    pub fn resolve(timeout_secs: Option<u64>) -> Self {
        Self {
            dial_timeout: Duration::from_secs(resolve_dial_timeout(timeout_secs)),
            deadline: Duration::from_secs(resolve_deadline(timeout_secs)),
            max_retries: resolve_max_retries(None),
            retry_delay: Duration::from_millis(resolve_retry_delay_ms(None)),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(DEFAULT_DIAL_TIMEOUT_SECS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

/// Resolve the dial timeout with priority: parameter -> env var -> default
pub(crate) fn resolve_dial_timeout(timeout_param: Option<u64>) -> u64 {
    timeout_param
        .or_else(|| env_value(DIAL_TIMEOUT_ENV_VAR))
        .unwrap_or(DEFAULT_DIAL_TIMEOUT_SECS)
}

/// Resolve the read deadline with priority: parameter -> env var -> default
pub(crate) fn resolve_deadline(deadline_param: Option<u64>) -> u64 {
    deadline_param
        .or_else(|| env_value(DEADLINE_ENV_VAR))
        .unwrap_or(DEFAULT_DEADLINE_SECS)
}

/// Resolve the max retries with priority: parameter -> env var -> default
pub(crate) fn resolve_max_retries(max_retries_param: Option<u32>) -> u32 {
    max_retries_param
        .or_else(|| env_value(MAX_RETRIES_ENV_VAR))
        .unwrap_or(DEFAULT_MAX_RETRIES)
}

/// Resolve the retry delay with priority: parameter -> env var -> default
pub(crate) fn resolve_retry_delay_ms(retry_delay_param: Option<u64>) -> u64 {
    retry_delay_param
        .or_else(|| env_value(RETRY_DELAY_MS_ENV_VAR))
        .unwrap_or(DEFAULT_RETRY_DELAY_MS)
}
