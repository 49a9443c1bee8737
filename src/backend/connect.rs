//! TCP connection establishment shared by the backends.
//!
//! ## Retry Strategy
//!
//! Connection attempts use exponential backoff with jitter via the `backon` crate:
//!
//! - **Initial delay**: `ConnectionSettings::retry_delay`
//! - **Maximum delay**: Capped at [`MAX_RETRY_DELAY`]
//! - **Maximum attempts**: `ConnectionSettings::max_retries` extra attempts
//!
//! Only errors classified as transient by [`BackendError::is_retryable`] are
//! retried.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use backon::{ExponentialBuilder, Retryable};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::error::BackendError;
use super::settings::{ConnectionSettings, MAX_RETRY_DELAY};

/// Split an address into host and port.
///
/// Supports `host:port` and a bare `host`, in which case `default_port` is
/// used. `rsplit_once` keeps bracketed IPv6 hosts (`[::1]:27015`) intact.
pub(crate) fn parse_address(address: &str, default_port: u16) -> Result<(String, u16), BackendError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(BackendError::InvalidAddress {
            address: address.to_string(),
            reason: "address is empty".to_string(),
        });
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.ends_with(':') => {
            let port = port.parse::<u16>().map_err(|e| BackendError::InvalidAddress {
                address: address.to_string(),
                reason: format!("invalid port number: {}", e),
            })?;
            Ok((host.to_string(), port))
        }
        // Bare IPv6 address such as "::1"
        Some(_) => Ok((format!("[{}]", address), default_port)),
        None => Ok((address.to_string(), default_port)),
    }
}

/// Run `attempt` until it succeeds, fails permanently, or the retry budget
/// is exhausted.
pub(crate) async fn with_retry<T, F, Fut>(
    address: &str,
    settings: &ConnectionSettings,
    attempt: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let attempt_counter = AtomicU32::new(0);

    let backoff = ExponentialBuilder::default()
        .with_min_delay(settings.retry_delay)
        .with_max_delay(MAX_RETRY_DELAY)
        .with_max_times(settings.max_retries as usize)
        .with_jitter();

    let mut attempt = attempt;
    let result = (|| {
        let current_attempt = attempt_counter.fetch_add(1, Ordering::SeqCst);
        if current_attempt > 0 {
            warn!("Connection retry attempt {} to {}", current_attempt, address);
        }
        attempt()
    })
    .retry(backoff)
    .when(|e: &BackendError| {
        let retryable = e.is_retryable();
        if !retryable {
            debug!("Connection to {} failed with non-retryable error: {}", address, e);
        }
        retryable
    })
    .notify(|err, dur| {
        warn!("Connection to {} failed: {}. Retrying in {:?}", address, err, dur);
    })
    .await;

    let retries = attempt_counter.load(Ordering::SeqCst).saturating_sub(1);
    if result.is_ok() && retries > 0 {
        info!("Connected to {} after {} retry attempt(s)", address, retries);
    }
    result
}

/// Open a TCP connection with the dial timeout and retry policy applied.
pub(crate) async fn connect_tcp(
    address: &str,
    default_port: u16,
    settings: &ConnectionSettings,
) -> Result<TcpStream, BackendError> {
    let (host, port) = parse_address(address, default_port)?;
    let target = format!("{}:{}", host, port);

    with_retry(&target, settings, || dial(&target, settings)).await
}

async fn dial(target: &str, settings: &ConnectionSettings) -> Result<TcpStream, BackendError> {
    debug!("Dialing {}", target);
    let stream = tokio::time::timeout(settings.dial_timeout, TcpStream::connect(target))
        .await
        .map_err(|_| BackendError::DialTimeout {
            address: target.to_string(),
            after: settings.dial_timeout,
        })?
        .map_err(|source| BackendError::Connect {
            address: target.to_string(),
            source,
        })?;

    // Small request/response exchanges, don't wait for Nagle.
    stream.set_nodelay(true)?;
    Ok(stream)
}
