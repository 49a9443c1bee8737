//! Command dispatch.
//!
//! A [`Dispatcher`] owns the protocol backends and the command log. For each
//! command it:
//!
//! 1. Picks the backend for the session's protocol
//! 2. Executes the command remotely
//! 3. Prints a non-empty response trimmed, even when the backend also failed
//! 4. Appends a log record, only when the backend succeeded

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::backend::Backends;
use crate::error::AppError;
use crate::logger::LogSink;
use crate::session::Session;

pub struct Dispatcher {
    backends: Backends,
    log: Box<dyn LogSink>,
}

impl Dispatcher {
    pub fn new(backends: Backends, log: Box<dyn LogSink>) -> Self {
        Self { backends, log }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Run one command and print its response to `out`.
    ///
    /// Backend failures come back as [`AppError::Backend`] after any partial
    /// response has been printed. A command that ran but could not be logged
    /// returns [`AppError::LogWrite`].
    pub async fn execute<W>(&self, out: &mut W, session: &Session, command: &str) -> Result<(), AppError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if command.is_empty() {
            return Err(AppError::command_not_set());
        }

        let backend = self.backends.select(session.protocol_kind());
        debug!("Executing command on {} over {}", session.address, backend.name());

        let result = backend
            .execute(&session.address, &session.password, command)
            .await;

        let output = result.output.trim();
        if !result.output.is_empty() {
            out.write_all(output.as_bytes()).await?;
            out.write_all(b"\n").await?;
            out.flush().await?;
        }

        if let Some(e) = result.failure {
            warn!("Command failed on {}: {}", session.address, e);
            return Err(AppError::Backend(e));
        }

        self.log
            .add_log(session.log.as_deref(), &session.address, command, output)
            .await
            .map_err(AppError::LogWrite)
    }

    /// Authenticate without running a command. WebRCON sessions use the
    /// WebRCON probe, everything else is checked over RCON.
    pub async fn check_credentials(&self, session: &Session) -> Result<(), AppError> {
        let prober = self.backends.prober(session.protocol_kind());
        debug!("Checking credentials for {} over {}", session.address, prober.name());

        prober
            .check_credentials(&session.address, &session.password)
            .await
            .map_err(AppError::Authentication)
    }
}
