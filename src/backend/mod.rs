//! Protocol backends.
//!
//! Each supported wire protocol implements [`Backend`]. The dispatcher never
//! looks inside a backend: it hands over address, password and command and
//! gets text back. The line-oriented Telnet console additionally owns its own
//! interactive mode through [`TextBackend`].
//!
//! - `rcon`: Source RCON binary protocol (default)
//! - `telnet`: Telnet line protocol
//! - `web`: WebRCON, JSON messages over a WebSocket
//! - `connect`: TCP dialing with retry shared by the TCP backends
//! - `settings`: Timeouts and retry policy
//! - `error`: Error type and retry classification

mod connect;
mod error;
pub mod rcon;
mod settings;
pub mod telnet;
pub mod web;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::session::ProtocolKind;

pub use error::BackendError;
pub use rcon::RconBackend;
pub use settings::ConnectionSettings;
pub use telnet::TelnetBackend;
pub use web::WebBackend;

/// Operator input handed to a backend's own interactive mode.
pub type DynInput<'a> = &'a mut (dyn AsyncBufRead + Unpin + Send);

/// Terminal output handed to a backend's own interactive mode.
pub type DynOutput<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Outcome of one remote command.
///
/// A backend may return text together with a failure, e.g. the first
/// packets of a split response before the deadline expired. The text is
/// still shown to the operator.
#[derive(Debug)]
pub struct ExecutionResult {
    pub output: String,
    pub failure: Option<BackendError>,
}

impl ExecutionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            failure: None,
        }
    }

    pub fn failed(error: BackendError) -> Self {
        Self {
            output: String::new(),
            failure: Some(error),
        }
    }

    pub fn partial(output: impl Into<String>, error: BackendError) -> Self {
        Self {
            output: output.into(),
            failure: Some(error),
        }
    }
}

impl From<Result<String, BackendError>> for ExecutionResult {
    fn from(result: Result<String, BackendError>) -> Self {
        match result {
            Ok(output) => ExecutionResult::ok(output),
            Err(e) => ExecutionResult::failed(e),
        }
    }
}

/// A client for one wire protocol.
///
/// Implementations must be thread-safe (`Send + Sync`). Every call is a
/// complete exchange: connect, authenticate, do the work, disconnect.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute `command` on the server at `address`.
    async fn execute(&self, address: &str, password: &str, command: &str) -> ExecutionResult;

    /// Authenticate without executing anything.
    async fn check_credentials(&self, address: &str, password: &str) -> Result<(), BackendError>;

    /// Name of the protocol, used for logging.
    fn name(&self) -> &'static str;
}

/// A line protocol that drives its own interactive session, including any
/// credential negotiation.
#[async_trait]
pub trait TextBackend: Backend {
    async fn interactive(
        &self,
        input: DynInput<'_>,
        output: DynOutput<'_>,
        address: &str,
        password: &str,
    ) -> Result<(), BackendError>;
}

/// The closed set of backends, one per [`ProtocolKind`].
pub struct Backends {
    pub rcon: Box<dyn Backend>,
    pub telnet: Box<dyn TextBackend>,
    pub web: Box<dyn Backend>,
}

impl Backends {
    /// Network backends sharing one set of connection settings.
    pub fn network(settings: ConnectionSettings) -> Self {
        Self {
            rcon: Box::new(RconBackend::new(settings)),
            telnet: Box::new(TelnetBackend::new(settings)),
            web: Box::new(WebBackend::new(settings)),
        }
    }

    /// Backend that executes commands for `kind`.
    pub fn select(&self, kind: ProtocolKind) -> &dyn Backend {
        match kind {
            ProtocolKind::Telnet => self.telnet.as_ref(),
            ProtocolKind::Web => self.web.as_ref(),
            ProtocolKind::Rcon => self.rcon.as_ref(),
        }
    }

    /// Backend that validates credentials for `kind`. Only WebRCON has its
    /// own probe, everything else is checked over RCON.
    pub fn prober(&self, kind: ProtocolKind) -> &dyn Backend {
        match kind {
            ProtocolKind::Web => self.web.as_ref(),
            ProtocolKind::Rcon | ProtocolKind::Telnet => self.rcon.as_ref(),
        }
    }
}
