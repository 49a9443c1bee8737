//! Session descriptor and protocol kinds.
//!
//! A [`Session`] is built once per invocation by the credential resolver and
//! is read-only afterwards. The interactive loop may fill in a missing
//! address or password before the first remote call, but it does so by
//! producing a new value rather than mutating the resolved one.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

/// Protocol used to talk to the remote server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    /// Source RCON binary protocol. Used when nothing else is selected.
    #[default]
    Rcon,
    /// Line-oriented Telnet console.
    Telnet,
    /// JSON messages over a WebSocket (WebRCON).
    Web,
}

impl ProtocolKind {
    /// Name of the protocol used when none is configured.
    pub const DEFAULT_NAME: &'static str = "rcon";

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::Rcon => "rcon",
            ProtocolKind::Telnet => "telnet",
            ProtocolKind::Web => "web",
        }
    }

    /// Parse a protocol name coming from a flag or a profile.
    ///
    /// An empty name means "not supplied" and yields `None`. Unknown names
    /// still occupy the field (so they are not overwritten by a profile) but
    /// fall back to the default protocol.
    pub fn from_name(name: &str) -> Option<ProtocolKind> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        match name.parse() {
            Ok(kind) => Some(kind),
            Err(_) => {
                warn!(
                    "Unknown protocol type '{}', falling back to {}",
                    name,
                    Self::DEFAULT_NAME
                );
                Some(ProtocolKind::Rcon)
            }
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a protocol name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported protocol type: {0}")]
pub struct UnknownProtocol(pub String);

impl FromStr for ProtocolKind {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rcon" => Ok(ProtocolKind::Rcon),
            "telnet" => Ok(ProtocolKind::Telnet),
            "web" | "webrcon" | "websocket" => Ok(ProtocolKind::Web),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

/// Resolved connection parameters for one invocation.
///
/// Empty `address`/`password` mean "unresolved"; `protocol: None` selects
/// the default protocol and `log: None` selects the default log file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub address: String,
    pub password: String,
    pub protocol: Option<ProtocolKind>,
    pub log: Option<PathBuf>,
}

impl Session {
    /// The protocol that will actually be used.
    pub fn protocol_kind(&self) -> ProtocolKind {
        self.protocol.unwrap_or_default()
    }

    /// True when both address and password were supplied.
    pub fn has_credentials(&self) -> bool {
        !self.address.is_empty() && !self.password.is_empty()
    }

    pub fn with_address(self, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..self
        }
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            ..self
        }
    }
}

// Keeps the password out of debug output and tracing fields.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "***" },
            )
            .field("protocol", &self.protocol)
            .field("log", &self.log)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod protocol_kind {
        use super::*;

        #[test]
        fn test_parses_known_names() {
            assert_eq!("rcon".parse(), Ok(ProtocolKind::Rcon));
            assert_eq!("telnet".parse(), Ok(ProtocolKind::Telnet));
            assert_eq!("web".parse(), Ok(ProtocolKind::Web));
            assert_eq!("TELNET".parse(), Ok(ProtocolKind::Telnet));
        }

        #[test]
        fn test_unknown_name_is_an_error_for_strict_parse() {
            let result: Result<ProtocolKind, _> = "gopher".parse();
            assert_eq!(result, Err(UnknownProtocol("gopher".to_string())));
        }

        #[test]
        fn test_from_name_empty_is_unset() {
            assert_eq!(ProtocolKind::from_name(""), None);
            assert_eq!(ProtocolKind::from_name("   "), None);
        }

        #[test]
        fn test_from_name_unknown_falls_back_to_default() {
            assert_eq!(ProtocolKind::from_name("gopher"), Some(ProtocolKind::Rcon));
        }

        #[test]
        fn test_display_round_trips_names() {
            for kind in [ProtocolKind::Rcon, ProtocolKind::Telnet, ProtocolKind::Web] {
                assert_eq!(ProtocolKind::from_name(&kind.to_string()), Some(kind));
            }
        }

        #[test]
        fn test_default_is_rcon() {
            assert_eq!(ProtocolKind::default(), ProtocolKind::Rcon);
            assert_eq!(ProtocolKind::DEFAULT_NAME, ProtocolKind::Rcon.as_str());
        }
    }

    mod session {
        use super::*;

        #[test]
        fn test_unset_protocol_uses_default() {
            let session = Session::default();
            assert_eq!(session.protocol_kind(), ProtocolKind::Rcon);
        }

        #[test]
        fn test_has_credentials_requires_both() {
            let session = Session::default().with_address("127.0.0.1:27015");
            assert!(!session.has_credentials());
            assert!(session.with_password("secret").has_credentials());
        }

        #[test]
        fn test_with_address_keeps_other_fields() {
            let session = Session {
                password: "secret".into(),
                protocol: Some(ProtocolKind::Web),
                ..Default::default()
            };
            let filled = session.clone().with_address("10.0.0.1:28016");
            assert_eq!(filled.address, "10.0.0.1:28016");
            assert_eq!(filled.password, session.password);
            assert_eq!(filled.protocol, session.protocol);
        }

        #[test]
        fn test_debug_hides_password() {
            let session = Session::default().with_password("hunter2");
            let debug = format!("{:?}", session);
            assert!(!debug.contains("hunter2"));
            assert!(debug.contains("***"));
        }
    }
}
