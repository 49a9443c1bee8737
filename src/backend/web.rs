//! WebRCON client (JSON messages over a WebSocket).
//!
//! The password is part of the URL path (`ws://host:port/<password>`); a
//! server rejects a wrong password during the handshake. Requests carry an
//! identifier that the server echoes in its reply. Messages with any other
//! identifier are unsolicited broadcasts (chat, console log) and are skipped.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::connect::{parse_address, with_retry};
use super::{Backend, BackendError, ConnectionSettings, ExecutionResult};

pub const DEFAULT_PORT: u16 = 28016;

const REQUEST_ID: i32 = 42;
const CLIENT_NAME: &str = "WebRcon";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Request<'a> {
    identifier: i32,
    message: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reply {
    #[serde(default)]
    message: String,
    identifier: i32,
    #[serde(default, rename = "Type")]
    kind: String,
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebRCON backend.
pub struct WebBackend {
    settings: ConnectionSettings,
}

impl WebBackend {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    async fn open(&self, address: &str, password: &str) -> Result<Socket, BackendError> {
        let (host, port) = parse_address(address, DEFAULT_PORT)?;
        let target = format!("{}:{}", host, port);
        let url = format!("ws://{}/{}", target, encode_path_segment(password));

        with_retry(&target, &self.settings, || self.dial(&target, &url)).await
    }

    async fn dial(&self, target: &str, url: &str) -> Result<Socket, BackendError> {
        debug!("Opening WebSocket to {}", target);
        let (socket, _) = tokio::time::timeout(self.settings.dial_timeout, connect_async(url))
            .await
            .map_err(|_| BackendError::DialTimeout {
                address: target.to_string(),
                after: self.settings.dial_timeout,
            })?
            .map_err(|e| handshake_error(target, e))?;
        Ok(socket)
    }

    async fn request(&self, socket: &mut Socket, command: &str) -> Result<String, BackendError> {
        let request = serde_json::to_string(&Request {
            identifier: REQUEST_ID,
            message: command,
            name: CLIENT_NAME,
        })?;
        socket.send(Message::Text(request)).await?;

        let deadline = Instant::now() + self.settings.deadline;
        loop {
            let message = tokio::time::timeout_at(deadline, socket.next())
                .await
                .map_err(|_| BackendError::Timeout)?
                .ok_or(BackendError::Closed)??;

            match message {
                Message::Text(text) => {
                    let reply: Reply = serde_json::from_str(&text)?;
                    if reply.identifier == REQUEST_ID {
                        return Ok(reply.message);
                    }
                    debug!(
                        "Skipping {} message with identifier {}",
                        reply.kind, reply.identifier
                    );
                }
                Message::Close(_) => return Err(BackendError::Closed),
                _ => {}
            }
        }
    }
}

fn handshake_error(target: &str, err: tungstenite::Error) -> BackendError {
    match err {
        tungstenite::Error::Http(response)
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            BackendError::AuthFailed
        }
        tungstenite::Error::Io(source) => BackendError::Connect {
            address: target.to_string(),
            source,
        },
        other => other.into(),
    }
}

/// Everything outside the URL unreserved set (RFC 3986 section 2.3).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

#[async_trait]
impl Backend for WebBackend {
    async fn execute(&self, address: &str, password: &str, command: &str) -> ExecutionResult {
        let mut socket = match self.open(address, password).await {
            Ok(socket) => socket,
            Err(e) => return ExecutionResult::failed(e),
        };

        let result = self.request(&mut socket, command).await;
        let _ = socket.close(None).await;
        result.into()
    }

    async fn check_credentials(&self, address: &str, password: &str) -> Result<(), BackendError> {
        let mut socket = self.open(address, password).await?;
        let _ = socket.close(None).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "web"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request as HsRequest, Response as HsResponse};

    fn test_settings() -> ConnectionSettings {
        ConnectionSettings {
            dial_timeout: Duration::from_secs(2),
            deadline: Duration::from_secs(2),
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        }
    }

    /// Accept one WebSocket, reject wrong passwords, answer one request
    /// after an unrelated broadcast.
    async fn spawn_server(password: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let check = move |request: &HsRequest, response: HsResponse| -> Result<HsResponse, ErrorResponse> {
                if request.uri().path() == format!("/{}", password) {
                    Ok(response)
                } else {
                    let mut rejection = ErrorResponse::new(None);
                    *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                    Err(rejection)
                }
            };
            let Ok(mut socket) = tokio_tungstenite::accept_hdr_async(stream, check).await else {
                return;
            };

            if let Some(Ok(Message::Text(text))) = socket.next().await {
                let request: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(request["Name"], "WebRcon");
                let broadcast = r#"{"Message":"[CHAT] hello","Identifier":0,"Type":"Chat"}"#;
                socket.send(Message::Text(broadcast.to_string())).await.unwrap();
                let reply = serde_json::json!({
                    "Message": format!("ran {}", request["Message"].as_str().unwrap()),
                    "Identifier": request["Identifier"],
                    "Type": "Generic",
                    "Stacktrace": "",
                });
                socket.send(Message::Text(reply.to_string())).await.unwrap();
            }
        });

        address
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("abc-1.2_~"), "abc-1.2_~");
        assert_eq!(encode_path_segment("p@ss w/rd"), "p%40ss%20w%2Frd");
        assert_eq!(encode_path_segment("pässwörd"), "p%C3%A4ssw%C3%B6rd");
    }

    #[test]
    fn test_reply_parses_with_missing_fields() {
        let reply: Reply = serde_json::from_str(r#"{"Identifier":5}"#).unwrap();
        assert_eq!(reply.identifier, 5);
        assert!(reply.message.is_empty());
    }

    #[test]
    fn test_request_serializes_pascal_case() {
        let json = serde_json::to_value(Request {
            identifier: 42,
            message: "status",
            name: CLIENT_NAME,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"Identifier": 42, "Message": "status", "Name": "WebRcon"}));
    }

    #[tokio::test]
    async fn test_execute_skips_broadcasts() {
        let address = spawn_server("secret").await;
        let backend = WebBackend::new(test_settings());

        let result = backend.execute(&address, "secret", "status").await;
        assert!(result.failure.is_none(), "{:?}", result.failure);
        assert_eq!(result.output, "ran status");
    }

    #[tokio::test]
    async fn test_rejected_handshake_is_auth_failure() {
        let address = spawn_server("secret").await;
        let backend = WebBackend::new(test_settings());

        let err = backend.check_credentials(&address, "wrong").await.unwrap_err();
        assert!(matches!(err, BackendError::AuthFailed), "{:?}", err);
    }

    #[tokio::test]
    async fn test_check_credentials_succeeds() {
        let address = spawn_server("secret").await;
        let backend = WebBackend::new(test_settings());

        assert!(backend.check_credentials(&address, "secret").await.is_ok());
    }
}
