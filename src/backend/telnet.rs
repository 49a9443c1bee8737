//! Telnet console client (7 Days to Die style).
//!
//! The server greets with a password prompt, answers the password with
//! either a logon confirmation or a rejection, and from then on accepts one
//! command per line. Responses have no terminator, so a response is
//! considered complete once the server has been quiet for a short period.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info};

use super::connect::connect_tcp;
use super::{Backend, BackendError, ConnectionSettings, DynInput, DynOutput, ExecutionResult, TextBackend};
use crate::interactive::COMMAND_QUIT;

pub const DEFAULT_PORT: u16 = 8081;

const PASSWORD_PROMPT: &str = "Please enter password:";
const AUTH_SUCCESS: &str = "Logon successful.";
const AUTH_FAILED: &str = "Password incorrect";
const EXIT_COMMAND: &str = "exit";

/// Silence after which a response is considered complete.
const QUIET_PERIOD: Duration = Duration::from_millis(300);

const READ_CHUNK: usize = 4096;

/// Telnet console backend.
pub struct TelnetBackend {
    settings: ConnectionSettings,
}

impl TelnetBackend {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    async fn open(&self, address: &str, password: &str) -> Result<TcpStream, BackendError> {
        let mut stream = connect_tcp(address, DEFAULT_PORT, &self.settings).await?;

        self.wait_for(&mut stream, &[PASSWORD_PROMPT]).await?;
        stream
            .write_all(format!("{}\r\n", password).as_bytes())
            .await?;

        match self.wait_for(&mut stream, &[AUTH_SUCCESS, AUTH_FAILED]).await? {
            0 => {
                debug!("Telnet logon successful");
                // Discard the welcome banner so it doesn't end up in the first response.
                let (banner, _) = self.collect(&mut stream).await;
                debug!("Discarded {} bytes of banner", banner.len());
                Ok(stream)
            }
            _ => Err(BackendError::AuthFailed),
        }
    }

    /// Read until one of `markers` appears, returning its index.
    async fn wait_for(&self, stream: &mut TcpStream, markers: &[&str]) -> Result<usize, BackendError> {
        let deadline = Instant::now() + self.settings.deadline;
        let mut seen = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = tokio::time::timeout_at(deadline, stream.read(&mut chunk))
                .await
                .map_err(|_| BackendError::Timeout)??;
            if n == 0 {
                return Err(BackendError::Closed);
            }

            seen.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&seen);
            if let Some(index) = markers.iter().position(|marker| text.contains(marker)) {
                return Ok(index);
            }
        }
    }

    /// Collect output until the server goes quiet, closes, or the deadline
    /// passes. A chatty server is cut off at the deadline without error.
    async fn collect(&self, stream: &mut TcpStream) -> (String, Option<BackendError>) {
        let deadline = Instant::now() + self.settings.deadline;
        let mut received = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        let mut failure = None;

        while Instant::now() < deadline {
            let wait = QUIET_PERIOD.min(deadline.saturating_duration_since(Instant::now()));
            match tokio::time::timeout(wait, stream.read(&mut chunk)).await {
                Err(_) | Ok(Ok(0)) => break,
                Ok(Ok(n)) => received.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => {
                    failure = Some(BackendError::Io(e));
                    break;
                }
            }
        }

        (normalize(&received), failure)
    }
}

/// Ask the server to end the session. The connection is dropped right after,
/// so a failed write only gets logged.
async fn send_exit<W: AsyncWrite + Unpin>(writer: &mut W) {
    if let Err(e) = writer
        .write_all(format!("{}\r\n", EXIT_COMMAND).as_bytes())
        .await
    {
        debug!("Failed to send {} to telnet server: {}", EXIT_COMMAND, e);
    }
}

fn normalize(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace("\r\n", "\n").replace('\r', "")
}

#[async_trait]
impl Backend for TelnetBackend {
    async fn execute(&self, address: &str, password: &str, command: &str) -> ExecutionResult {
        let mut stream = match self.open(address, password).await {
            Ok(stream) => stream,
            Err(e) => return ExecutionResult::failed(e),
        };

        if let Err(e) = stream.write_all(format!("{}\r\n", command).as_bytes()).await {
            return ExecutionResult::failed(e.into());
        }

        let (output, failure) = self.collect(&mut stream).await;
        send_exit(&mut stream).await;

        match failure {
            Some(e) => ExecutionResult::partial(output, e),
            None => ExecutionResult::ok(output),
        }
    }

    async fn check_credentials(&self, address: &str, password: &str) -> Result<(), BackendError> {
        let mut stream = self.open(address, password).await?;
        send_exit(&mut stream).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telnet"
    }
}

#[async_trait]
impl TextBackend for TelnetBackend {
    async fn interactive(
        &self,
        input: DynInput<'_>,
        output: DynOutput<'_>,
        address: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let mut lines = input.lines();

        let password = if password.is_empty() {
            output.write_all(b"Enter password: ").await?;
            output.flush().await?;
            lines.next_line().await?.unwrap_or_default().trim().to_string()
        } else {
            password.to_string()
        };

        let stream = self.open(address, &password).await?;
        info!("Telnet session to {} opened", address);

        output
            .write_all(
                format!(
                    "Waiting commands for {} (or type {} to exit)\n> ",
                    address, COMMAND_QUIT
                )
                .as_bytes(),
            )
            .await?;
        output.flush().await?;

        let (mut reader, mut writer) = stream.into_split();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(command) = line? else { break };
                    if command == COMMAND_QUIT {
                        break;
                    }
                    if command.is_empty() {
                        output.write_all(b"> ").await?;
                        output.flush().await?;
                        continue;
                    }
                    writer.write_all(format!("{}\r\n", command).as_bytes()).await?;
                }
                read = reader.read(&mut chunk) => {
                    let n = read?;
                    if n == 0 {
                        info!("Telnet server at {} closed the session", address);
                        return Ok(());
                    }
                    output.write_all(normalize(&chunk[..n]).as_bytes()).await?;
                    output.flush().await?;
                }
            }
        }

        send_exit(&mut writer).await;
        Ok(())
    }
}
