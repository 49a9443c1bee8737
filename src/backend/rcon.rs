//! Source RCON client.
//!
//! Every packet on the wire is
//!
//! ```text
//! i32 LE size | i32 LE id | i32 LE type | body bytes | 0x00 | 0x00
//! ```
//!
//! where `size` counts everything after itself. Authentication sends the
//! password in a `SERVERDATA_AUTH` packet; the server answers with an
//! (often empty) `SERVERDATA_RESPONSE_VALUE` followed by
//! `SERVERDATA_AUTH_RESPONSE` carrying the request id, or `-1` when the
//! password is wrong.
//!
//! Long responses are split by the server into several packets. A body at
//! the split size means more packets follow.

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::debug;

use super::connect::connect_tcp;
use super::{Backend, BackendError, ConnectionSettings, ExecutionResult};

pub const DEFAULT_PORT: u16 = 27015;

pub(crate) const SERVERDATA_AUTH: i32 = 3;
pub(crate) const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub(crate) const SERVERDATA_EXECCOMMAND: i32 = 2;
pub(crate) const SERVERDATA_RESPONSE_VALUE: i32 = 0;

const AUTH_REQUEST_ID: i32 = 42;
const EXEC_REQUEST_ID: i32 = 43;

/// id + type + two terminating nulls
const MIN_PACKET_SIZE: usize = 10;

/// Upper bound for a single packet, well above the 4 KiB servers send.
const MAX_PACKET_SIZE: usize = 64 * 1024;

/// Body length at which servers split a response into another packet.
const RESPONSE_SPLIT_SIZE: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }
}

/// Length-prefixed framing for RCON packets.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = BackendError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, BackendError> {
        if src.len() < 4 {
            return Ok(None);
        }

        let mut size_bytes = [0u8; 4];
        size_bytes.copy_from_slice(&src[..4]);
        let size = i32::from_le_bytes(size_bytes);

        let size = usize::try_from(size)
            .ok()
            .filter(|size| (MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(size))
            .ok_or_else(|| BackendError::Protocol(format!("invalid packet size {}", size)))?;

        if src.len() < 4 + size {
            src.reserve(4 + size - src.len());
            return Ok(None);
        }

        src.advance(4);
        let id = src.get_i32_le();
        let kind = src.get_i32_le();
        let body = src.split_to(size - 8);
        let body = String::from_utf8_lossy(&body)
            .trim_end_matches('\0')
            .to_string();

        Ok(Some(Packet { id, kind, body }))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = BackendError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), BackendError> {
        let size = packet.body.len() + MIN_PACKET_SIZE;
        if size > MAX_PACKET_SIZE {
            return Err(BackendError::Protocol(format!(
                "command too long: {} bytes",
                packet.body.len()
            )));
        }

        dst.reserve(4 + size);
        // size <= MAX_PACKET_SIZE, fits in i32
        dst.put_i32_le(size as i32);
        dst.put_i32_le(packet.id);
        dst.put_i32_le(packet.kind);
        dst.put_slice(packet.body.as_bytes());
        dst.put_u8(0);
        dst.put_u8(0);
        Ok(())
    }
}

type Connection = Framed<TcpStream, PacketCodec>;

/// Source RCON backend.
pub struct RconBackend {
    settings: ConnectionSettings,
}

impl RconBackend {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    async fn open(&self, address: &str, password: &str) -> Result<Connection, BackendError> {
        let stream = connect_tcp(address, DEFAULT_PORT, &self.settings).await?;
        let mut conn = Framed::new(stream, PacketCodec);
        self.authenticate(&mut conn, password).await?;
        Ok(conn)
    }

    async fn next_packet(&self, conn: &mut Connection) -> Result<Packet, BackendError> {
        match tokio::time::timeout(self.settings.deadline, conn.next()).await {
            Err(_) => Err(BackendError::Timeout),
            Ok(None) => Err(BackendError::Closed),
            Ok(Some(packet)) => packet,
        }
    }

    async fn authenticate(&self, conn: &mut Connection, password: &str) -> Result<(), BackendError> {
        conn.send(Packet::new(AUTH_REQUEST_ID, SERVERDATA_AUTH, password))
            .await?;

        loop {
            let packet = self.next_packet(conn).await?;
            match packet.kind {
                SERVERDATA_RESPONSE_VALUE => {
                    debug!("Skipping response value packet during authentication");
                }
                SERVERDATA_AUTH_RESPONSE if packet.id == -1 => {
                    return Err(BackendError::AuthFailed);
                }
                SERVERDATA_AUTH_RESPONSE if packet.id == AUTH_REQUEST_ID => {
                    debug!("RCON authentication succeeded");
                    return Ok(());
                }
                kind => {
                    return Err(BackendError::Protocol(format!(
                        "unexpected packet during authentication (id {}, type {})",
                        packet.id, kind
                    )));
                }
            }
        }
    }

    async fn run_command(&self, conn: &mut Connection, command: &str) -> ExecutionResult {
        if let Err(e) = conn
            .send(Packet::new(EXEC_REQUEST_ID, SERVERDATA_EXECCOMMAND, command))
            .await
        {
            return ExecutionResult::failed(e);
        }

        let mut output = String::new();
        let mut continued = false;

        loop {
            let packet = match self.next_packet(conn).await {
                Ok(packet) => packet,
                // A full-size last packet looks like a split; silence after it ends the response.
                Err(BackendError::Timeout) if continued => return ExecutionResult::ok(output),
                Err(e) if output.is_empty() => return ExecutionResult::failed(e),
                Err(e) => return ExecutionResult::partial(output, e),
            };

            if packet.kind != SERVERDATA_RESPONSE_VALUE || packet.id != EXEC_REQUEST_ID {
                let e = BackendError::Protocol(format!(
                    "unexpected response (id {}, type {})",
                    packet.id, packet.kind
                ));
                return ExecutionResult::partial(output, e);
            }

            let len = packet.body.len();
            output.push_str(&packet.body);
            if len < RESPONSE_SPLIT_SIZE {
                return ExecutionResult::ok(output);
            }

            debug!("Response split at {} bytes, waiting for more", len);
            continued = true;
        }
    }
}

#[async_trait]
impl Backend for RconBackend {
    async fn execute(&self, address: &str, password: &str, command: &str) -> ExecutionResult {
        let mut conn = match self.open(address, password).await {
            Ok(conn) => conn,
            Err(e) => return ExecutionResult::failed(e),
        };

        self.run_command(&mut conn, command).await
    }

    async fn check_credentials(&self, address: &str, password: &str) -> Result<(), BackendError> {
        self.open(address, password).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "rcon"
    }
}
