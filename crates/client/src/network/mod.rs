//! TCP connection to a flapper server.
//!
//! The server greets each connection with its player id as a text line, then
//! streams length-prefixed snapshots. Inputs travel the other way using the
//! same framing.

use protocol::packets::{GameSnapshot, PlayerInput};
use protocol::{ProtocolError, read_frame, read_handshake, write_frame};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unable to connect to server: {0}")]
    Connect(#[source] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A connected player.
pub struct GameClient {
    player_id: u32,
    reader: SnapshotReader,
    writer: InputWriter,
}

impl GameClient {
    /// Connect and wait for the server to assign a player id.
    ///
    /// There is no retry; a refused or dropped connection is returned as is.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        let (read_half, write_half) = stream.into_split();

        // Snapshots may already follow the handshake line, so the same
        // buffered reader must keep reading after it.
        let mut reader = BufReader::new(read_half);
        let player_id = read_handshake(&mut reader).await?;
        debug!("Assigned player id {}", player_id);

        Ok(Self {
            player_id,
            reader: SnapshotReader { reader },
            writer: InputWriter { writer: write_half },
        })
    }

    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    pub async fn send_input(&mut self, input: PlayerInput) -> Result<(), ClientError> {
        self.writer.send(input).await
    }

    pub async fn next_snapshot(&mut self) -> Result<GameSnapshot, ClientError> {
        self.reader.next_snapshot().await
    }

    /// Split into halves that can be driven from separate tasks.
    pub fn into_split(self) -> (SnapshotReader, InputWriter) {
        (self.reader, self.writer)
    }
}

/// Receiving half of a [`GameClient`].
pub struct SnapshotReader {
    reader: BufReader<OwnedReadHalf>,
}

impl SnapshotReader {
    /// Wait for the next decodable snapshot. Malformed payloads are skipped.
    pub async fn next_snapshot(&mut self) -> Result<GameSnapshot, ClientError> {
        loop {
            let payload = read_frame(&mut self.reader).await?;
            match GameSnapshot::decode(&payload) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) if !e.is_fatal() => warn!("Skipping malformed snapshot: {}", e),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Sending half of a [`GameClient`].
pub struct InputWriter {
    writer: OwnedWriteHalf,
}

impl InputWriter {
    pub async fn send(&mut self, input: PlayerInput) -> Result<(), ClientError> {
        let payload = input.encode()?;
        self.send_payload(&payload).await
    }

    /// Frame and send an arbitrary payload.
    pub async fn send_payload(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        write_frame(&mut self.writer, payload).await?;
        Ok(())
    }

    /// Close the sending direction; the server treats this as a disconnect.
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await.map_err(ProtocolError::from)?;
        Ok(())
    }
}
