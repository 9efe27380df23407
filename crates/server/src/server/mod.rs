//! Game server implementation.
//!
//! One acceptor task admits TCP connections. Each connection gets a reader
//! task that applies inputs and a writer task that drains the session's
//! outbound queue. A single game loop ticks the world and fans out state,
//! all under one shared lock.

use crate::config::{Config, ServerConfig};
use anyhow::Context;
use bytes::Bytes;
use protocol::packets::PlayerInput;
use protocol::{ProtocolError, read_frame, write_handshake};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub mod client;
pub mod game;

pub use client::{Client, Delivery, SessionRegistry};
pub use game::{GameState, run_game_loop};

/// Handle to the lock-guarded game state.
pub type SharedState = Arc<Mutex<GameState>>;

/// A bound, not yet running, game server.
pub struct Server {
    listener: TcpListener,
    state: SharedState,
    config: ServerConfig,
}

impl Server {
    /// Validate the configuration and bind the listening socket.
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        let server_config = config.server.clone();
        Ok(Self {
            listener,
            state: Arc::new(Mutex::new(GameState::new(config))),
            config: server_config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Start the game loop and accept connections until the task is dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Listening on tcp://{}", self.local_addr()?);

        let game_loop_state = Arc::clone(&self.state);
        let tick_interval = self.config.tick_interval();
        let _game_loop = AbortOnDrop(tokio::spawn(async move {
            run_game_loop(game_loop_state, tick_interval).await;
        }));

        let config = Arc::new(self.config);
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let state = Arc::clone(&self.state);
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                handle_connection(stream, addr, state, &config).await;
            });
        }
    }
}

/// Aborts the wrapped task when dropped, so the game loop stops with `run`.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    Server::bind(config).await?.run().await
}

/// Admit one connection and serve it until either direction fails.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: SharedState,
    config: &ServerConfig,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay failed for {}: {}", addr, e);
    }
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(config.outbound_queue);

    // Admission and registration happen under one lock so the cap holds.
    let (client_id, evicted) = {
        let mut game = state.lock().await;
        if game.client_count() >= config.max_connections {
            warn!("Connection rejected (limit reached): {}", addr);
            return;
        }
        game.add_client(addr, outbound_tx)
    };

    tokio::spawn(write_loop(
        client_id,
        write_half,
        outbound_rx,
        Arc::clone(&state),
        config.write_timeout(),
    ));

    read_loop(client_id, read_half, &state, evicted).await;

    state.lock().await.remove_client(client_id);
}

/// Apply inbound input frames to the player's pending-input slot.
async fn read_loop<R>(
    client_id: u32,
    read_half: R,
    state: &SharedState,
    mut evicted: oneshot::Receiver<()>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(read_half);
    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader) => frame,
            _ = &mut evicted => {
                debug!("Player {} session removed, stopping reader", client_id);
                return;
            }
        };

        match frame {
            Ok(payload) => match PlayerInput::decode(&payload) {
                Ok(input) => {
                    let mut game = state.lock().await;
                    if !game.apply_input(client_id, input) {
                        return;
                    }
                }
                Err(e) => warn!("Dropping malformed input from player {}: {}", client_id, e),
            },
            Err(ProtocolError::Disconnected) => {
                debug!("Player {} closed the connection", client_id);
                return;
            }
            Err(e) => {
                warn!("Read error from player {}: {}", client_id, e);
                return;
            }
        }
    }
}

/// Send the handshake, then every queued frame, each write bounded by `write_timeout`.
async fn write_loop<W>(
    client_id: u32,
    mut writer: W,
    mut outbound: mpsc::Receiver<Bytes>,
    state: SharedState,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    let result: anyhow::Result<()> = async {
        timeout(write_timeout, write_handshake(&mut writer, client_id)).await??;
        while let Some(frame) = outbound.recv().await {
            timeout(write_timeout, writer.write_all(&frame)).await??;
        }
        Ok(())
    }
    .await;

    match result {
        // Queue closed: the session was already removed.
        Ok(()) => {
            let _ = writer.shutdown().await;
        }
        Err(e) => {
            warn!("Write to player {} failed: {}", client_id, e);
            state.lock().await.remove_client(client_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;
    use tokio::io::{AsyncReadExt, duplex};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn shared_state() -> SharedState {
        let config = Config::default();
        let world = World::with_seed(&config, 3);
        Arc::new(Mutex::new(GameState::with_world(config, world)))
    }

    #[tokio::test]
    async fn test_write_loop_sends_handshake_then_frames() {
        let state = shared_state();
        let (tx, rx) = mpsc::channel(4);
        let (id, _evicted) = state.lock().await.add_client(test_addr(), tx.clone());
        let (server_side, mut peer) = duplex(256);

        tx.try_send(Bytes::from_static(b"frame")).unwrap();
        drop(tx);
        // Ends once the session, holding the last sender, is removed.
        let writer = tokio::spawn(write_loop(
            id,
            server_side,
            rx,
            Arc::clone(&state),
            Duration::from_secs(1),
        ));

        let mut buf = [0u8; 7];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"1\nframe");

        state.lock().await.remove_client(id);
        timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stalled_write_tears_session_down() {
        let state = shared_state();
        let (tx, rx) = mpsc::channel(4);
        let (id, mut evicted) = state.lock().await.add_client(test_addr(), tx.clone());
        // The peer never reads, so a frame bigger than the pipe never drains.
        let (server_side, _peer) = duplex(16);

        tx.try_send(Bytes::from(vec![0u8; 64])).unwrap();
        timeout(
            Duration::from_secs(2),
            write_loop(id, server_side, rx, Arc::clone(&state), Duration::from_millis(50)),
        )
        .await
        .unwrap();

        let game = state.lock().await;
        assert!(!game.sessions.contains(id));
        assert!(game.world.players.is_empty());
        assert!(matches!(
            evicted.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_eviction_stops_blocked_reader() {
        let state = shared_state();
        let (tx, _rx) = mpsc::channel(4);
        let (id, evicted) = state.lock().await.add_client(test_addr(), tx);
        // The peer stays open and silent, so the reader blocks on the header.
        let (server_side, _peer) = duplex(64);

        let reader_state = Arc::clone(&state);
        let reader = tokio::spawn(async move {
            read_loop(id, server_side, &reader_state, evicted).await;
        });
        tokio::task::yield_now().await;
        assert!(!reader.is_finished());

        state.lock().await.remove_client(id);
        timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_read_loop_applies_input_and_skips_garbage() {
        let state = shared_state();
        let (tx, _rx) = mpsc::channel(4);
        let (id, evicted) = state.lock().await.add_client(test_addr(), tx);
        let (server_side, mut peer) = duplex(256);

        let reader_state = Arc::clone(&state);
        let reader = tokio::spawn(async move {
            read_loop(id, server_side, &reader_state, evicted).await;
        });

        protocol::write_frame(&mut peer, b"nonsense").await.unwrap();
        protocol::write_frame(&mut peer, br#"{"is_jumping":true}"#)
            .await
            .unwrap();
        drop(peer);

        // EOF ends the loop after both frames are handled.
        timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
        assert!(state.lock().await.world.players[&id].is_jumping);
    }

    #[tokio::test]
    async fn test_game_loop_stops_with_server() {
        let mut config = Config::default();
        config.server.bind = "127.0.0.1".to_string();
        config.server.port = 0;
        let server = Server::bind(config).await.unwrap();
        let state = server.state();

        let handle = tokio::spawn(server.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(state.lock().await.tick_count > 0);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stopped_at = state.lock().await.tick_count;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(state.lock().await.tick_count, stopped_at);
        assert_eq!(Arc::strong_count(&state), 1);
    }
}
