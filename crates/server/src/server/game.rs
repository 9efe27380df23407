//! Game state and main loop.

use crate::config::Config;
use crate::world::{TickReport, World};
use bytes::Bytes;
use protocol::encode_frame;
use protocol::packets::PlayerInput;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use super::client::{Delivery, SessionRegistry};

/// Everything guarded by the single game lock: the sessions and the world.
///
/// Every player in the world has a session and every session has a player;
/// both sides are only ever changed together.
#[derive(Debug)]
pub struct GameState {
    pub config: Config,
    pub tick_count: u64,
    pub sessions: SessionRegistry,
    pub world: World,
}

impl GameState {
    pub fn new(config: Config) -> Self {
        let world = World::new(&config);
        Self::with_world(config, world)
    }

    pub fn with_world(config: Config, world: World) -> Self {
        Self {
            config,
            tick_count: 0,
            sessions: SessionRegistry::new(),
            world,
        }
    }

    /// Register a new session and spawn its player.
    ///
    /// Returns the assigned identity and a receiver that resolves once the
    /// session is removed.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Bytes>,
    ) -> (u32, oneshot::Receiver<()>) {
        let (id, evicted) = self.sessions.register(addr, outbound);
        let player = self.world.add_player(id);
        info!(
            "Player {} connected from {} ({:?})",
            id, addr, player.color
        );
        (id, evicted)
    }

    /// Remove a session and its player. Safe to call more than once.
    pub fn remove_client(&mut self, id: u32) -> bool {
        let session = self.sessions.unregister(id);
        let player = self.world.remove_player(id);
        match (session, player) {
            (Some(client), _) => {
                info!("Player {} ({}) disconnected", id, client.addr);
                true
            }
            (None, Some(_)) => {
                error!("Player {} had no session", id);
                true
            }
            (None, None) => false,
        }
    }

    /// Store the latest input for a player, replacing any not yet consumed.
    ///
    /// Returns false if the player no longer exists.
    pub fn apply_input(&mut self, id: u32, input: PlayerInput) -> bool {
        self.world.set_jumping(id, input.is_jumping)
    }

    pub fn client_count(&self) -> usize {
        self.sessions.len()
    }

    /// Run one simulation step.
    pub fn tick(&mut self) -> TickReport {
        self.tick_count += 1;
        self.world.tick()
    }

    /// Send the current state to every session.
    ///
    /// Sessions whose writer is gone, or that have lagged too long, are
    /// removed after the fan-out. Returns the removed identities.
    pub fn broadcast(&mut self) -> Vec<u32> {
        if self.sessions.is_empty() {
            return Vec::new();
        }

        let frame = match self
            .world
            .snapshot()
            .encode()
            .and_then(|payload| encode_frame(&payload))
        {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode game state: {}", e);
                return Vec::new();
            }
        };
        let max_lagged = self.config.server.max_lagged_ticks;

        let mut evicted = Vec::new();
        for client in self.sessions.iter_mut() {
            match client.deliver(frame.clone()) {
                Delivery::Queued => {}
                Delivery::Dropped => {
                    debug!("Player {} queue full, frame dropped", client.id);
                    if client.lagged_ticks > max_lagged {
                        warn!(
                            "Player {} dropped {} frames in a row, evicting",
                            client.id, client.lagged_ticks
                        );
                        evicted.push(client.id);
                    }
                }
                Delivery::Closed => {
                    evicted.push(client.id);
                }
            }
        }

        for id in &evicted {
            self.remove_client(*id);
        }
        evicted
    }
}

/// Fixed-rate loop: simulate, then broadcast, both under the game lock.
pub async fn run_game_loop(state: Arc<Mutex<GameState>>, tick_interval: Duration) {
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let tick_budget = tick_interval.mul_f64(0.9);

    loop {
        ticker.tick().await;

        let mut game = state.lock().await;
        let tick_start = std::time::Instant::now();
        let report = game.tick();
        let evicted = game.broadcast();
        let elapsed = tick_start.elapsed();

        for id in &report.collided {
            debug!("Player {} collided on tick {}", id, game.tick_count);
        }
        for (id, score) in &report.scored {
            debug!("Player {} scored, now at {}", id, score);
        }
        if !evicted.is_empty() {
            info!("Evicted unreachable players {:?}", evicted);
        }
        if elapsed > tick_budget {
            warn!(
                "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} obstacles",
                game.tick_count,
                elapsed.as_secs_f64() * 1000.0,
                tick_budget.as_secs_f64() * 1000.0,
                game.client_count(),
                game.world.obstacles.len()
            );
        }
    }
}
