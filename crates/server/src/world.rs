//! World state and simulation.
//!
//! The world holds every obstacle and player and advances them one fixed tick
//! at a time. It knows nothing about sockets; the server drives it under the
//! shared game lock.

use crate::collision::Rect;
use crate::config::{Config, ObstacleConfig, PlayerConfig, WorldConfig};
use crate::entity::{Obstacle, Player};
use glam::Vec2;
use protocol::packets::GameSnapshot;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// What happened to players during one tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// Players reset by a collision.
    pub collided: Vec<u32>,
    /// (player, new score) for every point awarded.
    pub scored: Vec<(u32, u32)>,
}

/// Constants the simulation reads every tick.
#[derive(Debug, Clone)]
struct Physics {
    world: WorldConfig,
    player: PlayerConfig,
    obstacle: ObstacleConfig,
    /// Seconds per tick.
    dt: f32,
}

/// The authoritative game world.
#[derive(Debug)]
pub struct World {
    physics: Physics,
    /// Oldest first; the newest obstacle is always last.
    pub obstacles: Vec<Obstacle>,
    /// Players by identity. Ordered so ticks process players by ascending id.
    pub players: BTreeMap<u32, Player>,
    rng: StdRng,
}

impl World {
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// World with a fixed random seed, for reproducible obstacle gaps.
    pub fn with_seed(config: &Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, rng: StdRng) -> Self {
        Self {
            physics: Physics {
                world: config.world.clone(),
                player: config.player.clone(),
                obstacle: config.obstacle.clone(),
                dt: config.server.tick_seconds(),
            },
            obstacles: Vec::new(),
            players: BTreeMap::new(),
            rng,
        }
    }

    pub fn spawn_point(&self) -> Vec2 {
        Vec2::new(self.physics.player.spawn_x, self.physics.player.spawn_y)
    }

    /// Insert a fresh player at spawn. An existing entry with the same id is replaced.
    pub fn add_player(&mut self, id: u32) -> &Player {
        let player = Player::new(id, self.spawn_point());
        self.players.insert(id, player);
        &self.players[&id]
    }

    pub fn remove_player(&mut self, id: u32) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Overwrite a player's pending lift request. Returns false if the player is gone.
    pub fn set_jumping(&mut self, id: u32, is_jumping: bool) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.is_jumping = is_jumping;
                true
            }
            None => false,
        }
    }

    /// The box below the playable area.
    pub fn floor_box(&self) -> Rect {
        let world = &self.physics.world;
        Rect::new(
            Vec2::new(0.0, world.floor_y),
            Vec2::new(world.width, world.height),
        )
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickReport {
        self.advance_obstacles();
        self.spawn_obstacles();

        let mut report = TickReport::default();
        let floor = self.floor_box();
        let physics = &self.physics;
        let obstacles = &mut self.obstacles;

        for player in self.players.values_mut() {
            step_player(player, physics);

            if player.is_vulnerable() && collides(player, obstacles, floor, physics) {
                player.reset(
                    Vec2::new(physics.player.spawn_x, physics.player.spawn_y),
                    physics.player.collision_cooldown,
                );
                report.collided.push(player.id);
                continue;
            }

            for obstacle in obstacles.iter_mut() {
                if !obstacle.passed && obstacle.position.x < player.position.x {
                    obstacle.passed = true;
                    player.award_point();
                    report.scored.push((player.id, player.current_score));
                }
            }
        }

        report
    }

    fn advance_obstacles(&mut self) {
        let speed = self.physics.obstacle.speed;
        let despawn_x = self.physics.obstacle.despawn_x;
        for obstacle in &mut self.obstacles {
            obstacle.position.x -= speed;
        }
        self.obstacles.retain(|o| o.position.x >= despawn_x);
    }

    fn spawn_obstacles(&mut self) {
        let cfg = &self.physics.obstacle;
        let needs_spawn = match self.obstacles.last() {
            None => true,
            Some(newest) => newest.position.x < cfg.spawn_trigger_x,
        };
        if needs_spawn {
            let gap_y = self.rng.random_range(cfg.gap_min_y..=cfg.gap_max_y);
            self.obstacles.push(Obstacle::new(cfg.spawn_x, gap_y));
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            obstacles: self.obstacles.iter().map(Obstacle::state).collect(),
            players: self
                .players
                .iter()
                .map(|(id, player)| (*id, player.snapshot()))
                .collect(),
        }
    }
}

/// Cooldown, then lift or gravity, then clamp; consumes the jump flag.
fn step_player(player: &mut Player, physics: &Physics) {
    let cfg = &physics.player;
    player.cool_down(physics.dt);
    if player.is_jumping {
        player.position.y -= cfg.lift;
    } else {
        player.position.y += cfg.gravity;
    }
    player.position.y = player.position.y.max(cfg.min_y).min(cfg.max_y);
    player.is_jumping = false;
}

fn collides(player: &Player, obstacles: &[Obstacle], floor: Rect, physics: &Physics) -> bool {
    let bounds = player.bounds(physics.player.size);
    if bounds.intersects(&floor) {
        return true;
    }
    let cfg = &physics.obstacle;
    obstacles.iter().any(|o| {
        bounds.intersects(&o.upper_box(cfg.width, cfg.gap_height))
            || bounds.intersects(&o.lower_box(cfg.width, cfg.gap_height, physics.world.floor_y))
    })
}
