//! Player entity.

use crate::collision::Rect;
use glam::Vec2;
use protocol::PlayerColor;
use protocol::packets::PlayerSnapshot;

/// Authoritative state of one connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Identity assigned at connect time.
    pub id: u32,
    /// Top-left corner of the bounding box.
    pub position: Vec2,
    /// Pending lift request, consumed by the next tick.
    pub is_jumping: bool,
    pub current_score: u32,
    /// Highest `current_score` reached.
    pub max_score: u32,
    pub color: PlayerColor,
    /// Seconds until the player can collide again.
    pub collision_cooldown: f32,
}

impl Player {
    /// Create a player at the spawn point with the color for its identity.
    pub fn new(id: u32, spawn: Vec2) -> Self {
        Self {
            id,
            position: spawn,
            is_jumping: false,
            current_score: 0,
            max_score: 0,
            color: PlayerColor::for_player(id),
            collision_cooldown: 0.0,
        }
    }

    pub fn bounds(&self, size: f32) -> Rect {
        Rect::from_origin_size(self.position, Vec2::splat(size))
    }

    /// Tick the cooldown down, never below zero.
    ///
    /// A remainder under half a tick is float residue from repeated
    /// subtraction and counts as expired.
    pub fn cool_down(&mut self, dt: f32) {
        let remaining = self.collision_cooldown - dt;
        self.collision_cooldown = if remaining < dt * 0.5 { 0.0 } else { remaining };
    }

    pub fn is_vulnerable(&self) -> bool {
        self.collision_cooldown <= 0.0
    }

    pub fn award_point(&mut self) {
        self.current_score += 1;
        self.max_score = self.max_score.max(self.current_score);
    }

    /// Send the player back to spawn after a collision.
    pub fn reset(&mut self, spawn: Vec2, cooldown: f32) {
        self.current_score = 0;
        self.position = spawn;
        self.collision_cooldown = cooldown.max(0.0);
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: self.id,
            position: self.position.into(),
            is_jumping: self.is_jumping,
            current_score: self.current_score,
            max_score: self.max_score,
            color: self.color,
            collision_cooldown: self.collision_cooldown,
        }
    }
}
