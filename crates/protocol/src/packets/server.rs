//! Server -> Client payloads.

use crate::{PlayerColor, ProtocolError, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire view of one obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleState {
    pub position: Vector2,
    pub passed: bool,
}

/// Wire view of one player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSnapshot {
    pub player_id: u32,
    pub position: Vector2,
    pub is_jumping: bool,
    pub current_score: u32,
    pub max_score: u32,
    pub color: PlayerColor,
    pub collision_cooldown: f32,
}

/// Full game state, broadcast every tick.
///
/// Players are keyed by identity. A `BTreeMap` keeps the encoded output
/// stable for a given state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSnapshot {
    pub obstacles: Vec<ObstacleState>,
    pub players: BTreeMap<u32, PlayerSnapshot>,
}

impl GameSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn player(&self, player_id: u32) -> Option<&PlayerSnapshot> {
        self.players.get(&player_id)
    }
}
