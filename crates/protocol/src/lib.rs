//! Shared protocol crate for the flapper game server.
//!
//! This crate contains:
//! - Length-prefixed framing over async byte streams
//! - The handshake line that carries a player's identity
//! - Payload definitions (player input, full game state)
//! - Shared types (PlayerColor, Vector2)

mod error;
mod frame;
pub mod packets;

use serde::{Deserialize, Serialize};

pub use error::ProtocolError;
pub use frame::{
    MAX_FRAME_LEN, encode_frame, read_frame, read_handshake, write_frame, write_handshake,
};

/// Cosmetic player color.
///
/// Encoded on the wire as lowercase names. The single-character codes used by
/// the first protocol revision are still accepted when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerColor {
    #[default]
    #[serde(rename = "yellow", alias = "Y")]
    Yellow,
    #[serde(rename = "blue", alias = "B")]
    Blue,
    #[serde(rename = "red", alias = "R")]
    Red,
}

impl PlayerColor {
    /// Colors handed out to players in join order.
    pub const ROTATION: [PlayerColor; 3] = [PlayerColor::Yellow, PlayerColor::Blue, PlayerColor::Red];

    /// Color for the given player identity (identities start at 1).
    pub fn for_player(player_id: u32) -> Self {
        let idx = (player_id.saturating_sub(1) as usize) % Self::ROTATION.len();
        Self::ROTATION[idx]
    }
}

/// A 2D position as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}
