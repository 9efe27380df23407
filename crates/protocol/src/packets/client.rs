//! Client -> Server payloads.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// Input sent by a client, at most once per tick is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInput {
    /// Requesting lift for the next tick.
    pub is_jumping: bool,
}

impl PlayerInput {
    pub const fn new(is_jumping: bool) -> Self {
        Self { is_jumping }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse an input payload. Missing fields default to `false`.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
