//! Headless flapper client.

pub mod input;
pub mod network;

pub use input::Autopilot;
pub use network::{ClientError, GameClient, InputWriter, SnapshotReader};
