//! Game entities.
//!
//! Players are driven by client input; obstacles scroll in from the right.

mod obstacle;
mod player;

pub use obstacle::Obstacle;
pub use player::Player;
