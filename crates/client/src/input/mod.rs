//! Input decisions for the bot.

use protocol::packets::{GameSnapshot, ObstacleState};

/// Steers a player through the nearest gap.
///
/// Snapshots carry positions only, so the box and obstacle sizes come from
/// the server's configuration and are assumed here.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    pub player_size: f32,
    pub obstacle_width: f32,
    /// Height to hold when no obstacle is ahead.
    pub cruise_y: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            player_size: 50.0,
            obstacle_width: 50.0,
            cruise_y: 275.0,
        }
    }
}

impl Autopilot {
    /// The nearest obstacle whose right edge is not yet behind `player_x`.
    pub fn next_obstacle<'a>(
        &self,
        snapshot: &'a GameSnapshot,
        player_x: f32,
    ) -> Option<&'a ObstacleState> {
        snapshot
            .obstacles
            .iter()
            .filter(|o| o.position.x + self.obstacle_width >= player_x)
            .min_by(|a, b| a.position.x.total_cmp(&b.position.x))
    }

    /// Whether to lift on the next tick. False if the player is not in the snapshot.
    pub fn should_jump(&self, snapshot: &GameSnapshot, player_id: u32) -> bool {
        let Some(player) = snapshot.player(player_id) else {
            return false;
        };
        let target = self
            .next_obstacle(snapshot, player.position.x)
            .map_or(self.cruise_y, |o| o.position.y);
        player.position.y + self.player_size / 2.0 > target
    }
}
