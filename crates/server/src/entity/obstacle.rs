//! Obstacle entity: a column with a gap that players must fly through.

use crate::collision::Rect;
use glam::Vec2;
use protocol::packets::ObstacleState;

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    /// `x` is the left edge of the column, `y` the centre of the gap.
    pub position: Vec2,
    /// Set once a player has been credited for getting past this obstacle.
    pub passed: bool,
}

impl Obstacle {
    pub fn new(x: f32, gap_y: f32) -> Self {
        Self {
            position: Vec2::new(x, gap_y),
            passed: false,
        }
    }

    /// Solid part of the column above the gap.
    pub fn upper_box(&self, width: f32, gap_height: f32) -> Rect {
        Rect::new(
            Vec2::new(self.position.x, 0.0),
            Vec2::new(self.position.x + width, self.position.y - gap_height / 2.0),
        )
    }

    /// Solid part of the column between the gap and the floor.
    pub fn lower_box(&self, width: f32, gap_height: f32, floor_y: f32) -> Rect {
        Rect::new(
            Vec2::new(self.position.x, self.position.y + gap_height / 2.0),
            Vec2::new(self.position.x + width, floor_y),
        )
    }

    pub fn state(&self) -> ObstacleState {
        ObstacleState {
            position: self.position.into(),
            passed: self.passed,
        }
    }
}
