//! Axis-aligned bounding boxes.
//!
//! Players collide with the two boxes around each obstacle's gap and with the
//! floor. All boxes are axis-aligned, so overlap is a per-axis interval test.

use glam::Vec2;

/// An axis-aligned box from `min` (top-left) to `max` (bottom-right).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    #[inline]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box with its top-left corner at `origin`.
    #[inline]
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    /// True when the box has no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Strict overlap test; boxes that only share an edge do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_origin_size(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_overlap() {
        assert!(rect(0.0, 0.0, 10.0, 10.0).intersects(&rect(5.0, 5.0, 10.0, 10.0)));
        assert!(rect(5.0, 5.0, 10.0, 10.0).intersects(&rect(0.0, 0.0, 10.0, 10.0)));
        assert!(rect(0.0, 0.0, 100.0, 100.0).intersects(&rect(40.0, 40.0, 5.0, 5.0)));
    }

    #[test]
    fn test_separated() {
        assert!(!rect(0.0, 0.0, 10.0, 10.0).intersects(&rect(20.0, 0.0, 10.0, 10.0)));
        assert!(!rect(0.0, 0.0, 10.0, 10.0).intersects(&rect(0.0, 20.0, 10.0, 10.0)));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        assert!(!rect(0.0, 0.0, 10.0, 10.0).intersects(&rect(10.0, 0.0, 10.0, 10.0)));
        assert!(!rect(0.0, 0.0, 10.0, 10.0).intersects(&rect(0.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_empty_box_never_intersects() {
        let inverted = Rect::new(Vec2::new(0.0, 50.0), Vec2::new(100.0, -20.0));
        assert!(inverted.is_empty());
        assert!(!inverted.intersects(&rect(0.0, 0.0, 100.0, 100.0)));
    }
}
