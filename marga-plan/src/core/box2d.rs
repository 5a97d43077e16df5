//! Oriented 2D bounding box with a separating-axis overlap test.

use serde::{Deserialize, Serialize};

/// Plain 2D vector used for box centers and shifts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(&self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

/// Axis-aligned-in-its-own-frame rectangle: center, heading, length along
/// the heading, width across it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Box2d {
    center: Vec2,
    heading: f64,
    length: f64,
    width: f64,
    cos_heading: f64,
    sin_heading: f64,
}

impl Box2d {
    pub fn new(center: Vec2, heading: f64, length: f64, width: f64) -> Self {
        Self {
            center,
            heading,
            length,
            width,
            cos_heading: heading.cos(),
            sin_heading: heading.sin(),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Unit vector along the heading.
    #[inline]
    fn axis_lon(&self) -> Vec2 {
        Vec2::new(self.cos_heading, self.sin_heading)
    }

    /// Unit vector across the heading (left).
    #[inline]
    fn axis_lat(&self) -> Vec2 {
        Vec2::new(-self.sin_heading, self.cos_heading)
    }

    /// Corner positions, counter-clockwise from front-left.
    pub fn corners(&self) -> [Vec2; 4] {
        let lon = self.axis_lon();
        let lat = self.axis_lat();
        let hl = 0.5 * self.length;
        let hw = 0.5 * self.width;
        [
            Vec2::new(
                self.center.x + hl * lon.x + hw * lat.x,
                self.center.y + hl * lon.y + hw * lat.y,
            ),
            Vec2::new(
                self.center.x - hl * lon.x + hw * lat.x,
                self.center.y - hl * lon.y + hw * lat.y,
            ),
            Vec2::new(
                self.center.x - hl * lon.x - hw * lat.x,
                self.center.y - hl * lon.y - hw * lat.y,
            ),
            Vec2::new(
                self.center.x + hl * lon.x - hw * lat.x,
                self.center.y + hl * lon.y - hw * lat.y,
            ),
        ]
    }

    /// Half extent of this box projected on a unit axis.
    #[inline]
    fn projected_half_extent(&self, axis: Vec2) -> f64 {
        0.5 * self.length * axis.dot(self.axis_lon()).abs()
            + 0.5 * self.width * axis.dot(self.axis_lat()).abs()
    }

    /// Separating-axis overlap test. The four candidate axes are the two
    /// heading directions of each box.
    pub fn has_overlap(&self, other: &Box2d) -> bool {
        let diff = Vec2::new(other.center.x - self.center.x, other.center.y - self.center.y);
        let axes = [
            self.axis_lon(),
            self.axis_lat(),
            other.axis_lon(),
            other.axis_lat(),
        ];
        for axis in axes {
            let distance = diff.dot(axis).abs();
            if distance > self.projected_half_extent(axis) + other.projected_half_extent(axis) {
                return false;
            }
        }
        true
    }

    /// Grow the width by `delta` (total, not per side).
    pub fn lateral_extend(&mut self, delta: f64) {
        self.width += delta;
    }

    /// Grow the length by `delta` (total, not per side).
    pub fn longitudinal_extend(&mut self, delta: f64) {
        self.length += delta;
    }

    /// Translate the center.
    pub fn shift(&mut self, offset: Vec2) {
        self.center.x += offset.x;
        self.center.y += offset.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_overlap_identical() {
        let a = Box2d::new(Vec2::new(0.0, 0.0), 0.0, 4.0, 2.0);
        assert!(a.has_overlap(&a));
    }

    #[test]
    fn test_overlap_rotated_near() {
        let a = Box2d::new(Vec2::new(0.0, 0.0), 0.0, 4.0, 2.0);
        let b = Box2d::new(Vec2::new(3.0, 1.1), FRAC_PI_4, 4.0, 2.0);
        assert!(a.has_overlap(&b));
        assert!(b.has_overlap(&a));
    }

    #[test]
    fn test_no_overlap_after_shift() {
        let a = Box2d::new(Vec2::new(0.0, 0.0), 0.0, 4.0, 2.0);
        let mut b = Box2d::new(Vec2::new(3.0, 1.1), FRAC_PI_4, 4.0, 2.0);
        b.shift(Vec2::new(0.5, 1.5));
        assert!(!a.has_overlap(&b));
        assert!(!b.has_overlap(&a));
    }

    #[test]
    fn test_axis_aligned_touching_counts_as_overlap() {
        let a = Box2d::new(Vec2::new(0.0, 0.0), 0.0, 2.0, 2.0);
        let b = Box2d::new(Vec2::new(2.0, 0.0), 0.0, 2.0, 2.0);
        assert!(a.has_overlap(&b));
        let c = Box2d::new(Vec2::new(2.01, 0.0), 0.0, 2.0, 2.0);
        assert!(!a.has_overlap(&c));
    }

    #[test]
    fn test_extend_changes_overlap() {
        let a = Box2d::new(Vec2::new(0.0, 0.0), 0.0, 2.0, 2.0);
        let mut b = Box2d::new(Vec2::new(3.0, 0.0), 0.0, 2.0, 2.0);
        assert!(!a.has_overlap(&b));
        b.longitudinal_extend(2.5);
        assert!(a.has_overlap(&b));
    }

    #[test]
    fn test_corners_of_unit_box() {
        let a = Box2d::new(Vec2::new(1.0, 1.0), 0.0, 2.0, 2.0);
        let corners = a.corners();
        assert!(corners
            .iter()
            .any(|c| (c.x - 2.0).abs() < 1e-12 && (c.y - 2.0).abs() < 1e-12));
        assert!(corners
            .iter()
            .any(|c| (c.x - 0.0).abs() < 1e-12 && (c.y - 0.0).abs() < 1e-12));
    }
}
