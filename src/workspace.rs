// src/workspace.rs - Rectangular workspace bounds and clamping
use serde::{Deserialize, Serialize};

/// A planar position in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation towards `other`, `u` in [0, 1].
    pub fn lerp(&self, other: &Point, u: f64) -> Point {
        Point::new(self.x + u * (other.x - self.x), self.y + u * (other.y - self.y))
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Axis-aligned rectangle every emitted position must lie within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workspace {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Inset applied to radii and axis lengths by the trajectory factory (mm)
    pub margin: f64,
}

pub const X_MIN: f64 = -500.0;
pub const X_MAX: f64 = 500.0;
pub const Y_MIN: f64 = -300.0;
pub const Y_MAX: f64 = 300.0;

/// The process-wide workspace.
pub const WORKSPACE: Workspace = Workspace {
    x_min: X_MIN,
    x_max: X_MAX,
    y_min: Y_MIN,
    y_max: Y_MAX,
    margin: 10.0,
};

/// Clamp `v` into `[lo, hi]`.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

impl Workspace {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn clamp_xy(&self, x: f64, y: f64) -> (f64, f64) {
        (clamp(x, self.x_min, self.x_max), clamp(y, self.y_min, self.y_max))
    }

    pub fn clamp_point(&self, p: Point) -> Point {
        let (x, y) = self.clamp_xy(p.x, p.y);
        Point::new(x, y)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Largest half-extent along x that still keeps the margin.
    pub fn max_half_width(&self) -> f64 {
        self.width() / 2.0 - self.margin
    }

    pub fn max_half_height(&self) -> f64 {
        self.height() / 2.0 - self.margin
    }

    /// Largest radius a round shape may have without crossing the margin.
    pub fn max_radius(&self) -> f64 {
        self.max_half_width().min(self.max_half_height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_inside_values() {
        assert_eq!(WORKSPACE.clamp_xy(12.5, -40.0), (12.5, -40.0));
    }

    #[test]
    fn clamp_saturates_each_axis_independently() {
        assert_eq!(WORKSPACE.clamp_xy(1000.0, 1000.0), (500.0, 300.0));
        assert_eq!(WORKSPACE.clamp_xy(-9999.0, 0.0), (-500.0, 0.0));
        assert_eq!(WORKSPACE.clamp_point(Point::new(0.0, -301.0)), Point::new(0.0, -300.0));
    }

    #[test]
    fn margin_limits() {
        assert_eq!(WORKSPACE.max_half_width(), 490.0);
        assert_eq!(WORKSPACE.max_half_height(), 290.0);
        assert_eq!(WORKSPACE.max_radius(), 290.0);
    }

    #[test]
    fn contains_is_inclusive() {
        assert!(WORKSPACE.contains(Point::new(X_MAX, Y_MIN)));
        assert!(!WORKSPACE.contains(Point::new(X_MAX + 0.01, 0.0)));
    }
}
