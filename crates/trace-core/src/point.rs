//! Grid and surface coordinate value types shared by the grid and the router.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate of this point on the given axis.
    #[inline]
    pub fn along(self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.y)
    }
}

/// Continuous position on the board surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f64,
    pub y: f64,
}

impl SurfacePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: SurfacePoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    #[inline]
    pub fn along(self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }

    /// Copy of this point with the coordinate on `axis` replaced.
    #[inline]
    pub fn with(self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::Horizontal => Self { x: value, ..self },
            Axis::Vertical => Self { y: value, ..self },
        }
    }

    /// Rotate around the surface origin by `degrees` (counter-clockwise).
    pub fn rotated(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }
}

impl Add for SurfacePoint {
    type Output = SurfacePoint;

    fn add(self, other: SurfacePoint) -> SurfacePoint {
        SurfacePoint::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for SurfacePoint {
    type Output = SurfacePoint;

    fn sub(self, other: SurfacePoint) -> SurfacePoint {
        SurfacePoint::new(self.x - other.x, self.y - other.y)
    }
}

impl From<[f64; 2]> for SurfacePoint {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// One of the two leg directions. Consecutive legs always use different axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn flip(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// Unit step along this axis from `from` toward `target` (the target's coordinate on
    /// this axis). Zero when already aligned.
    pub fn step_toward(self, from: Point, target: i32) -> Point {
        let sign = (target - from.along(self)).signum();
        match self {
            Axis::Horizontal => Point::new(sign, 0),
            Axis::Vertical => Point::new(0, sign),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(3, 4);
        let b = Point::new(1, -2);
        assert_eq!(a + b, Point::new(4, 2));
        assert_eq!(a - b, Point::new(2, 6));
        assert_eq!(a.to_string(), "3, 4");
    }

    #[test]
    fn test_step_toward_uses_sign_of_gap() {
        let from = Point::new(5, 5);
        assert_eq!(Axis::Horizontal.step_toward(from, 9), Point::new(1, 0));
        assert_eq!(Axis::Horizontal.step_toward(from, 1), Point::new(-1, 0));
        assert_eq!(Axis::Vertical.step_toward(from, 2), Point::new(0, -1));
        assert_eq!(Axis::Vertical.step_toward(from, 5), Point::new(0, 0));
    }

    #[test]
    fn test_surface_point_rotation() {
        let p = SurfacePoint::new(1.0, 0.0).rotated(90.0);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
        assert!((SurfacePoint::new(0.0, 0.0).distance(SurfacePoint::new(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }
}
