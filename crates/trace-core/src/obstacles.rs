//! Obstacle sampling used once at grid construction.
//!
//! The router never detects obstacles itself; an [`ObstacleSampler`] is asked about every
//! cell exactly once, with the cell's surface position, and the answer is frozen into the
//! grid.

use serde::{Deserialize, Serialize};

use crate::point::{Point, SurfacePoint};

/// What a sampler reports for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellSample {
    Free,
    Obstacle,
}

pub trait ObstacleSampler {
    fn sample(&self, cell: Point, surface: SurfacePoint) -> CellSample;
}

/// Closures sample by grid cell only.
impl<F> ObstacleSampler for F
where
    F: Fn(Point) -> CellSample,
{
    fn sample(&self, cell: Point, _surface: SurfacePoint) -> CellSample {
        self(cell)
    }
}

/// Board without obstacles.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenBoard;

impl ObstacleSampler for OpenBoard {
    fn sample(&self, _cell: Point, _surface: SurfacePoint) -> CellSample {
        CellSample::Free
    }
}

/// Axis-aligned rectangle on the surface, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ObstacleRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    pub fn contains(&self, point: SurfacePoint) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }
}

/// Samples a set of rectangles the way a downward probe at each cell centre would hit them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RectObstacles {
    pub rects: Vec<ObstacleRect>,
}

impl RectObstacles {
    pub fn new(rects: Vec<ObstacleRect>) -> Self {
        Self { rects }
    }
}

impl ObstacleSampler for RectObstacles {
    fn sample(&self, _cell: Point, surface: SurfacePoint) -> CellSample {
        if self.rects.iter().any(|rect| rect.contains(surface)) {
            CellSample::Obstacle
        } else {
            CellSample::Free
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_is_normalized_and_inclusive() {
        let rect = ObstacleRect::new(4.0, 4.0, 2.0, 2.0);
        assert_eq!(rect.min_x, 2.0);
        assert!(rect.contains(SurfacePoint::new(2.0, 4.0)));
        assert!(!rect.contains(SurfacePoint::new(4.5, 3.0)));
    }

    #[test]
    fn test_closure_sampler_ignores_surface() {
        let sampler = |cell: Point| {
            if cell.x == 3 {
                CellSample::Obstacle
            } else {
                CellSample::Free
            }
        };
        assert_eq!(
            sampler.sample(Point::new(3, 0), SurfacePoint::new(99.0, 99.0)),
            CellSample::Obstacle
        );
        assert_eq!(
            sampler.sample(Point::new(2, 0), SurfacePoint::default()),
            CellSample::Free
        );
    }
}
