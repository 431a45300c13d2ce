//! Shared occupancy grid.
//!
//! Every cell is free, a permanent obstacle, or owned by exactly one trace. Obstacles are
//! sampled once at construction; afterwards only ownership changes, and only through
//! [`OccupancyGrid::claim`] and [`OccupancyGrid::release`].

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::config::RouterConfig;
use crate::error::{Result, RouteError};
use crate::obstacles::{CellSample, ObstacleSampler};
use crate::point::{Point, SurfacePoint};
use crate::trace::TraceId;

/// Absorbs float noise so a surface point produced by `to_surface` maps back to its cell.
const GRID_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "trace")]
pub enum Occupant {
    Free,
    Obstacle,
    OwnedBy(TraceId),
}

/// Physical extent of the board in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoardBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds of `width` x `height` cells of size `step`, centred on the surface origin.
    pub fn centered(width: i32, height: i32, step: f64) -> Self {
        let half_w = (width / 2) as f64 * step;
        let half_h = (height / 2) as f64 * step;
        Self {
            min_x: -half_w,
            min_y: -half_h,
            max_x: (width as f64) * step - half_w,
            max_y: (height as f64) * step - half_h,
        }
    }

    pub fn min(&self) -> SurfacePoint {
        SurfacePoint::new(self.min_x, self.min_y)
    }
}

#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    width: i32,
    height: i32,
    border: i32,
    step: f64,
    min: SurfacePoint,
    cells: Vec<Occupant>,
}

impl OccupancyGrid {
    /// Build a grid of `width` x `height` cells whose cell (0, 0) sits at `min`, sampling
    /// every cell once.
    pub fn new<S>(
        width: i32,
        height: i32,
        step: f64,
        min: SurfacePoint,
        border: i32,
        sampler: &S,
    ) -> Self
    where
        S: ObstacleSampler + ?Sized,
    {
        let width = width.max(0);
        let height = height.max(0);
        let mut grid = Self {
            width,
            height,
            border: border.max(0),
            step,
            min,
            cells: vec![Occupant::Free; (width as usize) * (height as usize)],
        };

        let mut obstacles = 0usize;
        for y in 0..height {
            for x in 0..width {
                let cell = Point::new(x, y);
                if sampler.sample(cell, grid.to_surface(cell)) == CellSample::Obstacle {
                    let idx = grid.offset(x, y);
                    grid.cells[idx] = Occupant::Obstacle;
                    obstacles += 1;
                }
            }
        }
        tracing::debug!(width, height, obstacles, "occupancy grid sampled");
        grid
    }

    /// Size the grid from the board bounds and the configured step.
    pub fn from_bounds<S>(bounds: BoardBounds, config: &RouterConfig, sampler: &S) -> Result<Self>
    where
        S: ObstacleSampler + ?Sized,
    {
        config.validate()?;
        let width = ((bounds.max_x - bounds.min_x) / config.step - GRID_EPSILON).ceil() as i32;
        let height = ((bounds.max_y - bounds.min_y) / config.step - GRID_EPSILON).ceil() as i32;
        if width <= 2 * config.border_cells || height <= 2 * config.border_cells {
            return Err(RouteError::InvalidConfig(format!(
                "board of {}x{} cells leaves no routable area inside a {}-cell border",
                width, height, config.border_cells
            )));
        }
        Ok(Self::new(
            width,
            height,
            config.step,
            bounds.min(),
            config.border_cells,
            sampler,
        ))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    #[inline]
    fn index(&self, cell: Point) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 || cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        Some(self.offset(cell.x, cell.y))
    }

    /// Surface point to grid cell. Points outside the board map to cells outside the grid.
    pub fn to_grid(&self, point: SurfacePoint) -> Point {
        let x = ((point.x - self.min.x) / self.step - GRID_EPSILON).ceil() as i32;
        let y = ((point.y - self.min.y) / self.step - GRID_EPSILON).ceil() as i32;
        Point::new(x, y)
    }

    /// Grid cell to surface point. With centred bounds the grid centre is the surface origin.
    pub fn to_surface(&self, cell: Point) -> SurfacePoint {
        SurfacePoint::new(
            self.min.x + cell.x as f64 * self.step,
            self.min.y + cell.y as f64 * self.step,
        )
    }

    /// True iff the cell lies inside the grid and outside the reserved border.
    pub fn in_bounds(&self, cell: Point) -> bool {
        cell.x >= self.border
            && cell.x < self.width - self.border
            && cell.y >= self.border
            && cell.y < self.height - self.border
    }

    /// Occupant of a cell; anything outside the grid reads as an obstacle.
    pub fn occupant(&self, cell: Point) -> Occupant {
        self.index(cell)
            .map(|idx| self.cells[idx])
            .unwrap_or(Occupant::Obstacle)
    }

    /// Mark a free cell as owned by `id`. Claiming a cell `id` already owns is a no-op.
    pub fn claim(&mut self, cell: Point, id: TraceId) -> Result<()> {
        let idx = self.index(cell).ok_or(RouteError::OutOfBounds { cell })?;
        match self.cells[idx] {
            Occupant::Free => {
                self.cells[idx] = Occupant::OwnedBy(id);
                Ok(())
            }
            Occupant::OwnedBy(owner) if owner == id => Ok(()),
            occupant => Err(RouteError::CellOccupied { cell, occupant }),
        }
    }

    /// Clear ownership of the given cells where `id` owns them. Returns how many were freed.
    pub fn release(&mut self, cells: &[Point], id: TraceId) -> usize {
        let mut released = 0;
        for &cell in cells {
            let Some(idx) = self.index(cell) else {
                continue;
            };
            if self.cells[idx] == Occupant::OwnedBy(id) {
                self.cells[idx] = Occupant::Free;
                released += 1;
            }
        }
        released
    }

    /// All cells currently owned by `id`, row-major.
    pub fn owned_by(&self, id: TraceId) -> Vec<Point> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, occupant)| **occupant == Occupant::OwnedBy(id))
            .map(|(idx, _)| {
                let idx = idx as i32;
                Point::new(idx % self.width, idx / self.width)
            })
            .collect()
    }

    pub fn count(&self, occupant: Occupant) -> usize {
        self.cells.iter().filter(|cell| **cell == occupant).count()
    }

    /// One character per cell, row 0 first: `.` free, `#` obstacle, a letter per trace.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let ch = match self.cells[self.offset(x, y)] {
                    Occupant::Free => '.',
                    Occupant::Obstacle => '#',
                    Occupant::OwnedBy(id) => id.glyph(),
                };
                out.push(ch);
            }
            let _ = writeln!(out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::OpenBoard;

    fn unit_grid(width: i32, height: i32) -> OccupancyGrid {
        OccupancyGrid::new(width, height, 1.0, SurfacePoint::default(), 1, &OpenBoard)
    }

    #[test]
    fn test_to_grid_round_trips_cell_positions() {
        let config = RouterConfig::default();
        let bounds = BoardBounds::centered(40, 30, config.step);
        let grid = OccupancyGrid::from_bounds(bounds, &config, &OpenBoard).unwrap();
        assert_eq!((grid.width(), grid.height()), (40, 30));

        for cell in [Point::new(0, 0), Point::new(7, 13), Point::new(39, 29)] {
            assert_eq!(grid.to_grid(grid.to_surface(cell)), cell);
        }
        // Grid centre sits on the surface origin.
        let centre = grid.to_surface(Point::new(20, 15));
        assert!(centre.x.abs() < 1e-12 && centre.y.abs() < 1e-12);
    }

    #[test]
    fn test_to_grid_rounds_up_between_cells() {
        let grid = unit_grid(10, 10);
        assert_eq!(grid.to_grid(SurfacePoint::new(2.2, 3.9)), Point::new(3, 4));
        assert_eq!(grid.to_grid(SurfacePoint::new(2.0, 3.0)), Point::new(2, 3));
    }

    #[test]
    fn test_border_is_out_of_bounds() {
        let grid = unit_grid(20, 20);
        assert!(!grid.in_bounds(Point::new(0, 5)));
        assert!(grid.in_bounds(Point::new(1, 5)));
        assert!(grid.in_bounds(Point::new(18, 18)));
        assert!(!grid.in_bounds(Point::new(19, 5)));
        assert!(!grid.in_bounds(Point::new(5, -1)));
    }

    #[test]
    fn test_sampler_marks_obstacles_once() {
        let sampler = |cell: Point| {
            if cell.y == 4 {
                CellSample::Obstacle
            } else {
                CellSample::Free
            }
        };
        let grid = OccupancyGrid::new(8, 8, 1.0, SurfacePoint::default(), 1, &sampler);
        assert_eq!(grid.count(Occupant::Obstacle), 8);
        assert_eq!(grid.occupant(Point::new(3, 4)), Occupant::Obstacle);
        assert_eq!(grid.occupant(Point::new(3, 5)), Occupant::Free);
        assert_eq!(grid.occupant(Point::new(30, 5)), Occupant::Obstacle);
    }

    #[test]
    fn test_claim_rejects_foreign_owner_and_obstacle() {
        let sampler = |cell: Point| {
            if cell == Point::new(2, 2) {
                CellSample::Obstacle
            } else {
                CellSample::Free
            }
        };
        let mut grid = OccupancyGrid::new(6, 6, 1.0, SurfacePoint::default(), 1, &sampler);
        let a = TraceId::new(1);
        let b = TraceId::new(2);

        grid.claim(Point::new(3, 3), a).unwrap();
        grid.claim(Point::new(3, 3), a).unwrap();
        assert!(matches!(
            grid.claim(Point::new(3, 3), b),
            Err(RouteError::CellOccupied {
                occupant: Occupant::OwnedBy(owner),
                ..
            }) if owner == a
        ));
        assert!(matches!(
            grid.claim(Point::new(2, 2), b),
            Err(RouteError::CellOccupied {
                occupant: Occupant::Obstacle,
                ..
            })
        ));
        assert!(matches!(
            grid.claim(Point::new(9, 9), b),
            Err(RouteError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_release_only_touches_own_cells() {
        let mut grid = unit_grid(6, 6);
        let a = TraceId::new(1);
        let b = TraceId::new(2);
        grid.claim(Point::new(1, 1), a).unwrap();
        grid.claim(Point::new(2, 1), a).unwrap();
        grid.claim(Point::new(3, 1), b).unwrap();

        let released = grid.release(&[Point::new(1, 1), Point::new(2, 1), Point::new(3, 1)], a);
        assert_eq!(released, 2);
        assert_eq!(grid.occupant(Point::new(3, 1)), Occupant::OwnedBy(b));
        assert!(grid.owned_by(a).is_empty());
        assert_eq!(grid.owned_by(b), vec![Point::new(3, 1)]);
    }

    #[test]
    fn test_render_ascii() {
        let sampler = |cell: Point| {
            if cell == Point::new(0, 0) {
                CellSample::Obstacle
            } else {
                CellSample::Free
            }
        };
        let mut grid = OccupancyGrid::new(3, 2, 1.0, SurfacePoint::default(), 0, &sampler);
        grid.claim(Point::new(1, 1), TraceId::new(0)).unwrap();
        assert_eq!(grid.render_ascii(), "#..\n.a.\n");
    }

    #[test]
    fn test_from_bounds_rejects_board_smaller_than_border() {
        let config = RouterConfig {
            step: 1.0,
            ..RouterConfig::default()
        };
        let bounds = BoardBounds::new(0.0, 0.0, 2.0, 10.0);
        assert!(matches!(
            OccupancyGrid::from_bounds(bounds, &config, &OpenBoard),
            Err(RouteError::InvalidConfig(_))
        ));
    }
}
