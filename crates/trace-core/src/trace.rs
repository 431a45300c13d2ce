//! The unit of routing: one origin to destination connection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::grid::OccupancyGrid;
use crate::point::{Point, SurfacePoint};

/// Opaque trace handle issued by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(u32);

impl TraceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Single letter used when drawing the grid.
    pub fn glyph(self) -> char {
        const GLYPHS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
        GLYPHS[(self.0 as usize) % GLYPHS.len()] as char
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace-{}", self.0)
    }
}

/// Why a trace ended up failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    OutOfBounds,
    UnresolvedDeadlock,
    BudgetExceeded,
    /// Still stuck on its last attempt of the pass, or torn down after using them all.
    AttemptsExhausted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::OutOfBounds => write!(f, "out of bounds"),
            FailureReason::UnresolvedDeadlock => write!(f, "unresolved deadlock"),
            FailureReason::BudgetExceeded => write!(f, "leg budget exceeded"),
            FailureReason::AttemptsExhausted => write!(f, "attempts exhausted"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum TraceState {
    #[default]
    Pending,
    Routed,
    Failed(FailureReason),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: TraceId,
    /// Optional caller-supplied name
    #[serde(default)]
    pub label: Option<String>,
    pub origin: SurfacePoint,
    pub destination: SurfacePoint,
    pub origin_cell: Point,
    pub destination_cell: Point,
    /// Straight-line endpoint distance, larger routes first
    pub priority_distance: f64,
    pub state: TraceState,
    /// Cells this trace owns in the grid, in walk order
    pub claimed_cells: Vec<Point>,
    /// Rendered polyline: origin, bends, destination
    pub path_points: Vec<SurfacePoint>,
}

impl Trace {
    pub fn new(id: TraceId, origin: SurfacePoint, destination: SurfacePoint, grid: &OccupancyGrid) -> Self {
        Self {
            id,
            label: None,
            origin,
            destination,
            origin_cell: grid.to_grid(origin),
            destination_cell: grid.to_grid(destination),
            priority_distance: origin.distance(destination),
            state: TraceState::Pending,
            claimed_cells: Vec::new(),
            path_points: Vec::new(),
        }
    }

    pub fn is_routed(&self) -> bool {
        self.state == TraceState::Routed
    }

    /// Origin and destination cells are always passable for their own trace.
    pub fn is_endpoint(&self, cell: Point) -> bool {
        cell == self.origin_cell || cell == self.destination_cell
    }

    /// Scheduling order: longer traces first, then earlier registration.
    pub fn outranks(&self, other: &Trace) -> bool {
        match self.priority_distance.total_cmp(&other.priority_distance) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.id < other.id,
        }
    }

    /// Give every claimed cell back to the grid. Returns how many cells were freed.
    pub fn release_cells(&mut self, grid: &mut OccupancyGrid) -> usize {
        let released = grid.release(&self.claimed_cells, self.id);
        self.claimed_cells.clear();
        released
    }

    /// Tear the trace down so it can be routed again from scratch.
    pub fn destroy(&mut self, grid: &mut OccupancyGrid) -> usize {
        let released = self.release_cells(grid);
        self.path_points.clear();
        self.state = TraceState::Pending;
        released
    }

    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{} ({})", label, self.id),
            None => self.id.to_string(),
        }
    }
}
