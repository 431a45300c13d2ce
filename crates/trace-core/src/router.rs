//! Greedy alternating-axis walk for a single trace.
//!
//! The walk starts on the horizontal axis and steps one cell at a time toward the
//! destination's column, then its row, then its column again, and so on. A leg ends when
//! the walk reaches the destination's line on that axis, is about to leave the routable
//! area, or runs into something it may not enter. Obstacle detection is checked before the
//! destination clamp, so a step that would land on the destination line but is blocked
//! ends the leg one cell short.
//!
//! The router only walks. Deciding what to do about a stuck walk belongs to
//! [`crate::conflict::ConflictResolver`].

use crate::error::Result;
use crate::grid::{OccupancyGrid, Occupant};
use crate::point::{Axis, Point, SurfacePoint};
use crate::trace::{FailureReason, Trace};

/// How a single leg ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegStop {
    /// The walk reached the destination's row or column for this axis.
    AtDestination,
    /// The next cell is outside the routable area.
    OutOfBounds,
    /// The next cell belongs to someone else.
    HitObject(Occupant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub axis: Axis,
    pub start: Point,
    pub end: Point,
    pub stop: LegStop,
}

impl Leg {
    pub fn progressed(&self) -> bool {
        self.start != self.end
    }
}

/// Result of one router invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Routed,
    /// Two consecutive legs made no progress. `blocker` is the most recent thing the walk
    /// ran into, if any.
    Stuck { at: Point, blocker: Option<Occupant> },
    Failed(FailureReason),
}

pub struct TraceRouter<'a> {
    grid: &'a mut OccupancyGrid,
    leg_budget: usize,
}

impl<'a> TraceRouter<'a> {
    pub fn new(grid: &'a mut OccupancyGrid, leg_budget: usize) -> Self {
        Self { grid, leg_budget }
    }

    /// Walk `trace` from its origin, claiming cells as it goes. Any earlier claims and path
    /// points are discarded first. On success `trace.path_points` runs from origin to
    /// destination; on failure it holds whatever was built before the walk stopped.
    pub fn route(&mut self, trace: &mut Trace) -> Result<WalkOutcome> {
        trace.release_cells(self.grid);
        trace.path_points.clear();
        trace.path_points.push(trace.origin);

        let destination = trace.destination_cell;
        let mut position = trace.origin_cell;
        if !self.grid.in_bounds(position) {
            tracing::debug!(trace = %trace.id, cell = %position, "origin outside routable area");
            return Ok(WalkOutcome::Failed(FailureReason::OutOfBounds));
        }
        self.claim_if_free(trace, position)?;

        // Surface position of the last waypoint. Each leg changes exactly one coordinate.
        let mut cursor = trace.origin;
        let mut axis = Axis::Horizontal;
        let mut legs = 0usize;
        let mut previous_stalled = false;
        let mut blocker: Option<Occupant> = None;

        loop {
            if position == destination {
                trace.path_points.push(trace.destination);
                tracing::debug!(trace = %trace.id, legs, cells = trace.claimed_cells.len(), "walk complete");
                return Ok(WalkOutcome::Routed);
            }
            if legs >= self.leg_budget {
                tracing::debug!(trace = %trace.id, legs, "leg budget exhausted");
                return Ok(WalkOutcome::Failed(FailureReason::BudgetExceeded));
            }
            legs += 1;

            let leg = self.walk_leg(trace, position, axis)?;
            tracing::debug!(
                trace = %trace.id,
                axis = %leg.axis,
                from = %leg.start,
                to = %leg.end,
                stop = ?leg.stop,
                "leg"
            );

            match leg.stop {
                LegStop::OutOfBounds => {
                    return Ok(WalkOutcome::Failed(FailureReason::OutOfBounds));
                }
                LegStop::AtDestination => {
                    position = leg.end;
                    if leg.progressed() && position != destination {
                        // Lock the solved coordinate to the destination itself.
                        cursor = cursor.with(axis, trace.destination.along(axis));
                        trace.path_points.push(cursor);
                    }
                }
                LegStop::HitObject(occupant) => {
                    blocker = Some(occupant);
                    position = leg.end;
                    if leg.progressed() {
                        cursor = cursor.with(axis, self.grid.to_surface(position).along(axis));
                        trace.path_points.push(cursor);
                    }
                }
            }

            let stalled = !leg.progressed();
            if stalled && previous_stalled {
                return Ok(WalkOutcome::Stuck {
                    at: position,
                    blocker,
                });
            }
            previous_stalled = stalled;
            axis = axis.flip();
        }
    }

    /// Step along `axis` from `start` until the leg ends.
    fn walk_leg(&mut self, trace: &mut Trace, start: Point, axis: Axis) -> Result<Leg> {
        let target = trace.destination_cell.along(axis);
        let mut current = start;

        let stop = loop {
            if current.along(axis) == target {
                break LegStop::AtDestination;
            }
            let next = current + axis.step_toward(current, target);
            if !self.grid.in_bounds(next) {
                break LegStop::OutOfBounds;
            }
            if let Some(occupant) = self.blocking_occupant(trace, next) {
                break LegStop::HitObject(occupant);
            }
            self.claim_if_free(trace, next)?;
            current = next;
        };

        Ok(Leg {
            axis,
            start,
            end: current,
            stop,
        })
    }

    /// What stops `trace` from entering `cell`, if anything. A trace may always enter its
    /// own endpoints and cells it already owns.
    fn blocking_occupant(&self, trace: &Trace, cell: Point) -> Option<Occupant> {
        if trace.is_endpoint(cell) {
            return None;
        }
        match self.grid.occupant(cell) {
            Occupant::Free => None,
            Occupant::OwnedBy(owner) if owner == trace.id => None,
            occupant => Some(occupant),
        }
    }

    fn claim_if_free(&mut self, trace: &mut Trace, cell: Point) -> Result<()> {
        if self.grid.occupant(cell) == Occupant::Free {
            self.grid.claim(cell, trace.id)?;
            trace.claimed_cells.push(cell);
        }
        Ok(())
    }
}

/// Surface polyline length of a path, for reports.
pub fn path_length(points: &[SurfacePoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}
