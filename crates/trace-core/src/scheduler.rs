//! Registry of all traces and the routing pass that orders and retries them.
//!
//! The grid and the trace registry live behind one mutex. A routing pass holds the lock
//! from start to finish, so only one pass runs at a time and nothing observes a half
//! routed board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::config::RouterConfig;
use crate::conflict::{ConflictResolver, Resolution};
use crate::error::{Result, RouteError};
use crate::grid::{OccupancyGrid, Occupant};
use crate::point::{Point, SurfacePoint};
use crate::projection::SurfaceAnchor;
use crate::router::{TraceRouter, WalkOutcome};
use crate::trace::{FailureReason, Trace, TraceId, TraceState};

/// Summary of one `route_all` pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Router invocations made during the pass
    pub attempts: usize,
    /// Traces routed at the end of the pass, in the order they were first attempted
    pub routed: Vec<TraceId>,
    pub failed: Vec<(TraceId, FailureReason)>,
    /// Traces torn down to make room, one entry per teardown
    pub destroyed: Vec<TraceId>,
}

impl RoutingReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            attempts: 0,
            routed: Vec::new(),
            failed: Vec::new(),
            destroyed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What one router invocation amounted to after conflict resolution.
enum Attempt {
    Routed,
    Failed,
    Conflict { destroyed: TraceId },
}

struct SchedulerState {
    grid: OccupancyGrid,
    traces: BTreeMap<TraceId, Trace>,
    next_id: u32,
}

impl SchedulerState {
    fn insert(&mut self, origin: SurfacePoint, destination: SurfacePoint, label: Option<String>) -> TraceId {
        let id = TraceId::new(self.next_id);
        self.next_id += 1;
        let mut trace = Trace::new(id, origin, destination, &self.grid);
        trace.label = label;
        tracing::debug!(
            trace = %id,
            origin = %trace.origin_cell,
            destination = %trace.destination_cell,
            priority = trace.priority_distance,
            "trace registered"
        );
        self.traces.insert(id, trace);
        id
    }

    /// Pending traces, longest first, ties by registration order.
    fn pending_in_priority_order(&self) -> Vec<TraceId> {
        let mut pending: Vec<&Trace> = self
            .traces
            .values()
            .filter(|trace| trace.state == TraceState::Pending)
            .collect();
        pending.sort_by(|a, b| {
            b.priority_distance
                .total_cmp(&a.priority_distance)
                .then(a.id.cmp(&b.id))
        });
        pending.into_iter().map(|trace| trace.id).collect()
    }

    /// One router invocation. `can_retry` is false on the trace's last attempt of the
    /// pass, when tearing down a blocker would only free cells nobody claims.
    fn attempt(&mut self, id: TraceId, can_retry: bool, config: &RouterConfig) -> Result<Attempt> {
        let mut trace = self.traces.remove(&id).ok_or(RouteError::UnknownTrace(id))?;
        let result = self.walk_and_resolve(&mut trace, can_retry, config);
        self.traces.insert(id, trace);
        result
    }

    fn walk_and_resolve(
        &mut self,
        trace: &mut Trace,
        can_retry: bool,
        config: &RouterConfig,
    ) -> Result<Attempt> {
        let outcome = TraceRouter::new(&mut self.grid, config.leg_budget).route(trace)?;
        match outcome {
            WalkOutcome::Routed => {
                trace.state = TraceState::Routed;
                tracing::info!(
                    trace = %trace.display_name(),
                    points = trace.path_points.len(),
                    cells = trace.claimed_cells.len(),
                    "trace routed"
                );
                Ok(Attempt::Routed)
            }
            WalkOutcome::Failed(reason) => {
                self.fail(trace, reason, config);
                Ok(Attempt::Failed)
            }
            WalkOutcome::Stuck { at, blocker } => {
                match ConflictResolver.resolve(trace, blocker, &self.traces) {
                    Resolution::Destroy(victim) if !can_retry => {
                        tracing::debug!(
                            trace = %trace.id,
                            blocker = %victim,
                            at = %at,
                            "no attempts left, blocker kept"
                        );
                        self.fail(trace, FailureReason::AttemptsExhausted, config);
                        Ok(Attempt::Failed)
                    }
                    Resolution::Destroy(victim) => {
                        self.destroy(victim)?;
                        trace.destroy(&mut self.grid);
                        tracing::warn!(
                            trace = %trace.display_name(),
                            destroyed = %victim,
                            at = %at,
                            "tore down blocking trace"
                        );
                        Ok(Attempt::Conflict { destroyed: victim })
                    }
                    Resolution::Unresolved => {
                        let err = RouteError::UnresolvedDeadlock { at, blocker };
                        tracing::debug!(trace = %trace.id, "{}", err);
                        self.fail(trace, FailureReason::UnresolvedDeadlock, config);
                        Ok(Attempt::Failed)
                    }
                }
            }
        }
    }

    fn fail(&mut self, trace: &mut Trace, reason: FailureReason, config: &RouterConfig) {
        trace.state = TraceState::Failed(reason);
        let released = if config.release_failed_cells {
            trace.release_cells(&mut self.grid)
        } else {
            0
        };
        tracing::warn!(
            trace = %trace.display_name(),
            reason = %reason,
            released,
            "trace failed"
        );
    }

    fn destroy(&mut self, id: TraceId) -> Result<usize> {
        let trace = self.traces.get_mut(&id).ok_or(RouteError::UnknownTrace(id))?;
        Ok(trace.destroy(&mut self.grid))
    }
}

/// Owns every trace and the shared grid. Shared by reference; all access goes through an
/// internal lock.
pub struct RouteScheduler {
    config: RouterConfig,
    state: Mutex<SchedulerState>,
}

impl RouteScheduler {
    pub fn new(grid: OccupancyGrid, config: RouterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SchedulerState {
                grid,
                traces: BTreeMap::new(),
                next_id: 0,
            }),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, SchedulerState>> {
        self.state.lock().map_err(|_| RouteError::LockPoisoned)
    }

    /// Register a new pending trace. Nothing is routed until [`Self::route_all`].
    pub fn register_trace(&self, origin: SurfacePoint, destination: SurfacePoint) -> Result<TraceId> {
        Ok(self.lock()?.insert(origin, destination, None))
    }

    pub fn register_labeled(
        &self,
        label: impl Into<String>,
        origin: SurfacePoint,
        destination: SurfacePoint,
    ) -> Result<TraceId> {
        Ok(self.lock()?.insert(origin, destination, Some(label.into())))
    }

    /// Register between two anchors, resolving their surface positions first.
    pub fn register_anchors<A, B>(&self, origin: &A, destination: &B) -> Result<TraceId>
    where
        A: SurfaceAnchor + ?Sized,
        B: SurfaceAnchor + ?Sized,
    {
        self.register_trace(origin.surface_position(), destination.surface_position())
    }

    /// Register between two grid cells, using their surface positions as endpoints.
    pub fn register_cells(&self, origin: Point, destination: Point) -> Result<TraceId> {
        let mut state = self.lock()?;
        let origin = state.grid.to_surface(origin);
        let destination = state.grid.to_surface(destination);
        Ok(state.insert(origin, destination, None))
    }

    /// Route every pending trace.
    ///
    /// Pending traces are attempted longest first. A trace that tears down a blocker is
    /// retried immediately, and the torn down trace goes to the back of the queue. Each
    /// trace gets at most `max_attempts` router invocations per pass. A trace stuck on its
    /// last one fails as `AttemptsExhausted` without tearing anything down, and so does a
    /// trace torn down after using them all. Routed and failed traces are left alone, so a
    /// second pass with no new registrations changes nothing.
    pub fn route_all(&self) -> Result<RoutingReport> {
        let mut state = self.lock()?;
        let mut report = RoutingReport::new(Utc::now());

        let order = state.pending_in_priority_order();
        tracing::info!(pending = order.len(), "routing pass started");

        let mut queue: VecDeque<TraceId> = order.into_iter().collect();
        let mut attempts: HashMap<TraceId, u32> = HashMap::new();
        let mut touched: Vec<TraceId> = Vec::new();

        while let Some(id) = queue.pop_front() {
            let Some(trace) = state.traces.get(&id) else {
                continue;
            };
            if trace.state != TraceState::Pending {
                continue;
            }
            if !touched.contains(&id) {
                touched.push(id);
            }

            let used = attempts.entry(id).or_insert(0);
            if *used >= self.config.max_attempts {
                let mut trace = state.traces.remove(&id).ok_or(RouteError::UnknownTrace(id))?;
                state.fail(&mut trace, FailureReason::AttemptsExhausted, &self.config);
                state.traces.insert(id, trace);
                continue;
            }
            *used += 1;
            let can_retry = *used < self.config.max_attempts;
            report.attempts += 1;

            if let Attempt::Conflict { destroyed } = state.attempt(id, can_retry, &self.config)? {
                report.destroyed.push(destroyed);
                queue.push_front(id);
                queue.push_back(destroyed);
            }
        }

        for id in touched {
            match state.traces.get(&id).map(|trace| trace.state) {
                Some(TraceState::Routed) => report.routed.push(id),
                Some(TraceState::Failed(reason)) => report.failed.push((id, reason)),
                _ => {}
            }
        }
        report.finished_at = Utc::now();
        tracing::info!(
            routed = report.routed.len(),
            failed = report.failed.len(),
            destroyed = report.destroyed.len(),
            attempts = report.attempts,
            "routing pass finished"
        );
        Ok(report)
    }

    /// Path of a routed trace. `None` while pending, after failure, or for unknown ids.
    pub fn get_path(&self, id: TraceId) -> Option<Vec<SurfacePoint>> {
        let state = self.state.lock().ok()?;
        let trace = state.traces.get(&id)?;
        trace.is_routed().then(|| trace.path_points.clone())
    }

    /// Best-effort path a failed trace built before it stopped.
    pub fn partial_path(&self, id: TraceId) -> Option<Vec<SurfacePoint>> {
        let state = self.state.lock().ok()?;
        let trace = state.traces.get(&id)?;
        matches!(trace.state, TraceState::Failed(_)).then(|| trace.path_points.clone())
    }

    pub fn trace_state(&self, id: TraceId) -> Option<TraceState> {
        let state = self.state.lock().ok()?;
        state.traces.get(&id).map(|trace| trace.state)
    }

    /// Snapshot of every trace, in registration order.
    pub fn traces(&self) -> Result<Vec<Trace>> {
        Ok(self.lock()?.traces.values().cloned().collect())
    }

    /// Release a trace's cells and forget it.
    pub fn remove(&self, id: TraceId) -> Result<Trace> {
        let mut state = self.lock()?;
        let mut trace = state.traces.remove(&id).ok_or(RouteError::UnknownTrace(id))?;
        trace.release_cells(&mut state.grid);
        Ok(trace)
    }

    /// Put failed traces back to pending so the next pass tries them again.
    pub fn requeue_failed(&self) -> Result<Vec<TraceId>> {
        let mut state = self.lock()?;
        let state = &mut *state;
        let mut requeued = Vec::new();
        for trace in state.traces.values_mut() {
            if matches!(trace.state, TraceState::Failed(_)) {
                trace.destroy(&mut state.grid);
                requeued.push(trace.id);
            }
        }
        Ok(requeued)
    }

    /// Copy of the grid as it stands now.
    pub fn grid_snapshot(&self) -> Result<OccupancyGrid> {
        Ok(self.lock()?.grid.clone())
    }

    /// Cells currently owned by `id` according to the grid.
    pub fn cells_owned_by(&self, id: TraceId) -> Result<Vec<Point>> {
        Ok(self.lock()?.grid.owned_by(id))
    }

    pub fn occupant(&self, cell: Point) -> Result<Occupant> {
        Ok(self.lock()?.grid.occupant(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::OpenBoard;

    fn scheduler() -> RouteScheduler {
        let grid = OccupancyGrid::new(20, 20, 1.0, SurfacePoint::default(), 1, &OpenBoard);
        RouteScheduler::new(grid, RouterConfig::default())
    }

    #[test]
    fn test_register_does_not_route() {
        let scheduler = scheduler();
        let id = scheduler
            .register_cells(Point::new(2, 2), Point::new(2, 10))
            .unwrap();
        assert_eq!(scheduler.trace_state(id), Some(TraceState::Pending));
        assert_eq!(scheduler.get_path(id), None);
        assert!(scheduler.cells_owned_by(id).unwrap().is_empty());
    }

    #[test]
    fn test_pending_order_is_longest_first() {
        let scheduler = scheduler();
        let short = scheduler.register_cells(Point::new(2, 2), Point::new(4, 2)).unwrap();
        let long = scheduler.register_cells(Point::new(2, 4), Point::new(15, 4)).unwrap();
        let tie = scheduler.register_cells(Point::new(2, 6), Point::new(4, 6)).unwrap();

        let order = scheduler.lock().unwrap().pending_in_priority_order();
        assert_eq!(order, vec![long, short, tie]);
    }

    #[test]
    fn test_route_all_reports_and_is_idempotent() {
        let scheduler = scheduler();
        let id = scheduler
            .register_cells(Point::new(2, 2), Point::new(2, 10))
            .unwrap();

        let first = scheduler.route_all().unwrap();
        assert_eq!(first.routed, vec![id]);
        assert_eq!(first.attempts, 1);
        assert!(first.is_clean());

        let second = scheduler.route_all().unwrap();
        assert_eq!(second.attempts, 0);
        assert!(second.routed.is_empty());
        assert_eq!(scheduler.get_path(id).map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_remove_releases_cells() {
        let scheduler = scheduler();
        let id = scheduler
            .register_cells(Point::new(2, 2), Point::new(8, 2))
            .unwrap();
        scheduler.route_all().unwrap();
        assert_eq!(scheduler.cells_owned_by(id).unwrap().len(), 7);

        let removed = scheduler.remove(id).unwrap();
        assert!(removed.claimed_cells.is_empty());
        assert!(scheduler.cells_owned_by(id).unwrap().is_empty());
        assert_eq!(scheduler.trace_state(id), None);
        assert!(matches!(scheduler.remove(id), Err(RouteError::UnknownTrace(_))));
    }

    #[test]
    fn test_failed_trace_keeps_partial_path_and_frees_cells() {
        let grid = OccupancyGrid::new(20, 20, 1.0, SurfacePoint::default(), 1, &OpenBoard);
        let config = RouterConfig {
            leg_budget: 1,
            ..RouterConfig::default()
        };
        let scheduler = RouteScheduler::new(grid, config);
        let id = scheduler
            .register_cells(Point::new(2, 2), Point::new(8, 8))
            .unwrap();
        let report = scheduler.route_all().unwrap();

        assert_eq!(report.failed, vec![(id, FailureReason::BudgetExceeded)]);
        assert_eq!(
            scheduler.trace_state(id),
            Some(TraceState::Failed(FailureReason::BudgetExceeded))
        );
        assert_eq!(scheduler.get_path(id), None);
        assert_eq!(scheduler.partial_path(id).map(|p| p.len()), Some(2));
        assert!(scheduler.cells_owned_by(id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_cells_kept_when_configured() {
        let grid = OccupancyGrid::new(20, 20, 1.0, SurfacePoint::default(), 1, &OpenBoard);
        let config = RouterConfig {
            leg_budget: 1,
            release_failed_cells: false,
            ..RouterConfig::default()
        };
        let scheduler = RouteScheduler::new(grid, config);
        let id = scheduler
            .register_cells(Point::new(2, 2), Point::new(8, 8))
            .unwrap();
        scheduler.route_all().unwrap();
        assert_eq!(scheduler.cells_owned_by(id).unwrap().len(), 7);
    }

    #[test]
    fn test_requeue_failed_returns_to_pending() {
        let grid = OccupancyGrid::new(20, 20, 1.0, SurfacePoint::default(), 1, &OpenBoard);
        let config = RouterConfig {
            leg_budget: 1,
            ..RouterConfig::default()
        };
        let scheduler = RouteScheduler::new(grid, config);
        let id = scheduler
            .register_cells(Point::new(2, 2), Point::new(8, 8))
            .unwrap();
        scheduler.route_all().unwrap();

        assert_eq!(scheduler.requeue_failed().unwrap(), vec![id]);
        assert_eq!(scheduler.trace_state(id), Some(TraceState::Pending));
        assert_eq!(scheduler.partial_path(id), None);
    }

    #[test]
    fn test_last_attempt_keeps_second_blocker() {
        let scheduler = scheduler();
        let first = scheduler.register_cells(Point::new(5, 10), Point::new(5, 14)).unwrap();
        let second = scheduler.register_cells(Point::new(9, 10), Point::new(9, 14)).unwrap();
        scheduler.route_all().unwrap();

        // Runs through both columns; the first teardown uses up the retry.
        let long = scheduler.register_cells(Point::new(2, 12), Point::new(15, 12)).unwrap();
        let report = scheduler.route_all().unwrap();

        assert_eq!(report.destroyed, vec![first]);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.routed, vec![first]);
        assert_eq!(report.failed, vec![(long, FailureReason::AttemptsExhausted)]);

        assert!(scheduler.cells_owned_by(long).unwrap().is_empty());
        assert_eq!(scheduler.cells_owned_by(first).unwrap().len(), 5);
        assert_eq!(scheduler.cells_owned_by(second).unwrap().len(), 5);
        assert_eq!(scheduler.trace_state(second), Some(TraceState::Routed));
        let partial = scheduler.partial_path(long).unwrap();
        assert_eq!(partial.last(), Some(&SurfacePoint::new(8.0, 12.0)));
    }

    #[test]
    fn test_single_attempt_never_tears_down() {
        let grid = OccupancyGrid::new(20, 20, 1.0, SurfacePoint::default(), 1, &OpenBoard);
        let config = RouterConfig {
            max_attempts: 1,
            ..RouterConfig::default()
        };
        let scheduler = RouteScheduler::new(grid, config);
        let short = scheduler.register_cells(Point::new(5, 10), Point::new(5, 14)).unwrap();
        scheduler.route_all().unwrap();

        let long = scheduler.register_cells(Point::new(2, 12), Point::new(9, 12)).unwrap();
        let report = scheduler.route_all().unwrap();

        assert!(report.destroyed.is_empty());
        assert_eq!(report.attempts, 1);
        assert!(report.routed.is_empty());
        assert_eq!(report.failed, vec![(long, FailureReason::AttemptsExhausted)]);
        assert_eq!(scheduler.trace_state(short), Some(TraceState::Routed));
        assert_eq!(scheduler.cells_owned_by(short).unwrap().len(), 5);
        assert!(scheduler.cells_owned_by(long).unwrap().is_empty());
    }
}
