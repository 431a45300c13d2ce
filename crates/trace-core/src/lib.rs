//! Orthogonal trace routing on a shared occupancy grid.
//!
//! Traces connect pairs of anchors on a board with axis-aligned legs. Each trace is walked
//! greedily, alternating horizontal and vertical legs, claiming grid cells as it goes.
//! When a walk gets stuck against a trace it outranks, that trace is torn down and routed
//! again later in the same pass.

pub mod config;
pub mod conflict;
pub mod error;
pub mod grid;
pub mod obstacles;
pub mod point;
pub mod projection;
pub mod router;
pub mod scheduler;
pub mod trace;

pub use config::RouterConfig;
pub use conflict::{ConflictResolver, Resolution};
pub use error::{Result, RouteError};
pub use grid::{BoardBounds, OccupancyGrid, Occupant};
pub use obstacles::{CellSample, ObstacleRect, ObstacleSampler, OpenBoard, RectObstacles};
pub use point::{Axis, Point, SurfacePoint};
pub use projection::{Frame, FrameChain, SurfaceAnchor};
pub use router::{path_length, Leg, LegStop, TraceRouter, WalkOutcome};
pub use scheduler::{RouteScheduler, RoutingReport};
pub use trace::{FailureReason, Trace, TraceId, TraceState};
