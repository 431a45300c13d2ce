//! Error types for the trace router.

use thiserror::Error;

use crate::grid::Occupant;
use crate::point::Point;
use crate::trace::TraceId;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RouteError>;

#[derive(Debug, Error)]
pub enum RouteError {
    /// A walk would leave the grid or enter the reserved border.
    #[error("cell ({cell}) is outside the routable area")]
    OutOfBounds { cell: Point },

    /// Stuck with nothing that can be torn down.
    #[error("trace stuck at ({at}) with no removable blocker ({blocker:?})")]
    UnresolvedDeadlock { at: Point, blocker: Option<Occupant> },

    #[error("cell ({cell}) is already {occupant:?}")]
    CellOccupied { cell: Point, occupant: Occupant },

    #[error("unknown trace {0}")]
    UnknownTrace(TraceId),

    #[error("route scheduler lock poisoned")]
    LockPoisoned,

    #[error("invalid router config: {0}")]
    InvalidConfig(String),
}
