//! Conflict resolution for stuck walks.
//!
//! A walk that stops making progress has run into something from two directions. If that
//! something is another trace the stuck trace outranks, the blocker is torn down and the
//! stuck trace gets another attempt. Obstacles, missing blockers, and higher ranked traces
//! cannot be moved, so the stuck trace fails instead.

use std::collections::BTreeMap;

use crate::grid::Occupant;
use crate::trace::{Trace, TraceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Destroy this trace and retry the stuck one.
    Destroy(TraceId),
    Unresolved,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn resolve(
        &self,
        stuck: &Trace,
        blocker: Option<Occupant>,
        traces: &BTreeMap<TraceId, Trace>,
    ) -> Resolution {
        let Some(Occupant::OwnedBy(owner)) = blocker else {
            return Resolution::Unresolved;
        };
        if owner == stuck.id {
            return Resolution::Unresolved;
        }
        match traces.get(&owner) {
            Some(victim) if stuck.outranks(victim) => Resolution::Destroy(owner),
            Some(victim) => {
                tracing::debug!(
                    stuck = %stuck.id,
                    blocker = %victim.id,
                    "blocker outranks stuck trace"
                );
                Resolution::Unresolved
            }
            // Ownership with no registered trace behind it; nothing to tear down.
            None => Resolution::Unresolved,
        }
    }
}
