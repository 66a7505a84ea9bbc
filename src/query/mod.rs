//! Adaptive frustum queries over the enabled trees.
//!
//! A [`FrustumQuerier`] walks every enabled tree from its root, fetching nodes that
//! are inside the view frustum and still too coarse for the resolution threshold.
//! Each pass is a *generation*; starting a new one cancels the requests of the
//! previous one and adapts the threshold so completed passes settle around the
//! configured node budget.

mod config;
mod engine;
mod observer;
mod traversal;

pub use config::{ConfigError, QueryConfig};
pub use engine::FrustumQuerier;
pub use observer::{QueryEvent, QueryObserver, QuerySnapshot};

use crate::metadata::TreeInfo;
use glam::DMat4;
use std::fmt;

/// Token of one traversal pass. Strictly increasing per querier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a generation was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    /// New view or tree set from the caller.
    External,
    /// The last pass finished well under budget; try finer detail.
    Refine,
    /// The last pass blew the budget; retry coarser.
    Coarsen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryState {
    /// No generation started yet.
    Idle,
    /// Requests of the live generation are still in flight.
    Running,
    /// Everything arrived; the remaining queue is being processed.
    Draining,
    /// The live generation was aborted (budget exceeded or cancelled).
    Interrupted,
    Completed,
}

/// Inputs of a frustum query.
#[derive(Clone, Debug)]
pub struct FrustumQuery {
    /// Projection the clip planes are extracted from.
    pub projection: DMat4,
    /// World to camera transform.
    pub view: DMat4,
    pub trees: Vec<TreeInfo>,
    /// Base feature size per unit of camera distance (e.g. one pixel's footprint
    /// at distance 1). The querier scales it to keep the node count on budget.
    pub resolution: f64,
}

/// Counters accumulated over the querier's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub generations: u64,
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_only_skips: u64,
    pub failures: u64,
    pub cancelled: u64,
    pub stale_discarded: u64,
    pub budget_aborts: u64,
}
