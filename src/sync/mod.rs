//! Data Synchronization
//!
//! Keeps the local cache consistent with the remote store: per-entity
//! reconciliation, bulk full-state passes, and the periodic scheduler that
//! drives them in the background.

pub mod engine;
pub mod reconcile;
pub mod scheduler;

use serde::Serialize;

pub use engine::SyncEngine;
pub use scheduler::SyncScheduler;

/// Terminal outcome of one bulk synchronization pass.
///
/// A pass aborts only when the store is unreachable or reports its database
/// disconnected; individual entity failures are recorded per entity and do
/// not fail the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassOutcome {
    Success,
    Aborted,
}

/// Report for one bulk synchronization pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub outcome: PassOutcome,
    /// Reconciliation tasks dispatched, in dispatch order.
    pub tasks: Vec<String>,
    /// Tasks that reported failure.
    pub failed: usize,
    /// Previously pending entities that this pass resolved.
    pub resolved: usize,
}

impl PassReport {
    /// Report for a pass that never reached the entity stage.
    pub fn aborted() -> Self {
        Self {
            outcome: PassOutcome::Aborted,
            tasks: Vec::new(),
            failed: 0,
            resolved: 0,
        }
    }

    pub fn attempted(&self) -> usize {
        self.tasks.len()
    }
}
