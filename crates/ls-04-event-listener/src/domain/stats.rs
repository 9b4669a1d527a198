//! Listener counters.

use serde::{Deserialize, Serialize};
use shared_types::BlockHeight;

/// Running totals since the listener was created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStats {
    pub events_applied: u64,
    pub events_staged: u64,
    pub duplicates: u64,
    /// Events the processor refused; logged and skipped.
    pub failed: u64,
    pub reorgs: u64,
    pub batches: u64,
    pub poll_failures: u64,
    pub last_processed_block: BlockHeight,
}

/// Outcome of one catch-up run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CatchUpReport {
    /// Head observed at the start of the run.
    pub head: BlockHeight,
    pub batches: u64,
    pub events: u64,
}
