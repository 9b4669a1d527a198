//! # Event Processor Configuration

use serde::{Deserialize, Serialize};

/// Blocks after which a checkpoint is considered reorg-safe.
pub const DEFAULT_ROLLBACK_WINDOW: u64 = 10;

/// Schema version stamped on every stored event.
pub const EVENT_VERSION: u32 = 1;

/// Event processor configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// A checkpoint at height `H` is finalized once a confirmed event at
    /// `H + rollback_window` or higher has been ingested.
    pub rollback_window: u64,

    /// Version stamped on ledger, staging and aggregate rows.
    pub event_version: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            rollback_window: DEFAULT_ROLLBACK_WINDOW,
            event_version: EVENT_VERSION,
        }
    }
}

impl ProcessorConfig {
    /// Create a config for testing (short rollback window).
    pub fn for_testing() -> Self {
        Self {
            rollback_window: 3,
            event_version: EVENT_VERSION,
        }
    }
}
