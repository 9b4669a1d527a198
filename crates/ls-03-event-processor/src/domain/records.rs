//! Durable records owned by the event processor.

use super::events::{ContractEvent, EventKey, EventKind};
use serde::{Deserialize, Serialize};
use shared_types::{BlockHeight, Timestamp};

/// Immutable log entry for a confirmed event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Append order. Also the hash chain order.
    pub sequence: u64,
    pub key: EventKey,
    pub kind: EventKind,
    pub rfq_id: String,
    pub event: ContractEvent,
    pub block_height: BlockHeight,
    pub block_hash: String,
    pub event_version: u32,
    pub processed_at: Timestamp,
    /// `event_hash` of the previous log entry; `None` for the first.
    pub previous_hash: Option<String>,
    pub event_hash: String,
}

impl LedgerEvent {
    /// Replay order: `(block_height, event_index)`, append order on ties.
    pub fn replay_order(&self) -> (BlockHeight, u32, u64) {
        (self.block_height, self.key.event_index, self.sequence)
    }
}

/// Mirror of an unconfirmed event. Never drives business state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEvent {
    pub key: EventKey,
    pub kind: EventKind,
    pub event: ContractEvent,
    pub block_height: BlockHeight,
    pub block_hash: String,
    pub event_version: u32,
    pub staged_at: Timestamp,
}

/// Ingestion progress marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block_height: BlockHeight,
    pub block_hash: String,
    /// Past the rollback window; reorgs at or below are refused.
    pub finalized: bool,
    pub created_at: Timestamp,
}

/// Audit entry for a handled reorg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgRecord {
    /// Last height kept.
    pub fork_height: BlockHeight,
    /// Checkpointed hash at the fork height, if any.
    pub fork_hash: Option<String>,
    /// Height where the conflicting hash was observed.
    pub detected_height: BlockHeight,
    pub old_hash: Option<String>,
    pub new_hash: String,
    pub events_rolled_back: usize,
    pub rfqs_rebuilt: usize,
    pub checkpoints_dropped: usize,
    /// Unconfirmed rows above the fork, discarded with it.
    pub staging_dropped: usize,
    pub recovered_at: Timestamp,
}

/// What one ingestion did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Pending event written to staging.
    Staged,
    /// Confirmed event logged and applied.
    Applied { sequence: u64 },
    /// Key already ingested; nothing written.
    Duplicate,
}

/// Result of one ingestion, with the rollback it triggered, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReceipt {
    pub outcome: IngestOutcome,
    pub reorg: Option<ReorgRecord>,
}

impl IngestReceipt {
    pub fn new(outcome: IngestOutcome) -> Self {
        Self {
            outcome,
            reorg: None,
        }
    }
}

/// Result of a hash chain verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashChainReport {
    pub valid: bool,
    pub total_events: usize,
    /// Keys of entries whose hash or link does not verify.
    pub invalid_events: Vec<String>,
}
