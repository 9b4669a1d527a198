//! Driving port: the processor API.

use crate::domain::{
    Bid, Checkpoint, Escrow, HashChainReport, IncomingEvent, IngestReceipt, LedgerEvent, Payment,
    ProcessorResult, ReorgRecord, Rfq, RfqSnapshot, StagingEvent,
};
use async_trait::async_trait;
use shared_types::BlockHeight;

/// Event processor API.
#[async_trait]
pub trait EventProcessorApi: Send + Sync {
    /// Ingest one event exactly once.
    async fn ingest(&self, event: IncomingEvent) -> ProcessorResult<IngestReceipt>;

    /// Roll back to the checkpoint at `fork_height` after the ledger
    /// replaced the blocks above it.
    async fn handle_reorg(
        &self,
        fork_height: BlockHeight,
        new_hash: &str,
    ) -> ProcessorResult<ReorgRecord>;

    /// Finalize every checkpoint at or below `head - rollback_window`.
    /// Returns the heights finalized, ascending.
    async fn finalize_checkpoints(&self, head: BlockHeight) -> ProcessorResult<Vec<BlockHeight>>;

    async fn latest_checkpoint(&self) -> ProcessorResult<Option<Checkpoint>>;

    async fn checkpoints(&self) -> ProcessorResult<Vec<Checkpoint>>;

    /// Recompute and check every link of the event log.
    async fn verify_hash_chain(&self) -> ProcessorResult<HashChainReport>;

    /// Rebuild one RFQ purely from its logged events.
    async fn reconstruct_rfq(&self, rfq_id: &str) -> ProcessorResult<RfqSnapshot>;

    /// Confirmed events at or above `height`, replay order.
    async fn confirmed_events_since(&self, height: BlockHeight)
        -> ProcessorResult<Vec<LedgerEvent>>;

    async fn ledger_event_count(&self) -> ProcessorResult<usize>;

    async fn staging_events(&self) -> ProcessorResult<Vec<StagingEvent>>;

    async fn reorg_history(&self) -> ProcessorResult<Vec<ReorgRecord>>;

    async fn get_rfq(&self, rfq_id: &str) -> ProcessorResult<Option<Rfq>>;

    async fn get_bid(&self, bid_id: &str) -> ProcessorResult<Option<Bid>>;

    async fn get_escrow(&self, rfq_id: &str) -> ProcessorResult<Option<Escrow>>;

    async fn get_payments(&self, rfq_id: &str) -> ProcessorResult<Vec<Payment>>;
}
