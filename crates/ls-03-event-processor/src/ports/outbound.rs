//! Driven port: transactional record store.
//!
//! All writes for one ingestion (log append, business mutation, staging
//! delete, checkpoint upsert) happen inside one [`EventStore::transaction`]
//! call and commit or roll back together.

use crate::domain::{
    BusinessState, Checkpoint, EventKey, LedgerEvent, Payment, ProcessorResult, ReorgRecord,
    StagingEvent,
};
use async_trait::async_trait;
use shared_types::BlockHeight;

/// Record store with atomic multi-record transactions.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Run `f` against a transaction. Commits if `f` returns `Ok`, discards
    /// every write otherwise.
    async fn transaction<T, F>(&self, f: F) -> ProcessorResult<T>
    where
        T: Send,
        F: FnOnce(&mut dyn EventTxn) -> ProcessorResult<T> + Send;

    /// Run a read-only `f` against a consistent view.
    async fn read<T, F>(&self, f: F) -> ProcessorResult<T>
    where
        T: Send,
        F: FnOnce(&dyn EventTxn) -> ProcessorResult<T> + Send;
}

/// Record access inside a store transaction.
pub trait EventTxn: BusinessState {
    // Ledger event log
    fn ledger_event(&self, key: &EventKey) -> Option<LedgerEvent>;
    /// Entry with the highest sequence.
    fn ledger_tail(&self) -> Option<LedgerEvent>;
    /// Whole log in sequence order.
    fn ledger_events(&self) -> Vec<LedgerEvent>;
    fn ledger_events_for_rfq(&self, rfq_id: &str) -> Vec<LedgerEvent>;
    fn ledger_events_since(&self, height: BlockHeight) -> Vec<LedgerEvent>;
    fn next_sequence(&mut self) -> u64;
    /// Insert, or overwrite the entry with the same key.
    fn put_ledger_event(&mut self, event: LedgerEvent);
    /// Remove and return every entry above `height`.
    fn delete_ledger_events_above(&mut self, height: BlockHeight) -> Vec<LedgerEvent>;

    // Staging
    fn staging_event(&self, key: &EventKey) -> Option<StagingEvent>;
    fn staging_events(&self) -> Vec<StagingEvent>;
    fn put_staging_event(&mut self, event: StagingEvent);
    fn delete_staging_event(&mut self, key: &EventKey) -> bool;
    /// Remove and return every staging row above `height`.
    fn delete_staging_events_above(&mut self, height: BlockHeight) -> Vec<StagingEvent>;
    /// Remove and return every staging row at or below `height`.
    fn delete_staging_events_through(&mut self, height: BlockHeight) -> Vec<StagingEvent>;

    // Checkpoints
    fn checkpoint(&self, height: BlockHeight) -> Option<Checkpoint>;
    /// All checkpoints, ascending height.
    fn checkpoints(&self) -> Vec<Checkpoint>;
    fn put_checkpoint(&mut self, checkpoint: Checkpoint);
    fn delete_checkpoints_above(&mut self, height: BlockHeight) -> Vec<Checkpoint>;

    // Business state maintenance
    /// Remove the RFQ and its bids, escrow and payments.
    fn drop_rfq_state(&mut self, rfq_id: &str);
    fn payments_for(&self, rfq_id: &str) -> Vec<Payment>;

    // Reorg audit
    fn push_reorg(&mut self, record: ReorgRecord);
    fn reorgs(&self) -> Vec<ReorgRecord>;
}
