//! Driven port: durable transaction record storage.
//!
//! The store owns two indexes: a unique one on `idempotency_key` and a
//! non-unique one on `canonical_key`. A third unique index on `external_ref`
//! is filled as records are submitted.

use crate::domain::{TrackedTransaction, TrackerResult, TxStatus};
use async_trait::async_trait;

/// Transactional record storage.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert `record` unless its idempotency key is already present.
    ///
    /// Returns the stored record and `true` if this call inserted it.
    async fn insert_if_absent(
        &self,
        record: TrackedTransaction,
    ) -> TrackerResult<(TrackedTransaction, bool)>;

    async fn get_by_idempotency_key(&self, key: &str) -> TrackerResult<Option<TrackedTransaction>>;

    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> TrackerResult<Option<TrackedTransaction>>;

    /// All attempts of one logical action, newest first.
    async fn list_by_canonical_key(
        &self,
        canonical_key: &str,
    ) -> TrackerResult<Vec<TrackedTransaction>>;

    /// All records in any of `statuses`, oldest first.
    async fn list_by_status(&self, statuses: &[TxStatus]) -> TrackerResult<Vec<TrackedTransaction>>;

    /// Replace the stored record if its revision is still `expected_revision`.
    ///
    /// The caller has already bumped `record.revision`. Fails with
    /// `ConcurrentModification` if another write landed in between, and with
    /// `DuplicateExternalRef` if the ref belongs to another attempt. Nothing
    /// is written on failure.
    async fn compare_and_swap(
        &self,
        record: &TrackedTransaction,
        expected_revision: u64,
    ) -> TrackerResult<()>;
}
