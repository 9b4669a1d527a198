//! Driving port: the tracker API.

use crate::domain::{
    ErrorClass, ExpirySweep, Rejection, RetryTicket, TrackedTransaction, TrackerResult, TxStatus,
    TxStatusEntry,
};
use async_trait::async_trait;
use shared_types::{ActionDescriptor, BlockHeight};
use std::time::Duration;

/// Transaction tracker API.
///
/// Every `mark_*` call either applies one state-machine move or fails
/// without writing.
#[async_trait]
pub trait TransactionTrackerApi: Send + Sync {
    /// Create a PREPARED attempt, or return the existing one for this key.
    async fn prepare(
        &self,
        action: &ActionDescriptor,
        canonical_key: &str,
        idempotency_key: &str,
        ttl: Option<Duration>,
    ) -> TrackerResult<TrackedTransaction>;

    /// PREPARED -> SUBMITTED.
    async fn mark_submitted(
        &self,
        idempotency_key: &str,
        external_ref: &str,
        raw: Option<serde_json::Value>,
    ) -> TrackerResult<TrackedTransaction>;

    /// SUBMITTED -> CONFIRMED, looked up by ledger reference.
    async fn mark_confirmed(
        &self,
        external_ref: &str,
        block_height: BlockHeight,
        block_hash: &str,
        raw: Option<serde_json::Value>,
    ) -> TrackerResult<TrackedTransaction>;

    /// SUBMITTED -> REJECTED.
    async fn mark_rejected(
        &self,
        idempotency_key: &str,
        rejection: Rejection,
        raw: Option<serde_json::Value>,
    ) -> TrackerResult<TrackedTransaction>;

    /// PREPARED | SUBMITTED -> EXPIRED.
    async fn mark_expired(&self, idempotency_key: &str) -> TrackerResult<TrackedTransaction>;

    /// PREPARED -> EXPIRED for an attempt the caller gave up on before
    /// broadcast (e.g. the wallet refused to sign). Keeps the error.
    async fn mark_abandoned(
        &self,
        idempotency_key: &str,
        rejection: Rejection,
    ) -> TrackerResult<TrackedTransaction>;

    async fn can_retry(&self, idempotency_key: &str) -> TrackerResult<bool>;

    /// Fallback classification for unclassified error text.
    fn classify_error(&self, message: &str) -> ErrorClass;

    /// Expire every active attempt past `expires_at`.
    async fn expire_old_transactions(&self) -> TrackerResult<ExpirySweep>;

    async fn get_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> TrackerResult<Option<TrackedTransaction>>;

    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> TrackerResult<Option<TrackedTransaction>>;

    /// All attempts of one logical action, newest first.
    async fn get_by_canonical_key(
        &self,
        canonical_key: &str,
    ) -> TrackerResult<Vec<TrackedTransaction>>;

    async fn list_by_status(&self, statuses: &[TxStatus]) -> TrackerResult<Vec<TrackedTransaction>>;

    /// True if a PREPARED or SUBMITTED attempt exists for this action.
    async fn has_active_attempt(&self, canonical_key: &str) -> TrackerResult<bool>;

    /// Bump `retry_count` and stamp `last_retry_at`.
    async fn increment_retry(&self, idempotency_key: &str) -> TrackerResult<TrackedTransaction>;

    /// Check `can_retry`, count the retry and hand out the next attempt key.
    async fn begin_retry(&self, idempotency_key: &str) -> TrackerResult<RetryTicket>;

    /// Status of up to `max_batch_status` attempts, in request order.
    async fn batch_status(&self, keys: &[String]) -> TrackerResult<Vec<(String, TxStatusEntry)>>;

    /// Stamp `last_reconciled_at` and bump `reconcile_attempts`.
    async fn record_reconciliation(
        &self,
        idempotency_key: &str,
    ) -> TrackerResult<TrackedTransaction>;
}
