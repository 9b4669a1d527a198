//! Driving port: the nonce API used by the caller layer.

use crate::domain::{NonceAction, NonceResult, NonceValidation, ObservedNonces};
use async_trait::async_trait;

/// Nonce manager API.
#[async_trait]
pub trait NonceManagerApi: Send + Sync {
    /// Nonce a new action must present (`stored + 1`).
    async fn get_next_nonce(&self, actor: &str, action: NonceAction) -> NonceResult<u64>;

    /// Last nonce consumed on the ledger.
    async fn current_nonce(&self, actor: &str, action: NonceAction) -> NonceResult<u64>;

    /// Check a caller-provided nonce against `stored + 1`.
    async fn validate(
        &self,
        actor: &str,
        action: NonceAction,
        provided: u64,
    ) -> NonceResult<NonceValidation>;

    /// Consume one nonce. Only call after the action is CONFIRMED.
    async fn increment(&self, actor: &str, action: NonceAction) -> NonceResult<u64>;

    /// Consume one nonce on behalf of a confirmed attempt.
    ///
    /// Returns `None` if this attempt already consumed its nonce.
    async fn increment_confirmed(
        &self,
        actor: &str,
        action: NonceAction,
        idempotency_key: &str,
    ) -> NonceResult<Option<u64>>;

    /// Overwrite local counters with ledger-observed values.
    async fn sync_from_chain(&self, actor: &str, observed: ObservedNonces) -> NonceResult<()>;
}
