//! Transaction Tracker Service
//!
//! Owns every write to tracked transaction records. Each write is a
//! read, a check on a private copy, and a compare-and-swap against the
//! revision that was read. A lost race re-reads and re-checks.

use crate::config::TrackerConfig;
use crate::domain::{
    classify_error, ErrorClass, ExpirySweep, Rejection, RetryTicket, TrackedTransaction,
    TrackerError, TrackerResult, TxStatus, TxStatusEntry,
};
use crate::ports::{TransactionStore, TransactionTrackerApi};
use async_trait::async_trait;
use shared_types::{ActionDescriptor, BlockHeight, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read-check-swap rounds before a contended write gives up.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Transaction tracker over an injected store and clock.
pub struct TransactionTracker<S: TransactionStore> {
    store: Arc<S>,
    clock: Arc<dyn TimeSource>,
    config: TrackerConfig,
}

impl<S: TransactionStore> TransactionTracker<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn TimeSource>, config: TrackerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    async fn load(&self, idempotency_key: &str) -> TrackerResult<TrackedTransaction> {
        self.store
            .get_by_idempotency_key(idempotency_key)
            .await?
            .ok_or_else(|| TrackerError::not_found(idempotency_key))
    }

    /// Apply `change` to a fresh copy of the record and swap it in.
    ///
    /// `change` runs again on every re-read, so its checks always see the
    /// latest committed record.
    async fn update<F>(&self, idempotency_key: &str, change: F) -> TrackerResult<TrackedTransaction>
    where
        F: Fn(&mut TrackedTransaction) -> TrackerResult<()> + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let mut updated = self.load(idempotency_key).await?;
            let expected_revision = updated.revision;
            change(&mut updated)?;
            updated.revision = expected_revision + 1;

            match self.store.compare_and_swap(&updated, expected_revision).await {
                Ok(()) => return Ok(updated),
                Err(TrackerError::ConcurrentModification { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(
                        idempotency_key = idempotency_key,
                        attempt = attempt,
                        "[ls-02] Write raced, re-reading"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn resolve_class(rejection: &Rejection) -> ErrorClass {
        rejection
            .error_class
            .unwrap_or_else(|| classify_error(&rejection.error))
    }
}

fn require_non_empty(name: &str, value: &str) -> TrackerResult<()> {
    if value.trim().is_empty() {
        return Err(TrackerError::InvalidArgument {
            reason: format!("{name} must not be empty"),
        });
    }
    Ok(())
}

#[async_trait]
impl<S: TransactionStore + 'static> TransactionTrackerApi for TransactionTracker<S> {
    async fn prepare(
        &self,
        action: &ActionDescriptor,
        canonical_key: &str,
        idempotency_key: &str,
        ttl: Option<Duration>,
    ) -> TrackerResult<TrackedTransaction> {
        require_non_empty("idempotency_key", idempotency_key)?;
        require_non_empty("canonical_key", canonical_key)?;

        let ttl_ms = ttl
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(self.config.default_ttl_ms);
        let record = TrackedTransaction::prepared(
            action,
            canonical_key,
            idempotency_key,
            self.clock.now(),
            ttl_ms,
            self.config.max_retries,
        );

        let (stored, inserted) = self.store.insert_if_absent(record).await?;
        if inserted {
            info!(
                idempotency_key = idempotency_key,
                canonical_key = canonical_key,
                transition = %stored.transition_name,
                "[ls-02] Prepared transaction"
            );
        } else {
            debug!(
                idempotency_key = idempotency_key,
                status = %stored.status,
                "[ls-02] Prepare replayed, returning existing record"
            );
        }
        Ok(stored)
    }

    async fn mark_submitted(
        &self,
        idempotency_key: &str,
        external_ref: &str,
        raw: Option<serde_json::Value>,
    ) -> TrackerResult<TrackedTransaction> {
        require_non_empty("external_ref", external_ref)?;
        let now = self.clock.now();
        let updated = self
            .update(idempotency_key, |tx| {
                tx.transition_to(TxStatus::Submitted, now)?;
                tx.external_ref = Some(external_ref.to_string());
                if raw.is_some() {
                    tx.raw_response = raw.clone();
                }
                Ok(())
            })
            .await?;
        info!(
            idempotency_key = idempotency_key,
            external_ref = external_ref,
            "[ls-02] Transaction submitted"
        );
        Ok(updated)
    }

    async fn mark_confirmed(
        &self,
        external_ref: &str,
        block_height: BlockHeight,
        block_hash: &str,
        raw: Option<serde_json::Value>,
    ) -> TrackerResult<TrackedTransaction> {
        let idempotency_key = self
            .store
            .get_by_external_ref(external_ref)
            .await?
            .ok_or_else(|| TrackerError::not_found(external_ref))?
            .idempotency_key;
        let now = self.clock.now();
        let updated = self
            .update(&idempotency_key, |tx| {
                tx.transition_to(TxStatus::Confirmed, now)?;
                tx.block_height = Some(block_height);
                tx.block_hash = Some(block_hash.to_string());
                if raw.is_some() {
                    tx.raw_response = raw.clone();
                }
                Ok(())
            })
            .await?;
        info!(
            idempotency_key = %updated.idempotency_key,
            external_ref = external_ref,
            block_height = block_height,
            "[ls-02] Transaction confirmed"
        );
        Ok(updated)
    }

    async fn mark_rejected(
        &self,
        idempotency_key: &str,
        rejection: Rejection,
        raw: Option<serde_json::Value>,
    ) -> TrackerResult<TrackedTransaction> {
        let class = Self::resolve_class(&rejection);
        let now = self.clock.now();
        let updated = self
            .update(idempotency_key, |tx| {
                tx.transition_to(TxStatus::Rejected, now)?;
                tx.error = Some(rejection.error.clone());
                tx.error_code = Some(rejection.error_code);
                tx.error_class = Some(class);
                if raw.is_some() {
                    tx.raw_response = raw.clone();
                }
                Ok(())
            })
            .await?;
        warn!(
            idempotency_key = idempotency_key,
            error = %rejection.error,
            error_class = ?class,
            "[ls-02] Transaction rejected"
        );
        Ok(updated)
    }

    async fn mark_expired(&self, idempotency_key: &str) -> TrackerResult<TrackedTransaction> {
        let now = self.clock.now();
        let updated = self
            .update(idempotency_key, |tx| tx.transition_to(TxStatus::Expired, now))
            .await?;
        info!(idempotency_key = idempotency_key, "[ls-02] Transaction expired");
        Ok(updated)
    }

    async fn mark_abandoned(
        &self,
        idempotency_key: &str,
        rejection: Rejection,
    ) -> TrackerResult<TrackedTransaction> {
        let class = Self::resolve_class(&rejection);
        let now = self.clock.now();
        let updated = self
            .update(idempotency_key, |tx| {
                if tx.status != TxStatus::Prepared {
                    return Err(TrackerError::InvalidTransition {
                        from: tx.status,
                        to: TxStatus::Expired,
                    });
                }
                tx.transition_to(TxStatus::Expired, now)?;
                tx.error = Some(rejection.error.clone());
                tx.error_code = Some(rejection.error_code);
                tx.error_class = Some(class);
                Ok(())
            })
            .await?;
        warn!(
            idempotency_key = idempotency_key,
            error = %rejection.error,
            "[ls-02] Transaction abandoned before submission"
        );
        Ok(updated)
    }

    async fn can_retry(&self, idempotency_key: &str) -> TrackerResult<bool> {
        Ok(self.load(idempotency_key).await?.can_retry())
    }

    fn classify_error(&self, message: &str) -> ErrorClass {
        classify_error(message)
    }

    async fn expire_old_transactions(&self) -> TrackerResult<ExpirySweep> {
        let now = self.clock.now();
        let candidates: Vec<_> = self
            .store
            .list_by_status(&[TxStatus::Prepared, TxStatus::Submitted])
            .await?
            .into_iter()
            .filter(|tx| tx.is_expired_at(now))
            .collect();

        let mut sweep = ExpirySweep {
            found: candidates.len(),
            ..ExpirySweep::default()
        };
        for tx in candidates {
            match self.mark_expired(&tx.idempotency_key).await {
                Ok(_) => sweep.expired += 1,
                Err(e) => {
                    warn!(
                        idempotency_key = %tx.idempotency_key,
                        error = %e,
                        "[ls-02] Failed to expire transaction"
                    );
                    sweep.failed += 1;
                }
            }
        }

        if sweep.found > 0 {
            info!(
                found = sweep.found,
                expired = sweep.expired,
                failed = sweep.failed,
                "[ls-02] Expiry sweep complete"
            );
        }
        Ok(sweep)
    }

    async fn get_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> TrackerResult<Option<TrackedTransaction>> {
        self.store.get_by_idempotency_key(idempotency_key).await
    }

    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> TrackerResult<Option<TrackedTransaction>> {
        self.store.get_by_external_ref(external_ref).await
    }

    async fn get_by_canonical_key(
        &self,
        canonical_key: &str,
    ) -> TrackerResult<Vec<TrackedTransaction>> {
        self.store.list_by_canonical_key(canonical_key).await
    }

    async fn list_by_status(&self, statuses: &[TxStatus]) -> TrackerResult<Vec<TrackedTransaction>> {
        self.store.list_by_status(statuses).await
    }

    async fn has_active_attempt(&self, canonical_key: &str) -> TrackerResult<bool> {
        Ok(self
            .store
            .list_by_canonical_key(canonical_key)
            .await?
            .iter()
            .any(|tx| tx.status.is_active()))
    }

    async fn increment_retry(&self, idempotency_key: &str) -> TrackerResult<TrackedTransaction> {
        let now = self.clock.now();
        self.update(idempotency_key, |tx| {
            tx.retry_count = tx.retry_count.saturating_add(1);
            tx.last_retry_at = Some(now);
            Ok(())
        })
        .await
    }

    async fn begin_retry(&self, idempotency_key: &str) -> TrackerResult<RetryTicket> {
        let now = self.clock.now();
        let updated = self
            .update(idempotency_key, |tx| {
                if !tx.can_retry() {
                    let reason = if tx.status != TxStatus::Rejected {
                        format!("status is {}", tx.status)
                    } else if tx.retry_count >= tx.max_retries {
                        format!("retry budget of {} exhausted", tx.max_retries)
                    } else {
                        "error is not retryable".to_string()
                    };
                    return Err(TrackerError::CannotRetry {
                        key: tx.idempotency_key.clone(),
                        reason,
                    });
                }
                tx.retry_count += 1;
                tx.last_retry_at = Some(now);
                Ok(())
            })
            .await?;
        let new_idempotency_key = updated.retry_key(updated.retry_count);
        let canonical_key = updated.canonical_key.clone();

        info!(
            idempotency_key = idempotency_key,
            new_idempotency_key = %new_idempotency_key,
            retry_count = updated.retry_count,
            "[ls-02] Retry issued"
        );
        Ok(RetryTicket {
            new_idempotency_key,
            canonical_key,
            retry_count: updated.retry_count,
        })
    }

    async fn batch_status(&self, keys: &[String]) -> TrackerResult<Vec<(String, TxStatusEntry)>> {
        if keys.is_empty() {
            return Err(TrackerError::InvalidArgument {
                reason: "at least one key is required".to_string(),
            });
        }
        if keys.len() > self.config.max_batch_status {
            return Err(TrackerError::BatchTooLarge {
                size: keys.len(),
                max: self.config.max_batch_status,
            });
        }

        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let entry = match self.store.get_by_idempotency_key(key).await? {
                Some(tx) => TxStatusEntry::from(&tx),
                None => TxStatusEntry::NotFound,
            };
            out.push((key.clone(), entry));
        }
        Ok(out)
    }

    async fn record_reconciliation(
        &self,
        idempotency_key: &str,
    ) -> TrackerResult<TrackedTransaction> {
        let now = self.clock.now();
        self.update(idempotency_key, |tx| {
            tx.last_reconciled_at = Some(now);
            tx.reconcile_attempts = tx.reconcile_attempts.saturating_add(1);
            Ok(())
        })
        .await
    }
}
