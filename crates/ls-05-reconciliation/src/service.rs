//! Reconciliation Service
//!
//! Brings tracked attempts back in line with the ledger. A pass walks every
//! SUBMITTED attempt, then every PREPARED attempt past its grace window or
//! TTL, then the recently confirmed events. Each item is reconciled on its
//! own; a failure is written into the report and the pass moves on.

use crate::config::ReconciliationConfig;
use crate::domain::{
    ReconciliationAction, ReconciliationDetail, ReconciliationError, ReconciliationReport,
    ReconciliationResult, TxChainStatus,
};
use crate::metrics;
use crate::ports::{ChainStateSource, ConfirmedEventFeed, ReconciliationApi};
use async_trait::async_trait;
use ls_02_tx_tracker::{Rejection, TrackedTransaction, TransactionTrackerApi, TxStatus};
use parking_lot::Mutex;
use shared_types::TimeSource;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Reconciliation job over an injected tracker, ledger and event feed.
pub struct ReconciliationJob<T, C, F>
where
    T: TransactionTrackerApi,
    C: ChainStateSource,
    F: ConfirmedEventFeed,
{
    tracker: Arc<T>,
    chain: Arc<C>,
    feed: Arc<F>,
    clock: Arc<dyn TimeSource>,
    config: ReconciliationConfig,
    last_report: Mutex<Option<ReconciliationReport>>,
}

fn detail(
    tx: Option<&TrackedTransaction>,
    external_ref: Option<String>,
    action: ReconciliationAction,
    reason: impl Into<String>,
) -> ReconciliationDetail {
    ReconciliationDetail {
        idempotency_key: tx.map(|tx| tx.idempotency_key.clone()),
        external_ref: external_ref.or_else(|| tx.and_then(|tx| tx.external_ref.clone())),
        action,
        reason: reason.into(),
    }
}

fn failure(tx: Option<&TrackedTransaction>, err: &ReconciliationError) -> ReconciliationDetail {
    warn!(
        idempotency_key = tx.map(|tx| tx.idempotency_key.as_str()).unwrap_or("-"),
        error = %err,
        "[ls-05] Reconciliation item failed"
    );
    detail(tx, None, ReconciliationAction::Failed, err.to_string())
}

impl<T, C, F> ReconciliationJob<T, C, F>
where
    T: TransactionTrackerApi + 'static,
    C: ChainStateSource + 'static,
    F: ConfirmedEventFeed + 'static,
{
    pub fn new(
        tracker: Arc<T>,
        chain: Arc<C>,
        feed: Arc<F>,
        clock: Arc<dyn TimeSource>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            tracker,
            chain,
            feed,
            clock,
            config,
            last_report: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Run a pass every `interval` until `shutdown` flips to `true` or its
    /// sender is dropped. The first pass starts immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = self.config.interval.as_secs(),
            "[ls-05] Reconciliation scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_scheduled_pass().await;
                }
            }
        }

        info!("[ls-05] Reconciliation scheduler stopped");
    }

    /// A reconciliation pass followed by the tracker's expiry sweep.
    pub async fn run_scheduled_pass(&self) -> ReconciliationReport {
        let mut report = self.reconcile().await;
        match self.tracker.expire_old_transactions().await {
            Ok(sweep) => report.expired = sweep.expired,
            Err(e) => warn!(error = %e, "[ls-05] Expiry sweep failed"),
        }
        report.completed_at = self.clock.now();
        self.finish(report)
    }

    fn finish(&self, report: ReconciliationReport) -> ReconciliationReport {
        metrics::record_pass(&report);
        info!(
            checked = report.checked,
            healed = report.healed,
            failed = report.failed,
            phantoms = report.phantoms,
            expired = report.expired,
            duration_ms = report.completed_at.saturating_sub(report.started_at),
            "[ls-05] Reconciliation pass complete"
        );
        *self.last_report.lock() = Some(report.clone());
        report
    }

    async fn reconcile(&self) -> ReconciliationReport {
        let now = self.clock.now();
        let mut report = ReconciliationReport::new(now);

        match self.tracker.list_by_status(&[TxStatus::Submitted]).await {
            Ok(submitted) => {
                for tx in submitted {
                    report.checked += 1;
                    let item = match self.reconcile_submitted(&tx).await {
                        Ok(item) => item,
                        Err(e) => failure(Some(&tx), &e),
                    };
                    report.record(item);
                    self.stamp(&tx).await;
                }
            }
            Err(e) => report.record(failure(None, &ReconciliationError::from(e))),
        }

        let cutoff = now.saturating_sub(self.config.prepared_grace_ms());
        match self.tracker.list_by_status(&[TxStatus::Prepared]).await {
            Ok(prepared) => {
                let stale = prepared
                    .into_iter()
                    .filter(|tx| tx.prepared_at <= cutoff || tx.is_expired_at(now));
                for tx in stale {
                    report.checked += 1;
                    match self.reconcile_prepared(&tx).await {
                        Ok(Some(item)) => report.record(item),
                        Ok(None) => {}
                        Err(e) => report.record(failure(Some(&tx), &e)),
                    }
                    self.stamp(&tx).await;
                }
            }
            Err(e) => report.record(failure(None, &ReconciliationError::from(e))),
        }

        self.detect_phantoms(&mut report).await;
        report.completed_at = self.clock.now();
        report
    }

    /// Apply the ledger's verdict on a SUBMITTED attempt.
    async fn reconcile_submitted(
        &self,
        tx: &TrackedTransaction,
    ) -> ReconciliationResult<ReconciliationDetail> {
        let external_ref =
            tx.external_ref
                .clone()
                .ok_or_else(|| ReconciliationError::MissingExternalRef {
                    idempotency_key: tx.idempotency_key.clone(),
                })?;
        let status = self.chain.get_tx_status(&external_ref).await?;
        let raw = serde_json::to_value(&status).ok();

        let item = match status {
            TxChainStatus::Confirmed {
                block_height,
                block_hash,
            } => {
                self.tracker
                    .mark_confirmed(&external_ref, block_height, &block_hash, raw)
                    .await?;
                info!(
                    idempotency_key = %tx.idempotency_key,
                    external_ref = %external_ref,
                    block_height = block_height,
                    "[ls-05] Healed: confirmed"
                );
                detail(
                    Some(tx),
                    None,
                    ReconciliationAction::Confirmed,
                    format!("confirmed at block {block_height}"),
                )
            }
            TxChainStatus::Rejected {
                error,
                error_code,
                error_class,
            } => {
                self.tracker
                    .mark_rejected(
                        &tx.idempotency_key,
                        Rejection::new(error.clone(), error_code, error_class),
                        raw,
                    )
                    .await?;
                info!(
                    idempotency_key = %tx.idempotency_key,
                    external_ref = %external_ref,
                    error = %error,
                    "[ls-05] Healed: rejected"
                );
                detail(Some(tx), None, ReconciliationAction::Rejected, error)
            }
            TxChainStatus::Pending => detail(
                Some(tx),
                None,
                ReconciliationAction::StillPending,
                "ledger reports pending",
            ),
            TxChainStatus::NotFound => detail(
                Some(tx),
                None,
                ReconciliationAction::NotFound,
                "ledger does not know the reference",
            ),
        };
        Ok(item)
    }

    /// Catch a PREPARED attempt up if its action was executed without it
    /// being submitted through the tracker.
    async fn reconcile_prepared(
        &self,
        tx: &TrackedTransaction,
    ) -> ReconciliationResult<Option<ReconciliationDetail>> {
        let execution = self.chain.was_action_executed(&tx.canonical_key).await?;
        if !execution.executed {
            debug!(idempotency_key = %tx.idempotency_key, "[ls-05] Prepared attempt not executed");
            return Ok(None);
        }
        let Some(external_ref) = execution.external_ref else {
            return Ok(Some(detail(
                Some(tx),
                None,
                ReconciliationAction::Failed,
                "action executed but the ledger returned no reference",
            )));
        };

        if let Some(owner) = self.tracker.get_by_external_ref(&external_ref).await? {
            if owner.idempotency_key != tx.idempotency_key {
                return Ok(Some(detail(
                    Some(tx),
                    Some(external_ref),
                    ReconciliationAction::AlreadyTracked,
                    format!("execution belongs to attempt {}", owner.idempotency_key),
                )));
            }
        }

        self.tracker
            .mark_submitted(&tx.idempotency_key, &external_ref, None)
            .await?;

        let item = match (execution.block_height, execution.block_hash) {
            (Some(block_height), Some(block_hash)) => {
                self.tracker
                    .mark_confirmed(&external_ref, block_height, &block_hash, None)
                    .await?;
                detail(
                    Some(tx),
                    Some(external_ref.clone()),
                    ReconciliationAction::BypassConfirmed,
                    format!("executed outside the tracker, confirmed at block {block_height}"),
                )
            }
            _ => detail(
                Some(tx),
                Some(external_ref.clone()),
                ReconciliationAction::BypassSubmitted,
                "executed outside the tracker, block not yet known",
            ),
        };
        warn!(
            idempotency_key = %tx.idempotency_key,
            canonical_key = %tx.canonical_key,
            external_ref = %external_ref,
            action = item.action.as_str(),
            "[ls-05] Bypassed execution caught up"
        );
        Ok(Some(item))
    }

    /// Report confirmed events in the lookback window that no attempt owns.
    async fn detect_phantoms(&self, report: &mut ReconciliationReport) {
        let lookback = self.config.phantom_lookback_blocks;
        if lookback == 0 {
            return;
        }
        let head = match self.feed.latest_block().await {
            Ok(Some(head)) => head,
            Ok(None) => return,
            Err(e) => {
                report.record(failure(None, &ReconciliationError::from(e)));
                return;
            }
        };
        let since = head.saturating_sub(lookback - 1);
        let events = match self.feed.confirmed_since(since).await {
            Ok(events) => events,
            Err(e) => {
                report.record(failure(None, &ReconciliationError::from(e)));
                return;
            }
        };

        let mut by_tx = BTreeMap::new();
        for event in events {
            by_tx.entry(event.tx_id.clone()).or_insert(event);
        }
        for (tx_id, event) in by_tx {
            match self.tracker.get_by_external_ref(&tx_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!(
                        tx_id = %tx_id,
                        transition = %event.transition,
                        block_height = event.block_height,
                        "[ls-05] Phantom execution"
                    );
                    report.record(detail(
                        None,
                        Some(tx_id),
                        ReconciliationAction::PhantomExecution,
                        format!(
                            "{} at block {} has no tracked attempt",
                            event.transition, event.block_height
                        ),
                    ));
                }
                Err(e) => report.record(failure(None, &ReconciliationError::from(e))),
            }
        }
    }

    async fn stamp(&self, tx: &TrackedTransaction) {
        if let Err(e) = self.tracker.record_reconciliation(&tx.idempotency_key).await {
            warn!(
                idempotency_key = %tx.idempotency_key,
                error = %e,
                "[ls-05] Could not stamp reconciliation"
            );
        }
    }
}

#[async_trait]
impl<T, C, F> ReconciliationApi for ReconciliationJob<T, C, F>
where
    T: TransactionTrackerApi + 'static,
    C: ChainStateSource + 'static,
    F: ConfirmedEventFeed + 'static,
{
    async fn run_once(&self) -> ReconciliationReport {
        let report = self.reconcile().await;
        self.finish(report)
    }

    fn last_report(&self) -> Option<ReconciliationReport> {
        self.last_report.lock().clone()
    }
}
