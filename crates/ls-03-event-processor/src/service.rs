//! Event Processor Service
//!
//! Sole writer of the ledger event log, staging rows, checkpoints and
//! business aggregates. Each ingestion is one store transaction.

use crate::config::ProcessorConfig;
use crate::domain::hash_chain;
use crate::domain::{
    apply, Bid, Checkpoint, ContractEvent, Escrow, EventMeta, HashChainReport, IncomingEvent,
    IngestOutcome, IngestReceipt, LedgerEvent, Payment, ProcessorError, ProcessorResult,
    ReorgRecord, Rfq, RfqSnapshot, StagingEvent,
};
use crate::metrics;
use crate::ports::{EventProcessorApi, EventStore, EventTxn};
use async_trait::async_trait;
use shared_types::{BlockHeight, TimeSource, Timestamp};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Event processor over an injected store and clock.
pub struct EventProcessor<S: EventStore> {
    store: Arc<S>,
    clock: Arc<dyn TimeSource>,
    config: ProcessorConfig,
}

impl<S: EventStore> EventProcessor<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn TimeSource>, config: ProcessorConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }
}

fn meta(event: &LedgerEvent) -> EventMeta<'_> {
    EventMeta {
        tx_id: &event.key.tx_id,
        event_index: event.key.event_index,
        block_height: event.block_height,
        event_version: event.event_version,
    }
}

fn failure_label(err: &ProcessorError) -> &'static str {
    match err {
        ProcessorError::UnknownTransition { .. } => "unknown_transition",
        ProcessorError::Decode { .. } => "decode",
        ProcessorError::MissingAggregate { .. } => "missing_aggregate",
        ProcessorError::AggregateExists { .. } => "aggregate_exists",
        ProcessorError::CheckpointNotFound { .. } => "checkpoint_not_found",
        ProcessorError::ReorgBeyondFinality { .. } => "reorg_beyond_finality",
        ProcessorError::Encoding { .. } => "encoding",
        ProcessorError::Storage { .. } => "storage",
    }
}

/// Write a pending event to staging unless its key is already known.
fn stage(
    txn: &mut dyn EventTxn,
    incoming: &IncomingEvent,
    event: ContractEvent,
    now: Timestamp,
    event_version: u32,
) -> ProcessorResult<IngestReceipt> {
    let key = incoming.key();
    if txn.ledger_event(&key).is_some() || txn.staging_event(&key).is_some() {
        return Ok(IngestReceipt::new(IngestOutcome::Duplicate));
    }
    txn.put_staging_event(StagingEvent {
        key,
        kind: event.kind(),
        event,
        block_height: incoming.block_height,
        block_hash: incoming.block_hash.clone(),
        event_version,
        staged_at: now,
    });
    Ok(IngestReceipt::new(IngestOutcome::Staged))
}

/// Log, apply and checkpoint a confirmed event, rolling back first if its
/// block hash contradicts the stored checkpoint.
fn commit_confirmed(
    txn: &mut dyn EventTxn,
    incoming: &IncomingEvent,
    event: ContractEvent,
    now: Timestamp,
    config: &ProcessorConfig,
) -> ProcessorResult<IngestReceipt> {
    let height = incoming.block_height;

    let mut reorg = None;
    if let Some(existing) = txn.checkpoint(height) {
        if existing.block_hash != incoming.block_hash {
            if existing.finalized {
                return Err(ProcessorError::ReorgBeyondFinality { height });
            }
            let fork_height = txn
                .checkpoints()
                .iter()
                .rev()
                .find(|c| c.block_height < height)
                .map(|c| c.block_height)
                .unwrap_or_else(|| height.saturating_sub(1));
            reorg = Some(rollback(
                txn,
                fork_height,
                height,
                Some(existing.block_hash),
                &incoming.block_hash,
                now,
            )?);
        }
    }

    let key = incoming.key();
    if txn.ledger_event(&key).is_some() {
        return Ok(IngestReceipt {
            outcome: IngestOutcome::Duplicate,
            reorg,
        });
    }

    let sequence = txn.next_sequence();
    let mut entry = LedgerEvent {
        sequence,
        key,
        kind: event.kind(),
        rfq_id: event.rfq_id().to_string(),
        event,
        block_height: height,
        block_hash: incoming.block_hash.clone(),
        event_version: config.event_version,
        processed_at: now,
        previous_hash: None,
        event_hash: String::new(),
    };
    let previous = txn.ledger_tail().map(|tail| tail.event_hash);
    hash_chain::link(&mut entry, previous)?;

    apply(txn, &entry.event, meta(&entry))?;
    txn.delete_staging_event(&entry.key);
    txn.put_ledger_event(entry);

    if txn.checkpoint(height).is_none() {
        txn.put_checkpoint(Checkpoint {
            block_height: height,
            block_hash: incoming.block_hash.clone(),
            finalized: false,
            created_at: now,
        });
    }
    let head = txn
        .checkpoints()
        .last()
        .map(|c| c.block_height.max(height))
        .unwrap_or(height);
    finalize(txn, head, config.rollback_window);

    Ok(IngestReceipt {
        outcome: IngestOutcome::Applied { sequence },
        reorg,
    })
}

/// Finalize, in ascending order, every open checkpoint at or below
/// `head - window`, and drop staging rows at those heights that never
/// confirmed.
fn finalize(txn: &mut dyn EventTxn, head: BlockHeight, window: u64) -> Vec<BlockHeight> {
    let Some(threshold) = head.checked_sub(window) else {
        return Vec::new();
    };
    let mut finalized = Vec::new();
    for mut checkpoint in txn.checkpoints() {
        if checkpoint.block_height > threshold {
            break;
        }
        if !checkpoint.finalized {
            checkpoint.finalized = true;
            finalized.push(checkpoint.block_height);
            txn.put_checkpoint(checkpoint);
        }
    }
    txn.delete_staging_events_through(threshold);
    finalized
}

/// Delete everything above `fork_height` and rebuild the affected RFQs from
/// the surviving log.
fn rollback(
    txn: &mut dyn EventTxn,
    fork_height: BlockHeight,
    detected_height: BlockHeight,
    old_hash: Option<String>,
    new_hash: &str,
    now: Timestamp,
) -> ProcessorResult<ReorgRecord> {
    if let Some(finalized) = txn
        .checkpoints()
        .iter()
        .find(|c| c.block_height > fork_height && c.finalized)
    {
        return Err(ProcessorError::ReorgBeyondFinality {
            height: finalized.block_height,
        });
    }

    let deleted = txn.delete_ledger_events_above(fork_height);
    let dropped = txn.delete_checkpoints_above(fork_height);
    let unstaged = txn.delete_staging_events_above(fork_height);

    let affected: BTreeSet<String> = deleted.iter().map(|e| e.rfq_id.clone()).collect();
    for rfq_id in &affected {
        txn.drop_rfq_state(rfq_id);
        for survivor in txn.ledger_events_for_rfq(rfq_id) {
            apply(txn, &survivor.event, meta(&survivor))?;
        }
    }

    // Re-link entries appended after the first deleted one.
    if let Some(first_gap) = deleted.iter().map(|e| e.sequence).min() {
        let mut previous: Option<String> = None;
        for mut entry in txn.ledger_events() {
            if entry.sequence > first_gap {
                hash_chain::link(&mut entry, previous.clone())?;
                previous = Some(entry.event_hash.clone());
                txn.put_ledger_event(entry);
            } else {
                previous = Some(entry.event_hash);
            }
        }
    }

    let record = ReorgRecord {
        fork_height,
        fork_hash: txn.checkpoint(fork_height).map(|c| c.block_hash),
        detected_height,
        old_hash,
        new_hash: new_hash.to_string(),
        events_rolled_back: deleted.len(),
        rfqs_rebuilt: affected.len(),
        checkpoints_dropped: dropped.len(),
        staging_dropped: unstaged.len(),
        recovered_at: now,
    };
    txn.push_reorg(record.clone());
    Ok(record)
}

#[async_trait]
impl<S: EventStore + 'static> EventProcessorApi for EventProcessor<S> {
    async fn ingest(&self, incoming: IncomingEvent) -> ProcessorResult<IngestReceipt> {
        let key = incoming.key();
        let event = match ContractEvent::decode(&incoming.transition, &incoming.payload) {
            Ok(event) => event,
            Err(e) => {
                metrics::record_event_failed(failure_label(&e));
                warn!(event = %key, error = %e, "[ls-03] Undecodable event");
                return Err(e);
            }
        };
        let kind = event.kind();
        let now = self.clock.now();
        let is_pending = incoming.is_pending;
        let block_height = incoming.block_height;

        let result = if is_pending {
            let version = self.config.event_version;
            self.store
                .transaction(move |txn| stage(txn, &incoming, event, now, version))
                .await
        } else {
            let config = self.config.clone();
            self.store
                .transaction(move |txn| commit_confirmed(txn, &incoming, event, now, &config))
                .await
        };

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                metrics::record_event_failed(failure_label(&e));
                error!(
                    event = %key,
                    block_height = block_height,
                    error = %e,
                    "[ls-03] Event rejected, nothing written"
                );
                return Err(e);
            }
        };

        if let Some(reorg) = &receipt.reorg {
            metrics::record_reorg(reorg.events_rolled_back);
            warn!(
                fork_height = reorg.fork_height,
                detected_height = reorg.detected_height,
                events_rolled_back = reorg.events_rolled_back,
                rfqs_rebuilt = reorg.rfqs_rebuilt,
                "[ls-03] Reorg detected and rolled back"
            );
        }
        match receipt.outcome {
            IngestOutcome::Staged => {
                metrics::record_event_staged();
                debug!(event = %key, kind = %kind, "[ls-03] Pending event staged");
            }
            IngestOutcome::Applied { sequence } => {
                metrics::record_event_ingested(kind.as_str());
                info!(
                    event = %key,
                    kind = %kind,
                    block_height = block_height,
                    sequence = sequence,
                    "[ls-03] Event applied"
                );
            }
            IngestOutcome::Duplicate => {
                metrics::record_duplicate();
                debug!(event = %key, "[ls-03] Event already processed");
            }
        }
        Ok(receipt)
    }

    async fn handle_reorg(
        &self,
        fork_height: BlockHeight,
        new_hash: &str,
    ) -> ProcessorResult<ReorgRecord> {
        let now = self.clock.now();
        let new_hash = new_hash.to_string();
        let record = self
            .store
            .transaction(move |txn| {
                if txn.checkpoint(fork_height).is_none() {
                    return Err(ProcessorError::CheckpointNotFound {
                        height: fork_height,
                    });
                }
                let detected_height = fork_height.saturating_add(1);
                let old_hash = txn.checkpoint(detected_height).map(|c| c.block_hash);
                rollback(txn, fork_height, detected_height, old_hash, &new_hash, now)
            })
            .await?;

        metrics::record_reorg(record.events_rolled_back);
        warn!(
            fork_height = fork_height,
            events_rolled_back = record.events_rolled_back,
            rfqs_rebuilt = record.rfqs_rebuilt,
            "[ls-03] Rolled back to checkpoint"
        );
        Ok(record)
    }

    async fn finalize_checkpoints(&self, head: BlockHeight) -> ProcessorResult<Vec<BlockHeight>> {
        let window = self.config.rollback_window;
        let heights = self
            .store
            .transaction(move |txn| Ok(finalize(txn, head, window)))
            .await?;
        if !heights.is_empty() {
            metrics::record_checkpoints_finalized(heights.len());
            debug!(count = heights.len(), head = head, "[ls-03] Checkpoints finalized");
        }
        Ok(heights)
    }

    async fn latest_checkpoint(&self) -> ProcessorResult<Option<Checkpoint>> {
        self.store.read(|txn| Ok(txn.checkpoints().pop())).await
    }

    async fn checkpoints(&self) -> ProcessorResult<Vec<Checkpoint>> {
        self.store.read(|txn| Ok(txn.checkpoints())).await
    }

    async fn verify_hash_chain(&self) -> ProcessorResult<HashChainReport> {
        let report = self
            .store
            .read(|txn| Ok(hash_chain::verify(&txn.ledger_events())))
            .await?;
        if !report.valid {
            error!(
                invalid = report.invalid_events.len(),
                total = report.total_events,
                "[ls-03] Event log hash chain broken"
            );
        }
        Ok(report)
    }

    async fn reconstruct_rfq(&self, rfq_id: &str) -> ProcessorResult<RfqSnapshot> {
        let events = self
            .store
            .read(|txn| Ok(txn.ledger_events_for_rfq(rfq_id)))
            .await?;
        let mut snapshot = RfqSnapshot::default();
        for entry in &events {
            apply(&mut snapshot, &entry.event, meta(entry))?;
            snapshot.events_applied += 1;
        }
        Ok(snapshot)
    }

    async fn confirmed_events_since(
        &self,
        height: BlockHeight,
    ) -> ProcessorResult<Vec<LedgerEvent>> {
        self.store
            .read(move |txn| Ok(txn.ledger_events_since(height)))
            .await
    }

    async fn ledger_event_count(&self) -> ProcessorResult<usize> {
        self.store.read(|txn| Ok(txn.ledger_events().len())).await
    }

    async fn staging_events(&self) -> ProcessorResult<Vec<StagingEvent>> {
        self.store.read(|txn| Ok(txn.staging_events())).await
    }

    async fn reorg_history(&self) -> ProcessorResult<Vec<ReorgRecord>> {
        self.store.read(|txn| Ok(txn.reorgs())).await
    }

    async fn get_rfq(&self, rfq_id: &str) -> ProcessorResult<Option<Rfq>> {
        self.store.read(|txn| Ok(txn.rfq(rfq_id))).await
    }

    async fn get_bid(&self, bid_id: &str) -> ProcessorResult<Option<Bid>> {
        self.store.read(|txn| Ok(txn.bid(bid_id))).await
    }

    async fn get_escrow(&self, rfq_id: &str) -> ProcessorResult<Option<Escrow>> {
        self.store.read(|txn| Ok(txn.escrow(rfq_id))).await
    }

    async fn get_payments(&self, rfq_id: &str) -> ProcessorResult<Vec<Payment>> {
        self.store.read(|txn| Ok(txn.payments_for(rfq_id))).await
    }
}
