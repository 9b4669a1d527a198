//! Event Listener Service
//!
//! Feeds ledger events into the event processor. Push events are handled as
//! they arrive; a poll loop fetches everything between the cursor and the
//! ledger head in fixed-size batches. Both paths may deliver the same event;
//! the processor's idempotency makes that harmless.

use crate::config::ListenerConfig;
use crate::domain::{CatchUpReport, ListenerResult, ListenerStats, PollBackoff};
use crate::ports::{EventListenerApi, LedgerEventSource};
use async_trait::async_trait;
use ls_03_event_processor::{EventProcessorApi, IncomingEvent, IngestOutcome};
use parking_lot::Mutex;
use shared_types::BlockHeight;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Event listener over an injected processor and ledger source.
pub struct EventListener<P: EventProcessorApi, L: LedgerEventSource> {
    processor: Arc<P>,
    source: Arc<L>,
    config: ListenerConfig,
    stats: Mutex<ListenerStats>,
}

impl<P, L> EventListener<P, L>
where
    P: EventProcessorApi + 'static,
    L: LedgerEventSource + 'static,
{
    pub fn new(processor: Arc<P>, source: Arc<L>, config: ListenerConfig) -> Self {
        let stats = ListenerStats {
            last_processed_block: config.start_block,
            ..ListenerStats::default()
        };
        Self {
            processor,
            source,
            config,
            stats: Mutex::new(stats),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Move the cursor up to the processor's latest checkpoint.
    pub async fn resume(&self) -> ListenerResult<BlockHeight> {
        let checkpoint = self.processor.latest_checkpoint().await?;
        let mut stats = self.stats.lock();
        if let Some(checkpoint) = checkpoint {
            stats.last_processed_block = stats.last_processed_block.max(checkpoint.block_height);
        }
        Ok(stats.last_processed_block)
    }

    /// Open a push subscription. Failures are counted in `failures`; only
    /// the first of a streak is logged as a warning.
    async fn open_subscription(&self, failures: &mut u32) -> Option<mpsc::Receiver<IncomingEvent>> {
        match self.source.subscribe(self.config.push_buffer).await {
            Ok(rx) => {
                if *failures > 0 {
                    info!(attempts = *failures + 1, "[ls-04] Push subscription established");
                }
                *failures = 0;
                Some(rx)
            }
            Err(e) => {
                *failures += 1;
                if *failures == 1 {
                    warn!(error = %e, "[ls-04] Push subscription unavailable, polling only");
                } else {
                    debug!(error = %e, attempts = *failures, "[ls-04] Push subscription still unavailable");
                }
                None
            }
        }
    }

    /// Poll, resuming from the processor's checkpoint first if that has not
    /// succeeded yet. A failed resume counts as a failed poll.
    async fn poll_after_resume(&self, resumed: &mut bool) -> ListenerResult<u64> {
        if !*resumed {
            match self.resume().await {
                Ok(from_block) => {
                    *resumed = true;
                    info!(from_block = from_block, "[ls-04] Resumed from checkpoint");
                }
                Err(e) => {
                    self.stats.lock().poll_failures += 1;
                    return Err(e);
                }
            }
        }
        self.poll_once().await
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Startup, subscription and poll failures back off and retry; only
    /// shutdown ends the loop. An in-flight batch always completes first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ListenerResult<()> {
        info!(
            start_block = self.last_processed_block(),
            "[ls-04] Event listener started"
        );

        let mut resumed = false;
        let mut push = None;
        let mut subscribe_failures = 0;
        let mut backoff = PollBackoff::new(
            self.config.poll_interval,
            self.config.error_backoff,
            self.config.max_error_backoff,
        );
        let next_poll = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(next_poll);

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
                event = next_push(&mut push) => {
                    self.handle_event(event).await;
                }
                () = &mut next_poll => {
                    if push.is_none() {
                        push = self.open_subscription(&mut subscribe_failures).await;
                    }
                    let delay = match self.poll_after_resume(&mut resumed).await {
                        Ok(_) => backoff.on_success(),
                        Err(e) => {
                            let delay = backoff.on_failure();
                            warn!(
                                error = %e,
                                consecutive_failures = backoff.failures(),
                                retry_in_ms = delay.as_millis() as u64,
                                "[ls-04] Poll failed"
                            );
                            delay
                        }
                    };
                    next_poll.as_mut().reset(Instant::now() + delay);
                }
            }
        }

        info!(
            last_processed_block = self.last_processed_block(),
            "[ls-04] Event listener stopped"
        );
        Ok(())
    }
}

/// Next pushed event. Pends forever once the subscription is gone.
async fn next_push(rx: &mut Option<mpsc::Receiver<IncomingEvent>>) -> IncomingEvent {
    if let Some(receiver) = rx.as_mut() {
        if let Some(event) = receiver.recv().await {
            return event;
        }
        warn!("[ls-04] Push subscription closed, resubscribing on next poll");
        *rx = None;
    }
    std::future::pending().await
}

#[async_trait]
impl<P, L> EventListenerApi for EventListener<P, L>
where
    P: EventProcessorApi + 'static,
    L: LedgerEventSource + 'static,
{
    async fn catch_up(&self) -> ListenerResult<CatchUpReport> {
        let head = self.source.get_latest_block().await?;
        let batch_size = self.config.batch_size.max(1);
        let mut report = CatchUpReport {
            head,
            ..CatchUpReport::default()
        };

        loop {
            let cursor = self.last_processed_block();
            if cursor >= head {
                break;
            }
            let from = cursor + 1;
            let to = from.saturating_add(batch_size - 1).min(head);

            let mut events = self.source.get_events(from, to).await?;
            events.sort_by_key(|e| (e.block_height, e.event_index));
            debug!(from = from, to = to, events = events.len(), "[ls-04] Batch fetched");

            for event in events {
                self.handle_event(event).await;
                report.events += 1;
            }
            report.batches += 1;

            let mut stats = self.stats.lock();
            stats.batches += 1;
            // A reorg inside the batch rewinds the cursor; the next pass
            // refetches from the fork.
            if stats.last_processed_block == cursor {
                stats.last_processed_block = to;
            }
        }

        // Finality follows confirmed event heights in the processor, not the head.
        if report.batches > 0 {
            info!(
                head = head,
                batches = report.batches,
                events = report.events,
                "[ls-04] Caught up"
            );
        }
        Ok(report)
    }

    async fn poll_once(&self) -> ListenerResult<u64> {
        match self.catch_up().await {
            Ok(report) => Ok(report.events),
            Err(e) => {
                self.stats.lock().poll_failures += 1;
                Err(e)
            }
        }
    }

    async fn handle_event(&self, event: IncomingEvent) {
        let key = event.key();
        let block_height = event.block_height;
        match self.processor.ingest(event).await {
            Ok(receipt) => {
                let rewound_to = {
                    let mut stats = self.stats.lock();
                    match receipt.outcome {
                        IngestOutcome::Staged => stats.events_staged += 1,
                        IngestOutcome::Applied { .. } => stats.events_applied += 1,
                        IngestOutcome::Duplicate => stats.duplicates += 1,
                    }
                    match &receipt.reorg {
                        Some(reorg) => {
                            stats.reorgs += 1;
                            if reorg.fork_height < stats.last_processed_block {
                                stats.last_processed_block = reorg.fork_height;
                            }
                            Some(stats.last_processed_block)
                        }
                        None => None,
                    }
                };
                if let Some(cursor) = rewound_to {
                    warn!(
                        event = %key,
                        block_height = block_height,
                        cursor = cursor,
                        "[ls-04] Reorg handled, cursor rewound"
                    );
                }
            }
            Err(e) => {
                self.stats.lock().failed += 1;
                error!(
                    event = %key,
                    block_height = block_height,
                    error = %e,
                    "[ls-04] Event skipped"
                );
            }
        }
    }

    fn last_processed_block(&self) -> BlockHeight {
        self.stats.lock().last_processed_block
    }

    fn stats(&self) -> ListenerStats {
        self.stats.lock().clone()
    }
}
