//! Confirmed-event feed for reconciliation, backed by the event processor's
//! log.

use async_trait::async_trait;
use ls_03_event_processor::{EventProcessorApi, ProcessorError};
use ls_05_reconciliation::{ConfirmedEventFeed, ConfirmedEventRef};
use shared_types::{BlockHeight, ErrorClass, LedgerError};
use std::sync::Arc;

/// Exposes the processor's confirmed log as a `ConfirmedEventFeed`.
pub struct ProcessorEventFeed<P: EventProcessorApi> {
    processor: Arc<P>,
}

impl<P: EventProcessorApi> ProcessorEventFeed<P> {
    pub fn new(processor: Arc<P>) -> Self {
        Self { processor }
    }
}

fn feed_error(err: ProcessorError) -> LedgerError {
    LedgerError::new(ErrorClass::Unknown, err.to_string())
}

#[async_trait]
impl<P: EventProcessorApi + 'static> ConfirmedEventFeed for ProcessorEventFeed<P> {
    async fn latest_block(&self) -> Result<Option<BlockHeight>, LedgerError> {
        let checkpoint = self
            .processor
            .latest_checkpoint()
            .await
            .map_err(feed_error)?;
        Ok(checkpoint.map(|c| c.block_height))
    }

    async fn confirmed_since(
        &self,
        height: BlockHeight,
    ) -> Result<Vec<ConfirmedEventRef>, LedgerError> {
        let events = self
            .processor
            .confirmed_events_since(height)
            .await
            .map_err(feed_error)?;
        Ok(events
            .into_iter()
            .map(|event| ConfirmedEventRef {
                tx_id: event.key.tx_id,
                transition: event.key.transition,
                block_height: event.block_height,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ls_03_event_processor::{EventProcessor, InMemoryEventStore, IncomingEvent, ProcessorConfig};
    use serde_json::json;
    use shared_types::ManualTimeSource;

    fn create_rfq(tx: &str, rfq: &str, height: BlockHeight) -> IncomingEvent {
        IncomingEvent {
            tx_id: tx.to_string(),
            transition: "create_rfq".to_string(),
            event_index: 0,
            block_height: height,
            block_hash: format!("h{height}"),
            payload: json!({ "rfq_id": rfq, "buyer": "aleo1buyer", "bidding_deadline": 100, "reveal_deadline": 200, "min_bid": 10 }),
            is_pending: false,
        }
    }

    #[tokio::test]
    async fn test_feed_reads_confirmed_log() {
        let processor = Arc::new(EventProcessor::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(ManualTimeSource::new(1_000)),
            ProcessorConfig::default(),
        ));
        let feed = ProcessorEventFeed::new(processor.clone());
        assert_eq!(feed.latest_block().await.unwrap(), None);

        processor.ingest(create_rfq("at1", "r1", 3)).await.unwrap();
        processor.ingest(create_rfq("at2", "r2", 8)).await.unwrap();

        assert_eq!(feed.latest_block().await.unwrap(), Some(8));
        let events = feed.confirmed_since(5).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tx_id, "at2");
        assert_eq!(events[0].transition, "create_rfq");
    }
}
