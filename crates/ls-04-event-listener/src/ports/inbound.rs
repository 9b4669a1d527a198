//! Driving port: listener control.

use crate::domain::{CatchUpReport, ListenerResult, ListenerStats};
use async_trait::async_trait;
use ls_03_event_processor::IncomingEvent;
use shared_types::BlockHeight;

/// Event listener API.
#[async_trait]
pub trait EventListenerApi: Send + Sync {
    /// Fetch and ingest every block between the cursor and the ledger head.
    async fn catch_up(&self) -> ListenerResult<CatchUpReport>;

    /// One polling round. Returns the number of events handled.
    async fn poll_once(&self) -> ListenerResult<u64>;

    /// Ingest one event. Processor failures are logged and counted.
    async fn handle_event(&self, event: IncomingEvent);

    /// Highest block whose events have all been handed to the processor.
    fn last_processed_block(&self) -> BlockHeight;

    fn stats(&self) -> ListenerStats;
}
