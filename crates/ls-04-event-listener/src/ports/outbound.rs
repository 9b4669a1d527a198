//! # Outbound Ports
//!
//! The ledger as seen by the listener, plus a scriptable mock.

use async_trait::async_trait;
use ls_03_event_processor::IncomingEvent;
use parking_lot::Mutex;
use shared_types::{BlockHeight, LedgerError};
use tokio::sync::mpsc;

/// Source of ledger events.
#[async_trait]
pub trait LedgerEventSource: Send + Sync {
    /// Open a push subscription. Events may arrive out of order and may
    /// repeat events already returned by `get_events`.
    async fn subscribe(&self, buffer: usize) -> Result<mpsc::Receiver<IncomingEvent>, LedgerError>;

    /// Confirmed events in blocks `from..=to`.
    async fn get_events(
        &self,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<Vec<IncomingEvent>, LedgerError>;

    async fn get_latest_block(&self) -> Result<BlockHeight, LedgerError>;
}

#[derive(Default)]
struct MockChain {
    events: Vec<IncomingEvent>,
    latest_block: BlockHeight,
    failures_remaining: u32,
    subscribe_failures_remaining: u32,
    subscriber: Option<mpsc::Sender<IncomingEvent>>,
    requests: Vec<(BlockHeight, BlockHeight)>,
}

/// In-memory ledger for tests.
#[derive(Default)]
pub struct MockLedgerSource {
    chain: Mutex<MockChain>,
}

impl MockLedgerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a confirmed event. Raises the head to its height.
    pub fn add_event(&self, event: IncomingEvent) {
        let mut chain = self.chain.lock();
        chain.latest_block = chain.latest_block.max(event.block_height);
        chain.events.push(event);
    }

    pub fn set_latest_block(&self, height: BlockHeight) {
        self.chain.lock().latest_block = height;
    }

    /// Replace every event at `height` (simulates a reorg).
    pub fn replace_block(&self, height: BlockHeight, events: Vec<IncomingEvent>) {
        let mut chain = self.chain.lock();
        chain.events.retain(|e| e.block_height != height);
        chain.events.extend(events);
    }

    /// Fail the next `count` requests with a network error.
    pub fn fail_next(&self, count: u32) {
        self.chain.lock().failures_remaining = count;
    }

    /// Refuse the next `count` subscription requests.
    pub fn fail_subscriptions(&self, count: u32) {
        self.chain.lock().subscribe_failures_remaining = count;
    }

    /// Deliver an event through the open subscription.
    pub fn push(&self, event: IncomingEvent) -> bool {
        let chain = self.chain.lock();
        match &chain.subscriber {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Close the subscription from the ledger side.
    pub fn close_subscription(&self) {
        self.chain.lock().subscriber = None;
    }

    /// `(from, to)` of every `get_events` call, in order.
    pub fn requests(&self) -> Vec<(BlockHeight, BlockHeight)> {
        self.chain.lock().requests.clone()
    }

    fn check_failure(chain: &mut MockChain) -> Result<(), LedgerError> {
        if chain.failures_remaining > 0 {
            chain.failures_remaining -= 1;
            return Err(LedgerError::network("mock ledger unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerEventSource for MockLedgerSource {
    async fn subscribe(&self, buffer: usize) -> Result<mpsc::Receiver<IncomingEvent>, LedgerError> {
        let mut chain = self.chain.lock();
        if chain.subscribe_failures_remaining > 0 {
            chain.subscribe_failures_remaining -= 1;
            return Err(LedgerError::network("mock subscription refused"));
        }
        let (tx, rx) = mpsc::channel(buffer.max(1));
        chain.subscriber = Some(tx);
        Ok(rx)
    }

    async fn get_events(
        &self,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<Vec<IncomingEvent>, LedgerError> {
        let mut chain = self.chain.lock();
        Self::check_failure(&mut chain)?;
        chain.requests.push((from, to));
        Ok(chain
            .events
            .iter()
            .filter(|e| e.block_height >= from && e.block_height <= to)
            .cloned()
            .collect())
    }

    async fn get_latest_block(&self) -> Result<BlockHeight, LedgerError> {
        let mut chain = self.chain.lock();
        Self::check_failure(&mut chain)?;
        Ok(chain.latest_block)
    }
}
