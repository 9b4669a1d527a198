//! # Test Fixtures
//!
//! Builders shared by the integration tests: contract actions, ledger
//! events for a full sealed-bid RFQ, and a wired listener/processor pair
//! over the in-memory ledger.

use ls_03_event_processor::{EventProcessor, IncomingEvent, InMemoryEventStore, ProcessorConfig};
use ls_04_event_listener::{EventListener, ListenerConfig, MockLedgerSource};
use serde_json::{json, Value};
use shared_types::{ActionDescriptor, BlockHeight, ManualTimeSource};
use std::sync::Arc;
use sync_runtime::ConcreteProcessor;

/// Program every fixture action targets.
pub const PROGRAM: &str = "sealed_rfq_v1.aleo";

/// Clock start for every fixture.
pub const GENESIS_MS: u64 = 1_700_000_000_000;

pub fn action(function: &str, inputs: Value) -> ActionDescriptor {
    ActionDescriptor::new(PROGRAM, function, inputs, 5_000)
}

/// Block hash the fixture ledger uses for `height` on the canonical fork.
pub fn block_hash(height: BlockHeight) -> String {
    format!("hash-{height}")
}

/// Confirmed event on the canonical fork.
pub fn confirmed(
    tx_id: &str,
    transition: &str,
    event_index: u32,
    block_height: BlockHeight,
    payload: Value,
) -> IncomingEvent {
    IncomingEvent {
        tx_id: tx_id.to_string(),
        transition: transition.to_string(),
        event_index,
        block_height,
        block_hash: block_hash(block_height),
        payload,
        is_pending: false,
    }
}

/// Mempool sighting of an event.
pub fn pending(
    tx_id: &str,
    transition: &str,
    event_index: u32,
    block_height: BlockHeight,
    payload: Value,
) -> IncomingEvent {
    IncomingEvent {
        is_pending: true,
        ..confirmed(tx_id, transition, event_index, block_height, payload)
    }
}

/// Every event of one RFQ from creation to final payment, one block per
/// step starting at `first_block`.
///
/// Two vendors bid; `v1` wins at 900, `v2` reveals at 950 and keeps its
/// stake. The escrow of 900 is paid out as 300 + 600.
pub fn rfq_lifecycle(rfq_id: &str, first_block: BlockHeight) -> Vec<IncomingEvent> {
    let h = |step: u64| first_block + step;
    let bid_1 = format!("{rfq_id}-bid-1");
    let bid_2 = format!("{rfq_id}-bid-2");
    vec![
        confirmed(
            &format!("at-{rfq_id}-create"),
            "create_rfq",
            0,
            h(0),
            json!({
                "rfq_id": rfq_id,
                "buyer": "aleo1buyer",
                "bidding_deadline": h(2),
                "reveal_deadline": h(3),
                "min_bid": 500,
            }),
        ),
        confirmed(
            &format!("at-{rfq_id}-commit-1"),
            "submit_bid_commit",
            0,
            h(1),
            json!({
                "rfq_id": rfq_id,
                "bid_id": bid_1,
                "vendor": "aleo1vendor1",
                "commitment_hash": "c1field",
                "stake": 50,
            }),
        ),
        confirmed(
            &format!("at-{rfq_id}-commit-2"),
            "submit_bid_commit",
            1,
            h(1),
            json!({
                "rfq_id": rfq_id,
                "bid_id": bid_2,
                "vendor": "aleo1vendor2",
                "commitment_hash": "c2field",
                "stake": 50,
            }),
        ),
        confirmed(
            &format!("at-{rfq_id}-close"),
            "close_bidding",
            0,
            h(2),
            json!({ "rfq_id": rfq_id, "buyer": "aleo1buyer" }),
        ),
        confirmed(
            &format!("at-{rfq_id}-reveal-1"),
            "reveal_bid",
            0,
            h(3),
            json!({
                "rfq_id": rfq_id,
                "bid_id": bid_1,
                "vendor": "aleo1vendor1",
                "revealed_amount": 900,
            }),
        ),
        confirmed(
            &format!("at-{rfq_id}-reveal-2"),
            "reveal_bid",
            1,
            h(3),
            json!({
                "rfq_id": rfq_id,
                "bid_id": bid_2,
                "vendor": "aleo1vendor2",
                "revealed_amount": 950,
            }),
        ),
        confirmed(
            &format!("at-{rfq_id}-select"),
            "select_winner",
            0,
            h(4),
            json!({
                "rfq_id": rfq_id,
                "winning_bid_id": bid_1,
                "winning_amount": 900,
                "vendor": "aleo1vendor1",
            }),
        ),
        confirmed(
            &format!("at-{rfq_id}-fund"),
            "fund_escrow",
            0,
            h(5),
            json!({ "rfq_id": rfq_id, "buyer": "aleo1buyer", "amount": 900 }),
        ),
        confirmed(
            &format!("at-{rfq_id}-partial"),
            "release_partial_payment",
            0,
            h(6),
            json!({ "rfq_id": rfq_id, "recipient": "aleo1vendor1", "amount": 300 }),
        ),
        confirmed(
            &format!("at-{rfq_id}-final"),
            "release_final_payment",
            0,
            h(7),
            json!({ "rfq_id": rfq_id, "recipient": "aleo1vendor1", "amount": 600 }),
        ),
    ]
}

/// Listener over the concrete processor and the in-memory ledger.
pub type TestListener = EventListener<ConcreteProcessor, MockLedgerSource>;

/// Ledger, processor and listener wired the way the runtime wires them.
pub struct Pipeline {
    pub clock: Arc<ManualTimeSource>,
    pub processor: Arc<ConcreteProcessor>,
    pub ledger: Arc<MockLedgerSource>,
    pub listener: TestListener,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default(), ListenerConfig::for_testing())
    }

    pub fn with_config(processor_config: ProcessorConfig, listener_config: ListenerConfig) -> Self {
        let clock = Arc::new(ManualTimeSource::new(GENESIS_MS));
        let processor = Arc::new(EventProcessor::new(
            Arc::new(InMemoryEventStore::new()),
            clock.clone(),
            processor_config,
        ));
        let ledger = Arc::new(MockLedgerSource::new());
        let listener = EventListener::new(processor.clone(), ledger.clone(), listener_config);
        Self {
            clock,
            processor,
            ledger,
            listener,
        }
    }

    /// Put `events` on the ledger and move its head to their highest block.
    pub fn publish(&self, events: &[IncomingEvent]) {
        let mut head = 0;
        for event in events {
            head = head.max(event.block_height);
            self.ledger.add_event(event.clone());
        }
        self.ledger.set_latest_block(head);
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ls_03_event_processor::{ContractEvent, EventKind};

    #[test]
    fn test_lifecycle_events_decode_in_order() {
        let events = rfq_lifecycle("rfq-1", 10);
        let kinds: Vec<EventKind> = events
            .iter()
            .map(|e| ContractEvent::decode(&e.transition, &e.payload).unwrap().kind())
            .collect();
        assert_eq!(kinds.first(), Some(&EventKind::RfqCreated));
        assert_eq!(kinds.last(), Some(&EventKind::PaymentReleased));
        assert!(events.windows(2).all(|w| {
            (w[0].block_height, w[0].event_index) < (w[1].block_height, w[1].event_index)
        }));
    }
}
