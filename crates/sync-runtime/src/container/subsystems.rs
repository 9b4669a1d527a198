//! # Subsystem Container
//!
//! Holds the stateful subsystems and the clock they share.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Clock, in-memory stores
//! Level 1: Nonce Manager (ls-01), Transaction Tracker (ls-02), Event Processor (ls-03)
//! Level 2: Event Listener (ls-04), Reconciliation (ls-05)   <- built by SyncRuntime
//! ```

use crate::container::config::RuntimeConfig;
use ls_01_nonce_manager::{InMemoryNonceStore, NonceManager};
use ls_02_tx_tracker::{InMemoryTransactionStore, TransactionTracker};
use ls_03_event_processor::{EventProcessor, InMemoryEventStore};
use shared_types::TimeSource;
use std::sync::Arc;
use tracing::info;

/// Nonce manager with its in-memory backend.
pub type ConcreteNonceManager = NonceManager<InMemoryNonceStore>;

/// Transaction tracker with its in-memory backend.
pub type ConcreteTracker = TransactionTracker<InMemoryTransactionStore>;

/// Event processor with its in-memory backend.
pub type ConcreteProcessor = EventProcessor<InMemoryEventStore>;

/// Central container holding the request-driven subsystems.
///
/// The caller layer uses `nonce_manager` and `tracker` directly; the
/// long-lived tasks share `tracker` and `processor`.
pub struct SyncContainer {
    /// Nonce Manager (Subsystem 1)
    pub nonce_manager: Arc<ConcreteNonceManager>,

    /// Transaction Tracker (Subsystem 2)
    pub tracker: Arc<ConcreteTracker>,

    /// Event Processor (Subsystem 3)
    pub processor: Arc<ConcreteProcessor>,

    /// Clock shared by every subsystem
    pub clock: Arc<dyn TimeSource>,
}

impl SyncContainer {
    pub fn new(config: &RuntimeConfig, clock: Arc<dyn TimeSource>) -> Self {
        info!("Initializing Level 1: Nonce Manager, Transaction Tracker, Event Processor");

        let nonce_manager = Arc::new(NonceManager::new(Arc::new(InMemoryNonceStore::new())));
        let tracker = Arc::new(TransactionTracker::new(
            Arc::new(InMemoryTransactionStore::new()),
            Arc::clone(&clock),
            config.tracker.clone(),
        ));
        let processor = Arc::new(EventProcessor::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::clone(&clock),
            config.processor.clone(),
        ));

        Self {
            nonce_manager,
            tracker,
            processor,
            clock,
        }
    }
}
