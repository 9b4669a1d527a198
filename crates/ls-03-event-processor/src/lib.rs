//! # LS-03 Event Processor
//!
//! Exactly-once ingestion of ledger events into an immutable, hash-chained
//! event log and the business aggregates derived from it.
//!
//! **Subsystem ID:** 3  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Pending events are mirrored into staging and never drive business state.
//! Confirmed events are logged, applied and checkpointed in one store
//! transaction. When the ledger replaces a checkpointed block, every log
//! entry above the fork is deleted and the affected RFQs are rebuilt by
//! replaying what survives.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | `(tx_id, transition, event_index)` ingested once | existence check inside the ingestion transaction |
//! | Log + mutation + staging delete are atomic | `EventStore::transaction` |
//! | Event kind from transition name only | `ContractEvent::decode` |
//! | Finalized checkpoints are never rolled back | `ReorgBeyondFinality` |
//! | Checkpoints finalize in height order | `finalize` walks ascending heights |
//! | Business state equals replay of the log | rollback rebuilds from `ledger_events_for_rfq` |
//!
//! ## Module Structure
//!
//! ```text
//! ls-03-event-processor/
//! ├── domain/      # ContractEvent, aggregates, projection, records, hash chain
//! ├── ports/       # EventProcessorApi (inbound) + EventStore/EventTxn (outbound)
//! ├── adapters/    # InMemoryEventStore
//! ├── config.rs    # ProcessorConfig
//! ├── metrics.rs   # Prometheus counters (feature `metrics`)
//! └── service.rs   # EventProcessor
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::InMemoryEventStore;
pub use config::ProcessorConfig;
pub use domain::{
    Bid, BusinessState, Checkpoint, ContractEvent, Escrow, EventKey, EventKind, HashChainReport,
    IncomingEvent, IngestOutcome, IngestReceipt, LedgerEvent, Payment, ProcessorError,
    ProcessorResult, ReorgRecord, Rfq, RfqSnapshot, RfqStatus, StagingEvent,
};
pub use ports::{EventProcessorApi, EventStore, EventTxn};
pub use service::EventProcessor;
