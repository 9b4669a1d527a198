//! # LS-04 Event Listener
//!
//! Delivers ledger events to the event processor from two paths: a push
//! subscription for low latency and a batched poll loop for completeness.
//!
//! **Subsystem ID:** 4  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! The listener owns a cursor, the highest block whose events have all been
//! handed to the processor. Catch-up walks from the cursor to the ledger head
//! in batches, sorting each batch by `(block_height, event_index)`. Failures
//! of a single event are logged and skipped; failures of the ledger source
//! slow the poll loop down but never stop it.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Cursor advances only after a whole batch | `catch_up` |
//! | Reorg rewinds the cursor to the fork | `handle_event` |
//! | One bad event never stops ingestion | errors counted in `ListenerStats::failed` |
//! | Source outages back off exponentially | `PollBackoff` |
//! | Shutdown waits for the in-flight batch | `run` checks the signal between rounds |
//!
//! ## Module Structure
//!
//! ```text
//! ls-04-event-listener/
//! ├── domain/      # PollBackoff, ListenerStats, errors
//! ├── ports/       # EventListenerApi (inbound) + LedgerEventSource (outbound)
//! ├── config.rs    # ListenerConfig
//! └── service.rs   # EventListener
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::ListenerConfig;
pub use domain::{CatchUpReport, ListenerError, ListenerResult, ListenerStats, PollBackoff};
pub use ports::{EventListenerApi, LedgerEventSource, MockLedgerSource};
pub use service::EventListener;
