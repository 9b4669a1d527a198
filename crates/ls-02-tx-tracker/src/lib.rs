//! # LS-02 Transaction Tracker
//!
//! Per-attempt transaction records and the one-way status machine.
//!
//! **Subsystem ID:** 2  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Every signable action returned to a caller is first recorded here as a
//! PREPARED attempt. The caller layer and the reconciliation job then drive
//! it through the state machine as ledger outcomes become known.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | One-way status machine | `check_transition` before every status write |
//! | Failed call writes nothing | changes are built on a copy, then compare-and-swapped |
//! | `idempotency_key` unique | `TransactionStore::insert_if_absent` |
//! | `canonical_key` shared by retries | non-unique index, `get_by_canonical_key` |
//! | Terminal records frozen | only reconciliation / retry bookkeeping may touch them |
//!
//! ## Module Structure
//!
//! ```text
//! ls-02-tx-tracker/
//! ├── domain/      # TrackedTransaction, TxStatus, state machine, classification
//! ├── ports/       # TransactionTrackerApi (inbound) + TransactionStore (outbound)
//! ├── adapters/    # InMemoryTransactionStore
//! ├── config.rs    # TrackerConfig
//! └── service.rs   # TransactionTracker
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryTransactionStore;
pub use config::TrackerConfig;
pub use domain::{
    classify_error, ErrorClass, ExpirySweep, Rejection, RetryTicket, StatusChange,
    TrackedTransaction, TrackerError, TrackerResult, TxStatus, TxStatusEntry,
};
pub use ports::{TransactionStore, TransactionTrackerApi};
pub use service::TransactionTracker;
