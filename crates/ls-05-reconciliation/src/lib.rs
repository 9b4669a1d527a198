//! # LS-05 Reconciliation
//!
//! Periodically compares tracked attempts with ledger truth and heals the
//! ones that drifted.
//!
//! **Subsystem ID:** 5  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - SUBMITTED attempts are resolved to CONFIRMED or REJECTED once the
//!   ledger knows their outcome.
//! - PREPARED attempts past the grace window are checked for execution
//!   outside the tracker (bypass) and caught up.
//! - Confirmed events that no attempt owns are reported as phantom
//!   executions.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | One failing item never aborts a pass | per-item errors become `Failed` details |
//! | Every examined attempt is stamped | `record_reconciliation` after each item |
//! | Healing uses only legal state moves | all writes go through `TransactionTrackerApi` |
//! | No placeholder block hashes | bypass without a block stops at SUBMITTED |
//! | Phantoms are reported, never written | `detect_phantoms` only reads |
//!
//! ## Module Structure
//!
//! ```text
//! ls-05-reconciliation/
//! ├── domain/      # chain answers, report, errors
//! ├── ports/       # ReconciliationApi (inbound) + ChainStateSource/ConfirmedEventFeed (outbound)
//! ├── config.rs    # ReconciliationConfig
//! ├── metrics.rs   # Prometheus counters (feature `metrics`)
//! └── service.rs   # ReconciliationJob + scheduler
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::ReconciliationConfig;
pub use domain::{
    ActionExecution, ConfirmedEventRef, ReconciliationAction, ReconciliationDetail,
    ReconciliationError, ReconciliationReport, ReconciliationResult, TxChainStatus,
};
pub use ports::{
    ChainStateSource, ConfirmedEventFeed, MockChainState, MockEventFeed, ReconciliationApi,
};
pub use service::ReconciliationJob;
