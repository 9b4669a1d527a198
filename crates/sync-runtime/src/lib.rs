//! # Ledger-Sync Runtime
//!
//! Wires the subsystems together and runs the long-lived tasks.
//!
//! ## Modular Structure
//!
//! - `container/` - Runtime configuration and the subsystem container
//! - `adapters/` - Port implementations connecting subsystems
//! - `runtime` - `SyncRuntime`: start and graceful shutdown
//!
//! ## Data Flow
//!
//! ```text
//! Ledger ──events──→ EventListener(4) ──ingest──→ EventProcessor(3)
//!                                                        │
//!                                              confirmed log (feed)
//!                                                        ↓
//! Ledger ──tx status──→ ReconciliationJob(5) ──heal──→ TransactionTracker(2)
//!
//! Caller layer ──→ NonceManager(1), TransactionTracker(2)
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod runtime;

pub use adapters::ProcessorEventFeed;
pub use container::{
    ConcreteNonceManager, ConcreteProcessor, ConcreteTracker, ConfigError, RuntimeConfig,
    SyncContainer,
};
pub use runtime::{ConcreteListener, ConcreteReconciliation, SyncRuntime};
