//! # LS-01 Nonce Manager
//!
//! Replay protection for sensitive ledger actions.
//!
//! **Subsystem ID:** 1  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Every replay-protected action carries a nonce that the ledger contract
//! checks against `stored + 1`. This subsystem mirrors that counter locally so
//! out-of-order or replayed submissions are rejected before they cost a fee.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Counter only moves forward by exactly 1 | `NonceStore::increment` is the only write path besides admin sync |
//! | Increment only after CONFIRMED | `increment_confirmed` is keyed by the confirmed attempt; rejected attempts never reach it |
//! | No double consumption | a given attempt id consumes at most one nonce |
//!
//! ## Module Structure
//!
//! ```text
//! ls-01-nonce-manager/
//! ├── domain/      # NonceAction, NonceKey, NonceValidation, errors
//! ├── ports/       # NonceManagerApi (inbound) + NonceStore (outbound)
//! ├── adapters/    # InMemoryNonceStore
//! └── service.rs   # NonceManager
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryNonceStore;
pub use domain::{NonceAction, NonceError, NonceKey, NonceResult, NonceValidation, ObservedNonces};
pub use ports::{NonceManagerApi, NonceStore};
pub use service::NonceManager;
