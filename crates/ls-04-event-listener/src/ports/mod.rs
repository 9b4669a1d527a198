//! # Ports
//!
//! - `inbound`: listener control surface used by the runtime
//! - `outbound`: ledger event source (push and pull)

pub mod inbound;
pub mod outbound;

pub use inbound::EventListenerApi;
pub use outbound::{LedgerEventSource, MockLedgerSource};
