//! # Ports
//!
//! - `inbound`: processor API driven by the event listener
//! - `outbound`: transactional record store

pub mod inbound;
pub mod outbound;

pub use inbound::EventProcessorApi;
pub use outbound::{EventStore, EventTxn};
