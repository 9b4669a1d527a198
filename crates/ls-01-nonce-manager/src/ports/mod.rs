//! # Ports
//!
//! - `inbound`: API exposed to the caller layer
//! - `outbound`: storage dependency

pub mod inbound;
pub mod outbound;

pub use inbound::NonceManagerApi;
pub use outbound::NonceStore;
