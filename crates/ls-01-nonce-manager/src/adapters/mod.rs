//! # Adapters
//!
//! Storage implementations for the nonce store port.

pub mod memory;

pub use memory::InMemoryNonceStore;
