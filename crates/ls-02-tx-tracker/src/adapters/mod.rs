//! # Adapters
//!
//! Storage implementations for the transaction store port.

pub mod memory;

pub use memory::InMemoryTransactionStore;
