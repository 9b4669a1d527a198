//! # Adapters
//!
//! Storage implementations for the event store port.

pub mod memory;

pub use memory::InMemoryEventStore;
