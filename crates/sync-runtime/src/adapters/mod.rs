//! # Adapters
//!
//! Port implementations connecting subsystems to each other.

pub mod event_feed;

pub use event_feed::ProcessorEventFeed;
