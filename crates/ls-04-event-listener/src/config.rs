//! # Event Listener Configuration

use serde::{Deserialize, Serialize};
use shared_types::BlockHeight;
use std::time::Duration;

/// Event listener configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Blocks fetched per catch-up request.
    pub batch_size: u64,

    /// Delay between successful polls.
    pub poll_interval: Duration,

    /// Delay after the first failed poll. Doubles per consecutive failure.
    pub error_backoff: Duration,

    /// Upper bound for the failure delay.
    pub max_error_backoff: Duration,

    /// Last block considered processed when no checkpoint exists yet.
    pub start_block: BlockHeight,

    /// Capacity of the push subscription channel.
    pub push_buffer: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_secs(5),
            error_backoff: Duration::from_secs(10),
            max_error_backoff: Duration::from_secs(60),
            start_block: 0,
            push_buffer: 1024,
        }
    }
}

impl ListenerConfig {
    /// Create a config for testing (tiny batches, short delays).
    pub fn for_testing() -> Self {
        Self {
            batch_size: 2,
            poll_interval: Duration::from_millis(50),
            error_backoff: Duration::from_millis(100),
            max_error_backoff: Duration::from_millis(400),
            start_block: 0,
            push_buffer: 16,
        }
    }
}
