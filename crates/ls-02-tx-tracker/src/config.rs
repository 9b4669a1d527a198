//! # Tracker Configuration

use serde::{Deserialize, Serialize};

/// Default attempt lifetime: 5 minutes.
pub const DEFAULT_TTL_MS: u64 = 300_000;

/// Default retry budget per logical action.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Largest accepted batch status lookup.
pub const MAX_BATCH_STATUS: usize = 50;

/// Transaction tracker configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Lifetime of a new attempt when `prepare` gets no explicit TTL.
    pub default_ttl_ms: u64,

    /// `max_retries` stamped on new records.
    pub max_retries: u32,

    /// Upper bound on keys per `batch_status` call.
    pub max_batch_status: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: DEFAULT_TTL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_batch_status: MAX_BATCH_STATUS,
        }
    }
}

impl TrackerConfig {
    /// Create a config for testing (short TTL).
    pub fn for_testing() -> Self {
        Self {
            default_ttl_ms: 1_000,
            max_retries: 2,
            max_batch_status: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_batch_status, 50);
    }

    #[test]
    fn test_testing_config_is_smaller() {
        let config = TrackerConfig::for_testing();
        assert!(config.default_ttl_ms < DEFAULT_TTL_MS);
    }
}
