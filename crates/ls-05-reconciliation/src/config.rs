//! # Reconciliation Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciliation job configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Time between scheduled passes.
    pub interval: Duration,

    /// PREPARED attempts younger than this are left alone.
    pub prepared_grace: Duration,

    /// Confirmed blocks scanned for phantom executions. `0` disables the scan.
    pub phantom_lookback_blocks: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            prepared_grace: Duration::from_secs(10 * 60),
            phantom_lookback_blocks: 100,
        }
    }
}

impl ReconciliationConfig {
    /// Create a config for testing (short interval and grace).
    pub fn for_testing() -> Self {
        Self {
            interval: Duration::from_secs(1),
            prepared_grace: Duration::from_secs(60),
            phantom_lookback_blocks: 10,
        }
    }

    pub fn prepared_grace_ms(&self) -> u64 {
        u64::try_from(self.prepared_grace.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconciliationConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.prepared_grace_ms(), 600_000);
        assert_eq!(config.phantom_lookback_blocks, 100);
    }
}
