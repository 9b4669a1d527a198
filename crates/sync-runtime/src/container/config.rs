//! # Runtime Configuration
//!
//! Aggregates every subsystem config. Defaults are the production values;
//! `LS_*` environment variables override them.

use ls_02_tx_tracker::TrackerConfig;
use ls_03_event_processor::ProcessorConfig;
use ls_04_event_listener::ListenerConfig;
use ls_05_reconciliation::ReconciliationConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub tracker: TrackerConfig,
    pub processor: ProcessorConfig,
    pub listener: ListenerConfig,
    pub reconciliation: ReconciliationConfig,
    /// How long `shutdown` waits for the tasks to finish.
    pub shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            processor: ProcessorConfig::default(),
            listener: ListenerConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: String, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("max_error_backoff ({max:?}) is shorter than error_backoff ({base:?})")]
    BackoffCapTooSmall { base: Duration, max: Duration },
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
    }
}

impl RuntimeConfig {
    /// Create a config for testing (every subsystem's test values).
    pub fn for_testing() -> Self {
        Self {
            tracker: TrackerConfig::for_testing(),
            processor: ProcessorConfig::for_testing(),
            listener: ListenerConfig::for_testing(),
            reconciliation: ReconciliationConfig::for_testing(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    /// Load from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `LS_DEFAULT_TTL_MS`, `LS_MAX_RETRIES`, `LS_MAX_BATCH_STATUS`: tracker
    /// - `LS_ROLLBACK_WINDOW`: processor
    /// - `LS_BATCH_SIZE`, `LS_POLL_INTERVAL_MS`, `LS_ERROR_BACKOFF_MS`,
    ///   `LS_MAX_ERROR_BACKOFF_MS`, `LS_START_BLOCK`: listener
    /// - `LS_RECONCILE_INTERVAL_SECS`, `LS_PREPARED_GRACE_SECS`,
    ///   `LS_PHANTOM_LOOKBACK_BLOCKS`: reconciliation
    /// - `LS_SHUTDOWN_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse(&lookup, "LS_DEFAULT_TTL_MS")? {
            config.tracker.default_ttl_ms = v;
        }
        if let Some(v) = parse(&lookup, "LS_MAX_RETRIES")? {
            config.tracker.max_retries = v;
        }
        if let Some(v) = parse(&lookup, "LS_MAX_BATCH_STATUS")? {
            config.tracker.max_batch_status = v;
        }
        if let Some(v) = parse(&lookup, "LS_ROLLBACK_WINDOW")? {
            config.processor.rollback_window = v;
        }
        if let Some(v) = parse(&lookup, "LS_BATCH_SIZE")? {
            config.listener.batch_size = v;
        }
        if let Some(v) = parse(&lookup, "LS_POLL_INTERVAL_MS")? {
            config.listener.poll_interval = Duration::from_millis(v);
        }
        if let Some(v) = parse(&lookup, "LS_ERROR_BACKOFF_MS")? {
            config.listener.error_backoff = Duration::from_millis(v);
        }
        if let Some(v) = parse(&lookup, "LS_MAX_ERROR_BACKOFF_MS")? {
            config.listener.max_error_backoff = Duration::from_millis(v);
        }
        if let Some(v) = parse(&lookup, "LS_START_BLOCK")? {
            config.listener.start_block = v;
        }
        if let Some(v) = parse(&lookup, "LS_RECONCILE_INTERVAL_SECS")? {
            config.reconciliation.interval = Duration::from_secs(v);
        }
        if let Some(v) = parse(&lookup, "LS_PREPARED_GRACE_SECS")? {
            config.reconciliation.prepared_grace = Duration::from_secs(v);
        }
        if let Some(v) = parse(&lookup, "LS_PHANTOM_LOOKBACK_BLOCKS")? {
            config.reconciliation.phantom_lookback_blocks = v;
        }
        if let Some(v) = parse(&lookup, "LS_SHUTDOWN_TIMEOUT_SECS")? {
            config.shutdown_timeout = Duration::from_secs(v);
        }

        Ok(config)
    }

    /// Reject values that would stall or spin the long-lived tasks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero: [(&'static str, bool); 7] = [
            ("tracker.default_ttl_ms", self.tracker.default_ttl_ms > 0),
            ("tracker.max_batch_status", self.tracker.max_batch_status > 0),
            ("listener.batch_size", self.listener.batch_size > 0),
            ("listener.poll_interval", !self.listener.poll_interval.is_zero()),
            ("listener.error_backoff", !self.listener.error_backoff.is_zero()),
            ("listener.push_buffer", self.listener.push_buffer > 0),
            ("reconciliation.interval", !self.reconciliation.interval.is_zero()),
        ];
        for (name, ok) in non_zero {
            if !ok {
                return Err(ConfigError::Zero { name });
            }
        }
        if self.listener.max_error_backoff < self.listener.error_backoff {
            return Err(ConfigError::BackoffCapTooSmall {
                base: self.listener.error_backoff,
                max: self.listener.max_error_backoff,
            });
        }
        Ok(())
    }
}
