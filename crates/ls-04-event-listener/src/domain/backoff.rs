//! Poll scheduling with exponential backoff on failure.

use std::time::Duration;

/// Delay before the next poll.
///
/// Success always schedules `poll_interval`. Consecutive failures schedule
/// `error_backoff`, doubling each time, capped at `max_error_backoff`.
#[derive(Clone, Debug)]
pub struct PollBackoff {
    poll_interval: Duration,
    error_backoff: Duration,
    max_error_backoff: Duration,
    failures: u32,
}

impl PollBackoff {
    pub fn new(poll_interval: Duration, error_backoff: Duration, max_error_backoff: Duration) -> Self {
        Self {
            poll_interval,
            error_backoff,
            max_error_backoff: max_error_backoff.max(error_backoff),
            failures: 0,
        }
    }

    /// Reset and return the regular poll delay.
    pub fn on_success(&mut self) -> Duration {
        self.failures = 0;
        self.poll_interval
    }

    /// Count a failure and return the backoff delay.
    pub fn on_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let exponent = (self.failures - 1).min(16);
        self.error_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_error_backoff)
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
