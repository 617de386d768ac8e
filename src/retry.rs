//! Poll-cycle retry and backoff controller
//!
//! Tracks consecutive poll failures and computes the next poll delay.
//! The controller never gives up: once the retry cap is hit it warns and
//! resets itself to the base interval.

use tracing::warn;

/// Backoff state threaded through the poll loop.
///
/// Invariant preserved from the original service: a success resets the
/// failure count but NOT the interval, so a single good cycle after a
/// string of failures keeps polling at the last computed delay. The base
/// interval is only restored by the max-retries reset path.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_count: u32,
    interval_ms: u64,
    base_interval_ms: u64,
    max_retries: u32,
    backoff_factor: u64,
}

impl RetryPolicy {
    pub fn new(base_interval_ms: u64, max_retries: u32, backoff_factor: u64) -> Self {
        Self {
            retry_count: 0,
            interval_ms: base_interval_ms,
            base_interval_ms,
            max_retries,
            backoff_factor,
        }
    }

    /// Transition applied when a poll cycle fails
    pub fn on_failure(&mut self) {
        if self.retry_count < self.max_retries {
            self.retry_count += 1;
            self.interval_ms = self.base_interval_ms * self.backoff_factor.pow(self.retry_count);
            warn!(
                retry = self.retry_count,
                interval_ms = self.interval_ms,
                "poll cycle failed, retrying"
            );
        } else {
            warn!("max retries reached, service will continue attempts");
            self.retry_count = 0;
            self.interval_ms = self.base_interval_ms;
        }
    }

    /// Transition applied when a poll cycle completes cleanly
    pub fn on_success(&mut self) {
        self.retry_count = 0;
    }

    /// Delay before the next poll cycle
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}
