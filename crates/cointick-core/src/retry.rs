//! Retry budget and backoff schedule.

use std::time::Duration;

/// Exponential delay between attempts: `base * factor^retry`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
    /// Spread each delay uniformly over +/- 50%.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            factor: 2.0,
            max: Duration::from_secs(60),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (0-based: the first retry is 0).
    pub fn delay(self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let seconds = (self.base.as_secs_f64() * self.factor.powi(exponent)).min(self.max.as_secs_f64());
        let delay = Duration::from_secs_f64(seconds.max(0.0));

        if !self.jitter {
            return delay;
        }
        let spread = delay.as_millis() as u64 / 2;
        let offset = fastrand::u64(0..=spread * 2);
        Duration::from_millis((delay.as_millis() as u64 + offset).saturating_sub(spread))
    }
}

/// Retry budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Total physical attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn no_retry() -> Self {
        Self::exponential(0)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}
