use std::time::Duration;

use rand::Rng;

/// Exponential backoff with uniform jitter:
/// `delay(n) = base * 2^n + uniform[0, base)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts including the first one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::rng())
    }

    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let base_nanos = u64::try_from(self.base_delay.as_nanos()).unwrap_or(u64::MAX);
        let jitter = if base_nanos == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(rng.random_range(0..base_nanos))
        };
        exponential.saturating_add(jitter)
    }
}
