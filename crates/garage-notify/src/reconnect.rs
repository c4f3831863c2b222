//! Reconnect policy for the notification stream.

use std::time::Duration;

use rand::Rng;

/// Delay schedule applied between failed stream attempts.
///
/// The default is a fixed five second interval with no attempt cap, which
/// keeps retrying until the connection is deliberately closed.
/// [`RetryPolicy::exponential`] swaps in a capped, jittered curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt (1.0 = fixed interval).
    pub factor: f64,
    /// Random jitter factor (0.0–1.0).
    pub jitter: f64,
    /// Maximum number of consecutive retries (None = infinite).
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Retry forever at a fixed interval.
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_delay: interval,
            max_delay: interval,
            factor: 1.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    /// Doubling backoff from `initial` up to `max`, with 10% jitter.
    #[must_use]
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            factor: 2.0,
            jitter: 0.1,
            max_attempts: None,
        }
    }

    /// Cap the number of consecutive retries.
    #[must_use]
    pub fn max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the jitter factor.
    #[must_use]
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another retry is allowed after `attempt` consecutive failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.initial_delay.is_zero() {
            return Err("Initial reconnect delay must be > 0".to_string());
        }
        if self.max_delay.is_zero() {
            return Err("Max reconnect delay must be > 0".to_string());
        }
        if self.max_delay < self.initial_delay {
            return Err("Max reconnect delay must be >= initial reconnect delay".to_string());
        }
        if self.factor < 1.0 || !self.factor.is_finite() {
            return Err("Backoff factor must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) || !self.jitter.is_finite() {
            return Err("Jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    /// Delay to wait before retry number `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64();
        let exponent = self.factor.powf(f64::from(attempt));
        let base = (initial * exponent).min(max);

        if self.jitter == 0.0 {
            return Duration::from_secs_f64(base);
        }

        let mut rng = rand::rng();
        let randomized = rng.random_range(0.0..=base);
        let blended = base * (1.0 - self.jitter) + randomized * self.jitter;
        Duration::from_secs_f64(blended)
    }
}
