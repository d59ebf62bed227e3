//! Retry policies for the event publisher and subscriber.

use std::time::Duration;

use rand::Rng;

/// How a publish reacts to an unknown topic: recreate the topic, wait
/// `backoff`, resend, at most `max_retries` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishRetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl PublishRetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for PublishRetryPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(2))
    }
}

/// Bounded exponential backoff used when connecting to the bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Total connection attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed, in `[0, 1]`.
    pub jitter: f64,
}

impl BackoffPolicy {
    /// Delay to wait after the `attempt`-th failure (1-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Applies jitter to [`base_delay`](Self::base_delay).
    ///
    /// `sample` is a uniform value in `[0, 1)`; `0.5` yields the base delay.
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = 1.0 + jitter * (2.0 * sample.clamp(0.0, 1.0) - 1.0);
        let millis = self.base_delay(attempt).as_millis() as f64 * factor;
        Duration::from_millis(millis.round() as u64)
    }

    /// Jittered delay using the thread-local RNG.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let sample: f64 = rand::rng().random();
        self.delay_with_sample(attempt, sample)
    }

    /// A policy with a single attempt and no waiting.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(300),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_retry_defaults() {
        let policy = PublishRetryPolicy::default();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }

    #[test]
    fn test_base_delay_grows_exponentially() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.base_delay(1), Duration::from_millis(300));
        assert_eq!(policy.base_delay(2), Duration::from_millis(600));
        assert_eq!(policy.base_delay(3), Duration::from_millis(1200));
    }

    #[test]
    fn test_base_delay_is_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay(20), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.delay_with_sample(1, 0.5), Duration::from_millis(300));
        assert_eq!(policy.delay_with_sample(1, 0.0), Duration::from_millis(240));
        assert_eq!(policy.delay_with_sample(1, 1.0), Duration::from_millis(360));
    }

    #[test]
    fn test_random_delay_stays_within_jitter() {
        let policy = BackoffPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(480));
            assert!(delay <= Duration::from_millis(720));
        }
    }
}
