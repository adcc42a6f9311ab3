//! Reusable retry policy with exponential backoff.
//!
//! Wraps any fallible async operation. Only errors classified as
//! [`Transient`] are retried; everything else returns on the first failure.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::RetryConfig;

/// Classification of an error for retry purposes.
pub trait Transient {
    /// Whether retrying the same call might succeed.
    fn is_transient(&self) -> bool;

    /// Server-provided minimum wait before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Bounded exponential backoff policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            multiplier: DEFAULT_MULTIPLIER,
            max_backoff: Duration::from_secs(32),
            jitter: false,
        }
    }

    /// Policy that retries without sleeping. Intended for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::immediate(1)
    }

    /// Growth factor between attempts. Values below 1.0 or not finite fall
    /// back to [`DEFAULT_MULTIPLIER`].
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            DEFAULT_MULTIPLIER
        };
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (0-based), before jitter.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()))
    }

    fn delay_for<E: Transient>(&self, attempt: u32, err: &E) -> Duration {
        let mut delay = self.backoff_for(attempt);
        if self.jitter && !delay.is_zero() {
            // Up to 25% extra
            let factor = rand::thread_rng().gen_range(0.0..0.25);
            delay += delay.mul_f64(factor);
        }
        match err.retry_after() {
            Some(server) => delay.max(server),
            None => delay,
        }
    }

    /// Run `operation`, retrying transient failures up to `max_attempts` total calls.
    pub async fn run<F, Fut, T, E>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if !e.is_transient() || attempt >= self.max_attempts {
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt - 1, &e);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
        )
        .with_multiplier(config.backoff_multiplier)
        .with_max_backoff(Duration::from_millis(config.max_backoff_ms))
        .with_jitter(config.jitter)
    }
}
