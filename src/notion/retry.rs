//! Retry manager for handling transient failures with exponential backoff
//!
//! Attempts are counted from 1. After attempt `n` fails with a retryable
//! error the manager sleeps `backoff_factor * 2^(n-1)` before attempt `n + 1`,
//! up to `max_attempts` attempts in total. Delays are deterministic unless a
//! jitter strategy is plugged in.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::RetryableError;

/// Strategy applied to each computed backoff delay
pub trait JitterStrategy: fmt::Debug + Send + Sync {
    /// Return the delay to actually sleep for
    fn apply(&self, delay: Duration) -> Duration;
}

/// Leaves delays untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterStrategy for NoJitter {
    fn apply(&self, delay: Duration) -> Duration {
        delay
    }
}

/// Scales delays by a random factor in `[0.5, 1.0)`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterStrategy for RandomJitter {
    fn apply(&self, delay: Duration) -> Duration {
        let factor = rand::thread_rng().gen_range(0.5..1.0);
        delay.mul_f64(factor)
    }
}

/// Retry manager with exponential backoff support
#[derive(Debug, Clone)]
pub struct RetryManager {
    max_attempts: u32,
    backoff_factor: Duration,
    jitter: Arc<dyn JitterStrategy>,
}

impl RetryManager {
    /// Create a RetryManager from configuration
    pub fn new(config: &RetryConfig) -> Self {
        let jitter: Arc<dyn JitterStrategy> = if config.jitter {
            Arc::new(RandomJitter)
        } else {
            Arc::new(NoJitter)
        };
        Self {
            max_attempts: config.effective_max_attempts(),
            backoff_factor: config.backoff_factor(),
            jitter,
        }
    }

    /// Create a RetryManager with default configuration
    pub fn with_defaults() -> Self {
        Self::new(&RetryConfig::default())
    }

    /// Replace the jitter strategy
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterStrategy>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total number of attempts per operation
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after attempt `attempt` (1-based) failed, before jitter
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.backoff_factor.saturating_mul(multiplier)
    }

    /// Execute an async operation with retry logic
    ///
    /// The closure receives the 1-based attempt number. Non-retryable errors
    /// are returned immediately; retryable errors are retried until
    /// `max_attempts` attempts have been made, and the last error is returned.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + fmt::Display,
    {
        let mut attempt = 1u32;

        loop {
            match operation(attempt).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if attempt >= self.max_attempts {
                        warn!(
                            attempts = attempt,
                            max_attempts = self.max_attempts,
                            error = %err,
                            "Max retries exhausted"
                        );
                        return Err(err);
                    }

                    let backoff = self.jitter.apply(self.calculate_backoff(attempt));
                    debug!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Sleeping before retry"
                    );

                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
