//! Retry with exponential backoff for transient upstream failures
//!
//! Used by the REST client wrapper and the LLM providers. Callers decide
//! which errors are retryable; this module only paces the attempts.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff configuration for retrying failed operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: usize,

    /// Initial interval between retries in milliseconds
    pub initial_interval_ms: u64,

    /// Multiplier applied to the interval after each attempt
    pub backoff_factor: f64,

    /// Ceiling on the interval in milliseconds
    pub max_interval_ms: u64,

    /// Whether to randomize intervals (0.5x to 1.5x)
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a policy with the given attempt ceiling
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_interval_ms: 500,
            backoff_factor: 2.0,
            max_interval_ms: 60_000,
            jitter: true,
        }
    }

    /// Set the initial interval
    pub fn with_initial_interval_ms(mut self, ms: u64) -> Self {
        self.initial_interval_ms = ms;
        self
    }

    /// Set the interval ceiling
    pub fn with_max_interval_ms(mut self, ms: u64) -> Self {
        self.max_interval_ms = ms;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the retry following `attempt` (0-indexed)
    pub fn delay(&self, attempt: usize) -> Duration {
        let base = self.initial_interval_ms as f64 * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_interval_ms as f64);
        let final_ms = if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..=1.5);
            capped * factor
        } else {
            capped
        };
        Duration::from_millis(final_ms as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Run `operation` until it succeeds, a non-retryable error occurs, or the
/// attempt ceiling is reached.
///
/// `is_retryable` inspects the error; `retry_after` may return an explicit
/// wait (e.g. from a `Retry-After` header) that overrides the backoff.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    retry_after: impl Fn(&E) -> Option<Duration>,
    operation: F,
) -> std::result::Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_retryable(&error) {
                    return Err(error);
                }
                let delay = retry_after(&error).unwrap_or_else(|| policy.delay(attempt - 1));
                tracing::debug!(attempt, %error, ?delay, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
