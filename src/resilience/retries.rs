//! Bounded retry with exponential backoff.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times
//! - Wait `min(base * 2^(n-1), max)` after failed attempt `n`
//! - Stop early on success or on a failure the caller deems permanent
//!
//! # Design Decisions
//! - The caller classifies errors; the loop knows nothing about HTTP
//! - Exhaustion hands back the last error with the attempt count

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::delay::Delay;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter_ratio: config.jitter_ratio,
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms, self.jitter_ratio)
    }
}

/// The operation failed on every attempt it was allowed (or permanently).
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E: std::error::Error + 'static> {
    pub attempts: u32,
    #[source]
    pub last_error: E,
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// attempts. `operation` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    delay: &dyn Delay,
    is_retriable: R,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && is_retriable(&e) => {
                let wait = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = wait.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                metrics::record_retry();
                delay.sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: e,
                })
            }
        }
    }
}
