//! Exponential-backoff retry executor shared by every draw phase.
//!
//! The first attempt runs immediately; retry `i` (0-based) waits `base_delay * 2^i`.
//! Errors that cannot succeed on a second try (decode, signing, config) surface at once.

use crate::error::Result;
use crate::utils::error::compact_error;
use std::future::Future;
use tokio::time::{sleep, Duration};

const MAX_BACKOFF_SHIFT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that gives up after the first failure.
    pub const fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        let factor = 1u32 << retry_index.min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the policy is exhausted.
///
/// `op` receives the 0-based attempt number so callers can re-read chain state before
/// resubmitting a transaction whose confirmation may have been lost.
pub async fn run_with_retry<T, Op, Fut>(policy: RetryPolicy, context: &str, mut op: Op) -> Result<T>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(
                        "[RETRY] {} succeeded on attempt {}/{}",
                        context,
                        attempt + 1,
                        total_attempts
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                let retryable = err.is_retryable();
                if !retryable || attempt >= policy.max_retries {
                    tracing::warn!(
                        "[RETRY] {} gave up on attempt {}/{} (retryable={}): {}",
                        context,
                        attempt + 1,
                        total_attempts,
                        retryable,
                        compact_error(&err)
                    );
                    return Err(err);
                }
                let delay = policy.backoff_delay(attempt);
                tracing::warn!(
                    "[RETRY] {} failed on attempt {}/{}; retrying in {}ms: {}",
                    context,
                    attempt + 1,
                    total_attempts,
                    delay.as_millis(),
                    compact_error(&err)
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
