//! Shared bounded-retry primitive.
//!
//! The configuration surface carries one `max_retries`/`retry_delay` pair
//! per concern; this module is the single implementation behind all of
//! them, parameterized by an error-classifier so each caller decides what
//! counts as transient.

use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tracing::debug;

/// Bounded retry policy: how many retries after the first attempt, and
/// how long to wait between attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt. Zero means a single
    /// attempt with no retry.
    pub max_retries: u32,

    /// Delay between consecutive attempts.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Policy that performs exactly one attempt.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self { max_retries: 0, retry_delay: Duration::ZERO }
    }

    /// Total attempts this policy allows.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Result of a retried operation, including every intermediate failure so
/// callers can build complete attempt histories.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// The final attempt's result.
    pub result: Result<T, E>,
    /// Errors from attempts that were retried, in order.
    pub failures: Vec<E>,
}

impl<T, E> RetryOutcome<T, E> {
    /// Total number of attempts that were made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        u32::try_from(self.failures.len()).unwrap_or(u32::MAX).saturating_add(1)
    }
}

/// Runs `op` until it succeeds, returns a non-retryable error, or the
/// policy's attempt budget is exhausted.
///
/// `is_retryable` classifies errors: a terminal error ends the loop
/// immediately with zero further attempts, which is how deterministic
/// rejections bypass the retry budget entirely.
pub async fn retry_with_policy<T, E, F, Fut>(
    policy: RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut failures = Vec::new();

    loop {
        match op().await {
            Ok(value) => return RetryOutcome { result: Ok(value), failures },
            Err(error) => {
                let attempts_made = u32::try_from(failures.len()).unwrap_or(u32::MAX) + 1;
                if !is_retryable(&error) || attempts_made >= policy.max_attempts() {
                    return RetryOutcome { result: Err(error), failures };
                }
                debug!(attempt = attempts_made, error = %error, "retrying after transient failure");
                failures.push(error);
                tokio::time::sleep(policy.retry_delay).await;
            }
        }
    }
}
