//! Bounded retry with a fixed backoff for catalog requests.
//!
//! A [`RetryPolicy`] wraps one fallible async operation. Errors are retried up
//! to `max_retries` times with `wait` between attempts; once exhausted the
//! failure is downgraded to `None`, which callers treat as "no match". A
//! successful `Ok(None)` from the operation is a clean no-match and is returned
//! immediately.
//!
//! ```
//! use std::time::Duration;
//! use libcat_core::retry::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(2, Duration::from_secs(1));
//! assert!(matches!(policy.should_retry(1), RetryDecision::Retry { .. }));
//! assert!(matches!(policy.should_retry(3), RetryDecision::DoNotRetry { .. }));
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default pause between attempts.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

/// Decision after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then make attempt number `attempt`.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// 1-indexed number of the next attempt.
        attempt: u32,
    },
    /// Give up.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Fixed-backoff retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            wait: DEFAULT_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries (so `max_retries + 1`
    /// attempts) with `wait` between them.
    #[must_use]
    pub fn new(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }

    /// Returns the configured retry count.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Decides what follows failed attempt number `attempt` (1-indexed).
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt > self.max_retries {
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }
        RetryDecision::Retry {
            delay: self.wait,
            attempt: attempt + 1,
        }
    }

    /// Runs `operation` until it succeeds or retries run out.
    ///
    /// Returns the operation's `Ok` value, or `None` after the last failed
    /// attempt. `label` names the request in logs.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Option<T>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(label, attempt, "attempting request");

            match operation().await {
                Ok(value) => return Some(value),
                Err(e) => match self.should_retry(attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        warn!(
                            label,
                            attempt = next_attempt,
                            max_attempts = self.max_retries + 1,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        warn!(
                            label,
                            attempts = attempt,
                            %reason,
                            error = %e,
                            "giving up on request"
                        );
                        return None;
                    }
                },
            }
        }
    }
}
