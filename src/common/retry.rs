//! Retry with backoff around rate-limited calls
//!
//! Throttled failures back off exponentially (1s, 2s, 4s...), other
//! transient failures wait a fixed delay, fatal failures are returned at once.
//! Throttled failures count against the same attempt budget as everything
//! else: when the final attempt is throttled the caller gets
//! [`ClientError::MaxRetriesExceeded`].

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use super::rate_limiter::RateLimiter;
use crate::error::{ClientError, ClientResult, FailureKind};

/// Configuration for retries
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_retries: u32,
    /// Delay after the first throttled attempt; doubles each attempt
    pub throttle_backoff_base: Duration,
    /// Delay after any other transient failure
    pub transient_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            throttle_backoff_base: Duration::from_secs(1),
            transient_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_throttle_backoff_base(mut self, base: Duration) -> Self {
        self.throttle_backoff_base = base;
        self
    }

    pub fn with_transient_delay(mut self, delay: Duration) -> Self {
        self.transient_delay = delay;
        self
    }

    /// Backoff after a throttled attempt (0-based): base * 2^attempt
    pub fn throttle_backoff(&self, attempt: u32) -> Duration {
        self.throttle_backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Gates every attempt through a [`RateLimiter`] and retries per [`RetryPolicy`]
///
/// Clones share the limiter, so one caller can be handed to several
/// collaborators without splitting the budget.
#[derive(Debug, Clone)]
pub struct RateLimitedCaller {
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl RateLimitedCaller {
    pub fn new(limiter: RateLimiter, policy: RetryPolicy) -> Self {
        Self { limiter, policy }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `request_fn` under the rate budget, retrying per the policy
    ///
    /// `label` names the call in log output.
    pub async fn call_with_retry<F, Fut, T>(&self, label: &str, request_fn: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        self.call_with_max_retries(label, self.policy.max_retries, request_fn)
            .await
    }

    /// Same as [`call_with_retry`](Self::call_with_retry) with an explicit attempt budget
    pub async fn call_with_max_retries<F, Fut, T>(
        &self,
        label: &str,
        max_retries: u32,
        mut request_fn: F,
    ) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let max_retries = max_retries.max(1);
        let mut attempt = 0;

        loop {
            self.limiter.await_admission().await;

            let err = match request_fn().await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::info!(
                            "{} succeeded on attempt {}/{}",
                            label,
                            attempt + 1,
                            max_retries
                        );
                    } else {
                        tracing::debug!("{} succeeded", label);
                    }
                    return Ok(result);
                }
                Err(e) => e,
            };

            let is_last = attempt + 1 >= max_retries;
            match err.kind() {
                FailureKind::Fatal => {
                    tracing::error!("{} failed with non-retryable error: {}", label, err);
                    return Err(err);
                }
                FailureKind::Throttled if is_last => {
                    tracing::error!(
                        "{} still rate limited after {} attempts: {}",
                        label,
                        max_retries,
                        err
                    );
                    return Err(ClientError::MaxRetriesExceeded {
                        attempts: max_retries,
                        source: Box::new(err),
                    });
                }
                FailureKind::Transient if is_last => {
                    tracing::error!(
                        "{} failed after {} attempts: {}",
                        label,
                        max_retries,
                        err
                    );
                    return Err(err);
                }
                FailureKind::Throttled => {
                    let delay = self.policy.throttle_backoff(attempt);
                    tracing::warn!(
                        "{} rate limited (attempt {}/{}), retrying in {:.1}s: {}",
                        label,
                        attempt + 1,
                        max_retries,
                        delay.as_secs_f64(),
                        err
                    );
                    sleep(delay).await;
                }
                FailureKind::Transient => {
                    let delay = self.policy.transient_delay;
                    tracing::warn!(
                        "{} attempt {}/{} failed, retrying in {:.1}s: {}",
                        label,
                        attempt + 1,
                        max_retries,
                        delay.as_secs_f64(),
                        err
                    );
                    sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }
}
