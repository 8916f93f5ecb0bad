//! Dual-budget rate limiter
//!
//! Paces outbound calls so that no two admissions are closer than
//! `1 / requests_per_second` and no trailing 60-second window holds more
//! than `requests_per_minute` admissions.
//!
//! Time is read from `tokio::time`, so tests can pause the runtime clock and
//! simulate minutes of waiting instantly.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Length of the sliding window for the per-minute budget
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimiterError {
    #[error("requests_per_second must be a positive finite number, got {0}")]
    InvalidRate(f64),
    #[error("requests_per_second {0} is too small, spacing does not fit in a Duration")]
    SpacingOverflow(f64),
    #[error("requests_per_minute must be at least 1")]
    InvalidPerMinute,
}

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Minimum spacing between calls is `1 / requests_per_second`
    pub requests_per_second: f64,
    /// Maximum calls admitted in any trailing 60 seconds
    pub requests_per_minute: usize,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            requests_per_minute: 5,
        }
    }
}

impl RateLimiterConfig {
    pub fn with_rate(mut self, requests_per_second: f64) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_per_minute(mut self, requests_per_minute: usize) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    pub fn validate(&self) -> Result<(), RateLimiterError> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(RateLimiterError::InvalidRate(self.requests_per_second));
        }
        if self.requests_per_minute == 0 {
            return Err(RateLimiterError::InvalidPerMinute);
        }
        self.min_spacing().map(|_| ())
    }

    /// Minimum time between two admitted calls
    pub fn min_spacing(&self) -> Result<Duration, RateLimiterError> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(RateLimiterError::InvalidRate(self.requests_per_second));
        }
        Duration::try_from_secs_f64(1.0 / self.requests_per_second)
            .map_err(|_| RateLimiterError::SpacingOverflow(self.requests_per_second))
    }
}

/// Mutable rate state: admissions in the trailing window plus the last one
#[derive(Debug)]
pub struct RateBudget {
    requests_per_minute: usize,
    min_spacing: Duration,
    call_timestamps: VecDeque<Instant>,
    last_call_timestamp: Option<Instant>,
}

impl RateBudget {
    pub fn new(config: &RateLimiterConfig) -> Result<Self, RateLimiterError> {
        config.validate()?;
        Ok(Self {
            requests_per_minute: config.requests_per_minute,
            min_spacing: config.min_spacing()?,
            call_timestamps: VecDeque::new(),
            last_call_timestamp: None,
        })
    }

    /// Drop timestamps that are 60 seconds old or older
    fn prune(&mut self, now: Instant) {
        // Timestamps are appended in order, so the oldest is always at the front
        while let Some(&oldest) = self.call_timestamps.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.call_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time still to wait before the per-second spacing is satisfied
    fn spacing_wait(&self, now: Instant) -> Option<Duration> {
        let last = self.last_call_timestamp?;
        let elapsed = now.duration_since(last);
        (elapsed < self.min_spacing).then(|| self.min_spacing - elapsed)
    }

    /// Time until the oldest admission leaves the window, if the window is full
    ///
    /// Assumes `prune` ran with the same `now`.
    fn window_wait(&self, now: Instant) -> Option<Duration> {
        if self.call_timestamps.len() < self.requests_per_minute {
            return None;
        }
        let oldest = *self.call_timestamps.front()?;
        Some(WINDOW.saturating_sub(now.duration_since(oldest)))
    }

    fn record(&mut self, now: Instant) {
        self.call_timestamps.push_back(now);
        self.last_call_timestamp = Some(now);
    }

    /// Admissions currently counted against the per-minute budget
    pub fn in_window(&self) -> usize {
        self.call_timestamps.len()
    }

    pub fn last_call(&self) -> Option<Instant> {
        self.last_call_timestamp
    }
}

/// Shared handle to a single [`RateBudget`]
///
/// Clones share state. The budget lock is held for the whole admission,
/// waits included, so concurrent callers are admitted one at a time.
///
/// # Example
///
/// ```
/// use persona_rag::common::{RateLimiter, RateLimiterConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let config = RateLimiterConfig::default().with_rate(2.0).with_per_minute(5);
///     let limiter = RateLimiter::new(config).unwrap();
///
///     limiter.await_admission().await;
///     // Make API request...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    budget: Arc<Mutex<RateBudget>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Result<Self, RateLimiterError> {
        Ok(Self {
            budget: Arc::new(Mutex::new(RateBudget::new(&config)?)),
        })
    }

    /// Wait until a call may be issued without breaking either budget
    ///
    /// Records the admission and returns its timestamp. Never fails.
    pub async fn await_admission(&self) -> Instant {
        let mut budget = self.budget.lock().await;

        if let Some(wait) = budget.spacing_wait(Instant::now()) {
            tracing::trace!("Spacing calls, waiting {}ms", wait.as_millis());
            sleep(wait).await;
        }

        let mut now = Instant::now();
        budget.prune(now);
        while let Some(wait) = budget.window_wait(now) {
            tracing::debug!(
                "Per-minute budget of {} reached, waiting {:.1}s",
                budget.requests_per_minute,
                wait.as_secs_f64()
            );
            sleep(wait).await;
            now = Instant::now();
            budget.prune(now);
        }

        budget.record(now);
        now
    }

    /// Admissions in the trailing window right now
    pub async fn in_window(&self) -> usize {
        let mut budget = self.budget.lock().await;
        budget.prune(Instant::now());
        budget.in_window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: f64, rpm: usize) -> RateLimiter {
        RateLimiter::new(
            RateLimiterConfig::default()
                .with_rate(rps)
                .with_per_minute(rpm),
        )
        .unwrap()
    }

    async fn admit_n(limiter: &RateLimiter, n: usize) -> Vec<Instant> {
        let mut stamps = Vec::with_capacity(n);
        for _ in 0..n {
            stamps.push(limiter.await_admission().await);
        }
        stamps
    }

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.requests_per_second, 2.0);
        assert_eq!(config.requests_per_minute, 5);
        assert_eq!(config.min_spacing(), Ok(Duration::from_millis(500)));
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            RateLimiterConfig::default().with_rate(0.0).validate(),
            Err(RateLimiterError::InvalidRate(0.0))
        );
        assert!(RateLimiterConfig::default()
            .with_rate(f64::NAN)
            .validate()
            .is_err());
        assert_eq!(
            RateLimiterConfig::default().with_per_minute(0).validate(),
            Err(RateLimiterError::InvalidPerMinute)
        );
        assert!(RateLimiter::new(RateLimiterConfig::default().with_rate(-1.0)).is_err());
    }

    #[test]
    fn test_tiny_rate_rejected_instead_of_overflowing() {
        let config = RateLimiterConfig::default().with_rate(1e-20);
        assert_eq!(config.validate(), Err(RateLimiterError::SpacingOverflow(1e-20)));
        assert!(matches!(
            RateLimiter::new(config),
            Err(RateLimiterError::SpacingOverflow(_))
        ));

        // Slow but representable
        let slow = RateLimiterConfig::default().with_rate(1.0 / 1_048_576.0);
        assert_eq!(slow.min_spacing(), Ok(Duration::from_secs(1_048_576)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_per_minute_budget_does_not_preallocate() {
        let limiter = limiter(1000.0, usize::MAX);
        admit_n(&limiter, 3).await;
        assert_eq!(limiter.in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_admission_is_immediate() {
        let limiter = limiter(2.0, 5);
        let start = Instant::now();
        let admitted = limiter.await_admission().await;
        assert_eq!(admitted, start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_calls_are_spaced() {
        let limiter = limiter(2.0, 100);
        let first = limiter.await_admission().await;
        let second = limiter.await_admission().await;
        assert!(second.duration_since(first) >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_two_admissions_closer_than_spacing() {
        let limiter = limiter(4.0, 1000);
        let stamps = admit_n(&limiter, 25).await;
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_already_elapsed_does_not_wait() {
        let limiter = limiter(2.0, 100);
        let first = limiter.await_admission().await;
        sleep(Duration::from_secs(3)).await;
        let second = limiter.await_admission().await;
        assert_eq!(second.duration_since(first), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_call_waits_for_window() {
        let limiter = limiter(2.0, 5);
        let stamps = admit_n(&limiter, 6).await;
        assert!(stamps[4].duration_since(stamps[0]) < WINDOW);
        assert!(stamps[5].duration_since(stamps[0]) >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_per_minute_budget() {
        let rpm = 5;
        let limiter = limiter(10.0, rpm);
        let stamps = admit_n(&limiter, 23).await;

        for (i, start) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < WINDOW)
                .count();
            assert!(in_window <= rpm, "window at {} held {} calls", i, in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_window_prunes_old_entries() {
        let limiter = limiter(10.0, 5);
        admit_n(&limiter, 3).await;
        assert_eq!(limiter.in_window().await, 3);

        sleep(WINDOW).await;
        assert_eq!(limiter.in_window().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_budget() {
        let a = limiter(1.0, 100);
        let b = a.clone();
        let first = a.await_admission().await;
        let second = b.await_admission().await;
        assert!(second.duration_since(first) >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_respect_spacing() {
        let limiter = limiter(2.0, 1000);
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let l = limiter.clone();
                tokio::spawn(async move { l.await_admission().await })
            })
            .collect();

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.unwrap());
        }
        stamps.sort();
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(500));
        }
    }
}
