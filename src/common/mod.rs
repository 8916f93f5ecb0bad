//! Request pacing shared by every outbound provider call
//!
//! - Dual-budget rate limiter (per-second spacing + per-minute sliding window)
//! - Retry logic with exponential backoff for throttled calls

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateBudget, RateLimiter, RateLimiterConfig, RateLimiterError, WINDOW};
pub use retry::{RateLimitedCaller, RetryPolicy};
