//! Utility modules for plansmith-core
//!
//! - retry: Retry logic with exponential backoff
//! - rate_limiter: Per-provider admission control for backend calls

mod rate_limiter;
mod retry;

pub use rate_limiter::{
    ProviderRateLimiter, RateLimitError, RateLimitScope, RateLimitSettings, RatePermit,
    RatePolicy, SlidingWindow, WindowCheck, WindowConfig, GLOBAL_KEY,
};
pub use retry::{retry_with_backoff, Retried, RetryConfig, RetryError};

use std::time::Duration;

/// Whole milliseconds in `duration`, rounded up and saturating
///
/// A non-zero duration never maps to 0, which settings read as "disabled".
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    let nanos = duration.as_nanos();
    u64::try_from(nanos.div_ceil(1_000_000)).unwrap_or(u64::MAX)
}
