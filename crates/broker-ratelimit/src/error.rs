//! Error types for rate limiting.

use std::time::Duration;

use thiserror::Error;

use crate::limiter::RateLimitPolicy;

/// Errors produced by the rate limiter.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The key exceeded the policy's window limit.
    ///
    /// Distinguishable from any authentication failure; callers surface it
    /// as a 429-class outcome.
    #[error("rate limit exceeded for policy {policy}: {current}/{max} in {window:?}")]
    LimitExceeded {
        /// The breached policy.
        policy: RateLimitPolicy,
        /// Count observed in the current window, including this attempt.
        current: u32,
        /// Maximum allowed in the window.
        max: u32,
        /// The window duration.
        window: Duration,
    },
}

/// Result type alias for rate limit checks.
pub type Result<T> = std::result::Result<T, RateLimitError>;
