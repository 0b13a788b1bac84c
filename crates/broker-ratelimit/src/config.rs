//! Rate limit policy configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a single rate limit policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum requests allowed within the window.
    pub max_requests: u32,
    /// Fixed window duration.
    pub window: Duration,
    /// Whether the policy is enforced.
    pub enabled: bool,
}

impl PolicyConfig {
    /// Creates an enabled policy with the given limit and window.
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            enabled: true,
        }
    }
}

/// Configuration for all three policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Login attempts, keyed by client IP.
    pub login: PolicyConfig,
    /// Request creation, keyed by requester identity.
    pub request_creation: PolicyConfig,
    /// Secret views, keyed by viewer identity.
    pub secret_view: PolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: PolicyConfig::new(5, Duration::from_secs(15 * 60)),
            request_creation: PolicyConfig::new(10, Duration::from_secs(60 * 60)),
            secret_view: PolicyConfig::new(3, Duration::from_secs(60)),
        }
    }
}
