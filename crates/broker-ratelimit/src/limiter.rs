//! Fixed-window counters keyed by actor or IP.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PolicyConfig, RateLimitConfig};
use crate::error::{RateLimitError, Result};

/// The three independent rate limit policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPolicy {
    /// Login attempts, keyed by client IP.
    Login,
    /// Request creation, keyed by requester identity.
    RequestCreation,
    /// Secret views, keyed by viewer identity.
    SecretView,
}

impl RateLimitPolicy {
    /// Returns the policy name used in audit details.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::RequestCreation => "request_creation",
            Self::SecretView => "secret_view",
        }
    }
}

impl fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fixed-window counter.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    window_start: Instant,
}

impl Window {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.duration_since(self.window_start) >= window
    }
}

/// Rate limiter holding counters for all three policies.
///
/// Counters are `(key -> { count, window_start })` maps behind one lock per
/// policy; a check-and-increment runs entirely under the write lock, so
/// concurrent bursts never undercount. Expired windows are replaced on
/// access; [`RateLimiter::sweep_expired`] reclaims idle keys.
pub struct RateLimiter {
    config: RateLimitConfig,
    login: RwLock<HashMap<String, Window>>,
    request_creation: RwLock<HashMap<String, Window>>,
    secret_view: RwLock<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            login: RwLock::new(HashMap::new()),
            request_creation: RwLock::new(HashMap::new()),
            secret_view: RwLock::new(HashMap::new()),
        }
    }

    fn policy_config(&self, policy: RateLimitPolicy) -> &PolicyConfig {
        match policy {
            RateLimitPolicy::Login => &self.config.login,
            RateLimitPolicy::RequestCreation => &self.config.request_creation,
            RateLimitPolicy::SecretView => &self.config.secret_view,
        }
    }

    fn windows(&self, policy: RateLimitPolicy) -> &RwLock<HashMap<String, Window>> {
        match policy {
            RateLimitPolicy::Login => &self.login,
            RateLimitPolicy::RequestCreation => &self.request_creation,
            RateLimitPolicy::SecretView => &self.secret_view,
        }
    }

    /// Checks the key against the policy and records the attempt if allowed.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::LimitExceeded`] when the key has exhausted
    /// the window.
    pub fn check_and_record(&self, policy: RateLimitPolicy, key: &str) -> Result<()> {
        let config = self.policy_config(policy);
        if !config.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut windows = self.windows(policy).write();

        let window = windows
            .entry(key.to_string())
            .or_insert_with(|| Window::fresh(now));

        if window.is_expired(now, config.window) {
            *window = Window::fresh(now);
        }

        if window.count < config.max_requests {
            window.count += 1;
            debug!(policy = %policy, key, count = window.count, "rate limit check passed");
            Ok(())
        } else {
            Err(RateLimitError::LimitExceeded {
                policy,
                current: window.count + 1,
                max: config.max_requests,
                window: config.window,
            })
        }
    }

    /// Returns the current count for a key without recording an attempt.
    #[must_use]
    pub fn current_count(&self, policy: RateLimitPolicy, key: &str) -> u32 {
        let config = self.policy_config(policy);
        let now = Instant::now();
        let windows = self.windows(policy).read();

        windows.get(key).map_or(0, |w| {
            if w.is_expired(now, config.window) {
                0
            } else {
                w.count
            }
        })
    }

    /// Removes counters whose window has fully elapsed.
    ///
    /// Returns the number of evicted keys across all policies.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        for policy in [
            RateLimitPolicy::Login,
            RateLimitPolicy::RequestCreation,
            RateLimitPolicy::SecretView,
        ] {
            let window = self.policy_config(policy).window;
            let mut windows = self.windows(policy).write();
            let before = windows.len();
            windows.retain(|_, w| !w.is_expired(now, window));
            evicted += before - windows.len();
        }

        if evicted > 0 {
            debug!(evicted, "swept expired rate limit windows");
        }
        evicted
    }

    /// Returns the number of tracked keys for a policy.
    #[must_use]
    pub fn tracked_count(&self, policy: RateLimitPolicy) -> usize {
        self.windows(policy).read().len()
    }

    /// Returns the configured policies.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("login_keys", &self.tracked_count(RateLimitPolicy::Login))
            .field(
                "request_creation_keys",
                &self.tracked_count(RateLimitPolicy::RequestCreation),
            )
            .field(
                "secret_view_keys",
                &self.tracked_count(RateLimitPolicy::SecretView),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn limiter_with(policy_window: Duration, max: u32) -> RateLimiter {
        let policy = PolicyConfig::new(max, policy_window);
        RateLimiter::new(RateLimitConfig {
            login: policy.clone(),
            request_creation: policy.clone(),
            secret_view: policy,
        })
    }

    #[test_case(RateLimitPolicy::Login, "login")]
    #[test_case(RateLimitPolicy::RequestCreation, "request_creation")]
    #[test_case(RateLimitPolicy::SecretView, "secret_view")]
    fn policy_names(policy: RateLimitPolicy, expected: &str) {
        assert_eq!(policy.as_str(), expected);
    }

    #[test]
    fn allows_under_limit() {
        let limiter = limiter_with(Duration::from_secs(60), 3);

        for _ in 0..3 {
            assert!(limiter
                .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
                .is_ok());
        }
    }

    #[test]
    fn blocks_over_limit() {
        let limiter = limiter_with(Duration::from_secs(60), 3);

        for _ in 0..3 {
            limiter
                .check_and_record(RateLimitPolicy::SecretView, "alice")
                .expect("under limit");
        }

        let result = limiter.check_and_record(RateLimitPolicy::SecretView, "alice");
        assert!(matches!(
            result,
            Err(RateLimitError::LimitExceeded {
                policy: RateLimitPolicy::SecretView,
                max: 3,
                ..
            })
        ));
    }

    #[test]
    fn sixth_login_attempt_blocked_with_default_config() {
        let limiter = RateLimiter::new(RateLimitConfig::default());

        for _ in 0..5 {
            assert!(limiter
                .check_and_record(RateLimitPolicy::Login, "192.168.1.50")
                .is_ok());
        }
        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "192.168.1.50")
            .is_err());
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter_with(Duration::from_secs(60), 1);

        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
            .is_ok());
        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
            .is_err());
        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "10.0.0.2")
            .is_ok());
    }

    #[test]
    fn policies_are_independent() {
        let limiter = limiter_with(Duration::from_secs(60), 1);

        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "alice")
            .is_ok());
        // Same key, different policy: separate counter.
        assert!(limiter
            .check_and_record(RateLimitPolicy::SecretView, "alice")
            .is_ok());
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter_with(Duration::from_millis(40), 1);

        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
            .is_ok());
        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
            .is_err());

        std::thread::sleep(Duration::from_millis(50));

        assert!(limiter
            .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
            .is_ok());
    }

    #[test]
    fn current_count_reflects_attempts() {
        let limiter = limiter_with(Duration::from_secs(60), 5);

        assert_eq!(limiter.current_count(RateLimitPolicy::Login, "k"), 0);
        limiter
            .check_and_record(RateLimitPolicy::Login, "k")
            .expect("allowed");
        limiter
            .check_and_record(RateLimitPolicy::Login, "k")
            .expect("allowed");
        assert_eq!(limiter.current_count(RateLimitPolicy::Login, "k"), 2);
    }

    #[test]
    fn sweep_reclaims_expired_keys() {
        let limiter = limiter_with(Duration::from_millis(30), 5);

        limiter
            .check_and_record(RateLimitPolicy::Login, "a")
            .expect("allowed");
        limiter
            .check_and_record(RateLimitPolicy::SecretView, "b")
            .expect("allowed");
        assert_eq!(limiter.tracked_count(RateLimitPolicy::Login), 1);

        std::thread::sleep(Duration::from_millis(40));

        let evicted = limiter.sweep_expired();
        assert_eq!(evicted, 2);
        assert_eq!(limiter.tracked_count(RateLimitPolicy::Login), 0);
        assert_eq!(limiter.tracked_count(RateLimitPolicy::SecretView), 0);
    }

    #[test]
    fn disabled_policy_never_limits() {
        let mut config = RateLimitConfig::default();
        config.login.enabled = false;
        config.login.max_requests = 1;
        let limiter = RateLimiter::new(config);

        for _ in 0..50 {
            assert!(limiter
                .check_and_record(RateLimitPolicy::Login, "10.0.0.1")
                .is_ok());
        }
    }

    #[test]
    fn concurrent_bursts_never_undercount() {
        use std::sync::Arc;
        use std::thread;

        let limiter = Arc::new(limiter_with(Duration::from_secs(60), 100));
        let mut handles = vec![];

        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                let mut allowed = 0u32;
                for _ in 0..20 {
                    if limiter
                        .check_and_record(RateLimitPolicy::RequestCreation, "shared")
                        .is_ok()
                    {
                        allowed += 1;
                    }
                }
                allowed
            }));
        }

        let total: u32 = handles
            .into_iter()
            .map(|h| h.join().expect("thread should complete"))
            .sum();

        // 200 attempts against a limit of 100: exactly 100 admitted.
        assert_eq!(total, 100);
    }
}
