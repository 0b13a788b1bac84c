//! Service configuration surface.
//!
//! Loading from the environment is a deployment concern; the core consumes
//! a plain struct with sensible defaults.

use std::time::Duration;

use broker_ratelimit::RateLimitConfig;

/// Tunable knobs for the lifecycle service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// How long an approved secret stays viewable, in minutes.
    pub display_window_minutes: i64,
    /// Minimum length of a request justification.
    pub min_justification_len: usize,
    /// Whether to annotate new requests with a directory lookup.
    ///
    /// When set, creation records whether the machine object exists and
    /// whether a managed secret is published. Lookup failure degrades the
    /// annotation; it never blocks creation.
    pub annotate_on_create: bool,
    /// Require creation-time authorization for the target machine.
    ///
    /// Off by default: anyone may file a request and a human reviewer
    /// gates disclosure. When on, [`crate::LifecycleService::authorize`]
    /// must pass before a request is accepted. The administrative group
    /// consulted by that check is configured on the directory gateway.
    pub strict_create_authorization: bool,
    /// Deadline for each directory call.
    pub directory_timeout: Duration,
    /// Per-policy rate limits.
    pub rate_limits: RateLimitConfig,
    /// Maximum age of a pending request that carries no explicit deadline.
    pub pending_max_age: Duration,
    /// Cadence of the cache sweep.
    pub cache_sweep_interval: Duration,
    /// Cadence of the stale-pending-request sweep.
    pub pending_sweep_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            display_window_minutes: 10,
            min_justification_len: 20,
            annotate_on_create: true,
            strict_create_authorization: false,
            directory_timeout: Duration::from_secs(5),
            rate_limits: RateLimitConfig::default(),
            pending_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            cache_sweep_interval: Duration::from_secs(30),
            pending_sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl ServiceConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the disclosure window length.
    #[must_use]
    pub const fn with_display_window_minutes(mut self, minutes: i64) -> Self {
        self.display_window_minutes = minutes;
        self
    }

    /// Sets the minimum justification length.
    #[must_use]
    pub const fn with_min_justification_len(mut self, len: usize) -> Self {
        self.min_justification_len = len;
        self
    }

    /// Toggles directory annotation at creation.
    #[must_use]
    pub const fn with_annotate_on_create(mut self, annotate: bool) -> Self {
        self.annotate_on_create = annotate;
        self
    }

    /// Toggles strict creation-time authorization.
    #[must_use]
    pub const fn with_strict_create_authorization(mut self, strict: bool) -> Self {
        self.strict_create_authorization = strict;
        self
    }

    /// Sets the directory call deadline.
    #[must_use]
    pub const fn with_directory_timeout(mut self, timeout: Duration) -> Self {
        self.directory_timeout = timeout;
        self
    }

    /// Sets the rate limit configuration.
    #[must_use]
    pub fn with_rate_limits(mut self, limits: RateLimitConfig) -> Self {
        self.rate_limits = limits;
        self
    }

    /// Sets the maximum age for deadline-less pending requests.
    #[must_use]
    pub const fn with_pending_max_age(mut self, age: Duration) -> Self {
        self.pending_max_age = age;
        self
    }
}
