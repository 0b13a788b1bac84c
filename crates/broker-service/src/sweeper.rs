//! Background expiry sweeping.
//!
//! Two periodic jobs: a frequent cache sweep that drops secrets whose
//! disclosure window closed, and an hourly pass that marks stale pending
//! requests expired and evicts dead rate-limiter windows. Every pass is a
//! sequence of independent per-record operations, so interruption at
//! shutdown leaves nothing half-written.

use std::sync::Arc;

use broker_audit::{AuditEventType, AuditRecord, AuditStore};
use broker_ratelimit::RateLimiter;
use broker_requests::{RequestRepository, SecretCache};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;

/// Periodic expiry sweeper for the cache, pending requests, and limiter.
pub struct ExpirySweeper {
    repository: Arc<dyn RequestRepository>,
    cache: Arc<SecretCache>,
    audit: Arc<AuditStore>,
    limiter: Arc<RateLimiter>,
    config: ServiceConfig,
    shutdown: watch::Receiver<bool>,
}

/// Handle used to stop a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop after its current pass.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl ExpirySweeper {
    /// Creates a sweeper and its shutdown handle.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RequestRepository>,
        cache: Arc<SecretCache>,
        audit: Arc<AuditStore>,
        limiter: Arc<RateLimiter>,
        config: ServiceConfig,
    ) -> (Self, SweeperHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                repository,
                cache,
                audit,
                limiter,
                config,
                shutdown: rx,
            },
            SweeperHandle { shutdown: tx },
        )
    }

    /// Runs both sweep loops until the handle signals shutdown.
    pub async fn run(self) {
        let mut shutdown = self.shutdown.clone();
        let mut cache_tick = tokio::time::interval(self.config.cache_sweep_interval);
        let mut pending_tick = tokio::time::interval(self.config.pending_sweep_interval);
        // The immediate first tick of each interval would sweep at startup.
        cache_tick.tick().await;
        pending_tick.tick().await;

        info!(
            cache_interval_secs = self.config.cache_sweep_interval.as_secs(),
            pending_interval_secs = self.config.pending_sweep_interval.as_secs(),
            "expiry sweeper started"
        );

        loop {
            tokio::select! {
                _ = cache_tick.tick() => {
                    self.sweep_cache();
                }
                _ = pending_tick.tick() => {
                    self.sweep_pending();
                    let evicted = self.limiter.sweep_expired();
                    if evicted > 0 {
                        debug!(evicted, "rate limiter windows evicted");
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("expiry sweeper stopped");
                        return;
                    }
                }
            }
        }
    }

    /// Drops expired cache entries, auditing one expiry per request.
    pub fn sweep_cache(&self) -> usize {
        let removed = self.cache.delete_expired_with(|entry| {
            self.append_audit(
                AuditRecord::builder(AuditEventType::PasswordDisplayExpired)
                    .actor("system", "Expiry Sweeper")
                    .request_id(entry.request_id)
                    .failure("display window elapsed"),
            );
        });
        if removed > 0 {
            info!(removed, "expired secrets purged from cache");
        }
        removed
    }

    /// Marks stale pending requests expired.
    pub fn sweep_pending(&self) -> usize {
        let now = Utc::now();
        let cutoff = now
            - chrono::Duration::from_std(self.config.pending_max_age)
                .unwrap_or_else(|_| chrono::Duration::days(7));
        let expired = self.repository.expire_stale_pending(now, cutoff);

        for request in &expired {
            self.append_audit(
                AuditRecord::builder(AuditEventType::RequestExpired)
                    .actor("system", "Expiry Sweeper")
                    .hostname(&request.hostname)
                    .request_id(request.id),
            );
            // A stale approval that somehow kept a cache entry goes with it.
            self.cache.delete(request.id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "stale pending requests expired");
        }
        expired.len()
    }

    fn append_audit(&self, builder: broker_audit::AuditRecordBuilder) {
        match builder.build() {
            Ok(record) => self.audit.append(record),
            Err(error) => warn!(%error, "audit record dropped"),
        }
    }
}

impl std::fmt::Debug for ExpirySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirySweeper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_crypto::{SecretKey, encrypt_secret};
    use broker_ratelimit::RateLimitConfig;
    use broker_requests::{InMemoryRequestRepository, PasswordRequest};
    use chrono::Duration;
    use uuid::Uuid;

    fn sweeper() -> (ExpirySweeper, SweeperHandle, Arc<SecretCache>, Arc<AuditStore>) {
        let repository: Arc<dyn RequestRepository> = Arc::new(InMemoryRequestRepository::new());
        let cache = Arc::new(SecretCache::new());
        let audit = Arc::new(AuditStore::new());
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
        let (sweeper, handle) = ExpirySweeper::new(
            Arc::clone(&repository),
            Arc::clone(&cache),
            Arc::clone(&audit),
            limiter,
            ServiceConfig::default(),
        );
        (sweeper, handle, cache, audit)
    }

    fn cached_payload() -> broker_crypto::EncryptedPayload {
        let key = SecretKey::generate();
        encrypt_secret(&key, "Str0ng!Pass").expect("encrypt")
    }

    #[tokio::test]
    async fn cache_sweep_purges_and_audits() {
        let (sweeper, _handle, cache, audit) = sweeper();
        let dead = Uuid::new_v4();
        cache.store(dead, cached_payload(), Utc::now() - Duration::seconds(1));
        cache.store(
            Uuid::new_v4(),
            cached_payload(),
            Utc::now() + Duration::minutes(10),
        );

        assert_eq!(sweeper.sweep_cache(), 1);
        assert_eq!(cache.len(), 1);

        let page = audit.query(
            &broker_audit::AuditFilter::new()
                .with_event_type(AuditEventType::PasswordDisplayExpired),
        );
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].request_id, Some(dead));
    }

    #[tokio::test]
    async fn pending_sweep_expires_and_audits() {
        let (sweeper, _handle, _cache, audit) = sweeper();
        let mut stale = PasswordRequest::new(
            Uuid::new_v4(),
            "jdoe",
            "Jane Doe",
            "PC-OFFICE1",
            "reinstalling network drivers today",
            "deadbeefdeadbeef",
            Some(Utc::now() - Duration::minutes(1)),
        );
        stale.created_at = Utc::now() - Duration::hours(2);
        sweeper.repository.create(stale).expect("create");

        assert_eq!(sweeper.sweep_pending(), 1);
        let page = audit.query(
            &broker_audit::AuditFilter::new().with_event_type(AuditEventType::RequestExpired),
        );
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (sweeper, handle, _cache, _audit) = sweeper();
        let task = tokio::spawn(sweeper.run());
        handle.shutdown();
        task.await.expect("sweeper task joins");
    }
}
