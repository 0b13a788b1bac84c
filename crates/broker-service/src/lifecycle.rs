//! The request lifecycle orchestrator.
//!
//! Ties the repository, secret cache, audit ledger, rate limiter, and
//! directory gateway together behind the five service operations: login,
//! create, review, view, authorize.

use std::sync::Arc;

use broker_audit::{AuditEventType, AuditRecord, AuditRecordBuilder, AuditStore};
use broker_crypto::{
    SecretKey, decrypt_secret, encrypt_secret, generate_request_id, hash_justification,
};
use broker_directory::{DirectoryError, DirectoryGateway, UserProfile, with_timeout};
use broker_ratelimit::{RateLimitPolicy, RateLimiter};
use broker_requests::{
    InMemoryRequestRepository, PasswordRequest, RepositoryError, RequestRepository, RequestStatus,
    ReviewOutcome, SecretCache, normalize_hostname,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};

/// Identity and forensic context of the caller.
#[derive(Debug, Clone)]
pub struct RequesterContext {
    /// Account identifier.
    pub user_id: String,
    /// Display name.
    pub user_name: String,
    /// Client IP observed at the edge.
    pub client_ip: Option<String>,
    /// User agent observed at the edge.
    pub user_agent: Option<String>,
}

impl RequesterContext {
    /// Creates a context without edge forensics.
    #[must_use]
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            client_ip: None,
            user_agent: None,
        }
    }

    /// Attaches the client IP.
    #[must_use]
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Attaches the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }
}

/// A decrypted secret handed to the original requester.
#[derive(Clone)]
pub struct DisclosedSecret {
    /// The plaintext secret.
    pub secret: String,
    /// The target machine.
    pub hostname: String,
    /// End of the disclosure window.
    pub expires_at: DateTime<Utc>,
    /// Whole minutes left in the window, rounded up.
    pub remaining_minutes: i64,
}

impl std::fmt::Debug for DisclosedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisclosedSecret")
            .field("secret", &"[REDACTED]")
            .field("hostname", &self.hostname)
            .field("expires_at", &self.expires_at)
            .field("remaining_minutes", &self.remaining_minutes)
            .finish()
    }
}

/// Orchestrates the disclosure request lifecycle.
pub struct LifecycleService<D: DirectoryGateway> {
    repository: Arc<dyn RequestRepository>,
    cache: Arc<SecretCache>,
    audit: Arc<AuditStore>,
    limiter: Arc<RateLimiter>,
    gateway: Arc<D>,
    key: SecretKey,
    config: ServiceConfig,
}

impl<D: DirectoryGateway> LifecycleService<D> {
    /// Creates a service over an in-memory repository and a fresh key.
    #[must_use]
    pub fn new(gateway: D, config: ServiceConfig) -> Self {
        Self::with_parts(
            Arc::new(InMemoryRequestRepository::new()),
            gateway,
            SecretKey::generate(),
            config,
        )
    }

    /// Creates a service from explicit parts.
    #[must_use]
    pub fn with_parts(
        repository: Arc<dyn RequestRepository>,
        gateway: D,
        key: SecretKey,
        config: ServiceConfig,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));
        Self {
            repository,
            cache: Arc::new(SecretCache::new()),
            audit: Arc::new(AuditStore::new()),
            limiter,
            gateway: Arc::new(gateway),
            key,
            config,
        }
    }

    /// Handle to the request repository.
    #[must_use]
    pub fn repository(&self) -> Arc<dyn RequestRepository> {
        Arc::clone(&self.repository)
    }

    /// Handle to the secret cache.
    #[must_use]
    pub fn secret_cache(&self) -> Arc<SecretCache> {
        Arc::clone(&self.cache)
    }

    /// Handle to the audit ledger.
    #[must_use]
    pub fn audit_store(&self) -> Arc<AuditStore> {
        Arc::clone(&self.audit)
    }

    /// Handle to the rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn append_audit(&self, builder: AuditRecordBuilder) {
        match builder.build() {
            Ok(record) => self.audit.append(record),
            Err(error) => warn!(%error, "audit record dropped"),
        }
    }

    fn audit_rate_limited(&self, policy: RateLimitPolicy, ctx: &RequesterContext) {
        let mut builder = AuditRecord::builder(AuditEventType::RateLimitExceeded)
            .actor(&ctx.user_id, &ctx.user_name)
            .details(json!({ "policy": policy.as_str() }))
            .failure("rate limit exceeded");
        if let Some(ip) = &ctx.client_ip {
            builder = builder.client_ip(ip);
        }
        self.append_audit(builder);
    }

    /// Authenticates a user, rate limited by client IP.
    ///
    /// # Errors
    ///
    /// `RateLimited` when the IP exhausted its attempts, `InvalidCredentials`
    /// when the directory rejects the credentials, `Directory` on transport
    /// failure.
    pub async fn login(
        &self,
        user_id: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<UserProfile> {
        if self
            .limiter
            .check_and_record(RateLimitPolicy::Login, client_ip)
            .is_err()
        {
            let ctx = RequesterContext::new(user_id, user_id).with_client_ip(client_ip);
            self.audit_rate_limited(RateLimitPolicy::Login, &ctx);
            return Err(ServiceError::RateLimited {
                policy: RateLimitPolicy::Login,
            });
        }

        let outcome = with_timeout(
            self.config.directory_timeout,
            self.gateway.authenticate(user_id, password),
        )
        .await;

        match outcome {
            Ok(Some(profile)) => {
                info!(user_id, "login succeeded");
                self.append_audit(
                    AuditRecord::builder(AuditEventType::LoginSuccess)
                        .actor(&profile.user_id, &profile.display_name)
                        .client_ip(client_ip),
                );
                Ok(profile)
            }
            Ok(None) => {
                self.append_audit(
                    AuditRecord::builder(AuditEventType::LoginFailed)
                        .actor(user_id, user_id)
                        .client_ip(client_ip)
                        .failure("invalid credentials"),
                );
                Err(ServiceError::InvalidCredentials)
            }
            Err(error) => {
                self.append_audit(
                    AuditRecord::builder(AuditEventType::AdError)
                        .actor(user_id, user_id)
                        .client_ip(client_ip)
                        .failure(error.to_string()),
                );
                Err(ServiceError::Directory {
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Files a new disclosure request.
    ///
    /// Hostname normalization and a minimum justification length are
    /// enforced up front. Directory annotation is best-effort: a failed
    /// lookup never blocks creation.
    ///
    /// # Errors
    ///
    /// `RateLimited`, `Validation`, or `Forbidden` under strict
    /// creation-time authorization.
    pub async fn create_request(
        &self,
        ctx: &RequesterContext,
        hostname: &str,
        justification: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PasswordRequest> {
        let limit_key = if ctx.user_id.is_empty() {
            ctx.client_ip.clone().unwrap_or_else(|| "unknown".to_string())
        } else {
            ctx.user_id.clone()
        };
        if self
            .limiter
            .check_and_record(RateLimitPolicy::RequestCreation, &limit_key)
            .is_err()
        {
            self.audit_rate_limited(RateLimitPolicy::RequestCreation, ctx);
            return Err(ServiceError::RateLimited {
                policy: RateLimitPolicy::RequestCreation,
            });
        }

        let normalized = match normalize_hostname(hostname) {
            Ok(name) => name,
            Err(error) => {
                self.append_audit(
                    AuditRecord::builder(AuditEventType::HostnameValidationFailed)
                        .actor(&ctx.user_id, &ctx.user_name)
                        .details(json!({ "submitted": hostname }))
                        .failure(error.to_string()),
                );
                return Err(ServiceError::Validation {
                    reason: error.to_string(),
                });
            }
        };

        if justification.trim().len() < self.config.min_justification_len {
            return Err(ServiceError::Validation {
                reason: format!(
                    "justification must be at least {} characters",
                    self.config.min_justification_len
                ),
            });
        }

        if self.config.strict_create_authorization && !self.authorize(&ctx.user_id, &normalized).await
        {
            self.append_audit(
                AuditRecord::builder(AuditEventType::PermissionDenied)
                    .actor(&ctx.user_id, &ctx.user_name)
                    .hostname(&normalized)
                    .failure("not authorized for this machine"),
            );
            return Err(ServiceError::Forbidden {
                reason: "not authorized for this machine".to_string(),
            });
        }

        let (computer_found, laps_available) = if self.config.annotate_on_create {
            self.annotate(&normalized).await
        } else {
            (false, false)
        };

        let request = PasswordRequest::new(
            generate_request_id(),
            &ctx.user_id,
            &ctx.user_name,
            &normalized,
            justification,
            hash_justification(justification),
            expires_at,
        )
        .with_client_context(ctx.client_ip.clone(), ctx.user_agent.clone())
        .with_directory_annotation(computer_found, laps_available);

        let id = request.id;
        self.repository
            .create(request.clone())
            .map_err(|error| ServiceError::Validation {
                reason: error.to_string(),
            })?;

        info!(request_id = %id, hostname = %normalized, "disclosure request created");
        let mut builder = AuditRecord::builder(AuditEventType::RequestCreated)
            .actor(&ctx.user_id, &ctx.user_name)
            .hostname(&normalized)
            .request_id(id)
            .details(json!({
                "justificationHash": request.justification_hash,
                "computerFound": computer_found,
                "lapsAvailable": laps_available,
            }));
        if let Some(ip) = &ctx.client_ip {
            builder = builder.client_ip(ip);
        }
        if let Some(ua) = &ctx.user_agent {
            builder = builder.user_agent(ua);
        }
        self.append_audit(builder);
        Ok(request)
    }

    /// Best-effort directory lookup for creation-time annotation.
    async fn annotate(&self, hostname: &str) -> (bool, bool) {
        let found = with_timeout(
            self.config.directory_timeout,
            self.gateway.find_computer(hostname),
        )
        .await;
        match found {
            Ok(Some(_)) => {
                let secret = with_timeout(
                    self.config.directory_timeout,
                    self.gateway.get_managed_secret(hostname),
                )
                .await;
                (true, matches!(secret, Ok(Some(_))))
            }
            Ok(None) => (false, false),
            Err(error) => {
                debug!(hostname, %error, "annotation lookup failed");
                (false, false)
            }
        }
    }

    /// Reviews a pending request.
    ///
    /// Denial is a pure status transition. Approval fetches the managed
    /// secret, encrypts and caches it, then transitions the request; the
    /// transition happens only after the secret is cached, and the cache
    /// entry is rolled back if a concurrent review wins the race.
    ///
    /// # Errors
    ///
    /// `NotFound`, `AlreadyReviewed`, `SecretUnavailable` when the
    /// directory has no secret for the machine, `Directory` on transport
    /// failure.
    pub async fn review(
        &self,
        id: Uuid,
        reviewer: &RequesterContext,
        decision: ReviewOutcome,
        comment: Option<String>,
    ) -> Result<PasswordRequest> {
        let request = self
            .repository
            .get(id)
            .ok_or(ServiceError::NotFound { id })?;
        if request.status != RequestStatus::Pending {
            return Err(ServiceError::AlreadyReviewed {
                id,
                status: request.status,
            });
        }

        match decision {
            ReviewOutcome::Deny => self.deny(id, reviewer, comment),
            ReviewOutcome::Approve => self.approve(request, reviewer, comment).await,
        }
    }

    fn deny(
        &self,
        id: Uuid,
        reviewer: &RequesterContext,
        comment: Option<String>,
    ) -> Result<PasswordRequest> {
        let now = Utc::now();
        let reviewer_id = reviewer.user_id.clone();
        let updated = self
            .repository
            .transition_from_pending(id, &mut |r| {
                r.status = RequestStatus::Denied;
                r.reviewed_by = Some(reviewer_id.clone());
                r.reviewed_at = Some(now);
                r.reviewer_comment = comment.clone();
            })
            .map_err(|error| Self::map_transition_error(id, error))?;

        info!(request_id = %id, reviewer = %reviewer.user_id, "request denied");
        self.append_audit(
            AuditRecord::builder(AuditEventType::RequestDenied)
                .actor(&reviewer.user_id, &reviewer.user_name)
                .hostname(&updated.hostname)
                .request_id(id),
        );
        Ok(updated)
    }

    async fn approve(
        &self,
        request: PasswordRequest,
        reviewer: &RequesterContext,
        comment: Option<String>,
    ) -> Result<PasswordRequest> {
        let id = request.id;
        let hostname = request.hostname.clone();

        let managed = with_timeout(
            self.config.directory_timeout,
            self.gateway.get_managed_secret(&hostname),
        )
        .await;

        let managed = match managed {
            Ok(Some(managed)) => managed,
            Ok(None) => {
                self.append_audit(
                    AuditRecord::builder(AuditEventType::LapsNotFound)
                        .actor(&reviewer.user_id, &reviewer.user_name)
                        .hostname(&hostname)
                        .request_id(id)
                        .failure("directory holds no managed secret"),
                );
                return Err(ServiceError::SecretUnavailable { hostname });
            }
            Err(error) => {
                self.append_audit(
                    AuditRecord::builder(AuditEventType::AdError)
                        .actor(&reviewer.user_id, &reviewer.user_name)
                        .hostname(&hostname)
                        .request_id(id)
                        .failure(error.to_string()),
                );
                return match error {
                    DirectoryError::Timeout { .. } => {
                        Err(ServiceError::SecretUnavailable { hostname })
                    }
                    DirectoryError::Transport { reason } => {
                        Err(ServiceError::Directory { reason })
                    }
                };
            }
        };

        let payload =
            encrypt_secret(&self.key, &managed.secret).map_err(|_| ServiceError::Integrity { id })?;

        let now = Utc::now();
        let window_end = now + Duration::minutes(self.config.display_window_minutes);
        self.cache.store(id, payload, window_end);

        let reviewer_id = reviewer.user_id.clone();
        let transition = self.repository.transition_from_pending(id, &mut |r| {
            r.status = RequestStatus::Approved;
            r.reviewed_by = Some(reviewer_id.clone());
            r.reviewed_at = Some(now);
            r.reviewer_comment = comment.clone();
            r.password_retrieved_at = Some(now);
            r.password_display_expires_at = Some(window_end);
        });

        let updated = match transition {
            Ok(updated) => updated,
            Err(error) => {
                // Lost the race; the winner owns the outcome.
                self.cache.delete(id);
                return Err(Self::map_transition_error(id, error));
            }
        };

        info!(request_id = %id, reviewer = %reviewer.user_id, "request approved");
        self.append_audit(
            AuditRecord::builder(AuditEventType::PasswordRetrieved)
                .actor(&reviewer.user_id, &reviewer.user_name)
                .hostname(&hostname)
                .request_id(id),
        );
        self.append_audit(
            AuditRecord::builder(AuditEventType::RequestApproved)
                .actor(&reviewer.user_id, &reviewer.user_name)
                .hostname(&hostname)
                .request_id(id)
                .details(json!({ "displayExpiresAt": window_end.to_rfc3339() })),
        );
        Ok(updated)
    }

    fn map_transition_error(id: Uuid, error: RepositoryError) -> ServiceError {
        match error {
            RepositoryError::NotPending { actual, .. } => ServiceError::AlreadyReviewed {
                id,
                status: actual,
            },
            RepositoryError::NotFound { .. } => ServiceError::NotFound { id },
            other => ServiceError::Validation {
                reason: other.to_string(),
            },
        }
    }

    /// Discloses an approved secret to its original requester.
    ///
    /// The window deadline is checked here regardless of sweeper timing;
    /// an entry past its deadline is functionally expired even if still
    /// resident.
    ///
    /// # Errors
    ///
    /// `RateLimited`, `NotFound`, `Forbidden` for any viewer other than
    /// the requester, `NotApproved`, `WindowExpired`, `SecretGone`, or
    /// `Integrity` when decryption authentication fails.
    pub fn view_secret(&self, id: Uuid, viewer: &RequesterContext) -> Result<DisclosedSecret> {
        if self
            .limiter
            .check_and_record(RateLimitPolicy::SecretView, &viewer.user_id)
            .is_err()
        {
            self.audit_rate_limited(RateLimitPolicy::SecretView, viewer);
            return Err(ServiceError::RateLimited {
                policy: RateLimitPolicy::SecretView,
            });
        }

        let mut request = self
            .repository
            .get(id)
            .ok_or(ServiceError::NotFound { id })?;

        if request.requester_id != viewer.user_id {
            self.append_audit(
                AuditRecord::builder(AuditEventType::PermissionDenied)
                    .actor(&viewer.user_id, &viewer.user_name)
                    .hostname(&request.hostname)
                    .request_id(id)
                    .failure("viewer is not the requester"),
            );
            return Err(ServiceError::Forbidden {
                reason: "only the requester may view this secret".to_string(),
            });
        }

        if request.status != RequestStatus::Approved {
            return Err(ServiceError::NotApproved {
                id,
                status: request.status,
            });
        }

        let deadline = request
            .password_display_expires_at
            .ok_or(ServiceError::SecretGone { id })?;
        let now = Utc::now();
        if now >= deadline {
            self.cache.delete(id);
            self.append_audit(
                AuditRecord::builder(AuditEventType::PasswordDisplayExpired)
                    .actor(&viewer.user_id, &viewer.user_name)
                    .hostname(&request.hostname)
                    .request_id(id)
                    .failure("display window elapsed"),
            );
            return Err(ServiceError::WindowExpired { id });
        }

        let entry = self.cache.get(id).ok_or(ServiceError::SecretGone { id })?;

        let secret = match decrypt_secret(&self.key, &entry.payload) {
            Ok(secret) => secret,
            Err(error) => {
                self.append_audit(
                    AuditRecord::builder(AuditEventType::PasswordDisplayed)
                        .actor(&viewer.user_id, &viewer.user_name)
                        .hostname(&request.hostname)
                        .request_id(id)
                        .failure(error.to_string()),
                );
                return Err(ServiceError::Integrity { id });
            }
        };

        // Round up so one remaining second still reads as one minute.
        let seconds_left = (deadline - now).num_seconds().max(0) as u64;
        let remaining_minutes = seconds_left.div_ceil(60) as i64;

        request.password_displayed_at = Some(now);
        request.updated_at = now;
        if let Err(error) = self.repository.update(request.clone()) {
            warn!(request_id = %id, %error, "display timestamp not recorded");
        }

        self.append_audit(
            AuditRecord::builder(AuditEventType::PasswordDisplayed)
                .actor(&viewer.user_id, &viewer.user_name)
                .hostname(&request.hostname)
                .request_id(id)
                .details(json!({ "remainingMinutes": remaining_minutes })),
        );

        Ok(DisclosedSecret {
            secret,
            hostname: request.hostname,
            expires_at: deadline,
            remaining_minutes,
        })
    }

    /// Decides whether a user may target a machine at creation time.
    ///
    /// Total by design: directory failures fall through to the configured
    /// default rather than erroring. Admin-group members and the machine's
    /// recorded manager always pass; everyone else passes unless strict
    /// creation-time authorization is on.
    pub async fn authorize(&self, user_id: &str, hostname: &str) -> bool {
        let is_admin = with_timeout(
            self.config.directory_timeout,
            self.gateway.is_member_of_admin_group(user_id),
        )
        .await;
        if matches!(is_admin, Ok(true)) {
            return true;
        }

        let computer = with_timeout(
            self.config.directory_timeout,
            self.gateway.find_computer(hostname),
        )
        .await;
        if let Ok(Some(record)) = computer {
            if let Some(manager) = record.managed_by {
                let manager = manager.to_lowercase();
                let user = user_id.to_lowercase();
                if manager == user || manager.contains(&user) {
                    return true;
                }
            }
        }

        !self.config.strict_create_authorization
    }
}

impl<D: DirectoryGateway> std::fmt::Debug for LifecycleService<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
