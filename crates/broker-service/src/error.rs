//! The service-level error taxonomy.

use broker_ratelimit::RateLimitPolicy;
use broker_requests::RequestStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the lifecycle service.
///
/// Messages never carry secret material; the worst they reveal is a
/// request id or a hostname the caller already supplied.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller-correctable input problem.
    #[error("validation failed: {reason}")]
    Validation {
        /// What was wrong with the input.
        reason: String,
    },

    /// Unknown request id.
    #[error("request not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: Uuid,
    },

    /// Credentials did not check out.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authenticated but not entitled.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Why access was denied.
        reason: String,
    },

    /// The request already left the pending state.
    #[error("request {id} already reviewed: status is {status}")]
    AlreadyReviewed {
        /// The request.
        id: Uuid,
        /// Its current status.
        status: RequestStatus,
    },

    /// The request is not in the approved state.
    #[error("request {id} is not approved: status is {status}")]
    NotApproved {
        /// The request.
        id: Uuid,
        /// Its current status.
        status: RequestStatus,
    },

    /// The disclosure window has closed.
    #[error("display window expired for request {id}")]
    WindowExpired {
        /// The request.
        id: Uuid,
    },

    /// The cached secret is no longer held.
    #[error("secret no longer available for request {id}")]
    SecretGone {
        /// The request.
        id: Uuid,
    },

    /// The directory could not supply a secret for the target machine.
    #[error("no managed secret available for {hostname}")]
    SecretUnavailable {
        /// The normalized target hostname.
        hostname: String,
    },

    /// A rate limit policy was breached.
    #[error("rate limit exceeded for {policy}")]
    RateLimited {
        /// The breached policy.
        policy: RateLimitPolicy,
    },

    /// Decryption authentication failed. Indicates tampering or a key
    /// mismatch and is never silently ignored.
    #[error("secret integrity check failed for request {id}")]
    Integrity {
        /// The request.
        id: Uuid,
    },

    /// The directory failed at the transport level. Never retried inside
    /// the core; retrieval side effects must not be duplicated.
    #[error("directory unavailable: {reason}")]
    Directory {
        /// Transport-level failure description.
        reason: String,
    },
}

impl ServiceError {
    /// HTTP status class for a transport layer to map onto.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::AlreadyReviewed { .. }
            | Self::NotApproved { .. }
            | Self::WindowExpired { .. }
            | Self::SecretGone { .. }
            | Self::SecretUnavailable { .. } => 400,
            Self::InvalidCredentials => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::RateLimited { .. } => 429,
            Self::Integrity { .. } | Self::Directory { .. } => 500,
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
