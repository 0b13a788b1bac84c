//! Audit event types and records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuditError;
use crate::redact::redact_details;

/// The closed set of auditable event types.
///
/// Exposed for filtering UIs; the serialized form is the SCREAMING_SNAKE
/// name used in exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// A disclosure request was created.
    RequestCreated,
    /// A pending request was approved by a reviewer.
    RequestApproved,
    /// A pending request was denied by a reviewer.
    RequestDenied,
    /// A stale pending request was marked expired.
    RequestExpired,
    /// The managed secret was retrieved from the directory.
    PasswordRetrieved,
    /// The decrypted secret was shown to the requester.
    PasswordDisplayed,
    /// The disclosure window elapsed before or during viewing.
    PasswordDisplayExpired,
    /// A login attempt succeeded.
    LoginSuccess,
    /// A login attempt failed.
    LoginFailed,
    /// The directory service failed at the transport level.
    AdError,
    /// The directory had no managed secret for the target machine.
    LapsNotFound,
    /// An actor was denied access to a resource.
    PermissionDenied,
    /// A rate limit policy was breached.
    RateLimitExceeded,
    /// A hostname failed the normalization rule.
    HostnameValidationFailed,
}

impl AuditEventType {
    /// All event types, in a stable order.
    pub const ALL: [Self; 14] = [
        Self::RequestCreated,
        Self::RequestApproved,
        Self::RequestDenied,
        Self::RequestExpired,
        Self::PasswordRetrieved,
        Self::PasswordDisplayed,
        Self::PasswordDisplayExpired,
        Self::LoginSuccess,
        Self::LoginFailed,
        Self::AdError,
        Self::LapsNotFound,
        Self::PermissionDenied,
        Self::RateLimitExceeded,
        Self::HostnameValidationFailed,
    ];

    /// Returns the canonical string form of this event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCreated => "REQUEST_CREATED",
            Self::RequestApproved => "REQUEST_APPROVED",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::RequestExpired => "REQUEST_EXPIRED",
            Self::PasswordRetrieved => "PASSWORD_RETRIEVED",
            Self::PasswordDisplayed => "PASSWORD_DISPLAYED",
            Self::PasswordDisplayExpired => "PASSWORD_DISPLAY_EXPIRED",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::AdError => "AD_ERROR",
            Self::LapsNotFound => "LAPS_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::HostnameValidationFailed => "HOSTNAME_VALIDATION_FAILED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| AuditError::UnknownEventType(s.to_string()))
    }
}

/// One immutable record of a sensitive action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// When the action occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub event_type: AuditEventType,
    /// Who did it.
    pub user_id: String,
    /// Display name of the actor.
    pub user_name: String,
    /// Target machine, if the action concerned one.
    pub hostname: Option<String>,
    /// The disclosure request involved, if any.
    pub request_id: Option<Uuid>,
    /// Structured context; sensitive keys are redacted before persistence.
    pub details: serde_json::Value,
    /// Client IP captured at the edge.
    pub client_ip: Option<String>,
    /// User agent captured at the edge.
    pub user_agent: Option<String>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Error message for failed actions.
    pub error_message: Option<String>,
}

impl AuditRecord {
    /// Creates a builder for a record of the given event type.
    #[must_use]
    pub fn builder(event_type: AuditEventType) -> AuditRecordBuilder {
        AuditRecordBuilder::new(event_type)
    }
}

/// Fluent builder for [`AuditRecord`].
#[derive(Debug, Clone)]
pub struct AuditRecordBuilder {
    event_type: AuditEventType,
    user_id: Option<String>,
    user_name: Option<String>,
    hostname: Option<String>,
    request_id: Option<Uuid>,
    details: serde_json::Value,
    client_ip: Option<String>,
    user_agent: Option<String>,
    success: bool,
    error_message: Option<String>,
}

impl AuditRecordBuilder {
    fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            user_id: None,
            user_name: None,
            hostname: None,
            request_id: None,
            details: serde_json::Value::Null,
            client_ip: None,
            user_agent: None,
            success: true,
            error_message: None,
        }
    }

    /// Sets the acting user id and display name.
    #[must_use]
    pub fn actor(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.user_name = Some(user_name.into());
        self
    }

    /// Sets the target hostname.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Sets the related request id.
    #[must_use]
    pub const fn request_id(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Sets the structured details.
    #[must_use]
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Sets the client IP.
    #[must_use]
    pub fn client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Marks the action as failed with the given message.
    #[must_use]
    pub fn failure(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }

    /// Builds the record, assigning id and timestamp and redacting details.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor was not set.
    pub fn build(self) -> crate::Result<AuditRecord> {
        let user_id = self.user_id.ok_or(AuditError::MissingField("user_id"))?;
        let user_name = self.user_name.ok_or(AuditError::MissingField("user_name"))?;

        Ok(AuditRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            user_id,
            user_name,
            hostname: self.hostname,
            request_id: self.request_id,
            details: redact_details(self.details),
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            success: self.success,
            error_message: self.error_message,
        })
    }
}
