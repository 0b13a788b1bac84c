//! The password request entity and its lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a disclosure request.
///
/// `Pending` is the only non-terminal state; no transition leaves a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting human review.
    Pending,
    /// Approved; the secret is (or was) cached for disclosure.
    Approved,
    /// Denied by a reviewer.
    Denied,
    /// Expired before review.
    Expired,
}

impl RequestStatus {
    /// Returns true when no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns the lowercase string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reviewer's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    /// Grant disclosure.
    Approve,
    /// Refuse disclosure.
    Deny,
}

/// One disclosure workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordRequest {
    /// Opaque unique identifier.
    pub id: Uuid,
    /// Account id of the requester; anonymous submitters carry a synthetic id.
    pub requester_id: String,
    /// Display name of the requester.
    pub requester_name: String,
    /// Normalized target machine name.
    pub hostname: String,
    /// Free-text justification supplied by the requester.
    pub justification: String,
    /// One-way digest of the justification, for audit correlation.
    pub justification_hash: String,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last modified.
    pub updated_at: DateTime<Utc>,
    /// Optional submission deadline after which a pending request expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Reviewer account id, set on review.
    pub reviewed_by: Option<String>,
    /// When the review happened.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Free-text reviewer comment.
    pub reviewer_comment: Option<String>,
    /// When the secret was retrieved from the directory.
    pub password_retrieved_at: Option<DateTime<Utc>>,
    /// When the secret was last shown to the requester.
    pub password_displayed_at: Option<DateTime<Utc>>,
    /// End of the disclosure window; set if and only if the request was
    /// approved.
    pub password_display_expires_at: Option<DateTime<Utc>>,
    /// Client IP captured at creation, for forensics.
    pub client_ip: Option<String>,
    /// User agent captured at creation.
    pub user_agent: Option<String>,
    /// Whether the machine object was found at creation time.
    pub computer_found: bool,
    /// Whether a managed secret was available at creation time.
    pub laps_available: bool,
}

impl PasswordRequest {
    /// Creates a new pending request.
    ///
    /// `hostname` must already be normalized and `justification_hash` already
    /// computed; the service layer owns both steps.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        requester_id: impl Into<String>,
        requester_name: impl Into<String>,
        hostname: impl Into<String>,
        justification: impl Into<String>,
        justification_hash: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            requester_id: requester_id.into(),
            requester_name: requester_name.into(),
            hostname: hostname.into(),
            justification: justification.into(),
            justification_hash: justification_hash.into(),
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            expires_at,
            reviewed_by: None,
            reviewed_at: None,
            reviewer_comment: None,
            password_retrieved_at: None,
            password_displayed_at: None,
            password_display_expires_at: None,
            client_ip: None,
            user_agent: None,
            computer_found: false,
            laps_available: false,
        }
    }

    /// Attaches forensic context captured at the edge.
    #[must_use]
    pub fn with_client_context(
        mut self,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.client_ip = client_ip;
        self.user_agent = user_agent;
        self
    }

    /// Records what the directory reported at creation time.
    #[must_use]
    pub const fn with_directory_annotation(
        mut self,
        computer_found: bool,
        laps_available: bool,
    ) -> Self {
        self.computer_found = computer_found;
        self.laps_available = laps_available;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RequestStatus::Pending, false)]
    #[test_case(RequestStatus::Approved, true)]
    #[test_case(RequestStatus::Denied, true)]
    #[test_case(RequestStatus::Expired, true)]
    fn terminal_states(status: RequestStatus, terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[test]
    fn status_serde_is_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Approved).expect("serialize");
        assert_eq!(json, "\"approved\"");
    }

    #[test]
    fn new_request_starts_pending() {
        let request = PasswordRequest::new(
            Uuid::new_v4(),
            "jdoe",
            "Jane Doe",
            "PC-OFFICE1",
            "need to reinstall network drivers",
            "abc123",
            None,
        );

        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.reviewed_by.is_none());
        assert!(request.password_display_expires_at.is_none());
        assert!(!request.computer_found);
        assert_eq!(request.created_at, request.updated_at);
    }

    #[test]
    fn builder_style_context() {
        let request = PasswordRequest::new(
            Uuid::new_v4(),
            "jdoe",
            "Jane Doe",
            "PC-OFFICE1",
            "justification text goes here",
            "abc123",
            None,
        )
        .with_client_context(Some("10.0.0.9".to_string()), Some("curl/8".to_string()))
        .with_directory_annotation(true, true);

        assert_eq!(request.client_ip.as_deref(), Some("10.0.0.9"));
        assert!(request.computer_found);
        assert!(request.laps_available);
    }
}
