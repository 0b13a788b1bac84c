//! Error types for the audit ledger.

use thiserror::Error;

/// Errors that can occur in the audit ledger.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A required field was missing when building a record.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// An event type string did not match the closed set.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
