//! Error types for request storage.

use thiserror::Error;
use uuid::Uuid;

/// Errors from the request repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No request with the given id exists.
    #[error("request not found: {id}")]
    NotFound {
        /// The missing request id.
        id: Uuid,
    },

    /// A conditional status transition found the request in a different
    /// state than expected.
    ///
    /// This is how exactly one of two racing reviews wins.
    #[error("request {id} is not pending (status: {actual})")]
    NotPending {
        /// The request id.
        id: Uuid,
        /// The status actually observed.
        actual: crate::types::RequestStatus,
    },

    /// A request with the same id already exists.
    #[error("request already exists: {id}")]
    Duplicate {
        /// The conflicting request id.
        id: Uuid,
    },

    /// A hostname failed the normalization rule.
    #[error("invalid hostname: {reason}")]
    InvalidHostname {
        /// Why the hostname was rejected.
        reason: String,
    },
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
