//! Error types for directory gateway calls.

use thiserror::Error;

/// Errors surfaced by a directory gateway.
///
/// Lookups that find nothing return `Ok(None)`; these variants cover only
/// transport-level failure and the broker-side timeout wrapper.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory could not be reached or the connection broke.
    #[error("directory transport failure: {reason}")]
    Transport {
        /// What went wrong at the transport level.
        reason: String,
    },

    /// A gateway call exceeded the configured deadline.
    #[error("directory call timed out after {millis}ms")]
    Timeout {
        /// The deadline that elapsed, in milliseconds.
        millis: u64,
    },
}

/// Result type alias for gateway calls.
pub type Result<T> = std::result::Result<T, DirectoryError>;
