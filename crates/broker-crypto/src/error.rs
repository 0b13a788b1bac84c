//! Error types for broker cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material has the wrong shape.
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// The reason the key is invalid.
        reason: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// The reason encryption failed.
        reason: String,
    },

    /// The authentication tag did not verify.
    ///
    /// This indicates tampering or a key mismatch and must be treated as a
    /// hard failure by callers.
    #[error("integrity failure: ciphertext authentication failed")]
    IntegrityFailure,

    /// Decrypted bytes were not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext,
}

/// Result type alias for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
