//! # Broker Crypto
//!
//! Cryptographic primitives for the password disclosure broker:
//!
//! - **Authenticated encryption**: local administrator secrets are encrypted
//!   with ChaCha20-Poly1305 before they touch the temporary cache
//! - **Justification digests**: one-way BLAKE3 digests of requester-supplied
//!   free text, used for audit correlation without retaining raw text
//! - **Request identifiers**: collision-resistant random UUIDs
//!
//! ## Security Considerations
//!
//! - Key material uses `zeroize` to clear memory on drop
//! - Debug output for keys is redacted
//! - Decryption failure is a hard error, never a partial plaintext

pub mod encryption;
pub mod error;
pub mod justification;

pub use encryption::{
    decrypt_secret, encrypt_secret, generate_request_id, EncryptedPayload, SecretKey,
};
pub use error::{CryptoError, Result};
pub use justification::hash_justification;
