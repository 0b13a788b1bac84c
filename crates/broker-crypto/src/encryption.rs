//! Authenticated encryption for cached secrets.
//!
//! Secrets retrieved from the directory are encrypted with ChaCha20-Poly1305
//! before they enter the temporary disclosure cache. The nonce is freshly
//! random per call and stored alongside the ciphertext; the Poly1305 tag is
//! appended to the ciphertext by the AEAD construction.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// Size of the encryption key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// A symmetric key for secret encryption.
///
/// The key is securely zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a `SecretKey` from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey {
                reason: format!("key must be exactly {KEY_SIZE} bytes, got {}", bytes.len()),
            });
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key bytes as a slice.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The output of [`encrypt_secret`]: ciphertext plus the nonce used.
///
/// The nonce is not sensitive and is stored in clear next to the ciphertext
/// in the disclosure cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// The ciphertext including the trailing authentication tag.
    pub ciphertext: Vec<u8>,
    /// The 12-byte nonce used for this encryption.
    pub nonce: [u8; NONCE_SIZE],
}

/// Encrypts a plaintext secret with ChaCha20-Poly1305.
///
/// A fresh random nonce is generated for every call and returned alongside
/// the ciphertext; nonces are never reused.
///
/// # Errors
///
/// Returns an error if the cipher cannot be constructed or encryption fails.
pub fn encrypt_secret(key: &SecretKey, plaintext: &str) -> Result<EncryptedPayload> {
    let cipher =
        ChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("failed to create cipher: {e}"),
        })?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("encryption failed: {e}"),
        })?;

    Ok(EncryptedPayload {
        ciphertext,
        nonce: nonce_bytes,
    })
}

/// Decrypts a payload produced by [`encrypt_secret`].
///
/// # Errors
///
/// Returns [`CryptoError::IntegrityFailure`] if the authentication tag does
/// not verify (tampered data or wrong key), and
/// [`CryptoError::InvalidPlaintext`] if the decrypted bytes are not UTF-8.
pub fn decrypt_secret(key: &SecretKey, payload: &EncryptedPayload) -> Result<String> {
    if payload.ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::IntegrityFailure);
    }

    let cipher =
        ChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("failed to create cipher: {e}"),
        })?;

    let nonce = Nonce::from_slice(&payload.nonce);

    let plaintext = cipher
        .decrypt(nonce, payload.ciphertext.as_slice())
        .map_err(|_| CryptoError::IntegrityFailure)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext)
}

/// Generates an opaque, collision-resistant request identifier.
///
/// UUIDv4 carries 122 random bits, which places it in the 128-bit class the
/// disclosure workflow requires.
#[must_use]
pub fn generate_request_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_generate_is_random() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn secret_key_from_bytes_valid() {
        let bytes = [42u8; KEY_SIZE];
        let key = SecretKey::from_bytes(&bytes).expect("should create key");
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn secret_key_from_bytes_wrong_length() {
        assert!(SecretKey::from_bytes(&[0u8; 16]).is_err());
        assert!(SecretKey::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn secret_key_debug_redacts() {
        let key = SecretKey::generate();
        let debug_str = format!("{key:?}");
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = SecretKey::generate();

        let payload = encrypt_secret(&key, "Str0ng!Pass").expect("encrypt");
        let decrypted = decrypt_secret(&key, &payload).expect("decrypt");

        assert_eq!(decrypted, "Str0ng!Pass");
    }

    #[test]
    fn encrypt_produces_fresh_nonces() {
        let key = SecretKey::generate();

        let p1 = encrypt_secret(&key, "same secret").expect("encrypt 1");
        let p2 = encrypt_secret(&key, "same secret").expect("encrypt 2");

        assert_ne!(p1.nonce, p2.nonce);
        assert_ne!(p1.ciphertext, p2.ciphertext);
    }

    #[test]
    fn decrypt_wrong_key_is_integrity_failure() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();

        let payload = encrypt_secret(&key1, "secret").expect("encrypt");
        let result = decrypt_secret(&key2, &payload);

        assert!(matches!(result, Err(CryptoError::IntegrityFailure)));
    }

    #[test]
    fn decrypt_tampered_ciphertext_is_integrity_failure() {
        let key = SecretKey::generate();
        let mut payload = encrypt_secret(&key, "secret").expect("encrypt");

        if let Some(byte) = payload.ciphertext.first_mut() {
            *byte ^= 0xFF;
        }

        let result = decrypt_secret(&key, &payload);
        assert!(matches!(result, Err(CryptoError::IntegrityFailure)));
    }

    #[test]
    fn decrypt_tampered_nonce_is_integrity_failure() {
        let key = SecretKey::generate();
        let mut payload = encrypt_secret(&key, "secret").expect("encrypt");

        payload.nonce[0] ^= 0xFF;

        let result = decrypt_secret(&key, &payload);
        assert!(matches!(result, Err(CryptoError::IntegrityFailure)));
    }

    #[test]
    fn decrypt_truncated_ciphertext_fails() {
        let key = SecretKey::generate();
        let payload = EncryptedPayload {
            ciphertext: vec![0u8; TAG_SIZE - 1],
            nonce: [0u8; NONCE_SIZE],
        };

        assert!(decrypt_secret(&key, &payload).is_err());
    }

    #[test]
    fn request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
    }

    #[test]
    fn ciphertext_length_is_predictable() {
        let key = SecretKey::generate();
        let payload = encrypt_secret(&key, "test message").expect("encrypt");

        // ciphertext = plaintext + tag
        assert_eq!(payload.ciphertext.len(), "test message".len() + TAG_SIZE);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn roundtrip_any_secret(s in ".{0,128}") {
                let key = SecretKey::generate();
                let payload = encrypt_secret(&key, &s).expect("encrypt");
                let decrypted = decrypt_secret(&key, &payload).expect("decrypt");
                prop_assert_eq!(decrypted, s);
            }

            #[test]
            fn corrupting_one_byte_never_yields_plaintext(
                s in ".{1,64}",
                idx in 0usize..16,
            ) {
                let key = SecretKey::generate();
                let mut payload = encrypt_secret(&key, &s).expect("encrypt");
                let i = idx % payload.ciphertext.len();
                payload.ciphertext[i] ^= 0x01;
                prop_assert!(matches!(
                    decrypt_secret(&key, &payload),
                    Err(CryptoError::IntegrityFailure)
                ));
            }
        }
    }
}
