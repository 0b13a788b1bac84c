//! One-way digests of requester justifications.

/// Length of the truncated hex digest.
const DIGEST_LEN: usize = 16;

/// Hashes a free-text justification for audit correlation.
///
/// The digest is a BLAKE3 hash truncated to 16 hex characters. It is
/// deterministic and one-way; it is sufficient to correlate audit records
/// that reference the same justification text, not to prove content
/// integrity.
#[must_use]
pub fn hash_justification(text: &str) -> String {
    let hash = blake3::hash(text.as_bytes());
    let mut hex = hash.to_hex().to_string();
    hex.truncate(DIGEST_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = hash_justification("need to install drivers on this machine");
        let b = hash_justification("need to install drivers on this machine");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_differs_for_different_text() {
        let a = hash_justification("first justification text");
        let b = hash_justification("second justification text");
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_fixed_length_hex() {
        let digest = hash_justification("anything");
        assert_eq!(digest.len(), DIGEST_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_does_not_contain_input() {
        let digest = hash_justification("SuperSensitiveReason");
        assert!(!digest.contains("Sensitive"));
    }
}
