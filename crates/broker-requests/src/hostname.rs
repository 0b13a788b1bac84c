//! Hostname normalization for target machine names.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RepositoryError, Result};

/// Maximum NetBIOS-style name length.
const MAX_HOSTNAME_LENGTH: usize = 15;

/// Charset rule: alphanumeric and hyphen, no leading or trailing hyphen.
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap_or_else(|_| unreachable!())
});

/// Normalizes a raw machine name.
///
/// The rule, applied in order: strip a single trailing `$` (directory
/// machine accounts carry one), uppercase, reject when empty or longer than
/// 15 characters, reject characters outside `[A-Za-z0-9-]`, reject a leading
/// or trailing hyphen. Idempotent on its own output.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidHostname`] describing the first rule
/// the input broke.
pub fn normalize_hostname(raw: &str) -> Result<String> {
    let stripped = raw.strip_suffix('$').unwrap_or(raw);
    let name = stripped.to_uppercase();

    if name.is_empty() {
        return Err(RepositoryError::InvalidHostname {
            reason: "hostname is empty".to_string(),
        });
    }

    if name.len() > MAX_HOSTNAME_LENGTH {
        return Err(RepositoryError::InvalidHostname {
            reason: format!(
                "hostname exceeds {MAX_HOSTNAME_LENGTH} characters (got {})",
                name.len()
            ),
        });
    }

    if !HOSTNAME_REGEX.is_match(&name) {
        return Err(RepositoryError::InvalidHostname {
            reason: "hostname must be alphanumeric with interior hyphens only".to_string(),
        });
    }

    Ok(name)
}
