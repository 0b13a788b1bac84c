//! Directory object shapes consumed by the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A machine object resolved from a hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerRecord {
    /// Distinguished name of the object.
    pub dn: String,
    /// Common name.
    pub cn: String,
    /// Display name.
    pub name: String,
    /// Distinguished name or id of the recorded owner/manager, if any.
    pub managed_by: Option<String>,
}

/// The managed local administrator secret for a machine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedSecret {
    /// The plaintext secret as held by the directory.
    pub secret: String,
    /// When the directory plans to rotate the secret, if published.
    pub expiration_time: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for ManagedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedSecret")
            .field("secret", &"[REDACTED]")
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

/// An authenticated directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account identifier.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Group memberships, as group names.
    pub groups: Vec<String>,
}
