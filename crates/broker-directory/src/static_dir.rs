//! An in-memory directory for tests and local development.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{DirectoryError, Result};
use crate::gateway::DirectoryGateway;
use crate::types::{ComputerRecord, ManagedSecret, UserProfile};

struct SeededUser {
    password: String,
    profile: UserProfile,
}

#[derive(Default)]
struct Inner {
    computers: HashMap<String, ComputerRecord>,
    secrets: HashMap<String, ManagedSecret>,
    users: HashMap<String, SeededUser>,
    admin_group: String,
    fail_transport: bool,
}

/// A directory gateway backed by seeded in-memory data.
///
/// Hostname keys are matched case-insensitively, mirroring directory
/// semantics. Setting `fail_transport` makes every call return a transport
/// error, for exercising the broker's `AD_ERROR` paths.
pub struct StaticDirectory {
    inner: RwLock<Inner>,
}

impl StaticDirectory {
    /// Creates an empty directory with the given admin group name.
    #[must_use]
    pub fn new(admin_group: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                admin_group: admin_group.into(),
                ..Inner::default()
            }),
        }
    }

    /// Seeds a machine object, optionally with its managed secret.
    pub fn add_computer(&self, record: ComputerRecord, secret: Option<ManagedSecret>) {
        let key = record.name.to_uppercase();
        let mut inner = self.inner.write();
        if let Some(secret) = secret {
            inner.secrets.insert(key.clone(), secret);
        }
        inner.computers.insert(key, record);
    }

    /// Seeds a user account.
    pub fn add_user(&self, profile: UserProfile, password: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.users.insert(
            profile.user_id.clone(),
            SeededUser {
                password: password.into(),
                profile,
            },
        );
    }

    /// Removes the managed secret for a machine, keeping the object.
    pub fn remove_secret(&self, hostname: &str) {
        self.inner.write().secrets.remove(&hostname.to_uppercase());
    }

    /// Makes every subsequent call fail at the transport level.
    pub fn set_fail_transport(&self, fail: bool) {
        self.inner.write().fail_transport = fail;
    }

    fn check_transport(inner: &Inner) -> Result<()> {
        if inner.fail_transport {
            Err(DirectoryError::Transport {
                reason: "simulated connection failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl DirectoryGateway for StaticDirectory {
    async fn find_computer(&self, hostname: &str) -> Result<Option<ComputerRecord>> {
        let inner = self.inner.read();
        Self::check_transport(&inner)?;
        Ok(inner.computers.get(&hostname.to_uppercase()).cloned())
    }

    async fn get_managed_secret(&self, hostname: &str) -> Result<Option<ManagedSecret>> {
        let inner = self.inner.read();
        Self::check_transport(&inner)?;
        Ok(inner.secrets.get(&hostname.to_uppercase()).cloned())
    }

    async fn authenticate(&self, user_id: &str, password: &str) -> Result<Option<UserProfile>> {
        let inner = self.inner.read();
        Self::check_transport(&inner)?;
        Ok(inner
            .users
            .get(user_id)
            .filter(|u| u.password == password)
            .map(|u| u.profile.clone()))
    }

    async fn is_member_of_admin_group(&self, user_id: &str) -> Result<bool> {
        let inner = self.inner.read();
        Self::check_transport(&inner)?;
        Ok(inner
            .users
            .get(user_id)
            .is_some_and(|u| u.profile.groups.iter().any(|g| g == &inner.admin_group)))
    }
}

impl std::fmt::Debug for StaticDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("StaticDirectory")
            .field("computers", &inner.computers.len())
            .field("users", &inner.users.len())
            .finish()
    }
}
