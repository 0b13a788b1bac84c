//! In-memory cache for encrypted secrets awaiting disclosure.
//!
//! Entries hold ciphertext only; plaintext never enters the cache. An entry
//! stays resident until its disclosure window ends or a caller deletes it
//! explicitly, so an approved requester can re-open the secret within the
//! window.

use std::collections::HashMap;

use broker_crypto::EncryptedPayload;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A cached encrypted secret tied to one approved request.
#[derive(Clone)]
pub struct CachedSecret {
    /// The request this secret was approved for.
    pub request_id: Uuid,
    /// Ciphertext and nonce; decryption happens at disclosure time.
    pub payload: EncryptedPayload,
    /// When the entry was stored.
    pub created_at: DateTime<Utc>,
    /// End of the disclosure window.
    pub expires_at: DateTime<Utc>,
}

impl CachedSecret {
    /// Returns true if the disclosure window has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for CachedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSecret")
            .field("request_id", &self.request_id)
            .field("payload", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Keyed store of encrypted secrets, guarded by a single `RwLock`.
///
/// Lookups report only live entries; reaping is left to the periodic
/// [`SecretCache::delete_expired`] sweep so that audit bookkeeping can
/// observe what was dropped.
#[derive(Default)]
pub struct SecretCache {
    entries: RwLock<HashMap<Uuid, CachedSecret>>,
}

impl SecretCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a secret for a request, replacing any previous entry.
    pub fn store(&self, request_id: Uuid, payload: EncryptedPayload, expires_at: DateTime<Utc>) {
        let entry = CachedSecret {
            request_id,
            payload,
            created_at: Utc::now(),
            expires_at,
        };
        self.entries.write().insert(request_id, entry);
        debug!(request_id = %request_id, %expires_at, "secret cached");
    }

    /// Returns the cached secret for a request if its window is still open.
    ///
    /// The entry is not consumed; repeated views within the window return
    /// the same payload.
    #[must_use]
    pub fn get(&self, request_id: Uuid) -> Option<CachedSecret> {
        let entries = self.entries.read();
        entries
            .get(&request_id)
            .filter(|entry| !entry.is_expired_at(Utc::now()))
            .cloned()
    }

    /// Removes the entry for a request. Returns true if one existed.
    pub fn delete(&self, request_id: Uuid) -> bool {
        let removed = self.entries.write().remove(&request_id).is_some();
        if removed {
            debug!(request_id = %request_id, "secret evicted");
        }
        removed
    }

    /// Drops every entry whose window has closed. Returns the count removed.
    pub fn delete_expired(&self) -> usize {
        self.delete_expired_with(|_| {})
    }

    /// Like [`SecretCache::delete_expired`], invoking the callback once per
    /// removed entry. The callback runs outside the lock.
    pub fn delete_expired_with(&self, mut on_removed: impl FnMut(&CachedSecret)) -> usize {
        let now = Utc::now();
        let removed: Vec<CachedSecret> = {
            let mut entries = self.entries.write();
            let dead: Vec<Uuid> = entries
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(id, _)| *id)
                .collect();
            dead.into_iter()
                .filter_map(|id| entries.remove(&id))
                .collect()
        };
        for entry in &removed {
            on_removed(entry);
        }
        if !removed.is_empty() {
            debug!(removed = removed.len(), "expired secrets swept");
        }
        removed.len()
    }

    /// Number of resident entries, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SecretCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCache")
            .field("entries_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_crypto::{SecretKey, encrypt_secret};
    use chrono::Duration;

    fn payload() -> EncryptedPayload {
        let key = SecretKey::generate();
        encrypt_secret(&key, "hunter2-complex-password").expect("encrypt")
    }

    #[test]
    fn store_and_get_within_window() {
        let cache = SecretCache::new();
        let id = Uuid::new_v4();
        cache.store(id, payload(), Utc::now() + Duration::minutes(10));

        let entry = cache.get(id).expect("live entry");
        assert_eq!(entry.request_id, id);
    }

    #[test]
    fn get_returns_same_entry_repeatedly() {
        let cache = SecretCache::new();
        let id = Uuid::new_v4();
        cache.store(id, payload(), Utc::now() + Duration::minutes(10));

        let first = cache.get(id).expect("first view");
        let second = cache.get(id).expect("second view");
        assert_eq!(first.payload.ciphertext, second.payload.ciphertext);
    }

    #[test]
    fn expired_entry_is_invisible_but_resident() {
        let cache = SecretCache::new();
        let id = Uuid::new_v4();
        cache.store(id, payload(), Utc::now() - Duration::seconds(1));

        assert!(cache.get(id).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn delete_removes_entry() {
        let cache = SecretCache::new();
        let id = Uuid::new_v4();
        cache.store(id, payload(), Utc::now() + Duration::minutes(10));

        assert!(cache.delete(id));
        assert!(!cache.delete(id));
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn delete_expired_sweeps_only_closed_windows() {
        let cache = SecretCache::new();
        let live = Uuid::new_v4();
        let dead = Uuid::new_v4();
        cache.store(live, payload(), Utc::now() + Duration::minutes(10));
        cache.store(dead, payload(), Utc::now() - Duration::seconds(1));

        assert_eq!(cache.delete_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(live).is_some());
    }

    #[test]
    fn store_replaces_previous_entry() {
        let cache = SecretCache::new();
        let id = Uuid::new_v4();
        cache.store(id, payload(), Utc::now() - Duration::seconds(1));
        cache.store(id, payload(), Utc::now() + Duration::minutes(10));

        assert!(cache.get(id).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn debug_never_prints_ciphertext() {
        let cache = SecretCache::new();
        let id = Uuid::new_v4();
        cache.store(id, payload(), Utc::now() + Duration::minutes(10));

        let entry = cache.get(id).expect("entry");
        let rendered = format!("{entry:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("ciphertext: ["));
    }
}
