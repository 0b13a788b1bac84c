//! The request repository contract and its in-memory implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{RepositoryError, Result};
use crate::types::{PasswordRequest, RequestStatus};

/// Filter criteria for listing requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Filter by lifecycle status.
    pub status: Option<RequestStatus>,
    /// Filter by requester account id.
    pub requester_id: Option<String>,
    /// Filter by normalized hostname.
    pub hostname: Option<String>,
}

impl RequestFilter {
    /// Creates a filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by status.
    #[must_use]
    pub const fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by requester.
    #[must_use]
    pub fn with_requester(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = Some(requester_id.into());
        self
    }

    /// Filters by hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    fn matches(&self, request: &PasswordRequest) -> bool {
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(ref requester) = self.requester_id {
            if &request.requester_id != requester {
                return false;
            }
        }
        if let Some(ref hostname) = self.hostname {
            if &request.hostname != hostname {
                return false;
            }
        }
        true
    }
}

/// Storage contract for password requests.
///
/// Implementations must make [`RequestRepository::transition_from_pending`]
/// atomic: of two racing reviews on the same pending request, exactly one
/// may succeed.
pub trait RequestRepository: Send + Sync {
    /// Persists a new request.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if a request with the same id already exists.
    fn create(&self, request: PasswordRequest) -> Result<()>;

    /// Returns a request by id.
    fn get(&self, id: Uuid) -> Option<PasswordRequest>;

    /// Lists requests matching the filter, newest first.
    fn list(&self, filter: &RequestFilter) -> Vec<PasswordRequest>;

    /// Replaces an existing request (timestamp bookkeeping only; status
    /// transitions go through [`RequestRepository::transition_from_pending`]).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist.
    fn update(&self, request: PasswordRequest) -> Result<()>;

    /// Compare-and-set status transition out of `Pending`.
    ///
    /// The closure runs under the storage lock on a request that is
    /// currently `Pending`; it must set the new status and any associated
    /// review fields. Returns the updated request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist, `NotPending` if its
    /// status is already terminal.
    fn transition_from_pending(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut PasswordRequest),
    ) -> Result<PasswordRequest>;

    /// Marks stale pending requests expired.
    ///
    /// A pending request expires when its own `expires_at` has passed, or,
    /// lacking one, when it was created before `default_cutoff`. Returns the
    /// requests that were transitioned.
    fn expire_stale_pending(
        &self,
        now: DateTime<Utc>,
        default_cutoff: DateTime<Utc>,
    ) -> Vec<PasswordRequest>;
}

/// An in-memory repository guarded by a single `RwLock`.
///
/// The conditional transition holds the write lock for its whole
/// read-modify-write, which gives the per-request atomicity the contract
/// requires.
#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<Uuid, PasswordRequest>>,
}

impl InMemoryRequestRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.read().len()
    }

    /// Returns true if no requests are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestRepository for InMemoryRequestRepository {
    fn create(&self, request: PasswordRequest) -> Result<()> {
        let mut requests = self.requests.write();
        if requests.contains_key(&request.id) {
            return Err(RepositoryError::Duplicate { id: request.id });
        }
        debug!(id = %request.id, hostname = %request.hostname, "request created");
        requests.insert(request.id, request);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Option<PasswordRequest> {
        self.requests.read().get(&id).cloned()
    }

    fn list(&self, filter: &RequestFilter) -> Vec<PasswordRequest> {
        let requests = self.requests.read();
        let mut results: Vec<PasswordRequest> = requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results
    }

    fn update(&self, request: PasswordRequest) -> Result<()> {
        let mut requests = self.requests.write();
        match requests.get_mut(&request.id) {
            Some(slot) => {
                *slot = request;
                Ok(())
            }
            None => Err(RepositoryError::NotFound { id: request.id }),
        }
    }

    fn transition_from_pending(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut PasswordRequest),
    ) -> Result<PasswordRequest> {
        let mut requests = self.requests.write();
        let request = requests
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound { id })?;

        if request.status != RequestStatus::Pending {
            return Err(RepositoryError::NotPending {
                id,
                actual: request.status,
            });
        }

        apply(request);
        request.updated_at = Utc::now();
        debug!(id = %id, status = %request.status, "request transitioned");
        Ok(request.clone())
    }

    fn expire_stale_pending(
        &self,
        now: DateTime<Utc>,
        default_cutoff: DateTime<Utc>,
    ) -> Vec<PasswordRequest> {
        let mut requests = self.requests.write();
        let mut expired = Vec::new();

        for request in requests.values_mut() {
            if request.status != RequestStatus::Pending {
                continue;
            }
            let stale = request
                .expires_at
                .map_or(request.created_at < default_cutoff, |deadline| deadline <= now);
            if stale {
                request.status = RequestStatus::Expired;
                request.updated_at = now;
                expired.push(request.clone());
            }
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "stale pending requests expired");
        }
        expired
    }
}

impl std::fmt::Debug for InMemoryRequestRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRequestRepository")
            .field("requests_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_request(requester: &str, hostname: &str) -> PasswordRequest {
        PasswordRequest::new(
            Uuid::new_v4(),
            requester,
            requester,
            hostname,
            "justification long enough here",
            "deadbeefdeadbeef",
            None,
        )
    }

    #[test]
    fn create_and_get() {
        let repo = InMemoryRequestRepository::new();
        let request = pending_request("jdoe", "PC-1");
        let id = request.id;

        repo.create(request).expect("create");

        let fetched = repo.get(id).expect("exists");
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.status, RequestStatus::Pending);
    }

    #[test]
    fn create_duplicate_rejected() {
        let repo = InMemoryRequestRepository::new();
        let request = pending_request("jdoe", "PC-1");

        repo.create(request.clone()).expect("create");
        let result = repo.create(request);
        assert!(matches!(result, Err(RepositoryError::Duplicate { .. })));
    }

    #[test]
    fn get_missing_is_none() {
        let repo = InMemoryRequestRepository::new();
        assert!(repo.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn list_filters_by_status_and_requester() {
        let repo = InMemoryRequestRepository::new();
        repo.create(pending_request("alice", "PC-1")).expect("create");
        repo.create(pending_request("alice", "PC-2")).expect("create");
        repo.create(pending_request("bob", "PC-3")).expect("create");

        let alices = repo.list(&RequestFilter::new().with_requester("alice"));
        assert_eq!(alices.len(), 2);

        let pending = repo.list(&RequestFilter::new().with_status(RequestStatus::Pending));
        assert_eq!(pending.len(), 3);

        let none = repo.list(&RequestFilter::new().with_status(RequestStatus::Denied));
        assert!(none.is_empty());
    }

    #[test]
    fn transition_applies_and_stamps() {
        let repo = InMemoryRequestRepository::new();
        let request = pending_request("jdoe", "PC-1");
        let id = request.id;
        repo.create(request).expect("create");

        let updated = repo
            .transition_from_pending(id, &mut |r| {
                r.status = RequestStatus::Denied;
                r.reviewed_by = Some("admin".to_string());
            })
            .expect("transition");

        assert_eq!(updated.status, RequestStatus::Denied);
        assert_eq!(updated.reviewed_by.as_deref(), Some("admin"));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn transition_missing_is_not_found() {
        let repo = InMemoryRequestRepository::new();
        let result = repo.transition_from_pending(Uuid::new_v4(), &mut |_| {});
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn second_transition_loses() {
        let repo = InMemoryRequestRepository::new();
        let request = pending_request("jdoe", "PC-1");
        let id = request.id;
        repo.create(request).expect("create");

        repo.transition_from_pending(id, &mut |r| r.status = RequestStatus::Approved)
            .expect("first transition wins");

        let result = repo.transition_from_pending(id, &mut |r| r.status = RequestStatus::Denied);
        assert!(matches!(
            result,
            Err(RepositoryError::NotPending {
                actual: RequestStatus::Approved,
                ..
            })
        ));
    }

    #[test]
    fn racing_transitions_yield_exactly_one_winner() {
        use std::sync::Arc;
        use std::thread;

        for _ in 0..20 {
            let repo = Arc::new(InMemoryRequestRepository::new());
            let request = pending_request("jdoe", "PC-1");
            let id = request.id;
            repo.create(request).expect("create");

            let approve_repo = Arc::clone(&repo);
            let approve = thread::spawn(move || {
                approve_repo
                    .transition_from_pending(id, &mut |r| r.status = RequestStatus::Approved)
                    .is_ok()
            });

            let deny_repo = Arc::clone(&repo);
            let deny = thread::spawn(move || {
                deny_repo
                    .transition_from_pending(id, &mut |r| r.status = RequestStatus::Denied)
                    .is_ok()
            });

            let approve_won = approve.join().expect("thread");
            let deny_won = deny.join().expect("thread");

            assert!(approve_won ^ deny_won, "exactly one review must win");
        }
    }

    #[test]
    fn expire_stale_pending_honors_explicit_deadline() {
        let repo = InMemoryRequestRepository::new();
        let now = Utc::now();

        let mut with_deadline = pending_request("alice", "PC-1");
        with_deadline.expires_at = Some(now - Duration::minutes(1));
        let expired_id = with_deadline.id;
        repo.create(with_deadline).expect("create");

        let mut future_deadline = pending_request("bob", "PC-2");
        future_deadline.expires_at = Some(now + Duration::hours(1));
        repo.create(future_deadline).expect("create");

        let expired = repo.expire_stale_pending(now, now - Duration::days(7));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, expired_id);
        assert_eq!(
            repo.get(expired_id).expect("exists").status,
            RequestStatus::Expired
        );
    }

    #[test]
    fn expire_stale_pending_uses_default_cutoff() {
        let repo = InMemoryRequestRepository::new();
        let now = Utc::now();

        let mut old = pending_request("alice", "PC-1");
        old.created_at = now - Duration::days(8);
        repo.create(old).expect("create");

        let fresh = pending_request("bob", "PC-2");
        repo.create(fresh).expect("create");

        let expired = repo.expire_stale_pending(now, now - Duration::days(7));
        assert_eq!(expired.len(), 1);
    }

    #[test]
    fn expire_stale_pending_skips_terminal_states() {
        let repo = InMemoryRequestRepository::new();
        let now = Utc::now();

        let mut denied = pending_request("alice", "PC-1");
        denied.created_at = now - Duration::days(30);
        let id = denied.id;
        repo.create(denied).expect("create");
        repo.transition_from_pending(id, &mut |r| r.status = RequestStatus::Denied)
            .expect("deny");

        let expired = repo.expire_stale_pending(now, now - Duration::days(7));
        assert!(expired.is_empty());
        assert_eq!(repo.get(id).expect("exists").status, RequestStatus::Denied);
    }
}
