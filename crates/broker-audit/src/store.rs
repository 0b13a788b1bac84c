//! The append-only audit store.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::events::{AuditEventType, AuditRecord};

/// Filter criteria for querying audit records.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by event type.
    pub event_type: Option<AuditEventType>,
    /// Filter by acting user id.
    pub user_id: Option<String>,
    /// Filter by target hostname.
    pub hostname: Option<String>,
    /// Filter by related request id.
    pub request_id: Option<Uuid>,
    /// Filter records at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Filter records at or before this time.
    pub to: Option<DateTime<Utc>>,
    /// Filter by outcome.
    pub success: Option<bool>,
    /// 1-based page number.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
}

/// Default page size for queries.
pub const DEFAULT_PAGE_SIZE: usize = 50;

impl AuditFilter {
    /// Creates a filter that matches everything, first page, default size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            ..Self::default()
        }
    }

    /// Filters by event type.
    #[must_use]
    pub const fn with_event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Filters by acting user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Filters by hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Filters by related request.
    #[must_use]
    pub const fn with_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Filters to records within the given time range (inclusive).
    #[must_use]
    pub const fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Filters by outcome.
    #[must_use]
    pub const fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Selects a page.
    #[must_use]
    pub const fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(event_type) = self.event_type {
            if record.event_type != event_type {
                return false;
            }
        }
        if let Some(ref user_id) = self.user_id {
            if &record.user_id != user_id {
                return false;
            }
        }
        if let Some(ref hostname) = self.hostname {
            if record.hostname.as_ref() != Some(hostname) {
                return false;
            }
        }
        if let Some(request_id) = self.request_id {
            if record.request_id != Some(request_id) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.timestamp > to {
                return false;
            }
        }
        if let Some(success) = self.success {
            if record.success != success {
                return false;
            }
        }
        true
    }
}

/// One page of query results with the total match count for pagination.
#[derive(Debug, Clone)]
pub struct AuditPage {
    /// The records on this page, newest first.
    pub records: Vec<AuditRecord>,
    /// Total number of records matching the filter.
    pub total: usize,
}

/// An in-memory append-only audit store.
///
/// Records are mirrored to `tracing` (target `broker_audit`) as they are
/// appended. No update or delete API exists; the rest of the system can
/// only append and query.
pub struct AuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl AuditStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Appends a record to the ledger.
    pub fn append(&self, record: AuditRecord) {
        self.emit_trace(&record);
        self.records.write().push(record);
    }

    /// Queries records with the given filter.
    ///
    /// Results are returned newest first. `total` counts all matches, not
    /// just the returned page.
    #[must_use]
    pub fn query(&self, filter: &AuditFilter) -> AuditPage {
        let records = self.records.read();

        let mut matches: Vec<AuditRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matches.len();
        let page = filter.page.max(1);
        let page_size = if filter.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.page_size
        };
        let start = (page - 1).saturating_mul(page_size);

        let records = if start >= matches.len() {
            Vec::new()
        } else {
            matches.drain(start..).take(page_size).collect()
        };

        AuditPage { records, total }
    }

    /// Returns the total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit_trace(&self, record: &AuditRecord) {
        let event_type = record.event_type;
        let user_id = &record.user_id;
        match record.event_type {
            AuditEventType::AdError => {
                tracing::error!(
                    target: "broker_audit",
                    %event_type,
                    %user_id,
                    success = record.success,
                    "audit: {event_type}"
                );
            }
            AuditEventType::LoginFailed
            | AuditEventType::PermissionDenied
            | AuditEventType::RateLimitExceeded
            | AuditEventType::HostnameValidationFailed
            | AuditEventType::LapsNotFound => {
                tracing::warn!(
                    target: "broker_audit",
                    %event_type,
                    %user_id,
                    success = record.success,
                    "audit: {event_type}"
                );
            }
            _ => {
                tracing::info!(
                    target: "broker_audit",
                    %event_type,
                    %user_id,
                    success = record.success,
                    "audit: {event_type}"
                );
            }
        }
    }
}

impl Default for AuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore")
            .field("records_count", &self.len())
            .finish()
    }
}
