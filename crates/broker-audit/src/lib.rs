//! # Broker Audit
//!
//! An append-only ledger of every sensitive action in the password
//! disclosure workflow:
//!
//! - **Closed event set**: request lifecycle, secret exposure, login,
//!   directory failures, and policy violations
//! - **Redaction**: structured details are scrubbed of sensitive keys before
//!   a record is persisted, recursively through nested values
//! - **Filtered queries**: paginated queries by event type, actor, hostname,
//!   date range and outcome
//! - **CSV export**: flat export with a fixed column order for offline review
//!
//! No update or delete API is exposed; retention is an operational concern.

pub mod csv;
pub mod error;
pub mod events;
pub mod redact;
pub mod store;

pub use error::{AuditError, Result};
pub use events::{AuditEventType, AuditRecord, AuditRecordBuilder};
pub use redact::redact_details;
pub use store::{AuditFilter, AuditPage, AuditStore};
