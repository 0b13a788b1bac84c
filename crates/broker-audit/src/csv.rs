//! CSV export of audit records.

use crate::events::AuditRecord;
use crate::store::{AuditFilter, AuditStore};

/// Fixed column order for exports.
pub const CSV_COLUMNS: [&str; 11] = [
    "ID",
    "Timestamp",
    "EventType",
    "UserId",
    "UserName",
    "Hostname",
    "RequestId",
    "Details",
    "ClientIp",
    "Success",
    "Error",
];

/// Quotes a field when it contains the delimiter, a quote, or a line break;
/// internal quotes are doubled.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record_row(record: &AuditRecord) -> String {
    let details = if record.details.is_null() {
        String::new()
    } else {
        record.details.to_string()
    };

    let fields = [
        record.id.to_string(),
        record.timestamp.to_rfc3339(),
        record.event_type.as_str().to_string(),
        record.user_id.clone(),
        record.user_name.clone(),
        record.hostname.clone().unwrap_or_default(),
        record.request_id.map(|id| id.to_string()).unwrap_or_default(),
        details,
        record.client_ip.clone().unwrap_or_default(),
        record.success.to_string(),
        record.error_message.clone().unwrap_or_default(),
    ];

    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Exports all records matching the filter as CSV, newest first.
///
/// Pagination in the filter is ignored; an export always covers every match.
#[must_use]
pub fn export_csv(store: &AuditStore, filter: &AuditFilter) -> String {
    let mut full_filter = filter.clone();
    full_filter.page = 1;
    full_filter.page_size = usize::MAX;

    let page = store.query(&full_filter);

    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for record in &page.records {
        out.push_str(&record_row(record));
        out.push('\n');
    }
    out
}
