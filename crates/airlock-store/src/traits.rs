//! Audit sink contract

use airlock_util::format_log_timestamp;
use chrono::{DateTime, Local};

use crate::{AuditEvent, StoreResult};

/// Returned by `read_all` when nothing has been logged yet
pub const NO_LOGS: &str = "No logs available.";

/// Append-only audit trail.
///
/// The core writes to it and reads it back for display; it never depends on
/// the storage medium.
pub trait AuditSink: Send + Sync {
    /// Append one message; the sink stamps it with the current time
    fn append(&self, message: &str) -> StoreResult<()>;

    /// Full current contents, or [`NO_LOGS`] when there are none
    fn read_all(&self) -> StoreResult<String>;

    /// Append a typed event
    fn record(&self, event: &AuditEvent) -> StoreResult<()> {
        self.append(&event.to_string())
    }
}

/// Render one audit line, `[yyyy-MM-dd HH:mm:ss] <message>` plus newline.
/// Embedded line breaks are flattened so every event stays on one line.
pub fn format_line(timestamp: &DateTime<Local>, message: &str) -> String {
    let message = message.replace(['\r', '\n'], " ");
    format!("[{}] {}\n", format_log_timestamp(timestamp), message)
}
