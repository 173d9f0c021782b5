//! Audit event types

use airlock_api::SessionEndReason;
use airlock_util::SessionId;
use std::fmt;

/// Events written to the audit trail.
///
/// Each renders to one human-readable line; the sink adds the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    ServiceStarted,

    ServiceStopped,

    SessionStarted {
        session_id: SessionId,
    },

    /// Session creation aborted (e.g. isolation could not be applied)
    SessionStartFailed {
        error: String,
    },

    SessionEnded {
        session_id: SessionId,
        reason: SessionEndReason,
    },

    FileImported {
        session_id: SessionId,
        name: String,
        size: u64,
    },

    DocumentScanned {
        session_id: SessionId,
        name: String,
        size: u64,
    },

    FilePrinted {
        session_id: SessionId,
        name: String,
    },

    PrintDenied {
        session_id: SessionId,
        name: String,
    },

    SpoolSweepFailed {
        error: String,
    },

    /// Summary of a wipe pass over a session directory
    WipeCompleted {
        target: String,
        success: bool,
        files_destroyed: usize,
        message: String,
    },

    /// One item the wipe could not destroy
    WipeError {
        target: String,
        error: String,
    },

    /// The wipe left something behind and a recursive removal was used
    FallbackRemoval {
        target: String,
        error: Option<String>,
    },

    OrphanFound {
        name: String,
    },

    /// `reason` is set when the directory named a session
    OrphanRecovered {
        name: String,
        reason: Option<SessionEndReason>,
        message: String,
    },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::ServiceStarted => write!(f, "Service started"),
            AuditEvent::ServiceStopped => write!(f, "Service stopped"),
            AuditEvent::SessionStarted { session_id } => {
                write!(f, "Session started: {}", session_id)
            }
            AuditEvent::SessionStartFailed { error } => {
                write!(f, "Session start failed: {}", error)
            }
            AuditEvent::SessionEnded { session_id, reason } => {
                write!(f, "Session ended: {} (reason: {})", session_id, reason)
            }
            AuditEvent::FileImported { name, size, .. } => {
                write!(f, "File imported: {} ({} bytes)", name, size)
            }
            AuditEvent::DocumentScanned { name, size, .. } => {
                write!(f, "Document scanned: {} ({} bytes)", name, size)
            }
            AuditEvent::FilePrinted { name, .. } => write!(f, "File sent to printer: {}", name),
            AuditEvent::PrintDenied { name, .. } => {
                write!(f, "Print denied: {} is outside the session", name)
            }
            AuditEvent::SpoolSweepFailed { error } => {
                write!(f, "Print spool cleanup failed: {}", error)
            }
            AuditEvent::WipeCompleted {
                target,
                success,
                files_destroyed,
                message,
            } => {
                let status = if *success { "complete" } else { "incomplete" };
                write!(
                    f,
                    "Wipe {} for {}: {} files destroyed. {}",
                    status, target, files_destroyed, message
                )
            }
            AuditEvent::WipeError { target, error } => {
                write!(f, "Wipe error in {}: {}", target, error)
            }
            AuditEvent::FallbackRemoval { target, error: None } => {
                write!(f, "Leftovers of {} removed recursively", target)
            }
            AuditEvent::FallbackRemoval {
                target,
                error: Some(error),
            } => write!(f, "Recursive removal of {} failed: {}", target, error),
            AuditEvent::OrphanFound { name } => write!(f, "Orphan session found: {}", name),
            AuditEvent::OrphanRecovered {
                name,
                reason: Some(reason),
                message,
            } => write!(
                f,
                "Orphan session recovered: {} (reason: {}; {})",
                name, reason, message
            ),
            AuditEvent::OrphanRecovered {
                name,
                reason: None,
                message,
            } => write!(f, "Orphan session recovered: {} ({})", name, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ended_names_reason() {
        let id = SessionId::new();
        let line = AuditEvent::SessionEnded {
            session_id: id,
            reason: SessionEndReason::InactivityTimeout,
        }
        .to_string();
        assert_eq!(
            line,
            format!("Session ended: {} (reason: InactivityTimeout)", id)
        );
    }

    #[test]
    fn orphan_events_are_distinct_from_normal_end() {
        let found = AuditEvent::OrphanFound { name: "x".into() }.to_string();
        let recovered = AuditEvent::OrphanRecovered {
            name: "x".into(),
            reason: Some(SessionEndReason::CrashRecovery),
            message: "Wiped 1 files".into(),
        }
        .to_string();
        let foreign = AuditEvent::OrphanRecovered {
            name: "scratch".into(),
            reason: None,
            message: "Wiped 0 files".into(),
        }
        .to_string();
        assert!(found.starts_with("Orphan session found"));
        assert_eq!(
            recovered,
            "Orphan session recovered: x (reason: CrashRecovery; Wiped 1 files)"
        );
        assert_eq!(foreign, "Orphan session recovered: scratch (Wiped 0 files)");
        assert!(!recovered.contains("Session ended"));
    }

    #[test]
    fn import_line_carries_size() {
        let line = AuditEvent::FileImported {
            session_id: SessionId::new(),
            name: "scan.pdf".into(),
            size: 2048,
        }
        .to_string();
        assert_eq!(line, "File imported: scan.pdf (2048 bytes)");
    }
}
