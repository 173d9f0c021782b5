//! Shared types for the airlockd API

use airlock_util::SessionId;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle state of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session, or a previous session retained only for display
    #[default]
    Inactive,
    /// Directory exists, is isolated, and accepts file operations
    Active,
    /// Terminal for that session; its directory is gone
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Inactive => "Inactive",
            SessionState::Active => "Active",
            SessionState::Ended => "Ended",
        };
        f.write_str(s)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// Explicit request from the user
    UserRequested,
    /// No interaction for longer than the inactivity limit
    InactivityTimeout,
    /// Service shut down while the session was active
    ApplicationShutdown,
    /// Leftover directory from a previous run found at startup
    CrashRecovery,
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionEndReason::UserRequested => "UserRequested",
            SessionEndReason::InactivityTimeout => "InactivityTimeout",
            SessionEndReason::ApplicationShutdown => "ApplicationShutdown",
            SessionEndReason::CrashRecovery => "CrashRecovery",
        };
        f.write_str(s)
    }
}

/// A file inside the session as seen by observers.
/// Only the name and size leave the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

/// Session information for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub state: SessionState,
    pub created_at: DateTime<Local>,
    pub last_activity: DateTime<Local>,
    pub end_reason: Option<SessionEndReason>,
    pub files: Vec<FileInfo>,
}

/// Full service state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStateSnapshot {
    pub api_version: u32,
    pub state: SessionState,
    /// Current or last session (retained for display after it ends)
    pub session: Option<SessionInfo>,
    /// Time before automatic termination, when a session is active
    pub time_remaining: Option<Duration>,
    pub inactivity_timeout: Duration,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// The user's own shell: may drive every operation
    Shell,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_control(&self) -> bool {
        matches!(self, ClientRole::Shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_reason_serialization() {
        let json = serde_json::to_string(&SessionEndReason::InactivityTimeout).unwrap();
        assert_eq!(json, "\"inactivity_timeout\"");

        let parsed: SessionEndReason = serde_json::from_str("\"crash_recovery\"").unwrap();
        assert_eq!(parsed, SessionEndReason::CrashRecovery);
    }

    #[test]
    fn default_state_is_inactive() {
        assert_eq!(SessionState::default(), SessionState::Inactive);
        assert_eq!(SessionState::Active.to_string(), "Active");
    }

    #[test]
    fn observer_cannot_control() {
        assert!(ClientRole::Shell.can_control());
        assert!(!ClientRole::Observer.can_control());
    }
}
