//! Session record and state machine

use airlock_api::{FileInfo, SessionEndReason, SessionInfo, SessionState};
use airlock_util::{MonotonicInstant, SessionId};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A file held by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Name as shown to the user; unique within the session
    pub name: String,
    pub size: u64,
    pub(crate) path: PathBuf,
}

impl FileRecord {
    pub(crate) fn new(name: String, size: u64, path: PathBuf) -> Self {
        Self { name, size, path }
    }

    /// Location inside the session directory
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            size: self.size,
        }
    }
}

/// One session: an isolated directory and what the user put in it
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub(crate) path: PathBuf,
    pub created_at: DateTime<Local>,
    pub last_activity: DateTime<Local>,
    /// Monotonic counterpart of `last_activity`; drives the inactivity limit
    last_activity_mono: MonotonicInstant,
    state: SessionState,
    end_reason: Option<SessionEndReason>,
    files: Vec<FileRecord>,
}

impl Session {
    /// A fresh Active session whose directory already exists and is isolated
    pub fn new(id: SessionId, path: PathBuf, now: DateTime<Local>, now_mono: MonotonicInstant) -> Self {
        Self {
            id,
            path,
            created_at: now,
            last_activity: now,
            last_activity_mono: now_mono,
            state: SessionState::Active,
            end_reason: None,
            files: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn end_reason(&self) -> Option<SessionEndReason> {
        self.end_reason
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub(crate) fn add_file(&mut self, record: FileRecord) {
        self.files.push(record);
    }

    /// Record user activity. Timestamps never move backwards.
    pub fn touch(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) {
        if !self.is_active() {
            return;
        }
        if now > self.last_activity {
            self.last_activity = now;
        }
        if now_mono > self.last_activity_mono {
            self.last_activity_mono = now_mono;
        }
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self, now_mono: MonotonicInstant) -> Duration {
        now_mono.duration_since(self.last_activity_mono)
    }

    /// Time left before `limit` of inactivity is exceeded
    pub fn time_remaining(&self, limit: Duration, now_mono: MonotonicInstant) -> Duration {
        limit.saturating_sub(self.idle_for(now_mono))
    }

    /// Active -> Ended. Returns false if the session had already ended.
    pub fn end(&mut self, reason: SessionEndReason) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = SessionState::Ended;
        self.end_reason = Some(reason);
        true
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id,
            state: self.state,
            created_at: self.created_at,
            last_activity: self.last_activity,
            end_reason: self.end_reason,
            files: self.files.iter().map(FileRecord::info).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> (Session, MonotonicInstant) {
        let mono = MonotonicInstant::now();
        let session = Session::new(
            SessionId::new(),
            PathBuf::from("/sessions/x"),
            airlock_util::now(),
            mono,
        );
        (session, mono)
    }

    #[test]
    fn new_session_is_active() {
        let (session, _) = make_session();
        assert!(session.is_active());
        assert_eq!(session.created_at, session.last_activity);
        assert!(session.files().is_empty());
        assert!(session.end_reason().is_none());
    }

    #[test]
    fn end_is_one_way() {
        let (mut session, mono) = make_session();

        assert!(session.end(SessionEndReason::UserRequested));
        assert_eq!(session.state(), SessionState::Ended);
        assert_eq!(session.end_reason(), Some(SessionEndReason::UserRequested));

        // Second end keeps the first reason
        assert!(!session.end(SessionEndReason::InactivityTimeout));
        assert_eq!(session.end_reason(), Some(SessionEndReason::UserRequested));

        // Touch after end does nothing
        let before = session.last_activity;
        session.touch(before + chrono::Duration::seconds(5), mono + Duration::from_secs(5));
        assert_eq!(session.last_activity, before);
    }

    #[test]
    fn touch_is_non_decreasing() {
        let (mut session, mono) = make_session();
        let later = mono + Duration::from_secs(30);

        session.touch(session.last_activity + chrono::Duration::seconds(30), later);
        let stamped = session.last_activity;

        session.touch(stamped - chrono::Duration::seconds(60), mono);
        assert_eq!(session.last_activity, stamped);
        assert_eq!(session.idle_for(later), Duration::ZERO);
    }

    #[test]
    fn remaining_time_saturates() {
        let (session, mono) = make_session();
        let limit = Duration::from_secs(60);

        assert_eq!(
            session.time_remaining(limit, mono + Duration::from_secs(20)),
            Duration::from_secs(40)
        );
        assert_eq!(
            session.time_remaining(limit, mono + Duration::from_secs(90)),
            Duration::ZERO
        );
    }

    #[test]
    fn info_lists_names_and_sizes_only() {
        let (mut session, _) = make_session();
        session.add_file(FileRecord::new(
            "a.txt".into(),
            3,
            PathBuf::from("/sessions/x/a.txt"),
        ));

        let info = session.info();
        assert_eq!(info.session_id, session.id);
        assert_eq!(info.files, vec![FileInfo { name: "a.txt".into(), size: 3 }]);
    }
}
