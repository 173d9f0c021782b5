//! Session lifecycle manager

use airlock_api::{
    FileInfo, ServiceStateSnapshot, SessionEndReason, SessionInfo, SessionState, API_VERSION,
};
use airlock_host_api::HostServices;
use airlock_store::{AuditEvent, AuditSink};
use airlock_util::{AirlockError, MonotonicInstant, Result, SessionId};
use airlock_wipe::{grant_owner_access, WipeEngine, WipeOutcome, DEFAULT_CHUNK_SIZE};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{create_unique, CoreEvent, FileRecord, Session, SessionObserver};

/// Manager settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Directory holding one subdirectory per session
    pub root: PathBuf,
    pub inactivity_timeout: Duration,
    /// Period of the inactivity check
    pub check_interval: Duration,
    /// Overwrite chunk size for the wipe
    pub chunk_size: usize,
}

impl SessionSettings {
    pub fn new(root: impl Into<PathBuf>, inactivity_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            inactivity_timeout,
            check_interval: Duration::from_secs(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// What one inactivity check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A transition held the lock; nothing checked
    Skipped,
    /// No active session
    Idle,
    /// Session still within the limit
    Remaining(Duration),
    /// Session ended for inactivity
    Expired,
}

/// Events and log changes gathered during a transition, published after
/// the lock is released
#[derive(Default)]
struct Outbox {
    events: Vec<CoreEvent>,
    log_changed: bool,
}

/// Owns the single current session and serializes every transition on it
pub struct SessionManager {
    settings: SessionSettings,
    wipe: WipeEngine,
    audit: Arc<dyn AuditSink>,
    host: HostServices,
    current: Mutex<Option<Session>>,
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
}

impl SessionManager {
    /// Prepare the sessions root and recover any orphan sessions left by a
    /// previous run. No session can start before recovery has finished.
    pub fn new(
        settings: SessionSettings,
        audit: Arc<dyn AuditSink>,
        host: HostServices,
    ) -> Result<Self> {
        fs::create_dir_all(&settings.root)?;
        host.isolator
            .apply_isolation(&settings.root)
            .map_err(|e| AirlockError::security_policy(e.to_string()))?;

        info!(
            root = %settings.root.display(),
            inactivity_timeout_secs = settings.inactivity_timeout.as_secs(),
            "Session manager initialized"
        );

        let manager = Self {
            wipe: WipeEngine::new(settings.chunk_size),
            settings,
            audit,
            host,
            current: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
        };

        manager.check_for_orphan_sessions();
        Ok(manager)
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn sessions_root(&self) -> &Path {
        &self.settings.root
    }

    /// Register an observer for all future events
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Start a new session. Fails if one is already active.
    pub fn start_new_session(&self) -> Result<SessionInfo> {
        self.transition(|current, outbox| self.start_locked(current, outbox))
    }

    /// End the current session and destroy its directory.
    ///
    /// Returns `None` when there is no active session.
    pub fn end_session(&self, reason: SessionEndReason) -> Option<WipeOutcome> {
        self.transition(|current, outbox| Ok(self.end_locked(current, outbox, reason)))
            .unwrap_or_default()
    }

    /// End any active session because the service is stopping
    pub fn shutdown(&self) -> Option<WipeOutcome> {
        info!("Session manager shutting down");
        self.end_session(SessionEndReason::ApplicationShutdown)
    }

    /// Refresh the activity timestamp. Returns false without an active session.
    pub fn notify_user_interaction(&self) -> bool {
        self.transition(|current, outbox| {
            let Some(session) = current.as_mut().filter(|s| s.is_active()) else {
                return Ok(false);
            };
            session.touch(airlock_util::now(), MonotonicInstant::now());
            outbox.events.push(CoreEvent::TimeRemainingChanged {
                remaining: self.settings.inactivity_timeout,
            });
            Ok(true)
        })
        .unwrap_or(false)
    }

    /// Copy a file into the session. The source is never moved or modified.
    pub fn import_file(&self, source: &Path) -> Result<FileInfo> {
        self.transition(|current, outbox| self.import_locked(current, outbox, source))
    }

    /// Scan one page into the session
    pub fn scan_document(&self) -> Result<FileInfo> {
        self.transition(|current, outbox| self.scan_locked(current, outbox))
    }

    /// Print a session file. The name must resolve inside the session directory.
    pub fn print_file(&self, name: &str) -> Result<()> {
        self.transition(|current, outbox| self.print_locked(current, outbox, name))
    }

    /// Files of the current session, or of the last one after it ended
    pub fn get_session_files(&self) -> Vec<FileInfo> {
        self.lock()
            .as_ref()
            .map(|s| s.files().iter().map(FileRecord::info).collect())
            .unwrap_or_default()
    }

    /// Full audit log text
    pub fn get_log(&self) -> Result<String> {
        self.audit
            .read_all()
            .map_err(|e| AirlockError::store(e.to_string()))
    }

    pub fn current_session(&self) -> Option<SessionInfo> {
        self.lock().as_ref().map(Session::info)
    }

    pub fn snapshot(&self) -> ServiceStateSnapshot {
        let current = self.lock();
        let now_mono = MonotonicInstant::now();

        ServiceStateSnapshot {
            api_version: API_VERSION,
            state: current
                .as_ref()
                .map(Session::state)
                .unwrap_or(SessionState::Inactive),
            session: current.as_ref().map(Session::info),
            time_remaining: current
                .as_ref()
                .filter(|s| s.is_active())
                .map(|s| s.time_remaining(self.settings.inactivity_timeout, now_mono)),
            inactivity_timeout: self.settings.inactivity_timeout,
        }
    }

    /// Run one inactivity check against the current monotonic time
    pub fn check_inactivity(&self) -> TickOutcome {
        self.tick(MonotonicInstant::now())
    }

    /// Run one inactivity check as of `now_mono`.
    ///
    /// Skips the tick entirely if a transition currently holds the lock.
    pub fn tick(&self, now_mono: MonotonicInstant) -> TickOutcome {
        let mut outbox = Outbox::default();

        let outcome = {
            let mut current = match self.current.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => {
                    debug!("Transition in progress, skipping inactivity tick");
                    return TickOutcome::Skipped;
                }
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            };

            let active = current
                .as_ref()
                .filter(|s| s.is_active())
                .map(|s| (s.id, s.idle_for(now_mono)));

            match active {
                None => TickOutcome::Idle,
                Some((session_id, idle)) => {
                    let limit = self.settings.inactivity_timeout;
                    if idle > limit {
                        info!(
                            session_id = %session_id,
                            idle_secs = idle.as_secs(),
                            "Inactivity limit exceeded"
                        );
                        self.end_locked(&mut current, &mut outbox, SessionEndReason::InactivityTimeout);
                        TickOutcome::Expired
                    } else {
                        let remaining = limit - idle;
                        outbox
                            .events
                            .push(CoreEvent::TimeRemainingChanged { remaining });
                        TickOutcome::Remaining(remaining)
                    }
                }
            }
        };

        self.publish(outbox);
        outcome
    }

    /// Wipe every directory found directly under the sessions root.
    /// Returns how many were recovered.
    fn check_for_orphan_sessions(&self) -> usize {
        let entries = match fs::read_dir(&self.settings.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.settings.root.display(), error = %e, "Failed to scan sessions root");
                return 0;
            }
        };

        let mut outbox = Outbox::default();
        let mut recovered = 0;

        for entry in entries.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                debug!(entry = ?entry.file_name(), "Ignoring non-directory in sessions root");
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            warn!(name = %name, "Orphan session found");
            self.record(&mut outbox, AuditEvent::OrphanFound { name: name.clone() });

            let outcome = self.destroy_directory(&path, &mut outbox);

            let reason = name.parse::<SessionId>().ok().and_then(|id| {
                let mut session =
                    Session::new(id, path, airlock_util::now(), MonotonicInstant::now());
                session.end(SessionEndReason::CrashRecovery);
                session.end_reason()
            });

            self.record(
                &mut outbox,
                AuditEvent::OrphanRecovered {
                    name,
                    reason,
                    message: outcome.message,
                },
            );
            recovered += 1;
        }

        if recovered > 0 {
            info!(recovered, "Orphan sessions recovered");
        }

        self.publish(outbox);
        recovered
    }

    fn start_locked(&self, current: &mut Option<Session>, outbox: &mut Outbox) -> Result<SessionInfo> {
        if current.as_ref().is_some_and(Session::is_active) {
            return Err(AirlockError::SessionAlreadyActive);
        }

        let id = SessionId::new();
        let path = self.settings.root.join(id.dir_name());

        fs::create_dir_all(&self.settings.root)?;
        fs::create_dir(&path)?;

        if let Err(e) = self.host.isolator.apply_isolation(&path) {
            error!(session_id = %id, error = %e, "Failed to isolate session directory");
            if let Err(cleanup) = fs::remove_dir_all(&path) {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove unisolated directory");
            }
            self.record(
                outbox,
                AuditEvent::SessionStartFailed {
                    error: e.to_string(),
                },
            );
            return Err(AirlockError::security_policy(e.to_string()));
        }

        let session = Session::new(id, path, airlock_util::now(), MonotonicInstant::now());
        let info = session.info();

        info!(session_id = %id, path = %session.path.display(), "Session started");
        self.record(outbox, AuditEvent::SessionStarted { session_id: id });

        outbox.events.push(CoreEvent::StateChanged {
            state: SessionState::Active,
            session_id: Some(id),
        });
        outbox.events.push(CoreEvent::TimeRemainingChanged {
            remaining: self.settings.inactivity_timeout,
        });

        *current = Some(session);
        Ok(info)
    }

    fn end_locked(
        &self,
        current: &mut Option<Session>,
        outbox: &mut Outbox,
        reason: SessionEndReason,
    ) -> Option<WipeOutcome> {
        let session = current.as_mut()?;
        if !session.end(reason) {
            return None;
        }

        let id = session.id;
        let path = session.path.clone();
        info!(session_id = %id, reason = %reason, "Ending session");

        if let Err(e) = self.host.printer.sweep() {
            warn!(error = %e, "Print spool cleanup failed");
            self.record(outbox, AuditEvent::SpoolSweepFailed { error: e.to_string() });
        }

        let outcome = self.destroy_directory(&path, outbox);

        self.record(outbox, AuditEvent::SessionEnded { session_id: id, reason });
        outbox.events.push(CoreEvent::StateChanged {
            state: SessionState::Ended,
            session_id: Some(id),
        });

        Some(outcome)
    }

    fn import_locked(
        &self,
        current: &mut Option<Session>,
        outbox: &mut Outbox,
        source: &Path,
    ) -> Result<FileInfo> {
        let session = active_session(current)?;

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AirlockError::invalid_input("source has no file name"))?;

        if !fs::metadata(source)?.is_file() {
            return Err(AirlockError::invalid_input(format!(
                "{} is not a regular file",
                source.display()
            )));
        }
        let mut input = File::open(source)?;

        let (name, path, mut output) = create_unique(&session.path, &name)?;
        let size = match copy_and_sync(&mut input, &mut output) {
            Ok(size) => size,
            Err(e) => {
                drop(output);
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
        };

        let record = FileRecord::new(name, size, path);
        let info = record.info();
        session.add_file(record);
        session.touch(airlock_util::now(), MonotonicInstant::now());

        info!(session_id = %session.id, size, "File imported");
        self.record(
            outbox,
            AuditEvent::FileImported {
                session_id: session.id,
                name: info.name.clone(),
                size,
            },
        );
        outbox.events.push(CoreEvent::TimeRemainingChanged {
            remaining: self.settings.inactivity_timeout,
        });

        Ok(info)
    }

    fn scan_locked(&self, current: &mut Option<Session>, outbox: &mut Outbox) -> Result<FileInfo> {
        let session = active_session(current)?;

        let wanted = format!(
            "Scan_{}.{}",
            airlock_util::format_file_stamp(&airlock_util::now()),
            self.host.scanner.extension()
        );
        let (name, path, placeholder) = create_unique(&session.path, &wanted)?;
        drop(placeholder);

        if let Err(e) = self.host.scanner.scan(&path) {
            let _ = fs::remove_file(&path);
            warn!(session_id = %session.id, error = %e, "Scan failed");
            return Err(AirlockError::host(e.to_string()));
        }

        let size = fs::metadata(&path)?.len();
        let record = FileRecord::new(name, size, path);
        let info = record.info();
        session.add_file(record);
        session.touch(airlock_util::now(), MonotonicInstant::now());

        info!(session_id = %session.id, size, "Document scanned");
        self.record(
            outbox,
            AuditEvent::DocumentScanned {
                session_id: session.id,
                name: info.name.clone(),
                size,
            },
        );
        outbox.events.push(CoreEvent::TimeRemainingChanged {
            remaining: self.settings.inactivity_timeout,
        });

        Ok(info)
    }

    fn print_locked(&self, current: &mut Option<Session>, outbox: &mut Outbox, name: &str) -> Result<()> {
        let session = active_session(current)?;
        let session_id = session.id;

        let resolved = match resolve_inside(&session.path, name) {
            Ok(path) => path,
            Err(Containment::Missing(e)) => {
                return Err(AirlockError::invalid_input(format!("{}: {}", name, e)));
            }
            Err(Containment::Outside) => {
                warn!(session_id = %session_id, name, "Print target outside session");
                self.record(
                    outbox,
                    AuditEvent::PrintDenied {
                        session_id,
                        name: name.to_string(),
                    },
                );
                return Err(AirlockError::unauthorized(format!(
                    "{} is outside the session",
                    name
                )));
            }
        };

        self.host
            .printer
            .print(&resolved)
            .map_err(|e| AirlockError::host(e.to_string()))?;

        session.touch(airlock_util::now(), MonotonicInstant::now());
        self.record(
            outbox,
            AuditEvent::FilePrinted {
                session_id,
                name: name.to_string(),
            },
        );
        outbox.events.push(CoreEvent::TimeRemainingChanged {
            remaining: self.settings.inactivity_timeout,
        });
        Ok(())
    }

    /// Wipe a session directory and make sure it is gone afterwards
    fn destroy_directory(&self, path: &Path, outbox: &mut Outbox) -> WipeOutcome {
        let target = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let outcome = self.wipe.wipe_session(path);

        for error in &outcome.errors {
            self.record(
                outbox,
                AuditEvent::WipeError {
                    target: target.clone(),
                    error: error.clone(),
                },
            );
        }
        self.record(
            outbox,
            AuditEvent::WipeCompleted {
                target: target.clone(),
                success: outcome.success,
                files_destroyed: outcome.files_destroyed,
                message: outcome.message.clone(),
            },
        );

        if fs::symlink_metadata(path).is_ok() {
            for (dir, e) in grant_owner_access(path) {
                debug!(dir = %dir.display(), error = %e, "Could not open up directory");
            }
            let error = fs::remove_dir_all(path).err().map(|e| e.to_string());
            match &error {
                None => warn!(target = %target, "Wipe left data behind, removed recursively"),
                Some(e) => error!(target = %target, error = %e, "Session directory could not be removed"),
            }
            self.record(outbox, AuditEvent::FallbackRemoval { target, error });
        }

        outcome
    }

    /// Run `f` with the lock held, then publish what it gathered
    fn transition<T>(
        &self,
        f: impl FnOnce(&mut Option<Session>, &mut Outbox) -> Result<T>,
    ) -> Result<T> {
        let mut outbox = Outbox::default();
        let result = {
            let mut current = self.lock();
            f(&mut current, &mut outbox)
        };
        self.publish(outbox);
        result
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, outbox: &mut Outbox, event: AuditEvent) {
        if let Err(e) = self.audit.record(&event) {
            warn!(error = %e, "Failed to write audit log");
        }
        outbox.log_changed = true;
    }

    fn publish(&self, mut outbox: Outbox) {
        if outbox.log_changed {
            match self.audit.read_all() {
                Ok(text) => outbox.events.push(CoreEvent::LogUpdated { text }),
                Err(e) => warn!(error = %e, "Failed to read audit log"),
            }
        }

        if outbox.events.is_empty() {
            return;
        }

        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for event in &outbox.events {
            for observer in &observers {
                observer.on_event(event);
            }
        }
    }
}

fn active_session(current: &mut Option<Session>) -> Result<&mut Session> {
    current
        .as_mut()
        .filter(|s| s.is_active())
        .ok_or(AirlockError::NoActiveSession)
}

fn copy_and_sync(input: &mut File, output: &mut File) -> io::Result<u64> {
    let size = io::copy(input, output)?;
    output.sync_all()?;
    Ok(size)
}

enum Containment {
    Outside,
    Missing(io::Error),
}

/// Resolve `name` against `dir`, following symlinks, and require the result
/// to be a file strictly inside `dir`
fn resolve_inside(dir: &Path, name: &str) -> std::result::Result<PathBuf, Containment> {
    let relative = Path::new(name);
    let plain = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(Containment::Outside);
    }

    let root = fs::canonicalize(dir).map_err(Containment::Missing)?;
    let resolved = fs::canonicalize(dir.join(relative)).map_err(Containment::Missing)?;

    if resolved != root && resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(Containment::Outside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlock_host_api::{MockHost, MOCK_SCAN_BYTES};
    use airlock_store::MemoryAuditLog;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(60);

    struct Fixture {
        dir: TempDir,
        root: PathBuf,
        audit: Arc<MemoryAuditLog>,
        host: Arc<MockHost>,
        events: Arc<Mutex<Vec<CoreEvent>>>,
        manager: SessionManager,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("sessions");
            Self::with_root(dir, root, Arc::new(MockHost::new()))
        }

        fn with_root(dir: TempDir, root: PathBuf, host: Arc<MockHost>) -> Self {
            let audit = Arc::new(MemoryAuditLog::new());
            let manager = SessionManager::new(
                SessionSettings::new(&root, TIMEOUT).with_chunk_size(4096),
                audit.clone(),
                host.services(),
            )
            .unwrap();

            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = events.clone();
            manager.subscribe(Arc::new(move |event: &CoreEvent| {
                sink.lock().unwrap().push(event.clone());
            }));

            Self {
                dir,
                root,
                audit,
                host,
                events,
                manager,
            }
        }

        fn source(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.dir.path().join("outside").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn session_dir(&self, info: &SessionInfo) -> PathBuf {
            self.root.join(info.session_id.dir_name())
        }

        fn state_changes(&self) -> Vec<SessionState> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    CoreEvent::StateChanged { state, .. } => Some(*state),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn start_creates_isolated_directory() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();

        let dir = fx.session_dir(&info);
        assert!(dir.is_dir());
        assert_eq!(info.state, SessionState::Active);
        assert_eq!(info.created_at, info.last_activity);
        assert!(fx.host.isolated().contains(&dir));

        assert_eq!(fx.state_changes(), vec![SessionState::Active]);
        assert!(fx
            .audit
            .messages()
            .contains(&format!("Session started: {}", info.session_id)));

        let snapshot = fx.manager.snapshot();
        assert_eq!(snapshot.state, SessionState::Active);
        assert!(snapshot.time_remaining.unwrap() <= TIMEOUT);
    }

    #[test]
    fn second_start_fails_and_keeps_first() {
        let fx = Fixture::new();
        let first = fx.manager.start_new_session().unwrap();

        let err = fx.manager.start_new_session().unwrap_err();
        assert!(matches!(err, AirlockError::SessionAlreadyActive));

        let current = fx.manager.current_session().unwrap();
        assert_eq!(current.session_id, first.session_id);
        assert_eq!(current.state, SessionState::Active);
        assert_eq!(fs::read_dir(&fx.root).unwrap().count(), 1);
    }

    #[test]
    fn isolation_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sessions");
        let host = Arc::new(MockHost::new());
        let fx = Fixture::with_root(dir, root, host.clone());

        host.set_fail_isolation(true);
        let err = fx.manager.start_new_session().unwrap_err();

        assert!(matches!(err, AirlockError::SecurityPolicy(_)));
        assert!(err.to_string().starts_with("Security policy enforcement failed"));
        assert_eq!(fs::read_dir(&fx.root).unwrap().count(), 0);
        assert!(fx.manager.current_session().is_none());
        assert!(fx
            .audit
            .messages()
            .iter()
            .any(|m| m.starts_with("Session start failed")));
    }

    #[test]
    fn end_destroys_directory_and_records_reason() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        let source = fx.source("notes.txt", b"private notes");
        fx.manager.import_file(&source).unwrap();

        let outcome = fx.manager.end_session(SessionEndReason::UserRequested).unwrap();

        assert!(outcome.success, "errors: {:?}", outcome.errors);
        assert_eq!(outcome.files_destroyed, 1);
        assert!(!fx.session_dir(&info).exists());
        assert_eq!(fx.host.sweep_count(), 1);

        let current = fx.manager.current_session().unwrap();
        assert_eq!(current.state, SessionState::Ended);
        assert_eq!(current.end_reason, Some(SessionEndReason::UserRequested));
        assert_eq!(
            fx.state_changes(),
            vec![SessionState::Active, SessionState::Ended]
        );

        let messages = fx.audit.messages();
        assert!(messages.iter().any(|m| m.starts_with("Wipe complete for")));
        assert_eq!(
            messages.last().unwrap(),
            &format!("Session ended: {} (reason: UserRequested)", info.session_id)
        );
    }

    #[test]
    fn end_without_active_session_is_noop() {
        let fx = Fixture::new();
        assert!(fx.manager.end_session(SessionEndReason::UserRequested).is_none());

        fx.manager.start_new_session().unwrap();
        assert!(fx.manager.end_session(SessionEndReason::UserRequested).is_some());
        assert!(fx.manager.end_session(SessionEndReason::UserRequested).is_none());
        assert_eq!(fx.host.sweep_count(), 1);
    }

    #[test]
    fn sweep_failure_does_not_stop_the_wipe() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        fx.host.set_fail_sweep(true);

        fx.manager.end_session(SessionEndReason::UserRequested).unwrap();

        assert!(!fx.session_dir(&info).exists());
        assert!(fx
            .audit
            .messages()
            .iter()
            .any(|m| m.starts_with("Print spool cleanup failed")));
    }

    #[test]
    fn restart_mints_new_session() {
        let fx = Fixture::new();
        let first = fx.manager.start_new_session().unwrap();
        fx.manager.end_session(SessionEndReason::UserRequested);

        let second = fx.manager.start_new_session().unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert!(fx.session_dir(&second).is_dir());
        assert!(fx.manager.get_session_files().is_empty());
    }

    #[test]
    fn import_copies_and_disambiguates() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();

        let source = fx.source("report.pdf", b"quarterly numbers");
        let first = fx.manager.import_file(&source).unwrap();
        let second = fx.manager.import_file(&source).unwrap();

        // Copied, not moved
        assert_eq!(fs::read(&source).unwrap(), b"quarterly numbers");

        assert_eq!(first.name, "report.pdf");
        assert_eq!(first.size, 17);
        assert_ne!(second.name, first.name);
        assert!(second.name.starts_with("report_") && second.name.ends_with(".pdf"));

        let current = fx.manager.lock();
        let files = current.as_ref().unwrap().files();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0].path(), files[1].path());
        for file in files {
            assert!(file.path().starts_with(fx.session_dir(&info)));
            assert_eq!(fs::read(file.path()).unwrap(), b"quarterly numbers");
        }
    }

    #[test]
    fn import_requires_active_session() {
        let fx = Fixture::new();
        let source = fx.source("a.txt", b"a");

        let err = fx.manager.import_file(&source).unwrap_err();
        assert!(matches!(err, AirlockError::NoActiveSession));
        assert_eq!(fs::read_dir(&fx.root).unwrap().count(), 0);
    }

    #[test]
    fn import_rejects_directories_and_missing_sources() {
        let fx = Fixture::new();
        fx.manager.start_new_session().unwrap();

        let err = fx.manager.import_file(fx.dir.path()).unwrap_err();
        assert!(matches!(err, AirlockError::InvalidInput(_)));

        let err = fx
            .manager
            .import_file(&fx.dir.path().join("missing.txt"))
            .unwrap_err();
        assert!(matches!(err, AirlockError::Io(_)));
        assert!(fx.manager.get_session_files().is_empty());
    }

    #[test]
    fn interaction_refreshes_only_active_sessions() {
        let fx = Fixture::new();
        assert!(!fx.manager.notify_user_interaction());

        let info = fx.manager.start_new_session().unwrap();
        assert!(fx.manager.notify_user_interaction());
        let after = fx.manager.current_session().unwrap();
        assert!(after.last_activity >= info.last_activity);

        fx.manager.end_session(SessionEndReason::UserRequested);
        assert!(!fx.manager.notify_user_interaction());
    }

    #[test]
    fn orphans_are_wiped_during_construction() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sessions");
        let orphan_id = SessionId::new();
        let orphan = root.join(orphan_id.dir_name());
        fs::create_dir_all(orphan.join("sub")).unwrap();
        fs::write(orphan.join("a.txt"), b"left behind").unwrap();
        fs::write(orphan.join("sub").join("b.txt"), b"also left").unwrap();
        fs::create_dir_all(root.join("not-a-uuid")).unwrap();

        let fx = Fixture::with_root(dir, root, Arc::new(MockHost::new()));

        assert!(!orphan.exists());
        assert!(!fx.root.join("not-a-uuid").exists());
        assert!(fx.manager.current_session().is_none());

        let messages = fx.audit.messages();
        let name = orphan_id.to_string();
        assert!(messages.contains(&format!("Orphan session found: {}", name)));
        assert!(messages
            .iter()
            .any(|m| m.starts_with(&format!("Orphan session recovered: {}", name))));
        assert!(!messages.iter().any(|m| m.starts_with("Session ended")));
    }

    #[test]
    fn tick_past_limit_ends_session() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        let now = MonotonicInstant::now();

        match fx.manager.tick(now) {
            TickOutcome::Remaining(remaining) => assert!(remaining <= TIMEOUT),
            other => panic!("unexpected tick outcome: {:?}", other),
        }

        let outcome = fx.manager.tick(now + TIMEOUT + Duration::from_secs(1));
        assert_eq!(outcome, TickOutcome::Expired);

        let current = fx.manager.current_session().unwrap();
        assert_eq!(current.state, SessionState::Ended);
        assert_eq!(current.end_reason, Some(SessionEndReason::InactivityTimeout));
        assert!(!fx.session_dir(&info).exists());

        assert_eq!(fx.manager.tick(now + TIMEOUT * 2), TickOutcome::Idle);
    }

    #[test]
    fn tick_skips_while_transition_holds_lock() {
        let fx = Fixture::new();
        fx.manager.start_new_session().unwrap();

        let guard = fx.manager.lock();
        let outcome = fx
            .manager
            .tick(MonotonicInstant::now() + TIMEOUT * 2);
        assert_eq!(outcome, TickOutcome::Skipped);
        drop(guard);

        assert!(fx.manager.current_session().unwrap().state == SessionState::Active);
    }

    #[test]
    fn print_inside_session() {
        let fx = Fixture::new();
        fx.manager.start_new_session().unwrap();
        let file = fx.manager.import_file(&fx.source("a.pdf", b"%PDF")).unwrap();

        fx.manager.print_file(&file.name).unwrap();

        let printed = fx.host.printed();
        assert_eq!(printed.len(), 1);
        assert!(printed[0].ends_with("a.pdf"));
        assert!(fx
            .audit
            .messages()
            .contains(&"File sent to printer: a.pdf".to_string()));
    }

    #[test]
    fn print_outside_session_is_unauthorized() {
        let fx = Fixture::new();
        fx.manager.start_new_session().unwrap();
        let secret = fx.source("secret.txt", b"outside");

        for name in ["../../outside/secret.txt", secret.to_str().unwrap(), ""] {
            let err = fx.manager.print_file(name).unwrap_err();
            assert!(matches!(err, AirlockError::Unauthorized(_)), "{}", name);
        }

        assert!(fx.host.printed().is_empty());
        assert!(fx
            .audit
            .messages()
            .iter()
            .any(|m| m.starts_with("Print denied")));
    }

    #[cfg(unix)]
    #[test]
    fn print_through_symlink_is_unauthorized() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        let secret = fx.source("secret.txt", b"outside");
        std::os::unix::fs::symlink(&secret, fx.session_dir(&info).join("link.txt")).unwrap();

        let err = fx.manager.print_file("link.txt").unwrap_err();
        assert!(matches!(err, AirlockError::Unauthorized(_)));
        assert!(fx.host.printed().is_empty());
    }

    #[test]
    fn print_requires_active_session() {
        let fx = Fixture::new();
        let err = fx.manager.print_file("a.pdf").unwrap_err();
        assert!(matches!(err, AirlockError::NoActiveSession));
    }

    #[test]
    fn scan_adds_file() {
        let fx = Fixture::new();
        let err = fx.manager.scan_document().unwrap_err();
        assert!(matches!(err, AirlockError::NoActiveSession));

        fx.manager.start_new_session().unwrap();
        let scanned = fx.manager.scan_document().unwrap();

        assert!(scanned.name.starts_with("Scan_") && scanned.name.ends_with(".png"));
        assert_eq!(scanned.size, MOCK_SCAN_BYTES.len() as u64);
        assert_eq!(fx.manager.get_session_files(), vec![scanned]);
    }

    #[test]
    fn failed_scan_leaves_no_file() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        fx.host.set_fail_scan(true);

        let err = fx.manager.scan_document().unwrap_err();
        assert!(matches!(err, AirlockError::HostError(_)));
        assert_eq!(fs::read_dir(fx.session_dir(&info)).unwrap().count(), 0);
        assert!(fx.manager.get_session_files().is_empty());
    }

    #[test]
    fn files_are_frozen_after_end() {
        let fx = Fixture::new();
        assert!(fx.manager.get_session_files().is_empty());

        fx.manager.start_new_session().unwrap();
        fx.manager.import_file(&fx.source("a.txt", b"abc")).unwrap();
        fx.manager.end_session(SessionEndReason::UserRequested);

        assert_eq!(
            fx.manager.get_session_files(),
            vec![FileInfo {
                name: "a.txt".into(),
                size: 3
            }]
        );
    }

    #[test]
    fn shutdown_ends_with_application_shutdown() {
        let fx = Fixture::new();
        fx.manager.start_new_session().unwrap();
        fx.manager.shutdown().unwrap();

        assert_eq!(
            fx.manager.current_session().unwrap().end_reason,
            Some(SessionEndReason::ApplicationShutdown)
        );
    }

    #[test]
    fn log_updates_carry_full_text() {
        let fx = Fixture::new();
        assert_eq!(fx.manager.get_log().unwrap(), airlock_store::NO_LOGS);

        fx.manager.start_new_session().unwrap();

        let last_log = fx
            .events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|e| match e {
                CoreEvent::LogUpdated { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_log, fx.manager.get_log().unwrap());
        assert!(last_log.contains("Session started"));
    }

    #[test]
    fn observers_run_without_the_lock() {
        let fx = Fixture::new();
        let manager = Arc::new(fx.manager);
        let weak = Arc::downgrade(&manager);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        manager.subscribe(Arc::new(move |_: &CoreEvent| {
            // Re-entering the manager would deadlock if the lock were held
            if let Some(manager) = weak.upgrade() {
                sink.lock().unwrap().push(manager.snapshot().state);
            }
        }));

        manager.start_new_session().unwrap();
        assert!(!seen.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn locked_down_orphan_is_removed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sessions");
        let orphan = root.join(SessionId::new().dir_name());
        fs::create_dir_all(orphan.join("readonly")).unwrap();
        fs::create_dir_all(orphan.join("sealed")).unwrap();
        fs::write(orphan.join("readonly").join("a.txt"), b"a").unwrap();
        fs::write(orphan.join("sealed").join("b.txt"), b"b").unwrap();
        fs::set_permissions(orphan.join("readonly"), fs::Permissions::from_mode(0o500)).unwrap();
        fs::set_permissions(orphan.join("sealed"), fs::Permissions::from_mode(0o000)).unwrap();

        let fx = Fixture::with_root(dir, root, Arc::new(MockHost::new()));

        assert!(!orphan.exists());
        let messages = fx.audit.messages();
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Wipe complete for") && m.contains("2 files destroyed")));
        assert!(!messages.iter().any(|m| m.starts_with("Leftovers of")));
    }

    #[cfg(unix)]
    #[test]
    fn hard_link_into_session_leaves_outside_content() {
        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        let outside = fx.source("shared.txt", b"not session data");
        fs::hard_link(&outside, fx.session_dir(&info).join("shared.txt")).unwrap();

        let outcome = fx.manager.end_session(SessionEndReason::UserRequested).unwrap();

        assert!(!outcome.success);
        assert!(!fx.session_dir(&info).exists());
        assert_eq!(fs::read(&outside).unwrap(), b"not session data");
        assert!(fx
            .audit
            .messages()
            .iter()
            .any(|m| m.starts_with("Wipe error in") && m.contains("overwrite skipped")));
    }

    #[cfg(unix)]
    #[test]
    fn directory_is_gone_even_when_wipe_fails() {
        use nix::fcntl::{Flock, FlockArg};

        let fx = Fixture::new();
        let info = fx.manager.start_new_session().unwrap();
        let file = fx.manager.import_file(&fx.source("busy.txt", b"in use")).unwrap();

        let held = File::open(fx.session_dir(&info).join(&file.name)).unwrap();
        let _held = Flock::lock(held, FlockArg::LockExclusiveNonblock).unwrap();

        let outcome = fx.manager.end_session(SessionEndReason::UserRequested).unwrap();

        assert!(!outcome.success);
        assert!(!fx.session_dir(&info).exists());

        let messages = fx.audit.messages();
        assert!(messages.iter().any(|m| m.starts_with("Wipe incomplete for")));
        assert!(messages.iter().any(|m| m.starts_with("Wipe error in")));
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Leftovers of") && m.ends_with("removed recursively")));
    }
}
