//! Periodic inactivity enforcement

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::{SessionManager, TickOutcome};

/// Run the inactivity check every `check_interval` on the blocking pool.
///
/// The task runs until aborted.
pub fn spawn_inactivity_watch(manager: Arc<SessionManager>) -> JoinHandle<()> {
    let period = manager.settings().check_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let manager = manager.clone();
            match tokio::task::spawn_blocking(move || manager.check_inactivity()).await {
                Ok(TickOutcome::Expired) => debug!("Inactivity watch ended a session"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Inactivity check panicked"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionSettings;
    use airlock_api::{SessionEndReason, SessionState};
    use airlock_host_api::MockHost;
    use airlock_store::MemoryAuditLog;
    use std::time::Duration;

    #[tokio::test]
    async fn watch_ends_idle_session() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SessionSettings::new(dir.path().join("sessions"), Duration::from_millis(200))
            .with_check_interval(Duration::from_millis(50));
        let manager = Arc::new(
            SessionManager::new(
                settings,
                Arc::new(MemoryAuditLog::new()),
                Arc::new(MockHost::new()).services(),
            )
            .unwrap(),
        );

        let info = manager.start_new_session().unwrap();
        let handle = spawn_inactivity_watch(manager.clone());

        let mut ended = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if manager.snapshot().state == SessionState::Ended {
                ended = true;
                break;
            }
        }
        handle.abort();

        assert!(ended, "session was not ended by the watch");
        let current = manager.current_session().unwrap();
        assert_eq!(current.end_reason, Some(SessionEndReason::InactivityTimeout));
        assert!(!dir.path().join("sessions").join(info.session_id.dir_name()).exists());
    }
}
