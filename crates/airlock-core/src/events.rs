//! Events published by the session manager

use airlock_api::{EventPayload, SessionState};
use airlock_util::SessionId;
use std::time::Duration;

/// Events emitted by the session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Lifecycle state changed
    StateChanged {
        state: SessionState,
        session_id: Option<SessionId>,
    },

    /// Time left before the inactivity limit ends the session
    TimeRemainingChanged { remaining: Duration },

    /// The audit log changed; carries its full text
    LogUpdated { text: String },
}

impl From<CoreEvent> for EventPayload {
    fn from(event: CoreEvent) -> Self {
        match event {
            CoreEvent::StateChanged { state, session_id } => {
                EventPayload::StateChanged { state, session_id }
            }
            CoreEvent::TimeRemainingChanged { remaining } => {
                EventPayload::TimeRemainingChanged { remaining }
            }
            CoreEvent::LogUpdated { text } => EventPayload::LogUpdated { text },
        }
    }
}

/// Receives manager events.
///
/// Called after the manager lock is released, on whichever thread ran the
/// transition. Implementations must not assume a particular thread.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &CoreEvent);
}

impl<F> SessionObserver for F
where
    F: Fn(&CoreEvent) + Send + Sync,
{
    fn on_event(&self, event: &CoreEvent) {
        self(event)
    }
}
