//! Event types for airlockd -> client streaming

use airlock_util::SessionId;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{SessionState, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: airlock_util::now(),
            payload,
        }
    }
}

/// The three observer channels of the shell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Lifecycle state changed
    StateChanged {
        state: SessionState,
        session_id: Option<SessionId>,
    },

    /// Remaining time before automatic termination
    TimeRemainingChanged { remaining: Duration },

    /// Audit log changed; carries the full current text
    LogUpdated { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::TimeRemainingChanged {
            remaining: Duration::from_secs(42),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("time_remaining_changed"));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.payload,
            EventPayload::TimeRemainingChanged { remaining } if remaining == Duration::from_secs(42)
        ));
    }
}
