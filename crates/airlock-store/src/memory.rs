//! In-memory audit sink (for testing)

use std::sync::{Mutex, PoisonError};

use crate::{format_line, AuditSink, StoreResult, NO_LOGS};

#[derive(Default)]
pub struct MemoryAuditLog {
    text: Mutex<String>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logged lines without their timestamps
    pub fn messages(&self) -> Vec<String> {
        let text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        text.lines()
            .map(|line| line.split_once("] ").map_or(line, |(_, m)| m).to_string())
            .collect()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, message: &str) -> StoreResult<()> {
        let mut text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        text.push_str(&format_line(&airlock_util::now(), message));
        Ok(())
    }

    fn read_all(&self) -> StoreResult<String> {
        let text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        if text.is_empty() {
            Ok(NO_LOGS.to_string())
        } else {
            Ok(text.clone())
        }
    }
}
