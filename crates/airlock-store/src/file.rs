//! File-backed audit log

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::{format_line, AuditSink, StoreError, StoreResult, NO_LOGS};

/// Single append-only text file, one event per line
pub struct FileAuditLog {
    path: PathBuf,
    // Serializes appends and reads so a reader never sees half a line
    lock: Mutex<()>,
}

impl FileAuditLog {
    /// Open (or prepare) the log at the given path.
    /// The parent directory is created; the file itself is created on first append.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!(path = %path.display(), "Audit log ready");

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, message: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(format_line(&airlock_util::now(), message).as_bytes())?;
        Ok(())
    }

    fn read_all(&self) -> StoreResult<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(NO_LOGS.to_string()),
            Ok(bytes) => String::from_utf8(bytes).map_err(|_| StoreError::Encoding),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(NO_LOGS.to_string()),
            Err(e) => Err(e.into()),
        }
    }
}
