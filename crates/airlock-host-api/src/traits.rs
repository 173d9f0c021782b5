//! Host collaborator traits

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from host collaborators
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Isolation failed: {0}")]
    IsolationFailed(String),

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Print failed: {0}")]
    PrintFailed(String),

    #[error("Command not available: {0}")]
    CommandUnavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Restricts a freshly created directory to the invoking user and the
/// administrative identity, severing anything inherited from its parent.
pub trait Isolator: Send + Sync {
    fn apply_isolation(&self, dir: &Path) -> HostResult<()>;
}

/// Acquires one page from a scanner
pub trait DocumentScanner: Send + Sync {
    /// Write the scanned image to `destination`, which does not exist yet
    fn scan(&self, destination: &Path) -> HostResult<()>;

    /// File extension of the images produced, without the dot
    fn extension(&self) -> &str {
        "png"
    }
}

/// Submits files to the system print queue
pub trait PrintSpooler: Send + Sync {
    fn print(&self, file: &Path) -> HostResult<()>;

    /// Cancel pending jobs submitted by this user.
    /// Spool copies may outlive the session directory otherwise.
    fn sweep(&self) -> HostResult<()>;
}

/// Bundle of collaborators handed to the session manager
#[derive(Clone)]
pub struct HostServices {
    pub isolator: Arc<dyn Isolator>,
    pub scanner: Arc<dyn DocumentScanner>,
    pub printer: Arc<dyn PrintSpooler>,
}

impl HostServices {
    pub fn new(
        isolator: Arc<dyn Isolator>,
        scanner: Arc<dyn DocumentScanner>,
        printer: Arc<dyn PrintSpooler>,
    ) -> Self {
        Self {
            isolator,
            scanner,
            printer,
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
