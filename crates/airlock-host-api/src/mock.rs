//! Mock host collaborators for testing

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::{DocumentScanner, HostError, HostResult, HostServices, Isolator, PrintSpooler};

/// Bytes written by the mock scanner
pub const MOCK_SCAN_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock scan";

/// Mock host for unit/integration testing.
///
/// Implements every collaborator trait. Failures are switched on per call kind.
#[derive(Default)]
pub struct MockHost {
    /// Configure isolation to fail
    pub fail_isolation: AtomicBool,

    /// Configure scanning to fail
    pub fail_scan: AtomicBool,

    /// Configure the spool sweep to fail
    pub fail_sweep: AtomicBool,

    isolated: Mutex<Vec<PathBuf>>,
    printed: Mutex<Vec<PathBuf>>,
    sweeps: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap one mock as every collaborator
    pub fn services(self: &Arc<Self>) -> HostServices {
        HostServices::new(self.clone(), self.clone(), self.clone())
    }

    pub fn set_fail_isolation(&self, fail: bool) {
        self.fail_isolation.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_scan(&self, fail: bool) {
        self.fail_scan.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sweep(&self, fail: bool) {
        self.fail_sweep.store(fail, Ordering::SeqCst);
    }

    /// Directories isolation was applied to
    pub fn isolated(&self) -> Vec<PathBuf> {
        self.isolated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Files submitted for printing
    pub fn printed(&self) -> Vec<PathBuf> {
        self.printed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sweep_count(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

impl Isolator for MockHost {
    fn apply_isolation(&self, dir: &Path) -> HostResult<()> {
        if self.fail_isolation.load(Ordering::SeqCst) {
            return Err(HostError::IsolationFailed("Mock isolation failure".into()));
        }
        self.isolated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dir.to_path_buf());
        Ok(())
    }
}

impl DocumentScanner for MockHost {
    fn scan(&self, destination: &Path) -> HostResult<()> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(HostError::ScanFailed("Mock scan failure".into()));
        }
        debug!(path = %destination.display(), "Mock scan");
        std::fs::write(destination, MOCK_SCAN_BYTES)?;
        Ok(())
    }
}

impl PrintSpooler for MockHost {
    fn print(&self, file: &Path) -> HostResult<()> {
        self.printed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file.to_path_buf());
        Ok(())
    }

    fn sweep(&self) -> HostResult<()> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.fail_sweep.load(Ordering::SeqCst) {
            return Err(HostError::PrintFailed("Mock sweep failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_calls() {
        let host = Arc::new(MockHost::new());
        let services = host.services();
        let dir = tempfile::tempdir().unwrap();

        services.isolator.apply_isolation(dir.path()).unwrap();
        assert_eq!(host.isolated(), vec![dir.path().to_path_buf()]);

        let page = dir.path().join("page.png");
        services.scanner.scan(&page).unwrap();
        assert_eq!(std::fs::read(&page).unwrap(), MOCK_SCAN_BYTES);
        assert_eq!(services.scanner.extension(), "png");

        services.printer.print(&page).unwrap();
        services.printer.sweep().unwrap();
        assert_eq!(host.printed(), vec![page]);
        assert_eq!(host.sweep_count(), 1);
    }

    #[test]
    fn mock_failures() {
        let host = MockHost::new();
        let dir = tempfile::tempdir().unwrap();

        host.set_fail_isolation(true);
        host.set_fail_scan(true);
        host.set_fail_sweep(true);

        assert!(host.apply_isolation(dir.path()).is_err());
        assert!(host.scan(&dir.path().join("x.png")).is_err());
        assert!(!dir.path().join("x.png").exists());
        assert!(host.sweep().is_err());
        assert!(host.isolated().is_empty());
    }
}
