//! Scanning through SANE

use std::path::Path;
use tracing::info;

use airlock_host_api::{DocumentScanner, HostError, HostResult};

/// Acquires a page with `scanimage`
#[derive(Debug, Clone)]
pub struct ScanimageScanner {
    device: Option<String>,
    format: String,
    extension: String,
}

impl ScanimageScanner {
    /// `format` is passed to `--format`; `extension` names the output file
    pub fn new(
        device: Option<String>,
        format: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            device,
            format: format.into(),
            extension: extension.into(),
        }
    }

    fn args(&self, destination: &Path) -> Vec<String> {
        let mut args = vec![
            format!("--format={}", self.format),
            "-o".to_string(),
            destination.to_string_lossy().into_owned(),
        ];
        if let Some(device) = &self.device {
            args.push("-d".to_string());
            args.push(device.clone());
        }
        args
    }
}

impl DocumentScanner for ScanimageScanner {
    fn scan(&self, destination: &Path) -> HostResult<()> {
        let result = crate::run_helper("scanimage", self.args(destination), HostError::ScanFailed);
        if result.is_err() {
            // scanimage may leave a truncated image behind
            let _ = std::fs::remove_file(destination);
            return result;
        }
        info!(device = ?self.device, "Page scanned");
        Ok(())
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}
