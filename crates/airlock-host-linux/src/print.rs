//! Printing through CUPS

use std::path::Path;
use tracing::info;

use airlock_host_api::{HostError, HostResult, PrintSpooler};

use crate::run_helper;

/// Submits jobs with `lp` and clears them with `cancel -a`
#[derive(Debug, Default, Clone)]
pub struct LpPrintSpooler {
    printer: Option<String>,
}

impl LpPrintSpooler {
    /// `None` uses the system default queue
    pub fn new(printer: Option<String>) -> Self {
        Self { printer }
    }

    fn print_args(&self, file: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(printer) = &self.printer {
            args.push("-d".to_string());
            args.push(printer.clone());
        }
        args.push("--".to_string());
        args.push(file.to_string_lossy().into_owned());
        args
    }

    fn sweep_args(&self) -> Vec<String> {
        let mut args = vec!["-a".to_string()];
        if let Some(printer) = &self.printer {
            args.push(printer.clone());
        }
        args
    }
}

impl PrintSpooler for LpPrintSpooler {
    fn print(&self, file: &Path) -> HostResult<()> {
        run_helper("lp", self.print_args(file), HostError::PrintFailed)?;
        info!(printer = ?self.printer, "Print job submitted");
        Ok(())
    }

    fn sweep(&self) -> HostResult<()> {
        run_helper("cancel", self.sweep_args(), HostError::PrintFailed)
    }
}
