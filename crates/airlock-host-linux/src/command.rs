//! Running external helper programs

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use tracing::debug;

use airlock_host_api::{HostError, HostResult};

/// Run a helper to completion with a minimal environment.
///
/// A missing program maps to `CommandUnavailable`; a non-zero exit maps
/// through `on_failure` with the trimmed stderr.
pub fn run_helper<I, S>(
    program: &str,
    args: I,
    on_failure: fn(String) -> HostError,
) -> HostResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);

    cmd.env_clear();
    for key in ["PATH", "HOME", "LANG", "CUPS_SERVER", "SANE_CONFIG_DIR"] {
        if let Ok(value) = std::env::var(key) {
            cmd.env(key, value);
        }
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());

    let output = cmd.output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            HostError::CommandUnavailable(program.to_string())
        } else {
            HostError::Io(e)
        }
    })?;

    debug!(program, status = ?output.status, "Helper finished");

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("{} exited with {}", program, output.status)
        } else {
            format!("{}: {}", program, stderr)
        };
        Err(on_failure(detail))
    }
}
