//! Owner-only access isolation

use nix::unistd::geteuid;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use tracing::{debug, warn};

use airlock_host_api::{HostError, HostResult, Isolator};

/// Mode applied to session directories
pub const ISOLATED_MODE: u32 = 0o700;

/// Unix isolation: the directory must belong to the effective user and end up
/// with mode 0700. Root keeps access as the administrative identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixIsolator;

impl UnixIsolator {
    pub fn new() -> Self {
        Self
    }
}

impl Isolator for UnixIsolator {
    fn apply_isolation(&self, dir: &Path) -> HostResult<()> {
        let metadata = fs::symlink_metadata(dir)?;
        if !metadata.is_dir() {
            return Err(HostError::IsolationFailed(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let euid = geteuid().as_raw();
        if metadata.uid() != euid {
            warn!(path = %dir.display(), owner = metadata.uid(), euid, "Session directory owned by another user");
            return Err(HostError::IsolationFailed(format!(
                "{} is owned by uid {}, expected {}",
                dir.display(),
                metadata.uid(),
                euid
            )));
        }

        // An exact mode drops setgid/sticky and resets the ACL mask, so
        // entries inherited from a default ACL grant nothing.
        fs::set_permissions(dir, fs::Permissions::from_mode(ISOLATED_MODE))?;

        let mode = fs::metadata(dir)?.permissions().mode() & 0o7777;
        if mode != ISOLATED_MODE {
            return Err(HostError::IsolationFailed(format!(
                "{} has mode {:o} after isolation",
                dir.display(),
                mode
            )));
        }

        debug!(path = %dir.display(), "Isolation applied");
        Ok(())
    }
}
