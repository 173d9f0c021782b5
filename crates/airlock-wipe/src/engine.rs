//! Wipe engine

use rand::RngCore;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::obfuscated_sibling;

/// Default overwrite chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Message of the outcome for a path that does not exist
pub const ALREADY_REMOVED: &str = "already removed";

/// Prefix of the error entry raised when the root directory survives
pub const CRITICAL_PREFIX: &str = "critical";

/// Result of wiping one session directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeOutcome {
    /// Every file destroyed and the root directory removed
    pub success: bool,
    pub files_destroyed: usize,
    /// One entry per failed item, in processing order
    pub errors: Vec<String>,
    /// Human-readable summary
    pub message: String,
}

impl WipeOutcome {
    fn already_removed() -> Self {
        Self {
            success: true,
            files_destroyed: 0,
            errors: Vec::new(),
            message: ALREADY_REMOVED.to_string(),
        }
    }

    /// Whether the root directory itself could not be removed
    pub fn has_critical_error(&self) -> bool {
        self.errors.iter().any(|e| e.starts_with(CRITICAL_PREFIX))
    }
}

/// Step of the per-file destruction sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeStep {
    ClearAttributes,
    Overwrite,
    Rename,
    Delete,
}

impl fmt::Display for WipeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WipeStep::ClearAttributes => "clearing attributes",
            WipeStep::Overwrite => "overwrite",
            WipeStep::Rename => "rename",
            WipeStep::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Failure of one step for one file
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct WipeError {
    pub step: WipeStep,
    #[source]
    pub source: io::Error,
}

impl WipeError {
    fn at(step: WipeStep) -> impl FnOnce(io::Error) -> WipeError {
        move |source| WipeError { step, source }
    }
}

/// Destroys directory trees.
///
/// A single random pass: enough to defeat undelete tools while keeping
/// latency bounded for interactive use. Callers needing multiple passes
/// wrap [`overwrite_file`].
#[derive(Debug, Clone)]
pub struct WipeEngine {
    chunk_size: usize,
}

impl Default for WipeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

struct Discovered {
    files: Vec<(PathBuf, bool)>,
    dirs: Vec<PathBuf>,
}

/// What happened to one file
enum Disposal {
    Destroyed,
    /// The inode has other names, possibly outside the tree: its content
    /// was left alone and only this name was removed
    Unlinked { other_links: u64 },
}

impl WipeEngine {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Wipe everything under `session_path`, then the directory itself.
    ///
    /// Never fails: problems are reported in the outcome and the pass goes on.
    pub fn wipe_session(&self, session_path: &Path) -> WipeOutcome {
        match fs::symlink_metadata(session_path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %session_path.display(), "Nothing to wipe");
                return WipeOutcome::already_removed();
            }
            _ => {}
        }

        let mut errors = Vec::new();

        for (dir, e) in grant_owner_access(session_path) {
            let name = display_name(&dir);
            warn!(dir = %name, error = %e, "Failed to open up directory");
            errors.push(format!("{}: {} failed: {}", name, WipeStep::ClearAttributes, e));
        }

        let discovered = discover(session_path, &mut errors);
        let mut files_destroyed = 0;

        for (path, is_symlink) in &discovered.files {
            match self.destroy_file(path, *is_symlink) {
                Ok(Disposal::Destroyed) => files_destroyed += 1,
                Ok(Disposal::Unlinked { other_links }) => {
                    let name = display_name(path);
                    warn!(file = %name, other_links, "Hard-linked file unlinked without overwrite");
                    errors.push(format!(
                        "{}: overwrite skipped: content shared with {} other hard link(s)",
                        name, other_links
                    ));
                }
                Err(e) => {
                    let name = display_name(path);
                    warn!(file = %name, error = %e, "Failed to wipe file");
                    errors.push(format!("{}: {}", name, e));
                }
            }
        }

        for dir in removal_order(discovered.dirs) {
            if let Err(e) = fs::remove_dir(&dir) {
                let name = display_name(&dir);
                warn!(dir = %name, error = %e, "Failed to remove directory");
                errors.push(format!("{}: directory removal failed: {}", name, e));
            }
        }

        if let Err(e) = fs::remove_dir(session_path) {
            warn!(path = %session_path.display(), error = %e, "Failed to remove session directory");
            errors.push(format!(
                "{}: failed to remove session directory: {}",
                CRITICAL_PREFIX, e
            ));
        }

        let success = errors.is_empty();
        let message = if success {
            format!("Wiped {} files", files_destroyed)
        } else {
            format!("Wiped {} files with {} errors", files_destroyed, errors.len())
        };

        info!(
            path = %session_path.display(),
            files_destroyed,
            error_count = errors.len(),
            success,
            "Wipe finished"
        );

        WipeOutcome {
            success,
            files_destroyed,
            errors,
            message,
        }
    }

    /// Clear attributes, overwrite, rename, delete.
    /// Symbolic links and files with other hard links are unlinked without
    /// touching the content they point at.
    fn destroy_file(&self, path: &Path, is_symlink: bool) -> Result<Disposal, WipeError> {
        let disposal = if is_symlink {
            Disposal::Destroyed
        } else {
            let links = link_count(path).map_err(WipeError::at(WipeStep::ClearAttributes))?;
            if links > 1 {
                Disposal::Unlinked {
                    other_links: links - 1,
                }
            } else {
                clear_readonly(path).map_err(WipeError::at(WipeStep::ClearAttributes))?;
                overwrite_file(path, self.chunk_size)
                    .map_err(WipeError::at(WipeStep::Overwrite))?;
                Disposal::Destroyed
            }
        };

        let renamed = obfuscated_sibling(path);
        fs::rename(path, &renamed).map_err(WipeError::at(WipeStep::Rename))?;
        fs::remove_file(&renamed).map_err(WipeError::at(WipeStep::Delete))?;
        Ok(disposal)
    }
}

/// Overwrite the whole length of a file with CSPRNG bytes, chunk by chunk,
/// and flush it to durable storage. Returns the number of bytes written.
pub fn overwrite_file(path: &Path, chunk_size: usize) -> io::Result<u64> {
    let file = OpenOptions::new().write(true).open(path)?;
    let mut file = lock_exclusive(file)?;
    let len = file.metadata()?.len();

    // ThreadRng is a ChaCha-based CSPRNG seeded from the OS
    let mut rng = rand::thread_rng();
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut remaining = len;

    file.seek(SeekFrom::Start(0))?;
    while remaining > 0 {
        let n = remaining.min(buf.len() as u64) as usize;
        rng.fill_bytes(&mut buf[..n]);
        file.write_all(&buf[..n])?;
        remaining -= n as u64;
    }

    file.flush()?;
    file.sync_all()?;
    Ok(len)
}

/// Give the owner full access to `root` and every directory below it so
/// their entries can be listed, renamed and removed. Links are not followed
/// and a `root` that is not a directory is left alone.
///
/// Returns the directories whose mode could not be changed. Listing errors
/// are not reported here; the traversal that follows runs into them again.
pub fn grant_owner_access(root: &Path) -> Vec<(PathBuf, io::Error)> {
    let mut failures = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        match open_directory(&dir) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                failures.push((dir, e));
                continue;
            }
        }

        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                pending.push(entry.path());
            }
        }
    }

    failures
}

/// Sort directories so that each one comes after all of its descendants
pub fn removal_order(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()));
    dirs
}

fn discover(root: &Path, errors: &mut Vec<String>) -> Discovered {
    let mut discovered = Discovered {
        files: Vec::new(),
        dirs: Vec::new(),
    };

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .follow_root_links(false);

    for entry in walker {
        match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                if file_type.is_dir() {
                    discovered.dirs.push(entry.into_path());
                } else {
                    discovered
                        .files
                        .push((entry.into_path(), file_type.is_symlink()));
                }
            }
            Err(e) => {
                let name = e.path().map(display_name).unwrap_or_default();
                warn!(entry = %name, error = %e, "Failed to enumerate entry");
                errors.push(format!("{}: enumeration failed: {}", name, e));
            }
        }
    }

    discovered
}

#[cfg(unix)]
fn clear_readonly(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    if mode & 0o600 != 0o600 {
        perms.set_mode(mode | 0o600);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Add owner rwx to a real directory. Returns false for anything else.
#[cfg(unix)]
fn open_directory(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(false);
    }
    let mode = metadata.permissions().mode() & 0o7777;
    if mode & 0o700 != 0o700 {
        fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o700))?;
    }
    Ok(true)
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn open_directory(path: &Path) -> io::Result<bool> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(false);
    }
    let mut perms = metadata.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(true)
}

#[cfg(unix)]
fn link_count(path: &Path) -> io::Result<u64> {
    use std::os::unix::fs::MetadataExt;

    Ok(fs::symlink_metadata(path)?.nlink())
}

#[cfg(not(unix))]
fn link_count(_path: &Path) -> io::Result<u64> {
    Ok(1)
}

#[cfg(unix)]
fn lock_exclusive(file: File) -> io::Result<nix::fcntl::Flock<File>> {
    use nix::fcntl::{Flock, FlockArg};

    Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| io::Error::from(errno))
}

#[cfg(not(unix))]
fn lock_exclusive(file: File) -> io::Result<File> {
    Ok(file)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
