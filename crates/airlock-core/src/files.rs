//! Naming and creating files inside a session directory

use airlock_wipe::random_hex;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Length of the random suffix added on a name collision
pub const COLLISION_SUFFIX_LEN: usize = 8;

const MAX_NAME_ATTEMPTS: usize = 32;

/// `report.pdf` + `1a2b3c4d` -> `report_1a2b3c4d.pdf`
pub fn suffixed_name(name: &str, suffix: &str) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}_{}.{}",
            stem.to_string_lossy(),
            suffix,
            ext.to_string_lossy()
        ),
        _ => format!("{}_{}", name, suffix),
    }
}

/// Create a new file named `name` in `dir`, or a suffixed variant if that
/// name is taken. Never opens an existing file.
pub fn create_unique(dir: &Path, name: &str) -> io::Result<(String, PathBuf, File)> {
    let mut candidate = name.to_string();

    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(&candidate);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        match options.open(&path) {
            Ok(file) => return Ok((candidate, path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                candidate = suffixed_name(name, &random_hex(COLLISION_SUFFIX_LEN));
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {}", name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(suffixed_name("report.pdf", "deadbeef"), "report_deadbeef.pdf");
        assert_eq!(suffixed_name("a.tar.gz", "00000000"), "a.tar_00000000.gz");
        assert_eq!(suffixed_name("README", "0badf00d"), "README_0badf00d");
        assert_eq!(suffixed_name(".profile", "12345678"), ".profile_12345678");
    }

    #[test]
    fn collision_gets_fresh_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"first").unwrap();

        let (name, path, _file) = create_unique(dir.path(), "a.txt").unwrap();
        assert_ne!(name, "a.txt");
        assert!(name.starts_with("a_") && name.ends_with(".txt"));
        assert_eq!(name.len(), "a_.txt".len() + COLLISION_SUFFIX_LEN);
        assert_eq!(path, dir.path().join(&name));

        // Original untouched
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"first");
    }

    #[test]
    fn free_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let (name, path, _file) = create_unique(dir.path(), "b.txt").unwrap();
        assert_eq!(name, "b.txt");
        assert!(path.exists());
    }
}
