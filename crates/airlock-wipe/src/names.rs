//! Random names for obfuscation and disambiguation

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Length of names given to files right before deletion
pub const OBFUSCATED_NAME_LEN: usize = 24;

/// Random alphanumeric string drawn from the thread-local CSPRNG
pub fn random_name(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random lowercase hex string
pub fn random_hex(len: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(HEX[rng.gen_range(0..HEX.len())]))
        .collect()
}

/// A path next to `path` with a fresh random name that does not exist yet
pub fn obfuscated_sibling(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    loop {
        let candidate = parent.join(random_name(OBFUSCATED_NAME_LEN));
        if std::fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
    }
}
