//! Default paths for airlockd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/airlock/airlockd.sock` or `/tmp/airlock-$USER/airlockd.sock`
//! - Data: `$XDG_DATA_HOME/airlock` or `~/.local/share/airlock`
//! - Sessions: `<data>/sessions`
//! - Audit log: `$XDG_STATE_HOME/airlock/audit.log` or `~/.local/state/airlock/audit.log`
//! - Config: `$XDG_CONFIG_HOME/airlock/config.toml` or `~/.config/airlock/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const AIRLOCK_SOCKET_ENV: &str = "AIRLOCK_SOCKET";

/// Environment variable for overriding the data directory
pub const AIRLOCK_DATA_DIR_ENV: &str = "AIRLOCK_DATA_DIR";

const SOCKET_FILENAME: &str = "airlockd.sock";
const AUDIT_LOG_FILENAME: &str = "audit.log";
const CONFIG_FILENAME: &str = "config.toml";
const SESSIONS_DIR: &str = "sessions";

/// Application subdirectory name
const APP_DIR: &str = "airlock";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$AIRLOCK_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/airlock/airlockd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/airlock-$USER/airlockd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(AIRLOCK_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking AIRLOCK_SOCKET env var.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$AIRLOCK_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/airlock` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/airlock` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(AIRLOCK_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking AIRLOCK_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Sessions root for a given data directory.
/// Every direct child of this directory is a session named by its id.
pub fn sessions_root_in(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(SESSIONS_DIR)
}

/// Get the default state directory (audit log lives here).
///
/// Order of precedence:
/// 1. `$XDG_STATE_HOME/airlock` (if XDG_STATE_HOME is set)
/// 2. `~/.local/state/airlock` (fallback)
pub fn default_state_dir() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("state")
}

/// Get the default audit log path
pub fn default_audit_log_path() -> PathBuf {
    default_state_dir().join(AUDIT_LOG_FILENAME)
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_app_dir() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("airlock"));
        assert!(path.to_string_lossy().ends_with(".sock"));
    }

    #[test]
    fn sessions_root_is_child_of_data_dir() {
        let data = data_dir_without_env();
        let root = sessions_root_in(&data);
        assert_eq!(root.parent().unwrap(), data);
        assert!(root.ends_with("sessions"));
    }

    #[test]
    fn audit_log_is_in_state_dir() {
        let log = default_audit_log_path();
        assert_eq!(log.parent().unwrap(), default_state_dir());
        assert!(log.ends_with("audit.log"));
    }

    #[test]
    fn config_path_ends_with_toml() {
        assert!(default_config_path().ends_with("config.toml"));
    }
}
