//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub service: RawServiceConfig,

    #[serde(default)]
    pub sessions: RawSessionsConfig,

    #[serde(default)]
    pub wipe: RawWipeConfig,

    #[serde(default)]
    pub audit: RawAuditConfig,

    #[serde(default)]
    pub print: RawPrintConfig,

    #[serde(default)]
    pub scan: RawScanConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory (sessions root defaults to `<data_dir>/sessions`)
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionsConfig {
    /// Sessions root; every direct child is a session directory
    pub root: Option<PathBuf>,

    /// Idle time before a session is ended automatically
    pub inactivity_timeout_seconds: Option<u64>,

    /// Period of the inactivity check
    pub check_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWipeConfig {
    /// Overwrite chunk size
    pub chunk_size_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAuditConfig {
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPrintConfig {
    /// Destination queue; the system default when unset
    pub printer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawScanConfig {
    /// SANE device name; the first available device when unset
    pub device: Option<String>,

    /// Output image format
    pub format: Option<String>,
}
