//! Validated configuration structures

use crate::schema::RawConfig;
use airlock_util::{
    default_audit_log_path, default_data_dir, default_socket_path, sessions_root_in,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default idle time before a session is ended
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Default period of the inactivity check
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub use airlock_wipe::DEFAULT_CHUNK_SIZE;

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct AirlockConfig {
    pub service: ServiceConfig,
    pub sessions: SessionsConfig,
    pub wipe: WipeConfig,
    pub audit: AuditConfig,
    pub print: PrintConfig,
    pub scan: ScanConfig,
}

impl AirlockConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let service = ServiceConfig {
            socket_path: raw.service.socket_path.unwrap_or_else(default_socket_path),
            data_dir: raw.service.data_dir.unwrap_or_else(default_data_dir),
        };

        let sessions = SessionsConfig {
            root: raw
                .sessions
                .root
                .unwrap_or_else(|| sessions_root_in(&service.data_dir)),
            inactivity_timeout: raw
                .sessions
                .inactivity_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_INACTIVITY_TIMEOUT),
            check_interval: raw
                .sessions
                .check_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CHECK_INTERVAL),
        };

        Self {
            service,
            sessions,
            wipe: WipeConfig {
                chunk_size: raw.wipe.chunk_size_bytes.unwrap_or(DEFAULT_CHUNK_SIZE),
            },
            audit: AuditConfig {
                log_path: raw.audit.log_path.unwrap_or_else(default_audit_log_path),
            },
            print: PrintConfig {
                printer: raw.print.printer,
            },
            scan: ScanConfig {
                device: raw.scan.device,
                format: raw
                    .scan
                    .format
                    .and_then(|f| f.parse().ok())
                    .unwrap_or_default(),
            },
        }
    }
}

impl Default for AirlockConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            service: Default::default(),
            sessions: Default::default(),
            wipe: Default::default(),
            audit: Default::default(),
            print: Default::default(),
            scan: Default::default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionsConfig {
    pub root: PathBuf,
    pub inactivity_timeout: Duration,
    pub check_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct WipeConfig {
    pub chunk_size: usize,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct PrintConfig {
    pub printer: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub device: Option<String>,
    pub format: ScanFormat,
}

/// Image format produced by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanFormat {
    #[default]
    Png,
    Jpeg,
    Tiff,
    Pnm,
}

impl ScanFormat {
    /// File extension for scanned documents
    pub fn extension(&self) -> &'static str {
        match self {
            ScanFormat::Png => "png",
            ScanFormat::Jpeg => "jpg",
            ScanFormat::Tiff => "tiff",
            ScanFormat::Pnm => "pnm",
        }
    }

    /// Value for `scanimage --format`
    pub fn as_arg(&self) -> &'static str {
        match self {
            ScanFormat::Png => "png",
            ScanFormat::Jpeg => "jpeg",
            ScanFormat::Tiff => "tiff",
            ScanFormat::Pnm => "pnm",
        }
    }
}

impl FromStr for ScanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ScanFormat::Png),
            "jpeg" | "jpg" => Ok(ScanFormat::Jpeg),
            "tiff" | "tif" => Ok(ScanFormat::Tiff),
            "pnm" => Ok(ScanFormat::Pnm),
            other => Err(format!("Unknown scan format: {}", other)),
        }
    }
}
