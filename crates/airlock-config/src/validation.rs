//! Configuration validation

use crate::schema::RawConfig;
use crate::settings::{ScanFormat, DEFAULT_INACTIVITY_TIMEOUT};
use std::path::Path;
use thiserror::Error;

/// Smallest accepted overwrite chunk
pub const MIN_CHUNK_SIZE: usize = 4 * 1024;

/// Largest accepted overwrite chunk
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {field}: {message}")]
    FieldError {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Path for {field} must be absolute: {path}")]
    RelativePath { field: &'static str, path: String },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let timeout = config.sessions.inactivity_timeout_seconds;
    if timeout == Some(0) {
        errors.push(ValidationError::FieldError {
            section: "sessions",
            field: "inactivity_timeout_seconds",
            message: "must be greater than zero".into(),
        });
    }

    // Unset timeout means the default one
    let effective_timeout = match timeout {
        Some(0) => None,
        Some(secs) => Some(secs),
        None => Some(DEFAULT_INACTIVITY_TIMEOUT.as_secs()),
    };

    if let Some(interval) = config.sessions.check_interval_seconds {
        if interval == 0 {
            errors.push(ValidationError::FieldError {
                section: "sessions",
                field: "check_interval_seconds",
                message: "must be greater than zero".into(),
            });
        } else if let Some(timeout) = effective_timeout
            && interval >= timeout
        {
            errors.push(ValidationError::FieldError {
                section: "sessions",
                field: "check_interval_seconds",
                message: format!(
                    "must be shorter than inactivity_timeout_seconds ({})",
                    timeout
                ),
            });
        }
    }

    if let Some(chunk) = config.wipe.chunk_size_bytes
        && !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk)
    {
        errors.push(ValidationError::FieldError {
            section: "wipe",
            field: "chunk_size_bytes",
            message: format!(
                "must be between {} and {} bytes",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            ),
        });
    }

    check_absolute(&mut errors, "service.socket_path", config.service.socket_path.as_deref());
    check_absolute(&mut errors, "service.data_dir", config.service.data_dir.as_deref());
    check_absolute(&mut errors, "sessions.root", config.sessions.root.as_deref());
    check_absolute(&mut errors, "audit.log_path", config.audit.log_path.as_deref());

    if let Some(root) = &config.sessions.root
        && root.parent().is_none()
    {
        errors.push(ValidationError::GlobalError(
            "sessions.root cannot be the filesystem root".into(),
        ));
    }

    if let Some(printer) = &config.print.printer
        && printer.trim().is_empty()
    {
        errors.push(ValidationError::FieldError {
            section: "print",
            field: "printer",
            message: "cannot be empty".into(),
        });
    }

    if let Some(format) = &config.scan.format
        && format.parse::<ScanFormat>().is_err()
    {
        errors.push(ValidationError::FieldError {
            section: "scan",
            field: "format",
            message: format!("unknown format '{}' (expected png, jpeg, tiff or pnm)", format),
        });
    }

    errors
}

fn check_absolute(errors: &mut Vec<ValidationError>, field: &'static str, path: Option<&Path>) {
    if let Some(path) = path
        && !path.is_absolute()
    {
        errors.push(ValidationError::RelativePath {
            field,
            path: path.display().to_string(),
        });
    }
}
