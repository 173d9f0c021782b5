//! Audit trail for airlockd
//!
//! Provides:
//! - Typed audit events rendered as human-readable messages
//! - The `AuditSink` contract (append a line, read everything back)
//! - A file-backed sink (`[yyyy-MM-dd HH:mm:ss] <message>` per line)
//! - An in-memory sink for tests

mod audit;
mod file;
mod memory;
mod traits;

pub use audit::*;
pub use file::*;
pub use memory::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit log is not valid UTF-8")]
    Encoding,
}

pub type StoreResult<T> = Result<T, StoreError>;
