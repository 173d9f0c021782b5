//! Shared utilities for airlockd
//!
//! This crate provides:
//! - ID types (SessionId, ClientId)
//! - Time utilities (log timestamps, monotonic time)
//! - Error types
//! - Default paths for socket, data, sessions and audit log

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
