//! Session lifecycle core for airlockd
//!
//! This crate is the heart of airlockd, containing:
//! - The session record and its state machine (Inactive -> Active -> Ended)
//! - The session manager: start, end, import, scan, print, orphan recovery
//! - Inactivity enforcement using monotonic time
//! - Observer notification after every transition

mod events;
mod files;
mod manager;
mod session;
mod watch;

pub use events::*;
pub use files::*;
pub use manager::*;
pub use session::*;
pub use watch::*;
