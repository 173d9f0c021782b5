//! Linux host collaborators for airlockd
//!
//! Provides:
//! - Owner-only directory isolation (mode 0700, ownership check)
//! - Printing through CUPS (`lp`, `cancel`)
//! - Scanning through SANE (`scanimage`)

mod command;
mod isolation;
mod print;
mod scan;

pub use command::*;
pub use isolation::*;
pub use print::*;
pub use scan::*;
