//! Host collaborator interfaces for airlockd
//!
//! This crate defines the seam between the session core and the platform:
//! how a directory is locked down, how a page is scanned, how a file is
//! printed. It contains no platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
