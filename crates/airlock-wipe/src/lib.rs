//! Secure deletion of session directories
//!
//! Every file is overwritten once with CSPRNG output, renamed to a random
//! name, then removed. Directories are removed afterwards, deepest first.
//! Failures are collected in a [`WipeOutcome`] and never abort the pass.

mod engine;
mod names;

pub use engine::*;
pub use names::*;
