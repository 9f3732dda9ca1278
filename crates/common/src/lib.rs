//! Liverec Common Utilities
//!
//! Shared infrastructure for all liverec crates:
//! - Error taxonomy and result aliases
//! - Recording clocks and timestamp formatting
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
