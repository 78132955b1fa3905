//! Framesieve Common Utilities
//!
//! Shared infrastructure for all framesieve crates:
//! - Error types and result aliases
//! - Cancellation signalling for long-running runs
//! - Configuration loading and defaults
//! - External tool resolution
//! - Tracing/logging initialization

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod tools;

pub use cancel::*;
pub use config::*;
pub use error::*;
pub use tools::*;
