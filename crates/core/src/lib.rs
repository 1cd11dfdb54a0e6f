//! Core utilities for the triangle sample.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timer
//! - Launch options parsed from the command line

mod error;
mod launch;
mod logging;
mod timer;

pub use error::{Error, Result};
pub use launch::LaunchOptions;
pub use logging::init_logging;
pub use timer::Timer;
