//! Error types for platform glue.

use thiserror::Error;

/// Error type for window and surface plumbing.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Vulkan errors surfaced outside the RHI layer
    #[error("Vulkan error: {0}")]
    Vulkan(String),
}

/// Result type alias using the platform glue Error type.
pub type Result<T> = std::result::Result<T, Error>;
