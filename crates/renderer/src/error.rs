//! Renderer-level error type.

use thiserror::Error;

use crate::lifecycle::LifecycleError;
use triangle_rhi::RhiError;

/// Errors the frame loop can surface.
///
/// All of them are fatal at this scope; the application shell maps any of
/// them to the abort path.
#[derive(Error, Debug)]
pub enum RendererError {
    /// A GPU-API boundary call failed.
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// The frame loop was driven through an illegal lifecycle edge.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Window or surface plumbing failed.
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Result type alias for frame loop operations.
pub type RendererResult<T> = std::result::Result<T, RendererError>;
