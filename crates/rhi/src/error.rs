//! RHI-specific error types.
//!
//! Every GPU-API boundary call returns a [`RhiResult`]; nothing in this
//! crate retries or recovers, callers decide what is fatal.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// Adapter enumeration exhausted with no acceptable candidate
    #[error("No compatible GPU adapter found")]
    NoCompatibleAdapter,

    /// Logical device creation failure
    #[error("Device creation failed: {0}")]
    DeviceCreation(ash::vk::Result),

    /// Surface creation or query error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain creation or usage error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Presentation failure
    #[error("Present failed: {0}")]
    Present(ash::vk::Result),

    /// Command recording API misuse
    #[error("Command recording state error: {0}")]
    RecordState(String),

    /// A fence wait elapsed before the target value was reached
    #[error("Fence wait for value {value} timed out")]
    FenceTimeout { value: u64 },

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Invalid handle error
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
