//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance creation and adapter selection
//! - Device creation
//! - Swapchain management and back buffer rotation
//! - Command recording with explicit open/close state
//! - Buffer management
//! - Pipeline creation
//! - Timeline semaphore synchronization

mod error;

pub mod adapter;
pub mod buffer;
pub mod command;
pub mod device;
pub mod instance;
pub mod pipeline;
pub mod rendering;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
