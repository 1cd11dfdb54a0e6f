//! Frame loop orchestration.
//!
//! This crate sits between the GPU abstraction (`triangle-rhi`) and the
//! application shell:
//! - Lifecycle state machine for the loop
//! - Per-slot fence value pacing (frames in flight)
//! - The sample strategy interface
//! - The frame loop itself

pub mod error;
pub mod lifecycle;
pub mod pacing;
pub mod renderer;
pub mod sample;

pub use error::{RendererError, RendererResult};
pub use lifecycle::{LifecycleError, LoopPhase};
pub use pacing::FramePacer;
pub use renderer::Renderer;
pub use sample::{FrameTarget, InitContext, Sample};

/// Number of back buffers requested from the swapchain.
pub const BACK_BUFFER_COUNT: u32 = 2;

/// Maximum number of frames that can be in flight simultaneously.
pub const FRAMES_IN_FLIGHT: usize = 2;
