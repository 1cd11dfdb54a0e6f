//! Per-sample behavior behind a fixed capability interface.
//!
//! The frame loop holds one [`Sample`] chosen at startup and drives it
//! through `init`, `update`, and `record`. Teardown is the sample's drop
//! glue; GPU resources it created must be released there, and the loop
//! guarantees the GPU is drained before the sample is dropped.

use std::sync::Arc;

use ash::vk;

use triangle_platform::InputState;
use triangle_rhi::RhiResult;
use triangle_rhi::command::CommandRecorder;
use triangle_rhi::device::Device;

/// Everything a sample needs to build its static GPU resources.
pub struct InitContext<'a> {
    /// The logical device; samples clone the `Arc` into what they create.
    pub device: &'a Arc<Device>,
    /// Color format of the swapchain the sample will render into.
    pub color_format: vk::Format,
    /// Swapchain extent.
    pub extent: vk::Extent2D,
}

impl InitContext<'_> {
    /// Width over height of the render target.
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height as f32
    }
}

/// The back buffer a frame is recorded against.
///
/// The image is owned by the swapchain; the loop has already transitioned it
/// into `COLOR_ATTACHMENT_OPTIMAL` when `record` runs and transitions it to
/// `PRESENT_SRC_KHR` afterwards.
#[derive(Debug, Clone, Copy)]
pub struct FrameTarget {
    /// The back buffer image.
    pub image: vk::Image,
    /// Render-target view of the image.
    pub view: vk::ImageView,
    /// Image extent.
    pub extent: vk::Extent2D,
}

/// Fixed capability interface for per-sample behavior.
pub trait Sample {
    /// Builds static GPU resources (pipelines, vertex data). Runs once;
    /// the loop drains the GPU afterwards, so CPU-visible uploads made here
    /// are complete before the first frame.
    fn init(&mut self, ctx: &InitContext<'_>) -> RhiResult<()>;

    /// Advances sample state by `delta_secs`. Runs once per tick before
    /// recording.
    fn update(&mut self, delta_secs: f32, input: &mut InputState);

    /// Records one frame into an open recorder.
    ///
    /// The recorder is in the `Recording` state; the sample must leave it
    /// there (the loop closes it).
    fn record(&mut self, recorder: &CommandRecorder, target: &FrameTarget) -> RhiResult<()>;
}
