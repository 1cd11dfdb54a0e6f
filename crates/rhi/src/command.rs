//! Command pool and command recording.
//!
//! This module provides wrappers for VkCommandPool and VkCommandBuffer,
//! enabling safe recording and submission of Vulkan commands.
//!
//! # Overview
//!
//! - [`CommandPool`] manages VkCommandPool creation and command buffer allocation
//! - [`CommandRecorder`] owns one pool/buffer pair and tracks its recording
//!   state: a recorder cycles `Ready -> Recording -> Executable` through
//!   [`CommandRecorder::reset`] and [`CommandRecorder::close`], and every
//!   recording call outside the `Recording` state fails with
//!   [`RhiError::RecordState`] instead of tripping validation layers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use triangle_rhi::device::Device;
//! use triangle_rhi::command::CommandRecorder;
//!
//! # fn example(device: Arc<Device>) -> Result<(), triangle_rhi::RhiError> {
//! let queue_family = device.queue_families().graphics_family.unwrap();
//! let mut recorder = CommandRecorder::new(device.clone(), queue_family)?;
//!
//! // Record commands
//! recorder.reset()?;
//! // ... recording calls ...
//! recorder.close()?;
//! // recorder.handle() is now ready for submission
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Vulkan command pool wrapper.
///
/// A command pool is used to allocate command buffers. Each pool is associated
/// with a specific queue family and can only allocate command buffers that
/// will be submitted to queues of that family.
///
/// # Thread Safety
///
/// Command pools are not thread-safe. For multi-threaded command recording,
/// create a separate pool per thread.
pub struct CommandPool {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan command pool handle.
    pool: vk::CommandPool,
    /// Queue family index this pool belongs to.
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a new command pool for the specified queue family.
    ///
    /// The pool is created with the `RESET_COMMAND_BUFFER` flag, allowing
    /// individual command buffers to be reset without resetting the entire pool.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `queue_family_index` - The queue family for command buffer submission
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    /// Returns the Vulkan command pool handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Returns the queue family index this pool belongs to.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates a primary command buffer from this pool.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        Ok(buffers[0])
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Recording state of a [`CommandRecorder`].
///
/// Transitions: `Ready -> Recording` (reset), `Recording -> Executable`
/// (close), `Executable -> Recording` (reset). Recording calls are only legal
/// in `Recording`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// Freshly allocated; nothing recorded yet.
    Ready,
    /// A recording is open and accepting commands.
    Recording,
    /// The recording is closed and the buffer may be submitted.
    Executable,
}

impl RecordState {
    /// A reset is legal whenever no recording is open.
    #[inline]
    pub fn can_reset(self) -> bool {
        !matches!(self, RecordState::Recording)
    }

    /// Recording calls are legal only while a recording is open.
    #[inline]
    pub fn can_record(self) -> bool {
        matches!(self, RecordState::Recording)
    }

    /// A close is legal only while a recording is open.
    #[inline]
    pub fn can_close(self) -> bool {
        matches!(self, RecordState::Recording)
    }
}

/// Command recorder owning one command pool/buffer pair.
///
/// The recorder is the unit of per-frame command recording: each in-flight
/// frame slot holds one recorder and reuses it every time the slot comes
/// around. [`CommandRecorder::reset`] discards the previous recording and
/// opens a new one; [`CommandRecorder::close`] seals it for submission.
///
/// # Reuse Precondition
///
/// `reset` must not be called while the GPU may still be executing the
/// recorder's previous submission. Callers confirm completion through the
/// frame fence before resetting; the recorder itself can only reject misuse
/// of its own API surface, not GPU-side reuse.
pub struct CommandRecorder {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Pool the buffer was allocated from. Held for its lifetime.
    _pool: CommandPool,
    /// Vulkan command buffer handle.
    buffer: vk::CommandBuffer,
    /// Current recording state.
    state: RecordState,
}

impl CommandRecorder {
    /// Creates a recorder with its own pool on the given queue family.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `queue_family_index` - The queue family the buffer will be submitted to
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation or buffer allocation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let pool = CommandPool::new(device.clone(), queue_family_index)?;
        let buffer = pool.allocate_command_buffer()?;

        Ok(Self {
            device,
            _pool: pool,
            buffer,
            state: RecordState::Ready,
        })
    }

    /// Returns the raw Vulkan command buffer handle.
    ///
    /// Submit it only after [`CommandRecorder::close`] succeeded.
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    /// Returns the current recording state.
    #[inline]
    pub fn state(&self) -> RecordState {
        self.state
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Discards the previous recording and opens a new one.
    ///
    /// The buffer is set up for one-time submission.
    ///
    /// # Reuse Precondition
    ///
    /// The GPU must have finished the prior submission that used this
    /// recorder. The frame loop guarantees this by waiting on the frame
    /// fence value stamped when the slot was last submitted.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if a recording is still open, or a
    /// Vulkan error if the reset/begin fails.
    pub fn reset(&mut self) -> RhiResult<()> {
        if !self.state.can_reset() {
            return Err(RhiError::RecordState(
                "reset called while a recording is open".to_string(),
            ));
        }

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())?;
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        self.state = RecordState::Recording;
        Ok(())
    }

    /// Seals the open recording; the buffer becomes submittable.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open, or a Vulkan
    /// error if ending the buffer fails.
    pub fn close(&mut self) -> RhiResult<()> {
        if !self.state.can_close() {
            return Err(RhiError::RecordState(
                "close called without an open recording".to_string(),
            ));
        }

        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        self.state = RecordState::Executable;
        Ok(())
    }

    /// Checks that a recording is open before a recording call.
    fn ensure_recording(&self, op: &str) -> RhiResult<()> {
        if !self.state.can_record() {
            return Err(RhiError::RecordState(format!(
                "{} requires an open recording (state: {:?})",
                op, self.state
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Resource State
    // =========================================================================

    /// Records a layout transition for a color image.
    ///
    /// Render targets move `UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL` before
    /// drawing and `COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC_KHR` before the
    /// present. Ordering those transitions correctly around each use is the
    /// caller's contract; the recorder only emits the barrier.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn transition_image(
        &self,
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> RhiResult<()> {
        self.ensure_recording("transition_image")?;

        let (src_stage, src_access, dst_stage, dst_access) =
            transition_masks(old_layout, new_layout);

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.device.handle().cmd_pipeline_barrier(
                self.buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }

        Ok(())
    }

    // =========================================================================
    // Dynamic Rendering (Vulkan 1.3)
    // =========================================================================

    /// Begins dynamic rendering.
    ///
    /// This is the Vulkan 1.3 way to start rendering without a VkRenderPass.
    /// Attachment load ops perform the clear.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn begin_rendering(&self, rendering_info: &vk::RenderingInfo) -> RhiResult<()> {
        self.ensure_recording("begin_rendering")?;
        unsafe {
            self.device
                .handle()
                .cmd_begin_rendering(self.buffer, rendering_info);
        }
        Ok(())
    }

    /// Ends dynamic rendering.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn end_rendering(&self) -> RhiResult<()> {
        self.ensure_recording("end_rendering")?;
        unsafe {
            self.device.handle().cmd_end_rendering(self.buffer);
        }
        Ok(())
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    /// Sets the viewport dynamically.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn set_viewport(&self, viewport: &vk::Viewport) -> RhiResult<()> {
        self.ensure_recording("set_viewport")?;
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
        Ok(())
    }

    /// Sets the scissor rectangle dynamically.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn set_scissor(&self, scissor: &vk::Rect2D) -> RhiResult<()> {
        self.ensure_recording("set_scissor")?;
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
        Ok(())
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Binds a graphics pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn bind_pipeline(&self, pipeline: vk::Pipeline) -> RhiResult<()> {
        self.ensure_recording("bind_pipeline")?;
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
        Ok(())
    }

    /// Binds a vertex buffer to binding 0.
    ///
    /// # Arguments
    ///
    /// * `buffer` - The vertex buffer
    /// * `offset` - Byte offset into the buffer
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn bind_vertex_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize) -> RhiResult<()> {
        self.ensure_recording("bind_vertex_buffer")?;
        unsafe {
            self.device
                .handle()
                .cmd_bind_vertex_buffers(self.buffer, 0, &[buffer], &[offset]);
        }
        Ok(())
    }

    // =========================================================================
    // Drawing Commands
    // =========================================================================

    /// Issues a non-indexed draw command.
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Number of vertices to draw
    /// * `instance_count` - Number of instances to draw
    /// * `first_vertex` - Offset to the first vertex
    /// * `first_instance` - Offset to the first instance
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::RecordState`] if no recording is open.
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> RhiResult<()> {
        self.ensure_recording("draw")?;
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
        Ok(())
    }
}

/// Stage and access masks for a color image layout transition.
///
/// Unknown pairs fall back to a full-pipeline barrier with a warning rather
/// than failing the recording.
fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> (
    vk::PipelineStageFlags,
    vk::AccessFlags,
    vk::PipelineStageFlags,
    vk::AccessFlags,
) {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL) => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        (vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR) => (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::AccessFlags::empty(),
        ),
        _ => {
            warn!(
                "Unhandled layout transition: {:?} -> {:?}",
                old_layout, new_layout
            );
            (
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_permissions() {
        let state = RecordState::Ready;
        assert!(state.can_reset());
        assert!(!state.can_record());
        assert!(!state.can_close());
    }

    #[test]
    fn test_recording_state_permissions() {
        let state = RecordState::Recording;
        assert!(!state.can_reset());
        assert!(state.can_record());
        assert!(state.can_close());
    }

    #[test]
    fn test_executable_state_permissions() {
        let state = RecordState::Executable;
        assert!(state.can_reset());
        assert!(!state.can_record());
        assert!(!state.can_close());
    }

    #[test]
    fn test_transition_masks_to_render_target() {
        let (src_stage, src_access, dst_stage, dst_access) = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        );
        assert_eq!(src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(src_access, vk::AccessFlags::empty());
        assert_eq!(dst_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(dst_access, vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
    }

    #[test]
    fn test_transition_masks_to_present() {
        let (src_stage, src_access, dst_stage, dst_access) = transition_masks(
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );
        assert_eq!(src_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(src_access, vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
        assert_eq!(dst_stage, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
        assert_eq!(dst_access, vk::AccessFlags::empty());
    }

    #[test]
    fn test_transition_masks_fallback_is_conservative() {
        let (src_stage, src_access, dst_stage, dst_access) = transition_masks(
            vk::ImageLayout::PRESENT_SRC_KHR,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        assert_eq!(src_stage, vk::PipelineStageFlags::ALL_COMMANDS);
        assert_eq!(dst_stage, vk::PipelineStageFlags::ALL_COMMANDS);
        assert!(src_access.contains(vk::AccessFlags::MEMORY_WRITE));
        assert!(dst_access.contains(vk::AccessFlags::MEMORY_READ));
    }

    #[test]
    fn test_command_pool_is_send() {
        // Compile-time check that CommandPool is Send
        fn assert_send<T: Send>() {}
        assert_send::<CommandPool>();
    }
}
