//! Frame loop orchestration.
//!
//! [`Renderer`] owns the whole GPU stack (instance, device, swapchain, per
//! frame command recorders, the frame fence) plus one [`Sample`], and drives
//! the per-tick sequence: reclaim the frame slot via the fence, acquire a
//! back buffer, record, submit, present, advance.
//!
//! # Frame pacing
//!
//! One fence value is tracked per in-flight frame slot; a tick only waits on
//! the value stamped by the slot it is about to reuse, so CPU recording of
//! frame N overlaps GPU execution of frame N-1. The fence wait at the top of
//! the tick is the loop's only blocking point.
//!
//! # Resource Destruction Order
//!
//! Teardown drains the GPU through the fence first, then releases resources
//! in dependency order (sample resources, recorders, semaphores, fence,
//! swapchain, surface, instance) via `ManuallyDrop`.

use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use tracing::{debug, error, info};

use triangle_platform::{InputState, Surface, Window};
use triangle_rhi::RhiError;
use triangle_rhi::adapter::{AdapterCriteria, select_adapter};
use triangle_rhi::command::CommandRecorder;
use triangle_rhi::device::Device;
use triangle_rhi::instance::Instance;
use triangle_rhi::swapchain::{BackBufferRing, Swapchain};
use triangle_rhi::sync::{Semaphore, TimelineFence};

use crate::error::{RendererError, RendererResult};
use crate::lifecycle::{LifecycleError, LoopPhase};
use crate::pacing::FramePacer;
use crate::sample::{FrameTarget, InitContext, Sample};
use crate::{BACK_BUFFER_COUNT, FRAMES_IN_FLIGHT};

/// Longest a tick waits to reclaim a frame slot before declaring the GPU
/// hung.
const FRAME_FENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest a full drain (init upload, teardown) may take.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Resources reused by one in-flight frame slot.
struct FrameSlot {
    /// Command recorder; reset every time the slot comes around.
    recorder: CommandRecorder,
}

/// Per-swapchain-image binary semaphores.
struct ImageSync {
    /// Signaled when the back buffer is ready to be rendered into.
    image_available: Semaphore,
    /// Signaled when rendering to the back buffer is complete.
    render_finished: Semaphore,
}

/// The frame loop.
pub struct Renderer {
    // Core GPU objects, in reverse destruction order.
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Logical device, shared with every resource below.
    device: Arc<Device>,
    /// Window surface (destroyed after the swapchain).
    surface: ManuallyDrop<Surface>,
    /// Swapchain and its back buffers.
    swapchain: ManuallyDrop<Swapchain>,

    // Frame synchronization.
    /// Frame fence: monotonic completion counter shared with the GPU.
    fence: ManuallyDrop<TimelineFence>,
    /// Per-slot fence value bookkeeping.
    pacer: FramePacer,
    /// Round-robin back buffer index tracking.
    ring: BackBufferRing,
    /// One recorder per in-flight frame slot.
    frame_slots: ManuallyDrop<Vec<FrameSlot>>,
    /// Acquire/present semaphores, one pair per swapchain image.
    image_sync: ManuallyDrop<Vec<ImageSync>>,
    /// Slot the next tick uses.
    current_slot: usize,
    /// Index of the next acquire semaphore; cycles independently of the
    /// image index because acquisition order is up to the driver.
    acquire_cursor: usize,

    // Behavior.
    /// The sample chosen at startup.
    sample: ManuallyDrop<Box<dyn Sample>>,
    /// Lifecycle phase of the loop.
    phase: LoopPhase,
}

impl Renderer {
    /// Builds the full GPU stack for `window` and initializes `sample`.
    ///
    /// The sequence is: instance, surface, adapter selection (driven by
    /// `criteria`), logical device, swapchain, per-slot recorders,
    /// per-image semaphores, frame fence, sample init, then a full fence
    /// drain so every upload the sample made has completed before the first
    /// frame.
    ///
    /// # Errors
    ///
    /// Any failure is fatal; the caller aborts startup.
    pub fn new(
        window: &Window,
        sample: Box<dyn Sample>,
        criteria: AdapterCriteria,
    ) -> RendererResult<Self> {
        let width = window.width();
        let height = window.height();
        info!("Initializing renderer ({}x{})", width, height);

        let display_handle = window
            .display_handle()
            .map_err(|e| RendererError::Platform(e.to_string()))?;
        let enable_validation = cfg!(debug_assertions);
        let instance = Instance::new(enable_validation, display_handle)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RendererError::Platform(e.to_string()))?;

        let adapter = select_adapter(
            instance.handle(),
            surface.handle(),
            surface.loader(),
            criteria,
        )?;
        let device = Device::new(&instance, &adapter)?;

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            width,
            height,
            BACK_BUFFER_COUNT,
            true,
        )?;
        let ring = BackBufferRing::new(swapchain.image_count())?;

        let graphics_family = device.queue_families().graphics_family.unwrap();
        let mut frame_slots = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for _ in 0..FRAMES_IN_FLIGHT {
            frame_slots.push(FrameSlot {
                recorder: CommandRecorder::new(device.clone(), graphics_family)?,
            });
        }

        let mut image_sync = Vec::with_capacity(swapchain.image_count() as usize);
        for _ in 0..swapchain.image_count() {
            image_sync.push(ImageSync {
                image_available: Semaphore::new(device.clone())?,
                render_finished: Semaphore::new(device.clone())?,
            });
        }

        let fence = TimelineFence::new(device.clone(), 0)?;
        let pacer = FramePacer::new(FRAMES_IN_FLIGHT);

        let mut sample = sample;
        let ctx = InitContext {
            device: &device,
            color_format: swapchain.format(),
            extent: swapchain.extent(),
        };
        sample.init(&ctx)?;

        let mut renderer = Self {
            instance: ManuallyDrop::new(instance),
            device,
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            fence: ManuallyDrop::new(fence),
            pacer,
            ring,
            frame_slots: ManuallyDrop::new(frame_slots),
            image_sync: ManuallyDrop::new(image_sync),
            current_slot: 0,
            acquire_cursor: 0,
            sample: ManuallyDrop::new(sample),
            phase: LoopPhase::Uninitialized,
        };

        // The initial drain guarantees the sample's uploads have finished
        // before the first entry into Rendering.
        renderer.drain_gpu()?;
        renderer.phase = renderer.phase.advance(LoopPhase::Initialized)?;

        info!(
            "Renderer initialized: {} back buffers, {} frames in flight",
            renderer.swapchain.image_count(),
            FRAMES_IN_FLIGHT
        );

        Ok(renderer)
    }

    /// Produces one frame.
    ///
    /// Tick sequence: reclaim the slot through the fence, acquire a back
    /// buffer, update the sample, reset/record/close the slot's recorder,
    /// submit with the slot's new fence value, present, advance the ring and
    /// the slot cursor. A call while `Idle` is a no-op.
    ///
    /// # Errors
    ///
    /// Every error is fatal; the caller stops the loop and tears down.
    pub fn render_frame(
        &mut self,
        delta_secs: f32,
        input: &mut InputState,
    ) -> RendererResult<()> {
        match self.phase {
            LoopPhase::Initialized => {
                self.phase = self.phase.advance(LoopPhase::Rendering)?;
            }
            LoopPhase::Rendering => {}
            LoopPhase::Idle => return Ok(()),
            other => {
                return Err(LifecycleError::InvalidTransition {
                    from: other,
                    to: LoopPhase::Rendering,
                }
                .into());
            }
        }

        let slot_index = self.current_slot;

        // Reclaim the slot: its previous submission must have completed
        // before the recorder may be reset. Zero means never submitted.
        let reclaim = self.pacer.reclaim_target(slot_index);
        if reclaim > 0 {
            self.fence.wait_until(reclaim, FRAME_FENCE_TIMEOUT)?;
        }

        let acquire_semaphore = self.image_sync[self.acquire_cursor].image_available.handle();
        let (image_index, suboptimal) = self
            .swapchain
            .acquire_next_image(acquire_semaphore)
            .map_err(|e| RhiError::SwapchainError(format!("acquire failed: {:?}", e)))?;
        if suboptimal {
            debug!("acquire reported a suboptimal swapchain");
        }

        // The acquired index is the authoritative back buffer index.
        self.ring.set(image_index);

        self.sample.update(delta_secs, input);

        let target = FrameTarget {
            image: self.swapchain.image(image_index as usize),
            view: self.swapchain.image_view(image_index as usize),
            extent: self.swapchain.extent(),
        };

        let recorder = &mut self.frame_slots[slot_index].recorder;
        recorder.reset()?;
        recorder.transition_image(
            target.image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        )?;
        self.sample.record(recorder, &target)?;
        recorder.transition_image(
            target.image,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        )?;
        recorder.close()?;

        // Submit: wait for the back buffer, signal the present semaphore and
        // the slot's new fence value behind the frame's work.
        let fence_value = self.pacer.stamp(slot_index);
        let render_finished = self.image_sync[image_index as usize].render_finished.handle();

        let wait_semaphores = [acquire_semaphore];
        let wait_values = [0u64];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished, self.fence.handle()];
        let signal_values = [0u64, fence_value];
        let command_buffers = [self.frame_slots[slot_index].recorder.handle()];

        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .wait_semaphore_values(&wait_values)
            .signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        // SAFETY: the recorder was closed above; all semaphores outlive the
        // submission because teardown drains the queue first.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], vk::Fence::null())?;
        }

        match self
            .swapchain
            .present(self.device.present_queue(), image_index, render_finished)
        {
            Ok(false) => {}
            Ok(true) => debug!("present reported a suboptimal swapchain"),
            Err(e) => return Err(RhiError::Present(e).into()),
        }

        self.ring.advance();
        self.acquire_cursor = (self.acquire_cursor + 1) % self.image_sync.len();
        self.current_slot = (self.current_slot + 1) % self.frame_slots.len();

        Ok(())
    }

    /// Switches between `Rendering` and `Idle`, driven by window visibility.
    ///
    /// Setting the current mode again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the loop is in a phase that cannot go
    /// idle or resume (for example already destroyed).
    pub fn set_idle(&mut self, idle: bool) -> RendererResult<()> {
        let target = if idle {
            LoopPhase::Idle
        } else {
            LoopPhase::Rendering
        };
        if self.phase == target || (self.phase == LoopPhase::Initialized && !idle) {
            // Initialized enters Rendering lazily on the first frame.
            return Ok(());
        }
        self.phase = self.phase.advance(target)?;
        debug!("Frame loop now {:?}", self.phase);
        Ok(())
    }

    /// Returns the loop's lifecycle phase.
    #[inline]
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Index of the back buffer the CPU writes next.
    #[inline]
    pub fn back_buffer_index(&self) -> u32 {
        self.ring.current()
    }

    /// Returns the swapchain extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Signals a fresh fence value behind all submitted work and blocks
    /// until it completes, leaving no frame in flight.
    fn drain_gpu(&mut self) -> RendererResult<()> {
        let value = self.pacer.reserve();
        self.fence.signal(value)?;
        self.fence.wait_until(value, DRAIN_TIMEOUT)?;
        debug!("GPU drained through fence value {}", value);
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Drain before releasing anything the GPU might still reference.
        match self.drain_gpu() {
            Ok(()) => {}
            Err(RendererError::Rhi(RhiError::FenceTimeout { value })) => {
                error!(
                    "{}",
                    LifecycleError::PrematureDestruction { pending: value }
                );
                if let Err(e) = self.device.wait_idle() {
                    error!("Device wait-idle fallback failed: {:?}", e);
                }
            }
            Err(e) => {
                error!("GPU drain failed during teardown: {}", e);
                if let Err(e) = self.device.wait_idle() {
                    error!("Device wait-idle fallback failed: {:?}", e);
                }
            }
        }

        match self.phase.advance(LoopPhase::Destroyed) {
            Ok(phase) => self.phase = phase,
            Err(e) => debug!("Teardown from partial initialization: {}", e),
        }

        // SAFETY: dropped exactly once, in dependency order. The sample goes
        // first (its pipelines and buffers hold the device), then the loop's
        // own GPU objects, then swapchain, surface, instance.
        unsafe {
            ManuallyDrop::drop(&mut self.sample);
            ManuallyDrop::drop(&mut self.frame_slots);
            ManuallyDrop::drop(&mut self.image_sync);
            ManuallyDrop::drop(&mut self.fence);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
