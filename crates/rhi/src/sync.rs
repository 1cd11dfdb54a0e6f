//! Synchronization primitives for Vulkan.
//!
//! This module provides wrappers for Vulkan synchronization objects:
//! - [`Semaphore`] - GPU-to-GPU synchronization (between queue operations)
//! - [`TimelineFence`] - GPU-to-CPU progress tracking through a monotonic counter
//!
//! # Overview
//!
//! Vulkan requires explicit synchronization between operations:
//!
//! - **Semaphores** (binary) synchronize operations within or across queues.
//!   For example, waiting for image acquisition before rendering, or waiting for
//!   rendering to complete before presentation.
//!
//! - **The timeline fence** carries a 64-bit counter meaning "all GPU work up
//!   to submission N has completed". The CPU reads the counter without
//!   blocking, or blocks until it reaches a target value. Signaled values are
//!   strictly increasing, so the counter never moves backwards.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use triangle_rhi::device::Device;
//! use triangle_rhi::sync::{Semaphore, TimelineFence};
//!
//! # fn example(device: Arc<Device>) -> Result<(), triangle_rhi::RhiError> {
//! // Create a semaphore for GPU-to-GPU synchronization
//! let image_available = Semaphore::new(device.clone())?;
//!
//! // Create the frame fence, starting at 0
//! let fence = TimelineFence::new(device.clone(), 0)?;
//!
//! // Enqueue a signal behind all submitted work, then wait for it
//! fence.signal(1)?;
//! fence.wait_until(1, Duration::from_secs(5))?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Vulkan semaphore wrapper.
///
/// Semaphores are used for GPU-to-GPU synchronization between queue operations.
/// Common use cases include:
/// - Image available semaphore: signaled when a swapchain image is ready
/// - Render finished semaphore: signaled when rendering is complete
///
/// # Thread Safety
///
/// The semaphore is immutable after creation and can be safely shared between
/// threads. The Vulkan specification allows semaphore operations to be submitted
/// from multiple threads.
pub struct Semaphore {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan semaphore handle.
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates a new binary semaphore.
    ///
    /// The semaphore is created in the unsignaled state.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    ///
    /// This handle can be used directly with Vulkan API calls.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Frame progress fence backed by a Vulkan timeline semaphore.
///
/// The fence holds a monotonically non-decreasing 64-bit counter. A value is
/// enqueued with [`TimelineFence::signal`] (or as part of a command buffer
/// submission targeting [`TimelineFence::handle`]); once all GPU work
/// submitted before it completes, the counter jumps to that value. The CPU
/// side polls with [`TimelineFence::completed_value`] or blocks with
/// [`TimelineFence::wait_until`].
///
/// Signaled values must be strictly increasing; the frame loop hands them out
/// from a single counter and never reuses one.
///
/// # Thread Safety
///
/// Wait and query operations may be issued from any thread. This crate only
/// ever drives the fence from the render thread.
pub struct TimelineFence {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan timeline semaphore handle.
    semaphore: vk::Semaphore,
}

impl TimelineFence {
    /// Creates a new timeline fence with the given initial counter value.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `initial_value` - Counter value the fence starts at
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>, initial_value: u64) -> RhiResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);

        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created timeline fence (initial value {})", initial_value);

        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    ///
    /// Use this to attach the fence to a command buffer submission's signal
    /// list together with a `vk::TimelineSemaphoreSubmitInfo` value.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }

    /// Reads the current completed value without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails (device loss).
    pub fn completed_value(&self) -> RhiResult<u64> {
        let value = unsafe {
            self.device
                .handle()
                .get_semaphore_counter_value(self.semaphore)?
        };
        Ok(value)
    }

    /// Enqueues a signal of `value` on the graphics queue.
    ///
    /// The counter reaches `value` once all work submitted to the queue before
    /// this call has completed. `value` must be greater than every value
    /// previously signaled on this fence.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission fails.
    pub fn signal(&self, value: u64) -> RhiResult<()> {
        let semaphores = [self.semaphore];
        let values = [value];

        let mut timeline_info =
            vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&values);
        let submit_info = vk::SubmitInfo::default()
            .signal_semaphores(&semaphores)
            .push_next(&mut timeline_info);

        debug!("Signaling fence value {}", value);

        // SAFETY: the submission carries no command buffers, only the
        // timeline signal.
        unsafe { self.device.submit_graphics(&[submit_info], vk::Fence::null()) }
    }

    /// Blocks the calling thread until the counter reaches `value`.
    ///
    /// Returns immediately without entering the OS wait when the counter has
    /// already passed `value`.
    ///
    /// # Arguments
    ///
    /// * `value` - Target counter value
    /// * `timeout` - Longest time to block for
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::FenceTimeout`] if the timeout elapses first, or
    /// another error if the wait itself fails.
    pub fn wait_until(&self, value: u64, timeout: Duration) -> RhiResult<()> {
        if self.completed_value()? >= value {
            return Ok(());
        }

        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);

        match unsafe {
            self.device
                .handle()
                .wait_semaphores(&wait_info, timeout_nanos(timeout))
        } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::FenceTimeout { value }),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for TimelineFence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed timeline fence");
    }
}

/// Converts a [`Duration`] to Vulkan wait nanoseconds, saturating at
/// `u64::MAX` (infinite).
fn timeout_nanos(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        assert_eq!(timeout_nanos(Duration::ZERO), 0);
        assert_eq!(timeout_nanos(Duration::from_secs(1)), 1_000_000_000);
        assert_eq!(timeout_nanos(Duration::from_nanos(42)), 42);
    }

    #[test]
    fn test_timeout_conversion_saturates() {
        assert_eq!(timeout_nanos(Duration::MAX), u64::MAX);
        assert_eq!(
            timeout_nanos(Duration::from_secs(u64::MAX / 1_000_000_000 + 1)),
            u64::MAX
        );
    }

    #[test]
    fn test_semaphore_is_send_sync() {
        // Compile-time check that Semaphore is Send + Sync
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
    }

    #[test]
    fn test_timeline_fence_is_send_sync() {
        // Compile-time check that TimelineFence is Send + Sync
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TimelineFence>();
    }
}
