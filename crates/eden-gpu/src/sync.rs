//! Fences and semaphores.

use crate::error::{GpuError, Result};
use ash::vk;
use tracing::warn;

/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    // SAFETY: caller guarantees a valid device
    Ok(unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }?)
}

/// Create a fence, optionally already signaled.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    let info = vk::FenceCreateInfo::default().flags(flags);
    // SAFETY: caller guarantees a valid device
    Ok(unsafe { device.create_fence(&info, None) }?)
}

/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(device: &ash::Device, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
    // SAFETY: caller guarantees valid handles
    unsafe { device.wait_for_fences(&[fence], true, timeout_ns) }?;
    Ok(())
}

/// Fences and semaphores for the single frame in flight.
///
/// `in_flight` gates the whole frame and starts signaled so the first wait
/// returns at once. Image acquisition signals `acquire` instead of a
/// semaphore. One `render_finished` semaphore per swapchain image orders
/// presentation after rendering.
pub struct FrameSync {
    pub in_flight: vk::Fence,
    pub acquire: vk::Fence,
    pub render_finished: Vec<vk::Semaphore>,
}

impl FrameSync {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, image_count: usize) -> Result<Self> {
        let mut sync = Self {
            in_flight: vk::Fence::null(),
            acquire: vk::Fence::null(),
            render_finished: Vec::with_capacity(image_count),
        };
        // SAFETY: caller guarantees a valid device
        let created = unsafe { sync.create_objects(device, image_count) };
        if let Err(e) = created {
            // SAFETY: nothing was submitted; null handles are ignored
            unsafe { sync.destroy(device) };
            return Err(e);
        }
        Ok(sync)
    }

    unsafe fn create_objects(&mut self, device: &ash::Device, image_count: usize) -> Result<()> {
        // SAFETY: forwarded from `new`
        unsafe {
            self.in_flight = create_fence(device, true)?;
            self.acquire = create_fence(device, false)?;
            while self.render_finished.len() < image_count {
                self.render_finished.push(create_semaphore(device)?);
            }
        }
        Ok(())
    }

    /// Wait for the previous frame to retire, then arm the acquire fence.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn prepare_acquire(&self, device: &ash::Device) -> Result<()> {
        // SAFETY: caller guarantees a valid device; the acquire fence is idle
        // once the previous frame has retired
        unsafe {
            wait_for_fence(device, self.in_flight, u64::MAX)?;
            device.reset_fences(&[self.acquire])?;
        }
        Ok(())
    }

    /// Block until the image handed out by the last acquire is usable.
    ///
    /// # Safety
    /// An acquire signaling `self.acquire` must have succeeded.
    pub unsafe fn wait_acquired(&self, device: &ash::Device) -> Result<()> {
        // SAFETY: forwarded from caller
        unsafe { wait_for_fence(device, self.acquire, u64::MAX) }
    }

    /// Unsignal the frame fence and hand it to `submit`. If the submission
    /// fails the fence is replaced by a signaled one, so the next
    /// `prepare_acquire` does not wait forever on work that never ran.
    ///
    /// # Safety
    /// The device must be valid and the fence must not be pending.
    pub unsafe fn submit_signaling_in_flight(
        &mut self,
        device: &ash::Device,
        submit: impl FnOnce(vk::Fence) -> Result<()>,
    ) -> Result<()> {
        let fence = self.in_flight;
        with_fence_restored(
            // SAFETY: caller guarantees a valid, idle fence
            || unsafe { device.reset_fences(&[fence]) }.map_err(GpuError::from),
            || submit(fence),
            // SAFETY: the failed submission left the fence unused
            || unsafe { self.restore_in_flight(device) },
        )
    }

    unsafe fn restore_in_flight(&mut self, device: &ash::Device) {
        // SAFETY: forwarded from `submit_signaling_in_flight`
        match unsafe { create_fence(device, true) } {
            Ok(fence) => {
                // SAFETY: the old fence is unsignaled and not pending
                unsafe { device.destroy_fence(self.in_flight, None) };
                self.in_flight = fence;
            }
            Err(e) => warn!("Cannot restore the frame fence: {e}"),
        }
    }

    /// Semaphore for swapchain image `index`.
    pub fn render_finished(&self, index: u32) -> vk::Semaphore {
        self.render_finished[index as usize]
    }

    /// # Safety
    /// None of the objects may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        // SAFETY: caller guarantees the objects are idle; null handles are ignored
        unsafe {
            for &semaphore in &self.render_finished {
                device.destroy_semaphore(semaphore, None);
            }
            device.destroy_fence(self.acquire, None);
            device.destroy_fence(self.in_flight, None);
        }
    }
}

/// `reset`, then `submit`; `restore` runs only when `submit` fails.
fn with_fence_restored<E>(
    reset: impl FnOnce() -> std::result::Result<(), E>,
    submit: impl FnOnce() -> std::result::Result<(), E>,
    restore: impl FnOnce(),
) -> std::result::Result<(), E> {
    reset()?;
    submit().inspect_err(|_| restore())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fence stand-in: `true` while signaled.
    fn guarded(signaled: &Cell<bool>, submit_ok: bool) -> std::result::Result<(), &'static str> {
        with_fence_restored(
            || {
                signaled.set(false);
                Ok(())
            },
            || if submit_ok { Ok(()) } else { Err("device lost") },
            || signaled.set(true),
        )
    }

    #[test]
    fn failed_submit_leaves_fence_signaled() {
        let fence = Cell::new(true);
        assert_eq!(guarded(&fence, false), Err("device lost"));
        assert!(fence.get());
    }

    #[test]
    fn successful_submit_leaves_fence_to_the_gpu() {
        let fence = Cell::new(true);
        assert_eq!(guarded(&fence, true), Ok(()));
        assert!(!fence.get());
    }

    #[test]
    fn failed_reset_skips_submit() {
        let submitted = Cell::new(false);
        let restored = Cell::new(false);
        let result = with_fence_restored(
            || Err("reset failed"),
            || {
                submitted.set(true);
                Ok(())
            },
            || restored.set(true),
        );
        assert_eq!(result, Err("reset failed"));
        assert!(!submitted.get());
        assert!(!restored.get());
    }
}
