//! Command pools, recording and submission.

use crate::error::{GpuError, Result};
use crate::sync::{create_fence, wait_for_fence};
use ash::vk;
use tracing::warn;

fn one_time_begin() -> vk::CommandBufferBeginInfo<'static> {
    vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
}

/// Command pool for one queue family. Buffers can be reset one at a time.
pub struct CommandPool {
    pool: vk::CommandPool,
}

impl CommandPool {
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family);
        // SAFETY: caller guarantees a valid device
        let pool = unsafe { device.create_command_pool(&info, None) }?;
        Ok(Self { pool })
    }

    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Allocate `count` primary command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate(&self, device: &ash::Device, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        // SAFETY: caller guarantees a valid device
        Ok(unsafe { device.allocate_command_buffers(&info) }?)
    }

    /// Destroy the pool along with every buffer allocated from it.
    ///
    /// # Safety
    /// No buffer from this pool may be pending.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        // SAFETY: caller guarantees the pool is idle
        unsafe { device.destroy_command_pool(self.pool, None) };
    }
}

/// Reset `cmd` and begin recording it for a single submission.
///
/// # Safety
/// The device and command buffer must be valid and not pending.
pub unsafe fn restart_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    // SAFETY: caller guarantees valid handles
    unsafe {
        device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
        device.begin_command_buffer(cmd, &one_time_begin())?;
    }
    Ok(())
}

/// Submit `cmd` with no wait semaphores, signaling `signal` and `fence`
/// on completion.
///
/// # Safety
/// All handles must be valid and `cmd` must have finished recording.
pub unsafe fn submit(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    signal: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let buffers = [cmd];
    let info = vk::SubmitInfo::default()
        .command_buffers(&buffers)
        .signal_semaphores(signal);
    // SAFETY: caller guarantees valid handles
    unsafe { device.queue_submit(queue, &[info], fence) }?;
    Ok(())
}

/// Where a one-shot buffer stands relative to the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShotState {
    Recording,
    /// Submitted, completion not observed.
    Pending,
    Retired,
}

impl ShotState {
    /// A pending buffer may still be executing and must not be freed until
    /// the device drains.
    fn must_drain(self) -> bool {
        self == Self::Pending
    }
}

/// A throwaway command buffer and the fence that reports its completion.
/// Both are released on drop.
struct OneShot<'a> {
    device: &'a ash::Device,
    pool: vk::CommandPool,
    cmd: vk::CommandBuffer,
    fence: vk::Fence,
    state: ShotState,
}

impl<'a> OneShot<'a> {
    unsafe fn new(device: &'a ash::Device, pool: &CommandPool) -> Result<Self> {
        // SAFETY: forwarded from `execute_single_time_commands`
        let cmd = unsafe { pool.allocate(device, 1) }?
            .pop()
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY))?;
        let mut shot = Self {
            device,
            pool: pool.handle(),
            cmd,
            fence: vk::Fence::null(),
            state: ShotState::Recording,
        };
        // SAFETY: as above; `Drop` frees `cmd` if this fails
        shot.fence = unsafe { create_fence(device, false) }?;
        Ok(shot)
    }
}

impl Drop for OneShot<'_> {
    fn drop(&mut self) {
        if self.state.must_drain() {
            // SAFETY: the device outlives the guard
            if let Err(e) = unsafe { self.device.device_wait_idle() } {
                warn!("device_wait_idle before freeing a one-shot buffer failed: {e}");
            }
        }
        // SAFETY: the buffer never ran, or its completion was observed
        unsafe {
            if self.fence != vk::Fence::null() {
                self.device.destroy_fence(self.fence, None);
            }
            self.device.free_command_buffers(self.pool, &[self.cmd]);
        }
    }
}

/// Record `f` into a fresh command buffer, submit it and block until the
/// GPU has finished.
///
/// # Safety
/// All handles must be valid and `pool` must belong to `queue`'s family.
pub unsafe fn execute_single_time_commands<F, R>(
    device: &ash::Device,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<R>
where
    F: FnOnce(vk::CommandBuffer) -> R,
{
    // SAFETY: caller guarantees valid handles
    let mut shot = unsafe { OneShot::new(device, pool) }?;
    // SAFETY: `shot.cmd` is freshly allocated and owned here until the fence wait
    unsafe {
        device.begin_command_buffer(shot.cmd, &one_time_begin())?;
        let value = f(shot.cmd);
        device.end_command_buffer(shot.cmd)?;
        submit(device, queue, shot.cmd, &[], shot.fence)?;
        shot.state = ShotState::Pending;
        wait_for_fence(device, shot.fence, u64::MAX)?;
        shot.state = ShotState::Retired;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_shots_drain_the_device() {
        assert!(!ShotState::Recording.must_drain());
        assert!(ShotState::Pending.must_drain());
        assert!(!ShotState::Retired.must_drain());
    }
}
