//! Staged uploads into device-local memory.

use ash::vk;
use eden_gpu::command::execute_single_time_commands;
use eden_gpu::{CommandPool, GpuBuffer, GpuContext};
use gpu_allocator::MemoryLocation;

use crate::error::{RendererError, Result};

/// Host-visible buffer holding `data`, ready to be copied from.
pub fn create_staging_buffer(gpu: &GpuContext, data: &[u8], name: &str) -> Result<GpuBuffer> {
    let mut allocator = gpu.allocator().lock();
    let mut staging = allocator.create_buffer(
        data.len() as u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
        name,
    )?;
    if let Err(e) = staging.write_bytes(0, data) {
        let _ = allocator.free_buffer(&mut staging);
        return Err(e.into());
    }
    Ok(staging)
}

/// Copy `data` into a new device-local buffer with `usage`, blocking until
/// the transfer completes.
///
/// # Safety
/// The context and pool must be valid and belong together.
pub unsafe fn upload_staged_buffer(
    gpu: &GpuContext,
    pool: &CommandPool,
    data: &[u8],
    usage: vk::BufferUsageFlags,
    name: &str,
) -> Result<GpuBuffer> {
    let mut staging = create_staging_buffer(gpu, data, &format!("{name} staging"))?;

    let created = gpu.allocator().lock().create_buffer(
        data.len() as u64,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        MemoryLocation::GpuOnly,
        name,
    );

    let result: Result<GpuBuffer> = created.map_err(RendererError::from).and_then(|mut buffer| {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: data.len() as u64,
        };
        // SAFETY: caller guarantees valid handles; both buffers outlive the
        // blocking submission
        let copied = unsafe {
            execute_single_time_commands(gpu.device(), pool, gpu.queue(), |cmd| {
                gpu.device()
                    .cmd_copy_buffer(cmd, staging.buffer, buffer.buffer, &[region]);
            })
        };
        match copied {
            Ok(()) => Ok(buffer),
            Err(e) => {
                let _ = gpu.allocator().lock().free_buffer(&mut buffer);
                Err(e.into())
            }
        }
    });

    if let Err(e) = gpu.allocator().lock().free_buffer(&mut staging) {
        tracing::warn!("Failed to free staging buffer: {e}");
    }
    result
}
