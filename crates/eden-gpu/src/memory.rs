//! Buffers and images backed by gpu-allocator.
//!
//! Host-visible (`CpuToGpu`) buffers stay persistently mapped, so uniform,
//! line and vertex writes are plain memcpys.

use crate::error::{GpuError, Result};
use ash::vk;
use bytemuck::Pod;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocationSizes, AllocatorDebugSettings, MemoryLocation};
use std::sync::Arc;

fn allocation_error(name: &str, e: impl std::fmt::Display) -> GpuError {
    GpuError::AllocationFailed(format!("{name}: {e}"))
}

/// Owns the device allocator. Dropped (or shut down) before the device.
pub struct GpuAllocator {
    allocator: Option<Allocator>,
    device: Arc<ash::Device>,
}

impl GpuAllocator {
    /// # Safety
    /// `instance`, `device` and `physical_device` must be valid and related.
    pub unsafe fn new(
        instance: &ash::Instance,
        device: Arc<ash::Device>,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let debug_settings = AllocatorDebugSettings {
            log_memory_information: cfg!(debug_assertions),
            log_leaks_on_shutdown: true,
            ..AllocatorDebugSettings::default()
        };
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: (*device).clone(),
            physical_device,
            debug_settings,
            buffer_device_address: false,
            allocation_sizes: AllocationSizes::default(),
        })
        .map_err(|e| allocation_error("allocator", e))?;

        Ok(Self {
            allocator: Some(allocator),
            device,
        })
    }

    /// Allocate memory for `requirements`, then bind it with `bind`.
    /// The allocation is released again if binding fails.
    fn allocate_bound(
        &mut self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
        bind: impl FnOnce(&ash::Device, &Allocation) -> ash::prelude::VkResult<()>,
    ) -> Result<Allocation> {
        let allocator = self
            .allocator
            .as_mut()
            .ok_or_else(|| GpuError::InvalidState("allocator already shut down".into()))?;
        let allocation = allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| allocation_error(name, e))?;

        match bind(&self.device, &allocation) {
            Ok(()) => Ok(allocation),
            Err(e) => {
                let _ = allocator.free(allocation);
                Err(e.into())
            }
        }
    }

    fn release(&mut self, allocation: Option<Allocation>) -> Result<()> {
        match (allocation, self.allocator.as_mut()) {
            (Some(allocation), Some(allocator)) => allocator
                .free(allocation)
                .map_err(|e| allocation_error("free", e)),
            _ => Ok(()),
        }
    }

    /// Create a buffer. `CpuToGpu` buffers come back mapped.
    pub fn create_buffer(
        &mut self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<GpuBuffer> {
        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        // SAFETY: the device outlives this allocator
        let buffer = unsafe { self.device.create_buffer(&info, None) }?;
        // SAFETY: `buffer` was just created on this device
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocated = self.allocate_bound(name, requirements, location, true, |device, a| {
            // SAFETY: fresh buffer, memory sized from its requirements
            unsafe { device.bind_buffer_memory(buffer, a.memory(), a.offset()) }
        });
        match allocated {
            Ok(allocation) => Ok(GpuBuffer {
                buffer,
                allocation: Some(allocation),
                size,
            }),
            Err(e) => {
                // SAFETY: never bound or used
                unsafe { self.device.destroy_buffer(buffer, None) };
                Err(e)
            }
        }
    }

    /// Release a buffer and its memory. Safe to call twice.
    pub fn free_buffer(&mut self, buffer: &mut GpuBuffer) -> Result<()> {
        let freed = self.release(buffer.allocation.take());
        if buffer.buffer != vk::Buffer::null() {
            // SAFETY: caller guarantees the GPU no longer uses the buffer
            unsafe { self.device.destroy_buffer(buffer.buffer, None) };
            buffer.buffer = vk::Buffer::null();
        }
        freed
    }

    /// Create an optimally tiled image.
    pub fn create_image(
        &mut self,
        create_info: &vk::ImageCreateInfo,
        location: MemoryLocation,
        name: &str,
    ) -> Result<GpuImage> {
        // SAFETY: the device outlives this allocator
        let image = unsafe { self.device.create_image(create_info, None) }?;
        // SAFETY: `image` was just created on this device
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let allocated = self.allocate_bound(name, requirements, location, false, |device, a| {
            // SAFETY: fresh image, memory sized from its requirements
            unsafe { device.bind_image_memory(image, a.memory(), a.offset()) }
        });
        match allocated {
            Ok(allocation) => Ok(GpuImage {
                image,
                allocation: Some(allocation),
                format: create_info.format,
                extent: create_info.extent,
            }),
            Err(e) => {
                // SAFETY: never bound or used
                unsafe { self.device.destroy_image(image, None) };
                Err(e)
            }
        }
    }

    /// Release an image and its memory. Safe to call twice.
    pub fn free_image(&mut self, image: &mut GpuImage) -> Result<()> {
        let freed = self.release(image.allocation.take());
        if image.image != vk::Image::null() {
            // SAFETY: caller guarantees the GPU no longer uses the image
            unsafe { self.device.destroy_image(image.image, None) };
            image.image = vk::Image::null();
        }
        freed
    }

    /// Drop the allocator; anything still allocated is reported as a leak.
    pub fn shutdown(&mut self) {
        self.allocator = None;
    }
}

impl Drop for GpuAllocator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A buffer plus its memory. `size` is the requested byte size.
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Option<Allocation>,
    pub size: u64,
}

impl GpuBuffer {
    pub fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .map(|p| p.as_ptr().cast::<u8>())
    }

    /// Copy `data` to the start of a mapped buffer.
    pub fn write<T: Pod>(&self, data: &[T]) -> Result<()> {
        self.write_bytes(0, bytemuck::cast_slice(data))
    }

    /// Copy `data` to `offset` in a mapped buffer. Writes past the end are
    /// rejected rather than truncated.
    pub fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        let ptr = self
            .mapped_ptr()
            .ok_or_else(|| GpuError::InvalidState("buffer is not host visible".into()))?;
        let fits = offset
            .checked_add(data.len() as u64)
            .is_some_and(|end| end <= self.size);
        if !fits {
            return Err(GpuError::InvalidState(format!(
                "{} bytes at offset {offset} overrun a {} byte buffer",
                data.len(),
                self.size
            )));
        }

        // SAFETY: the range lies inside the mapped allocation
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
        }
        Ok(())
    }
}

/// An image plus its memory.
pub struct GpuImage {
    pub image: vk::Image,
    pub allocation: Option<Allocation>,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
}
