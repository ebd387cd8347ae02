//! The window surface and the per-surface objects built on it.

use crate::context::GpuContext;
use crate::depth::DepthBuffer;
use crate::error::{GpuError, Result};
use crate::swapchain::{Swapchain, SwapchainPlan};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A window surface together with the surface and swapchain loaders.
pub struct SurfaceContext {
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
    pub swapchain_loader: ash::khr::swapchain::Device,
}

impl SurfaceContext {
    /// Create the raw surface for `window`.
    ///
    /// # Safety
    /// The instance must have been created with the window's surface extensions.
    pub(crate) unsafe fn create_surface<W>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
    ) -> Result<(vk::SurfaceKHR, ash::khr::surface::Instance)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let handle_error = |e: raw_window_handle::HandleError| {
            GpuError::SurfaceCreation(format!("window handle unavailable: {e}"))
        };
        let display = window.display_handle().map_err(handle_error)?.as_raw();
        let raw_window = window.window_handle().map_err(handle_error)?.as_raw();

        // SAFETY: caller guarantees a compatible instance; the handles are live
        let surface =
            unsafe { ash_window::create_surface(entry, instance, display, raw_window, None) }
                .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        Ok((surface, ash::khr::surface::Instance::new(entry, instance)))
    }

    pub(crate) fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
    ) -> Self {
        Self {
            surface,
            surface_loader,
            swapchain_loader: ash::khr::swapchain::Device::new(instance, device),
        }
    }

    /// Query the surface and decide how to build a swapchain for a
    /// `width` x `height` window.
    pub fn plan_swapchain(
        &self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
        image_count: u32,
    ) -> Result<SwapchainPlan> {
        let physical = gpu.physical_device();
        // SAFETY: the surface and physical device belong to the same instance
        let (capabilities, formats) = unsafe {
            (
                self.surface_loader
                    .get_physical_device_surface_capabilities(physical, self.surface)?,
                self.surface_loader
                    .get_physical_device_surface_formats(physical, self.surface)?,
            )
        };
        SwapchainPlan::new(&capabilities, &formats, width, height, image_count)
    }

    /// Create a FIFO swapchain. `image_count` is clamped to what the
    /// surface allows.
    ///
    /// # Safety
    /// The GPU context must be valid and no other swapchain may exist for
    /// this surface.
    pub unsafe fn create_swapchain(
        &self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
        image_count: u32,
    ) -> Result<Swapchain> {
        let plan = self.plan_swapchain(gpu, width, height, image_count)?;
        // SAFETY: caller guarantees a valid context; the loader belongs to it
        unsafe { Swapchain::new(gpu.device(), &self.swapchain_loader, self.surface, &plan) }
    }

    /// Depth attachment sized to `swapchain`.
    ///
    /// # Safety
    /// The GPU context must be valid.
    pub unsafe fn create_depth_buffer(
        &self,
        gpu: &GpuContext,
        swapchain: &Swapchain,
    ) -> Result<DepthBuffer> {
        // SAFETY: forwarded from caller
        unsafe { DepthBuffer::new(gpu, swapchain.extent) }
    }

    /// # Safety
    /// The swapchain built on this surface must already be destroyed.
    pub unsafe fn destroy(&self) {
        // SAFETY: caller guarantees nothing uses the surface
        unsafe { self.surface_loader.destroy_surface(self.surface, None) };
    }
}
