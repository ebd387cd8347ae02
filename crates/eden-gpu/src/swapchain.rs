//! Swapchain creation, acquisition and presentation.
//!
//! Everything that depends only on what the surface reports is decided up
//! front by [`SwapchainPlan`], which keeps the Vulkan calls in
//! [`Swapchain::new`] straight-line and the choices testable.

use crate::error::{GpuError, Result};
use ash::vk;

/// Preferred presentation format.
const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Swapchain parameters derived from a surface's capabilities.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainPlan {
    pub surface_format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    /// Minimum image count handed to the driver.
    pub min_images: u32,
    pub transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainPlan {
    /// Decide format, extent and image count for a `width` x `height` window.
    ///
    /// The format is 8-bit BGRA UNORM with sRGB color space when offered,
    /// otherwise whatever the surface lists first. A surface that fixes its
    /// extent wins over the window size.
    pub fn new(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        formats: &[vk::SurfaceFormatKHR],
        width: u32,
        height: u32,
        requested_images: u32,
    ) -> Result<Self> {
        let surface_format = formats
            .iter()
            .copied()
            .find(|f| {
                f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
            })
            .or_else(|| formats.first().copied())
            .ok_or_else(|| GpuError::SwapchainCreation("surface reports no formats".into()))?;

        let extent = match capabilities.current_extent {
            vk::Extent2D {
                width: u32::MAX, ..
            } => {
                let (lo, hi) = (capabilities.min_image_extent, capabilities.max_image_extent);
                vk::Extent2D {
                    width: width.clamp(lo.width, hi.width),
                    height: height.clamp(lo.height, hi.height),
                }
            }
            fixed => fixed,
        };

        let mut min_images = requested_images.max(capabilities.min_image_count);
        // Zero means the surface has no upper limit.
        if capabilities.max_image_count != 0 {
            min_images = min_images.min(capabilities.max_image_count);
        }

        Ok(Self {
            surface_format,
            extent,
            min_images,
            transform: capabilities.current_transform,
        })
    }
}

/// Outcome of an image acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquiredImage {
    /// An image is ready for rendering.
    Ready { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface; no image was acquired.
    OutOfDate,
}

/// Swapchain images and their color views.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a FIFO swapchain following `plan`.
    ///
    /// # Safety
    /// All handles must be valid and `surface` must not already own a swapchain.
    pub unsafe fn new(
        device: &ash::Device,
        loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        plan: &SwapchainPlan,
    ) -> Result<Self> {
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(plan.min_images)
            .image_format(plan.surface_format.format)
            .image_color_space(plan.surface_format.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(plan.transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true);

        // SAFETY: caller guarantees valid handles
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let mut chain = Self {
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format: plan.surface_format.format,
            extent: plan.extent,
        };
        // SAFETY: the swapchain was just created on this device
        if let Err(e) = unsafe { chain.create_views(device, loader) } {
            // SAFETY: nothing has used the chain yet
            unsafe { chain.destroy(device, loader) };
            return Err(e);
        }

        tracing::info!(
            "Swapchain created: {}x{} {:?} ({} images, {} requested)",
            chain.extent.width,
            chain.extent.height,
            chain.format,
            chain.images.len(),
            plan.min_images
        );
        Ok(chain)
    }

    /// Fetch the images (the driver may return more than requested) and
    /// give each a color view.
    unsafe fn create_views(
        &mut self,
        device: &ash::Device,
        loader: &ash::khr::swapchain::Device,
    ) -> Result<()> {
        // SAFETY: forwarded from `new`
        self.images = unsafe { loader.get_swapchain_images(self.swapchain) }?;
        self.image_views.reserve(self.images.len());

        let color = vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .level_count(1)
            .layer_count(1);
        for &image in &self.images {
            let info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format)
                .subresource_range(color);
            // SAFETY: the image belongs to this swapchain
            self.image_views
                .push(unsafe { device.create_image_view(&info, None) }?);
        }
        Ok(())
    }

    /// Number of images in the chain.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height.max(1) as f32
    }

    /// Acquire the next image, signaling `fence` (no semaphore).
    ///
    /// # Safety
    /// All handles must be valid and `fence` must be unsignaled.
    pub unsafe fn acquire_next_image(
        &self,
        loader: &ash::khr::swapchain::Device,
        fence: vk::Fence,
        timeout_ns: u64,
    ) -> Result<AcquiredImage> {
        // SAFETY: caller guarantees valid handles
        let acquired = unsafe {
            loader.acquire_next_image(self.swapchain, timeout_ns, vk::Semaphore::null(), fence)
        };
        match acquired {
            Ok((index, suboptimal)) => Ok(AcquiredImage::Ready { index, suboptimal }),
            // No image and the fence stays unsignaled.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquiredImage::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    /// Queue `image_index` for presentation once `wait` is signaled.
    ///
    /// Returns `true` when the swapchain is suboptimal or out of date.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn present(
        &self,
        loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait: &[vk::Semaphore],
    ) -> Result<bool> {
        let swapchains = [self.swapchain];
        let indices = [image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait)
            .swapchains(&swapchains)
            .image_indices(&indices);

        // SAFETY: caller guarantees valid handles
        match unsafe { loader.queue_present(queue, &info) } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Destroy the views and the swapchain.
    ///
    /// # Safety
    /// The GPU must be done with every image.
    pub unsafe fn destroy(&self, device: &ash::Device, loader: &ash::khr::swapchain::Device) {
        // SAFETY: caller guarantees the swapchain is idle
        unsafe {
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREE_EXTENT: vk::Extent2D = vk::Extent2D {
        width: u32::MAX,
        height: u32::MAX,
    };

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: FREE_EXTENT,
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    fn srgb(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn plan(caps: &vk::SurfaceCapabilitiesKHR, w: u32, h: u32, images: u32) -> SwapchainPlan {
        SwapchainPlan::new(caps, &[srgb(vk::Format::B8G8R8A8_UNORM)], w, h, images).unwrap()
    }

    #[test]
    fn prefers_bgra_unorm() {
        let formats = [srgb(vk::Format::R8G8B8A8_SRGB), PREFERRED_FORMAT];
        let chosen = SwapchainPlan::new(&caps(2, 3), &formats, 64, 64, 3).unwrap();
        assert_eq!(chosen.surface_format.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [srgb(vk::Format::R8G8B8A8_SRGB), srgb(vk::Format::R16G16B16A16_SFLOAT)];
        let chosen = SwapchainPlan::new(&caps(2, 3), &formats, 64, 64, 3).unwrap();
        assert_eq!(chosen.surface_format.format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn no_formats_is_an_error() {
        assert!(SwapchainPlan::new(&caps(2, 3), &[], 64, 64, 3).is_err());
    }

    #[test]
    fn image_count_is_clamped() {
        assert_eq!(plan(&caps(2, 8), 1, 1, 3).min_images, 3);
        assert_eq!(plan(&caps(4, 8), 1, 1, 3).min_images, 4);
        assert_eq!(plan(&caps(1, 2), 1, 1, 3).min_images, 2);
        assert_eq!(plan(&caps(1, 0), 1, 1, 3).min_images, 3);
    }

    #[test]
    fn fixed_surface_extent_wins() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let extent = plan(&c, 1280, 720, 3).extent;
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn free_extent_clamps_window_size() {
        let extent = plan(&caps(2, 3), 10_000, 0, 3).extent;
        assert_eq!((extent.width, extent.height), (4096, 1));
    }

    #[test]
    fn transform_follows_surface() {
        let mut c = caps(2, 3);
        c.current_transform = vk::SurfaceTransformFlagsKHR::ROTATE_90;
        assert_eq!(plan(&c, 64, 64, 3).transform, vk::SurfaceTransformFlagsKHR::ROTATE_90);
    }
}
