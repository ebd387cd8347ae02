//! Depth buffer shared by every framebuffer.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::memory::GpuImage;
use ash::vk;
use gpu_allocator::MemoryLocation;

/// Depth formats in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Pick the first candidate whose optimal-tiling features allow depth/stencil
/// attachment use.
pub fn first_supported_depth_format(
    candidates: &[vk::Format],
    mut optimal_features: impl FnMut(vk::Format) -> vk::FormatFeatureFlags,
) -> Result<vk::Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| {
            optimal_features(format).contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| GpuError::NoDepthFormat(candidates.to_vec()))
}

/// Query the device for the preferred depth format.
pub fn select_depth_format(gpu: &GpuContext) -> Result<vk::Format> {
    first_supported_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| unsafe {
        gpu.instance()
            .get_physical_device_format_properties(gpu.physical_device(), format)
            .optimal_tiling_features
    })
}

/// Depth image plus its view.
pub struct DepthBuffer {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

impl DepthBuffer {
    /// Allocate a device-local depth image of `extent`.
    ///
    /// # Safety
    /// The GPU context must be valid.
    pub unsafe fn new(gpu: &GpuContext, extent: vk::Extent2D) -> Result<Self> {
        let format = select_depth_format(gpu)?;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let mut image = gpu
            .allocator()
            .lock()
            .create_image(&image_info, MemoryLocation::GpuOnly, "depth buffer")?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        // SAFETY: image was just created on this device
        let view = match unsafe { gpu.device().create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                let _ = gpu.allocator().lock().free_image(&mut image);
                return Err(GpuError::from(e));
            }
        };

        tracing::debug!("Depth buffer: {:?} {}x{}", format, extent.width, extent.height);

        Ok(Self {
            image,
            view,
            format,
        })
    }

    /// Destroy the view and release the image.
    ///
    /// # Safety
    /// The depth buffer must not be in use.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext) {
        // SAFETY: caller guarantees the view is idle
        unsafe {
            gpu.device().destroy_image_view(self.view, None);
        }
        if let Err(e) = gpu.allocator().lock().free_image(&mut self.image) {
            tracing::warn!("Failed to free depth image: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_candidate() {
        let chosen = first_supported_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
            if format == vk::Format::D32_SFLOAT {
                vk::FormatFeatureFlags::SAMPLED_IMAGE
            } else {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            }
        })
        .unwrap();
        assert_eq!(chosen, vk::Format::D32_SFLOAT_S8_UINT);
    }

    #[test]
    fn prefers_d32_when_available() {
        let chosen = first_supported_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| {
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        })
        .unwrap();
        assert_eq!(chosen, vk::Format::D32_SFLOAT);
    }

    #[test]
    fn no_candidate_is_an_error() {
        let err = first_supported_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| {
            vk::FormatFeatureFlags::empty()
        })
        .unwrap_err();
        assert!(matches!(err, GpuError::NoDepthFormat(ref formats) if formats.len() == 3));
    }
}
