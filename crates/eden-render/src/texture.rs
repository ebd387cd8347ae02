//! Sampled textures: decoding, lookup, upload and caching.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ash::vk;
use eden_gpu::command::execute_single_time_commands;
use eden_gpu::{CommandPool, GpuContext, GpuImage};
use gpu_allocator::MemoryLocation;

use crate::config::{DEFAULT_TEXTURE_CANDIDATES, TEXTURE_DIR_CANDIDATES};
use crate::error::{RendererError, Result};
use crate::upload::create_staging_buffer;

/// Format of every texture the renderer samples.
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Decoded RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// A single opaque white pixel.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        }
    }

    /// Decode any format the `image` crate understands.
    pub fn decode(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| RendererError::Texture {
            name: path.display().to_string(),
            message: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }
}

/// First existing default texture under any root.
pub fn find_default_texture(roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .flat_map(|root| DEFAULT_TEXTURE_CANDIDATES.iter().map(move |c| root.join(c)))
        .find(|path| path.is_file())
}

/// First existing texture directory under any root.
pub fn find_texture_dir(roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .flat_map(|root| TEXTURE_DIR_CANDIDATES.iter().map(move |c| root.join(c)))
        .find(|path| path.is_dir())
}

/// Resolve a texture name to a file inside the texture directory.
pub fn resolve_texture(roots: &[PathBuf], name: &str) -> Result<PathBuf> {
    let not_found = || RendererError::AssetNotFound {
        name: name.to_string(),
        searched: roots
            .iter()
            .flat_map(|root| TEXTURE_DIR_CANDIDATES.iter().map(move |c| root.join(c).join(name)))
            .collect(),
    };
    let dir = find_texture_dir(roots).ok_or_else(not_found)?;
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found())
    }
}

/// Name-keyed cache. Entries are kept until the cache is drained.
#[derive(Debug)]
pub struct TextureCache<T> {
    entries: HashMap<String, T>,
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Return the cached entry, loading and caching it on a miss.
    /// A failed load leaves the cache unchanged.
    pub fn get_or_load<F>(&mut self, name: &str, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(load()?)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (String, T)> + '_ {
        self.entries.drain()
    }
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A device-local RGBA texture and its view.
pub struct GpuTexture {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    /// Upload `rgba` into a new shader-readable image.
    ///
    /// # Safety
    /// The context and pool must be valid and belong together.
    pub unsafe fn upload(
        gpu: &GpuContext,
        pool: &CommandPool,
        rgba: &RgbaImage,
        name: &str,
    ) -> Result<Self> {
        check_pixel_count(rgba, name)?;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .extent(vk::Extent3D {
                width: rgba.width,
                height: rgba.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let mut image = gpu
            .allocator()
            .lock()
            .create_image(&image_info, MemoryLocation::GpuOnly, name)?;

        // SAFETY: caller guarantees valid handles; the image was created above
        let copied = unsafe {
            copy_pixels(
                gpu,
                pool,
                image.image,
                vk::ImageLayout::UNDEFINED,
                [0, 0],
                rgba,
                name,
            )
        };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(color_range());

        let view = copied.and_then(|()| {
            // SAFETY: image was just created on this device
            unsafe { gpu.device().create_image_view(&view_info, None) }
                .map_err(|e| RendererError::Gpu(e.into()))
        });

        match view {
            Ok(view) => Ok(Self {
                image,
                view,
                width: rgba.width,
                height: rgba.height,
            }),
            Err(e) => {
                let _ = gpu.allocator().lock().free_image(&mut image);
                Err(e)
            }
        }
    }

    /// Overwrite a sub-rectangle starting at `offset` with `rgba`.
    ///
    /// # Safety
    /// The context and pool must be valid and the texture must not be in
    /// use by pending GPU work.
    pub unsafe fn update_region(
        &self,
        gpu: &GpuContext,
        pool: &CommandPool,
        offset: [u32; 2],
        rgba: &RgbaImage,
    ) -> Result<()> {
        check_pixel_count(rgba, "texture patch")?;
        if offset[0] + rgba.width > self.width || offset[1] + rgba.height > self.height {
            return Err(RendererError::Texture {
                name: "texture patch".to_string(),
                message: format!(
                    "{}x{} at {:?} exceeds {}x{}",
                    rgba.width, rgba.height, offset, self.width, self.height
                ),
            });
        }
        // SAFETY: caller guarantees valid handles and an idle image
        unsafe {
            copy_pixels(
                gpu,
                pool,
                self.image.image,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                offset,
                rgba,
                "texture patch",
            )
        }
    }

    /// Destroy the view and release the image.
    ///
    /// # Safety
    /// The texture must not be in use.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext) {
        // SAFETY: caller guarantees the view is idle
        unsafe { gpu.device().destroy_image_view(self.view, None) };
        if let Err(e) = gpu.allocator().lock().free_image(&mut self.image) {
            tracing::warn!("Failed to free texture image: {e}");
        }
    }
}

fn check_pixel_count(rgba: &RgbaImage, name: &str) -> Result<()> {
    let expected = rgba.width as usize * rgba.height as usize * 4;
    if rgba.width == 0 || rgba.height == 0 || rgba.pixels.len() != expected {
        return Err(RendererError::Texture {
            name: name.to_string(),
            message: format!(
                "{} bytes for {}x{} RGBA",
                rgba.pixels.len(),
                rgba.width,
                rgba.height
            ),
        });
    }
    Ok(())
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1)
}

/// Stage `rgba`, copy it into `image` at `offset` and leave the image in
/// shader-read layout.
unsafe fn copy_pixels(
    gpu: &GpuContext,
    pool: &CommandPool,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    offset: [u32; 2],
    rgba: &RgbaImage,
    name: &str,
) -> Result<()> {
    let mut staging = create_staging_buffer(gpu, &rgba.pixels, &format!("{name} staging"))?;
    let device = gpu.device();

    let (src_access, src_stage) = if old_layout == vk::ImageLayout::UNDEFINED {
        (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE)
    } else {
        (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        )
    };

    let to_transfer = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_range())
        .src_access_mask(src_access)
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

    let to_shader = vk::ImageMemoryBarrier::default()
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_range())
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ);

    let region = vk::BufferImageCopy::default()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(
            vk::ImageSubresourceLayers::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .mip_level(0)
                .base_array_layer(0)
                .layer_count(1),
        )
        .image_offset(vk::Offset3D {
            x: offset[0] as i32,
            y: offset[1] as i32,
            z: 0,
        })
        .image_extent(vk::Extent3D {
            width: rgba.width,
            height: rgba.height,
            depth: 1,
        });

    // SAFETY: caller guarantees valid handles; staging outlives the
    // blocking submission
    let result = unsafe {
        execute_single_time_commands(device, pool, gpu.queue(), |cmd| {
            device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );
            device.cmd_copy_buffer_to_image(
                cmd,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader],
            );
        })
    };

    if let Err(e) = gpu.allocator().lock().free_buffer(&mut staging) {
        tracing::warn!("Failed to free staging buffer: {e}");
    }
    result.map_err(Into::into)
}

/// Linear filtering, clamp-to-edge addressing, no anisotropy.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_sampler(device: &ash::Device) -> Result<vk::Sampler> {
    let info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .min_lod(0.0)
        .max_lod(0.0);
    // SAFETY: caller guarantees a valid device
    let sampler = unsafe { device.create_sampler(&info, None) }.map_err(eden_gpu::GpuError::from)?;
    Ok(sampler)
}
