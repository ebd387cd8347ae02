//! GPU resource groups owned by the renderer.
//!
//! Each group creates its objects in order and releases what it already
//! built when a later step fails, so a half-built group never escapes.

use ash::vk;
use eden_gpu::{
    command::CommandPool,
    descriptors::write_uniform_buffer,
    render_pass::destroy_framebuffers,
    create_framebuffers, create_render_pass, DepthBuffer, DescriptorPool,
    DescriptorSetLayoutBuilder, FrameSync, GpuBuffer, GpuContext, GraphicsPipeline,
    GraphicsPipelineConfig, ShaderSearch, SurfaceContext, Swapchain,
};
use gpu_allocator::MemoryLocation;
use tracing::{debug, info, warn};

use crate::camera::UniformBufferObject;
use crate::config::MAX_TEXTURE_SWITCHES_PER_FRAME;
use crate::error::{RendererError, Result};
use crate::geometry::cube_vertices;
use crate::upload::upload_staged_buffer;
use crate::vertex::{PushConstants, Vertex};

/// Swapchain, shared depth buffer, render pass and one framebuffer per image.
pub struct FrameTargets {
    pub swapchain: Swapchain,
    pub depth: DepthBuffer,
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl FrameTargets {
    /// # Safety
    /// `surface` must belong to `gpu`.
    pub unsafe fn new(
        gpu: &GpuContext,
        surface: &SurfaceContext,
        width: u32,
        height: u32,
        image_count: u32,
    ) -> Result<Self> {
        let device = gpu.device();
        // SAFETY: caller guarantees matching context and surface; objects
        // are destroyed in reverse on each failure path
        unsafe {
            let swapchain = surface.create_swapchain(gpu, width, height, image_count)?;
            if swapchain.image_count() as u32 != image_count {
                debug!(
                    "Requested {image_count} swapchain images, driver gave {}",
                    swapchain.image_count()
                );
            }

            let mut depth = match surface.create_depth_buffer(gpu, &swapchain) {
                Ok(depth) => depth,
                Err(e) => {
                    swapchain.destroy(device, &surface.swapchain_loader);
                    return Err(e.into());
                }
            };

            let render_pass = match create_render_pass(device, swapchain.format, depth.format) {
                Ok(render_pass) => render_pass,
                Err(e) => {
                    depth.destroy(gpu);
                    swapchain.destroy(device, &surface.swapchain_loader);
                    return Err(e.into());
                }
            };

            let framebuffers = match create_framebuffers(
                device,
                render_pass,
                &swapchain.image_views,
                depth.view,
                swapchain.extent,
            ) {
                Ok(framebuffers) => framebuffers,
                Err(e) => {
                    device.destroy_render_pass(render_pass, None);
                    depth.destroy(gpu);
                    swapchain.destroy(device, &surface.swapchain_loader);
                    return Err(e.into());
                }
            };

            info!(
                "Swapchain: {} images, {:?}, {}x{}, depth {:?}",
                swapchain.image_count(),
                swapchain.format,
                swapchain.extent.width,
                swapchain.extent.height,
                depth.format
            );

            Ok(Self {
                swapchain,
                depth,
                render_pass,
                framebuffers,
            })
        }
    }

    pub fn image_count(&self) -> u32 {
        self.swapchain.image_count() as u32
    }

    /// # Safety
    /// The device must be idle.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext, surface: &SurfaceContext) {
        let device = gpu.device();
        // SAFETY: caller guarantees nothing references these objects
        unsafe {
            destroy_framebuffers(device, &self.framebuffers);
            self.framebuffers.clear();
            device.destroy_render_pass(self.render_pass, None);
            self.depth.destroy(gpu);
            self.swapchain.destroy(device, &surface.swapchain_loader);
        }
    }
}

/// Camera uniforms at binding 0, the active texture at binding 1.
pub fn scene_set_layout() -> DescriptorSetLayoutBuilder<'static> {
    DescriptorSetLayoutBuilder::new()
        .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
        .sampled_image(1, vk::ShaderStageFlags::FRAGMENT)
}

/// Descriptor layout plus the solid and line pipelines built on it.
///
/// The two pipeline layouts are identical and therefore compatible, so
/// sets and push constants bound through the solid layout stay valid after
/// switching to the line pipeline.
pub struct ScenePipelines {
    pub set_layout: vk::DescriptorSetLayout,
    pub solid: GraphicsPipeline,
    pub line: GraphicsPipeline,
}

impl ScenePipelines {
    /// Fails with `ShaderNotFound` when the cube shaders are missing.
    ///
    /// # Safety
    /// `render_pass` must belong to `gpu`'s device.
    pub unsafe fn new(
        gpu: &GpuContext,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        shaders: &ShaderSearch,
    ) -> Result<Self> {
        let vertex_shader = shaders.load("cube.vert.spv")?;
        let fragment_shader = shaders.load("cube.frag.spv")?;
        let device = gpu.device();

        let solid_config = GraphicsPipelineConfig {
            vertex_shader,
            fragment_shader,
            vertex_bindings: Vertex::binding_descriptions(),
            vertex_attributes: Vertex::attribute_descriptions(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::NONE,
            depth_test: true,
            depth_write: true,
            static_extent: Some(extent),
            ..Default::default()
        };
        let line_config = GraphicsPipelineConfig {
            topology: vk::PrimitiveTopology::LINE_LIST,
            depth_test: false,
            depth_write: false,
            ..solid_config.clone()
        };
        let push_ranges = [PushConstants::range()];

        // SAFETY: caller guarantees a valid device and render pass
        unsafe {
            let set_layout = scene_set_layout().build(device)?;

            let solid = match GraphicsPipeline::new(
                device,
                render_pass,
                &solid_config,
                &[set_layout],
                &push_ranges,
            ) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    device.destroy_descriptor_set_layout(set_layout, None);
                    return Err(e.into());
                }
            };

            let line = match GraphicsPipeline::new(
                device,
                render_pass,
                &line_config,
                &[set_layout],
                &push_ranges,
            ) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    solid.destroy(device);
                    device.destroy_descriptor_set_layout(set_layout, None);
                    return Err(e.into());
                }
            };

            debug!("Solid and line pipelines created");
            Ok(Self {
                set_layout,
                solid,
                line,
            })
        }
    }

    /// # Safety
    /// The pipelines must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        // SAFETY: caller guarantees the pipelines are idle
        unsafe {
            self.line.destroy(device);
            self.solid.destroy(device);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

/// Command pool, one command buffer per image and the frame sync objects.
pub struct FrameCommands {
    pub pool: CommandPool,
    pub buffers: Vec<vk::CommandBuffer>,
    pub sync: FrameSync,
}

impl FrameCommands {
    /// # Safety
    /// The context must be valid.
    pub unsafe fn new(gpu: &GpuContext, image_count: u32) -> Result<Self> {
        let device = gpu.device();
        // SAFETY: caller guarantees a valid context
        unsafe {
            let pool = CommandPool::new(device, gpu.queue_family())?;
            let buffers = match pool.allocate(device, image_count) {
                Ok(buffers) => buffers,
                Err(e) => {
                    pool.destroy(device);
                    return Err(e.into());
                }
            };
            let sync = match FrameSync::new(device, image_count as usize) {
                Ok(sync) => sync,
                Err(e) => {
                    pool.destroy(device);
                    return Err(e.into());
                }
            };
            Ok(Self {
                pool,
                buffers,
                sync,
            })
        }
    }

    /// # Safety
    /// No submitted work may still reference these objects.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        // SAFETY: caller guarantees idleness; the pool frees its buffers
        unsafe {
            self.sync.destroy(device);
            self.pool.destroy(device);
        }
    }
}

/// Per-image uniforms and descriptor sets plus the shared vertex buffers.
///
/// Every image owns one base set and `MAX_TEXTURE_SWITCHES_PER_FRAME`
/// spare sets for texture changes while recording. All of them point at
/// that image's uniform buffer.
pub struct FrameBindings {
    pub descriptor_pool: DescriptorPool,
    pub base_sets: Vec<vk::DescriptorSet>,
    pub slot_sets: Vec<Vec<vk::DescriptorSet>>,
    pub uniforms: Vec<GpuBuffer>,
    pub cube: GpuBuffer,
    pub lines: GpuBuffer,
    pub colored_cubes: GpuBuffer,
}

impl FrameBindings {
    /// # Safety
    /// `set_layout` and `pool` must belong to `gpu`.
    pub unsafe fn new(
        gpu: &GpuContext,
        pool: &CommandPool,
        set_layout: vk::DescriptorSetLayout,
        image_count: u32,
        line_buffer_bytes: usize,
        colored_cube_buffer_bytes: usize,
    ) -> Result<Self> {
        let device = gpu.device();
        let sets_per_image = 1 + MAX_TEXTURE_SWITCHES_PER_FRAME as u32;
        let max_sets = image_count * sets_per_image;
        // SAFETY: caller guarantees a valid context
        let descriptor_pool =
            unsafe { DescriptorPool::for_layout(device, &scene_set_layout(), max_sets) }?;

        let mut buffers: Vec<GpuBuffer> = Vec::new();
        let built = (|| -> Result<_> {
            let mut allocator = gpu.allocator().lock();
            for i in 0..image_count {
                buffers.push(allocator.create_buffer(
                    UniformBufferObject::SIZE,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                    &format!("camera uniforms {i}"),
                )?);
            }
            buffers.push(allocator.create_buffer(
                line_buffer_bytes as u64,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                MemoryLocation::CpuToGpu,
                "line vertices",
            )?);
            buffers.push(allocator.create_buffer(
                colored_cube_buffer_bytes as u64,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                MemoryLocation::CpuToGpu,
                "colored cube vertices",
            )?);
            drop(allocator);

            let cube = cube_vertices();
            // SAFETY: caller guarantees the pool belongs to `gpu`
            buffers.push(unsafe {
                upload_staged_buffer(
                    gpu,
                    pool,
                    bytemuck::cast_slice(&cube),
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                    "cube vertices",
                )
            }?);

            // SAFETY: the pool was sized for `max_sets` sets of this layout
            let sets = unsafe { descriptor_pool.allocate(device, set_layout, max_sets as usize) }?;
            Ok(sets)
        })();

        let sets = match built {
            Ok(sets) => sets,
            Err(e) => {
                let mut allocator = gpu.allocator().lock();
                for buffer in &mut buffers {
                    if let Err(free_err) = allocator.free_buffer(buffer) {
                        warn!("Failed to free buffer during unwind: {free_err}");
                    }
                }
                drop(allocator);
                // SAFETY: no set from this pool was used
                unsafe { descriptor_pool.destroy(device) };
                return Err(e);
            }
        };

        let mut uniforms = buffers;
        let shared = uniforms.split_off(image_count as usize);
        let [lines, colored_cubes, cube]: [GpuBuffer; 3] = shared
            .try_into()
            .map_err(|_| RendererError::FrameState("missing shared vertex buffer"))?;

        let mut base_sets = Vec::with_capacity(image_count as usize);
        let mut slot_sets = Vec::with_capacity(image_count as usize);
        for (image, chunk) in sets.chunks(sets_per_image as usize).enumerate() {
            for &set in chunk {
                // SAFETY: sets and buffers were just created on this device
                unsafe {
                    write_uniform_buffer(
                        device,
                        set,
                        0,
                        uniforms[image].buffer,
                        UniformBufferObject::SIZE,
                    );
                }
            }
            base_sets.push(chunk[0]);
            slot_sets.push(chunk[1..].to_vec());
        }

        debug!(
            "Allocated {max_sets} descriptor sets and {} uniform buffers",
            uniforms.len()
        );

        Ok(Self {
            descriptor_pool,
            base_sets,
            slot_sets,
            uniforms,
            cube,
            lines,
            colored_cubes,
        })
    }

    /// # Safety
    /// No submitted work may still reference these objects.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext) {
        let mut allocator = gpu.allocator().lock();
        for buffer in self
            .uniforms
            .iter_mut()
            .chain([&mut self.cube, &mut self.lines, &mut self.colored_cubes])
        {
            if let Err(e) = allocator.free_buffer(buffer) {
                warn!("Failed to free buffer: {e}");
            }
        }
        drop(allocator);
        // SAFETY: caller guarantees the sets are idle
        unsafe { self.descriptor_pool.destroy(gpu.device()) };
    }
}
