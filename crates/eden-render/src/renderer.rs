//! The renderer: one object owning every GPU resource, driving the
//! begin-frame / draw / end-frame protocol.

use ash::vk;
use eden_core::{Pose, Ray};
use eden_gpu::{
    command::{restart_command_buffer, submit},
    descriptors::write_combined_image_sampler,
    AcquiredImage, GpuContext, GpuContextBuilder, GpuError, ShaderSearch, SurfaceContext,
};
use glam::{Vec2, Vec3};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};

use crate::camera::CameraState;
use crate::config::RendererConfig;
use crate::draw::{self, CommandRecorder, VkRecorder};
use crate::error::{RendererError, Result};
use crate::frame::FrameState;
use crate::geometry::{ground_grid_lines, origin_axes, wireframe_box_edges};
use crate::mesh::ParsedMesh;
use crate::mesh_store::{Mesh, MeshId, MeshStore};
use crate::overlay::Overlay;
use crate::overlay_pass::OverlayPass;
use crate::resources::{FrameBindings, FrameCommands, FrameTargets, ScenePipelines};
use crate::texture::{
    create_sampler, find_default_texture, resolve_texture, GpuTexture, RgbaImage, TextureCache,
};
use crate::upload::upload_staged_buffer;
use crate::vertex::Vertex;

/// Overlay model and the pass that paints it.
pub struct OverlayLayer {
    pub ui: Overlay,
    pass: OverlayPass,
}

/// Immediate-mode renderer with one frame in flight.
///
/// Fields are torn down in `Drop` in reverse creation order; the GPU
/// context is declared last so it outlives everything else.
pub struct Renderer {
    config: RendererConfig,
    camera: CameraState,
    frame: FrameState,
    meshes: MeshStore<eden_gpu::GpuBuffer>,
    textures: TextureCache<GpuTexture>,
    active_texture: vk::ImageView,
    overlay: Option<OverlayLayer>,
    default_texture: GpuTexture,
    sampler: vk::Sampler,
    bindings: FrameBindings,
    commands: FrameCommands,
    pipelines: ScenePipelines,
    targets: FrameTargets,
    surface: SurfaceContext,
    gpu: GpuContext,
}

impl Renderer {
    /// Create the renderer for `window`, whose drawable is `width`×`height`
    /// pixels.
    pub fn new<W>(window: &W, width: u32, height: u32, config: RendererConfig) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let (gpu, surface) = GpuContextBuilder::new()
            .app_name(config.app_name.clone())
            .validation(config.validation)
            .build(window)?;
        let shaders = ShaderSearch::new(config.asset_roots.iter().cloned());

        let mut partial = PartialRenderer {
            gpu: &gpu,
            surface: &surface,
            targets: None,
            pipelines: None,
            commands: None,
            bindings: None,
            sampler: None,
            default_texture: None,
            armed: true,
        };

        // SAFETY: every object below is created on `gpu`'s device; the
        // partial guard destroys whatever exists if a step fails
        let (render_pass, srgb) = unsafe {
            let targets = partial.targets.insert(FrameTargets::new(
                &gpu,
                &surface,
                width,
                height,
                config.image_count,
            )?);
            let image_count = targets.image_count();
            let render_pass = targets.render_pass;
            let extent = targets.swapchain.extent;
            let srgb = is_srgb(targets.swapchain.format);

            let pipelines = partial.pipelines.insert(ScenePipelines::new(
                &gpu,
                render_pass,
                extent,
                &shaders,
            )?);
            let set_layout = pipelines.set_layout;

            let commands = partial
                .commands
                .insert(FrameCommands::new(&gpu, image_count)?);
            partial.bindings = Some(FrameBindings::new(
                &gpu,
                &commands.pool,
                set_layout,
                image_count,
                config.line_buffer_bytes,
                config.colored_cube_buffer_bytes,
            )?);

            partial.sampler = Some(create_sampler(gpu.device())?);
            partial.default_texture =
                Some(load_default_texture(&gpu, &commands.pool, &config)?);
            (render_pass, srgb)
        };

        // SAFETY: the render pass was created on this device above
        let overlay = match unsafe { OverlayPass::new(&gpu, render_pass, srgb) } {
            Ok(pass) => Some(OverlayLayer {
                ui: Overlay::new(),
                pass,
            }),
            Err(e) => {
                warn!("Overlay disabled: {e}");
                None
            }
        };

        let parts = (
            partial.targets.take(),
            partial.pipelines.take(),
            partial.commands.take(),
            partial.bindings.take(),
            partial.sampler.take(),
            partial.default_texture.take(),
        );
        let (
            Some(targets),
            Some(pipelines),
            Some(commands),
            Some(bindings),
            Some(sampler),
            Some(default_texture),
        ) = parts
        else {
            return Err(RendererError::FrameState("renderer initialization incomplete"));
        };
        partial.armed = false;
        drop(partial);

        let image_count = targets.image_count();
        let aspect = targets.swapchain.aspect_ratio();
        let active_texture = default_texture.view;
        info!("Renderer ready ({image_count} images)");

        Ok(Self {
            camera: CameraState::new(aspect),
            frame: FrameState::new(
                image_count,
                config.line_buffer_bytes,
                config.colored_cube_buffer_bytes,
            ),
            meshes: MeshStore::new(),
            textures: TextureCache::new(),
            active_texture,
            overlay,
            default_texture,
            sampler,
            bindings,
            commands,
            pipelines,
            targets,
            surface,
            gpu,
            config,
        })
    }

    /// Start a frame. Returns `false` when the swapchain could not provide
    /// an image; the frame is then skipped and draw calls are ignored until
    /// the next begin.
    pub fn begin_frame(&mut self) -> Result<bool> {
        if self.frame.is_recording() {
            return Err(RendererError::FrameState("begin_frame while recording"));
        }
        let device = self.gpu.device();
        let sync = &self.commands.sync;

        // SAFETY: handles belong to this renderer; the previous frame's
        // submission is waited on before anything is reused
        let acquired = unsafe {
            sync.prepare_acquire(device)?;
            let acquired = self.targets.swapchain.acquire_next_image(
                &self.surface.swapchain_loader,
                sync.acquire,
                u64::MAX,
            )?;
            if matches!(acquired, AcquiredImage::Ready { .. }) {
                sync.wait_acquired(device)?;
            }
            acquired
        };

        let Some(image) = self.frame.begin(acquired)? else {
            debug!("Swapchain out of date, skipping frame");
            return Ok(false);
        };

        if let Err(e) = self.start_recording(image) {
            self.frame.abort();
            return Err(e);
        }
        Ok(true)
    }

    fn start_recording(&mut self, image: u32) -> Result<()> {
        let i = image as usize;
        let device = self.gpu.device();
        let cmd = self.commands.buffers[i];
        let set = self.bindings.base_sets[i];

        self.bindings.uniforms[i].write(&[self.camera.uniforms()])?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.targets.render_pass)
            .framebuffer(self.targets.framebuffers[i])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: self.targets.swapchain.extent,
            })
            .clear_values(&clear_values);

        // SAFETY: the in-flight fence was waited, so neither the base set
        // nor the command buffer is in use
        unsafe {
            write_combined_image_sampler(device, set, 1, self.active_texture, self.sampler);
            restart_command_buffer(device, cmd)?;
            device.cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
        }

        let mut recorder = self.recorder(cmd);
        draw::record_frame_start(&mut recorder, set, self.bindings.cube.buffer);
        Ok(())
    }

    /// Finish the frame: flush colored cubes and lines, paint the overlay,
    /// submit and present. Does nothing for a skipped frame.
    pub fn end_frame(&mut self) -> Result<()> {
        let Some(image) = self.recording_image() else {
            if let Some(layer) = self.overlay.as_mut() {
                layer.ui.discard_frame();
            }
            return Ok(());
        };
        let result = self.submit_frame(image);
        if result.is_err() {
            self.frame.abort();
        }
        result
    }

    fn submit_frame(&mut self, image: u32) -> Result<()> {
        let cmd = self.commands.buffers[image as usize];
        self.flush_colored_cubes()?;

        let line_vertices = self.frame.lines.len() as u32;
        if line_vertices > 0 {
            self.bindings.lines.write(self.frame.lines.vertices())?;
        }
        {
            let mut recorder = self.recorder(cmd);
            draw::record_lines(&mut recorder, self.bindings.lines.buffer, line_vertices);
        }

        self.paint_overlay(cmd);

        let device = self.gpu.device();
        let queue = self.gpu.queue();
        let sync = &mut self.commands.sync;
        let render_finished = sync.render_finished(image);

        // SAFETY: `cmd` is recording inside the render pass begun in
        // `start_recording`; the fence is reset only right before the
        // submission that signals it
        unsafe {
            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd).map_err(GpuError::from)?;
            sync.submit_signaling_in_flight(device, |fence| {
                submit(device, queue, cmd, &[render_finished], fence)
            })?;
        }
        self.frame.finish();

        // SAFETY: the semaphore is signaled by the submission above
        let suboptimal = unsafe {
            self.targets.swapchain.present(
                &self.surface.swapchain_loader,
                self.gpu.queue(),
                image,
                &[render_finished],
            )
        }?;
        if suboptimal {
            debug!("Swapchain is suboptimal; resizing is not supported");
        }
        Ok(())
    }

    fn paint_overlay(&mut self, cmd: vk::CommandBuffer) {
        let Some(layer) = self.overlay.as_mut() else {
            return;
        };
        let extent = self.targets.swapchain.extent;
        let output = layer.ui.run(extent.width, extent.height);
        // SAFETY: `cmd` is recording inside the main render pass and the
        // previous frame has completed
        let painted = unsafe {
            layer
                .pass
                .paint(&self.gpu, &self.commands.pool, cmd, extent, output)
        };
        if let Err(e) = painted {
            warn!("Overlay paint failed: {e}");
        }
    }

    /// Move the camera, keeping the current far plane default.
    pub fn update_camera(&mut self, pose: Pose) -> Result<()> {
        self.update_camera_with_far(pose, self.config.default_far_plane)
    }

    /// Move the camera with an explicit far plane. During a frame the
    /// current image's uniforms are rewritten immediately.
    pub fn update_camera_with_far(&mut self, pose: Pose, far_plane: f32) -> Result<()> {
        let aspect = self.targets.swapchain.aspect_ratio();
        self.camera.update(pose, aspect, far_plane);
        if let Some(image) = self.recording_image() {
            self.bindings.uniforms[image as usize].write(&[self.camera.uniforms()])?;
        }
        Ok(())
    }

    /// Draw the unit cube. Ignored outside a frame.
    pub fn draw_cube(&mut self, pose: &Pose, scale: Vec3) {
        if let Some(cmd) = self.recording_cmd() {
            let mut recorder = self.recorder(cmd);
            draw::record_cube(&mut recorder, pose, scale);
        }
    }

    /// Queue a cube transformed to world space and tinted by `color`. It is
    /// drawn at the next flush with the texture active at that point.
    /// Ignored outside a frame.
    pub fn draw_cube_colored(&mut self, pose: &Pose, scale: Vec3, color: Vec3) -> Result<()> {
        if !self.frame.is_recording() {
            return Ok(());
        }
        self.frame.colored_cubes.push(pose, scale, color)
    }

    /// Draw the colored cubes queued since the last flush. `end_frame`
    /// flushes whatever is left.
    pub fn flush_colored_cubes(&mut self) -> Result<()> {
        let Some(cmd) = self.recording_cmd() else {
            return Ok(());
        };
        let batch = &self.frame.colored_cubes;
        let pending = batch.pending();
        if pending.is_empty() {
            return Ok(());
        }
        let offset = u64::from(pending.start) * u64::from(Vertex::STRIDE);
        self.bindings
            .colored_cubes
            .write_bytes(offset, bytemuck::cast_slice(batch.pending_vertices()))?;

        let mut recorder = self.recorder(cmd);
        draw::record_colored_cubes(
            &mut recorder,
            self.bindings.colored_cubes.buffer,
            pending,
            self.bindings.cube.buffer,
        );
        self.frame.colored_cubes.mark_flushed();
        Ok(())
    }

    /// Draw a loaded mesh. Unknown ids and calls outside a frame are ignored.
    pub fn draw_mesh(&mut self, id: i64, pose: &Pose) {
        let Some(cmd) = self.recording_cmd() else {
            return;
        };
        let Some(stored) = self.meshes.get(id) else {
            return;
        };
        let mesh = Mesh {
            buffer: stored.buffer.buffer,
            vertex_count: stored.vertex_count,
        };
        let mut recorder = self.recorder(cmd);
        draw::record_mesh(&mut recorder, &mesh, pose, self.bindings.cube.buffer);
    }

    /// Queue one line segment for this frame.
    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec3) -> Result<()> {
        self.frame.lines.push(start, end, color)
    }

    /// Red, green and yellow axes along the pose's local X, Y and Z.
    pub fn draw_model_origin(&mut self, pose: &Pose, length: f32) -> Result<()> {
        for (start, end, color) in origin_axes(pose, length) {
            self.draw_line(start, end, color)?;
        }
        Ok(())
    }

    /// The twelve edges of a box of `size` centered on the pose.
    pub fn draw_cube_wireframe(&mut self, pose: &Pose, size: Vec3, color: Vec3) -> Result<()> {
        for (start, end) in wireframe_box_edges(pose, size) {
            self.draw_line(start, end, color)?;
        }
        Ok(())
    }

    /// A square grid on the ground plane.
    pub fn draw_ground_plane(&mut self, size: f32, color: Vec3) -> Result<()> {
        for (start, end) in ground_grid_lines(size) {
            self.draw_line(start, end, color)?;
        }
        Ok(())
    }

    /// Find, parse and upload a mesh file.
    pub fn load_mesh(&mut self, name: &str) -> Result<MeshId> {
        let upload = vertex_uploader(&self.gpu, &self.commands.pool, name);
        let id = self.meshes.load(&self.config.asset_roots, name, upload)?;
        info!("Loaded mesh {name} as id {id}");
        Ok(id)
    }

    /// Upload an already parsed mesh.
    pub fn add_parsed_mesh(&mut self, name: &str, parsed: &ParsedMesh) -> Result<MeshId> {
        self.add_mesh(name, &parsed.build_vertices())
    }

    /// Upload interleaved vertices as a new mesh.
    pub fn add_mesh(&mut self, name: &str, vertices: &[Vertex]) -> Result<MeshId> {
        let upload = vertex_uploader(&self.gpu, &self.commands.pool, name);
        let id = self.meshes.insert(name, vertices, upload)?;
        info!("Loaded mesh {name} as id {id} ({} vertices)", vertices.len());
        Ok(id)
    }

    /// Make `name` the active texture, loading it on first use. An empty
    /// name selects the default texture.
    pub fn load_texture(&mut self, name: &str) -> Result<()> {
        let view = if name.is_empty() {
            self.default_texture.view
        } else {
            let gpu = &self.gpu;
            let pool = &self.commands.pool;
            let roots = &self.config.asset_roots;
            self.textures
                .get_or_load(name, || {
                    let path = resolve_texture(roots, name)?;
                    let rgba = RgbaImage::decode(&path)?;
                    info!("Loaded texture {} ({}x{})", path.display(), rgba.width, rgba.height);
                    // SAFETY: pool and context belong together
                    unsafe { GpuTexture::upload(gpu, pool, &rgba, name) }
                })?
                .view
        };
        self.active_texture = view;

        let Some(image) = self.recording_image() else {
            return Ok(());
        };
        let Some(slot) = self.frame.claim_texture_slot() else {
            warn!("Texture switch limit reached this frame; {name:?} applies next frame");
            return Ok(());
        };
        let set = self.bindings.slot_sets[image as usize][slot];
        // SAFETY: slot sets are only bound after being written, and each is
        // claimed at most once per frame
        unsafe {
            write_combined_image_sampler(self.gpu.device(), set, 1, view, self.sampler);
        }
        let cmd = self.commands.buffers[image as usize];
        let mut recorder = self.recorder(cmd);
        recorder.bind_descriptor_set(set);
        Ok(())
    }

    /// Picking ray through a cursor position in window pixels.
    pub fn mouse_ray(&self, cursor: Vec2) -> Ray {
        let extent = self.targets.swapchain.extent;
        self.camera
            .mouse_ray(cursor, Vec2::new(extent.width as f32, extent.height as f32))
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.frame
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.targets.swapchain.extent
    }

    /// The overlay, unless its painter failed to initialize.
    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        self.overlay.as_mut().map(|layer| &mut layer.ui)
    }

    fn recording_image(&self) -> Option<u32> {
        self.frame.is_recording().then(|| self.frame.current_image())
    }

    fn recording_cmd(&self) -> Option<vk::CommandBuffer> {
        self.recording_image()
            .map(|image| self.commands.buffers[image as usize])
    }

    fn recorder(&self, cmd: vk::CommandBuffer) -> VkRecorder<'_> {
        // SAFETY: only called while `cmd` records inside the main render
        // pass, which both pipelines were built for
        unsafe {
            VkRecorder::new(
                self.gpu.device(),
                cmd,
                self.pipelines.solid.layout,
                self.pipelines.solid.pipeline,
                self.pipelines.line.pipeline,
            )
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            warn!("wait_idle failed during shutdown: {e}");
        }
        let device = self.gpu.device();

        // SAFETY: the device is idle, so nothing below is still referenced
        unsafe {
            if let Some(mut layer) = self.overlay.take() {
                layer.pass.destroy();
            }
            for (_, mut texture) in self.textures.drain() {
                texture.destroy(&self.gpu);
            }
            self.default_texture.destroy(&self.gpu);
            device.destroy_sampler(self.sampler, None);

            {
                let mut allocator = self.gpu.allocator().lock();
                for mut mesh in self.meshes.drain() {
                    if let Err(e) = allocator.free_buffer(&mut mesh.buffer) {
                        warn!("Failed to free mesh buffer: {e}");
                    }
                }
            }

            self.bindings.destroy(&self.gpu);
            self.commands.destroy(device);
            self.pipelines.destroy(device);
            self.targets.destroy(&self.gpu, &self.surface);
            self.surface.destroy();
        }
        info!("Renderer destroyed");
    }
}

/// Owns the resources built so far during `Renderer::new` and destroys them
/// if construction stops early.
struct PartialRenderer<'a> {
    gpu: &'a GpuContext,
    surface: &'a SurfaceContext,
    targets: Option<FrameTargets>,
    pipelines: Option<ScenePipelines>,
    commands: Option<FrameCommands>,
    bindings: Option<FrameBindings>,
    sampler: Option<vk::Sampler>,
    default_texture: Option<GpuTexture>,
    armed: bool,
}

impl Drop for PartialRenderer<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let gpu = self.gpu;
        let device = gpu.device();
        let _ = gpu.wait_idle();
        // SAFETY: construction failed before anything was submitted for
        // rendering; one-off uploads have already completed
        unsafe {
            if let Some(mut texture) = self.default_texture.take() {
                texture.destroy(gpu);
            }
            if let Some(sampler) = self.sampler.take() {
                device.destroy_sampler(sampler, None);
            }
            if let Some(mut bindings) = self.bindings.take() {
                bindings.destroy(gpu);
            }
            if let Some(commands) = self.commands.take() {
                commands.destroy(device);
            }
            if let Some(pipelines) = self.pipelines.take() {
                pipelines.destroy(device);
            }
            if let Some(mut targets) = self.targets.take() {
                targets.destroy(gpu, self.surface);
            }
            self.surface.destroy();
        }
    }
}

/// Upload callback for the mesh store: stages `vertices` into a device
/// local vertex buffer named `name`.
fn vertex_uploader<'a>(
    gpu: &'a GpuContext,
    pool: &'a eden_gpu::CommandPool,
    name: &'a str,
) -> impl FnOnce(&[Vertex]) -> Result<eden_gpu::GpuBuffer> + 'a {
    move |vertices: &[Vertex]| {
        // SAFETY: pool and context belong together
        unsafe {
            upload_staged_buffer(
                gpu,
                pool,
                bytemuck::cast_slice(vertices),
                vk::BufferUsageFlags::VERTEX_BUFFER,
                name,
            )
        }
    }
}

/// Whether the overlay must encode its output for an sRGB swapchain.
fn is_srgb(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::B8G8R8A8_SRGB | vk::Format::R8G8B8A8_SRGB | vk::Format::A8B8G8R8_SRGB_PACK32
    )
}

/// Upload the first default texture found, or a white pixel.
///
/// # Safety
/// `pool` must belong to `gpu`.
unsafe fn load_default_texture(
    gpu: &GpuContext,
    pool: &eden_gpu::CommandPool,
    config: &RendererConfig,
) -> Result<GpuTexture> {
    let rgba = match find_default_texture(&config.asset_roots) {
        Some(path) => match RgbaImage::decode(&path) {
            Ok(rgba) => {
                info!("Default texture {}", path.display());
                rgba
            }
            Err(e) => {
                warn!("Default texture unreadable ({e}); using white");
                RgbaImage::white()
            }
        },
        None => {
            warn!("No default texture found; using white");
            RgbaImage::white()
        }
    };
    // SAFETY: caller guarantees the pool belongs to `gpu`
    unsafe { GpuTexture::upload(gpu, pool, &rgba, "default texture") }
}
