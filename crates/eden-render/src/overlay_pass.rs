//! Paints the egui overlay inside the main render pass with
//! egui-ash-renderer.
//!
//! egui-ash-renderer wants its gpu-allocator behind a `std::sync::Mutex`,
//! so the overlay keeps a dedicated allocator next to the context's.

use std::sync::{Arc, Mutex};

use ash::vk;
use egui::TextureId;
use egui_ash_renderer::{Options, Renderer as EguiRenderer};
use eden_gpu::{CommandPool, GpuContext};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::{AllocationSizes, AllocatorDebugSettings};
use tracing::debug;

use crate::error::{RendererError, Result};
use crate::overlay::OverlayFrame;

/// egui-ash-renderer plus the allocator backing its buffers and textures.
///
/// Texture frees are held back one frame: they are applied at the next
/// paint, after the in-flight fence has retired the frame that used them.
pub struct OverlayPass {
    painter: Option<EguiRenderer>,
    allocator: Option<Arc<Mutex<Allocator>>>,
    pending_free: Vec<TextureId>,
}

impl OverlayPass {
    /// Build the painter for subpass 0 of `render_pass`.
    ///
    /// # Safety
    /// The render pass must belong to `gpu`'s device.
    pub unsafe fn new(gpu: &GpuContext, render_pass: vk::RenderPass, srgb: bool) -> Result<Self> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: gpu.instance().clone(),
            device: gpu.device().clone(),
            physical_device: gpu.physical_device(),
            debug_settings: AllocatorDebugSettings::default(),
            buffer_device_address: false,
            allocation_sizes: AllocationSizes::default(),
        })
        .map_err(|e| RendererError::Overlay(e.into()))?;
        let allocator = Arc::new(Mutex::new(allocator));

        let painter = EguiRenderer::with_gpu_allocator(
            Arc::clone(&allocator),
            gpu.device().clone(),
            render_pass,
            Options {
                in_flight_frames: 1,
                srgb_framebuffer: srgb,
                ..Options::default()
            },
        )?;
        debug!("Overlay painter ready");

        Ok(Self {
            painter: Some(painter),
            allocator: Some(allocator),
            pending_free: Vec::new(),
        })
    }

    /// Upload new textures and record the overlay into `cmd`.
    ///
    /// # Safety
    /// `cmd` must be recording inside the render pass given to `new`, and
    /// the previous frame must have completed.
    pub unsafe fn paint(
        &mut self,
        gpu: &GpuContext,
        pool: &CommandPool,
        cmd: vk::CommandBuffer,
        extent: vk::Extent2D,
        frame: OverlayFrame,
    ) -> Result<()> {
        let Some(painter) = self.painter.as_mut() else {
            return Ok(());
        };
        let retired = std::mem::take(&mut self.pending_free);
        painter.free_textures(&retired)?;
        painter.set_textures(gpu.queue(), pool.handle(), &frame.textures_delta.set)?;
        painter.cmd_draw(cmd, extent, frame.pixels_per_point, &frame.primitives)?;
        self.pending_free = frame.textures_delta.free;
        Ok(())
    }

    /// Release the painter, then its allocator.
    ///
    /// # Safety
    /// The device must be idle.
    pub unsafe fn destroy(&mut self) {
        self.pending_free.clear();
        self.painter = None;
        self.allocator = None;
    }
}
