//! Vulkan abstraction layer for the Eden renderer.
//!
//! This crate provides:
//! - Instance creation with an optional validation messenger
//! - Device and graphics/present queue selection
//! - Memory allocation via gpu-allocator
//! - Swapchain, depth buffer and render pass setup
//! - Command buffer, synchronization and descriptor helpers
//! - Render-pass graphics pipelines and SPIR-V discovery

pub mod command;
pub mod context;
pub mod depth;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use command::CommandPool;
pub use context::{GpuContext, GpuContextBuilder};
pub use depth::{select_depth_format, DepthBuffer, DEPTH_FORMAT_CANDIDATES};
pub use descriptors::{
    write_combined_image_sampler, write_uniform_buffer, DescriptorPool,
    DescriptorSetLayoutBuilder,
};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
pub use render_pass::{create_framebuffers, create_render_pass};
pub use shader::{find_shader, load_spirv, ShaderSearch};
pub use surface::SurfaceContext;
pub use swapchain::{AcquiredImage, Swapchain, SwapchainPlan};
pub use sync::{create_fence, create_semaphore, FrameSync};
