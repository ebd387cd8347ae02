//! Errors raised while creating or driving Vulkan objects.

use ash::vk;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpuError {
    /// A Vulkan call returned an error code.
    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader library could not be opened.
    #[error("Cannot load the Vulkan library: {0}")]
    Loading(String),

    #[error("Cannot create Vulkan instance: {0}")]
    InstanceCreation(String),

    /// No physical device, or no queue family that can draw and present.
    #[error("No GPU can render to this window")]
    NoSuitableDevice,

    /// None of the candidate depth formats is usable as an attachment.
    #[error("No supported depth format among {0:?}")]
    NoDepthFormat(Vec<vk::Format>),

    #[error("GPU memory allocation failed: {0}")]
    AllocationFailed(String),

    #[error("Cannot create window surface: {0}")]
    SurfaceCreation(String),

    #[error("Cannot create swapchain: {0}")]
    SwapchainCreation(String),

    /// A SPIR-V binary was not found in any search location.
    #[error("Shader not found: {name} (searched {searched} locations)")]
    ShaderNotFound { name: String, searched: usize },

    /// Shader module creation failed or the binary is not valid SPIR-V.
    #[error("Invalid shader {0}")]
    InvalidShader(String),

    #[error("Cannot create graphics pipeline: {0}")]
    PipelineCreation(String),

    /// An object was used after shutdown or outside its valid range.
    #[error("Invalid GPU object state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, GpuError>;
