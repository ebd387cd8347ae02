//! Renderer error types.

use eden_gpu::GpuError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the renderer runtime.
#[derive(Error, Debug)]
pub enum RendererError {
    /// Vulkan-level failure.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// egui-ash-renderer failed to build, upload or record the overlay.
    #[error("Overlay renderer: {0}")]
    Overlay(#[from] egui_ash_renderer::RendererError),

    /// An asset file was found but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The frame's line batch cannot hold another segment.
    #[error("Line buffer full: {requested} bytes requested, capacity {capacity}")]
    LineBufferFull { requested: usize, capacity: usize },

    /// The frame's colored cube batch cannot hold another cube.
    #[error("Colored cube batch full: {requested} bytes requested, capacity {capacity}")]
    CubeBatchFull { requested: usize, capacity: usize },

    /// No candidate path held the asset.
    #[error("Asset not found: {name} (searched {} locations)", searched.len())]
    AssetNotFound { name: String, searched: Vec<PathBuf> },

    /// A parsed mesh produced no vertices.
    #[error("Mesh {0} has no vertices")]
    EmptyMesh(String),

    /// An image file could not be decoded.
    #[error("Texture {name}: {message}")]
    Texture { name: String, message: String },

    /// The call is not valid in the current frame phase.
    #[error("Invalid frame state: {0}")]
    FrameState(&'static str),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, RendererError>;
