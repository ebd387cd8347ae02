//! Immediate-mode renderer runtime for Eden.
//!
//! This crate provides:
//! - The `Renderer` object and its begin/draw/end frame protocol
//! - Cube, colored cube batch, mesh and debug line submission through a
//!   recording seam
//! - ASCII mesh loading and the append-only mesh store
//! - Texture loading with a name-keyed cache
//! - Camera uniforms and picking rays
//! - An egui overlay declared one widget call at a time

pub mod camera;
pub mod config;
pub mod cube_batch;
pub mod draw;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod lines;
pub mod mesh;
pub mod mesh_store;
pub mod overlay;
pub mod overlay_pass;
pub mod renderer;
pub mod resources;
pub mod texture;
pub mod upload;
pub mod vertex;

pub use camera::{CameraState, UniformBufferObject};
pub use config::RendererConfig;
pub use cube_batch::ColoredCubeBatch;
pub use draw::{CommandRecorder, PipelineKind};
pub use error::{RendererError, Result};
pub use frame::{FramePhase, FrameState};
pub use lines::LineBatch;
pub use mesh::ParsedMesh;
pub use mesh_store::{Mesh, MeshId, MeshStore};
pub use overlay::Overlay;
pub use renderer::Renderer;
pub use vertex::{PushConstants, Vertex};
