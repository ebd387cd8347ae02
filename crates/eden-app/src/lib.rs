//! Window integration and C ABI for the Eden renderer.
//!
//! Two ways to drive the renderer:
//! - Implement [`EdenApp`] and hand it to [`run_app`], which owns the event
//!   loop, window, renderer and frame pacing
//! - Call the flat `eden_*` functions in [`ffi`] from C, polling events and
//!   opening frames yourself
//!
//! # Example
//!
//! ```no_run
//! use eden_app::{run_app, AppConfig, EdenApp, InputState, Renderer};
//! use eden_core::Pose;
//! use glam::Vec3;
//!
//! struct Spinner {
//!     angle: f32,
//! }
//!
//! impl EdenApp for Spinner {
//!     fn init(_renderer: &mut Renderer) -> anyhow::Result<Self> {
//!         Ok(Self { angle: 0.0 })
//!     }
//!
//!     fn update(&mut self, _input: &InputState, dt: f32) {
//!         self.angle += 90.0 * dt;
//!     }
//!
//!     fn render(&mut self, renderer: &mut Renderer) -> anyhow::Result<()> {
//!         renderer.update_camera(Pose::at(Vec3::new(0.0, 0.0, 300.0)))?;
//!         let pose = Pose::new(Vec3::ZERO, Vec3::new(0.0, self.angle, 0.0));
//!         renderer.draw_cube(&pose, Vec3::splat(100.0));
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<Spinner>(AppConfig::new("Spinner"))
//! }
//! ```

mod app;
pub mod ffi;
mod input;
mod keymap;
mod runner;
mod window;

pub use app::EdenApp;
pub use input::{InputState, OverlayInput};
pub use runner::{init_logging, run_app, AppConfig};
pub use window::PolledWindow;

// Re-export commonly used types for convenience
pub use eden_render::{Overlay, Renderer, RendererConfig};
pub use winit::event::{MouseButton, WindowEvent};
pub use winit::keyboard::KeyCode;
