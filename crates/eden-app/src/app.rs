//! `EdenApp` trait definition.

use eden_render::Renderer;
use winit::event::WindowEvent;

use crate::input::InputState;

/// Trait for applications driven by [`run_app`](crate::run_app).
///
/// The runner owns the window and renderer. Each frame it calls `update`,
/// then opens a frame on the renderer, calls `render` and closes the frame.
pub trait EdenApp: Sized {
    /// Initialize the application.
    ///
    /// Called once after the window and renderer exist. Meshes and textures
    /// are usually loaded here.
    fn init(renderer: &mut Renderer) -> anyhow::Result<Self>;

    /// Advance application state by `dt` seconds.
    fn update(&mut self, input: &InputState, dt: f32);

    /// Issue draw calls. The renderer is inside `begin_frame`/`end_frame`
    /// when this runs; skipped frames never reach it.
    fn render(&mut self, renderer: &mut Renderer) -> anyhow::Result<()>;

    /// Handle a window event before the runner does.
    ///
    /// Return `true` if the event was consumed.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Return `true` to close the window after the current frame.
    fn should_exit(&self) -> bool {
        false
    }

    /// Called before the renderer is dropped.
    #[allow(unused_variables)]
    fn cleanup(&mut self, renderer: &mut Renderer) {}
}
