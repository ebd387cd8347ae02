//! Keyboard and mouse state gathered from window events, and the
//! egui-winit bridge that feeds the same events to the overlay.

use std::collections::HashSet;

use eden_render::Overlay;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::Window;

/// Input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    cursor: Vec2,
    cursor_delta: Vec2,
    scroll: f32,
    keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame deltas. Held keys and buttons persist.
    pub fn begin_frame(&mut self) {
        self.cursor_delta = Vec2::ZERO;
        self.scroll = 0.0;
    }

    /// Update from a window event. Returns true if the event was input.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_button(*button, *state == ElementState::Pressed);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 120.0,
                };
                self.scrolled(lines);
                true
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.key(code, event.state == ElementState::Pressed);
                }
                true
            }
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.buttons.clear();
                false
            }
            _ => false,
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        self.cursor_delta += position - self.cursor;
        self.cursor = position;
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn scrolled(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn key(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.keys.insert(code);
        } else {
            self.keys.remove(&code);
        }
    }

    /// Cursor position in window pixels.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Cursor movement since `begin_frame`.
    pub fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn is_key_down(&self, code: KeyCode) -> bool {
        self.keys.contains(&code)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }
}

/// Window events translated to egui input by `egui_winit::State`.
pub struct OverlayInput {
    state: egui_winit::State,
}

impl OverlayInput {
    /// Bridge for `overlay`'s context on `window`.
    pub fn new(overlay: &Overlay, window: &Window) -> Self {
        let state = egui_winit::State::new(
            overlay.context().clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self { state }
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Hand the input gathered since the last frame to the overlay.
    pub fn begin_frame(&mut self, window: &Window, overlay: &mut Overlay) {
        overlay.set_input(self.state.take_egui_input(window));
    }

    /// Apply the cursor and clipboard requests of the frame just drawn.
    pub fn end_frame(&mut self, window: &Window, overlay: &mut Overlay) {
        if let Some(output) = overlay.take_platform_output() {
            self.state.handle_platform_output(window, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_delta_accumulates_until_frame_start() {
        let mut input = InputState::new();
        input.cursor_moved(Vec2::new(10.0, 10.0));
        input.cursor_moved(Vec2::new(15.0, 4.0));
        assert_eq!(input.cursor(), Vec2::new(15.0, 4.0));
        assert_eq!(input.cursor_delta(), Vec2::new(15.0, 4.0));

        input.begin_frame();
        assert_eq!(input.cursor_delta(), Vec2::ZERO);
        input.cursor_moved(Vec2::new(16.0, 4.0));
        assert_eq!(input.cursor_delta(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn keys_stay_down_across_frames() {
        let mut input = InputState::new();
        input.key(KeyCode::KeyW, true);
        input.begin_frame();
        assert!(input.is_key_down(KeyCode::KeyW));
        input.key(KeyCode::KeyW, false);
        assert!(!input.is_key_down(KeyCode::KeyW));
    }

    #[test]
    fn buttons_track_press_and_release() {
        let mut input = InputState::new();
        input.mouse_button(MouseButton::Right, true);
        input.mouse_button(MouseButton::Left, true);
        input.mouse_button(MouseButton::Left, false);
        assert!(input.is_button_down(MouseButton::Right));
        assert!(!input.is_button_down(MouseButton::Left));
    }

    #[test]
    fn scroll_resets_each_frame() {
        let mut input = InputState::new();
        input.scrolled(1.0);
        input.scrolled(0.5);
        assert_eq!(input.scroll(), 1.5);
        input.begin_frame();
        assert_eq!(input.scroll(), 0.0);
    }
}
