//! A window driven by explicit polling, for callers that own the loop.
//!
//! winit normally owns the event loop; C callers instead call
//! `poll_events` once per frame, so events are pumped with a zero timeout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use eden_render::Overlay;

use crate::input::{InputState, OverlayInput};

/// Pumps spent waiting for the platform to hand out the window.
const CREATE_ATTEMPTS: usize = 100;

/// Window plus its event loop and input state.
pub struct PolledWindow {
    state: WindowState,
    event_loop: EventLoop<()>,
}

struct WindowState {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    input: InputState,
    overlay_input: Option<OverlayInput>,
    close_requested: bool,
    create_error: Option<String>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.create_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(bridge), Some(window)) = (self.overlay_input.as_mut(), self.window.as_deref()) {
            bridge.on_window_event(window, &event);
        }
        self.input.handle_window_event(&event);
        if matches!(event, WindowEvent::CloseRequested | WindowEvent::Destroyed) {
            debug!("Window close requested");
            self.close_requested = true;
        }
    }
}

impl PolledWindow {
    /// Open a non-resizable window of `width`×`height` pixels.
    pub fn new(width: u32, height: u32, title: &str) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);

        let mut polled = Self {
            event_loop,
            state: WindowState {
                attributes,
                window: None,
                input: InputState::new(),
                overlay_input: None,
                close_requested: false,
                create_error: None,
            },
        };

        for _ in 0..CREATE_ATTEMPTS {
            polled.pump(Some(Duration::from_millis(1)));
            if let Some(e) = polled.state.create_error.take() {
                return Err(anyhow!("failed to create window: {e}"));
            }
            if polled.state.window.is_some() {
                info!("Window created: {title} ({width}x{height})");
                return Ok(polled);
            }
        }
        Err(anyhow!("platform never resumed the event loop"))
    }

    /// Process pending events without blocking.
    pub fn poll_events(&mut self) {
        self.state.input.begin_frame();
        self.pump(Some(Duration::ZERO));
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            debug!("Event loop exited with code {code}");
            self.state.close_requested = true;
        }
    }

    pub fn should_close(&self) -> bool {
        self.state.close_requested
    }

    pub fn request_close(&mut self) {
        self.state.close_requested = true;
    }

    /// The native window.
    pub fn window(&self) -> Option<&Window> {
        self.state.window.as_deref()
    }

    /// Drawable size in pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.window()
            .map_or(PhysicalSize::new(0, 0), Window::inner_size)
    }

    pub fn input(&self) -> &InputState {
        &self.state.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.state.input
    }

    /// Start routing this window's events to `overlay`.
    pub fn attach_overlay(&mut self, overlay: &Overlay) {
        if let Some(window) = self.state.window.as_deref() {
            self.state.overlay_input = Some(OverlayInput::new(overlay, window));
        }
    }

    /// Hand the events gathered by `poll_events` to the overlay.
    pub fn begin_overlay_frame(&mut self, overlay: &mut Overlay) {
        if let (Some(bridge), Some(window)) =
            (self.state.overlay_input.as_mut(), self.state.window.as_deref())
        {
            bridge.begin_frame(window, overlay);
        }
    }

    /// Apply the overlay's cursor and clipboard requests.
    pub fn end_overlay_frame(&mut self, overlay: &mut Overlay) {
        if let (Some(bridge), Some(window)) =
            (self.state.overlay_input.as_mut(), self.state.window.as_deref())
        {
            bridge.end_frame(window, overlay);
        }
    }
}
