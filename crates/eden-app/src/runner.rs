//! Window, event loop and frame pacing for [`EdenApp`] implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use eden_render::{Renderer, RendererConfig};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::app::EdenApp;
use crate::input::{InputState, OverlayInput};

/// Window and renderer settings for [`run_app`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Frame rate cap. `None` or zero runs unthrottled.
    pub fps_cap: Option<u32>,
    /// Request the Vulkan validation layer. Defaults to on in debug builds.
    pub validation: bool,
    /// Searched for shaders, meshes and textures before the built-in roots.
    pub asset_roots: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Eden".to_string(),
            width: 1280,
            height: 720,
            fps_cap: None,
            validation: cfg!(debug_assertions),
            asset_roots: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn with_fps_cap(self, fps: u32) -> Self {
        Self {
            fps_cap: Some(fps),
            ..self
        }
    }

    pub fn with_validation(self, validation: bool) -> Self {
        Self { validation, ..self }
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_roots.push(root.into());
        self
    }

    /// Renderer settings for this window. Configured roots are searched
    /// before the renderer's defaults.
    pub fn renderer_config(&self) -> RendererConfig {
        let mut config = RendererConfig::new(self.title.clone()).with_validation(self.validation);
        let defaults = std::mem::take(&mut config.asset_roots);
        config.asset_roots = self.asset_roots.iter().cloned().chain(defaults).collect();
        config
    }

    /// Time budget of one frame under the cap.
    pub fn frame_budget(&self) -> Option<Duration> {
        match self.fps_cap {
            Some(fps) if fps > 0 => Some(Duration::from_secs(1) / fps),
            _ => None,
        }
    }
}

/// Install the `RUST_LOG`-driven subscriber, defaulting to `info`.
///
/// Later calls leave the first subscriber in place.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open a window for `A` and drive it until it closes.
///
/// Returns the error that stopped initialization, if any. Per-frame render
/// errors are logged and the loop keeps going.
pub fn run_app<A: EdenApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    init_logging();
    info!("Starting {:?} ({}x{})", config.title, config.width, config.height);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = Runner::<A> {
        config,
        session: None,
        init_error: None,
    };
    event_loop.run_app(&mut runner)?;
    runner.init_error.map_or(Ok(()), Err)
}

/// Sleeps out the rest of a frame budget and measures frame deltas.
struct FramePacer {
    budget: Option<Duration>,
    last: Instant,
    frames: u64,
}

impl FramePacer {
    fn new(budget: Option<Duration>) -> Self {
        Self {
            budget,
            last: Instant::now(),
            frames: 0,
        }
    }

    /// Start a frame, returning seconds since the previous one.
    fn start(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frames += 1;
        dt
    }

    /// How long to sleep after a frame that took `spent`.
    fn remaining(&self, spent: Duration) -> Option<Duration> {
        self.budget
            .and_then(|budget| budget.checked_sub(spent))
            .filter(|rest| !rest.is_zero())
    }
}

struct Runner<A: EdenApp> {
    config: AppConfig,
    session: Option<Session<A>>,
    init_error: Option<anyhow::Error>,
}

/// Everything that exists while the window is open.
///
/// Field order is drop order: the app and renderer (and with it the
/// surface) go before the window.
struct Session<A: EdenApp> {
    app: A,
    renderer: Renderer,
    window: Arc<Window>,
    input: InputState,
    overlay_input: Option<OverlayInput>,
    pacer: FramePacer,
}

impl<A: EdenApp + 'static> ApplicationHandler for Runner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        match Session::open(&self.config, event_loop) {
            Ok(session) => {
                debug!("Window and renderer ready");
                self.session = Some(session);
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.app.on_event(&event) {
            return;
        }
        if let Some(overlay_input) = session.overlay_input.as_mut() {
            overlay_input.on_window_event(&session.window, &event);
        }
        session.input.handle_window_event(&event);

        let close = match event {
            WindowEvent::CloseRequested => true,
            WindowEvent::RedrawRequested => {
                if let Err(e) = session.frame() {
                    error!("Render error: {e:#}");
                }
                session.window.request_redraw();
                session.app.should_exit()
            }
            _ => false,
        };
        if close {
            if let Some(session) = self.session.take() {
                session.close();
            }
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.window.request_redraw();
        }
    }
}

impl<A: EdenApp> Session<A> {
    fn open(config: &AppConfig, event_loop: &ActiveEventLoop) -> anyhow::Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);

        let PhysicalSize { width, height } = window.inner_size();
        let mut renderer = Renderer::new(window.as_ref(), width, height, config.renderer_config())?;
        let app = A::init(&mut renderer)?;
        let overlay_input = renderer
            .overlay_mut()
            .map(|overlay| OverlayInput::new(overlay, &window));

        Ok(Self {
            app,
            renderer,
            window,
            input: InputState::new(),
            overlay_input,
            pacer: FramePacer::new(config.frame_budget()),
        })
    }

    /// Update, then render inside a renderer frame. A frame the renderer
    /// skips still updates the app.
    fn frame(&mut self) -> anyhow::Result<()> {
        let started = Instant::now();
        let dt = self.pacer.start(started);

        if let (Some(bridge), Some(overlay)) =
            (self.overlay_input.as_mut(), self.renderer.overlay_mut())
        {
            bridge.begin_frame(&self.window, overlay);
        }
        self.app.update(&self.input, dt);
        self.input.begin_frame();

        if self.renderer.begin_frame()? {
            let rendered = self.app.render(&mut self.renderer);
            self.renderer.end_frame()?;
            rendered?;
        }
        if let (Some(bridge), Some(overlay)) =
            (self.overlay_input.as_mut(), self.renderer.overlay_mut())
        {
            bridge.end_frame(&self.window, overlay);
        }

        if let Some(rest) = self.pacer.remaining(started.elapsed()) {
            thread::sleep(rest);
        }
        Ok(())
    }

    fn close(mut self) {
        info!("Closing after {} frames", self.pacer.frames);
        self.app.cleanup(&mut self.renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.title, "Eden");
        assert_eq!(config.validation, cfg!(debug_assertions));
        assert!(config.frame_budget().is_none());
    }

    #[test]
    fn builder_setters() {
        let config = AppConfig::new("Viewer")
            .with_size(640, 480)
            .with_fps_cap(50)
            .with_validation(false);
        assert_eq!(config.title, "Viewer");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.frame_budget(), Some(Duration::from_millis(20)));
        assert!(!config.validation);
    }

    #[test]
    fn zero_fps_means_unlimited() {
        assert!(AppConfig::default().with_fps_cap(0).frame_budget().is_none());
    }

    #[test]
    fn asset_roots_come_before_defaults() {
        let config = AppConfig::new("Viewer").with_asset_root("/opt/eden");
        let renderer = config.renderer_config();
        assert_eq!(renderer.app_name, "Viewer");
        assert_eq!(renderer.asset_roots[0], PathBuf::from("/opt/eden"));
        assert_eq!(renderer.asset_roots.last(), Some(&PathBuf::from(".")));
    }

    #[test]
    fn pacer_sleeps_only_when_under_budget() {
        let pacer = FramePacer::new(Some(Duration::from_millis(10)));
        assert_eq!(pacer.remaining(Duration::from_millis(4)), Some(Duration::from_millis(6)));
        assert_eq!(pacer.remaining(Duration::from_millis(10)), None);
        assert_eq!(pacer.remaining(Duration::from_millis(25)), None);
        assert_eq!(FramePacer::new(None).remaining(Duration::ZERO), None);
    }

    #[test]
    fn pacer_measures_deltas() {
        let mut pacer = FramePacer::new(None);
        let t0 = pacer.last;
        let dt = pacer.start(t0 + Duration::from_millis(250));
        assert_relative_eq!(dt, 0.25, epsilon = 1e-6);
        assert_eq!(pacer.frames, 1);
        // A clock that appears to go backwards yields zero, not a panic.
        assert_relative_eq!(pacer.start(t0), 0.0);
    }
}
