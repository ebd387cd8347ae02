//! Flat C ABI over the renderer.
//!
//! All state lives in a thread-local: one window and at most one renderer,
//! both owned by the thread that created them. Every entry point returns the
//! failure sentinel (`0`, `-1` or the unchanged input) when the renderer is
//! not initialized, when a pointer is null, or when the call fails. Errors
//! are logged; panics are caught before they reach the caller.

use std::cell::RefCell;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use eden_core::math::raycast_ground;
use eden_core::{Aabb, Pose};
use eden_render::{MeshId, Renderer, RendererConfig};
use glam::Vec3;
use tracing::{error, info, warn};

use crate::input::InputState;
use crate::keymap::{key_from_code, mouse_button_from_code};
use crate::runner::init_logging;
use crate::window::PolledWindow;

/// Opaque window handle handed to C callers.
pub struct EdenWindow {
    _private: [u8; 0],
}

/// Three floats, passed by value.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdenVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for EdenVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<EdenVec3> for Vec3 {
    fn from(v: EdenVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Renderer is declared first so it is dropped before the window.
#[derive(Default)]
struct FfiState {
    renderer: Option<Renderer>,
    window: Option<Box<PolledWindow>>,
}

impl FfiState {
    fn window_handle(&self) -> *mut EdenWindow {
        self.window.as_deref().map_or(std::ptr::null_mut(), |w| {
            (w as *const PolledWindow).cast_mut().cast::<EdenWindow>()
        })
    }

    fn owns(&self, handle: *mut EdenWindow) -> bool {
        !handle.is_null() && handle == self.window_handle()
    }
}

thread_local! {
    static STATE: RefCell<FfiState> = RefCell::new(FfiState::default());
}

/// Run `f` on the thread's state, returning `fallback` on panic or
/// re-entrant use.
fn with_state<R>(fallback: R, f: impl FnOnce(&mut FfiState) -> R) -> R {
    let result = catch_unwind(AssertUnwindSafe(|| {
        STATE.with(|cell| match cell.try_borrow_mut() {
            Ok(mut state) => Some(f(&mut state)),
            Err(_) => None,
        })
    }));
    match result {
        Ok(Some(value)) => value,
        Ok(None) => {
            warn!("Eden call re-entered while another call was running");
            fallback
        }
        Err(_) => {
            error!("Panic caught at the C boundary");
            fallback
        }
    }
}

/// Run `f` with the renderer, or return `fallback` if there is none.
fn with_renderer<R>(fallback: R, f: impl FnOnce(&mut Renderer) -> R) -> R {
    with_state(None, |state| state.renderer.as_mut().map(f)).unwrap_or(fallback)
}

/// Log the error of a renderer call that has no return channel.
fn report<T>(what: &str, result: eden_render::Result<T>) {
    if let Err(e) = result {
        error!("{what} failed: {e}");
    }
}

/// Borrow a C string as UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives
/// the returned borrow.
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: caller guarantees a valid NUL-terminated string
    match unsafe { CStr::from_ptr(ptr) }.to_str() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Ignoring non UTF-8 string: {e}");
            None
        }
    }
}

fn pose(x: f32, y: f32, z: f32, rx: f32, ry: f32, rz: f32) -> Pose {
    Pose::new(Vec3::new(x, y, z), Vec3::new(rx, ry, rz))
}

// --- lifecycle -------------------------------------------------------------

/// Open the window. Returns null on failure or if a window already exists.
///
/// # Safety
/// `title` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_create_window(
    width: i32,
    height: i32,
    title: *const c_char,
) -> *mut EdenWindow {
    init_logging();
    // SAFETY: forwarded from caller
    let title = unsafe { c_str(title) }.unwrap_or("Eden").to_string();
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        error!("Invalid window size {width}x{height}");
        return std::ptr::null_mut();
    };

    with_state(std::ptr::null_mut(), |state| {
        if state.window.is_some() {
            error!("A window already exists");
            return std::ptr::null_mut();
        }
        match PolledWindow::new(width, height, &title) {
            Ok(window) => {
                state.window = Some(Box::new(window));
                state.window_handle()
            }
            Err(e) => {
                error!("Window creation failed: {e:#}");
                std::ptr::null_mut()
            }
        }
    })
}

/// Close the window, cleaning up the renderer first if it still exists.
#[no_mangle]
pub extern "C" fn eden_destroy_window(window: *mut EdenWindow) {
    with_state((), |state| {
        if !state.owns(window) {
            return;
        }
        if state.renderer.take().is_some() {
            warn!("Renderer was still alive when its window was destroyed");
        }
        state.window = None;
    });
}

/// `1` once the user asked to close the window, or for an unknown handle.
#[no_mangle]
pub extern "C" fn eden_window_should_close(window: *mut EdenWindow) -> i32 {
    with_state(1, |state| {
        if !state.owns(window) {
            return 1;
        }
        state
            .window
            .as_deref()
            .map_or(1, |w| i32::from(w.should_close()))
    })
}

/// Pump window events and hand them to the overlay.
#[no_mangle]
pub extern "C" fn eden_poll_events() {
    with_state((), |state| {
        let Some(window) = state.window.as_deref_mut() else {
            return;
        };
        window.poll_events();
        if let Some(overlay) = state.renderer.as_mut().and_then(Renderer::overlay_mut) {
            window.begin_overlay_frame(overlay);
        }
    });
}

/// Run `f` on the input state of `window`, or return `fallback` for an
/// unknown handle.
fn with_input<R>(window: *mut EdenWindow, fallback: R, f: impl FnOnce(&InputState) -> R) -> R {
    with_state(None, |state| {
        if !state.owns(window) {
            return None;
        }
        state.window.as_deref().map(|w| f(w.input()))
    })
    .unwrap_or(fallback)
}

/// `1` while the key with GLFW-numbered `key` is held down.
#[no_mangle]
pub extern "C" fn eden_is_key_pressed(window: *mut EdenWindow, key: i32) -> i32 {
    let Some(code) = key_from_code(key) else {
        return 0;
    };
    with_input(window, 0, |input| i32::from(input.is_key_down(code)))
}

/// `1` while mouse button `button` (0 left, 1 right, 2 middle) is held.
#[no_mangle]
pub extern "C" fn eden_is_mouse_button_pressed(window: *mut EdenWindow, button: i32) -> i32 {
    let Some(button) = mouse_button_from_code(button) else {
        return 0;
    };
    with_input(window, 0, |input| i32::from(input.is_button_down(button)))
}

/// Cursor X in window pixels, from the left edge.
#[no_mangle]
pub extern "C" fn eden_get_mouse_x(window: *mut EdenWindow) -> f32 {
    with_input(window, 0.0, |input| input.cursor().x)
}

/// Cursor Y in window pixels, from the top edge.
#[no_mangle]
pub extern "C" fn eden_get_mouse_y(window: *mut EdenWindow) -> f32 {
    with_input(window, 0.0, |input| input.cursor().y)
}

/// Wheel movement in lines since the last `eden_poll_events`.
#[no_mangle]
pub extern "C" fn eden_get_mouse_scroll_y(window: *mut EdenWindow) -> f32 {
    with_input(window, 0.0, InputState::scroll)
}

/// Create the renderer for `window`. Returns `1` on success, `0` on
/// failure. Calling it again while initialized succeeds without effect.
#[no_mangle]
pub extern "C" fn eden_init_renderer(window: *mut EdenWindow) -> i32 {
    with_state(0, |state| {
        if !state.owns(window) {
            error!("eden_init_renderer: unknown window handle");
            return 0;
        }
        if state.renderer.is_some() {
            return 1;
        }
        let Some(polled) = state.window.as_deref_mut() else {
            return 0;
        };
        let Some(native) = polled.window() else {
            return 0;
        };
        let size = polled.size();
        let title = native.title();
        let config = RendererConfig::new(if title.is_empty() { "Eden".to_string() } else { title });
        match Renderer::new(native, size.width, size.height, config) {
            Ok(mut renderer) => {
                if let Some(overlay) = renderer.overlay_mut() {
                    polled.attach_overlay(overlay);
                }
                state.renderer = Some(renderer);
                1
            }
            Err(e) => {
                error!("Renderer initialization failed: {e}");
                0
            }
        }
    })
}

/// Destroy the renderer and every GPU resource it owns.
#[no_mangle]
pub extern "C" fn eden_cleanup_renderer() {
    with_state((), |state| {
        if state.renderer.take().is_some() {
            info!("Renderer cleaned up");
        }
    });
}

// --- frame -------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn eden_begin_frame() {
    with_renderer((), |r| report("begin_frame", r.begin_frame()));
}

/// Submit the frame, then apply the overlay's cursor requests.
#[no_mangle]
pub extern "C" fn eden_end_frame() {
    with_state((), |state| {
        let Some(renderer) = state.renderer.as_mut() else {
            return;
        };
        report("end_frame", renderer.end_frame());
        if let (Some(window), Some(overlay)) = (state.window.as_deref_mut(), renderer.overlay_mut()) {
            window.end_overlay_frame(overlay);
        }
    });
}

// --- camera ------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn eden_update_camera(px: f32, py: f32, pz: f32, rx: f32, ry: f32, rz: f32) {
    with_renderer((), |r| {
        report("update_camera", r.update_camera(pose(px, py, pz, rx, ry, rz)));
    });
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn eden_update_camera_with_far(
    px: f32,
    py: f32,
    pz: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    far_plane: f32,
) {
    with_renderer((), |r| {
        report(
            "update_camera_with_far",
            r.update_camera_with_far(pose(px, py, pz, rx, ry, rz), far_plane),
        );
    });
}

// --- drawing -----------------------------------------------------------------

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn eden_draw_cube(
    x: f32,
    y: f32,
    z: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    sx: f32,
    sy: f32,
    sz: f32,
) {
    with_renderer((), |r| {
        r.draw_cube(&pose(x, y, z, rx, ry, rz), Vec3::new(sx, sy, sz));
    });
}

/// Queue a cube tinted by `(r, g, b)`. Queued cubes are drawn with the
/// texture active at the next flush, or at the end of the frame.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn eden_draw_cube_colored(
    x: f32,
    y: f32,
    z: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    sx: f32,
    sy: f32,
    sz: f32,
    r: f32,
    g: f32,
    b: f32,
) {
    with_renderer((), |renderer| {
        report(
            "draw_cube_colored",
            renderer.draw_cube_colored(
                &pose(x, y, z, rx, ry, rz),
                Vec3::new(sx, sy, sz),
                Vec3::new(r, g, b),
            ),
        );
    });
}

/// Draw the colored cubes queued so far, before switching texture.
#[no_mangle]
pub extern "C" fn eden_flush_colored_cubes() {
    with_renderer((), |r| report("flush_colored_cubes", r.flush_colored_cubes()));
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn eden_draw_line(
    x1: f32,
    y1: f32,
    z1: f32,
    x2: f32,
    y2: f32,
    z2: f32,
    r: f32,
    g: f32,
    b: f32,
) {
    with_renderer((), |renderer| {
        report(
            "draw_line",
            renderer.draw_line(Vec3::new(x1, y1, z1), Vec3::new(x2, y2, z2), Vec3::new(r, g, b)),
        );
    });
}

#[no_mangle]
pub extern "C" fn eden_draw_model_origin(
    x: f32,
    y: f32,
    z: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    length: f32,
) {
    with_renderer((), |r| {
        report(
            "draw_model_origin",
            r.draw_model_origin(&pose(x, y, z, rx, ry, rz), length),
        );
    });
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn eden_draw_cube_wireframe(
    x: f32,
    y: f32,
    z: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    sx: f32,
    sy: f32,
    sz: f32,
    r: f32,
    g: f32,
    b: f32,
) {
    with_renderer((), |renderer| {
        report(
            "draw_cube_wireframe",
            renderer.draw_cube_wireframe(
                &pose(x, y, z, rx, ry, rz),
                Vec3::new(sx, sy, sz),
                Vec3::new(r, g, b),
            ),
        );
    });
}

#[no_mangle]
pub extern "C" fn eden_draw_ground_plane(size: f32, r: f32, g: f32, b: f32) {
    with_renderer((), |renderer| {
        report(
            "draw_ground_plane",
            renderer.draw_ground_plane(size, Vec3::new(r, g, b)),
        );
    });
}

#[no_mangle]
pub extern "C" fn eden_draw_mesh(
    mesh_id: i32,
    x: f32,
    y: f32,
    z: f32,
    rx: f32,
    ry: f32,
    rz: f32,
) {
    with_renderer((), |r| {
        r.draw_mesh(i64::from(mesh_id), &pose(x, y, z, rx, ry, rz));
    });
}

// --- loading -----------------------------------------------------------------

/// Load an ASCII mesh. Returns its id, or `-1` on failure.
///
/// # Safety
/// `path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_load_ascii_model(path: *const c_char) -> i32 {
    // SAFETY: forwarded from caller
    let Some(path) = (unsafe { c_str(path) }) else {
        return -1;
    };
    with_renderer(-1, |r| mesh_id_or_sentinel(path, r.load_mesh(path)))
}

/// The mesh id as returned to C: `-1` for a failed load or an id that does
/// not fit.
fn mesh_id_or_sentinel(path: &str, loaded: eden_render::Result<MeshId>) -> i32 {
    match loaded {
        Ok(id) => i32::try_from(id).unwrap_or(-1),
        Err(e) => {
            error!("Failed to load mesh {path}: {e}");
            -1
        }
    }
}

/// Make a texture active for subsequent draws. An empty name selects the
/// default texture. Returns `1` on success, `0` on failure.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_load_texture_for_rendering(name: *const c_char) -> i32 {
    // SAFETY: forwarded from caller
    let Some(name) = (unsafe { c_str(name) }) else {
        return 0;
    };
    with_renderer(0, |r| match r.load_texture(name) {
        Ok(()) => 1,
        Err(e) => {
            error!("Failed to load texture {name}: {e}");
            0
        }
    })
}

// --- picking -----------------------------------------------------------------

fn mouse_ray(window: *mut EdenWindow) -> Option<eden_core::Ray> {
    with_state(None, |state| {
        if !state.owns(window) {
            return None;
        }
        let cursor = state.window.as_deref()?.input().cursor();
        state.renderer.as_ref().map(|r| r.mouse_ray(cursor))
    })
}

/// World-space origin of the ray under the cursor.
#[no_mangle]
pub extern "C" fn eden_get_mouse_ray_origin(window: *mut EdenWindow) -> EdenVec3 {
    mouse_ray(window).map_or_else(EdenVec3::default, |ray| ray.origin.into())
}

/// Normalized direction of the ray under the cursor.
#[no_mangle]
pub extern "C" fn eden_get_mouse_ray_direction(window: *mut EdenWindow) -> EdenVec3 {
    mouse_ray(window).map_or_else(EdenVec3::default, |ray| ray.direction.into())
}

/// `1` if the ray under the cursor hits the box centered at `(x, y, z)`
/// with the given full size.
#[no_mangle]
pub extern "C" fn eden_ray_hits_box(
    window: *mut EdenWindow,
    x: f32,
    y: f32,
    z: f32,
    sx: f32,
    sy: f32,
    sz: f32,
) -> i32 {
    let Some(ray) = mouse_ray(window) else {
        return 0;
    };
    let aabb = Aabb::from_center_size(Vec3::new(x, y, z), Vec3::new(sx, sy, sz));
    i32::from(aabb.intersect_ray(&ray).is_some())
}

/// `1` if a downward probe from `(x, y, z)` reaches the ground plane
/// within `max_distance`. Needs no renderer.
#[no_mangle]
pub extern "C" fn eden_raycast_ground(x: f32, y: f32, z: f32, max_distance: f32) -> i32 {
    i32::from(raycast_ground(Vec3::new(x, y, z), max_distance).is_some())
}

// --- overlay -----------------------------------------------------------------

fn with_overlay<R>(fallback: R, f: impl FnOnce(&mut eden_render::Overlay) -> R) -> R {
    with_state(None, |state| {
        state.renderer.as_mut().and_then(Renderer::overlay_mut).map(f)
    })
    .unwrap_or(fallback)
}

/// Begin a panel. Returns `1` if widgets may be declared into it.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_imgui_begin(name: *const c_char) -> i32 {
    // SAFETY: forwarded from caller
    let Some(name) = (unsafe { c_str(name) }) else {
        return 0;
    };
    with_overlay(0, |o| i32::from(o.begin_panel(name)))
}

#[no_mangle]
pub extern "C" fn eden_imgui_end() {
    with_overlay((), |o| o.end_panel());
}

/// # Safety
/// `text` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_imgui_text(text: *const c_char) {
    // SAFETY: forwarded from caller
    if let Some(text) = unsafe { c_str(text) } {
        with_overlay((), |o| o.text(text));
    }
}

/// # Safety
/// `label` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_imgui_text_float(label: *const c_char, value: f32) {
    // SAFETY: forwarded from caller
    if let Some(label) = unsafe { c_str(label) } {
        with_overlay((), |o| o.text_float(label, value));
    }
}

/// Returns the edited value, or `value` when nothing changed.
///
/// # Safety
/// `label` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_imgui_drag_float(
    label: *const c_char,
    value: f32,
    speed: f32,
) -> f32 {
    // SAFETY: forwarded from caller
    let Some(label) = (unsafe { c_str(label) }) else {
        return value;
    };
    with_overlay(value, |o| o.drag_float(label, value, speed))
}

/// Edits `*value` in place. Returns `1` when it changed.
///
/// # Safety
/// `label` must be null or a valid NUL-terminated string; `value` must be
/// null or point to a writable `EdenVec3`.
#[no_mangle]
pub unsafe extern "C" fn eden_imgui_drag_float3(
    label: *const c_char,
    value: *mut EdenVec3,
    speed: f32,
) -> i32 {
    // SAFETY: forwarded from caller
    let Some(label) = (unsafe { c_str(label) }) else {
        return 0;
    };
    // SAFETY: caller guarantees `value` is null or valid and unaliased
    let Some(value) = (unsafe { value.as_mut() }) else {
        return 0;
    };
    let mut components = [value.x, value.y, value.z];
    let changed = with_overlay(false, |o| o.drag_float3(label, &mut components, speed));
    if changed {
        *value = EdenVec3 {
            x: components[0],
            y: components[1],
            z: components[2],
        };
    }
    i32::from(changed)
}

/// Returns `1` once after the button was clicked.
///
/// # Safety
/// `label` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn eden_imgui_button(label: *const c_char) -> i32 {
    // SAFETY: forwarded from caller
    let Some(label) = (unsafe { c_str(label) }) else {
        return 0;
    };
    with_overlay(0, |o| i32::from(o.button(label)))
}

#[no_mangle]
pub extern "C" fn eden_imgui_separator() {
    with_overlay((), |o| o.separator());
}

// --- misc --------------------------------------------------------------------

/// Block the calling thread. Negative values are treated as zero.
#[no_mangle]
pub extern "C" fn eden_sleep_ms(ms: i32) {
    std::thread::sleep(Duration::from_millis(u64::try_from(ms).unwrap_or(0)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use eden_render::RendererError;

    #[test]
    fn renderer_calls_before_init_are_harmless() {
        eden_begin_frame();
        eden_update_camera(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        eden_draw_cube(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        eden_draw_line(0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0);
        eden_draw_mesh(0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        eden_draw_cube_colored(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.2, 0.4, 0.6);
        eden_flush_colored_cubes();
        eden_end_frame();
        eden_cleanup_renderer();
    }

    #[test]
    fn loaders_report_failure_before_init() {
        // SAFETY: literals are NUL-terminated
        unsafe {
            assert_eq!(eden_load_ascii_model(c"cube.txt".as_ptr()), -1);
            assert_eq!(eden_load_texture_for_rendering(c"stone.png".as_ptr()), 0);
            assert_eq!(eden_load_ascii_model(std::ptr::null()), -1);
        }
    }

    #[test]
    fn failed_mesh_loads_map_to_minus_one() {
        let missing = RendererError::AssetNotFound {
            name: "absent.txt".into(),
            searched: Vec::new(),
        };
        assert_eq!(mesh_id_or_sentinel("absent.txt", Err(missing)), -1);
        assert_eq!(mesh_id_or_sentinel("cube.txt", Ok(3)), 3);
        assert_eq!(mesh_id_or_sentinel("huge.txt", Ok(MeshId::MAX)), -1);
    }

    #[test]
    fn unknown_window_handles_are_rejected() {
        let bogus = 0x10 as *mut EdenWindow;
        assert_eq!(eden_init_renderer(std::ptr::null_mut()), 0);
        assert_eq!(eden_init_renderer(bogus), 0);
        assert_eq!(eden_window_should_close(std::ptr::null_mut()), 1);
        assert_eq!(eden_ray_hits_box(bogus, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0), 0);
        assert_eq!(eden_get_mouse_ray_direction(bogus), EdenVec3::default());
        eden_destroy_window(bogus);
        eden_poll_events();
    }

    #[test]
    fn input_queries_without_a_window_report_nothing() {
        let bogus = 0x10 as *mut EdenWindow;
        for handle in [std::ptr::null_mut(), bogus] {
            assert_eq!(eden_is_key_pressed(handle, 256), 0);
            assert_eq!(eden_is_key_pressed(handle, -7), 0);
            assert_eq!(eden_is_mouse_button_pressed(handle, 0), 0);
            assert_eq!(eden_is_mouse_button_pressed(handle, 99), 0);
            assert_eq!(eden_get_mouse_x(handle), 0.0);
            assert_eq!(eden_get_mouse_y(handle), 0.0);
            assert_eq!(eden_get_mouse_scroll_y(handle), 0.0);
        }
    }

    #[test]
    fn overlay_calls_before_init_return_inputs() {
        // SAFETY: literals are NUL-terminated and `v` is a valid local
        unsafe {
            assert_eq!(eden_imgui_begin(c"Scene".as_ptr()), 0);
            assert_eq!(eden_imgui_drag_float(c"speed".as_ptr(), 2.5, 0.1), 2.5);
            let mut v = EdenVec3 {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            };
            assert_eq!(eden_imgui_drag_float3(c"pos".as_ptr(), &mut v, 0.1), 0);
            assert_eq!(
                v,
                EdenVec3 {
                    x: 1.0,
                    y: 2.0,
                    z: 3.0
                }
            );
            assert_eq!(eden_imgui_button(c"go".as_ptr()), 0);
            eden_imgui_text(std::ptr::null());
        }
        eden_imgui_separator();
        eden_imgui_end();
    }

    #[test]
    fn ground_probe_needs_no_renderer() {
        assert_eq!(eden_raycast_ground(0.0, 0.0, 0.0, 500.0), 1);
        assert_eq!(eden_raycast_ground(0.0, 0.0, 0.0, 100.0), 0);
        assert_eq!(eden_raycast_ground(0.0, -400.0, 0.0, 1000.0), 0);
    }

    #[test]
    fn vec3_conversions() {
        let v = Vec3::new(1.0, -2.0, 3.5);
        let c: EdenVec3 = v.into();
        assert_eq!(Vec3::from(c), v);
    }

    #[test]
    fn negative_sleep_returns_immediately() {
        eden_sleep_ms(-5);
    }
}
