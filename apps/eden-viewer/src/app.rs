//! Viewer application: an orbit camera around a handful of cubes.

use std::path::PathBuf;

use glam::{Vec2, Vec3};
use tracing::{info, warn};

use eden_app::{EdenApp, InputState, KeyCode, MouseButton, Renderer};
use eden_core::{Aabb, Pose};
use eden_render::MeshId;

/// Default frame rate cap.
const DEFAULT_FPS: u32 = 120;

/// Orbit rotation in degrees per pixel of mouse drag.
const ORBIT_SENSITIVITY: f32 = 0.3;

/// Zoom factor per scroll line.
const ZOOM_STEP: f32 = 0.9;

const MIN_DISTANCE: f32 = 150.0;
const MAX_DISTANCE: f32 = 4000.0;
const PITCH_LIMIT: f32 = 89.0;

/// Side length of the demo cubes (1 m).
const CUBE_SIZE: f32 = 100.0;

const GRID_SIZE: f32 = 2000.0;
const GRID_COLOR: Vec3 = Vec3::new(0.35, 0.35, 0.4);
const SELECTED_COLOR: Vec3 = Vec3::new(1.0, 0.85, 0.1);
/// Tint of the slab under each cube.
const PEDESTAL_COLOR: Vec3 = Vec3::new(0.3, 0.45, 0.8);

/// Command line options.
#[derive(Debug, Clone)]
pub struct ViewerArgs {
    pub mesh: Option<String>,
    pub texture: Option<String>,
    pub asset_root: Option<PathBuf>,
    pub target_fps: u32,
}

impl Default for ViewerArgs {
    fn default() -> Self {
        Self {
            mesh: None,
            texture: None,
            asset_root: None,
            target_fps: DEFAULT_FPS,
        }
    }
}

impl ViewerArgs {
    /// Parse options from the process arguments.
    pub fn from_args() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mesh" => parsed.mesh = args.next(),
                "--texture" => parsed.texture = args.next(),
                "--assets" => parsed.asset_root = args.next().map(PathBuf::from),
                "--fps" => {
                    if let Some(fps) = args.next().and_then(|v| v.parse().ok()) {
                        parsed.target_fps = fps;
                    }
                }
                other => warn!("Ignoring unknown argument {other:?}"),
            }
        }
        parsed
    }
}

/// Orbit camera looking at a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub target: Vec3,
    /// Degrees around Y.
    pub yaw: f32,
    /// Degrees around X; negative looks down.
    pub pitch: f32,
    pub distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 30.0,
            pitch: -25.0,
            distance: 900.0,
        }
    }
}

impl OrbitCamera {
    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(
            -pitch.cos() * yaw.sin(),
            pitch.sin(),
            -pitch.cos() * yaw.cos(),
        )
    }

    /// Camera pose for the renderer.
    pub fn pose(&self) -> Pose {
        Pose::new(
            self.target - self.forward() * self.distance,
            Vec3::new(self.pitch, self.yaw, 0.0),
        )
    }

    pub fn rotate(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch - delta.y * ORBIT_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance * ZOOM_STEP.powf(lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

/// One cube in the scene.
#[derive(Debug, Clone, Copy)]
struct SceneCube {
    pose: Pose,
    spin: f32,
}

/// Viewer application state.
pub struct Viewer {
    camera: OrbitCamera,
    cubes: Vec<SceneCube>,
    mesh: Option<MeshId>,
    texture: Option<String>,
    selected: Option<usize>,
    /// Cursor position of a pending left click.
    pick_at: Option<Vec2>,
    spin_speed: f32,
    fps: f32,
    quit: bool,
}

fn initial_cubes() -> Vec<SceneCube> {
    [-250.0, 0.0, 250.0]
        .into_iter()
        .enumerate()
        .map(|(i, x)| SceneCube {
            pose: Pose::at(Vec3::new(x, 0.0, 0.0)),
            spin: i as f32 * 15.0,
        })
        .collect()
}

impl EdenApp for Viewer {
    fn init(renderer: &mut Renderer) -> anyhow::Result<Self> {
        let args = ViewerArgs::from_args();

        let mesh = match &args.mesh {
            Some(path) => match renderer.load_mesh(path) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Mesh {path} unavailable: {e}");
                    None
                }
            },
            None => None,
        };

        info!(
            "Viewer ready: {} cubes, mesh {:?}, texture {:?}",
            initial_cubes().len(),
            mesh,
            args.texture
        );

        Ok(Self {
            camera: OrbitCamera::default(),
            cubes: initial_cubes(),
            mesh,
            texture: args.texture,
            selected: None,
            pick_at: None,
            spin_speed: 45.0,
            fps: 0.0,
            quit: false,
        })
    }

    fn update(&mut self, input: &InputState, dt: f32) {
        if input.is_key_down(KeyCode::Escape) {
            self.quit = true;
        }
        if input.is_button_down(MouseButton::Right) {
            self.camera.rotate(input.cursor_delta());
        }
        if input.scroll() != 0.0 {
            self.camera.zoom(input.scroll());
        }
        if input.is_button_down(MouseButton::Left) && self.pick_at.is_none() {
            self.pick_at = Some(input.cursor());
        }

        for cube in &mut self.cubes {
            cube.spin = (cube.spin + self.spin_speed * dt) % 360.0;
        }
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + 0.1 / dt;
        }
    }

    fn render(&mut self, renderer: &mut Renderer) -> anyhow::Result<()> {
        renderer.update_camera(self.camera.pose())?;

        if let Some(cursor) = self.pick_at.take() {
            let ray = renderer.mouse_ray(cursor);
            self.selected = self
                .cubes
                .iter()
                .enumerate()
                .filter_map(|(i, cube)| {
                    Aabb::from_center_size(cube.pose.position, Vec3::splat(CUBE_SIZE))
                        .intersect_ray(&ray)
                        .map(|(t, _)| (i, t))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
        }

        renderer.draw_ground_plane(GRID_SIZE, GRID_COLOR)?;

        if let Some(texture) = &self.texture {
            renderer.load_texture(texture)?;
        }
        for (i, cube) in self.cubes.iter().enumerate() {
            let pose = Pose::new(cube.pose.position, Vec3::new(0.0, cube.spin, 0.0));
            renderer.draw_cube(&pose, Vec3::splat(CUBE_SIZE));
            renderer.draw_model_origin(&pose, CUBE_SIZE)?;

            let tint = if self.selected == Some(i) {
                SELECTED_COLOR
            } else {
                PEDESTAL_COLOR
            };
            let slab = Pose::at(cube.pose.position - Vec3::Y * CUBE_SIZE * 0.6);
            renderer.draw_cube_colored(&slab, Vec3::new(CUBE_SIZE, CUBE_SIZE * 0.1, CUBE_SIZE), tint)?;
        }
        // Pedestals take the cube texture, not the one restored below
        renderer.flush_colored_cubes()?;
        if let Some(cube) = self.selected.and_then(|i| self.cubes.get(i)) {
            renderer.draw_cube_wireframe(
                &Pose::at(cube.pose.position),
                Vec3::splat(CUBE_SIZE * 1.05),
                SELECTED_COLOR,
            )?;
        }
        if self.texture.is_some() {
            renderer.load_texture("")?;
        }

        if let Some(id) = self.mesh {
            renderer.draw_mesh(i64::from(id), &Pose::at(Vec3::new(0.0, 150.0, 0.0)));
        }

        self.draw_panel(renderer);
        Ok(())
    }

    fn should_exit(&self) -> bool {
        self.quit
    }

    fn cleanup(&mut self, renderer: &mut Renderer) {
        info!("Viewer closing with {} meshes loaded", renderer.mesh_count());
    }
}

impl Viewer {
    fn draw_panel(&mut self, renderer: &mut Renderer) {
        let Some(ui) = renderer.overlay_mut() else {
            return;
        };
        if !ui.begin_panel("Viewer") {
            return;
        }
        ui.text_float("FPS", self.fps);
        ui.text_float("Distance", self.camera.distance);
        self.spin_speed = ui.drag_float("Spin speed", self.spin_speed, 1.0);

        let mut target = self.camera.target.to_array();
        if ui.drag_float3("Target", &mut target, 5.0) {
            self.camera.target = Vec3::from_array(target);
        }

        ui.separator();
        match self.selected {
            Some(i) => ui.text(&format!("Selected cube {i}")),
            None => ui.text("Left click a cube to select it"),
        }
        if ui.button("Reset camera") {
            self.camera = OrbitCamera::default();
        }
        ui.end_panel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn args(list: &[&str]) -> ViewerArgs {
        ViewerArgs::parse(list.iter().map(ToString::to_string))
    }

    #[test]
    fn parse_options() {
        let parsed = args(&["--mesh", "ship.txt", "--fps", "30", "--texture", "stone.png"]);
        assert_eq!(parsed.mesh.as_deref(), Some("ship.txt"));
        assert_eq!(parsed.texture.as_deref(), Some("stone.png"));
        assert_eq!(parsed.target_fps, 30);
        assert!(parsed.asset_root.is_none());
    }

    #[test]
    fn bad_fps_keeps_default() {
        assert_eq!(args(&["--fps", "fast"]).target_fps, DEFAULT_FPS);
        assert_eq!(args(&["--fps"]).target_fps, DEFAULT_FPS);
    }

    #[test]
    fn orbit_camera_faces_target() {
        let camera = OrbitCamera {
            target: Vec3::new(10.0, 20.0, 30.0),
            ..OrbitCamera::default()
        };
        let pose = camera.pose();
        assert_relative_eq!(pose.position.distance(camera.target), camera.distance, epsilon = 1e-2);

        let facing = pose.camera_world_matrix().transform_vector3(Vec3::NEG_Z);
        let expected = (camera.target - pose.position).normalize();
        assert!(facing.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn orbit_limits() {
        let mut camera = OrbitCamera::default();
        camera.rotate(Vec2::new(0.0, -10_000.0));
        assert_relative_eq!(camera.pitch, PITCH_LIMIT);
        camera.zoom(-100.0);
        assert_relative_eq!(camera.distance, MAX_DISTANCE);
        camera.zoom(100.0);
        assert_relative_eq!(camera.distance, MIN_DISTANCE);
    }
}
