//! Core types and math for the Eden renderer.
//!
//! This crate provides the engine-agnostic foundation used by the GPU and
//! renderer crates:
//! - Poses and model/camera matrix construction
//! - Rays, bounding boxes and picking helpers
//! - Unit and projection conventions

pub mod math;
pub mod pose;

pub use math::{Aabb, Ray};
pub use pose::Pose;

/// Renderer-wide constants.
pub mod constants {
    /// World units per meter (1 unit = 1 cm).
    pub const UNITS_PER_METER: f32 = 100.0;
    /// Vertical field of view of the camera projection, in degrees.
    pub const FOV_Y_DEGREES: f32 = 60.0;
    /// Near clip plane distance.
    pub const NEAR_PLANE: f32 = 0.1;
    /// Far clip plane used when the caller does not supply one.
    pub const DEFAULT_FAR_PLANE: f32 = 5000.0;
    /// Height of the editor ground plane.
    pub const GROUND_PLANE_Y: f32 = -300.0;
    /// Number of cells per side of the ground grid.
    pub const GROUND_GRID_DIVISIONS: u32 = 20;
}
