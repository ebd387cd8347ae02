//! Camera state and the per-image uniform block.

use bytemuck::{Pod, Zeroable};
use eden_core::constants::DEFAULT_FAR_PLANE;
use eden_core::math::{pick_ray, vulkan_perspective};
use eden_core::{Pose, Ray};
use glam::{Mat4, Vec2, Vec3};

/// Uniform block at set 0, binding 0. Must match `CameraUbo` in `cube.vert`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub view: Mat4,
    pub proj: Mat4,
}

impl UniformBufferObject {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Latest camera matrices, kept for uniform uploads and picking.
#[derive(Clone, Copy, Debug)]
pub struct CameraState {
    pub pose: Pose,
    pub far_plane: f32,
    pub view: Mat4,
    pub proj: Mat4,
}

impl CameraState {
    /// Camera at the origin looking down -Z.
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            pose: Pose::default(),
            far_plane: DEFAULT_FAR_PLANE,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        };
        camera.update(Pose::default(), aspect, DEFAULT_FAR_PLANE);
        camera
    }

    /// Recompute view and projection for `pose`.
    pub fn update(&mut self, pose: Pose, aspect: f32, far_plane: f32) {
        self.pose = pose;
        self.far_plane = far_plane;
        self.view = pose.view_matrix();
        self.proj = vulkan_perspective(aspect, far_plane);
    }

    /// World-space camera position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Data for the uniform buffer.
    pub fn uniforms(&self) -> UniformBufferObject {
        UniformBufferObject {
            view: self.view,
            proj: self.proj,
        }
    }

    /// Picking ray through a cursor position in window pixels.
    pub fn mouse_ray(&self, cursor: Vec2, viewport: Vec2) -> Ray {
        pick_ray(cursor, viewport, self.view, self.proj, self.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ubo_is_two_matrices() {
        assert_eq!(UniformBufferObject::SIZE, 128);
    }

    #[test]
    fn update_retains_pose_and_far_plane() {
        let mut camera = CameraState::new(16.0 / 9.0);
        let pose = Pose::new(Vec3::new(0.0, 100.0, 500.0), Vec3::new(-10.0, 30.0, 0.0));
        camera.update(pose, 16.0 / 9.0, 2000.0);

        assert_eq!(camera.position(), pose.position);
        assert_relative_eq!(camera.far_plane, 2000.0);
        let eye = camera.view.inverse().w_axis.truncate();
        assert!(eye.abs_diff_eq(pose.position, 1e-3));
    }

    #[test]
    fn projection_flips_y() {
        let camera = CameraState::new(1.0);
        assert!(camera.proj.y_axis.y < 0.0);
    }

    #[test]
    fn center_ray_looks_forward() {
        let camera = CameraState::new(1.0);
        let ray = camera.mouse_ray(Vec2::new(400.0, 300.0), Vec2::new(800.0, 600.0));
        assert_eq!(ray.origin, Vec3::ZERO);
        assert!(ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));
    }
}
