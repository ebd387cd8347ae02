//! Object and camera poses.
//!
//! Rotations are Euler angles in degrees. Objects compose their rotation as
//! X, then Y, then Z (applied right-to-left to the vertex), while the camera
//! composes yaw before pitch so that looking around never rolls the view.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Position plus Euler rotation in degrees.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Pose {
    /// World-space position.
    pub position: Vec3,
    /// Euler rotation in degrees around X, Y and Z.
    pub rotation: Vec3,
}

impl Pose {
    /// Create a pose from a position and a rotation in degrees.
    #[inline]
    pub const fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` with no rotation.
    #[inline]
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
        }
    }

    /// Rotation part of an object's model matrix (rotX * rotY * rotZ).
    pub fn rotation_matrix(&self) -> Mat4 {
        let r = self.rotation;
        Mat4::from_rotation_x(r.x.to_radians())
            * Mat4::from_rotation_y(r.y.to_radians())
            * Mat4::from_rotation_z(r.z.to_radians())
    }

    /// Model matrix without scale: translate * rotX * rotY * rotZ.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.rotation_matrix()
    }

    /// Model matrix with a trailing per-axis scale.
    pub fn scaled_model_matrix(&self, scale: Vec3) -> Mat4 {
        self.model_matrix() * Mat4::from_scale(scale)
    }

    /// Camera world transform: translate * rotY * rotX * rotZ.
    pub fn camera_world_matrix(&self) -> Mat4 {
        let r = self.rotation;
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(r.y.to_radians())
            * Mat4::from_rotation_x(r.x.to_radians())
            * Mat4::from_rotation_z(r.z.to_radians())
    }

    /// View matrix for a camera at this pose.
    pub fn view_matrix(&self) -> Mat4 {
        self.camera_world_matrix().inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_pose_is_identity() {
        let pose = Pose::default();
        assert_eq!(pose.model_matrix(), Mat4::IDENTITY);
        assert_eq!(pose.view_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn scaled_model_applies_scale_before_translation() {
        let pose = Pose::at(Vec3::new(10.0, 0.0, 0.0));
        let m = pose.scaled_model_matrix(Vec3::new(2.0, 3.0, 4.0));
        let p = m.transform_point3(Vec3::ONE);
        assert_relative_eq!(p.x, 12.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn model_rotation_order_is_x_then_y_then_z() {
        let pose = Pose::new(Vec3::ZERO, Vec3::new(90.0, 90.0, 0.0));
        // rotX(90) * rotY(90) applied to +X: rotY sends X to -Z, rotX sends -Z to +Y.
        let p = pose.model_matrix().transform_vector3(Vec3::X);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn camera_yaw_turns_forward_vector() {
        let pose = Pose::new(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0));
        let forward = pose.camera_world_matrix().transform_vector3(Vec3::NEG_Z);
        assert_relative_eq!(forward.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(forward.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let pose = Pose::new(Vec3::new(5.0, -2.0, 7.0), Vec3::new(20.0, 45.0, 10.0));
        let eye = pose.view_matrix().transform_point3(pose.position);
        assert_relative_eq!(eye.length(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn pose_is_six_packed_floats() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        let floats: [f32; 6] = bytemuck::cast(pose);
        assert_eq!(floats, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
