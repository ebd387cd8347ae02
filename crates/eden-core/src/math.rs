//! Math utilities: rays, bounding boxes, projection and picking helpers.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::constants::{FOV_Y_DEGREES, GROUND_PLANE_Y, NEAR_PLANE};

/// A half-line used for picking. The direction is kept unit length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point `t` world units along the ray.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned box given by its two extreme corners.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with full edge lengths `size`.
    #[inline]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive on every face.
    #[inline]
    pub fn contains(&self, point: Vec3) -> bool {
        (point.cmpge(self.min) & point.cmple(self.max)).all()
    }

    /// Slab test. Returns the entry and exit distances with the entry clamped
    /// to zero, or `None` when the box is missed or lies behind the origin.
    ///
    /// Near-zero direction components are replaced by a large reciprocal of
    /// the same sign, so rays parallel to a face still classify correctly.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        const PARALLEL: f32 = 1e-6;
        const HUGE: f32 = 1e6;
        let reciprocal = ray.direction.normalize_or_zero().to_array().map(|d| {
            if d.abs() >= PARALLEL {
                d.recip()
            } else {
                HUGE.copysign(d)
            }
        });
        let reciprocal = Vec3::from_array(reciprocal);

        let to_min = (self.min - ray.origin) * reciprocal;
        let to_max = (self.max - ray.origin) * reciprocal;
        let entry = to_min.min(to_max).max_element();
        let exit = to_min.max(to_max).min_element();

        (exit >= 0.0 && exit >= entry).then(|| (entry.max(0.0), exit))
    }
}

/// Right-handed, zero-to-one depth perspective with Y flipped for Vulkan
/// clip space. Uses the fixed field of view and near plane.
pub fn vulkan_perspective(aspect: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, NEAR_PLANE, far);
    proj.y_axis.y *= -1.0;
    proj
}

/// Convert a cursor position in pixels to normalized device coordinates.
///
/// Screen Y grows downward, and so does Vulkan NDC Y, so no flip happens.
pub fn screen_to_ndc(cursor: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new(
        2.0 * cursor.x / viewport.x - 1.0,
        2.0 * cursor.y / viewport.y - 1.0,
    )
}

/// Unproject an NDC position into world-space near and far points.
pub fn unproject(ndc: Vec2, inverse_projection: Mat4, inverse_view: Mat4) -> (Vec3, Vec3) {
    let to_world = |z: f32| {
        let eye = inverse_projection * ndc.extend(z).extend(1.0);
        let eye = eye / eye.w;
        (inverse_view * eye).xyz()
    };
    (to_world(-1.0), to_world(1.0))
}

/// Build a picking ray through `cursor`, starting at the camera position.
pub fn pick_ray(cursor: Vec2, viewport: Vec2, view: Mat4, projection: Mat4, eye: Vec3) -> Ray {
    let ndc = screen_to_ndc(cursor, viewport);
    let (near, far) = unproject(ndc, projection.inverse(), view.inverse());
    let span = far - near;
    let direction = if span.length() > 1e-4 {
        span
    } else {
        far - eye
    };
    Ray::new(eye, direction)
}

/// Cast straight down from `position` onto the ground plane.
///
/// Returns the hit point when `position` is above the plane and the plane
/// lies within `max_distance`.
pub fn raycast_ground(position: Vec3, max_distance: f32) -> Option<Vec3> {
    if position.y > GROUND_PLANE_Y && position.y - max_distance <= GROUND_PLANE_Y {
        Some(Vec3::new(position.x, GROUND_PLANE_Y, position.z))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::ONE, Vec3::new(0.0, 0.0, -4.0));
        assert_eq!(ray.direction, Vec3::NEG_Z);
        assert_eq!(ray.point_at(2.0), Vec3::new(1.0, 1.0, -1.0));
    }

    #[test]
    fn box_from_center_and_size() {
        let b = Aabb::from_center_size(Vec3::new(100.0, 0.0, -50.0), Vec3::new(20.0, 10.0, 4.0));
        assert_eq!(b.min, Vec3::new(90.0, -5.0, -52.0));
        assert_eq!(b.center(), Vec3::new(100.0, 0.0, -50.0));
        assert_eq!(b.extent(), Vec3::new(20.0, 10.0, 4.0));
    }

    #[test]
    fn containment_includes_faces() {
        let b = unit_box();
        assert!(b.contains(Vec3::ONE));
        assert!(b.contains(Vec3::new(0.0, 0.25, 1.0)));
        assert!(!b.contains(Vec3::new(0.5, -0.01, 0.5)));
    }

    #[test]
    fn slab_test_reports_entry_and_exit() {
        let ray = Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::X);
        let (entry, exit) = unit_box().intersect_ray(&ray).unwrap();
        assert_relative_eq!(entry, 1.0, epsilon = 1e-3);
        assert_relative_eq!(exit, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn slab_test_misses() {
        let b = unit_box();
        let above = Ray::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::X);
        let behind = Ray::new(Vec3::new(3.0, 0.5, 0.5), Vec3::X);
        let zero = Ray::new(Vec3::splat(5.0), Vec3::ZERO);
        assert_eq!(b.intersect_ray(&above), None);
        assert_eq!(b.intersect_ray(&behind), None);
        assert_eq!(b.intersect_ray(&zero), None);
    }

    #[test]
    fn diagonal_ray_hits_corner_region() {
        let ray = Ray::new(Vec3::splat(-1.0), Vec3::ONE);
        let (entry, exit) = unit_box().intersect_ray(&ray).unwrap();
        assert_relative_eq!(entry, 3f32.sqrt(), epsilon = 1e-3);
        assert_relative_eq!(exit, 2.0 * 3f32.sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn ray_from_inside_box_hits() {
        let aabb = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(2.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        let (entry, exit) = aabb.intersect_ray(&ray).expect("origin inside box");
        assert_relative_eq!(entry, 0.0);
        assert_relative_eq!(exit, 1.0, epsilon = 1e-5);
    }
    #[test]
    fn perspective_flips_y() {
        let proj = vulkan_perspective(16.0 / 9.0, 5000.0);
        assert!(proj.y_axis.y < 0.0);
        let reference = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 5000.0);
        assert_relative_eq!(proj.y_axis.y, -reference.y_axis.y);
        assert_relative_eq!(proj.x_axis.x, reference.x_axis.x);
    }

    #[test]
    fn screen_center_maps_to_ndc_origin() {
        let ndc = screen_to_ndc(Vec2::new(640.0, 360.0), Vec2::new(1280.0, 720.0));
        assert_relative_eq!(ndc.x, 0.0);
        assert_relative_eq!(ndc.y, 0.0);
        let corner = screen_to_ndc(Vec2::ZERO, Vec2::new(1280.0, 720.0));
        assert_eq!(corner, Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn center_pick_ray_looks_down_negative_z() {
        let view = Mat4::IDENTITY;
        let proj = vulkan_perspective(1.0, 1000.0);
        let ray = pick_ray(
            Vec2::new(50.0, 50.0),
            Vec2::new(100.0, 100.0),
            view,
            proj,
            Vec3::ZERO,
        );
        assert_eq!(ray.origin, Vec3::ZERO);
        assert_relative_eq!(ray.direction.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(ray.direction.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(ray.direction.z.abs(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn ground_raycast() {
        let hit = raycast_ground(Vec3::new(10.0, 0.0, -4.0), 400.0);
        assert_eq!(hit, Some(Vec3::new(10.0, -300.0, -4.0)));

        // Too far above the ground
        assert_eq!(raycast_ground(Vec3::new(0.0, 0.0, 0.0), 100.0), None);
        // Already below the ground
        assert_eq!(raycast_ground(Vec3::new(0.0, -400.0, 0.0), 1000.0), None);
    }
}
