//! Built-in geometry: the unit cube and debug line generators.

use eden_core::constants::{GROUND_GRID_DIVISIONS, GROUND_PLANE_Y};
use eden_core::Pose;
use glam::Vec3;

use crate::vertex::Vertex;

/// Axis colors for the model-origin gizmo.
pub const AXIS_X_COLOR: Vec3 = Vec3::new(1.0, 0.0, 0.0);
pub const AXIS_Y_COLOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);
pub const AXIS_Z_COLOR: Vec3 = Vec3::new(1.0, 1.0, 0.0);

/// Vertex count of the unit cube (6 faces, 2 triangles each).
pub const CUBE_VERTEX_COUNT: usize = 36;

const FACE_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.3, 0.3],
    [0.3, 1.0, 0.3],
    [0.3, 0.3, 1.0],
    [1.0, 1.0, 0.3],
    [1.0, 0.3, 1.0],
    [0.3, 1.0, 1.0],
];

/// Corner positions of each face, counter-clockwise seen from outside.
const FACES: [[[f32; 3]; 4]; 6] = [
    // +Z
    [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
    // -Z
    [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]],
    // +Y
    [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]],
    // -Y
    [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]],
    // +X
    [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]],
    // -X
    [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]],
];

const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Unit cube centered at the origin as a triangle list.
pub fn cube_vertices() -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(CUBE_VERTEX_COUNT);
    for (corners, color) in FACES.iter().zip(FACE_COLORS) {
        for i in [0, 1, 2, 2, 3, 0] {
            vertices.push(Vertex::new(corners[i], QUAD_UVS[i], color));
        }
    }
    vertices
}

/// The three axis segments of a model-origin gizmo with their colors.
pub fn origin_axes(pose: &Pose, length: f32) -> [(Vec3, Vec3, Vec3); 3] {
    let model = pose.model_matrix();
    let origin = model.transform_point3(Vec3::ZERO);
    let axis = |unit: Vec3| {
        let tip = model.transform_point3(unit);
        origin + (tip - origin).normalize_or_zero() * length
    };
    [
        (origin, axis(Vec3::X), AXIS_X_COLOR),
        (origin, axis(Vec3::Y), AXIS_Y_COLOR),
        (origin, axis(Vec3::Z), AXIS_Z_COLOR),
    ]
}

const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// The 12 edges of a box of `size` at `pose`.
pub fn wireframe_box_edges(pose: &Pose, size: Vec3) -> [(Vec3, Vec3); 12] {
    let h = size * 0.5;
    let model = pose.model_matrix();
    let corners = [
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ]
    .map(|c| model.transform_point3(c));

    BOX_EDGES.map(|(a, b)| (corners[a], corners[b]))
}

/// Grid lines covering a `size` square on the ground plane: every line
/// parallel to X first, then every line parallel to Z.
pub fn ground_grid_lines(size: f32) -> Vec<(Vec3, Vec3)> {
    let half = size * 0.5;
    let step = size / GROUND_GRID_DIVISIONS as f32;
    let y = GROUND_PLANE_Y;
    let offsets = || (0..=GROUND_GRID_DIVISIONS).map(move |i| -half + i as f32 * step);

    let along_x = offsets().map(|z| (Vec3::new(-half, y, z), Vec3::new(half, y, z)));
    let along_z = offsets().map(|x| (Vec3::new(x, y, -half), Vec3::new(x, y, half)));
    along_x.chain(along_z).collect()
}

/// The unit cube moved to world space by `pose` and `scale`, every vertex
/// carrying `color` as its tint.
pub fn colored_cube_vertices(pose: &Pose, scale: Vec3, color: Vec3) -> impl Iterator<Item = Vertex> {
    let model = pose.scaled_model_matrix(scale);
    let color = color.to_array();
    cube_vertices().into_iter().map(move |v| Vertex {
        position: model.transform_point3(Vec3::from(v.position)).to_array(),
        color,
        ..v
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cube_has_36_vertices_within_unit_box() {
        let vertices = cube_vertices();
        assert_eq!(vertices.len(), CUBE_VERTEX_COUNT);
        for v in &vertices {
            for c in v.position {
                assert_relative_eq!(c.abs(), 0.5);
            }
        }
    }

    #[test]
    fn cube_faces_have_distinct_colors() {
        let vertices = cube_vertices();
        let mut colors: Vec<[f32; 3]> = vertices.chunks(6).map(|face| face[0].color).collect();
        assert!(vertices.chunks(6).all(|face| face.iter().all(|v| v.color == face[0].color)));
        colors.dedup();
        assert_eq!(colors.len(), 6);
    }

    #[test]
    fn cube_triangles_face_outward() {
        for tri in cube_vertices().chunks(3) {
            let a = Vec3::from(tri[0].position);
            let b = Vec3::from(tri[1].position);
            let c = Vec3::from(tri[2].position);
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) > 0.0);
        }
    }

    #[test]
    fn unrotated_axes_follow_world_axes() {
        let pose = Pose::at(Vec3::new(10.0, 0.0, 0.0));
        let axes = origin_axes(&pose, 50.0);
        assert_eq!(axes[0].0, Vec3::new(10.0, 0.0, 0.0));
        assert!(axes[0].1.abs_diff_eq(Vec3::new(60.0, 0.0, 0.0), 1e-4));
        assert!(axes[1].1.abs_diff_eq(Vec3::new(10.0, 50.0, 0.0), 1e-4));
        assert!(axes[2].1.abs_diff_eq(Vec3::new(10.0, 0.0, 50.0), 1e-4));
        assert_eq!(axes[2].2, AXIS_Z_COLOR);
    }

    #[test]
    fn rotated_axes_keep_length() {
        let pose = Pose::new(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0));
        let axes = origin_axes(&pose, 2.0);
        assert!(axes[0].1.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-4));
        for (start, end, _) in axes {
            assert_relative_eq!(start.distance(end), 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn wireframe_edges_span_box() {
        let edges = wireframe_box_edges(&Pose::default(), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(edges.len(), 12);
        assert_eq!(edges[0], (Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, -2.0, -3.0)));
        assert_eq!(edges[8], (Vec3::new(-1.0, -2.0, -3.0), Vec3::new(-1.0, -2.0, 3.0)));
        for (a, b) in edges {
            let len = a.distance(b);
            assert!([2.0, 4.0, 6.0].iter().any(|l| (len - l).abs() < 1e-5));
        }
    }

    #[test]
    fn ground_grid_covers_plane() {
        let lines = ground_grid_lines(2000.0);
        assert_eq!(lines.len(), 42);
        assert!(lines.iter().all(|(a, b)| a.y == GROUND_PLANE_Y && b.y == GROUND_PLANE_Y));
        assert_eq!(lines[0], (Vec3::new(-1000.0, -300.0, -1000.0), Vec3::new(1000.0, -300.0, -1000.0)));
        let last = lines[41];
        assert_relative_eq!(last.0.x, 1000.0, epsilon = 1e-3);
    }

    #[test]
    fn ground_grid_emits_x_lines_before_z_lines() {
        let lines = ground_grid_lines(200.0);
        let (along_x, along_z) = lines.split_at(GROUND_GRID_DIVISIONS as usize + 1);
        assert!(along_x.iter().all(|(a, b)| a.z == b.z && a.x == -100.0 && b.x == 100.0));
        assert!(along_z.iter().all(|(a, b)| a.x == b.x && a.z == -100.0 && b.z == 100.0));
        assert_relative_eq!(along_x[1].0.z, -90.0, epsilon = 1e-4);
        assert_relative_eq!(along_z[1].0.x, -90.0, epsilon = 1e-4);
    }

    #[test]
    fn colored_cube_is_in_world_space() {
        let pose = Pose::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0));
        let color = Vec3::new(0.2, 0.4, 0.6);
        let vertices: Vec<Vertex> =
            colored_cube_vertices(&pose, Vec3::new(2.0, 1.0, 1.0), color).collect();
        assert_eq!(vertices.len(), CUBE_VERTEX_COUNT);
        assert!(vertices.iter().all(|v| v.color == [0.2, 0.4, 0.6]));

        // Local +X face (scaled to x = 1) turns to world -Z under a 90 degree yaw
        let face = &vertices[24..30];
        for v in face {
            assert_relative_eq!(v.position[2], -1.0, epsilon = 1e-4);
        }
        let unit = cube_vertices();
        assert!(vertices.iter().zip(&unit).all(|(a, b)| a.uv == b.uv));
    }
}
