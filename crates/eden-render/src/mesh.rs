//! ASCII mesh format and conversion to renderer vertices.
//!
//! A mesh file holds four sections, each opened by a header line:
//!
//! ```text
//! Vertices: 3;
//! 0 0 0;
//! 1 0 0;
//! 0 1 0;
//! Triangles: 1;
//! 0 1 2;
//! SkinPoints: 3;
//! 0 0;
//! 1 0;
//! 0 1;
//! SkinTriangles: 1;
//! 0, 0 1 2;
//! ```
//!
//! Records end with `;`. Lines that are not terminated or do not parse are
//! skipped. A header restarts its section, so the last occurrence wins.

use std::path::{Path, PathBuf};

use eden_core::constants::UNITS_PER_METER;
use glam::{Vec2, Vec3};

use crate::config::{candidate_paths, first_existing, MESH_SEARCH_DIRS};
use crate::error::{RendererError, Result};
use crate::vertex::Vertex;

/// Scale applied to mesh positions: files are in meters, the world in
/// centimeters.
pub const MESH_UNIT_SCALE: f32 = UNITS_PER_METER;

const MESH_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    None,
    Vertices,
    Triangles,
    SkinPoints,
    SkinTriangles,
}

/// Raw contents of a mesh file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[i32; 3]>,
    pub uvs: Vec<Vec2>,
    pub uv_triangles: Vec<[i32; 3]>,
}

impl ParsedMesh {
    /// Parse mesh text.
    pub fn parse(text: &str) -> Self {
        let mut mesh = Self::default();
        let mut section = Section::None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with("Vertices:") {
                section = Section::Vertices;
                mesh.positions.clear();
                continue;
            }
            if line.starts_with("Triangles:") {
                section = Section::Triangles;
                mesh.triangles.clear();
                continue;
            }
            if line.starts_with("SkinPoints:") {
                section = Section::SkinPoints;
                mesh.uvs.clear();
                continue;
            }
            if line.starts_with("SkinTriangles:") {
                section = Section::SkinTriangles;
                mesh.uv_triangles.clear();
                continue;
            }

            let Some(record) = line.strip_suffix(';') else {
                continue;
            };

            match section {
                Section::Vertices => {
                    if let Some([x, y, z]) = parse_fields::<f32, 3>(record) {
                        mesh.positions.push(Vec3::new(x, y, z));
                    }
                }
                Section::Triangles => {
                    if let Some(tri) = parse_fields::<i32, 3>(record) {
                        mesh.triangles.push(tri);
                    }
                }
                Section::SkinPoints => {
                    if let Some([u, v]) = parse_fields::<f32, 2>(record) {
                        mesh.uvs.push(Vec2::new(u, v));
                    }
                }
                Section::SkinTriangles => {
                    // "triIdx, uv1 uv2 uv3": the triangle index is implied by order
                    let Some((index, rest)) = record.split_once(',') else {
                        continue;
                    };
                    if index.trim().parse::<i32>().is_err() {
                        continue;
                    }
                    if let Some(tri) = parse_fields::<i32, 3>(rest) {
                        mesh.uv_triangles.push(tri);
                    }
                }
                Section::None => {}
            }
        }

        mesh
    }

    /// Read and parse a mesh file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RendererError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Expand the indexed data into a triangle list.
    pub fn build_vertices(&self) -> Vec<Vertex> {
        build_mesh_vertices(&self.positions, &self.uvs, &self.triangles, &self.uv_triangles)
    }
}

fn parse_fields<T: std::str::FromStr, const N: usize>(record: &str) -> Option<[T; N]> {
    let values: Vec<T> = record
        .split_whitespace()
        .take(N)
        .map(|field| field.parse().ok())
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

fn lookup<T: Copy>(items: &[T], index: i32) -> Option<T> {
    usize::try_from(index).ok().and_then(|i| items.get(i).copied())
}

/// Build one vertex per triangle corner.
///
/// Positions are scaled by [`MESH_UNIT_SCALE`] and V is flipped. Indices
/// out of range fall back to the origin and to UV `(0, 0)`; triangles
/// without a UV triangle use UV index 0 for every corner. Vertices are
/// white so textures render untinted.
pub fn build_mesh_vertices(
    positions: &[Vec3],
    uvs: &[Vec2],
    triangles: &[[i32; 3]],
    uv_triangles: &[[i32; 3]],
) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(triangles.len() * 3);
    for (i, tri) in triangles.iter().enumerate() {
        let uv_tri = uv_triangles.get(i).copied().unwrap_or([0, 0, 0]);
        for (&v_index, &uv_index) in tri.iter().zip(&uv_tri) {
            let position = lookup(positions, v_index).map_or(Vec3::ZERO, |p| p * MESH_UNIT_SCALE);
            let uv = lookup(uvs, uv_index).map_or([0.0, 0.0], |uv| [uv.x, 1.0 - uv.y]);
            vertices.push(Vertex::new(position.to_array(), uv, MESH_COLOR));
        }
    }
    vertices
}

/// Locate a mesh file by probing the mesh search directories under each root.
pub fn find_mesh_file(roots: &[PathBuf], name: &str) -> Result<PathBuf> {
    let candidates = candidate_paths(roots, &MESH_SEARCH_DIRS, name);
    match first_existing(&candidates) {
        Some(path) => Ok(path.to_path_buf()),
        None => Err(RendererError::AssetNotFound {
            name: name.to_string(),
            searched: candidates,
        }),
    }
}

/// Find, read and expand a mesh file into vertices.
///
/// Fails when the file is missing or yields no vertices.
pub fn load_mesh_vertices(roots: &[PathBuf], name: &str) -> Result<Vec<Vertex>> {
    let path = find_mesh_file(roots, name)?;
    let vertices = ParsedMesh::load(&path)?.build_vertices();
    if vertices.is_empty() {
        return Err(RendererError::EmptyMesh(name.to_string()));
    }
    tracing::debug!(
        "Parsed mesh {} ({} vertices)",
        path.display(),
        vertices.len()
    );
    Ok(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRIANGLE: &str = "\
Vertices: 3;
  0 0 0;
  1 2 3;
  0 1 0;
Triangles: 1;
0 1 2;
SkinPoints: 3;
0 0;
1 0.25;
0 1;
SkinTriangles: 1;
0, 0 1 2;
";

    #[test]
    fn parses_all_sections() {
        let mesh = ParsedMesh::parse(TRIANGLE);
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.positions[1], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.uvs[1], Vec2::new(1.0, 0.25));
        assert_eq!(mesh.uv_triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn unterminated_and_malformed_lines_are_skipped() {
        let text = "Vertices: 2;\n1 2 3\n4 5 six;\n7 8 9;\n";
        let mesh = ParsedMesh::parse(text);
        assert_eq!(mesh.positions, vec![Vec3::new(7.0, 8.0, 9.0)]);
    }

    #[test]
    fn repeated_header_restarts_section() {
        let text = "Vertices: 1;\n1 1 1;\nVertices: 1;\n2 2 2;\n";
        let mesh = ParsedMesh::parse(text);
        assert_eq!(mesh.positions, vec![Vec3::new(2.0, 2.0, 2.0)]);
    }

    #[test]
    fn data_before_any_header_is_ignored() {
        let mesh = ParsedMesh::parse("1 2 3;\n");
        assert_eq!(mesh, ParsedMesh::default());
    }

    #[test]
    fn positions_are_scaled_to_centimeters() {
        let vertices = ParsedMesh::parse(TRIANGLE).build_vertices();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [100.0, 200.0, 300.0]);
        assert_eq!(vertices[1].color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn uvs_are_flipped() {
        let vertices = ParsedMesh::parse(TRIANGLE).build_vertices();
        assert_relative_eq!(vertices[1].uv[0], 1.0);
        assert_relative_eq!(vertices[1].uv[1], 0.75);
        assert_relative_eq!(vertices[2].uv[1], 0.0);
    }

    #[test]
    fn degenerate_single_point_mesh() {
        let vertices = build_mesh_vertices(
            &[Vec3::ZERO],
            &[Vec2::ZERO],
            &[[0, 0, 0]],
            &[[0, 0, 0]],
        );
        assert_eq!(vertices.len(), 3);
        for v in vertices {
            assert_eq!(v.position, [0.0, 0.0, 0.0]);
            assert_eq!(v.uv, [0.0, 1.0]);
        }
    }

    #[test]
    fn out_of_range_indices_fall_back() {
        let vertices = build_mesh_vertices(
            &[Vec3::ONE],
            &[Vec2::new(0.5, 0.5)],
            &[[0, 7, -1]],
            &[[0, 9, 0]],
        );
        assert_eq!(vertices[0].position, [100.0, 100.0, 100.0]);
        assert_eq!(vertices[1].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[2].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[1].uv, [0.0, 0.0]);
        assert_eq!(vertices[0].uv, [0.5, 0.5]);
    }

    #[test]
    fn missing_uv_triangles_use_first_uv() {
        let vertices = build_mesh_vertices(&[Vec3::X], &[Vec2::new(0.2, 0.0)], &[[0, 0, 0]], &[]);
        assert!(vertices.iter().all(|v| v.uv == [0.2, 1.0]));
    }

    #[test]
    fn missing_file_is_not_found() {
        let root = std::env::temp_dir().join(format!("eden-mesh-none-{}", std::process::id()));
        let err = load_mesh_vertices(&[root], "absent.txt").unwrap_err();
        assert!(matches!(err, RendererError::AssetNotFound { ref searched, .. } if searched.len() == 4));
    }

    #[test]
    fn loads_from_models_directory() {
        let root = std::env::temp_dir().join(format!("eden-mesh-models-{}", std::process::id()));
        std::fs::create_dir_all(root.join("models")).unwrap();
        std::fs::write(root.join("models/tri.txt"), TRIANGLE).unwrap();
        std::fs::write(root.join("models/empty.txt"), "Vertices: 0;\n").unwrap();

        let vertices = load_mesh_vertices(&[root.clone()], "tri.txt").unwrap();
        assert_eq!(vertices.len(), 3);
        assert!(matches!(
            load_mesh_vertices(&[root.clone()], "empty.txt"),
            Err(RendererError::EmptyMesh(_))
        ));

        std::fs::remove_dir_all(root).unwrap();
    }
}
