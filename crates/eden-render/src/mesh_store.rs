//! Append-only store of uploaded meshes.

use std::path::PathBuf;

use crate::error::{RendererError, Result};
use crate::mesh::load_mesh_vertices;
use crate::vertex::Vertex;

/// Identifier handed out by [`MeshStore::insert`]. Equals load order.
pub type MeshId = u32;

/// An uploaded vertex buffer and how many vertices to draw from it.
#[derive(Debug)]
pub struct Mesh<B> {
    pub buffer: B,
    pub vertex_count: u32,
}

/// Meshes live until the store is drained at shutdown. Ids are never
/// reused, and a failed insert does not consume one.
#[derive(Debug)]
pub struct MeshStore<B> {
    meshes: Vec<Mesh<B>>,
}

impl<B> MeshStore<B> {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    /// Upload `vertices` through `upload` and append the result.
    pub fn insert<F>(&mut self, name: &str, vertices: &[Vertex], upload: F) -> Result<MeshId>
    where
        F: FnOnce(&[Vertex]) -> Result<B>,
    {
        if vertices.is_empty() {
            return Err(RendererError::EmptyMesh(name.to_string()));
        }
        let vertex_count = u32::try_from(vertices.len())
            .map_err(|_| RendererError::EmptyMesh(name.to_string()))?;
        let buffer = upload(vertices)?;

        let id = self.meshes.len() as MeshId;
        self.meshes.push(Mesh {
            buffer,
            vertex_count,
        });
        Ok(id)
    }

    /// Find and parse mesh file `name` under `roots`, then insert it. A file
    /// that is missing or yields no vertices leaves the store untouched.
    pub fn load<F>(&mut self, roots: &[PathBuf], name: &str, upload: F) -> Result<MeshId>
    where
        F: FnOnce(&[Vertex]) -> Result<B>,
    {
        let vertices = load_mesh_vertices(roots, name)?;
        self.insert(name, &vertices, upload)
    }

    /// Look up a mesh; negative and unknown ids yield `None`.
    pub fn get(&self, id: i64) -> Option<&Mesh<B>> {
        usize::try_from(id).ok().and_then(|i| self.meshes.get(i))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Remove every mesh for destruction.
    pub fn drain(&mut self) -> impl Iterator<Item = Mesh<B>> + '_ {
        self.meshes.drain(..)
    }
}

impl<B> Default for MeshStore<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eden_gpu::GpuError;

    fn tri() -> Vec<Vertex> {
        vec![Vertex::default(); 3]
    }

    #[test]
    fn ids_follow_load_order() {
        let mut store = MeshStore::new();
        for expected in 0..4 {
            let id = store.insert("m", &tri(), |v| Ok(v.len())).unwrap();
            assert_eq!(id, expected);
        }
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(2).map(|m| m.vertex_count), Some(3));
    }

    #[test]
    fn failed_loads_do_not_consume_ids() {
        let mut store: MeshStore<usize> = MeshStore::new();
        assert_eq!(store.insert("a", &tri(), |_| Ok(10)).unwrap(), 0);

        assert!(matches!(
            store.insert("empty", &[], |_| Ok(11)),
            Err(RendererError::EmptyMesh(_))
        ));
        assert!(store
            .insert("gpu", &tri(), |_| Err(GpuError::InvalidState("oom".into()).into()))
            .is_err());

        assert_eq!(store.len(), 1);
        assert_eq!(store.insert("b", &tri(), |_| Ok(12)).unwrap(), 1);
    }

    #[test]
    fn missing_file_is_not_inserted() {
        let root = std::env::temp_dir().join(format!("eden-store-{}", std::process::id()));
        std::fs::create_dir_all(root.join("models")).unwrap();
        std::fs::write(root.join("models/tri.txt"), "Vertices: 3;\n0 0 0;\n1 0 0;\n0 1 0;\nTriangles: 1;\n0 1 2;\n").unwrap();
        let roots = [root.clone()];

        let mut store: MeshStore<usize> = MeshStore::new();
        let mut uploads = 0;
        let err = store
            .load(&roots, "missing.txt", |_| {
                uploads += 1;
                Ok(0)
            })
            .unwrap_err();
        assert!(matches!(err, RendererError::AssetNotFound { .. }));
        assert_eq!(uploads, 0);
        assert_eq!(store.len(), 0);

        assert_eq!(store.load(&roots, "tri.txt", |v| Ok(v.len())).unwrap(), 0);
        assert!(store.load(&roots, "missing.txt", |_| Ok(0)).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).map(|m| m.buffer), Some(3));

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn invalid_ids_are_absent() {
        let mut store = MeshStore::new();
        store.insert("a", &tri(), |_| Ok(())).unwrap();
        assert!(store.get(-1).is_none());
        assert!(store.get(1).is_none());
        assert!(store.get(0).is_some());
    }

    #[test]
    fn drain_empties_store() {
        let mut store = MeshStore::new();
        store.insert("a", &tri(), |_| Ok(7u8)).unwrap();
        let buffers: Vec<u8> = store.drain().map(|m| m.buffer).collect();
        assert_eq!(buffers, vec![7]);
        assert!(store.is_empty());
    }
}
