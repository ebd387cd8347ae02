//! Frame-scoped batch of colored cubes.
//!
//! Cubes are transformed to world space on the CPU and share one vertex
//! buffer per frame. A flush draws what was queued since the previous
//! flush, so cubes queued under different textures keep their texture.

use std::ops::Range;

use eden_core::Pose;
use glam::Vec3;

use crate::error::{RendererError, Result};
use crate::geometry::{colored_cube_vertices, CUBE_VERTEX_COUNT};
use crate::vertex::Vertex;

#[derive(Debug)]
pub struct ColoredCubeBatch {
    vertices: Vec<Vertex>,
    flushed: usize,
    capacity_bytes: usize,
}

impl ColoredCubeBatch {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            vertices: Vec::new(),
            flushed: 0,
            capacity_bytes,
        }
    }

    /// Queue one cube. Fails without modifying the batch when the buffer
    /// cannot hold it.
    pub fn push(&mut self, pose: &Pose, scale: Vec3, color: Vec3) -> Result<()> {
        let requested = self.byte_len() + CUBE_VERTEX_COUNT * Vertex::STRIDE as usize;
        if requested > self.capacity_bytes {
            return Err(RendererError::CubeBatchFull {
                requested,
                capacity: self.capacity_bytes,
            });
        }
        self.vertices
            .extend(colored_cube_vertices(pose, scale, color));
        Ok(())
    }

    /// Vertex range queued since the last flush.
    pub fn pending(&self) -> Range<u32> {
        self.flushed as u32..self.vertices.len() as u32
    }

    /// Vertices queued since the last flush.
    pub fn pending_vertices(&self) -> &[Vertex] {
        &self.vertices[self.flushed..]
    }

    pub fn mark_flushed(&mut self) {
        self.flushed = self.vertices.len();
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.flushed = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.vertices.len() * Vertex::STRIDE as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_BYTES: usize = CUBE_VERTEX_COUNT * 32;

    #[test]
    fn flush_advances_pending_range() {
        let mut batch = ColoredCubeBatch::new(16 * CUBE_BYTES);
        batch.push(&Pose::default(), Vec3::ONE, Vec3::X).unwrap();
        batch.push(&Pose::default(), Vec3::ONE, Vec3::Y).unwrap();
        assert_eq!(batch.pending(), 0..72);

        batch.mark_flushed();
        assert!(batch.pending().is_empty());
        assert!(batch.pending_vertices().is_empty());

        batch.push(&Pose::at(Vec3::Z), Vec3::ONE, Vec3::Z).unwrap();
        assert_eq!(batch.pending(), 72..108);
        assert_eq!(batch.pending_vertices()[0].color, [0.0, 0.0, 1.0]);
        assert_eq!(batch.len(), 108);

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.pending(), 0..0);
    }

    #[test]
    fn full_batch_rejects_cube_and_keeps_contents() {
        let mut batch = ColoredCubeBatch::new(CUBE_BYTES + 10);
        batch.push(&Pose::default(), Vec3::ONE, Vec3::ONE).unwrap();

        let err = batch.push(&Pose::default(), Vec3::ONE, Vec3::ONE).unwrap_err();
        assert!(matches!(
            err,
            RendererError::CubeBatchFull { requested, capacity }
                if requested == 2 * CUBE_BYTES && capacity == CUBE_BYTES + 10
        ));
        assert_eq!(batch.len(), CUBE_VERTEX_COUNT);
    }
}
