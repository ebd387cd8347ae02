//! Frame-scoped line batch.

use glam::Vec3;

use crate::error::{RendererError, Result};
use crate::vertex::Vertex;

/// Line segments accumulated during one frame, bounded by the byte
/// capacity of the GPU buffer they are uploaded to.
#[derive(Debug)]
pub struct LineBatch {
    vertices: Vec<Vertex>,
    capacity_bytes: usize,
}

impl LineBatch {
    /// Empty batch for a buffer of `capacity_bytes`.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            vertices: Vec::new(),
            capacity_bytes,
        }
    }

    /// Append one segment. Fails without modifying the batch when the
    /// buffer cannot hold it.
    pub fn push(&mut self, start: Vec3, end: Vec3, color: Vec3) -> Result<()> {
        let requested = self.byte_len() + 2 * Vertex::STRIDE as usize;
        if requested > self.capacity_bytes {
            return Err(RendererError::LineBufferFull {
                requested,
                capacity: self.capacity_bytes,
            });
        }
        self.vertices.push(Vertex::line(start, color));
        self.vertices.push(Vertex::line(end, color));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Number of vertices (two per segment).
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Bytes the batch occupies once uploaded.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.vertices.len() * Vertex::STRIDE as usize
    }

    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_adds_two_vertices() {
        let mut batch = LineBatch::new(1024);
        assert!(batch.is_empty());
        for _ in 0..3 {
            batch.push(Vec3::ZERO, Vec3::ONE, Vec3::X).unwrap();
        }
        assert_eq!(batch.len(), 6);
        assert_eq!(batch.byte_len(), 6 * 32);
        assert_eq!(batch.vertices()[1].position, [1.0, 1.0, 1.0]);

        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn overflow_is_rejected_and_batch_kept() {
        // Room for exactly two segments
        let mut batch = LineBatch::new(4 * 32);
        batch.push(Vec3::ZERO, Vec3::X, Vec3::ONE).unwrap();
        batch.push(Vec3::ZERO, Vec3::Y, Vec3::ONE).unwrap();

        let err = batch.push(Vec3::ZERO, Vec3::Z, Vec3::ONE).unwrap_err();
        match err {
            RendererError::LineBufferFull {
                requested,
                capacity,
            } => {
                assert_eq!(requested, 6 * 32);
                assert_eq!(capacity, 4 * 32);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(batch.len(), 4);
    }
}
