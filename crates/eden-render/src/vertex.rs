//! Vertex layout shared by the solid and line pipelines.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Interleaved vertex: position, texture coordinate, color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Create a vertex.
    #[inline]
    pub const fn new(position: [f32; 3], uv: [f32; 2], color: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            color,
        }
    }

    /// Untextured vertex used for debug lines.
    #[inline]
    pub fn line(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            uv: [0.0, 0.0],
            color: color.to_array(),
        }
    }

    /// Single interleaved binding at slot 0.
    pub fn binding_descriptions() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: Self::STRIDE,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    /// Locations 0..=2: position, uv, color.
    pub fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Self, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: std::mem::offset_of!(Self, uv) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Self, color) as u32,
            },
        ]
    }
}

/// Per-draw push constant block. Must match `PushConstants` in `cube.vert`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PushConstants {
    pub model: Mat4,
}

impl PushConstants {
    pub const SIZE: u32 = std::mem::size_of::<Self>() as u32;

    /// Vertex-stage range covering exactly this block.
    pub fn range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: Self::SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_shader() {
        assert_eq!(Vertex::STRIDE, 32);
        let attrs = Vertex::attribute_descriptions();
        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
        assert_eq!(attrs[1].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn push_constants_are_one_matrix() {
        assert_eq!(PushConstants::SIZE, 64);
        assert_eq!(PushConstants::range().stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    fn line_vertex_has_zero_uv() {
        let v = Vertex::line(Vec3::new(1.0, 2.0, 3.0), Vec3::X);
        assert_eq!(v.uv, [0.0, 0.0]);
        assert_eq!(v.color, [1.0, 0.0, 0.0]);
    }
}
