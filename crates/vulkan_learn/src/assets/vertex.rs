//! Vertex formats used by the lessons
//!
//! Each format is `#[repr(C)]` and `Pod`, so a slice of vertices can be
//! copied into a buffer as bytes, and each can describe its own Vulkan
//! vertex input layout.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use std::mem::{offset_of, size_of};

/// Describes how a vertex type is laid out for the vertex input stage
pub trait VertexLayout: Pod {
    /// Binding description with this type's stride
    fn binding_description(binding: u32) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Attribute descriptions, locations numbered from zero
    fn attribute_descriptions(binding: u32) -> Vec<vk::VertexInputAttributeDescription>;
}

fn attribute(binding: u32, location: u32, format: vk::Format, offset: usize) -> vk::VertexInputAttributeDescription {
    vk::VertexInputAttributeDescription {
        binding,
        location,
        format,
        offset: offset as u32,
    }
}

/// Position only
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPos {
    /// Position
    pub pos: [f32; 3],
}

/// Position and RGB color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPosCol {
    /// Position
    pub pos: [f32; 3],
    /// RGB color
    pub col: [f32; 3],
}

/// Position and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPosTex {
    /// Position
    pub pos: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl VertexLayout for VertexPos {
    fn attribute_descriptions(binding: u32) -> Vec<vk::VertexInputAttributeDescription> {
        vec![attribute(binding, 0, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, pos))]
    }
}

impl VertexLayout for VertexPosCol {
    fn attribute_descriptions(binding: u32) -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            attribute(binding, 0, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, pos)),
            attribute(binding, 1, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, col)),
        ]
    }
}

impl VertexLayout for VertexPosTex {
    fn attribute_descriptions(binding: u32) -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            attribute(binding, 0, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, pos)),
            attribute(binding, 1, vk::Format::R32G32_SFLOAT, offset_of!(Self, uv)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_layout() {
        let binding = VertexPos::binding_description(0);
        assert_eq!(binding.stride, 12);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
        assert_eq!(VertexPos::attribute_descriptions(0).len(), 1);
    }

    #[test]
    fn test_pos_col_layout() {
        assert_eq!(VertexPosCol::binding_description(0).stride, 24);

        let attrs = VertexPosCol::attribute_descriptions(0);
        assert_eq!(attrs[1].location, 1);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
    }

    #[test]
    fn test_pos_tex_layout() {
        let binding = VertexPosTex::binding_description(2);
        assert_eq!(binding.binding, 2);
        assert_eq!(binding.stride, 20);

        let attrs = VertexPosTex::attribute_descriptions(2);
        assert_eq!(attrs.len(), 2);
        assert!(attrs.iter().all(|a| a.binding == 2));
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn test_vertices_cast_to_bytes() {
        let vertices = [VertexPosTex { pos: [1.0, 2.0, 3.0], uv: [0.5, 0.25] }];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[12..16], &0.5f32.to_ne_bytes());
    }
}
