//! Simple geometry for the lessons
//!
//! All shapes are centered on the origin. Triangles sit at `z = 1`, planes
//! at `z = 0`. Planes come with six indices forming two triangles that share
//! the `0..2` diagonal.

use super::vertex::{VertexPos, VertexPosCol, VertexPosTex};

/// Index element type, bound as 32-bit indices
pub type Index = u32;

/// Indexed geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<V> {
    /// Vertex data
    pub vertices: Vec<V>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<Index>,
}

impl<V> Mesh<V> {
    /// Number of indices, as passed to an indexed draw
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Index order shared by both planes
pub const PLANE_INDICES: [Index; 6] = [0, 1, 2, 2, 3, 0];

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const MAGENTA: [f32; 3] = [1.0, 0.0, 1.0];

fn triangle_positions(scale: f32) -> [[f32; 3]; 3] {
    [[scale, scale, 1.0], [-scale, scale, 1.0], [0.0, -scale, 1.0]]
}

fn plane_positions(scale: f32) -> [[f32; 3]; 4] {
    [
        [scale, scale, 0.0],
        [-scale, scale, 0.0],
        [-scale, -scale, 0.0],
        [scale, -scale, 0.0],
    ]
}

/// Three positions of a triangle
pub fn make_triangle(scale: f32) -> Vec<VertexPos> {
    triangle_positions(scale)
        .into_iter()
        .map(|pos| VertexPos { pos })
        .collect()
}

/// Triangle with red, green and blue corners
pub fn make_color_triangle(scale: f32) -> Vec<VertexPosCol> {
    triangle_positions(scale)
        .into_iter()
        .zip([RED, GREEN, BLUE])
        .map(|(pos, col)| VertexPosCol { pos, col })
        .collect()
}

/// Quad with red, green, blue and magenta corners
pub fn make_color_plane(scale: f32) -> Mesh<VertexPosCol> {
    let vertices = plane_positions(scale)
        .into_iter()
        .zip([RED, GREEN, BLUE, MAGENTA])
        .map(|(pos, col)| VertexPosCol { pos, col })
        .collect();

    Mesh {
        vertices,
        indices: PLANE_INDICES.to_vec(),
    }
}

/// Quad with texture coordinates spanning the full `[0, 1]` range
pub fn make_plane(scale: f32) -> Mesh<VertexPosTex> {
    let vertices = plane_positions(scale)
        .into_iter()
        .zip([[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]])
        .map(|(pos, uv)| VertexPosTex { pos, uv })
        .collect();

    Mesh {
        vertices,
        indices: PLANE_INDICES.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_is_scaled() {
        let tri = make_triangle(0.5);
        assert_eq!(tri.len(), 3);
        assert_eq!(tri[0].pos, [0.5, 0.5, 1.0]);
        assert_eq!(tri[1].pos, [-0.5, 0.5, 1.0]);
        assert_eq!(tri[2].pos, [0.0, -0.5, 1.0]);
    }

    #[test]
    fn test_color_triangle_corners() {
        let tri = make_color_triangle(1.0);
        let colors: Vec<_> = tri.iter().map(|v| v.col).collect();
        assert_eq!(colors, vec![RED, GREEN, BLUE]);
        assert_eq!(tri[2].pos, [0.0, -1.0, 1.0]);
    }

    #[test]
    fn test_color_plane() {
        let plane = make_color_plane(0.5);
        assert_eq!(plane.vertices.len(), 4);
        assert_eq!(plane.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(plane.index_count(), 6);
        assert_eq!(plane.vertices[3].col, MAGENTA);
        assert_eq!(plane.vertices[2].pos, [-0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_plane_uvs_cover_unit_square() {
        let plane = make_plane(1.0);
        let uvs: Vec<_> = plane.vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, vec![[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(plane.indices, PLANE_INDICES.to_vec());
    }

    #[test]
    fn test_indices_stay_in_range() {
        let plane = make_plane(2.0);
        assert!(plane
            .indices
            .iter()
            .all(|&i| (i as usize) < plane.vertices.len()));
    }

    #[test]
    fn test_plane_index_bytes_are_32_bit() {
        let plane = make_color_plane(1.0);
        let bytes: &[u8] = bytemuck::cast_slice(&plane.indices);
        assert_eq!(bytes.len(), 6 * 4);
        assert_eq!(&bytes[8..12], &2u32.to_ne_bytes());
    }
}
