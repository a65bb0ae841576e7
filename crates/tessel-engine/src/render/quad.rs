//! Static unit-quad mesh shared by every draw.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2], // -0.5..0.5
    pub uv: [f32; 2],  // 0..1, bottom-left origin
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Unit square centered on the origin.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [-0.5, -0.5], uv: [0.0, 0.0] }, // bottom-left
    QuadVertex { pos: [0.5, -0.5], uv: [1.0, 0.0] },  // bottom-right
    QuadVertex { pos: [0.5, 0.5], uv: [1.0, 1.0] },   // top-right
    QuadVertex { pos: [-0.5, 0.5], uv: [0.0, 1.0] },  // top-left
];

/// Two counter-clockwise triangles sharing the bottom-left/top-right diagonal.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

pub const QUAD_INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

pub const QUAD_INDEX_COUNT: u32 = QUAD_INDICES.len() as u32;

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }

    #[test]
    fn vertex_is_four_floats() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
        let layout = QuadVertex::layout();
        assert_eq!(layout.array_stride, 16);
        assert_eq!(layout.attributes[1].offset, 8);
    }

    #[test]
    fn corners_are_half_unit_and_uvs_span_texture() {
        for v in QUAD_VERTICES {
            assert_eq!(v.pos[0].abs(), 0.5);
            assert_eq!(v.pos[1].abs(), 0.5);
            assert_eq!(v.uv[0], v.pos[0] + 0.5);
            assert_eq!(v.uv[1], v.pos[1] + 0.5);
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise() {
        for tri in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| QUAD_VERTICES[i as usize].pos);
            assert!(signed_area(a, b, c) > 0.0);
        }
    }
}
