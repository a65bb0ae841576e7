//! CPU → GPU uniform marshaling.
//!
//! GPU matrices are column-major. A row-major `Affine2DMatrix` is therefore
//! transposed while being narrowed to `f32`.

use bytemuck::{Pod, Zeroable};

use crate::coords::{Affine2DMatrix, Vec2};

/// Size in bytes of the camera uniform block.
pub const CAMERA_BLOCK_SIZE: u64 = std::mem::size_of::<CameraUniform>() as u64;

/// Camera block as laid out in GPU memory: three `vec4` columns plus one unused
/// `vec4`, 64 bytes in total.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub data: [f32; 16],
}

/// Packs `m` as a column-major `mat3`:
/// `[m00, m10, m20, m01, m11, m21, m02, m12, m22]`.
pub fn to_matrix_layout(m: &Affine2DMatrix) -> [f32; 9] {
    let mut out = [0.0f32; 9];
    for col in 0..3 {
        for row in 0..3 {
            out[col * 3 + row] = m[row][col] as f32;
        }
    }
    out
}

/// Packs `view_projection` into the camera block.
///
/// Each column becomes a `vec4` whose fourth lane is zero padding; the last
/// `vec4` is entirely padding.
pub fn camera_block(view_projection: &Affine2DMatrix) -> CameraUniform {
    let mut data = [0.0f32; 16];
    data[..12].copy_from_slice(&pad_mat3(&to_matrix_layout(view_projection)));
    CameraUniform { data }
}

/// Column-major 3x3 remapping unit-quad UVs into the `uv_bl`..`uv_tr` sub-rect.
///
/// `scale = uv_tr - uv_bl`, `offset = uv_bl`.
pub fn texture_transform(uv_bl: Vec2, uv_tr: Vec2) -> [f32; 9] {
    let scale = uv_tr - uv_bl;
    [
        scale.x as f32, 0.0, 0.0,
        0.0, scale.y as f32, 0.0,
        uv_bl.x as f32, uv_bl.y as f32, 1.0,
    ]
}

/// Expands a column-major `mat3` to the padded 48-byte layout GPU uniform
/// buffers use (each column aligned to 16 bytes).
pub fn pad_mat3(cols: &[f32; 9]) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    for (col, chunk) in cols.chunks_exact(3).enumerate() {
        out[col * 4..col * 4 + 3].copy_from_slice(chunk);
    }
    out
}
