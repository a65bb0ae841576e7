use crate::coords::IVec2;

/// One acquired surface texture.
///
/// Short-lived: holding it blocks acquisition of the next frame. Hand it back
/// to [`Gpu::present`](super::Gpu::present) once its commands are recorded.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    /// Drawable size in physical pixels.
    pub size: IVec2,
}
