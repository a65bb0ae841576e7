//! Scoped GPU resources.
//!
//! Each guard owns exactly one handle and releases it through the command
//! surface when dropped. Building a renderer out of guards means every exit
//! path (including a failure halfway through initialization) releases what was
//! acquired so far.

use super::api::{
    BufferHandle, BufferInit, BufferKind, ProgramHandle, SharedApi, VertexArrayHandle,
};
use super::error::RenderResult;
use super::shader::{CompiledShader, ShaderSource};

/// Runs `f` against the command surface unless it is already borrowed.
///
/// Only drop paths use this: a nested borrow there means a guard was dropped
/// from inside an API call, which would otherwise panic during unwinding.
fn release_with(api: &SharedApi, what: &str, f: impl FnOnce(&mut dyn super::api::GraphicsApi)) {
    match api.try_borrow_mut() {
        Ok(mut api) => f(&mut *api),
        Err(_) => log::error!("graphics api busy while releasing {what}; handle leaked"),
    }
}

/// Owned GPU buffer.
pub struct GpuBuffer {
    api: SharedApi,
    handle: BufferHandle,
    kind: BufferKind,
    size: u64,
}

impl GpuBuffer {
    pub fn new(api: &SharedApi, kind: BufferKind, init: BufferInit<'_>) -> RenderResult<Self> {
        let handle = api.borrow_mut().create_buffer(kind, init)?;
        Ok(Self {
            api: api.clone(),
            handle,
            kind,
            size: init.size(),
        })
    }

    #[inline]
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Overwrites buffer contents starting at byte `offset`.
    pub fn write(&self, offset: u64, data: &[u8]) {
        debug_assert!(offset + data.len() as u64 <= self.size, "buffer write out of bounds");
        self.api.borrow_mut().update_buffer(self.handle, offset, data);
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        let handle = self.handle;
        release_with(&self.api, "buffer", |api| api.delete_buffer(handle));
    }
}

/// Owned vertex array.
///
/// Holds only the layout object; the buffers it references are owned separately
/// and must outlive it (drop order in the owning struct takes care of that).
pub struct GpuVertexArray {
    api: SharedApi,
    handle: VertexArrayHandle,
}

impl GpuVertexArray {
    pub fn new(
        api: &SharedApi,
        layout: &wgpu::VertexBufferLayout<'static>,
        vertex_buffer: &GpuBuffer,
        index_buffer: &GpuBuffer,
        index_format: wgpu::IndexFormat,
    ) -> RenderResult<Self> {
        let handle = api.borrow_mut().create_vertex_array(
            layout,
            vertex_buffer.handle(),
            index_buffer.handle(),
            index_format,
        )?;
        Ok(Self { api: api.clone(), handle })
    }

    #[inline]
    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }
}

impl Drop for GpuVertexArray {
    fn drop(&mut self) {
        let handle = self.handle;
        release_with(&self.api, "vertex array", |api| api.delete_vertex_array(handle));
    }
}

/// Owned shader program with its uniform map.
pub struct GpuProgram {
    api: SharedApi,
    shader: CompiledShader,
}

impl GpuProgram {
    pub fn new(api: &SharedApi, source: &ShaderSource) -> RenderResult<Self> {
        let shader = api.borrow_mut().create_shader(source)?;
        Ok(Self { api: api.clone(), shader })
    }

    #[inline]
    pub fn handle(&self) -> ProgramHandle {
        self.shader.program
    }

    #[inline]
    pub fn shader(&self) -> &CompiledShader {
        &self.shader
    }
}

impl Drop for GpuProgram {
    fn drop(&mut self) {
        let handle = self.shader.program;
        release_with(&self.api, "shader program", |api| api.delete_shader(handle));
    }
}
