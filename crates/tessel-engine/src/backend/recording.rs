//! Headless command surface that records every call.
//!
//! Used by tests and tools that need to observe exactly what a renderer asks of
//! the GPU: which objects are alive, which uniforms were uploaded, which draws
//! were issued with which bindings.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::coords::IVec2;
use crate::paint::Rgba;
use crate::render::{
    BufferHandle, BufferInit, BufferKind, CompiledShader, GraphicsApi, ProgramHandle,
    RenderError, RenderResult, ResourceKind, ShaderSource, ShaderStage, TextureHandle,
    TextureSampling, UniformLocation, UniformValue, VertexArrayHandle,
};
use crate::render::shader::names;

/// One recorded command-surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer { buffer: BufferHandle, kind: BufferKind, size: u64, contents: Option<Vec<u8>> },
    UpdateBuffer { buffer: BufferHandle, offset: u64, data: Vec<u8> },
    DeleteBuffer(BufferHandle),
    CreateVertexArray {
        vertex_array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        stride: u64,
        attribute_count: usize,
    },
    DeleteVertexArray(VertexArrayHandle),
    CreateShader { program: ProgramHandle, label: String },
    DeleteShader(ProgramHandle),
    BindUniformBlock { program: ProgramHandle, block: String, binding: u32, buffer: BufferHandle },
    UseProgram(ProgramHandle),
    SetUniform { location: UniformLocation, value: UniformValue },
    CreateTexture { texture: TextureHandle, size: IVec2, sampling: TextureSampling },
    DeleteTexture(TextureHandle),
    SetTextureSampling { texture: TextureHandle, sampling: TextureSampling },
    BindTexture { unit: u32, texture: TextureHandle },
    BindVertexArray(VertexArrayHandle),
    /// Draw plus the bindings it was issued with.
    DrawIndexed {
        index_count: u32,
        program: ProgramHandle,
        vertex_array: VertexArrayHandle,
        texture_unit0: TextureHandle,
    },
    SetClearColor(Rgba),
    Clear,
    SetViewport { size: IVec2, anchor_bottom_left: IVec2 },
}

impl GpuCall {
    /// True for calls that release a GPU object.
    pub fn is_release(&self) -> bool {
        matches!(
            self,
            GpuCall::DeleteBuffer(_)
                | GpuCall::DeleteVertexArray(_)
                | GpuCall::DeleteShader(_)
                | GpuCall::DeleteTexture(_)
        )
    }
}

/// Recording [`GraphicsApi`] with live-object tracking and failure injection.
pub struct RecordingApi {
    next_handle: u32,
    calls: Vec<GpuCall>,

    live_buffers: BTreeSet<BufferHandle>,
    live_vertex_arrays: BTreeSet<VertexArrayHandle>,
    live_programs: BTreeSet<ProgramHandle>,
    live_textures: BTreeSet<TextureHandle>,

    /// Uniform names reported by every compiled program, in location order.
    declared_uniforms: Vec<String>,
    fail_next: HashSet<ResourceKind>,

    bound_program: ProgramHandle,
    bound_vertex_array: VertexArrayHandle,
    bound_textures: HashMap<u32, TextureHandle>,
}

impl Default for RecordingApi {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingApi {
    /// Programs declare every uniform the quad shader knows about.
    pub fn new() -> Self {
        Self::with_uniforms(&[
            names::MODEL,
            names::TEXTURE_TRANSFORM,
            names::DEPTH,
            names::TINT_COLOR,
            names::TEXTURE,
        ])
    }

    /// Programs declare exactly `uniforms`.
    pub fn with_uniforms(uniforms: &[&str]) -> Self {
        Self {
            next_handle: 1,
            calls: Vec::new(),
            live_buffers: BTreeSet::new(),
            live_vertex_arrays: BTreeSet::new(),
            live_programs: BTreeSet::new(),
            live_textures: BTreeSet::new(),
            declared_uniforms: uniforms.iter().map(|s| s.to_string()).collect(),
            fail_next: HashSet::new(),
            bound_program: ProgramHandle::NONE,
            bound_vertex_array: VertexArrayHandle::NONE,
            bound_textures: HashMap::new(),
        }
    }

    /// Makes the next creation of `kind` fail.
    pub fn fail_next_create(&mut self, kind: ResourceKind) {
        self.fail_next.insert(kind);
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Returns and forgets the recorded calls; live-object tracking is kept.
    pub fn take_calls(&mut self) -> Vec<GpuCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of GPU objects created and not yet released.
    pub fn live_count(&self) -> usize {
        self.live_buffers.len()
            + self.live_vertex_arrays.len()
            + self.live_programs.len()
            + self.live_textures.len()
    }

    pub fn is_buffer_live(&self, buffer: BufferHandle) -> bool {
        self.live_buffers.contains(&buffer)
    }

    pub fn is_texture_live(&self, texture: TextureHandle) -> bool {
        self.live_textures.contains(&texture)
    }

    /// Name a compiled program reports for `location`.
    pub fn uniform_name(&self, location: UniformLocation) -> Option<&str> {
        usize::try_from(location.0)
            .ok()
            .and_then(|i| self.declared_uniforms.get(i))
            .map(String::as_str)
    }

    /// Values uploaded to uniform `name`, oldest first.
    pub fn uniform_uploads(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::SetUniform { location, value } if self.uniform_name(*location) == Some(name) => {
                    Some(*value)
                }
                _ => None,
            })
            .collect()
    }

    /// Number of draws recorded.
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GpuCall::DrawIndexed { .. }))
            .count()
    }

    fn allocate(&mut self, kind: ResourceKind) -> RenderResult<u32> {
        if self.fail_next.remove(&kind) {
            return Err(RenderError::ResourceCreation {
                kind,
                reason: "injected failure".to_string(),
            });
        }
        let id = self.next_handle;
        self.next_handle += 1;
        Ok(id)
    }
}

impl GraphicsApi for RecordingApi {
    fn create_buffer(&mut self, kind: BufferKind, init: BufferInit<'_>) -> RenderResult<BufferHandle> {
        let buffer = BufferHandle(self.allocate(kind.resource_kind())?);
        self.live_buffers.insert(buffer);
        let contents = match init {
            BufferInit::Static(bytes) => Some(bytes.to_vec()),
            BufferInit::Dynamic { .. } => None,
        };
        self.calls.push(GpuCall::CreateBuffer { buffer, kind, size: init.size(), contents });
        Ok(buffer)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if !self.live_buffers.contains(&buffer) {
            log::warn!("update of unknown buffer {buffer:?}");
        }
        self.calls.push(GpuCall::UpdateBuffer { buffer, offset, data: data.to_vec() });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if buffer.is_none() {
            return;
        }
        if !self.live_buffers.remove(&buffer) {
            log::warn!("delete of unknown buffer {buffer:?}");
        }
        self.calls.push(GpuCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(
        &mut self,
        layout: &wgpu::VertexBufferLayout<'static>,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        _index_format: wgpu::IndexFormat,
    ) -> RenderResult<VertexArrayHandle> {
        let vertex_array = VertexArrayHandle(self.allocate(ResourceKind::VertexArray)?);
        self.live_vertex_arrays.insert(vertex_array);
        self.calls.push(GpuCall::CreateVertexArray {
            vertex_array,
            vertex_buffer,
            index_buffer,
            stride: layout.array_stride,
            attribute_count: layout.attributes.len(),
        });
        Ok(vertex_array)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if vertex_array.is_none() {
            return;
        }
        if !self.live_vertex_arrays.remove(&vertex_array) {
            log::warn!("delete of unknown vertex array {vertex_array:?}");
        }
        self.calls.push(GpuCall::DeleteVertexArray(vertex_array));
    }

    fn create_shader(&mut self, source: &ShaderSource) -> RenderResult<CompiledShader> {
        if self.fail_next.remove(&ResourceKind::Program) {
            return Err(RenderError::ShaderCompilation {
                stage: ShaderStage::Vertex,
                message: "injected failure".to_string(),
            });
        }
        let program = ProgramHandle(self.allocate(ResourceKind::Program)?);
        self.live_programs.insert(program);
        self.calls.push(GpuCall::CreateShader { program, label: source.label.to_string() });

        let uniform_locations = self
            .declared_uniforms
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), UniformLocation(i as i32)))
            .collect();
        Ok(CompiledShader::new(program, uniform_locations))
    }

    fn delete_shader(&mut self, program: ProgramHandle) {
        if program.is_none() {
            return;
        }
        if !self.live_programs.remove(&program) {
            log::warn!("delete of unknown program {program:?}");
        }
        if self.bound_program == program {
            self.bound_program = ProgramHandle::NONE;
        }
        self.calls.push(GpuCall::DeleteShader(program));
    }

    fn bind_uniform_block(&mut self, program: ProgramHandle, block_name: &str, binding: u32, buffer: BufferHandle) {
        self.calls.push(GpuCall::BindUniformBlock {
            program,
            block: block_name.to_string(),
            binding,
            buffer,
        });
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.bound_program = program;
        self.calls.push(GpuCall::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.calls.push(GpuCall::SetUniform { location, value });
    }

    fn create_texture(
        &mut self,
        size: IVec2,
        pixels: Option<&[u8]>,
        sampling: TextureSampling,
    ) -> RenderResult<TextureHandle> {
        if let Some(px) = pixels {
            let expected = size.x.max(0) as usize * size.y.max(0) as usize * 4;
            if px.len() != expected {
                return Err(RenderError::ResourceCreation {
                    kind: ResourceKind::Texture,
                    reason: format!("expected {expected} bytes of RGBA8, got {}", px.len()),
                });
            }
        }
        let texture = TextureHandle(self.allocate(ResourceKind::Texture)?);
        self.live_textures.insert(texture);
        self.calls.push(GpuCall::CreateTexture { texture, size, sampling });
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if texture.is_none() {
            return;
        }
        if !self.live_textures.remove(&texture) {
            log::warn!("delete of unknown texture {texture:?}");
        }
        self.bound_textures.retain(|_, t| *t != texture);
        self.calls.push(GpuCall::DeleteTexture(texture));
    }

    fn set_texture_sampling(&mut self, texture: TextureHandle, sampling: TextureSampling) {
        self.calls.push(GpuCall::SetTextureSampling { texture, sampling });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.bound_textures.insert(unit, texture);
        self.calls.push(GpuCall::BindTexture { unit, texture });
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.bound_vertex_array = vertex_array;
        self.calls.push(GpuCall::BindVertexArray(vertex_array));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.calls.push(GpuCall::DrawIndexed {
            index_count,
            program: self.bound_program,
            vertex_array: self.bound_vertex_array,
            texture_unit0: self.bound_textures.get(&0).copied().unwrap_or_default(),
        });
    }

    fn set_clear_color(&mut self, color: Rgba) {
        self.calls.push(GpuCall::SetClearColor(color));
    }

    fn clear(&mut self) {
        self.calls.push(GpuCall::Clear);
    }

    fn set_viewport(&mut self, size: IVec2, anchor_bottom_left: IVec2) {
        self.calls.push(GpuCall::SetViewport { size, anchor_bottom_left });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_never_none() {
        let mut api = RecordingApi::new();
        let a = api.create_buffer(BufferKind::Vertex, BufferInit::Dynamic { size: 16 }).unwrap();
        let b = api.create_buffer(BufferKind::Index, BufferInit::Dynamic { size: 16 }).unwrap();
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
        assert_eq!(api.live_count(), 2);
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut api = RecordingApi::new();
        api.fail_next_create(ResourceKind::UniformBuffer);
        assert!(api.create_buffer(BufferKind::Uniform, BufferInit::Dynamic { size: 64 }).is_err());
        assert!(api.create_buffer(BufferKind::Uniform, BufferInit::Dynamic { size: 64 }).is_ok());
    }

    #[test]
    fn deleting_none_is_silent() {
        let mut api = RecordingApi::new();
        api.delete_buffer(BufferHandle::NONE);
        api.delete_texture(TextureHandle::NONE);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn texture_size_mismatch_is_rejected() {
        let mut api = RecordingApi::new();
        let err = api
            .create_texture(IVec2::new(2, 2), Some(&[0u8; 15]), TextureSampling::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::ResourceCreation { kind: ResourceKind::Texture, .. }));
        assert_eq!(api.live_count(), 0);
    }

    #[test]
    fn uniform_locations_follow_declaration_order() {
        let mut api = RecordingApi::with_uniforms(&["a", "b"]);
        let shader = api.create_shader(&ShaderSource::quad()).unwrap();
        assert_eq!(shader.location("b"), Some(UniformLocation(1)));
        assert_eq!(shader.location("missing"), None);
        assert_eq!(api.uniform_name(UniformLocation(0)), Some("a"));
    }
}
