//! Graphics command surface consumed by the renderer.
//!
//! The GPU context is a single mutable binding table (current program, vertex
//! array, texture units). Every operation that draws must re-bind what it
//! needs; nothing here promises that a binding survives a call made by someone
//! else.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::IVec2;
use crate::paint::Rgba;

use super::error::RenderResult;
use super::shader::{CompiledShader, ShaderSource, UniformLocation};

macro_rules! gpu_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// `0` is the "no resource" sentinel.
        #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: $name = $name(0);

            #[inline]
            pub const fn is_none(self) -> bool {
                self.0 == 0
            }

            #[inline]
            pub const fn is_some(self) -> bool {
                self.0 != 0
            }
        }
    };
}

gpu_handle!(
    /// GPU buffer (vertex, index or uniform data).
    BufferHandle
);
gpu_handle!(
    /// Vertex layout object: vertex buffer + attribute layout + index buffer.
    VertexArrayHandle
);
gpu_handle!(
    /// GPU-resident pixel data. Owned by whoever created it; draws only borrow it.
    TextureHandle
);
gpu_handle!(
    /// Linked shader program.
    ProgramHandle
);

/// Kind of GPU object, used for error reporting and failure injection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    UniformBuffer,
    VertexArray,
    Program,
    Texture,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::VertexBuffer => "vertex buffer",
            ResourceKind::IndexBuffer => "index buffer",
            ResourceKind::UniformBuffer => "uniform buffer",
            ResourceKind::VertexArray => "vertex array",
            ResourceKind::Program => "shader program",
            ResourceKind::Texture => "texture",
        };
        f.write_str(s)
    }
}

/// Buffer binding target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

impl BufferKind {
    #[inline]
    pub fn resource_kind(self) -> ResourceKind {
        match self {
            BufferKind::Vertex => ResourceKind::VertexBuffer,
            BufferKind::Index => ResourceKind::IndexBuffer,
            BufferKind::Uniform => ResourceKind::UniformBuffer,
        }
    }
}

/// Initial buffer contents.
#[derive(Debug, Copy, Clone)]
pub enum BufferInit<'a> {
    /// Immutable data uploaded once.
    Static(&'a [u8]),
    /// Zero-initialized storage of `size` bytes, updated with `update_buffer`.
    Dynamic { size: u64 },
}

impl BufferInit<'_> {
    #[inline]
    pub fn size(&self) -> u64 {
        match self {
            BufferInit::Static(bytes) => bytes.len() as u64,
            BufferInit::Dynamic { size } => *size,
        }
    }
}

/// Value written to a plain (non-block) shader uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    /// Column-major 3x3 matrix.
    Mat3([f32; 9]),
    Vec4([f32; 4]),
    Float(f32),
    /// Integer uniform; for texture uniforms this is the texture unit.
    Int(i32),
}

/// Texture sampling state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureSampling {
    pub filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
}

impl Default for TextureSampling {
    /// Nearest-pixel filtering and repeat wrapping: crisp sprites, tiling atlases.
    fn default() -> Self {
        Self {
            filter: wgpu::FilterMode::Nearest,
            address_mode: wgpu::AddressMode::Repeat,
        }
    }
}

/// Imperative graphics calls the renderer is built on.
///
/// Creation calls are fallible; everything else is fire-and-forget, matching
/// how GPU APIs report misuse (validation logs, not return values).
/// Deleting `NONE` or an unknown handle is a no-op.
pub trait GraphicsApi {
    fn create_buffer(&mut self, kind: BufferKind, init: BufferInit<'_>) -> RenderResult<BufferHandle>;
    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Describes how `vertex_buffer` feeds the vertex stage and attaches `index_buffer`.
    fn create_vertex_array(
        &mut self,
        layout: &wgpu::VertexBufferLayout<'static>,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_format: wgpu::IndexFormat,
    ) -> RenderResult<VertexArrayHandle>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Compiles and links a program, reporting its uniform locations.
    fn create_shader(&mut self, source: &ShaderSource) -> RenderResult<CompiledShader>;
    fn delete_shader(&mut self, program: ProgramHandle);

    /// Attaches `buffer` to the program's uniform block `block_name` at `binding`.
    ///
    /// Programs that do not declare the block ignore the call.
    fn bind_uniform_block(&mut self, program: ProgramHandle, block_name: &str, binding: u32, buffer: BufferHandle);

    fn use_program(&mut self, program: ProgramHandle);

    /// Sets a uniform on the program last passed to `use_program`.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Creates an RGBA8 texture. `pixels`, when given, holds `size.x * size.y * 4`
    /// bytes in row-major order.
    fn create_texture(
        &mut self,
        size: IVec2,
        pixels: Option<&[u8]>,
        sampling: TextureSampling,
    ) -> RenderResult<TextureHandle>;
    fn delete_texture(&mut self, texture: TextureHandle);
    fn set_texture_sampling(&mut self, texture: TextureHandle, sampling: TextureSampling);

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Binds a vertex array; `VertexArrayHandle::NONE` unbinds.
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Draws `index_count` indices of the bound vertex array as a triangle list.
    fn draw_indexed(&mut self, index_count: u32);

    fn set_clear_color(&mut self, color: Rgba);
    fn clear(&mut self);
    fn set_viewport(&mut self, size: IVec2, anchor_bottom_left: IVec2);
}

/// Shared, single-threaded handle to the command surface.
///
/// `Rc<RefCell<..>>` keeps the GPU context on its owning thread. Borrows must
/// be short: take one, issue the calls, drop it.
pub type SharedApi = Rc<RefCell<dyn GraphicsApi>>;

/// Wraps a concrete command surface into a [`SharedApi`], returning the typed
/// handle as well so callers can keep backend-specific access.
pub fn share<A: GraphicsApi + 'static>(api: A) -> (Rc<RefCell<A>>, SharedApi) {
    let typed = Rc::new(RefCell::new(api));
    let shared: SharedApi = typed.clone();
    (typed, shared)
}
