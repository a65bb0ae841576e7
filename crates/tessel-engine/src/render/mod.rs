//! 2D rendering subsystem.
//!
//! Renderers issue GPU work through an injected [`GraphicsApi`] command surface
//! and own the GPU objects they create through RAII guards (`resource`).
//!
//! Convention:
//! - world space is double precision, origin bottom-left, +Y up
//! - the camera (`begin_scene`) maps world space to NDC
//! - matrices reach the GPU column-major (`uniforms`)

pub mod api;
mod error;
mod immediate;
pub mod quad;
mod renderer2d;
pub mod resource;
pub mod shader;
pub mod uniforms;

pub use api::{
    share, BufferHandle, BufferInit, BufferKind, GraphicsApi, ProgramHandle, ResourceKind,
    SharedApi, TextureHandle, TextureSampling, UniformValue, VertexArrayHandle,
};
pub use error::{RenderError, RenderResult, ShaderStage};
pub use immediate::{ImmediateRenderer2D, QuadHandles};
pub use renderer2d::{create_renderer, QuadDraw, Renderer2D, RendererConfig, RendererKind, SceneState};
pub use shader::{CompiledShader, ShaderSource, UniformLocation};
pub use uniforms::{camera_block, texture_transform, to_matrix_layout};
