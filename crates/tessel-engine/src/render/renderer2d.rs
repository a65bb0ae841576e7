use crate::coords::{Affine2DMatrix, Vec2};
use crate::paint::Rgba;

use super::api::{SharedApi, TextureHandle};
use super::error::RenderResult;
use super::immediate::ImmediateRenderer2D;
use super::shader::ShaderSource;

/// Lifecycle state of a renderer.
///
/// Legal transitions:
/// `Uninitialized -init-> Ready -begin_scene-> InScene -end_scene-> Ready -shutdown-> Uninitialized`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SceneState {
    #[default]
    Uninitialized,
    Ready,
    InScene,
}

impl std::fmt::Display for SceneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneState::Uninitialized => f.write_str("uninitialized"),
            SceneState::Ready => f.write_str("ready"),
            SceneState::InScene => f.write_str("in a scene"),
        }
    }
}

/// One textured, tinted quad.
///
/// The quad is the unit square centered on the origin; `transform` places and
/// sizes it. `uv_bottom_left`/`uv_top_right` select the sampled sub-rect.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadDraw {
    pub transform: Affine2DMatrix,
    pub texture: TextureHandle,
    pub uv_bottom_left: Vec2,
    pub uv_top_right: Vec2,
    pub tint: Rgba,
}

impl QuadDraw {
    /// Whole texture, no tint.
    pub fn new(transform: Affine2DMatrix, texture: TextureHandle) -> Self {
        Self {
            transform,
            texture,
            uv_bottom_left: Vec2::zero(),
            uv_top_right: Vec2::new(1.0, 1.0),
            tint: Rgba::WHITE,
        }
    }

    pub fn with_uv(mut self, bottom_left: Vec2, top_right: Vec2) -> Self {
        self.uv_bottom_left = bottom_left;
        self.uv_top_right = top_right;
        self
    }

    pub fn with_tint(mut self, tint: Rgba) -> Self {
        self.tint = tint;
        self
    }
}

/// 2D renderer contract.
///
/// Callers hold `Box<dyn Renderer2D>` and never depend on the concrete type, so
/// a batching implementation can replace the immediate one without touching
/// call sites.
pub trait Renderer2D {
    /// Acquires GPU resources. Fails on shader or resource creation errors.
    fn init(&mut self) -> RenderResult<()>;

    /// Releases every resource acquired by `init`. Safe to call repeatedly.
    fn shutdown(&mut self);

    /// Opens a scene drawn through `view_projection`.
    fn begin_scene(&mut self, view_projection: &Affine2DMatrix) -> RenderResult<()>;

    /// Closes the current scene.
    fn end_scene(&mut self) -> RenderResult<()>;

    /// Draws one quad. Only valid between `begin_scene` and `end_scene`.
    fn draw_quad(&mut self, quad: &QuadDraw) -> RenderResult<()>;

    fn state(&self) -> SceneState;
}

/// Available renderer implementations.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum RendererKind {
    /// One draw call per quad.
    #[default]
    Immediate,
}

/// Renderer construction parameters.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Program used for every quad.
    pub shader: ShaderSource,

    /// Uniform-buffer binding point of the camera block.
    pub camera_binding: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader: ShaderSource::quad(),
            camera_binding: 0,
        }
    }
}

/// Builds an (uninitialized) renderer of the requested kind on top of `api`.
pub fn create_renderer(kind: RendererKind, api: SharedApi, config: RendererConfig) -> Box<dyn Renderer2D> {
    match kind {
        RendererKind::Immediate => Box::new(ImmediateRenderer2D::new(api, config)),
    }
}
