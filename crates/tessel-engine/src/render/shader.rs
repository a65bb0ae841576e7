use std::borrow::Cow;
use std::collections::HashMap;

use super::api::ProgramHandle;

/// Uniform names the quad shader may declare. Programs are free to omit any of them.
pub mod names {
    pub const MODEL: &str = "uModel";
    pub const TEXTURE_TRANSFORM: &str = "uTextureTransform";
    pub const DEPTH: &str = "u_depth";
    pub const TINT_COLOR: &str = "uTintColor";
    pub const TEXTURE: &str = "uTex2d";
    /// Uniform block holding the view-projection matrix.
    pub const CAMERA_BLOCK: &str = "Camera";
}

/// Opaque per-program uniform location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub i32);

/// Vertex + fragment source text handed to the shader compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: Cow<'static, str>,
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSource {
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Built-in textured, tinted quad shader (WGSL).
    pub fn quad() -> Self {
        Self::new(
            "tessel quad",
            include_str!("shaders/quad.vert.wgsl"),
            include_str!("shaders/quad.frag.wgsl"),
        )
    }
}

impl Default for ShaderSource {
    fn default() -> Self {
        Self::quad()
    }
}

/// A linked program plus the locations of the uniforms it actually declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledShader {
    pub program: ProgramHandle,
    pub uniform_locations: HashMap<String, UniformLocation>,
}

impl CompiledShader {
    pub fn new(program: ProgramHandle, uniform_locations: HashMap<String, UniformLocation>) -> Self {
        Self { program, uniform_locations }
    }

    /// Location of `name`, or `None` when the program does not declare it.
    #[inline]
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.uniform_locations.get(name).copied()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.program.is_none()
    }
}
