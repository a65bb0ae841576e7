use std::path::PathBuf;

use super::api::ResourceKind;
use super::renderer2d::SceneState;

/// Shader pipeline stage, used to locate compilation failures.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors surfaced by the renderer, its command surface and the texture loader.
///
/// Creation failures are fatal and never retried. `InvalidState` reports a
/// caller logic bug (an illegal scene transition); the rejected call issues no
/// GPU work. Missing shader uniforms are not errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Shader source failed to compile or link.
    #[error("{stage} shader failed to compile: {message}")]
    ShaderCompilation { stage: ShaderStage, message: String },

    /// A GPU object could not be created.
    #[error("failed to create {kind}: {reason}")]
    ResourceCreation { kind: ResourceKind, reason: String },

    /// The graphics backend cannot run this renderer.
    #[error("unsupported graphics backend: {0}")]
    UnsupportedBackend(String),

    /// Operation called outside its legal scene state.
    #[error("`{operation}` is not valid while the renderer is {state}")]
    InvalidState {
        operation: &'static str,
        state: SceneState,
    },

    /// Image file could not be read or decoded.
    #[error("failed to load image {}: {reason}", path.display())]
    ImageLoad { path: PathBuf, reason: String },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
