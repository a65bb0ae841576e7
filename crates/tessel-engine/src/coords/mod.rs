//! Coordinate and transform types shared by the renderer and its callers.
//!
//! Canonical world space:
//! - double precision
//! - origin bottom-left, +X right, +Y up
//!
//! Cameras map world space to NDC with an `Affine2DMatrix` (see [`Affine2DMatrix::ndc`]).

mod affine;
mod vec2;
mod viewport;

pub use affine::Affine2DMatrix;
pub use vec2::{IVec2, Vec2};
pub use viewport::Viewport;
