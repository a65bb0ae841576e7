//! Color model shared between callers and the renderer.
//!
//! Colors travel as packed `0xRRGGBBAA` values and are unpacked to normalized
//! floats only when uploaded as uniforms.

pub mod color;

pub use color::{unpack_color, Rgba};
