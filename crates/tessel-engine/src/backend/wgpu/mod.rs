//! wgpu implementation of the graphics command surface.

mod api;
pub mod reflect;

pub use api::{WgpuApi, TEXTURE_FORMAT};
