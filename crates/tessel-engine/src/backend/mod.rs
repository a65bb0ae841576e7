//! Implementations of [`GraphicsApi`](crate::render::GraphicsApi).
//!
//! - `recording`: headless, records every call (tests, tooling)
//! - `wgpu`: drives a real device

pub mod recording;
pub mod wgpu;

pub use recording::{GpuCall, RecordingApi};
pub use self::wgpu::WgpuApi;
