//! GPU device + window surface.
//!
//! Creates the wgpu Instance/Adapter/Device/Queue, configures the surface and
//! hands out frames. Rendering itself goes through
//! [`WgpuApi`](crate::backend::WgpuApi), which is built from this device.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
