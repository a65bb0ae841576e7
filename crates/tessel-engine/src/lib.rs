//! Tessel engine crate.
//!
//! Immediate-mode 2D quad rendering over an injected graphics command surface,
//! plus the wgpu device layer that backs it at runtime.

pub mod backend;
pub mod coords;
pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
pub mod texture;
