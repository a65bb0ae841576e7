//! Tessel studio: opens a window and drives the quad renderer through wgpu.

mod config;
mod scene;
mod viewer;

use anyhow::{Context, Result};
use clap::Parser;
use winit::event_loop::EventLoop;

use tessel_engine::device::GpuInit;
use tessel_engine::logging::{init_logging, LoggingConfig};

use config::StudioConfig;
use viewer::Viewer;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = StudioConfig::parse();
    log::info!("starting {:?}", config.title);

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut viewer = Viewer::new(config, GpuInit::default());
    event_loop
        .run_app(&mut viewer)
        .context("winit event loop terminated with error")?;

    viewer.into_result()
}
