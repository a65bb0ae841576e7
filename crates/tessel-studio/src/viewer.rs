use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use tessel_engine::backend::WgpuApi;
use tessel_engine::coords::{IVec2, Viewport};
use tessel_engine::device::{Gpu, GpuInit, SurfaceErrorAction};
use tessel_engine::paint::Rgba;
use tessel_engine::render::{create_renderer, share, GraphicsApi, Renderer2D, RendererConfig, RendererKind};

use crate::config::StudioConfig;
use crate::scene::Scene;

const CLEAR_COLOR: Rgba = Rgba(0x1A1C24FF);

#[self_referencing]
struct WindowGpu {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Everything alive while the window is open.
///
/// Field order is drop order: textures and the renderer release their GPU
/// objects before the device and window go away.
struct Running {
    scene: Scene,
    renderer: Box<dyn Renderer2D>,
    api: Rc<RefCell<WgpuApi>>,
    window_gpu: WindowGpu,
    started: Instant,
}

/// winit application driving one studio window.
pub struct Viewer {
    config: StudioConfig,
    gpu_init: GpuInit,
    running: Option<Running>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    pub fn new(config: StudioConfig, gpu_init: GpuInit) -> Self {
        Self {
            config,
            gpu_init,
            running: None,
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn into_result(self) -> Result<()> {
        self.error.map_or(Ok(()), Err)
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let window_gpu = WindowGpuTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let (api, shared) = share(window_gpu.borrow_gpu().create_api());

        let mut renderer = create_renderer(RendererKind::Immediate, shared.clone(), RendererConfig::default());
        renderer.init().context("renderer initialization failed")?;

        let scene = Scene::new(&shared, self.config.texture_path.as_deref())?;

        Ok(Running {
            scene,
            renderer,
            api,
            window_gpu,
            started: Instant::now(),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.running = None;
        self.error = Some(err);
        event_loop.exit();
    }
}

impl Running {
    fn redraw(&mut self) -> Result<()> {
        let frame = match self.window_gpu.borrow_gpu().begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let action = self.window_gpu.with_gpu_mut(|gpu| gpu.handle_surface_error(err));
                return match action {
                    SurfaceErrorAction::Fatal => Err(anyhow!("surface lost for good")),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(()),
                };
            }
        };

        let view = frame
            .surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        {
            let mut api = self.api.borrow_mut();
            api.begin_frame(view, frame.size);
            api.set_viewport(frame.size, IVec2::zero());
            api.set_clear_color(CLEAR_COLOR);
            api.clear();
        }

        let viewport = Viewport::from_physical(self.window_gpu.borrow_gpu().size());
        let t = self.started.elapsed().as_secs_f64();
        let drawn = self.scene.draw(self.renderer.as_mut(), viewport, t);

        let commands = self.api.borrow_mut().finish_frame();
        self.window_gpu.borrow_gpu().present(frame, commands);

        drawn.context("failed to draw frame")
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => {
                running.window_gpu.with_window(|w| w.request_redraw());
                self.running = Some(running);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(running) = &self.running {
            running.window_gpu.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                self.running = None;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                running.window_gpu.with_gpu_mut(|gpu| gpu.resize(new_size));
                running.window_gpu.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = running.window_gpu.with_window(|w| w.inner_size());
                running.window_gpu.with_gpu_mut(|gpu| gpu.resize(new_size));
            }

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed && !event.repeat => {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => {
                        self.running = None;
                        event_loop.exit();
                    }
                    PhysicalKey::Code(KeyCode::Space) => running.scene.toggle_filter(),
                    _ => {}
                }
            }

            WindowEvent::RedrawRequested => {
                let size = running.window_gpu.borrow_gpu().size();
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Err(err) = running.redraw() {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}
