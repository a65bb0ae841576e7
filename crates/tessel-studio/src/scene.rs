use std::path::Path;

use anyhow::{Context, Result};

use tessel_engine::coords::{Affine2DMatrix, IVec2, Vec2, Viewport};
use tessel_engine::paint::Rgba;
use tessel_engine::render::{QuadDraw, RenderResult, Renderer2D, SharedApi, TextureSampling};
use tessel_engine::texture::{Image, Texture};

/// Edge length of one atlas cell, in texels.
const CELL: i32 = 32;
const CELL_COUNT: i32 = 4;

/// Demo content: a procedural sprite atlas plus an optional user image.
pub struct Scene {
    atlas: Texture,
    image: Option<Texture>,
}

impl Scene {
    pub fn new(api: &SharedApi, image_path: Option<&Path>) -> Result<Self> {
        let atlas = Texture::from_image(api, &atlas_image()?, TextureSampling::default())
            .context("failed to upload atlas")?;

        let image = match image_path {
            Some(path) => {
                let decoded = Image::load(path, true)?;
                let sampling = TextureSampling {
                    filter: wgpu::FilterMode::Linear,
                    address_mode: wgpu::AddressMode::ClampToEdge,
                };
                Some(Texture::from_image(api, &decoded, sampling).context("failed to upload image")?)
            }
            None => None,
        };

        Ok(Self { atlas, image })
    }

    /// Switches the atlas between nearest and linear filtering.
    pub fn toggle_filter(&mut self) {
        let mut sampling = self.atlas.sampling();
        sampling.filter = match sampling.filter {
            wgpu::FilterMode::Nearest => wgpu::FilterMode::Linear,
            wgpu::FilterMode::Linear => wgpu::FilterMode::Nearest,
        };
        log::info!("atlas filter: {:?}", sampling.filter);
        self.atlas.set_sampling(sampling);
    }

    /// Draws one frame `t` seconds into the animation.
    pub fn draw(&self, renderer: &mut dyn Renderer2D, viewport: Viewport, t: f64) -> RenderResult<()> {
        let (w, h) = (viewport.width as f64, viewport.height as f64);
        renderer.begin_scene(&Affine2DMatrix::ndc(viewport))?;

        // Whole atlas, spinning about the window center.
        let spin = Affine2DMatrix::translation(Vec2::new(w * 0.5, h * 0.5))
            * Affine2DMatrix::rotation(t * 0.5)
            * Affine2DMatrix::scale(2.0);
        self.atlas.draw(renderer, &spin, Rgba::WHITE)?;

        // Each cell as its own sprite along the bottom edge.
        for i in 0..CELL_COUNT {
            let at = Affine2DMatrix::translation(Vec2::new(64.0 + i as f64 * 96.0, 64.0))
                * Affine2DMatrix::scale(2.0 * CELL as f64);
            self.atlas
                .draw_region(renderer, &at, IVec2::new(i * CELL, 0), IVec2::new(CELL, CELL), Rgba::WHITE)?;
        }

        // Animated sprite: cycles through the cells, pulsing its tint.
        let frame = (t * 4.0) as i32 % CELL_COUNT;
        let alpha = 0.5 + 0.5 * (t * 2.0).sin();
        let tint = Rgba::pack([1.0, 0.7, 0.3, alpha as f32]);
        let corner = Affine2DMatrix::translation(Vec2::new(w - 96.0, h - 96.0)) * Affine2DMatrix::scale(3.0 * CELL as f64);
        self.atlas
            .draw_region(renderer, &corner, IVec2::new(frame * CELL, 0), IVec2::new(CELL, CELL), tint)?;

        // Tiled quad: UVs past 1.0 repeat the checker cell.
        let tiled = Affine2DMatrix::translation(Vec2::new(96.0, h - 96.0)) * Affine2DMatrix::scale(128.0);
        let checker_tr = Vec2::new(CELL as f64 / (CELL * CELL_COUNT) as f64, 1.0);
        renderer.draw_quad(&QuadDraw::new(tiled, self.atlas.handle()).with_uv(Vec2::zero(), checker_tr))?;

        if let Some(image) = &self.image {
            let size = image.size().as_vec2();
            let fit = (h * 0.4 / size.y.max(1.0)).min(w * 0.3 / size.x.max(1.0));
            let at = Affine2DMatrix::translation(Vec2::new(w * 0.8, h * 0.5)) * Affine2DMatrix::scale(fit);
            image.draw(renderer, &at, Rgba::WHITE)?;
        }

        renderer.end_scene()
    }
}

/// `CELL_COUNT` cells side by side: checker, stripes, gradient, ring.
fn atlas_image() -> Result<Image> {
    let size = IVec2::new(CELL * CELL_COUNT, CELL);
    let mut pixels = Vec::with_capacity((size.x * size.y * 4) as usize);

    for y in 0..size.y {
        for x in 0..size.x {
            let (cell, cx, cy) = (x / CELL, x % CELL, y);
            let rgba = match cell {
                0 if (cx / 8 + cy / 8) % 2 == 0 => 0xF2F2F2FF,
                0 => 0x303040FF,
                1 if (cy / 4) % 2 == 0 => 0xE05050FF,
                1 => 0x501818FF,
                2 => Rgba::pack([cx as f32 / CELL as f32, cy as f32 / CELL as f32, 0.8, 1.0]).0,
                _ => {
                    let d = Vec2::new(cx as f64 - 15.5, cy as f64 - 15.5).length();
                    if (9.0..14.0).contains(&d) { 0x40D080FF } else { 0x00000000 }
                }
            };
            pixels.extend_from_slice(&Rgba(rgba).unpack().map(|c| (c * 255.0).round() as u8));
        }
    }

    Image::from_rgba(size, pixels).context("atlas pixel buffer does not match its size")
}
