use crate::coords::{Affine2DMatrix, IVec2, Vec2};
use crate::paint::Rgba;
use crate::render::{QuadDraw, RenderResult, Renderer2D, SharedApi, TextureHandle, TextureSampling};

use super::Image;

/// GPU texture owned by the caller. Released on drop.
///
/// Renderers only borrow the handle for the duration of a draw.
pub struct Texture {
    api: SharedApi,
    handle: TextureHandle,
    size: IVec2,
    sampling: TextureSampling,
}

impl Texture {
    pub fn from_image(api: &SharedApi, image: &Image, sampling: TextureSampling) -> RenderResult<Self> {
        Self::from_pixels(api, image.size(), image.pixels(), sampling)
    }

    /// Uploads `size.x * size.y` RGBA8 pixels.
    pub fn from_pixels(api: &SharedApi, size: IVec2, pixels: &[u8], sampling: TextureSampling) -> RenderResult<Self> {
        let handle = api.borrow_mut().create_texture(size, Some(pixels), sampling)?;
        log::debug!("texture {handle:?} created ({}x{})", size.x, size.y);
        Ok(Self {
            api: api.clone(),
            handle,
            size,
            sampling,
        })
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        self.size
    }

    #[inline]
    pub fn sampling(&self) -> TextureSampling {
        self.sampling
    }

    pub fn set_sampling(&mut self, sampling: TextureSampling) {
        self.sampling = sampling;
        self.api.borrow_mut().set_texture_sampling(self.handle, sampling);
    }

    /// Draws the whole texture at its pixel size, placed by `display_matrix`.
    pub fn draw(&self, renderer: &mut dyn Renderer2D, display_matrix: &Affine2DMatrix, tint: Rgba) -> RenderResult<()> {
        let transform = *display_matrix * Affine2DMatrix::scale_xy(self.size.as_vec2());
        renderer.draw_quad(&QuadDraw::new(transform, self.handle).with_tint(tint))
    }

    /// Draws the `frame_size` region at `texel_position` (top-left origin),
    /// e.g. one frame of a sprite sheet.
    ///
    /// `display_matrix` maps the unit quad directly; unlike [`Texture::draw`]
    /// it is not scaled by the frame size. A texture with a zero dimension
    /// draws nothing.
    pub fn draw_region(
        &self,
        renderer: &mut dyn Renderer2D,
        display_matrix: &Affine2DMatrix,
        texel_position: IVec2,
        frame_size: IVec2,
        tint: Rgba,
    ) -> RenderResult<()> {
        let Some((uv_bl, uv_tr)) = region_uv(self.size, texel_position, frame_size) else {
            return Ok(());
        };
        renderer.draw_quad(
            &QuadDraw::new(*display_matrix, self.handle)
                .with_uv(uv_bl, uv_tr)
                .with_tint(tint),
        )
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        match self.api.try_borrow_mut() {
            Ok(mut api) => api.delete_texture(self.handle),
            Err(_) => log::error!("graphics api busy while releasing texture {:?}; handle leaked", self.handle),
        }
    }
}

/// UV rectangle (bottom-left, top-right) of a texel region in a texture of
/// `texture_size`.
///
/// `position` is measured from the texture's top-left corner while UVs grow
/// upwards from the bottom-left. `None` when the texture has a zero dimension.
pub fn region_uv(texture_size: IVec2, position: IVec2, frame_size: IVec2) -> Option<(Vec2, Vec2)> {
    if texture_size.x == 0 || texture_size.y == 0 {
        return None;
    }
    let w = texture_size.x as f64;
    let h = texture_size.y as f64;
    let (x, y) = (position.x as f64, position.y as f64);
    let (fw, fh) = (frame_size.x as f64, frame_size.y as f64);

    let bottom_left = Vec2::new(x / w, (h - (y + fh)) / h);
    let top_right = Vec2::new((x + fw) / w, (h - y) / h);
    Some((bottom_left, top_right))
}
