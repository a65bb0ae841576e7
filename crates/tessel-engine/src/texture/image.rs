use std::path::Path;

use crate::coords::IVec2;
use crate::render::{RenderError, RenderResult};

/// Decoded RGBA8 pixels, rows stored first-to-last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    size: IVec2,
    pixels: Vec<u8>,
}

impl Image {
    /// Decodes an image file to RGBA8.
    ///
    /// With `flip_vertical` the bottom row is stored first, matching the
    /// bottom-left UV origin quads are drawn with.
    pub fn load(path: impl AsRef<Path>, flip_vertical: bool) -> RenderResult<Self> {
        let path = path.as_ref();
        let decoded = ::image::open(path).map_err(|err| RenderError::ImageLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let decoded = if flip_vertical { decoded.flipv() } else { decoded };
        let rgba = decoded.into_rgba8();

        let (w, h) = rgba.dimensions();
        let size = match (i32::try_from(w), i32::try_from(h)) {
            (Ok(w), Ok(h)) => IVec2::new(w, h),
            _ => {
                return Err(RenderError::ImageLoad {
                    path: path.to_path_buf(),
                    reason: format!("{w}x{h} is too large"),
                });
            }
        };

        log::debug!("loaded {} ({}x{})", path.display(), size.x, size.y);
        Ok(Self {
            size,
            pixels: rgba.into_raw(),
        })
    }

    /// Wraps raw RGBA8 pixels. Returns `None` unless `pixels` holds exactly
    /// `size.x * size.y * 4` bytes.
    pub fn from_rgba(size: IVec2, pixels: Vec<u8>) -> Option<Self> {
        let expected = usize::try_from(size.x).ok()? * usize::try_from(size.y).ok()? * 4;
        (pixels.len() == expected).then_some(Self { size, pixels })
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        self.size
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA of the pixel at (`x`, `y`) in storage order.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x >= self.size.x || y >= self.size.y {
            return None;
        }
        let i = (y as usize * self.size.x as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
