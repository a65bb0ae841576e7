/// Drawable size in pixels.
///
/// Used to build the default camera (`Affine2DMatrix::ndc`) and the GPU viewport.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn from_physical(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width as f32, size.height as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Integer size, rounded down and clamped to at least one pixel.
    #[inline]
    pub fn size_px(self) -> super::IVec2 {
        super::IVec2::new(self.width.max(1.0) as i32, self.height.max(1.0) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_invalid() {
        assert!(!Viewport::new(0.0, 10.0).is_valid());
    }

    #[test]
    fn nan_is_invalid() {
        assert!(!Viewport::new(f32::NAN, 10.0).is_valid());
    }

    #[test]
    fn size_px_clamps() {
        assert_eq!(Viewport::new(0.0, 99.9).size_px(), super::super::IVec2::new(1, 99));
    }

    #[test]
    fn from_physical_keeps_pixels() {
        let vp = Viewport::from_physical(winit::dpi::PhysicalSize::new(800, 600));
        assert_eq!(vp, Viewport::new(800.0, 600.0));
    }
}
