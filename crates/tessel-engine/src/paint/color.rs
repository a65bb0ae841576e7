/// Packed 32-bit straight-alpha color, red in the high byte: `0xRRGGBBAA`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const WHITE: Rgba = Rgba(0xFFFF_FFFF);
    pub const BLACK: Rgba = Rgba(0x0000_00FF);
    pub const TRANSPARENT: Rgba = Rgba(0x0000_0000);

    #[inline]
    pub const fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// Unpacks to `[r, g, b, a]`, each byte divided by 255.
    #[inline]
    pub fn unpack(self) -> [f32; 4] {
        const SCALE: f32 = 1.0 / 255.0;
        [
            f32::from(self.r()) * SCALE,
            f32::from(self.g()) * SCALE,
            f32::from(self.b()) * SCALE,
            f32::from(self.a()) * SCALE,
        ]
    }

    /// Packs normalized components. Values are clamped to `[0, 1]` and rounded.
    #[inline]
    pub fn pack(c: [f32; 4]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::from_u8(q(c[0]), q(c[1]), q(c[2]), q(c[3]))
    }

    /// Same color with a replaced alpha byte.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self((self.0 & 0xFFFF_FF00) | a as u32)
    }
}

impl From<u32> for Rgba {
    #[inline]
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Free-function form of [`Rgba::unpack`].
#[inline]
pub fn unpack_color(rgba: Rgba) -> [f32; 4] {
    rgba.unpack()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn magenta_half_alpha() {
        let c = Rgba(0xFF00_FF80).unpack();
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], 0.0);
        assert_eq!(c[2], 1.0);
        assert_relative_eq!(c[3], 128.0 / 255.0);
        assert_relative_eq!(c[3], 0.501_96, epsilon = 1e-5);
    }

    #[test]
    fn constants_unpack() {
        assert_eq!(Rgba::WHITE.unpack(), [1.0; 4]);
        assert_eq!(Rgba::BLACK.unpack(), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(unpack_color(Rgba::TRANSPARENT), [0.0; 4]);
    }

    #[test]
    fn byte_accessors() {
        let c = Rgba(0x1234_5678);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (0x12, 0x34, 0x56, 0x78));
        assert_eq!(Rgba::from_u8(0x12, 0x34, 0x56, 0x78), c);
    }

    #[test]
    fn pack_recovers_unpacked_bytes() {
        // Stride through the 32-bit space; every channel value is hit many times.
        let mut v: u32 = 0;
        for _ in 0..4096 {
            let c = Rgba(v);
            assert_eq!(Rgba::pack(c.unpack()), c, "0x{v:08X}");
            v = v.wrapping_add(0x9E37_79B9);
        }
        for byte in 0..=255u8 {
            let c = Rgba::from_u8(byte, 255 - byte, byte / 2, byte);
            assert_eq!(Rgba::pack(c.unpack()), c);
        }
    }

    #[test]
    fn pack_clamps_out_of_range() {
        assert_eq!(Rgba::pack([2.0, -1.0, 0.5, 1.0]), Rgba(0xFF00_80FF));
    }

    #[test]
    fn with_alpha_keeps_rgb() {
        assert_eq!(Rgba::WHITE.with_alpha(0x40), Rgba(0xFFFF_FF40));
    }
}
