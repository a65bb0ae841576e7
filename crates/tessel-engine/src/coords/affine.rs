use core::ops::{Index, IndexMut, Mul, MulAssign};

use super::{IVec2, Vec2, Viewport};

/// 3x3 row-major affine transform over 2D homogeneous coordinates.
///
/// Layout:
/// - upper-left 2x2 holds rotation/scale
/// - last column holds translation
/// - bottom row is `[0, 0, 1]` for every value built from the constructors below
///
/// Composition reads right to left: `parent * child` applies `child` first.
/// To draw an object of local size `S` at world transform `T`, use
/// `T * Affine2DMatrix::scale_xy(S)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2DMatrix {
    m: [[f64; 3]; 3],
}

impl Affine2DMatrix {
    const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[inline]
    pub const fn identity() -> Self {
        Self { m: Self::IDENTITY }
    }

    /// Builds a matrix from raw rows. The caller is responsible for the bottom row.
    #[inline]
    pub const fn from_rows(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    #[inline]
    pub fn translation(v: Vec2) -> Self {
        let mut out = Self::identity();
        out.m[0][2] = v.x;
        out.m[1][2] = v.y;
        out
    }

    #[inline]
    pub fn translation_i(v: IVec2) -> Self {
        Self::translation(v.as_vec2())
    }

    /// Uniform scale.
    #[inline]
    pub fn scale(s: f64) -> Self {
        Self::scale_xy(Vec2::new(s, s))
    }

    #[inline]
    pub fn scale_xy(s: Vec2) -> Self {
        let mut out = Self::identity();
        out.m[0][0] = s.x;
        out.m[1][1] = s.y;
        out
    }

    /// Counter-clockwise rotation by `theta` radians.
    #[inline]
    pub fn rotation(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        let mut out = Self::identity();
        out.m[0][0] = cos;
        out.m[0][1] = -sin;
        out.m[1][0] = sin;
        out.m[1][1] = cos;
        out
    }

    /// Camera matrix mapping pixel space (origin bottom-left, `[0, w] x [0, h]`)
    /// onto normalized device coordinates `[-1, 1]^2`.
    ///
    /// Degenerate viewports are clamped to one pixel.
    pub fn ndc(viewport: Viewport) -> Self {
        let w = f64::from(viewport.width.max(1.0));
        let h = f64::from(viewport.height.max(1.0));
        Self::translation(Vec2::new(-1.0, -1.0)) * Self::scale_xy(Vec2::new(2.0 / w, 2.0 / h))
    }

    /// Restores identity.
    #[inline]
    pub fn reset(&mut self) {
        self.m = Self::IDENTITY;
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.m
    }

    #[inline]
    pub fn translation_part(&self) -> Vec2 {
        Vec2::new(self.m[0][2], self.m[1][2])
    }

    /// Element-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Default for Affine2DMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Index<usize> for Affine2DMatrix {
    type Output = [f64; 3];
    #[inline]
    fn index(&self, row: usize) -> &[f64; 3] {
        &self.m[row]
    }
}

impl IndexMut<usize> for Affine2DMatrix {
    #[inline]
    fn index_mut(&mut self, row: usize) -> &mut [f64; 3] {
        &mut self.m[row]
    }
}

impl Mul for Affine2DMatrix {
    type Output = Affine2DMatrix;

    fn mul(self, rhs: Affine2DMatrix) -> Affine2DMatrix {
        let mut out = [[0.0f64; 3]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, cell) in out_row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[row][k] * rhs.m[k][col]).sum();
            }
        }
        Affine2DMatrix { m: out }
    }
}

impl MulAssign for Affine2DMatrix {
    #[inline]
    fn mul_assign(&mut self, rhs: Affine2DMatrix) {
        *self = *self * rhs;
    }
}

impl Mul<Vec2> for Affine2DMatrix {
    type Output = Vec2;

    /// Applies the affine map; the homogeneous `w = 1` is implicit.
    #[inline]
    fn mul(self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2],
        )
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const EPS: f64 = 1e-9;

    fn random_affine(rng: &mut SmallRng) -> Affine2DMatrix {
        let t = Affine2DMatrix::translation(Vec2::new(
            rng.gen_range(-100.0..100.0),
            rng.gen_range(-100.0..100.0),
        ));
        let r = Affine2DMatrix::rotation(rng.gen_range(-PI..PI));
        let s = Affine2DMatrix::scale_xy(Vec2::new(
            rng.gen_range(0.1..10.0),
            rng.gen_range(0.1..10.0),
        ));
        t * r * s
    }

    fn assert_vec_eq(a: Vec2, b: Vec2) {
        assert_relative_eq!(a.x, b.x, epsilon = EPS);
        assert_relative_eq!(a.y, b.y, epsilon = EPS);
    }

    // ── algebra ───────────────────────────────────────────────────────────

    #[test]
    fn default_is_identity() {
        assert_eq!(Affine2DMatrix::default(), Affine2DMatrix::identity());
    }

    #[test]
    fn identity_is_neutral_on_both_sides() {
        let mut rng = SmallRng::seed_from_u64(0x7e55e1);
        for _ in 0..64 {
            let t = random_affine(&mut rng);
            assert!((t * Affine2DMatrix::identity()).approx_eq(&t, EPS));
            assert!((Affine2DMatrix::identity() * t).approx_eq(&t, EPS));
        }
    }

    #[test]
    fn product_is_associative() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..64 {
            let a = random_affine(&mut rng);
            let b = random_affine(&mut rng);
            let c = random_affine(&mut rng);
            assert!(((a * b) * c).approx_eq(&(a * (b * c)), 1e-6));
        }
    }

    #[test]
    fn product_is_not_commutative() {
        let t = Affine2DMatrix::translation(Vec2::new(10.0, 0.0));
        let s = Affine2DMatrix::scale(2.0);
        assert_vec_eq((t * s) * Vec2::new(1.0, 1.0), Vec2::new(12.0, 2.0));
        assert_vec_eq((s * t) * Vec2::new(1.0, 1.0), Vec2::new(22.0, 2.0));
    }

    #[test]
    fn bottom_row_stays_homogeneous() {
        let mut rng = SmallRng::seed_from_u64(7);
        let m = random_affine(&mut rng) * random_affine(&mut rng);
        assert_relative_eq!(m[2][0], 0.0, epsilon = EPS);
        assert_relative_eq!(m[2][1], 0.0, epsilon = EPS);
        assert_relative_eq!(m[2][2], 1.0, epsilon = EPS);
    }

    #[test]
    fn mul_assign_matches_mul() {
        let a = Affine2DMatrix::rotation(0.3);
        let b = Affine2DMatrix::translation(Vec2::new(1.0, 2.0));
        let mut c = a;
        c *= b;
        assert_eq!(c, a * b);
    }

    // ── point transform ───────────────────────────────────────────────────

    #[test]
    fn translation_adds_offset() {
        let v = Vec2::new(3.0, -4.5);
        let p = Vec2::new(10.0, 20.0);
        assert_vec_eq(Affine2DMatrix::translation(v) * p, p + v);
    }

    #[test]
    fn integer_translation_matches_float() {
        assert_eq!(
            Affine2DMatrix::translation_i(IVec2::new(2, -3)),
            Affine2DMatrix::translation(Vec2::new(2.0, -3.0))
        );
    }

    #[test]
    fn scale_multiplies_componentwise() {
        let p = Vec2::new(3.0, -2.0);
        assert_vec_eq(Affine2DMatrix::scale_xy(Vec2::new(2.0, 0.5)) * p, Vec2::new(6.0, -1.0));
        assert_vec_eq(Affine2DMatrix::scale(3.0) * p, p * 3.0);
    }

    #[test]
    fn zero_rotation_is_identity() {
        assert!(Affine2DMatrix::rotation(0.0).approx_eq(&Affine2DMatrix::identity(), EPS));
    }

    #[test]
    fn quarter_turn_is_counter_clockwise() {
        let r = Affine2DMatrix::rotation(FRAC_PI_2);
        assert_vec_eq(r * Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
        assert_vec_eq(r * Vec2::new(0.0, 1.0), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn scale_is_applied_before_outer_transform() {
        let world = Affine2DMatrix::translation(Vec2::new(100.0, 50.0));
        let draw = world * Affine2DMatrix::scale_xy(Vec2::new(64.0, 32.0));
        // Unit-quad corner (0.5, 0.5) lands at the sprite's top-right.
        assert_vec_eq(draw * Vec2::new(0.5, 0.5), Vec2::new(132.0, 66.0));
    }

    // ── ndc ───────────────────────────────────────────────────────────────

    #[test]
    fn ndc_maps_viewport_corners() {
        let ndc = Affine2DMatrix::ndc(Viewport::new(800.0, 600.0));
        assert_vec_eq(ndc * Vec2::new(0.0, 0.0), Vec2::new(-1.0, -1.0));
        assert_vec_eq(ndc * Vec2::new(800.0, 600.0), Vec2::new(1.0, 1.0));
        assert_vec_eq(ndc * Vec2::new(400.0, 300.0), Vec2::zero());
    }

    #[test]
    fn ndc_clamps_empty_viewport() {
        let ndc = Affine2DMatrix::ndc(Viewport::new(0.0, 0.0));
        assert!(ndc.rows().iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn reset_restores_identity() {
        let mut m = Affine2DMatrix::rotation(1.0);
        m.reset();
        assert_eq!(m, Affine2DMatrix::identity());
    }
}
