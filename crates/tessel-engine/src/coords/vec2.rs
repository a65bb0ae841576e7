use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector in world units (double precision).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the unit vector pointing the same way.
    ///
    /// Vectors whose length does not exceed `f64::EPSILON` normalize to zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > f64::EPSILON {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::zero()
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Narrows to the `[f32; 2]` layout used by vertex and uniform data.
    #[inline]
    pub fn to_f32(self) -> [f32; 2] {
        [self.x as f32, self.y as f32]
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f64 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: Vec2) -> Vec2 {
        rhs * self
    }
}

impl MulAssign<f64> for Vec2 {
    #[inline]
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl DivAssign<f64> for Vec2 {
    #[inline]
    fn div_assign(&mut self, rhs: f64) {
        self.x /= rhs;
        self.y /= rhs;
    }
}

/// 2D integer vector (texel positions, texture and viewport sizes).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    #[inline]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(f64::from(self.x), f64::from(self.y))
    }
}

impl From<IVec2> for Vec2 {
    #[inline]
    fn from(v: IVec2) -> Vec2 {
        v.as_vec2()
    }
}

impl Add for IVec2 {
    type Output = IVec2;
    #[inline]
    fn add(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for IVec2 {
    #[inline]
    fn add_assign(&mut self, rhs: IVec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for IVec2 {
    type Output = IVec2;
    #[inline]
    fn sub(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for IVec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: IVec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<i32> for IVec2 {
    type Output = IVec2;
    #[inline]
    fn mul(self, rhs: i32) -> IVec2 {
        IVec2::new(self.x * rhs, self.y * rhs)
    }
}

impl MulAssign<i32> for IVec2 {
    #[inline]
    fn mul_assign(&mut self, rhs: i32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<i32> for IVec2 {
    type Output = IVec2;
    #[inline]
    fn div(self, rhs: i32) -> IVec2 {
        IVec2::new(self.x / rhs, self.y / rhs)
    }
}

impl DivAssign<i32> for IVec2 {
    #[inline]
    fn div_assign(&mut self, rhs: i32) {
        self.x /= rhs;
        self.y /= rhs;
    }
}

impl Mul<f64> for IVec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        self.as_vec2() * rhs
    }
}

impl Div<f64> for IVec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f64) -> Vec2 {
        self.as_vec2() / rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_of_3_4_is_5() {
        assert_eq!(Vec2::new(3.0, 4.0).length(), 5.0);
    }

    #[test]
    fn normalize_unit_length() {
        let n = Vec2::new(3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert_eq!(n, Vec2::new(0.6, 0.8));
    }

    #[test]
    fn normalize_tiny_vector_is_zero() {
        assert_eq!(Vec2::new(f64::EPSILON / 4.0, 0.0).normalize(), Vec2::zero());
        assert_eq!(Vec2::zero().normalize(), Vec2::zero());
    }

    #[test]
    fn scalar_on_either_side() {
        let v = Vec2::new(1.5, -2.0);
        assert_eq!(v * 2.0, 2.0 * v);
        assert_eq!(v * 2.0, Vec2::new(3.0, -4.0));
    }

    #[test]
    fn assign_operators() {
        let mut v = Vec2::new(1.0, 1.0);
        v += Vec2::new(1.0, 2.0);
        v -= Vec2::new(0.5, 0.5);
        v *= 4.0;
        v /= 2.0;
        assert_eq!(v, Vec2::new(3.0, 5.0));
    }

    #[test]
    fn ivec2_integer_division_truncates() {
        assert_eq!(IVec2::new(7, -7) / 2, IVec2::new(3, -3));
    }

    #[test]
    fn ivec2_float_ops_widen() {
        assert_eq!(IVec2::new(3, 4) * 0.5, Vec2::new(1.5, 2.0));
        assert_eq!(IVec2::new(3, 4) / 2.0, Vec2::new(1.5, 2.0));
        assert_eq!(Vec2::from(IVec2::new(-1, 2)), Vec2::new(-1.0, 2.0));
    }
}
