//! Pixel types.
//!
//! - `Rgba`: premultiplied f32 components, the working format for all
//!   sampling and resampling.
//! - `Rgba8`: straight (non-premultiplied) 8-bit components for import
//!   and export.

// ============================================================================
// Rgba (premultiplied f32)
// ============================================================================

/// Premultiplied RGBA pixel with f32 components, nominally in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    /// Components must already be premultiplied.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiply straight components.
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::new(r * a, g * a, b * a, a)
    }

    /// Straight components; fully transparent pixels come back as zeros.
    pub fn to_straight(&self) -> [f32; 4] {
        if self.a <= 0.0 {
            return [0.0; 4];
        }
        let inv = 1.0 / self.a;
        [self.r * inv, self.g * inv, self.b * inv, self.a]
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Largest per-channel absolute difference.
    pub fn max_diff(&self, other: &Rgba) -> f32 {
        (self.r - other.r)
            .abs()
            .max((self.g - other.g).abs())
            .max((self.b - other.b).abs())
            .max((self.a - other.a).abs())
    }
}

impl core::ops::Add for Rgba {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
            a: self.a + rhs.a,
        }
    }
}

impl core::ops::AddAssign for Rgba {
    fn add_assign(&mut self, rhs: Self) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
        self.a += rhs.a;
    }
}

impl core::ops::Mul<f32> for Rgba {
    type Output = Self;
    fn mul(self, k: f32) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
            a: self.a * k,
        }
    }
}

impl core::ops::MulAssign<f32> for Rgba {
    fn mul_assign(&mut self, k: f32) {
        self.r *= k;
        self.g *= k;
        self.b *= k;
        self.a *= k;
    }
}

// ============================================================================
// Rgba8 (8-bit per channel)
// ============================================================================

/// Straight RGBA color with u8 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_double(v: u8) -> f32 {
        v as f32 / 255.0
    }

    #[inline]
    pub fn from_double(v: f32) -> u8 {
        (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
    }

    pub fn to_rgba(&self) -> Rgba {
        Rgba::from_straight(
            Self::to_double(self.r),
            Self::to_double(self.g),
            Self::to_double(self.b),
            Self::to_double(self.a),
        )
    }

    pub fn from_rgba(c: &Rgba) -> Self {
        let [r, g, b, a] = c.to_straight();
        Self::new(
            Self::from_double(r),
            Self::from_double(g),
            Self::from_double(b),
            Self::from_double(a),
        )
    }
}
