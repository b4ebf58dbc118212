//! Foundation types and numeric helpers.
//!
//! Integer rectangles, rounding helpers and epsilon comparisons that the
//! matrix, region and resampling layers all depend on.

use serde::{Deserialize, Serialize};

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Floor a double to the nearest integer toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i32 {
    let i = v as i32;
    i - (i as f64 > v) as i32
}

/// Ceiling of a double as a signed integer.
#[inline]
pub fn iceil(v: f64) -> i32 {
    v.ceil() as i32
}

/// Round a double to the nearest integer (round half away from zero).
#[inline]
pub fn iround(v: f64) -> i32 {
    if v < 0.0 {
        (v - 0.5) as i32
    } else {
        (v + 0.5) as i32
    }
}

/// Convert degrees to radians.
#[inline]
pub fn deg2rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

/// Check if two values are equal within epsilon.
#[inline]
pub fn is_equal_eps(v1: f64, v2: f64, epsilon: f64) -> bool {
    (v1 - v2).abs() <= epsilon
}

/// True when `v` is within `epsilon` of an integer.
#[inline]
pub fn is_integral_eps(v: f64, epsilon: f64) -> bool {
    is_equal_eps(v, v.round(), epsilon)
}

// ============================================================================
// Rectangle
// ============================================================================

/// Integer pixel rectangle covering `[x, x+width) × [y, y+height)`.
///
/// A zero width or height is the empty rectangle. Negative sizes never
/// come out of the constructors in this crate; `is_empty` treats them as
/// empty too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning the two corners `(x1, y1)` inclusive and
    /// `(x2, y2)` exclusive.
    pub fn from_edges(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(x1, y1, (x2 - x1).max(0), (y2 - y1).max(0))
    }

    #[inline]
    pub fn x2(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn y2(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }

    /// True when every pixel of `other` is inside `self`. The empty
    /// rectangle is contained in everything.
    pub fn contains(&self, other: &Rectangle) -> bool {
        if other.is_empty() {
            return true;
        }
        other.x >= self.x && other.y >= self.y && other.x2() <= self.x2() && other.y2() <= self.y2()
    }

    /// Overlap of two rectangles; empty when they are disjoint.
    pub fn intersect(&self, other: &Rectangle) -> Rectangle {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());
        if x2 <= x1 || y2 <= y1 {
            return Rectangle::new(x1, y1, 0, 0);
        }
        Rectangle::from_edges(x1, y1, x2, y2)
    }

    /// Smallest rectangle covering both. Empty operands are ignored.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rectangle::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.x2().max(other.x2()),
            self.y2().max(other.y2()),
        )
    }

    /// Shift the origin, keeping the size.
    #[inline]
    pub fn translate(&self, dx: i32, dy: i32) -> Rectangle {
        Rectangle::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow by a kernel context rectangle. One context pixel coincides with
    /// the sample pixel itself, so the size grows by `context.width - 1`.
    pub fn dilate(&self, context: &Rectangle) -> Rectangle {
        Rectangle::new(
            self.x + context.x,
            self.y + context.y,
            self.width + context.width - 1,
            self.height + context.height - 1,
        )
    }

    /// Grow by the mirror image of a kernel context rectangle: the set of
    /// sample pixels whose kernel footprint touches `self`.
    pub fn dilate_reflected(&self, context: &Rectangle) -> Rectangle {
        Rectangle::new(
            self.x - (context.x + context.width - 1),
            self.y - (context.y + context.height - 1),
            self.width + context.width - 1,
            self.height + context.height - 1,
        )
    }

    /// Outer-corner positions as `[x0, y0, x1, y0, x0, y1, x1, y1]`.
    pub fn corner_points(&self) -> [f64; 8] {
        let x0 = self.x as f64;
        let y0 = self.y as f64;
        let x1 = self.x2() as f64;
        let y1 = self.y2() as f64;
        [x0, y0, x1, y0, x0, y1, x1, y1]
    }

    /// Pixel-center positions of the four corner pixels.
    pub fn center_points(&self) -> [f64; 8] {
        let x0 = self.x as f64 + 0.5;
        let y0 = self.y as f64 + 0.5;
        let x1 = self.x2() as f64 - 0.5;
        let y1 = self.y2() as f64 - 0.5;
        [x0, y0, x1, y0, x0, y1, x1, y1]
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}{:+}{:+}",
            self.width, self.height, self.x, self.y
        )
    }
}
