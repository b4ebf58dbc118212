//! Abyss policies: what a read outside a buffer's defined region returns.
//!
//! Policies either redirect the coordinate back inside the region (clamp,
//! loop) or substitute a constant pixel. Samplers consult the policy for
//! every tap, so resampling loops never special-case out-of-range reads.

use crate::basics::Rectangle;
use crate::color::Rgba;

/// Boundary handling for reads outside the abyss rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbyssPolicy {
    /// Transparent black outside.
    #[default]
    None,
    /// Replicate the nearest edge pixel.
    Clamp,
    /// Tile the region.
    Loop,
    /// Opaque black outside.
    Black,
    /// Opaque white outside.
    White,
    /// Taps clamp like [`AbyssPolicy::Clamp`], but a sample point that is
    /// itself outside the region reads transparent. Gives crisp image
    /// borders without a faded one-pixel fringe.
    HardEdge,
}

/// Result of resolving a coordinate against an abyss rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbyssRead {
    Pixel(i32, i32),
    Constant(Rgba),
}

impl AbyssPolicy {
    /// Map `(x, y)` to a pixel inside `rect`, or a constant. An empty
    /// `rect` has nothing to redirect to, so it always yields transparent.
    #[inline]
    pub fn resolve(self, x: i32, y: i32, rect: &Rectangle) -> AbyssRead {
        if rect.contains_point(x, y) {
            return AbyssRead::Pixel(x, y);
        }
        if rect.is_empty() {
            return AbyssRead::Constant(Rgba::TRANSPARENT);
        }
        match self {
            AbyssPolicy::None => AbyssRead::Constant(Rgba::TRANSPARENT),
            AbyssPolicy::Black => AbyssRead::Constant(Rgba::BLACK),
            AbyssPolicy::White => AbyssRead::Constant(Rgba::WHITE),
            AbyssPolicy::Clamp | AbyssPolicy::HardEdge => AbyssRead::Pixel(
                x.clamp(rect.x, rect.x2() - 1),
                y.clamp(rect.y, rect.y2() - 1),
            ),
            AbyssPolicy::Loop => AbyssRead::Pixel(
                rect.x + (x - rect.x).rem_euclid(rect.width),
                rect.y + (y - rect.y).rem_euclid(rect.height),
            ),
        }
    }

    /// Whether a sample centered at absolute position `(u, v)` produces
    /// anything at all under this policy.
    #[inline]
    pub fn covers_sample(self, u: f64, v: f64, rect: &Rectangle) -> bool {
        match self {
            AbyssPolicy::HardEdge => {
                u >= rect.x as f64 && u < rect.x2() as f64 && v >= rect.y as f64 && v < rect.y2() as f64
            }
            _ => true,
        }
    }
}
