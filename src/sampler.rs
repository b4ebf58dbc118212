//! Samplers: read one interpolated pixel at a fractional source position.
//!
//! Positions are absolute: pixel `i` covers `[i, i+1)` and has its center
//! at `i + 0.5`. A sampler's context rectangle lists the source pixels it
//! may read, relative to the pixel `floor(u), floor(v)` that contains the
//! sample point. Region propagation relies on that rectangle to fetch
//! exactly enough input.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::abyss::AbyssPolicy;
use crate::basics::{ifloor, Rectangle};
use crate::color::Rgba;
use crate::image_filters::{
    ImageFilterBilinear, ImageFilterCatrom, ImageFilterFunction, ImageFilterMitchell, LanczosLut,
    LutCache,
};
use crate::matrix::Matrix2;
use crate::pixel_buffer::PixelBuffer;

/// Widest supported Lanczos kernel, in lobes.
pub const LANCZOS_MAX_WIDTH: u32 = 6;
/// Largest minification factor the Lanczos kernel is stretched for.
pub const LANCZOS_MAX_SCALE: u32 = 4;
/// Largest minification factor the generic sampler widens its kernel for.
pub const GENERIC_MAX_SCALE: f64 = 2.0;

const MAX_TAPS: usize = (2 * LANCZOS_MAX_WIDTH * LANCZOS_MAX_SCALE + 1) as usize;

// ============================================================================
// Filter selector
// ============================================================================

/// Resampling filter selected on a transform node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
    Cubic,
    Lanczos,
    Generic,
}

impl Filter {
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Nearest => "nearest",
            Filter::Linear => "linear",
            Filter::Cubic => "cubic",
            Filter::Lanczos => "lanczos",
            Filter::Generic => "generic",
        }
    }

    /// Case-insensitive lookup, accepting the common aliases.
    pub fn from_name(name: &str) -> Option<Filter> {
        match name.trim().to_ascii_lowercase().as_str() {
            "nearest" | "none" => Some(Filter::Nearest),
            "linear" | "bilinear" => Some(Filter::Linear),
            "cubic" | "bicubic" => Some(Filter::Cubic),
            "lanczos" => Some(Filter::Lanczos),
            "generic" => Some(Filter::Generic),
            _ => None,
        }
    }

    /// Unknown names fall back to nearest.
    pub fn from_name_lenient(name: &str) -> Filter {
        Self::from_name(name).unwrap_or_else(|| {
            tracing::warn!(name, "unknown filter name, using nearest");
            Filter::Nearest
        })
    }
}

impl From<String> for Filter {
    fn from(name: String) -> Self {
        Filter::from_name_lenient(&name)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to build a sampler or to know its context without
/// building it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerSpec {
    pub filter: Filter,
    pub lanczos_width: u32,
    /// Kernel stretch for minification; 1 means none.
    pub lanczos_scale: u32,
}

impl SamplerSpec {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            lanczos_width: 3,
            lanczos_scale: 1,
        }
    }

    fn lanczos_radius(&self) -> i32 {
        (self.lanczos_width.clamp(1, LANCZOS_MAX_WIDTH)
            * self.lanczos_scale.clamp(1, LANCZOS_MAX_SCALE)) as i32
    }

    /// Source pixels read around the containing pixel of a sample.
    pub fn context_rect(&self) -> Rectangle {
        match self.filter {
            Filter::Nearest => Rectangle::new(0, 0, 1, 1),
            Filter::Linear => Rectangle::new(-1, -1, 3, 3),
            Filter::Cubic => Rectangle::new(-2, -2, 5, 5),
            Filter::Lanczos => {
                let r = self.lanczos_radius();
                Rectangle::new(-r, -r, 2 * r + 1, 2 * r + 1)
            }
            Filter::Generic => {
                let r = (2.0 * GENERIC_MAX_SCALE) as i32;
                Rectangle::new(-r, -r, 2 * r + 1, 2 * r + 1)
            }
        }
    }

    /// Build the sampler. Lanczos tables come from `luts`, so this must
    /// run before any worker starts sampling.
    pub fn build(&self, luts: &LutCache) -> Box<dyn Sampler> {
        match self.filter {
            Filter::Nearest => Box::new(NearestSampler),
            Filter::Linear => Box::new(LinearSampler),
            Filter::Cubic => Box::new(CubicSampler),
            Filter::Lanczos => {
                let width = self.lanczos_width.clamp(1, LANCZOS_MAX_WIDTH);
                let scale = self.lanczos_scale.clamp(1, LANCZOS_MAX_SCALE);
                Box::new(LanczosSampler::new(luts.lanczos(width, scale)))
            }
            Filter::Generic => Box::new(GenericSampler::default()),
        }
    }
}

// ============================================================================
// Sampler trait
// ============================================================================

pub trait Sampler: Send + Sync {
    /// Source pixels read relative to the pixel containing the sample.
    fn context_rect(&self) -> Rectangle;

    /// Kernel evaluation; abyss handling is left to `src.fetch`.
    fn sample_kernel(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba;

    /// True when sampling exactly at a pixel center returns that pixel
    /// unchanged.
    fn is_interpolating(&self) -> bool {
        true
    }

    /// Interpolated pixel at absolute source position `(u, v)`.
    /// `jacobian` is the local inverse jacobian (source step per
    /// destination step).
    #[inline]
    fn sample(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba {
        if !abyss.covers_sample(u, v, &src.abyss_rect()) {
            return Rgba::TRANSPARENT;
        }
        self.sample_kernel(src, u, v, jacobian, abyss)
    }
}

/// Separable convolution over `xs` × `ys` taps starting at `(x0, y0)`.
fn convolve(
    src: &PixelBuffer,
    x0: i32,
    y0: i32,
    wx: &[f64],
    wy: &[f64],
    abyss: AbyssPolicy,
) -> Rgba {
    let mut acc = Rgba::TRANSPARENT;
    let mut total = 0.0;
    for (j, &ky) in wy.iter().enumerate() {
        if ky == 0.0 {
            continue;
        }
        for (i, &kx) in wx.iter().enumerate() {
            let k = kx * ky;
            if k == 0.0 {
                continue;
            }
            acc += src.fetch(x0 + i as i32, y0 + j as i32, abyss) * k as f32;
            total += k;
        }
    }
    if total != 0.0 && total != 1.0 {
        acc *= (1.0 / total) as f32;
    }
    acc
}

/// Base tap and fractional offset for kernels centered between pixels.
#[inline]
fn base_and_fraction(u: f64) -> (i32, f64) {
    let t = u - 0.5;
    let b = ifloor(t);
    (b, t - b as f64)
}

// ============================================================================
// Nearest
// ============================================================================

pub struct NearestSampler;

impl Sampler for NearestSampler {
    fn context_rect(&self) -> Rectangle {
        SamplerSpec::new(Filter::Nearest).context_rect()
    }

    #[inline]
    fn sample_kernel(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        _jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba {
        src.fetch(ifloor(u), ifloor(v), abyss)
    }
}

// ============================================================================
// Linear
// ============================================================================

pub struct LinearSampler;

impl Sampler for LinearSampler {
    fn context_rect(&self) -> Rectangle {
        SamplerSpec::new(Filter::Linear).context_rect()
    }

    fn sample_kernel(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        _jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba {
        let f = ImageFilterBilinear;
        let (bx, fx) = base_and_fraction(u);
        let (by, fy) = base_and_fraction(v);
        let wx = [f.calc_weight(fx), f.calc_weight(1.0 - fx)];
        let wy = [f.calc_weight(fy), f.calc_weight(1.0 - fy)];
        convolve(src, bx, by, &wx, &wy, abyss)
    }
}

// ============================================================================
// Cubic (Catmull-Rom)
// ============================================================================

pub struct CubicSampler;

impl CubicSampler {
    fn weights(frac: f64) -> [f64; 4] {
        let f = ImageFilterCatrom;
        [
            f.calc_weight(frac + 1.0),
            f.calc_weight(frac),
            f.calc_weight(1.0 - frac),
            f.calc_weight(2.0 - frac),
        ]
    }
}

impl Sampler for CubicSampler {
    fn context_rect(&self) -> Rectangle {
        SamplerSpec::new(Filter::Cubic).context_rect()
    }

    fn sample_kernel(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        _jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba {
        let (bx, fx) = base_and_fraction(u);
        let (by, fy) = base_and_fraction(v);
        convolve(
            src,
            bx - 1,
            by - 1,
            &Self::weights(fx),
            &Self::weights(fy),
            abyss,
        )
    }
}

// ============================================================================
// Lanczos
// ============================================================================

/// Windowed-sinc sampler reading `2r + 1` taps per axis around the
/// containing pixel, where `r = width * scale`.
pub struct LanczosSampler {
    lut: Arc<LanczosLut>,
    radius: i32,
}

impl LanczosSampler {
    pub fn new(lut: Arc<LanczosLut>) -> Self {
        let radius = (lut.width() * lut.scale()) as i32;
        Self { lut, radius }
    }

    /// Fill `out` with weights for taps `n - r ..= n + r` and return the
    /// used slice length.
    fn weights(&self, u: f64, n: i32, out: &mut [f64; MAX_TAPS]) -> usize {
        let taps = (2 * self.radius + 1) as usize;
        let inv_scale = 1.0 / self.lut.scale() as f64;
        for (i, w) in out.iter_mut().take(taps).enumerate() {
            let center = (n - self.radius + i as i32) as f64 + 0.5;
            *w = self.lut.weight((u - center) * inv_scale);
        }
        taps
    }
}

impl Sampler for LanczosSampler {
    fn context_rect(&self) -> Rectangle {
        let r = self.radius;
        Rectangle::new(-r, -r, 2 * r + 1, 2 * r + 1)
    }

    fn sample_kernel(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        _jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba {
        let nx = ifloor(u);
        let ny = ifloor(v);
        let mut wx = [0.0; MAX_TAPS];
        let mut wy = [0.0; MAX_TAPS];
        let tx = self.weights(u, nx, &mut wx);
        let ty = self.weights(v, ny, &mut wy);
        convolve(
            src,
            nx - self.radius,
            ny - self.radius,
            &wx[..tx],
            &wy[..ty],
            abyss,
        )
    }
}

// ============================================================================
// Generic (jacobian-aware Mitchell-Netravali)
// ============================================================================

/// Mitchell-Netravali kernel widened by the local minification factor.
/// Smooths instead of aliasing when the transform shrinks the image.
#[derive(Default)]
pub struct GenericSampler {
    filter: ImageFilterMitchell,
}

impl GenericSampler {
    /// Weights for taps starting at `first` along one axis.
    fn weights(&self, u: f64, scale: f64, out: &mut [f64; MAX_TAPS]) -> (i32, usize) {
        let support = self.filter.radius() * scale;
        let first = ifloor(u - 0.5 - support) + 1;
        let last = ifloor(u - 0.5 + support);
        let taps = ((last - first + 1).max(0) as usize).min(MAX_TAPS);
        for (i, w) in out.iter_mut().take(taps).enumerate() {
            let center = (first + i as i32) as f64 + 0.5;
            *w = self.filter.calc_weight((u - center).abs() / scale);
        }
        (first, taps)
    }
}

impl Sampler for GenericSampler {
    fn context_rect(&self) -> Rectangle {
        SamplerSpec::new(Filter::Generic).context_rect()
    }

    fn is_interpolating(&self) -> bool {
        false
    }

    fn sample_kernel(
        &self,
        src: &PixelBuffer,
        u: f64,
        v: f64,
        jacobian: &Matrix2,
        abyss: AbyssPolicy,
    ) -> Rgba {
        let j = &jacobian.coeff;
        let sx = (j[0][0].abs() + j[0][1].abs()).clamp(1.0, GENERIC_MAX_SCALE);
        let sy = (j[1][0].abs() + j[1][1].abs()).clamp(1.0, GENERIC_MAX_SCALE);
        let mut wx = [0.0; MAX_TAPS];
        let mut wy = [0.0; MAX_TAPS];
        let (x0, tx) = self.weights(u, sx, &mut wx);
        let (y0, ty) = self.weights(v, sy, &mut wy);
        convolve(src, x0, y0, &wx[..tx], &wy[..ty], abyss)
    }
}
