//! Interpolation kernel shapes and the shared Lanczos lookup table.
//!
//! Kernel shapes are stateless weight functions. The Lanczos table is the
//! one precomputed resource in the sampling path: it is immutable once built
//! and shared through an explicitly owned [`LutCache`], one table per
//! `(width, scale)` key.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

// ============================================================================
// ImageFilterFunction trait
// ============================================================================

/// Filter shape: symmetric weight function with finite support.
pub trait ImageFilterFunction {
    /// The radius of the filter kernel.
    fn radius(&self) -> f64;
    /// Weight at distance `x >= 0` from the center.
    fn calc_weight(&self, x: f64) -> f64;
}

// ============================================================================
// Filter shape implementations
// ============================================================================

/// Bilinear filter: radius 1.0, linear interpolation.
pub struct ImageFilterBilinear;
impl ImageFilterFunction for ImageFilterBilinear {
    fn radius(&self) -> f64 {
        1.0
    }
    fn calc_weight(&self, x: f64) -> f64 {
        if x < 1.0 {
            1.0 - x
        } else {
            0.0
        }
    }
}

/// Catmull-Rom spline filter: radius 2.0. Interpolating: weights are
/// exactly `1, 0, 0` at integer distances.
pub struct ImageFilterCatrom;
impl ImageFilterFunction for ImageFilterCatrom {
    fn radius(&self) -> f64 {
        2.0
    }
    fn calc_weight(&self, x: f64) -> f64 {
        if x < 1.0 {
            return 0.5 * (2.0 + x * x * (-5.0 + x * 3.0));
        }
        if x < 2.0 {
            return 0.5 * (4.0 + x * (-8.0 + x * (5.0 - x)));
        }
        0.0
    }
}

/// Mitchell-Netravali filter: radius 2.0, parameterized by `b` and `c`.
///
/// Default: b = 1/3, c = 1/3 (recommended for general image scaling).
pub struct ImageFilterMitchell {
    p0: f64,
    p2: f64,
    p3: f64,
    q0: f64,
    q1: f64,
    q2: f64,
    q3: f64,
}
impl ImageFilterMitchell {
    pub fn new(b: f64, c: f64) -> Self {
        Self {
            p0: (6.0 - 2.0 * b) / 6.0,
            p2: (-18.0 + 12.0 * b + 6.0 * c) / 6.0,
            p3: (12.0 - 9.0 * b - 6.0 * c) / 6.0,
            q0: (8.0 * b + 24.0 * c) / 6.0,
            q1: (-12.0 * b - 48.0 * c) / 6.0,
            q2: (6.0 * b + 30.0 * c) / 6.0,
            q3: (-b - 6.0 * c) / 6.0,
        }
    }
}
impl Default for ImageFilterMitchell {
    fn default() -> Self {
        Self::new(1.0 / 3.0, 1.0 / 3.0)
    }
}
impl ImageFilterFunction for ImageFilterMitchell {
    fn radius(&self) -> f64 {
        2.0
    }
    fn calc_weight(&self, x: f64) -> f64 {
        if x < 1.0 {
            return self.p0 + x * x * (self.p2 + x * self.p3);
        }
        if x < 2.0 {
            return self.q0 + x * (self.q1 + x * (self.q2 + x * self.q3));
        }
        0.0
    }
}

/// Normalized sinc. Exactly zero at nonzero integers so that Lanczos
/// interpolation reproduces pixels bit for bit at integer offsets.
#[inline]
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-4 {
        return 1.0;
    }
    if x.fract() == 0.0 {
        return 0.0;
    }
    let px = PI * x;
    px.sin() / px
}

/// Lanczos windowed sinc with `radius` lobes.
pub struct ImageFilterLanczos {
    radius: f64,
}
impl ImageFilterLanczos {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}
impl ImageFilterFunction for ImageFilterLanczos {
    fn radius(&self) -> f64 {
        self.radius
    }
    fn calc_weight(&self, x: f64) -> f64 {
        if x.abs() < self.radius {
            sinc(x) * sinc(x / self.radius)
        } else {
            0.0
        }
    }
}

// ============================================================================
// LanczosLut
// ============================================================================

/// Table samples per kernel unit at scale 1, before multiplying by the
/// kernel diameter.
pub const LANCZOS_DENSITY: usize = 10_000;

/// Sampled Lanczos kernel over `[0, width + 1)` at `samples_per_unit`
/// entries per kernel unit.
#[derive(Debug)]
pub struct LanczosLut {
    width: u32,
    scale: u32,
    samples_per_unit: usize,
    table: Vec<f64>,
}

impl LanczosLut {
    /// Table density needed for a kernel of `width` lobes stretched by
    /// `scale`.
    pub fn samples_per_unit(width: u32, scale: u32) -> usize {
        (2 * width as usize + 1) * LANCZOS_DENSITY * scale.max(1) as usize
    }

    pub fn new(width: u32, scale: u32) -> Self {
        Self::with_density(width, scale, Self::samples_per_unit(width, scale))
    }

    pub fn with_density(width: u32, scale: u32, samples_per_unit: usize) -> Self {
        let filter = ImageFilterLanczos::new(width as f64);
        let len = samples_per_unit * (width as usize + 1);
        let table = (0..len)
            .map(|i| filter.calc_weight(i as f64 / samples_per_unit as f64))
            .collect();
        Self {
            width,
            scale: scale.max(1),
            samples_per_unit,
            table,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn density(&self) -> usize {
        self.samples_per_unit
    }

    pub fn table(&self) -> &[f64] {
        &self.table
    }

    /// Kernel weight at distance `t`, in kernel units.
    #[inline]
    pub fn weight(&self, t: f64) -> f64 {
        let idx = (t.abs() * self.samples_per_unit as f64 + 0.5) as usize;
        self.table.get(idx).copied().unwrap_or(0.0)
    }
}

// ============================================================================
// LutCache
// ============================================================================

/// Owner of every Lanczos table built so far. Each distinct
/// `(width, scale)` is computed once and handed out as a shared `Arc`.
#[derive(Debug, Default)]
pub struct LutCache {
    tables: Mutex<HashMap<(u32, u32), Arc<LanczosLut>>>,
}

impl LutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lanczos(&self, width: u32, scale: u32) -> Arc<LanczosLut> {
        let key = (width, scale.max(1));
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(width, scale = key.1, "building lanczos lookup table");
                Arc::new(LanczosLut::new(key.0, key.1))
            })
            .clone()
    }

    /// Number of distinct tables built.
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    #[test]
    fn test_bilinear_radius_and_weight() {
        let f = ImageFilterBilinear;
        assert_eq!(f.radius(), 1.0);
        assert_eq!(f.calc_weight(0.0), 1.0);
        assert_eq!(f.calc_weight(0.5), 0.5);
        assert_eq!(f.calc_weight(1.0), 0.0);
        assert_eq!(f.calc_weight(1.5), 0.0);
    }

    #[test]
    fn test_catrom_interpolates() {
        let f = ImageFilterCatrom;
        assert_eq!(f.calc_weight(0.0), 1.0);
        assert_eq!(f.calc_weight(1.0), 0.0);
        assert_eq!(f.calc_weight(2.0), 0.0);
        // Partition of unity at a half offset.
        let sum = 2.0 * (f.calc_weight(0.5) + f.calc_weight(1.5));
        assert!((sum - 1.0).abs() < EPS);
    }

    #[test]
    fn test_mitchell_partition_of_unity() {
        let f = ImageFilterMitchell::default();
        for frac in [0.0, 0.25, 0.5, 0.8] {
            let sum: f64 = (-1..=2)
                .map(|k| f.calc_weight((k as f64 - frac).abs()))
                .sum();
            assert!((sum - 1.0).abs() < 1e-9, "frac {frac}: {sum}");
        }
    }

    #[test]
    fn test_sinc() {
        assert_eq!(sinc(0.0), 1.0);
        assert_eq!(sinc(0.00005), 1.0);
        assert_eq!(sinc(1.0), 0.0);
        assert_eq!(sinc(-3.0), 0.0);
        assert!((sinc(0.5) - 2.0 / PI).abs() < EPS);
    }

    #[test]
    fn test_lanczos_support() {
        let f = ImageFilterLanczos::new(3.0);
        assert_eq!(f.calc_weight(0.0), 1.0);
        assert_eq!(f.calc_weight(3.0), 0.0);
        assert_eq!(f.calc_weight(4.5), 0.0);
        assert!(f.calc_weight(0.5) > 0.5);
        assert!(f.calc_weight(1.5) < 0.0);
    }

    #[test]
    fn test_lut_length_and_origin() {
        let spp = (2 * 3 + 1) * 10_000;
        let lut = LanczosLut::with_density(3, 1, spp);
        assert_eq!(lut.table().len(), spp * (3 + 1));
        assert_eq!(lut.table()[0], 1.0);
        assert_eq!(LanczosLut::samples_per_unit(3, 1), spp);
    }

    #[test]
    fn test_lut_lookup() {
        let lut = LanczosLut::new(3, 1);
        assert_eq!(lut.weight(0.0), 1.0);
        assert_eq!(lut.weight(1.0), 0.0);
        assert_eq!(lut.weight(-2.0), 0.0);
        assert_eq!(lut.weight(10.0), 0.0);
        let exact = ImageFilterLanczos::new(3.0).calc_weight(0.37);
        assert!((lut.weight(0.37) - exact).abs() < 1e-4);
        assert!((lut.weight(-0.37) - exact).abs() < 1e-4);
    }

    #[test]
    fn test_lut_density_grows_with_scale() {
        assert_eq!(
            LanczosLut::samples_per_unit(3, 2),
            2 * LanczosLut::samples_per_unit(3, 1)
        );
        assert_eq!(
            LanczosLut::samples_per_unit(3, 0),
            LanczosLut::samples_per_unit(3, 1)
        );
    }

    #[test]
    fn test_cache_builds_once_per_key() {
        let cache = LutCache::new();
        assert!(cache.is_empty());
        let a = cache.lanczos(3, 1);
        let b = cache.lanczos(3, 1);
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.lanczos(4, 1);
        assert!(!Arc::ptr_eq(&a, &c));
        let d = cache.lanczos(3, 2);
        assert_eq!(d.scale(), 2);
        assert_eq!(cache.len(), 3);
    }
}
