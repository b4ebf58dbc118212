//! Span interpolators for the resampling loops.
//!
//! Both walk one destination row and produce the source position of every
//! destination pixel center. [`AffineSpan`] steps by the constant columns
//! of the inverse matrix; [`PerspectiveSpan`] steps the homogeneous
//! numerators and divides per pixel.

use crate::matrix::{Matrix2, Matrix3, MATRIX_EPSILON};

/// Source position for one destination pixel of a span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanSample {
    /// Column offset from the start of the destination row.
    pub offset: usize,
    pub u: f64,
    pub v: f64,
}

// ============================================================================
// AffineSpan
// ============================================================================

/// Affine span interpolator.
///
/// Evaluates the inverse matrix once at the first visited pixel and then
/// adds the jacobian column per step. When the source would be read right
/// to left the destination row is walked from its end instead, so source
/// reads always move forward.
#[derive(Debug, Clone)]
pub struct AffineSpan {
    u: f64,
    v: f64,
    du: f64,
    dv: f64,
    offset: usize,
    remaining: usize,
    backward: bool,
}

impl AffineSpan {
    /// Span over `len` pixels starting at destination pixel `(x, y)`.
    pub fn new(inverse: &Matrix3, x: i32, y: i32, len: usize) -> Self {
        let backward = Self::runs_backward(inverse);
        let (first, offset) = if backward && len > 0 {
            (x + len as i32 - 1, len - 1)
        } else {
            (x, 0)
        };
        let mut u = first as f64 + 0.5;
        let mut v = y as f64 + 0.5;
        inverse.transform_point(&mut u, &mut v);
        let sign = if backward { -1.0 } else { 1.0 };
        Self {
            u,
            v,
            du: sign * inverse.coeff[0][0],
            dv: sign * inverse.coeff[1][0],
            offset,
            remaining: len,
            backward,
        }
    }

    /// True when a step to the right moves the source position left.
    pub fn runs_backward(inverse: &Matrix3) -> bool {
        inverse.coeff[0][0] < 0.0
    }

    /// True when a step down moves the source position up, so rows should
    /// be visited bottom to top.
    pub fn rows_backward(inverse: &Matrix3) -> bool {
        inverse.coeff[1][1] < 0.0
    }

    /// Constant jacobian of the span: source step per destination step.
    pub fn jacobian(inverse: &Matrix3) -> Matrix2 {
        inverse.linear_part()
    }
}

impl Iterator for AffineSpan {
    type Item = SpanSample;

    #[inline]
    fn next(&mut self) -> Option<SpanSample> {
        if self.remaining == 0 {
            return None;
        }
        let s = SpanSample {
            offset: self.offset,
            u: self.u,
            v: self.v,
        };
        self.remaining -= 1;
        if self.remaining > 0 {
            self.u += self.du;
            self.v += self.dv;
            if self.backward {
                self.offset -= 1;
            } else {
                self.offset += 1;
            }
        }
        Some(s)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for AffineSpan {}

// ============================================================================
// PerspectiveSpan
// ============================================================================

/// Projective span interpolator.
///
/// Steps the homogeneous coordinates `(U, V, W)` linearly along the row and
/// divides per pixel. Pixels where `W` is not positive lie beyond the
/// horizon and are reported as `None`, so the caller orients the inverse
/// so that the visible side has positive `W`.
#[derive(Debug, Clone)]
pub struct PerspectiveSpan {
    inverse: Matrix3,
    uh: f64,
    vh: f64,
    wh: f64,
    offset: usize,
    len: usize,
}

impl PerspectiveSpan {
    pub fn new(inverse: &Matrix3, x: i32, y: i32, len: usize) -> Self {
        let c = &inverse.coeff;
        let px = x as f64 + 0.5;
        let py = y as f64 + 0.5;
        Self {
            inverse: *inverse,
            uh: c[0][0] * px + c[0][1] * py + c[0][2],
            vh: c[1][0] * px + c[1][1] * py + c[1][2],
            wh: c[2][0] * px + c[2][1] * py + c[2][2],
            offset: 0,
            len,
        }
    }
}

impl Iterator for PerspectiveSpan {
    type Item = (usize, Option<(f64, f64, Matrix2)>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.len {
            return None;
        }
        let offset = self.offset;
        let sample = project(&self.inverse, self.uh, self.vh, self.wh);
        let c = &self.inverse.coeff;
        self.uh += c[0][0];
        self.vh += c[1][0];
        self.wh += c[2][0];
        self.offset += 1;
        Some((offset, sample))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len - self.offset;
        (n, Some(n))
    }
}

impl ExactSizeIterator for PerspectiveSpan {}

/// Divide homogeneous `(uh, vh, wh)` and compute the jacobian of the
/// projective map at that point.
#[inline]
fn project(inverse: &Matrix3, uh: f64, vh: f64, wh: f64) -> Option<(f64, f64, Matrix2)> {
    if wh <= MATRIX_EPSILON {
        return None;
    }
    let w_inv = 1.0 / wh;
    let u = uh * w_inv;
    let v = vh * w_inv;
    let c = &inverse.coeff;
    let jacobian = Matrix2::new([
        [
            (c[0][0] - u * c[2][0]) * w_inv,
            (c[0][1] - u * c[2][1]) * w_inv,
        ],
        [
            (c[1][0] - v * c[2][0]) * w_inv,
            (c[1][1] - v * c[2][1]) * w_inv,
        ],
    ]);
    Some((u, v, jacobian))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_affine_span_forward() {
        let inv = Matrix3::new_scaling(0.5, 0.5);
        let samples: Vec<_> = AffineSpan::new(&inv, 2, 1, 3).collect();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], SpanSample { offset: 0, u: 1.25, v: 0.75 });
        assert_eq!(samples[2], SpanSample { offset: 2, u: 2.25, v: 0.75 });
    }

    #[test]
    fn test_affine_span_backward() {
        let inv = Matrix3::new_affine(-1.0, 0.0, 10.0, 0.0, 1.0, 0.0);
        assert!(AffineSpan::runs_backward(&inv));
        let samples: Vec<_> = AffineSpan::new(&inv, 0, 0, 4).collect();
        let offsets: Vec<_> = samples.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![3, 2, 1, 0]);
        // Source reads move forward.
        assert!(samples.windows(2).all(|w| w[1].u > w[0].u));
        for s in &samples {
            assert!((s.u - (10.0 - (s.offset as f64 + 0.5))).abs() < EPS);
        }
    }

    #[test]
    fn test_affine_span_matches_direct_transform() {
        let inv = Matrix3::new_affine(0.8, 0.3, 1.5, -0.2, 1.1, -4.0);
        for s in AffineSpan::new(&inv, -3, 7, 20) {
            let mut u = -3.0 + s.offset as f64 + 0.5;
            let mut v = 7.5;
            inv.transform_point(&mut u, &mut v);
            assert!((s.u - u).abs() < EPS);
            assert!((s.v - v).abs() < EPS);
        }
    }

    #[test]
    fn test_affine_span_empty() {
        let inv = Matrix3::new_affine(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        assert_eq!(AffineSpan::new(&inv, 0, 0, 0).count(), 0);
    }

    #[test]
    fn test_perspective_span_matches_direct_transform() {
        let inv = Matrix3::new([[1.0, 0.2, 3.0], [0.1, 0.9, -1.0], [0.001, 0.002, 1.0]]);
        for (offset, s) in PerspectiveSpan::new(&inv, 4, 5, 10) {
            let (u, v, _) = s.unwrap();
            let mut eu = 4.0 + offset as f64 + 0.5;
            let mut ev = 5.5;
            inv.transform_point(&mut eu, &mut ev);
            assert!((u - eu).abs() < 1e-9);
            assert!((v - ev).abs() < 1e-9);
        }
    }

    #[test]
    fn test_perspective_jacobian_matches_finite_difference() {
        let inv = Matrix3::new([[1.0, 0.2, 3.0], [0.1, 0.9, -1.0], [0.01, 0.02, 1.0]]);
        let (x, y) = (6.5, 2.5);
        let c = &inv.coeff;
        let uh = c[0][0] * x + c[0][1] * y + c[0][2];
        let vh = c[1][0] * x + c[1][1] * y + c[1][2];
        let wh = c[2][0] * x + c[2][1] * y + c[2][2];
        let (u, v, j) = project(&inv, uh, vh, wh).unwrap();

        let h = 1e-6;
        let (mut ux, mut vx) = (x + h, y);
        inv.transform_point(&mut ux, &mut vx);
        let (mut uy, mut vy) = (x, y + h);
        inv.transform_point(&mut uy, &mut vy);
        assert!(((ux - u) / h - j.coeff[0][0]).abs() < 1e-5);
        assert!(((vx - v) / h - j.coeff[1][0]).abs() < 1e-5);
        assert!(((uy - u) / h - j.coeff[0][1]).abs() < 1e-5);
        assert!(((vy - v) / h - j.coeff[1][1]).abs() < 1e-5);
    }

    #[test]
    fn test_perspective_horizon() {
        let inv = Matrix3::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-0.5, 0.0, 1.0]]);
        let samples: Vec<_> = PerspectiveSpan::new(&inv, 0, 0, 4).collect();
        assert!(samples[0].1.is_some());
        // w = 1 - 0.5 * 2.5 < 0
        assert!(samples[2].1.is_none());
        assert!(samples[3].1.is_none());
    }
}
