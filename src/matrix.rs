//! 3×3 projective matrices and the 2×2 jacobian used by samplers.
//!
//! Coefficients are stored row-major as `coeff[row][col]` and act on column
//! vectors `(x, y, 1)`. Row 2 is `[0, 0, 1]` for affine maps; anything else
//! is a perspective map that needs a homogeneous divide.

use crate::basics::{is_equal_eps, is_integral_eps};
use crate::error::{TransformError, TransformResult};

/// Tolerance for every classification predicate and the invertibility check.
pub const MATRIX_EPSILON: f64 = 1e-7;

// ============================================================================
// Matrix3
// ============================================================================

/// Projective 2D transformation.
///
/// ```text
/// | c00 c01 c02 |   | x |
/// | c10 c11 c12 | · | y |
/// | c20 c21 c22 |   | 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub coeff: [[f64; 3]; 3],
}

impl Matrix3 {
    pub const IDENTITY: Matrix3 = Matrix3 {
        coeff: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Identity matrix.
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn new(coeff: [[f64; 3]; 3]) -> Self {
        Self { coeff }
    }

    /// Affine matrix from the two top rows, row-major.
    pub fn new_affine(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self::new([[a, b, c], [d, e, f], [0.0, 0.0, 1.0]])
    }

    pub fn new_translation(x: f64, y: f64) -> Self {
        Self::new_affine(1.0, 0.0, x, 0.0, 1.0, y)
    }

    pub fn new_scaling(x: f64, y: f64) -> Self {
        Self::new_affine(x, 0.0, 0.0, 0.0, y, 0.0)
    }

    /// Rotation by `rad` radians, clockwise on screen where y points down.
    pub fn new_rotation(rad: f64) -> Self {
        let (s, c) = rad.sin_cos();
        Self::new_affine(c, s, 0.0, -s, c, 0.0)
    }

    pub fn new_shearing(x: f64, y: f64) -> Self {
        Self::new_affine(1.0, x, 0.0, y, 1.0, 0.0)
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.coeff;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// False when the determinant is within epsilon of zero.
    pub fn is_invertible(&self) -> bool {
        self.determinant().abs() > MATRIX_EPSILON
    }

    /// Inverse matrix. Near-singular matrices are rejected up front
    /// instead of producing infinities.
    pub fn inverse(&self) -> TransformResult<Matrix3> {
        let det = self.determinant();
        if det.abs() <= MATRIX_EPSILON {
            return Err(TransformError::NonInvertible { determinant: det });
        }
        let m = &self.coeff;
        let d = 1.0 / det;
        Ok(Self::new([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * d,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * d,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * d,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * d,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * d,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * d,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * d,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * d,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * d,
            ],
        ]))
    }

    /// Rewrite the matrix so that `(x, y)` stays fixed:
    /// `T(x, y) · self · T(-x, -y)`.
    pub fn originate(&mut self, x: f64, y: f64) -> &mut Self {
        if x != 0.0 || y != 0.0 {
            *self = multiply(
                &Self::new_translation(x, y),
                &multiply(self, &Self::new_translation(-x, -y)),
            );
        }
        self
    }

    /// Map a point, dividing by the homogeneous coordinate.
    #[inline]
    pub fn transform_point(&self, x: &mut f64, y: &mut f64) {
        let m = &self.coeff;
        let x0 = *x;
        let y0 = *y;
        let w = m[2][0] * x0 + m[2][1] * y0 + m[2][2];
        *x = (m[0][0] * x0 + m[0][1] * y0 + m[0][2]) / w;
        *y = (m[1][0] * x0 + m[1][1] * y0 + m[1][2]) / w;
    }

    /// Map four packed points `[x0, y0, .., x3, y3]` in place.
    pub fn transform_points(&self, points: &mut [f64; 8]) {
        for p in points.chunks_exact_mut(2) {
            let (px, py) = p.split_at_mut(1);
            self.transform_point(&mut px[0], &mut py[0]);
        }
    }

    /// Translation column.
    #[inline]
    pub fn translation(&self) -> (f64, f64) {
        (self.coeff[0][2], self.coeff[1][2])
    }

    /// Upper-left 2×2 block.
    pub fn linear_part(&self) -> Matrix2 {
        Matrix2::new([
            [self.coeff[0][0], self.coeff[0][1]],
            [self.coeff[1][0], self.coeff[1][1]],
        ])
    }

    /// Length of the images of the unit x and y vectors.
    pub fn scaling_abs(&self) -> (f64, f64) {
        self.linear_part().scaling_abs()
    }

    pub fn is_equal_eps(&self, other: &Matrix3, epsilon: f64) -> bool {
        self.coeff
            .iter()
            .flatten()
            .zip(other.coeff.iter().flatten())
            .all(|(a, b)| is_equal_eps(*a, *b, epsilon))
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    pub fn is_identity(&self) -> bool {
        self.is_equal_eps(&Self::IDENTITY, MATRIX_EPSILON)
    }

    /// Bottom row is `[0, 0, 1]`.
    pub fn is_affine(&self) -> bool {
        let m = &self.coeff;
        is_equal_eps(m[2][0], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[2][1], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[2][2], 1.0, MATRIX_EPSILON)
    }

    /// Pure axis-aligned scale: diagonal linear part, no translation.
    pub fn is_scale(&self) -> bool {
        let m = &self.coeff;
        self.is_affine()
            && is_equal_eps(m[0][1], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[1][0], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[0][2], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[1][2], 0.0, MATRIX_EPSILON)
    }

    /// Pure translation: identity linear part.
    pub fn is_translate(&self) -> bool {
        let m = &self.coeff;
        self.is_affine()
            && is_equal_eps(m[0][0], 1.0, MATRIX_EPSILON)
            && is_equal_eps(m[0][1], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[1][0], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[1][1], 1.0, MATRIX_EPSILON)
    }

    /// Pure translation by whole pixels.
    pub fn is_integer_translate(&self) -> bool {
        let (tx, ty) = self.translation();
        self.is_translate()
            && is_integral_eps(tx, MATRIX_EPSILON)
            && is_integral_eps(ty, MATRIX_EPSILON)
    }

    /// Mirror and/or whole-pixel shift: linear part `diag(±1, ±1)` with
    /// an integral translation.
    pub fn is_axis_flip(&self) -> bool {
        let m = &self.coeff;
        let (tx, ty) = self.translation();
        self.is_affine()
            && is_equal_eps(m[0][0].abs(), 1.0, MATRIX_EPSILON)
            && is_equal_eps(m[1][1].abs(), 1.0, MATRIX_EPSILON)
            && is_equal_eps(m[0][1], 0.0, MATRIX_EPSILON)
            && is_equal_eps(m[1][0], 0.0, MATRIX_EPSILON)
            && is_integral_eps(tx, MATRIX_EPSILON)
            && is_integral_eps(ty, MATRIX_EPSILON)
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `left ∘ right`: the result applies `right` first.
pub fn multiply(left: &Matrix3, right: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| left.coeff[i][k] * right.coeff[k][j]).sum();
        }
    }
    Matrix3::new(out)
}

impl std::ops::Mul for Matrix3 {
    type Output = Matrix3;
    fn mul(self, rhs: Matrix3) -> Matrix3 {
        multiply(&self, &rhs)
    }
}

/// Formats as a transform string the parser reads back: six values for
/// affine matrices, nine otherwise.
impl std::fmt::Display for Matrix3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.coeff;
        write!(
            f,
            "matrix({},{},{},{},{},{}",
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2]
        )?;
        if !self.is_affine() {
            write!(f, ",{},{},{}", m[2][0], m[2][1], m[2][2])?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// Matrix2
// ============================================================================

/// 2×2 linear map; the local inverse jacobian handed to samplers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix2 {
    pub coeff: [[f64; 2]; 2],
}

impl Matrix2 {
    pub const IDENTITY: Matrix2 = Matrix2 {
        coeff: [[1.0, 0.0], [0.0, 1.0]],
    };

    pub fn new(coeff: [[f64; 2]; 2]) -> Self {
        Self { coeff }
    }

    pub fn determinant(&self) -> f64 {
        self.coeff[0][0] * self.coeff[1][1] - self.coeff[0][1] * self.coeff[1][0]
    }

    /// Column norms: how far one destination step moves in source space
    /// along x and along y.
    pub fn scaling_abs(&self) -> (f64, f64) {
        let m = &self.coeff;
        (m[0][0].hypot(m[1][0]), m[0][1].hypot(m[1][1]))
    }
}

impl Default for Matrix2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}
