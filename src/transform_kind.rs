//! Geometric operations a transform node can perform.
//!
//! Each variant carries its own parameters and produces the node's own
//! matrix from them and the upstream bounding box. Pivoting about the node
//! origin and folding in upstream transforms happen later, in
//! [`crate::chain`].

use serde::{Deserialize, Serialize};

use crate::basics::{deg2rad, Rectangle};
use crate::matrix::Matrix3;
use crate::transform_parse::parse_transform;

/// Operation of a transform node with its parameters. Serialized with an
/// `"op"` tag, e.g. `{"op": "rotate", "degrees": 30}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum TransformKind {
    Translate {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Scale {
        #[serde(default = "one")]
        x: f64,
        #[serde(default = "one")]
        y: f64,
    },
    /// Scale to an absolute output size in pixels.
    ScaleToSize {
        #[serde(default = "hundred")]
        x: f64,
        #[serde(default = "hundred")]
        y: f64,
    },
    /// Uniform scale to fit inside `x` × `y`; a non-positive side is
    /// unconstrained.
    ScaleToSizeKeepAspect {
        #[serde(default = "hundred")]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Rotate {
        #[serde(default)]
        degrees: f64,
    },
    /// Rotate about the center of the input, keeping the rotated bounding
    /// box anchored at the input origin.
    RotateOnCenter {
        #[serde(default)]
        degrees: f64,
    },
    Shear {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    /// Free-form transform string, see [`crate::transform_parse`].
    Matrix {
        #[serde(default)]
        transform: String,
    },
}

fn one() -> f64 {
    1.0
}

fn hundred() -> f64 {
    100.0
}

impl Default for TransformKind {
    fn default() -> Self {
        TransformKind::Matrix {
            transform: String::new(),
        }
    }
}

/// Upstream size with zero-area inputs replaced by 1.
fn nonzero_size(bbox: &Rectangle) -> (f64, f64) {
    (bbox.width.max(1) as f64, bbox.height.max(1) as f64)
}

impl TransformKind {
    /// Operation name as used in serialized configurations.
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Translate { .. } => "translate",
            TransformKind::Scale { .. } => "scale",
            TransformKind::ScaleToSize { .. } => "scale-to-size",
            TransformKind::ScaleToSizeKeepAspect { .. } => "scale-to-size-keep-aspect",
            TransformKind::Rotate { .. } => "rotate",
            TransformKind::RotateOnCenter { .. } => "rotate-on-center",
            TransformKind::Shear { .. } => "shear",
            TransformKind::Matrix { .. } => "matrix",
        }
    }

    /// The node's own matrix, before pivoting and chaining.
    pub fn create_matrix(&self, upstream_bbox: &Rectangle) -> Matrix3 {
        match self {
            TransformKind::Translate { x, y } => Matrix3::new_translation(*x, *y),
            TransformKind::Scale { x, y } => Matrix3::new_scaling(*x, *y),
            TransformKind::ScaleToSize { x, y } => {
                let (w, h) = nonzero_size(upstream_bbox);
                Matrix3::new_scaling(x / w, y / h)
            }
            TransformKind::ScaleToSizeKeepAspect { x, y } => {
                let (w, h) = nonzero_size(upstream_bbox);
                let s = match (*x > 0.0, *y > 0.0) {
                    (false, false) => 1.0,
                    (false, true) => y / h,
                    (true, false) => x / w,
                    (true, true) => (x / w).min(y / h),
                };
                Matrix3::new_scaling(s, s)
            }
            TransformKind::Rotate { degrees } => Matrix3::new_rotation(deg2rad(*degrees)),
            TransformKind::RotateOnCenter { degrees } => {
                rotate_on_center(deg2rad(*degrees), upstream_bbox)
            }
            TransformKind::Shear { x, y } => Matrix3::new_shearing(*x, *y),
            TransformKind::Matrix { transform } => parse_transform(transform),
        }
    }
}

fn rotate_on_center(rad: f64, bbox: &Rectangle) -> Matrix3 {
    let (w, h) = nonzero_size(bbox);
    let cx = bbox.x as f64 + w / 2.0;
    let cy = bbox.y as f64 + h / 2.0;
    let mut m = Matrix3::new_rotation(rad);
    m.originate(cx, cy);

    let mut corners = Rectangle::new(bbox.x, bbox.y, w as i32, h as i32).corner_points();
    m.transform_points(&mut corners);
    let min_x = corners.iter().step_by(2).copied().fold(f64::INFINITY, f64::min);
    let min_y = corners.iter().skip(1).step_by(2).copied().fold(f64::INFINITY, f64::min);
    m.coeff[0][2] += bbox.x as f64 - min_x;
    m.coeff[1][2] += bbox.y as f64 - min_y;
    m
}
