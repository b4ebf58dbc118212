//! Per-node transform state and its configuration surface.
//!
//! A [`TransformNode`] is a parameter snapshot: it is cloned freely, never
//! caches derived matrices, and is mutated only by the graph owner.

use serde::{Deserialize, Serialize};

use crate::abyss::AbyssPolicy;
use crate::basics::Rectangle;
use crate::error::{TransformError, TransformResult};
use crate::matrix::Matrix3;
use crate::sampler::{Filter, SamplerSpec, LANCZOS_MAX_SCALE, LANCZOS_MAX_WIDTH};
use crate::transform_kind::TransformKind;

pub const LANCZOS_MIN_WIDTH: u32 = 3;
pub const LANCZOS_DEFAULT_WIDTH: u32 = 3;

fn default_lanczos_width() -> u32 {
    LANCZOS_DEFAULT_WIDTH
}

/// Parameters of one transform node.
///
/// JSON form: the operation fields sit next to the shared options,
/// e.g. `{"op": "scale", "x": 2, "y": 2, "filter": "nearest"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransformNode {
    #[serde(flatten)]
    pub kind: TransformKind,
    #[serde(default)]
    pub filter: Filter,
    /// Replicate edge pixels for kernel taps instead of fading the border
    /// to transparent.
    #[serde(default)]
    pub hard_edges: bool,
    #[serde(default = "default_lanczos_width")]
    pub lanczos_width: u32,
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self::new(TransformKind::default())
    }
}

impl TransformNode {
    pub fn new(kind: TransformKind) -> Self {
        Self {
            kind,
            filter: Filter::default(),
            hard_edges: false,
            lanczos_width: LANCZOS_DEFAULT_WIDTH,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }

    pub fn with_hard_edges(mut self, hard_edges: bool) -> Self {
        self.hard_edges = hard_edges;
        self
    }

    pub fn with_lanczos_width(mut self, width: u32) -> Self {
        self.lanczos_width = width;
        self
    }

    /// Parse and validate a JSON node description.
    pub fn from_json(json: &str) -> TransformResult<Self> {
        let node: TransformNode = serde_json::from_str(json)?;
        node.validate()?;
        Ok(node)
    }

    pub fn to_json(&self) -> TransformResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject values outside their declared ranges.
    pub fn validate(&self) -> TransformResult<()> {
        if !(LANCZOS_MIN_WIDTH..=LANCZOS_MAX_WIDTH).contains(&self.lanczos_width) {
            return Err(TransformError::invalid_config(format!(
                "lanczos-width {} outside {}..={}",
                self.lanczos_width, LANCZOS_MIN_WIDTH, LANCZOS_MAX_WIDTH
            )));
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(TransformError::invalid_config("origin must be finite"));
        }
        let finite = match &self.kind {
            TransformKind::Translate { x, y }
            | TransformKind::Scale { x, y }
            | TransformKind::ScaleToSize { x, y }
            | TransformKind::ScaleToSizeKeepAspect { x, y }
            | TransformKind::Shear { x, y } => x.is_finite() && y.is_finite(),
            TransformKind::Rotate { degrees } | TransformKind::RotateOnCenter { degrees } => {
                degrees.is_finite()
            }
            TransformKind::Matrix { .. } => true,
        };
        if !finite {
            return Err(TransformError::invalid_config(format!(
                "{} parameters must be finite",
                self.kind.name()
            )));
        }
        Ok(())
    }

    /// Own matrix pivoted about the node origin.
    pub fn local_matrix(&self, upstream_bbox: &Rectangle) -> Matrix3 {
        let mut m = self.kind.create_matrix(upstream_bbox);
        m.originate(self.origin_x, self.origin_y);
        m
    }

    /// Abyss policy applied to the input while sampling.
    pub fn abyss_policy(&self) -> AbyssPolicy {
        if self.hard_edges {
            AbyssPolicy::HardEdge
        } else {
            AbyssPolicy::None
        }
    }

    /// Sampler parameters for resampling through `composite`. Lanczos
    /// kernels are stretched by the whole-number minification factor.
    pub fn sampler_spec(&self, composite: &Matrix3) -> SamplerSpec {
        let mut spec = SamplerSpec::new(self.filter);
        spec.lanczos_width = self.lanczos_width.clamp(LANCZOS_MIN_WIDTH, LANCZOS_MAX_WIDTH);
        if self.filter == Filter::Lanczos {
            spec.lanczos_scale = minification(composite);
        }
        spec
    }
}

/// Whole-number minification factor of `composite`, in `1..=LANCZOS_MAX_SCALE`.
fn minification(composite: &Matrix3) -> u32 {
    let Ok(inverse) = composite.inverse() else {
        return 1;
    };
    let (sx, sy) = inverse.scaling_abs();
    let s = sx.max(sy);
    if !s.is_finite() || s <= 1.0 {
        return 1;
    }
    (s.ceil() as u32).clamp(1, LANCZOS_MAX_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let n = TransformNode::default();
        assert_eq!(n.filter, Filter::Linear);
        assert!(!n.hard_edges);
        assert_eq!(n.lanczos_width, 3);
        assert_eq!(n.abyss_policy(), AbyssPolicy::None);
        assert_eq!(n.with_hard_edges(true).abyss_policy(), AbyssPolicy::HardEdge);
    }

    #[test]
    fn test_from_json() {
        let n = TransformNode::from_json(
            r#"{"op":"rotate","degrees":90,"filter":"cubic","origin-x":5,"origin-y":6,"hard-edges":true}"#,
        )
        .unwrap();
        assert_eq!(n.kind, TransformKind::Rotate { degrees: 90.0 });
        assert_eq!(n.filter, Filter::Cubic);
        assert_eq!((n.origin_x, n.origin_y), (5.0, 6.0));
        assert!(n.hard_edges);
    }

    #[test]
    fn test_json_roundtrip() {
        let n = TransformNode::new(TransformKind::Shear { x: 0.5, y: 0.0 })
            .with_filter(Filter::Lanczos)
            .with_lanczos_width(5);
        let back = TransformNode::from_json(&n.to_json().unwrap()).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn test_validate_lanczos_width() {
        let err = TransformNode::from_json(r#"{"op":"scale","lanczos-width":9}"#).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
        assert!(TransformNode::from_json(r#"{"op":"scale","lanczos-width":6}"#).is_ok());
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(
            TransformNode::from_json(r#"{"op":"teleport"}"#),
            Err(TransformError::Json(_))
        ));
    }

    #[test]
    fn test_local_matrix_pivots() {
        let n = TransformNode::new(TransformKind::Rotate { degrees: 90.0 }).with_origin(4.0, 4.0);
        let m = n.local_matrix(&Rectangle::new(0, 0, 8, 8));
        let (mut x, mut y) = (4.0, 4.0);
        m.transform_point(&mut x, &mut y);
        assert!((x - 4.0).abs() < 1e-12);
        assert!((y - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_lanczos_scale_tracks_minification() {
        let n = TransformNode::new(TransformKind::default()).with_filter(Filter::Lanczos);
        assert_eq!(n.sampler_spec(&Matrix3::new_scaling(2.0, 2.0)).lanczos_scale, 1);
        assert_eq!(n.sampler_spec(&Matrix3::new_scaling(0.5, 1.0)).lanczos_scale, 2);
        assert_eq!(n.sampler_spec(&Matrix3::new_scaling(0.01, 1.0)).lanczos_scale, 4);
        assert_eq!(n.sampler_spec(&Matrix3::new_scaling(0.0, 1.0)).lanczos_scale, 1);
        let linear = n.clone().with_filter(Filter::Linear);
        assert_eq!(linear.sampler_spec(&Matrix3::new_scaling(0.5, 1.0)).lanczos_scale, 1);
    }
}
