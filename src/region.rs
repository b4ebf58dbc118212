//! Region propagation through transform nodes.
//!
//! Three queries, all pure:
//!
//! - [`get_bounding_box`]: the region the node can produce (forward).
//! - [`get_required_for_output`]: input needed for an output rectangle
//!   (backward through the inverse matrix).
//! - [`get_invalidated_by_change`]: output touched by an input change
//!   (forward).
//!
//! Each one maps the four outer corners of a rectangle and takes an integer
//! bounding box of the result. Defined regions and input requests keep
//! every pixel the mapped quad touches. Invalidations keep only pixels whose
//! centers fall inside, since a destination pixel is sampled at its center.

use crate::basics::{iceil, ifloor, Rectangle};
use crate::chain::{composite_matrix, is_mergeable_with_downstream, upstream_bounding_box};
use crate::error::{TransformError, TransformResult};
use crate::graph::{GraphQuery, NodeId};
use crate::matrix::Matrix3;

/// Name of the single input pad of a transform node.
pub const INPUT_PAD: &str = "input";

/// Slack absorbing rounding error when a span ends exactly on a pixel
/// center.
const CENTER_SNAP: f64 = 1e-6;

/// Which pixels [`bounding_box`] keeps for a span of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Every pixel `[i, i+1)` overlapping the span.
    Corner,
    /// Every pixel whose center `i + 0.5` lies inside the span.
    Center,
}

/// Integer bounding box of the four points `[x0, y0, .., x3, y3]`.
pub fn bounding_box(points: &[f64; 8], convention: Convention) -> Rectangle {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points.chunks_exact(2) {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    match convention {
        Convention::Corner => {
            let x = ifloor(min_x);
            let y = ifloor(min_y);
            Rectangle::new(x, y, iceil(max_x) - x, iceil(max_y) - y)
        }
        Convention::Center => {
            let x = iceil(min_x - 0.5 - CENTER_SNAP);
            let y = iceil(min_y - 0.5 - CENTER_SNAP);
            let x2 = ifloor(max_x - 0.5 + CENTER_SNAP) + 1;
            let y2 = ifloor(max_y - 0.5 + CENTER_SNAP) + 1;
            Rectangle::new(x, y, (x2 - x).max(0), (y2 - y).max(0))
        }
    }
}

/// Composite matrix, or `None` when the node leaves geometry untouched:
/// it is not a transform, it passes its input through to a merged
/// consumer, or its composite is the identity.
fn effective_matrix<G: GraphQuery + ?Sized>(graph: &G, node: NodeId) -> Option<Matrix3> {
    graph.transform(node)?;
    if is_mergeable_with_downstream(graph, node) {
        return None;
    }
    let m = composite_matrix(graph, node);
    if m.is_identity() {
        None
    } else {
        Some(m)
    }
}

fn check_pad(pad: &str) -> TransformResult<()> {
    if pad == INPUT_PAD {
        Ok(())
    } else {
        Err(TransformError::unknown_pad(pad))
    }
}

/// Region the node can produce: the upstream defined region mapped
/// forward through the composite matrix.
pub fn get_bounding_box<G: GraphQuery + ?Sized>(graph: &G, node: NodeId) -> Rectangle {
    let upstream = upstream_bounding_box(graph, node);
    let Some(m) = effective_matrix(graph, node) else {
        return upstream;
    };
    if upstream.is_empty() {
        return upstream;
    }
    let mut points = upstream.corner_points();
    m.transform_points(&mut points);
    bounding_box(&points, Convention::Corner)
}

/// Input pixels needed to produce `rect`: the outer corners of its corner
/// pixels mapped through the inverse matrix, grown by the sampler context.
pub fn get_required_for_output<G: GraphQuery + ?Sized>(
    graph: &G,
    node: NodeId,
    pad: &str,
    rect: &Rectangle,
) -> TransformResult<Rectangle> {
    check_pad(pad)?;
    let Some(m) = effective_matrix(graph, node) else {
        return Ok(*rect);
    };
    if rect.is_empty() {
        return Ok(*rect);
    }
    let inverse = m.inverse()?;
    let mut points = rect.corner_points();
    inverse.transform_points(&mut points);
    let context = sampler_context(graph, node, &m);
    Ok(bounding_box(&points, Convention::Corner).dilate(&context))
}

/// Output pixels affected when input `rect` changes: those whose center
/// samples inside the region where a kernel reaches `rect`.
pub fn get_invalidated_by_change<G: GraphQuery + ?Sized>(
    graph: &G,
    node: NodeId,
    pad: &str,
    rect: &Rectangle,
) -> TransformResult<Rectangle> {
    check_pad(pad)?;
    let Some(m) = effective_matrix(graph, node) else {
        return Ok(*rect);
    };
    if rect.is_empty() {
        return Ok(*rect);
    }
    let context = sampler_context(graph, node, &m);
    let mut points = rect.dilate_reflected(&context).corner_points();
    m.transform_points(&mut points);
    Ok(bounding_box(&points, Convention::Center))
}

fn sampler_context<G: GraphQuery + ?Sized>(graph: &G, node: NodeId, m: &Matrix3) -> Rectangle {
    graph
        .transform(node)
        .map(|t| t.sampler_spec(m).context_rect())
        .unwrap_or(Rectangle::new(0, 0, 1, 1))
}

/// Hit test: the upstream node owning the input pixel under `(x, y)`.
///
/// Every transform in a chain inverts its own matrix and hands the point
/// on, so merged nodes hit-test the same as materialized ones.
pub fn detect<G: GraphQuery + ?Sized>(graph: &G, node: NodeId, x: i32, y: i32) -> Option<NodeId> {
    let own = graph.transform(node)?;
    let producer = graph.producer(node)?;
    let local = own.local_matrix(&graph.bounding_box(producer));
    if local.is_identity() {
        return graph.detect(producer, x, y);
    }
    let inverse = local.inverse().ok()?;
    let mut u = x as f64 + 0.5;
    let mut v = y as f64 + 0.5;
    inverse.transform_point(&mut u, &mut v);
    if !u.is_finite() || !v.is_finite() {
        return None;
    }
    graph.detect(producer, ifloor(u), ifloor(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::pixel_buffer::PixelBuffer;
    use crate::sampler::Filter;
    use crate::transform_kind::TransformKind;
    use crate::transform_node::TransformNode;

    fn single(kind: TransformKind, filter: Filter, src_rect: Rectangle) -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(src_rect));
        let t = g.add_transform(TransformNode::new(kind).with_filter(filter));
        g.connect(src, t).unwrap();
        (g, src, t)
    }

    #[test]
    fn test_bounding_box_conventions() {
        let pts = [0.25, 0.5, 3.75, 0.5, 0.25, 2.0, 3.75, 2.0];
        assert_eq!(bounding_box(&pts, Convention::Corner), Rectangle::new(0, 0, 4, 2));
        assert_eq!(bounding_box(&pts, Convention::Center), Rectangle::new(0, 0, 4, 2));
        let narrow = [0.6, 0.6, 1.4, 0.6, 0.6, 1.4, 1.4, 1.4];
        assert!(bounding_box(&narrow, Convention::Center).is_empty());
        let centers = Rectangle::new(3, 4, 5, 6).center_points();
        assert_eq!(bounding_box(&centers, Convention::Center), Rectangle::new(3, 4, 5, 6));
        let corners = Rectangle::new(3, 4, 5, 6).corner_points();
        assert_eq!(bounding_box(&corners, Convention::Corner), Rectangle::new(3, 4, 5, 6));
    }

    #[test]
    fn test_identity_round_trips() {
        let src = Rectangle::new(-3, 7, 20, 11);
        let (g, _, t) = single(
            TransformKind::Translate { x: 0.0, y: 0.0 },
            Filter::Cubic,
            src,
        );
        let r = Rectangle::new(2, 3, 5, 9);
        assert_eq!(get_bounding_box(&g, t), src);
        assert_eq!(get_required_for_output(&g, t, INPUT_PAD, &r).unwrap(), r);
        assert_eq!(get_invalidated_by_change(&g, t, INPUT_PAD, &r).unwrap(), r);
    }

    #[test]
    fn test_identity_check_uses_epsilon() {
        let (g, _, t) = single(
            TransformKind::Matrix {
                transform: "matrix(1.00000001,0,0,0,1,0.00000001)".into(),
            },
            Filter::Cubic,
            Rectangle::new(0, 0, 10, 10),
        );
        let r = Rectangle::new(1, 1, 2, 2);
        assert_eq!(get_required_for_output(&g, t, INPUT_PAD, &r).unwrap(), r);
    }

    #[test]
    fn test_scale_bounding_box() {
        let (g, _, t) = single(
            TransformKind::Scale { x: 2.0, y: 2.0 },
            Filter::Nearest,
            Rectangle::new(0, 0, 4, 4),
        );
        assert_eq!(get_bounding_box(&g, t), Rectangle::new(0, 0, 8, 8));
    }

    #[test]
    fn test_translate_required_and_invalidated() {
        let (g, _, t) = single(
            TransformKind::Translate { x: 10.0, y: 5.0 },
            Filter::Nearest,
            Rectangle::new(0, 0, 100, 100),
        );
        let out = Rectangle::new(10, 5, 4, 4);
        assert_eq!(
            get_required_for_output(&g, t, INPUT_PAD, &out).unwrap(),
            Rectangle::new(0, 0, 4, 4)
        );
        assert_eq!(
            get_invalidated_by_change(&g, t, INPUT_PAD, &Rectangle::new(0, 0, 4, 4)).unwrap(),
            out
        );
    }

    #[test]
    fn test_required_grows_by_context() {
        let (g, _, t) = single(
            TransformKind::Translate { x: 10.0, y: 5.0 },
            Filter::Cubic,
            Rectangle::new(0, 0, 100, 100),
        );
        let out = Rectangle::new(10, 5, 4, 4);
        assert_eq!(
            get_required_for_output(&g, t, INPUT_PAD, &out).unwrap(),
            Rectangle::new(-2, -2, 8, 8)
        );
        assert_eq!(
            get_invalidated_by_change(&g, t, INPUT_PAD, &Rectangle::new(0, 0, 4, 4)).unwrap(),
            Rectangle::new(8, 3, 8, 8)
        );
    }

    #[test]
    fn test_required_covers_request_when_mapped_back() {
        let kinds = [
            TransformKind::Rotate { degrees: 33.0 },
            TransformKind::Scale { x: 0.3, y: 2.7 },
            TransformKind::Shear { x: 0.4, y: -0.2 },
            TransformKind::Matrix {
                transform: "matrix(1,0.1,3,0.05,0.9,-2,0.0005,0.0002,1)".into(),
            },
        ];
        let requests = [
            Rectangle::new(0, 0, 1, 1),
            Rectangle::new(-7, 3, 13, 5),
            Rectangle::new(20, 20, 31, 17),
        ];
        for kind in kinds {
            let (g, _, t) = single(kind.clone(), Filter::Linear, Rectangle::new(0, 0, 64, 64));
            let m = composite_matrix(&g, t);
            for r in requests {
                let need = get_required_for_output(&g, t, INPUT_PAD, &r).unwrap();
                let mut pts = need.corner_points();
                m.transform_points(&mut pts);
                let back = bounding_box(&pts, Convention::Corner);
                assert!(back.contains(&r), "{kind:?} {r}: {need} maps to {back}");
            }
        }
    }

    #[test]
    fn test_empty_rectangles_stay_empty() {
        let (g, _, t) = single(
            TransformKind::Rotate { degrees: 10.0 },
            Filter::Linear,
            Rectangle::new(0, 0, 8, 8),
        );
        let e = Rectangle::new(4, 4, 0, 3);
        assert!(get_required_for_output(&g, t, INPUT_PAD, &e).unwrap().is_empty());
        assert!(get_invalidated_by_change(&g, t, INPUT_PAD, &e).unwrap().is_empty());

        let (g, _, t) = single(
            TransformKind::Rotate { degrees: 10.0 },
            Filter::Linear,
            Rectangle::new(0, 0, 0, 0),
        );
        assert!(get_bounding_box(&g, t).is_empty());
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let (g, _, t) = single(
            TransformKind::Scale { x: 0.0, y: 1.0 },
            Filter::Linear,
            Rectangle::new(0, 0, 8, 8),
        );
        let err = get_required_for_output(&g, t, INPUT_PAD, &Rectangle::new(0, 0, 2, 2));
        assert!(matches!(err, Err(TransformError::NonInvertible { .. })));
        // Forward queries need no inverse.
        assert!(get_invalidated_by_change(&g, t, INPUT_PAD, &Rectangle::new(0, 0, 2, 2)).is_ok());
    }

    #[test]
    fn test_unknown_pad() {
        let (g, _, t) = single(
            TransformKind::Rotate { degrees: 10.0 },
            Filter::Linear,
            Rectangle::new(0, 0, 8, 8),
        );
        let err = get_required_for_output(&g, t, "aux", &Rectangle::new(0, 0, 2, 2));
        assert!(matches!(err, Err(TransformError::UnknownPad(p)) if p == "aux"));
    }

    #[test]
    fn test_intermediate_node_passes_regions_through() {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(Rectangle::new(0, 0, 10, 10)));
        let a = g.add_transform(TransformNode::new(TransformKind::Scale { x: 3.0, y: 3.0 }));
        let b = g.add_transform(TransformNode::new(TransformKind::Translate { x: 1.0, y: 0.0 }));
        g.connect(src, a).unwrap();
        g.connect(a, b).unwrap();
        let r = Rectangle::new(2, 2, 3, 3);
        assert_eq!(get_bounding_box(&g, a), Rectangle::new(0, 0, 10, 10));
        assert_eq!(get_required_for_output(&g, a, INPUT_PAD, &r).unwrap(), r);
        assert_eq!(get_bounding_box(&g, b), Rectangle::new(1, 0, 30, 30));
    }

    #[test]
    fn test_detect_follows_chain() {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(Rectangle::new(0, 0, 10, 10)));
        let a = g.add_transform(TransformNode::new(TransformKind::Translate { x: 100.0, y: 0.0 }));
        let b = g.add_transform(TransformNode::new(TransformKind::Scale { x: 2.0, y: 2.0 }));
        g.connect(src, a).unwrap();
        g.connect(a, b).unwrap();
        // b's output (x, y) comes from a's output (x/2, y/2), which is the
        // source pixel (x/2 - 100, y/2).
        assert_eq!(detect(&g, b, 201, 3), Some(src));
        assert_eq!(detect(&g, b, 5, 3), None);
        assert_eq!(detect(&g, a, 109, 9), Some(src));
        assert_eq!(detect(&g, a, 110, 9), None);
    }

    #[test]
    fn test_detect_singular_is_none() {
        let (g, _, t) = single(
            TransformKind::Scale { x: 0.0, y: 0.0 },
            Filter::Linear,
            Rectangle::new(0, 0, 8, 8),
        );
        assert_eq!(detect(&g, t, 0, 0), None);
    }
}
