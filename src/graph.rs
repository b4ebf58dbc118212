//! Minimal node graph hosting transform nodes.
//!
//! [`GraphQuery`] is the read-only view the region and resampling code
//! works against. [`Graph`] is a small arena implementing it: source nodes
//! own a pixel buffer, transform nodes own a [`TransformNode`] and at most
//! one producer link.

use crate::basics::Rectangle;
use crate::error::{TransformError, TransformResult};
use crate::image_filters::LutCache;
use crate::pixel_buffer::PixelBuffer;
use crate::region::{self, INPUT_PAD};
use crate::resample::{self, ProcessContext};
use crate::transform_node::TransformNode;

/// Index of a node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read access to the graph around a node.
pub trait GraphQuery {
    /// Parameters of `node` when it is a transform node.
    fn transform(&self, node: NodeId) -> Option<&TransformNode>;

    /// Node connected to the input pad of `node`.
    fn producer(&self, node: NodeId) -> Option<NodeId>;

    /// Nodes whose input pad is connected to `node`.
    fn consumers(&self, node: NodeId) -> Vec<NodeId>;

    /// Defined region of `node`'s output.
    fn bounding_box(&self, node: NodeId) -> Rectangle;

    /// Source node owning output pixel `(x, y)` of `node`.
    fn detect(&self, node: NodeId, x: i32, y: i32) -> Option<NodeId>;
}

#[derive(Debug, Clone)]
enum Operation {
    Source(PixelBuffer),
    Transform(TransformNode),
}

#[derive(Debug, Clone)]
struct Node {
    op: Operation,
    input: Option<NodeId>,
}

/// Arena of source and transform nodes sharing one Lanczos table cache.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    luts: LutCache,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn luts(&self) -> &LutCache {
        &self.luts
    }

    pub fn add_source(&mut self, buffer: PixelBuffer) -> NodeId {
        self.push(Operation::Source(buffer))
    }

    pub fn add_transform(&mut self, node: TransformNode) -> NodeId {
        self.push(Operation::Transform(node))
    }

    fn push(&mut self, op: Operation) -> NodeId {
        self.nodes.push(Node { op, input: None });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> TransformResult<&Node> {
        self.nodes.get(id.0).ok_or(TransformError::UnknownNode(id.0))
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut TransformNode> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.op) {
            Some(Operation::Transform(t)) => Some(t),
            _ => None,
        }
    }

    pub fn source_mut(&mut self, id: NodeId) -> Option<&mut PixelBuffer> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.op) {
            Some(Operation::Source(b)) => Some(b),
            _ => None,
        }
    }

    /// Link `producer`'s output to `consumer`'s input pad, replacing any
    /// previous link. Links that would close a cycle are rejected.
    pub fn connect(&mut self, producer: NodeId, consumer: NodeId) -> TransformResult<()> {
        self.node(producer)?;
        if let Operation::Source(_) = self.node(consumer)?.op {
            return Err(TransformError::unknown_pad(INPUT_PAD));
        }
        let mut cursor = Some(producer);
        while let Some(id) = cursor {
            if id == consumer {
                return Err(TransformError::invalid_config(format!(
                    "connecting {producer} to {consumer} creates a cycle"
                )));
            }
            cursor = self.producer(id);
        }
        if let Some(n) = self.nodes.get_mut(consumer.0) {
            n.input = Some(producer);
        }
        Ok(())
    }

    /// Remove the link feeding `consumer`, returning the old producer.
    pub fn disconnect(&mut self, consumer: NodeId) -> Option<NodeId> {
        self.nodes.get_mut(consumer.0).and_then(|n| n.input.take())
    }

    /// Compute `rect` of `node`'s output, pulling only the input regions
    /// each transform needs.
    #[tracing::instrument(skip(self), fields(node = node.0, rect = %rect))]
    pub fn render(&self, node: NodeId, rect: Rectangle) -> TransformResult<PixelBuffer> {
        let out = match &self.node(node)?.op {
            Operation::Source(buffer) => return Ok(buffer.view(rect)),
            Operation::Transform(_) => {
                let input = match self.producer(node) {
                    Some(p) => {
                        let need = region::get_required_for_output(self, node, INPUT_PAD, &rect)?;
                        Some(self.render(p, need)?)
                    }
                    None => None,
                };
                let ctx = ProcessContext {
                    input,
                    luts: &self.luts,
                };
                resample::process(self, node, ctx, rect)?
            }
        };
        let defined = rect.intersect(&self.bounding_box(node));
        Ok(out.with_abyss_rect(defined))
    }

    /// Output regions downstream of `node` touched by a change to `rect`
    /// of its output, starting with `(node, rect)` itself.
    pub fn invalidate(&self, node: NodeId, rect: Rectangle) -> Vec<(NodeId, Rectangle)> {
        let mut dirty = vec![(node, rect)];
        let mut next = 0;
        while next < dirty.len() {
            let (id, r) = dirty[next];
            next += 1;
            for consumer in self.consumers(id) {
                match region::get_invalidated_by_change(self, consumer, INPUT_PAD, &r) {
                    Ok(out) if !out.is_empty() => dirty.push((consumer, out)),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(node = consumer.0, "invalidation stopped: {e}"),
                }
            }
        }
        dirty
    }
}

impl GraphQuery for Graph {
    fn transform(&self, node: NodeId) -> Option<&TransformNode> {
        match self.nodes.get(node.0).map(|n| &n.op) {
            Some(Operation::Transform(t)) => Some(t),
            _ => None,
        }
    }

    fn producer(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.input)
    }

    fn consumers(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.input == Some(node))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn bounding_box(&self, node: NodeId) -> Rectangle {
        match self.nodes.get(node.0).map(|n| &n.op) {
            Some(Operation::Source(buffer)) => buffer.extent(),
            Some(Operation::Transform(_)) => region::get_bounding_box(self, node),
            None => Rectangle::default(),
        }
    }

    fn detect(&self, node: NodeId, x: i32, y: i32) -> Option<NodeId> {
        match self.nodes.get(node.0).map(|n| &n.op) {
            Some(Operation::Source(buffer)) => {
                buffer.extent().contains_point(x, y).then_some(node)
            }
            Some(Operation::Transform(_)) => region::detect(self, node, x, y),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::sampler::Filter;
    use crate::transform_kind::TransformKind;

    fn checker(rect: Rectangle) -> PixelBuffer {
        let pixels = (0..rect.area())
            .map(|i| {
                let x = i as i32 % rect.width;
                let y = i as i32 / rect.width;
                if (x + y) % 2 == 0 {
                    Rgba::WHITE
                } else {
                    Rgba::BLACK
                }
            })
            .collect();
        PixelBuffer::from_pixels(rect, pixels).unwrap()
    }

    #[test]
    fn test_wiring() {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(Rectangle::new(0, 0, 4, 4)));
        let a = g.add_transform(TransformNode::default());
        let b = g.add_transform(TransformNode::default());
        g.connect(src, a).unwrap();
        g.connect(a, b).unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.producer(b), Some(a));
        assert_eq!(g.consumers(a), vec![b]);
        assert_eq!(g.disconnect(b), Some(a));
        assert!(g.consumers(a).is_empty());
        assert!(g.transform(src).is_none());
        assert!(g.transform_mut(src).is_none());
        assert!(g.source_mut(src).is_some());
    }

    #[test]
    fn test_connect_errors() {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(Rectangle::new(0, 0, 4, 4)));
        let a = g.add_transform(TransformNode::default());
        let b = g.add_transform(TransformNode::default());
        assert!(matches!(g.connect(a, src), Err(TransformError::UnknownPad(_))));
        assert!(matches!(g.connect(a, NodeId(9)), Err(TransformError::UnknownNode(9))));
        g.connect(a, b).unwrap();
        assert!(matches!(g.connect(b, a), Err(TransformError::InvalidConfig(_))));
        assert!(matches!(g.connect(a, a), Err(TransformError::InvalidConfig(_))));
    }

    #[test]
    fn test_source_queries() {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(Rectangle::new(2, 3, 4, 5)));
        assert_eq!(g.bounding_box(src), Rectangle::new(2, 3, 4, 5));
        assert_eq!(g.detect(src, 2, 3), Some(src));
        assert_eq!(g.detect(src, 6, 3), None);
        assert_eq!(g.bounding_box(NodeId(7)), Rectangle::default());
    }

    #[test]
    fn test_render_translate() {
        let mut g = Graph::new();
        let rect = Rectangle::new(0, 0, 4, 4);
        let src = g.add_source(checker(rect));
        let t = g.add_transform(TransformNode::new(TransformKind::Translate { x: 2.0, y: 1.0 }));
        g.connect(src, t).unwrap();
        let out = g.render(t, Rectangle::new(0, 0, 8, 8)).unwrap();
        assert_eq!(out.abyss_rect(), Rectangle::new(2, 1, 4, 4));
        assert_eq!(out.pixel(2, 1), Rgba::WHITE);
        assert_eq!(out.pixel(3, 1), Rgba::BLACK);
        assert!(out.pixel(0, 0).is_transparent());
    }

    #[test]
    fn test_render_unconnected_transform_fails() {
        let mut g = Graph::new();
        let t = g.add_transform(TransformNode::new(TransformKind::Rotate { degrees: 3.0 }));
        assert!(matches!(
            g.render(t, Rectangle::new(0, 0, 2, 2)),
            Err(TransformError::MissingInput)
        ));
        assert!(matches!(
            g.render(NodeId(5), Rectangle::new(0, 0, 2, 2)),
            Err(TransformError::UnknownNode(5))
        ));
    }

    #[test]
    fn test_invalidate_walks_downstream() {
        let mut g = Graph::new();
        let src = g.add_source(PixelBuffer::new(Rectangle::new(0, 0, 16, 16)));
        let a = g.add_transform(
            TransformNode::new(TransformKind::Translate { x: 4.0, y: 0.0 }).with_filter(Filter::Nearest),
        );
        let b = g.add_transform(
            TransformNode::new(TransformKind::Scale { x: 2.0, y: 2.0 }).with_filter(Filter::Linear),
        );
        g.connect(src, a).unwrap();
        g.connect(a, b).unwrap();
        let dirty = g.invalidate(src, Rectangle::new(1, 1, 2, 2));
        assert_eq!(dirty.len(), 3);
        assert_eq!(dirty[0], (src, Rectangle::new(1, 1, 2, 2)));
        assert_eq!(dirty[1], (a, Rectangle::new(5, 1, 2, 2)));
        let (id, r) = dirty[2];
        assert_eq!(id, b);
        assert!(r.contains(&Rectangle::new(10, 2, 4, 4)));
    }
}
