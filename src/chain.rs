//! Chain classification and composite matrices.
//!
//! Directly chained transform nodes that share a filter are resampled once.
//! The upstream nodes of such a run pass their input through untouched, and
//! the last node resamples with the product of every matrix in the run.
//! Nothing here is cached: each query walks the graph again, so parameter
//! edits can never leave a stale matrix behind.

use crate::basics::Rectangle;
use crate::graph::{GraphQuery, NodeId};
use crate::matrix::{multiply, Matrix3};

/// True iff the node has consumers and every one of them is a transform
/// node using the same filter. Such a node passes its input through.
pub fn is_mergeable_with_downstream<G: GraphQuery + ?Sized>(graph: &G, node: NodeId) -> bool {
    let Some(own) = graph.transform(node) else {
        return false;
    };
    let consumers = graph.consumers(node);
    !consumers.is_empty()
        && consumers.iter().all(|c| {
            graph
                .transform(*c)
                .is_some_and(|t| t.filter == own.filter)
        })
}

/// True iff the node's single producer is a transform node using the same
/// filter. Such a node folds the producer's matrix into its own.
pub fn is_mergeable_with_upstream<G: GraphQuery + ?Sized>(graph: &G, node: NodeId) -> bool {
    let Some(own) = graph.transform(node) else {
        return false;
    };
    graph
        .producer(node)
        .and_then(|p| graph.transform(p))
        .is_some_and(|t| t.filter == own.filter)
}

/// Defined region feeding the node's input pad; empty when unconnected.
pub fn upstream_bounding_box<G: GraphQuery + ?Sized>(graph: &G, node: NodeId) -> Rectangle {
    graph
        .producer(node)
        .map(|p| graph.bounding_box(p))
        .unwrap_or_default()
}

/// Effective matrix of a node: its own pivoted matrix, composed with the
/// upstream composite when the two merge. Non-transform nodes have the
/// identity.
///
/// The producer's matrix is folded in only while the producer passes its
/// input through. A producer that also feeds a consumer with another filter
/// has already resampled, so its matrix must not be applied twice.
pub fn composite_matrix<G: GraphQuery + ?Sized>(graph: &G, node: NodeId) -> Matrix3 {
    let Some(own) = graph.transform(node) else {
        return Matrix3::identity();
    };
    let local = own.local_matrix(&upstream_bounding_box(graph, node));
    if !is_mergeable_with_upstream(graph, node) {
        return local;
    }
    match graph.producer(node) {
        Some(p) if is_mergeable_with_downstream(graph, p) => {
            multiply(&local, &composite_matrix(graph, p))
        }
        _ => local,
    }
}
