//! # raster-warp
//!
//! Geometric transform nodes for a demand-driven raster graph.
//!
//! A transform node maps its input image through a 3×3 matrix. Nodes never
//! compute more than a consumer asks for: every node answers three region
//! queries (what it can produce, what input it needs for an output
//! rectangle, what output an input change touches) and then resamples only
//! the requested rectangle.
//!
//! Features:
//!
//! - Translate, scale, rotate, shear, size-fit and free-form matrix nodes
//! - Chains of same-filter nodes collapse into a single resampling pass
//! - Nearest, bilinear, Catmull-Rom, Lanczos and jacobian-aware generic
//!   samplers with configurable edge handling
//! - Pass-through, integer-shift and mirrored-copy fast paths, with
//!   parallel affine and projective loops for everything else
//!
//! ## Architecture
//!
//! 1. **Matrix**: [`matrix::Matrix3`] algebra and classification
//! 2. **Node**: [`transform_kind::TransformKind`] builds each node's own
//!    matrix, [`chain`] folds chained nodes into a composite
//! 3. **Regions**: [`region`] propagates rectangles through the composite
//! 4. **Resampling**: [`resample::process`] dispatches to a fast path or a
//!    span loop driving a [`sampler::Sampler`]
//! 5. **Graph**: [`graph::Graph`] hosts sources and transforms and renders
//!    on demand

// Foundation
pub mod basics;
pub mod color;
pub mod error;
pub mod matrix;

// Pixels and sampling
pub mod abyss;
pub mod image_filters;
pub mod pixel_buffer;
pub mod sampler;
pub mod span_interpolator;

// Transform nodes
pub mod chain;
pub mod transform_kind;
pub mod transform_node;
pub mod transform_parse;

// Regions, resampling and hosting
pub mod graph;
pub mod region;
pub mod resample;

pub use basics::Rectangle;
pub use color::{Rgba, Rgba8};
pub use error::{TransformError, TransformResult};
pub use graph::{Graph, GraphQuery, NodeId};
pub use matrix::{multiply, Matrix2, Matrix3};
pub use pixel_buffer::PixelBuffer;
pub use sampler::Filter;
pub use transform_kind::TransformKind;
pub use transform_node::TransformNode;
