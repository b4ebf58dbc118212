//! Resampler dispatch and pixel loops.
//!
//! [`process`] picks the cheapest path able to reproduce the general
//! result:
//!
//! 1. pass-through: merged intermediate node or identity matrix;
//! 2. integer shift: whole-pixel translation, served as a shifted alias;
//! 3. axis flip: `diag(±1, ±1)` with whole-pixel translation and an
//!    interpolating sampler, served as a mirrored copy;
//! 4. affine loop: [`AffineSpan`] per scanline, constant jacobian;
//! 5. projective loop: [`PerspectiveSpan`] per scanline, per-pixel jacobian.
//!
//! The loops split the output into row bands and fill them in parallel.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::abyss::AbyssPolicy;
use crate::basics::{iround, ifloor, Rectangle};
use crate::chain::{composite_matrix, is_mergeable_with_downstream};
use crate::color::Rgba;
use crate::error::{TransformError, TransformResult};
use crate::graph::{GraphQuery, NodeId};
use crate::image_filters::LutCache;
use crate::matrix::Matrix3;
use crate::pixel_buffer::PixelBuffer;
use crate::sampler::{Filter, Sampler};
use crate::span_interpolator::{AffineSpan, PerspectiveSpan};

/// Rows per parallel work item.
pub const BAND_ROWS: usize = 16;

/// Inputs to [`process`] that are not part of the graph.
pub struct ProcessContext<'a> {
    /// Rendered input region; `None` when nothing is connected.
    pub input: Option<PixelBuffer>,
    /// Lanczos tables shared by every node.
    pub luts: &'a LutCache,
}

/// Path taken by [`process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplePath {
    PassThrough,
    IntegerShift,
    AxisFlip,
    Affine,
    Projective,
}

/// Produce `result` of the node's output from `ctx.input`.
#[tracing::instrument(skip(graph, ctx), fields(node = node.0, rect = %result))]
pub fn process<G: GraphQuery + ?Sized>(
    graph: &G,
    node: NodeId,
    ctx: ProcessContext<'_>,
    result: Rectangle,
) -> TransformResult<PixelBuffer> {
    let params = graph
        .transform(node)
        .ok_or(TransformError::UnknownNode(node.0))?;
    let Some(input) = ctx.input else {
        warn!(node = node.0, "no input buffer, nothing to resample");
        return Err(TransformError::MissingInput);
    };

    if is_mergeable_with_downstream(graph, node) {
        debug!(path = ?ResamplePath::PassThrough, "merged into consumer");
        return Ok(input.view(result));
    }
    let matrix = composite_matrix(graph, node);
    if matrix.is_identity() {
        debug!(path = ?ResamplePath::PassThrough, "identity");
        return Ok(input.view(result));
    }
    if matrix.is_integer_translate() || (matrix.is_translate() && params.filter == Filter::Nearest)
    {
        let (tx, ty) = matrix.translation();
        let (sx, sy) = (-ifloor(0.5 - tx), -ifloor(0.5 - ty));
        debug!(path = ?ResamplePath::IntegerShift, sx, sy);
        return Ok(input.translated(sx, sy).view(result));
    }

    let inverse = matrix.inverse()?;
    let sampler = params.sampler_spec(&matrix).build(ctx.luts);
    let abyss = params.abyss_policy();
    let pixels = if matrix.is_axis_flip() && sampler.is_interpolating() {
        debug!(path = ?ResamplePath::AxisFlip, %matrix);
        axis_flip(&input, &matrix, abyss, result)
    } else if matrix.is_affine() {
        debug!(path = ?ResamplePath::Affine, %matrix, filter = %params.filter);
        affine_loop(&input, &inverse, sampler.as_ref(), abyss, result)
    } else {
        debug!(path = ?ResamplePath::Projective, %matrix, filter = %params.filter);
        projective_loop(&input, &inverse, sampler.as_ref(), abyss, result)
    };
    PixelBuffer::from_pixels(result, pixels)
}

/// Run `fill(y, row)` over every row of `result`, in parallel bands.
/// Rows inside a band go bottom-up when `rows_backward` is set.
fn fill_rows<F>(result: Rectangle, rows_backward: bool, fill: F) -> Vec<Rgba>
where
    F: Fn(i32, &mut [Rgba]) + Sync,
{
    let mut out = vec![Rgba::TRANSPARENT; result.area()];
    if result.is_empty() {
        return out;
    }
    let width = result.width as usize;
    out.par_chunks_mut(width * BAND_ROWS)
        .enumerate()
        .for_each(|(band, chunk)| {
            let y0 = result.y + (band * BAND_ROWS) as i32;
            let rows = chunk.chunks_mut(width).enumerate();
            if rows_backward {
                rows.rev().for_each(|(j, row)| fill(y0 + j as i32, row));
            } else {
                rows.for_each(|(j, row)| fill(y0 + j as i32, row));
            }
        });
    out
}

/// Mirrored copy for `diag(±1, ±1)` matrices with whole-pixel offsets.
/// Every sample lands on a pixel center, where interpolating kernels
/// return the pixel itself.
pub(crate) fn axis_flip(
    input: &PixelBuffer,
    matrix: &Matrix3,
    abyss: AbyssPolicy,
    result: Rectangle,
) -> Vec<Rgba> {
    let flip_x = matrix.coeff[0][0] < 0.0;
    let flip_y = matrix.coeff[1][1] < 0.0;
    let (tx, ty) = matrix.translation();
    let (tx, ty) = (iround(tx), iround(ty));
    let source = |d: i32, t: i32, flip: bool| if flip { t - 1 - d } else { d - t };
    let defined = input.abyss_rect();

    fill_rows(result, flip_y, |y, row| {
        let sy = source(y, ty, flip_y);
        for (i, px) in row.iter_mut().enumerate() {
            let sx = source(result.x + i as i32, tx, flip_x);
            *px = if abyss.covers_sample(sx as f64 + 0.5, sy as f64 + 0.5, &defined) {
                input.fetch(sx, sy, abyss)
            } else {
                Rgba::TRANSPARENT
            };
        }
    })
}

/// Affine scanline loop: one inverse evaluation per row, then constant
/// jacobian steps.
pub(crate) fn affine_loop(
    input: &PixelBuffer,
    inverse: &Matrix3,
    sampler: &dyn Sampler,
    abyss: AbyssPolicy,
    result: Rectangle,
) -> Vec<Rgba> {
    let jacobian = AffineSpan::jacobian(inverse);
    let len = result.width.max(0) as usize;
    fill_rows(result, AffineSpan::rows_backward(inverse), |y, row| {
        for s in AffineSpan::new(inverse, result.x, y, len) {
            if let Some(px) = row.get_mut(s.offset) {
                *px = sampler.sample(input, s.u, s.v, &jacobian, abyss);
            }
        }
    })
}

/// Projective loop: homogeneous division and jacobian per pixel. Pixels
/// beyond the horizon stay transparent.
pub(crate) fn projective_loop(
    input: &PixelBuffer,
    inverse: &Matrix3,
    sampler: &dyn Sampler,
    abyss: AbyssPolicy,
    result: Rectangle,
) -> Vec<Rgba> {
    let source = if input.abyss_rect().is_empty() {
        input.extent()
    } else {
        input.abyss_rect()
    };
    let inverse = facing_source(inverse, &source);
    let len = result.width.max(0) as usize;
    fill_rows(result, false, |y, row| {
        for (offset, sample) in PerspectiveSpan::new(&inverse, result.x, y, len) {
            let (Some((u, v, jacobian)), Some(px)) = (sample, row.get_mut(offset)) else {
                continue;
            };
            *px = sampler.sample(input, u, v, &jacobian, abyss);
        }
    })
}

/// Scale `inverse` by -1 when needed so that its homogeneous `w` is positive
/// for output pixels whose preimage lies on the same side of the horizon as
/// the centre of `source`. A matrix and its negation are the same
/// projective map; only the sign decides which side counts as visible.
fn facing_source(inverse: &Matrix3, source: &Rectangle) -> Matrix3 {
    let Ok(forward) = inverse.inverse() else {
        return *inverse;
    };
    let cx = source.x as f64 + source.width as f64 / 2.0;
    let cy = source.y as f64 + source.height as f64 / 2.0;
    let f = &forward.coeff;
    // The inverse yields w = 1 / (forward w) at the preimage.
    if f[2][0] * cx + f[2][1] * cy + f[2][2] >= 0.0 {
        return *inverse;
    }
    let mut coeff = inverse.coeff;
    for v in coeff.iter_mut().flatten() {
        *v = -*v;
    }
    Matrix3::new(coeff)
}
