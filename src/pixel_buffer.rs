//! Pixel buffer: row-major premultiplied RGBA storage with cheap views.
//!
//! Storage is reference counted, so views and coordinate-shifted aliases
//! share pixels without copying. Writes go through [`PixelBuffer::set`],
//! which copies the storage first if another buffer still shares it.
//!
//! Three rectangles describe a buffer:
//!
//! - `storage`: where pixel memory exists, in storage coordinates.
//! - `extent`: the region of interest of this view.
//! - `abyss_rect`: the defined region; reads outside it go through the
//!   abyss policy.
//!
//! `extent` and `abyss_rect` are in view coordinates, which differ from
//! storage coordinates by the accumulated shift.

use std::sync::Arc;

use crate::abyss::{AbyssPolicy, AbyssRead};
use crate::basics::Rectangle;
use crate::color::{Rgba, Rgba8};
use crate::error::{TransformError, TransformResult};

#[derive(Debug, Clone)]
pub struct PixelBuffer {
    data: Arc<Vec<Rgba>>,
    storage: Rectangle,
    shift_x: i32,
    shift_y: i32,
    extent: Rectangle,
    abyss_rect: Rectangle,
    abyss: AbyssPolicy,
}

impl PixelBuffer {
    /// Transparent buffer covering `rect`.
    pub fn new(rect: Rectangle) -> Self {
        Self::with_storage(rect, vec![Rgba::TRANSPARENT; rect.area()])
    }

    /// Buffer over `rect` filled with `pixels` in row-major order.
    pub fn from_pixels(rect: Rectangle, pixels: Vec<Rgba>) -> TransformResult<Self> {
        if pixels.len() != rect.area() {
            return Err(TransformError::BufferSize {
                expected: rect.area(),
                actual: pixels.len(),
            });
        }
        Ok(Self::with_storage(rect, pixels))
    }

    /// Import straight 8-bit RGBA bytes covering `rect`.
    pub fn from_rgba8(rect: Rectangle, bytes: &[u8]) -> TransformResult<Self> {
        if bytes.len() != rect.area() * 4 {
            return Err(TransformError::BufferSize {
                expected: rect.area() * 4,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| Rgba8::new(p[0], p[1], p[2], p[3]).to_rgba())
            .collect();
        Ok(Self::with_storage(rect, pixels))
    }

    fn with_storage(rect: Rectangle, pixels: Vec<Rgba>) -> Self {
        Self {
            data: Arc::new(pixels),
            storage: rect,
            shift_x: 0,
            shift_y: 0,
            extent: rect,
            abyss_rect: rect,
            abyss: AbyssPolicy::None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn extent(&self) -> Rectangle {
        self.extent
    }

    pub fn abyss_rect(&self) -> Rectangle {
        self.abyss_rect
    }

    pub fn abyss(&self) -> AbyssPolicy {
        self.abyss
    }

    /// True when both buffers alias the same pixel memory.
    pub fn shares_storage_with(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Zero-copy view with a new region of interest.
    pub fn view(&self, rect: Rectangle) -> PixelBuffer {
        PixelBuffer {
            extent: rect,
            ..self.clone()
        }
    }

    /// Zero-copy alias where `out(x, y) == self(x - dx, y - dy)`.
    pub fn translated(&self, dx: i32, dy: i32) -> PixelBuffer {
        PixelBuffer {
            shift_x: self.shift_x + dx,
            shift_y: self.shift_y + dy,
            extent: self.extent.translate(dx, dy),
            abyss_rect: self.abyss_rect.translate(dx, dy),
            ..self.clone()
        }
    }

    pub fn with_abyss(mut self, abyss: AbyssPolicy) -> PixelBuffer {
        self.abyss = abyss;
        self
    }

    pub fn with_abyss_rect(mut self, rect: Rectangle) -> PixelBuffer {
        self.abyss_rect = rect;
        self
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Stored pixel at view coordinates, ignoring the abyss. Defined but
    /// unstored positions read transparent.
    #[inline]
    fn stored(&self, x: i32, y: i32) -> Rgba {
        let sx = x - self.shift_x;
        let sy = y - self.shift_y;
        if !self.storage.contains_point(sx, sy) {
            return Rgba::TRANSPARENT;
        }
        let idx = (sy - self.storage.y) as usize * self.storage.width as usize
            + (sx - self.storage.x) as usize;
        self.data.get(idx).copied().unwrap_or(Rgba::TRANSPARENT)
    }

    /// Read one pixel, resolving positions outside the abyss rectangle
    /// with `abyss`.
    #[inline]
    pub fn fetch(&self, x: i32, y: i32, abyss: AbyssPolicy) -> Rgba {
        match abyss.resolve(x, y, &self.abyss_rect) {
            AbyssRead::Pixel(px, py) => self.stored(px, py),
            AbyssRead::Constant(c) => c,
        }
    }

    /// Read one pixel with the buffer's own abyss policy.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Rgba {
        self.fetch(x, y, self.abyss)
    }

    /// Contiguous stored run `[x, x+len)` of row `y`, if it is entirely
    /// inside both storage and the abyss rectangle.
    pub fn row_span(&self, x: i32, y: i32, len: i32) -> Option<&[Rgba]> {
        let run = Rectangle::new(x, y, len, 1);
        if len <= 0 || !self.abyss_rect.contains(&run) {
            return None;
        }
        let stored = run.translate(-self.shift_x, -self.shift_y);
        if !self.storage.contains(&stored) {
            return None;
        }
        let start = (stored.y - self.storage.y) as usize * self.storage.width as usize
            + (stored.x - self.storage.x) as usize;
        self.data.get(start..start + len as usize)
    }

    /// Copy `rect` out in row-major order using the buffer's abyss policy.
    pub fn get(&self, rect: Rectangle) -> Vec<Rgba> {
        let mut out = Vec::with_capacity(rect.area());
        if rect.is_empty() {
            return out;
        }
        for y in rect.y..rect.y2() {
            match self.row_span(rect.x, y, rect.width) {
                Some(row) => out.extend_from_slice(row),
                None => out.extend((rect.x..rect.x2()).map(|x| self.pixel(x, y))),
            }
        }
        out
    }

    /// Export `rect` as straight 8-bit RGBA bytes.
    pub fn to_rgba8(&self, rect: Rectangle) -> Vec<u8> {
        self.get(rect)
            .iter()
            .flat_map(|p| {
                let c = Rgba8::from_rgba(p);
                [c.r, c.g, c.b, c.a]
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Write row-major `pixels` into `rect`. Positions outside the storage
    /// are dropped. Shared storage is copied before writing.
    pub fn set(&mut self, rect: Rectangle, pixels: &[Rgba]) -> TransformResult<()> {
        if pixels.len() != rect.area() {
            return Err(TransformError::BufferSize {
                expected: rect.area(),
                actual: pixels.len(),
            });
        }
        let target = rect.translate(-self.shift_x, -self.shift_y).intersect(&self.storage);
        if target.is_empty() {
            return Ok(());
        }
        let storage = self.storage;
        let data = Arc::make_mut(&mut self.data);
        for sy in target.y..target.y2() {
            let src_row = (sy + self.shift_y - rect.y) as usize * rect.width as usize;
            let src_start = src_row + (target.x + self.shift_x - rect.x) as usize;
            let dst_start = (sy - storage.y) as usize * storage.width as usize
                + (target.x - storage.x) as usize;
            let len = target.width as usize;
            data[dst_start..dst_start + len].copy_from_slice(&pixels[src_start..src_start + len]);
        }
        Ok(())
    }
}
