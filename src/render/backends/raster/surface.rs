//! Offscreen pixel surface of the raster backend.

use crate::geometry::{Rect, SurfaceSize};
use crate::render::present::Frame;

/// Index of the first pixel whose centre lies at or past `v`.
///
/// Spans built from two edges `[edge(a), edge(b))` cover exactly the pixels
/// whose centres fall inside `[a, b)`, so adjacent shapes neither overlap nor
/// leave gaps.
pub(crate) fn edge(v: f32) -> i32 {
    (v - 0.5).ceil() as i32
}

/// Half-open box of pixel indices, `x0..x1` by `y0..y1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelBox {
    /// Pixels whose centres fall inside `r`.
    pub fn from_rect(r: &Rect) -> Self {
        Self {
            x0: edge(r.x),
            y0: edge(r.y),
            x1: edge(r.right()),
            y1: edge(r.bottom()),
        }
    }

    pub fn intersect(&self, other: &PixelBox) -> PixelBox {
        PixelBox {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Pixel buffer sized to the window, `0x00RRGGBB` per pixel.
pub struct RasterSurface {
    pixels: Vec<u32>,
    size: SurfaceSize,
    reallocations: u64,
}

impl RasterSurface {
    /// Allocates a surface. Zero dimensions are raised to one pixel.
    pub fn new(size: SurfaceSize) -> Self {
        let size = size.at_least_one();
        Self {
            pixels: vec![0; size.area()],
            size,
            reallocations: 0,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Replaces the backing buffer when `size` differs from the current size.
    /// Returns whether a new buffer was allocated.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        let size = size.at_least_one();
        if size == self.size {
            return false;
        }

        // Release the old buffer before allocating the new one.
        self.pixels = Vec::new();
        self.pixels = vec![0; size.area()];
        self.size = size;
        self.reallocations += 1;
        true
    }

    /// Number of buffer reallocations caused by [`resize`](Self::resize).
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels.get(y as usize * self.size.width as usize + x as usize).copied()
    }

    /// The whole surface as a pixel box.
    pub fn bounds(&self) -> PixelBox {
        PixelBox {
            x0: 0,
            y0: 0,
            x1: self.size.width as i32,
            y1: self.size.height as i32,
        }
    }

    pub fn fill(&mut self, rgb: u32) {
        self.pixels.fill(rgb);
    }

    /// Paints pixels `x0..x1` of row `y`, limited to `clip` and the surface.
    pub fn span(&mut self, clip: &PixelBox, y: i32, x0: i32, x1: i32, rgb: u32) {
        let clip = clip.intersect(&self.bounds());
        if y < clip.y0 || y >= clip.y1 {
            return;
        }
        let a = x0.max(clip.x0);
        let b = x1.min(clip.x1);
        if a >= b {
            return;
        }

        let row = y as usize * self.size.width as usize;
        self.pixels[row + a as usize..row + b as usize].fill(rgb);
    }

    pub fn plot(&mut self, clip: &PixelBox, x: i32, y: i32, rgb: u32) {
        self.span(clip, y, x, x + 1, rgb);
    }

    /// Blends `rgb` over the pixel at `(x, y)` with the given coverage.
    pub fn blend(&mut self, clip: &PixelBox, x: i32, y: i32, rgb: u32, coverage: u8) {
        if coverage == 0 || !clip.intersect(&self.bounds()).contains(x, y) {
            return;
        }
        let i = y as usize * self.size.width as usize + x as usize;
        self.pixels[i] = mix(self.pixels[i], rgb, coverage);
    }

    pub(crate) fn frame(&self, frame_id: u64) -> Frame<'_> {
        Frame {
            pixels: &self.pixels,
            size: self.size,
            frame_id,
        }
    }
}

fn mix(dst: u32, src: u32, coverage: u8) -> u32 {
    if coverage == u8::MAX {
        return src;
    }
    let a = coverage as u32;
    let channel = |shift: u32| {
        let d = (dst >> shift) & 0xff;
        let s = (src >> shift) & 0xff;
        ((s * a + d * (255 - a) + 127) / 255) << shift
    };
    channel(16) | channel(8) | channel(0)
}
