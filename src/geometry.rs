//! Geometry shared by drawing commands and backends.
//!
//! All coordinates are in surface pixels with `(0, 0)` at the top-left corner,
//! `x` growing to the right and `y` growing downwards.
//!
//! ```
//! use uibridge::geometry::{Rect, SurfaceSize};
//!
//! let clip = Rect::new(10.0, 10.0, 100.0, 50.0);
//! let surface = SurfaceSize::new(64, 64).as_rect();
//! let visible = clip.intersect(&surface).unwrap();
//! assert_eq!(visible, Rect::new(10.0, 10.0, 54.0, 50.0));
//! ```

/// A point in surface coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its top-left corner and its size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Horizontal offset of the top-left corner.
    pub x: f32,
    /// Vertical offset of the top-left corner.
    pub y: f32,
    /// Width in pixels.
    pub w: f32,
    /// Height in pixels.
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// True when the rectangle covers no area. NaN sizes count as empty.
    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Returns the overlapping part of both rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());

        let r = Rect::new(x0, y0, x1 - x0, y1 - y0);
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

/// Size of a surface in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in a surface of this size.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The full surface as a rectangle anchored at the origin.
    pub fn as_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }

    /// Same size with both dimensions raised to at least one pixel.
    pub fn at_least_one(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }
}

impl std::fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
