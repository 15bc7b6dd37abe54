use crate::errors::AdapterError;
use crate::geometry::{Point, Rect, SurfaceSize};
use crate::render::{Color, FontId, ImageId};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// The active clip of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Clip {
    /// Drawing is only bounded by the surface.
    #[default]
    Unbounded,
    /// Drawing is bounded by the rectangle (and the surface).
    Rect(Rect),
}

/// Drawing state owned by the dispatcher and handed to every primitive.
///
/// Backends never keep their own copy of the clip; whatever is in the context
/// at the time of a call is what bounds that call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawContext {
    pub clip: Clip,
    pub surface: SurfaceSize,
}

impl DrawContext {
    pub fn new(surface: SurfaceSize) -> Self {
        Self {
            clip: Clip::Unbounded,
            surface,
        }
    }

    pub fn reset_clip(&mut self) {
        self.clip = Clip::Unbounded;
    }

    /// The area drawing may touch: the clip intersected with the surface.
    /// `None` means nothing is drawable at all.
    pub fn clip_bounds(&self) -> Option<Rect> {
        let surface = self.surface.as_rect();
        match self.clip {
            Clip::Unbounded => surface.intersect(&surface),
            Clip::Rect(r) => r.intersect(&surface),
        }
    }
}

/// Borrowed view of a text command.
#[derive(Clone, Copy, Debug)]
pub struct TextRun<'a> {
    pub rect: Rect,
    pub text: &'a str,
    pub font: Option<FontId>,
    pub background: Color,
    pub foreground: Color,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Straight (non premultiplied) RGBA, one byte per channel.
    Rgba8,
}

/// RGBA snapshot of a backend surface.
#[derive(Clone)]
pub struct RgbaImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
}

impl RgbaImage {
    pub fn from_raw(pixels: Vec<u8>, width: u32, height: u32, stride: u32, format: PixelFormat) -> Self {
        assert!(
            pixels.len() >= (height as usize) * (stride as usize),
            "pixel buffer too small for image dimensions"
        );

        Self {
            pixels,
            width,
            height,
            stride,
            format,
        }
    }

    /// Builds an opaque image from `0x00RRGGBB` pixels laid out row by row.
    pub fn from_rgb24(pixels: &[u32], size: SurfaceSize) -> Self {
        let mut out = Vec::with_capacity(size.area() * 4);
        for px in pixels.iter().take(size.area()) {
            out.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, *px as u8, 255]);
        }
        out.resize(size.area() * 4, 0);

        Self::from_raw(out, size.width, size.height, size.width * 4, PixelFormat::Rgba8)
    }

    /// Returns the `[r, g, b, a]` bytes at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride as usize + x as usize * 4;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Encodes the image as PNG into `w`.
    pub fn write_png<W: Write>(&self, w: W) -> Result<(), AdapterError> {
        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let row = self.width as usize * 4;
        if (self.stride as usize) < row || self.pixels.len() < self.height as usize * self.stride as usize {
            return Err(AdapterError::Snapshot(format!(
                "{}x{} image with stride {} does not fit {} bytes",
                self.width,
                self.height,
                self.stride,
                self.pixels.len()
            )));
        }

        let mut writer = encoder.write_header()?;
        let mut data = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height as usize {
            let start = y * self.stride as usize;
            data.extend_from_slice(&self.pixels[start..start + row]);
        }
        writer.write_image_data(&data)?;
        writer.finish()?;
        Ok(())
    }

    /// Encodes the image as PNG into the file at `path`.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), AdapterError> {
        let file = std::fs::File::create(path)?;
        self.write_png(std::io::BufWriter::new(file))
    }
}

impl std::fmt::Debug for RgbaImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbaImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.pixels.len())
            .finish()
    }
}

/// Drawing primitives a backend provides to the dispatcher.
///
/// Calls occur on the thread that owns the backend, one frame at a time:
/// `begin_frame`, any number of primitives, `end_frame`, then `present`.
/// Primitives must treat empty geometry and unknown handles as no-ops rather
/// than errors; an `Err` is reserved for failures of the backend itself.
pub trait RenderBackend {
    fn name(&self) -> &str;

    /// Current size of the backing surface.
    fn size(&self) -> SurfaceSize;

    /// Resizes the backing surface. Requesting the current size does nothing.
    fn resize(&mut self, size: SurfaceSize) -> Result<()>;

    /// Fills the whole surface with `color`, ignoring any clip.
    fn clear(&mut self, color: Color) -> Result<()>;

    fn begin_frame(&mut self, ctx: &DrawContext) -> Result<()>;

    /// Called whenever the clip in `ctx` changes.
    fn set_clip(&mut self, _ctx: &DrawContext) -> Result<()> {
        Ok(())
    }

    fn stroke_line(&mut self, ctx: &DrawContext, from: Point, to: Point, color: Color) -> Result<()>;

    fn stroke_curve(&mut self, ctx: &DrawContext, from: Point, ctrl: [Point; 2], to: Point, color: Color) -> Result<()>;

    fn fill_rect(&mut self, ctx: &DrawContext, rect: Rect, rounding: f32, color: Color) -> Result<()>;

    fn fill_circle(&mut self, ctx: &DrawContext, rect: Rect, color: Color) -> Result<()>;

    fn fill_triangle(&mut self, ctx: &DrawContext, points: [Point; 3], color: Color) -> Result<()>;

    fn draw_text(&mut self, ctx: &DrawContext, run: &TextRun<'_>) -> Result<()>;

    fn draw_image(&mut self, ctx: &DrawContext, rect: Rect, image: ImageId) -> Result<()>;

    fn end_frame(&mut self, ctx: &DrawContext) -> Result<()>;

    /// Copies the finished frame to the visible window.
    fn present(&mut self) -> Result<()>;

    /// Generate an RGBA8 snapshot of the surface.
    fn snapshot(&mut self) -> Result<RgbaImage>;
}
