//! Raw-surface backend.
//!
//! Draws into a CPU pixel buffer sized to the window, then hands the finished
//! frame to a [`PresentTarget`]. Fills are opaque `0x00RRGGBB` writes, as on a
//! window-system drawable; only glyph edges are blended.
//!
//! ```
//! use uibridge::geometry::{Rect, SurfaceSize};
//! use uibridge::render::backend::{DrawContext, RenderBackend};
//! use uibridge::render::backends::raster::RasterBackend;
//! use uibridge::render::present::FrameCapture;
//! use uibridge::render::Color;
//!
//! let size = SurfaceSize::new(16, 16);
//! let mut backend = RasterBackend::new(FrameCapture::new(), size).unwrap();
//! let ctx = DrawContext::new(size);
//! backend.fill_rect(&ctx, Rect::new(0.0, 0.0, 4.0, 4.0), 0.0, Color::WHITE).unwrap();
//! backend.present().unwrap();
//! assert_eq!(backend.target().pixel(1, 1), Some(0x00ff_ffff));
//! ```

pub mod font;
pub mod scanline;
pub mod surface;

pub use font::{FontdueFont, GlyphBitmap, RasterFont};
pub use surface::{PixelBox, RasterSurface};

use crate::errors::AdapterError;
use crate::font::{FontTable, UserFont};
use crate::geometry::{Point, Rect, SurfaceSize};
use crate::render::backend::{DrawContext, RenderBackend, RgbaImage, TextRun};
use crate::render::present::PresentTarget;
use crate::render::{Color, FontId, ImageId};
use anyhow::Result;
use std::rc::Rc;

/// Largest surface edge the backend will allocate.
pub const MAX_SURFACE_EDGE: u32 = 16384;

pub struct RasterBackend<T: PresentTarget> {
    // Fields drop in declaration order: fonts, surface, then the target.
    fonts: FontTable<Rc<dyn RasterFont>>,
    surface: RasterSurface,
    target: T,
    frame_id: u64,
}

impl<T: PresentTarget> RasterBackend<T> {
    pub fn new(target: T, size: SurfaceSize) -> Result<Self, AdapterError> {
        check_size(size)?;

        let surface = RasterSurface::new(size);
        log::info!("raster surface created at {}", surface.size());

        Ok(Self {
            fonts: FontTable::new(),
            surface,
            target,
            frame_id: 0,
        })
    }

    /// Registers a font and returns the descriptor to hand to the toolkit.
    pub fn add_font<F: RasterFont + 'static>(&mut self, font: F) -> UserFont {
        let font = Rc::new(font);
        let id = self.fonts.insert(Rc::clone(&font) as Rc<dyn RasterFont>);
        log::debug!("registered raster font {id:?} (line height {})", font.line_height());
        UserFont::new(id, font)
    }

    pub fn remove_font(&mut self, id: FontId) -> bool {
        self.fonts.remove(id).is_some()
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Releases fonts, the surface and finally the present target.
    pub fn shutdown(self) {
        log::info!("raster backend shutting down after {} frames", self.frame_id);
        let Self {
            mut fonts,
            surface,
            target,
            ..
        } = self;
        fonts.clear();
        drop(fonts);
        drop(surface);
        drop(target);
    }

    /// Pixel box that bounds drawing under `ctx`, or `None` when nothing can be drawn.
    fn clip_box(&self, ctx: &DrawContext) -> Option<PixelBox> {
        let bounds = ctx.clip_bounds()?;
        let pb = PixelBox::from_rect(&bounds).intersect(&self.surface.bounds());
        (!pb.is_empty()).then_some(pb)
    }

    fn fill_box(&mut self, clip: &PixelBox, rect: &Rect, rgb: u32) {
        let pb = PixelBox::from_rect(rect).intersect(clip);
        for y in pb.y0..pb.y1 {
            self.surface.span(&pb, y, pb.x0, pb.x1, rgb);
        }
    }

    fn fill_rounded(&mut self, clip: &PixelBox, rect: &Rect, r: f32, rgb: u32) {
        let Rect { x, y, w, h } = *rect;
        let d = 2.0 * r;

        // Cross shaped centre, corners cut out.
        let cross = [
            Point::new(x, y + r),
            Point::new(x + r, y + r),
            Point::new(x + r, y),
            Point::new(x + w - r, y),
            Point::new(x + w - r, y + r),
            Point::new(x + w, y + r),
            Point::new(x + w, y + h - r),
            Point::new(x + w - r, y + h - r),
            Point::new(x + w - r, y + h),
            Point::new(x + r, y + h),
            Point::new(x + r, y + h - r),
            Point::new(x, y + h - r),
        ];
        let surface = &mut self.surface;
        scanline::fill_polygon(&cross, clip, |row, a, b| surface.span(clip, row, a, b, rgb));

        let corners = [
            (Rect::new(x + w - d, y, d, d), 0.0),
            (Rect::new(x, y, d, d), 90.0),
            (Rect::new(x, y + h - d, d, d), 180.0),
            (Rect::new(x + w - d, y + h - d, d, d), -90.0),
        ];
        for (bounds, start) in corners {
            scanline::fill_arc(&bounds, start, 90.0, clip, |row, a, b| surface.span(clip, row, a, b, rgb));
        }
    }
}

fn check_size(size: SurfaceSize) -> Result<(), AdapterError> {
    if size.width > MAX_SURFACE_EDGE || size.height > MAX_SURFACE_EDGE {
        return Err(AdapterError::SurfaceCreation(format!(
            "surface {size} exceeds {MAX_SURFACE_EDGE}px per edge"
        )));
    }
    Ok(())
}

impl<T: PresentTarget> RenderBackend for RasterBackend<T> {
    fn name(&self) -> &str {
        "RasterBackend"
    }

    fn size(&self) -> SurfaceSize {
        self.surface.size()
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<()> {
        check_size(size)?;
        if self.surface.resize(size) {
            log::debug!("raster surface reallocated at {}", self.surface.size());
        }
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        self.surface.fill(color.to_rgb24());
        Ok(())
    }

    fn begin_frame(&mut self, _ctx: &DrawContext) -> Result<()> {
        Ok(())
    }

    fn stroke_line(&mut self, ctx: &DrawContext, from: Point, to: Point, color: Color) -> Result<()> {
        let Some(clip) = self.clip_box(ctx) else {
            return Ok(());
        };
        let rgb = color.to_rgb24();
        let surface = &mut self.surface;
        scanline::line(from, to, &clip, |x, y| surface.plot(&clip, x, y, rgb));
        Ok(())
    }

    fn stroke_curve(&mut self, ctx: &DrawContext, from: Point, ctrl: [Point; 2], to: Point, color: Color) -> Result<()> {
        let Some(clip) = self.clip_box(ctx) else {
            return Ok(());
        };
        let rgb = color.to_rgb24();
        let points = scanline::flatten_cubic(from, ctrl, to);
        let surface = &mut self.surface;
        for seg in points.windows(2) {
            scanline::line(seg[0], seg[1], &clip, |x, y| surface.plot(&clip, x, y, rgb));
        }
        Ok(())
    }

    fn fill_rect(&mut self, ctx: &DrawContext, rect: Rect, rounding: f32, color: Color) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        let Some(clip) = self.clip_box(ctx) else {
            return Ok(());
        };

        let rgb = color.to_rgb24();
        let r = rounding.min(rect.w / 2.0).min(rect.h / 2.0);
        if r > 0.0 {
            self.fill_rounded(&clip, &rect, r, rgb);
        } else {
            self.fill_box(&clip, &rect, rgb);
        }
        Ok(())
    }

    fn fill_circle(&mut self, ctx: &DrawContext, rect: Rect, color: Color) -> Result<()> {
        let Some(clip) = self.clip_box(ctx) else {
            return Ok(());
        };
        let rgb = color.to_rgb24();
        let surface = &mut self.surface;
        scanline::fill_arc(&rect, 0.0, 360.0, &clip, |y, a, b| surface.span(&clip, y, a, b, rgb));
        Ok(())
    }

    fn fill_triangle(&mut self, ctx: &DrawContext, points: [Point; 3], color: Color) -> Result<()> {
        let Some(clip) = self.clip_box(ctx) else {
            return Ok(());
        };
        let rgb = color.to_rgb24();
        let surface = &mut self.surface;
        scanline::fill_polygon(&points, &clip, |y, a, b| surface.span(&clip, y, a, b, rgb));
        Ok(())
    }

    fn draw_text(&mut self, ctx: &DrawContext, run: &TextRun<'_>) -> Result<()> {
        if run.rect.is_empty() {
            return Ok(());
        }
        let Some(clip) = self.clip_box(ctx) else {
            return Ok(());
        };

        self.fill_box(&clip, &run.rect, run.background.to_rgb24());
        if run.text.is_empty() {
            return Ok(());
        }
        let Some(font) = run.font.and_then(|id| self.fonts.get(id)).map(Rc::clone) else {
            log::debug!("text {:?} skipped: font {:?} not registered", run.text, run.font);
            return Ok(());
        };

        let fg = run.foreground.to_rgb24();
        let x = run.rect.x.floor() as i32;
        let y = run.rect.y.floor() as i32;
        let h = run.rect.h.floor() as i32;
        let th = font.ascent().saturating_add(font.descent());
        // Coordinates far off the surface saturate instead of wrapping.
        let baseline = y
            .saturating_add(h / 2)
            .saturating_sub(th / 2)
            .saturating_add(font.ascent());

        let mut pen = x as f32;
        for ch in run.text.chars() {
            if pen >= clip.x1 as f32 {
                break;
            }
            if let Some(glyph) = font.glyph(ch) {
                let gx = (pen.floor() as i32).saturating_add(glyph.left);
                let gy = baseline.saturating_add(glyph.top);
                for (row, line) in glyph.coverage.chunks_exact(glyph.width.max(1)).enumerate() {
                    for (col, &c) in line.iter().enumerate() {
                        let px = gx.saturating_add(col as i32);
                        let py = gy.saturating_add(row as i32);
                        self.surface.blend(&clip, px, py, fg, c);
                    }
                }
            }
            pen += font.advance(ch);
        }
        Ok(())
    }

    fn draw_image(&mut self, _ctx: &DrawContext, _rect: Rect, image: ImageId) -> Result<()> {
        log::debug!("raster backend cannot draw images, skipping {image:?}");
        Ok(())
    }

    fn end_frame(&mut self, _ctx: &DrawContext) -> Result<()> {
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let frame = self.surface.frame(self.frame_id);
        self.target.present(&frame)?;
        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }

    fn snapshot(&mut self) -> Result<RgbaImage> {
        Ok(RgbaImage::from_rgb24(self.surface.pixels(), self.surface.size()))
    }
}
