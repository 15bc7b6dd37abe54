use crate::geometry::{Point, Rect, SurfaceSize};
use crate::render::backend::{Clip, DrawContext, PixelFormat, RenderBackend, RgbaImage, TextRun};
use crate::render::{Color, FontId, ImageId};
use anyhow::{anyhow, Result};

/// One primitive call received by the [`NullBackend`], with the clip that was
/// active for it.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clip(Clip),
    Line { clip: Clip, from: Point, to: Point, color: Color },
    Curve { clip: Clip, from: Point, ctrl: [Point; 2], to: Point, color: Color },
    Rect { clip: Clip, rect: Rect, rounding: f32, color: Color },
    Circle { clip: Clip, rect: Rect, color: Color },
    Triangle { clip: Clip, points: [Point; 3], color: Color },
    Text { clip: Clip, rect: Rect, text: String, font: Option<FontId> },
    Image { clip: Clip, rect: Rect, image: ImageId },
}

impl DrawCall {
    pub fn kind(&self) -> &'static str {
        match self {
            DrawCall::Clip(_) => "clip",
            DrawCall::Line { .. } => "line",
            DrawCall::Curve { .. } => "curve",
            DrawCall::Rect { .. } => "rect",
            DrawCall::Circle { .. } => "circle",
            DrawCall::Triangle { .. } => "triangle",
            DrawCall::Text { .. } => "text",
            DrawCall::Image { .. } => "image",
        }
    }

    /// The clip that bounded this call.
    pub fn clip(&self) -> Clip {
        match self {
            DrawCall::Clip(clip)
            | DrawCall::Line { clip, .. }
            | DrawCall::Curve { clip, .. }
            | DrawCall::Rect { clip, .. }
            | DrawCall::Circle { clip, .. }
            | DrawCall::Triangle { clip, .. }
            | DrawCall::Text { clip, .. }
            | DrawCall::Image { clip, .. } => *clip,
        }
    }
}

/// Backend that draws nothing and records every primitive it receives.
///
/// Useful for tracing what a toolkit emits and for checking dispatch order
/// without a window system.
pub struct NullBackend {
    size: SurfaceSize,
    calls: Vec<DrawCall>,
    fail_on: Option<&'static str>,
    frame_id: u64,
    presented: u64,
    reallocations: u64,
}

impl NullBackend {
    /// Creates a new instance of the null backend.
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            calls: Vec::new(),
            fail_on: None,
            frame_id: 0,
            presented: 0,
            reallocations: 0,
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn reset_calls(&mut self) {
        self.calls.clear();
    }

    /// Makes every primitive of the given kind fail, for exercising error paths.
    pub fn fail_on(&mut self, kind: &'static str) {
        self.fail_on = Some(kind);
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    fn record(&mut self, call: DrawCall) -> Result<()> {
        if self.fail_on == Some(call.kind()) {
            return Err(anyhow!("NullBackend configured to fail on {}", call.kind()));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &str {
        "NullBackend"
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<()> {
        if self.size != size {
            self.size = size;
            self.reallocations += 1;
        }
        Ok(())
    }

    fn clear(&mut self, _color: Color) -> Result<()> {
        Ok(())
    }

    fn begin_frame(&mut self, _ctx: &DrawContext) -> Result<()> {
        Ok(())
    }

    fn set_clip(&mut self, ctx: &DrawContext) -> Result<()> {
        self.record(DrawCall::Clip(ctx.clip))
    }

    fn stroke_line(&mut self, ctx: &DrawContext, from: Point, to: Point, color: Color) -> Result<()> {
        self.record(DrawCall::Line {
            clip: ctx.clip,
            from,
            to,
            color,
        })
    }

    fn stroke_curve(&mut self, ctx: &DrawContext, from: Point, ctrl: [Point; 2], to: Point, color: Color) -> Result<()> {
        self.record(DrawCall::Curve {
            clip: ctx.clip,
            from,
            ctrl,
            to,
            color,
        })
    }

    fn fill_rect(&mut self, ctx: &DrawContext, rect: Rect, rounding: f32, color: Color) -> Result<()> {
        self.record(DrawCall::Rect {
            clip: ctx.clip,
            rect,
            rounding,
            color,
        })
    }

    fn fill_circle(&mut self, ctx: &DrawContext, rect: Rect, color: Color) -> Result<()> {
        self.record(DrawCall::Circle {
            clip: ctx.clip,
            rect,
            color,
        })
    }

    fn fill_triangle(&mut self, ctx: &DrawContext, points: [Point; 3], color: Color) -> Result<()> {
        self.record(DrawCall::Triangle {
            clip: ctx.clip,
            points,
            color,
        })
    }

    fn draw_text(&mut self, ctx: &DrawContext, run: &TextRun<'_>) -> Result<()> {
        self.record(DrawCall::Text {
            clip: ctx.clip,
            rect: run.rect,
            text: run.text.to_string(),
            font: run.font,
        })
    }

    fn draw_image(&mut self, ctx: &DrawContext, rect: Rect, image: ImageId) -> Result<()> {
        self.record(DrawCall::Image {
            clip: ctx.clip,
            rect,
            image,
        })
    }

    fn end_frame(&mut self, _ctx: &DrawContext) -> Result<()> {
        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.presented += 1;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<RgbaImage> {
        let stride = self.size.width * 4;
        let pixels = vec![0u8; (stride * self.size.height) as usize];
        Ok(RgbaImage::from_raw(
            pixels,
            self.size.width,
            self.size.height,
            stride,
            PixelFormat::Rgba8,
        ))
    }
}
