use crate::errors::AdapterError;
use crate::font::{FontMetrics, FontTable, UserFont};
use crate::geometry::{Point, Rect, SurfaceSize};
use crate::render::backend::{DrawContext, RenderBackend, RgbaImage, TextRun};
use crate::render::present::{Frame, PresentTarget};
use crate::render::{Color, FontId, ImageId};
use anyhow::Result;
use hashbrown::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

/// Font face used by the cairo backend, measured through cairo's toy text API.
pub struct CairoFont {
    family: String,
    size: f32,
    ascent: f32,
    descent: f32,
    measure: cairo::Context,
}

impl CairoFont {
    pub fn new(family: &str, size: f32) -> Result<Self, AdapterError> {
        if !(size.is_finite() && size > 0.0) {
            return Err(AdapterError::FontLoad(format!("invalid font size {size}")));
        }

        // Measurement needs a context but never draws, a 1x1 surface will do.
        let scratch = cairo::ImageSurface::create(cairo::Format::ARgb32, 1, 1)
            .map_err(|e| AdapterError::FontLoad(e.to_string()))?;
        let measure = cairo::Context::new(&scratch).map_err(|e| AdapterError::FontLoad(e.to_string()))?;
        measure.select_font_face(family, cairo::FontSlant::Normal, cairo::FontWeight::Normal);
        measure.set_font_size(size as f64);

        let extents = measure.font_extents().map_err(|e| AdapterError::FontLoad(e.to_string()))?;

        Ok(Self {
            family: family.to_string(),
            size,
            ascent: extents.ascent() as f32,
            descent: extents.descent() as f32,
            measure,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    fn apply(&self, cr: &cairo::Context, height: f32) {
        let size = if height > 0.0 { height } else { self.size };
        cr.select_font_face(&self.family, cairo::FontSlant::Normal, cairo::FontWeight::Normal);
        cr.set_font_size(size as f64);
    }
}

impl FontMetrics for CairoFont {
    fn text_width(&self, height: f32, text: &str) -> f32 {
        self.apply(&self.measure, height);
        match self.measure.text_extents(text) {
            Ok(extents) => extents.x_advance() as f32,
            Err(e) => {
                log::debug!("could not measure {text:?} in {}: {e}", self.family);
                0.0
            }
        }
    }

    fn line_height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Vector backend drawing into a cairo image surface.
pub struct CairoBackend<T: PresentTarget> {
    // Fields drop in declaration order: fonts and images, the context, the
    // surface, then the present target.
    fonts: FontTable<Rc<CairoFont>>,
    images: HashMap<ImageId, cairo::ImageSurface>,
    next_image: u32,
    cr: Option<cairo::Context>,
    surface: cairo::ImageSurface,
    pixels: Vec<u32>,
    target: T,
    size: SurfaceSize,
    frame_id: u64,
    reallocations: u64,
}

impl<T: PresentTarget> CairoBackend<T> {
    pub fn new(target: T, size: SurfaceSize) -> Result<Self, AdapterError> {
        let size = size.at_least_one();
        let surface = create_surface(size)?;
        log::info!("cairo surface created at {size}");

        Ok(Self {
            fonts: FontTable::new(),
            images: HashMap::new(),
            next_image: 1,
            cr: None,
            surface,
            pixels: Vec::new(),
            target,
            size,
            frame_id: 0,
            reallocations: 0,
        })
    }

    pub fn add_font(&mut self, font: CairoFont) -> UserFont {
        let font = Rc::new(font);
        let id = self.fonts.insert(Rc::clone(&font));
        log::debug!("registered cairo font {id:?} ({} {}px)", font.family(), font.size());
        UserFont::new(id, font)
    }

    pub fn remove_font(&mut self, id: FontId) -> bool {
        self.fonts.remove(id).is_some()
    }

    /// Registers an image surface for use by image commands.
    pub fn add_image(&mut self, image: cairo::ImageSurface) -> ImageId {
        let id = ImageId(self.next_image);
        self.next_image += 1;
        self.images.insert(id, image);
        id
    }

    pub fn remove_image(&mut self, id: ImageId) -> bool {
        self.images.remove(&id).is_some()
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    /// Releases fonts and images, then the surface and the present target.
    pub fn shutdown(self) {
        log::info!("cairo backend shutting down after {} frames", self.frame_id);
        drop(self);
    }

    /// Runs `draw` on a saved context clipped to the active clip.
    fn with_context<F>(&mut self, ctx: &DrawContext, draw: F) -> Result<()>
    where
        F: FnOnce(&cairo::Context) -> Result<(), cairo::Error>,
    {
        let Some(bounds) = ctx.clip_bounds() else {
            return Ok(());
        };
        let cr = match &self.cr {
            Some(cr) => cr.clone(),
            None => cairo::Context::new(&self.surface)?,
        };

        cr.save()?;
        cr.rectangle(bounds.x as f64, bounds.y as f64, bounds.w as f64, bounds.h as f64);
        cr.clip();
        let result = draw(&cr);
        cr.restore()?;
        Ok(result?)
    }

    /// Copies the surface into `pixels` as `0x00RRGGBB`.
    fn read_back(&mut self) -> Result<()> {
        self.surface.flush();

        let width = self.size.width as usize;
        let height = self.size.height as usize;
        let stride = self.surface.stride() as usize;
        let pixels = &mut self.pixels;
        pixels.clear();
        pixels.reserve(width * height);

        self.surface.with_data(|data| {
            for row in data.chunks(stride).take(height) {
                for px in row[..width * 4].chunks_exact(4) {
                    let argb = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
                    pixels.push(argb & 0x00ff_ffff);
                }
            }
        })?;
        Ok(())
    }
}

fn create_surface(size: SurfaceSize) -> Result<cairo::ImageSurface, AdapterError> {
    cairo::ImageSurface::create(cairo::Format::ARgb32, size.width as i32, size.height as i32)
        .map_err(|e| AdapterError::SurfaceCreation(format!("cairo surface {size}: {e}")))
}

fn set_color(cr: &cairo::Context, color: Color) {
    cr.set_source_rgba(color.r as f64, color.g as f64, color.b as f64, color.a as f64);
}

fn rounded_rect(cr: &cairo::Context, rect: &Rect, radius: f64) {
    let (x, y, w, h) = (rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
    cr.new_sub_path();
    cr.arc(x + w - radius, y + radius, radius, -FRAC_PI_2, 0.0);
    cr.arc(x + w - radius, y + h - radius, radius, 0.0, FRAC_PI_2);
    cr.arc(x + radius, y + h - radius, radius, FRAC_PI_2, PI);
    cr.arc(x + radius, y + radius, radius, PI, 3.0 * FRAC_PI_2);
    cr.close_path();
}

impl<T: PresentTarget> RenderBackend for CairoBackend<T> {
    fn name(&self) -> &str {
        "CairoBackend"
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<()> {
        let size = size.at_least_one();
        if size == self.size {
            return Ok(());
        }

        self.cr = None;
        self.surface = create_surface(size)?;
        self.size = size;
        self.reallocations += 1;
        log::debug!("cairo surface reallocated at {size}");
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let cr = cairo::Context::new(&self.surface)?;
        cr.set_operator(cairo::Operator::Source);
        set_color(&cr, color);
        cr.paint()?;
        Ok(())
    }

    fn begin_frame(&mut self, _ctx: &DrawContext) -> Result<()> {
        self.cr = Some(cairo::Context::new(&self.surface)?);
        Ok(())
    }

    fn stroke_line(&mut self, ctx: &DrawContext, from: Point, to: Point, color: Color) -> Result<()> {
        self.with_context(ctx, |cr| {
            set_color(cr, color);
            cr.set_line_width(1.0);
            cr.move_to(from.x as f64 + 0.5, from.y as f64 + 0.5);
            cr.line_to(to.x as f64 + 0.5, to.y as f64 + 0.5);
            cr.stroke()
        })
    }

    fn stroke_curve(&mut self, ctx: &DrawContext, from: Point, ctrl: [Point; 2], to: Point, color: Color) -> Result<()> {
        self.with_context(ctx, |cr| {
            set_color(cr, color);
            cr.set_line_width(1.0);
            cr.move_to(from.x as f64 + 0.5, from.y as f64 + 0.5);
            cr.curve_to(
                ctrl[0].x as f64 + 0.5,
                ctrl[0].y as f64 + 0.5,
                ctrl[1].x as f64 + 0.5,
                ctrl[1].y as f64 + 0.5,
                to.x as f64 + 0.5,
                to.y as f64 + 0.5,
            );
            cr.stroke()
        })
    }

    fn fill_rect(&mut self, ctx: &DrawContext, rect: Rect, rounding: f32, color: Color) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        let radius = rounding.min(rect.w / 2.0).min(rect.h / 2.0);

        self.with_context(ctx, |cr| {
            set_color(cr, color);
            if radius > 0.0 {
                rounded_rect(cr, &rect, radius as f64);
            } else {
                cr.rectangle(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
            }
            cr.fill()
        })
    }

    fn fill_circle(&mut self, ctx: &DrawContext, rect: Rect, color: Color) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }

        self.with_context(ctx, |cr| {
            set_color(cr, color);
            cr.save()?;
            cr.translate((rect.x + rect.w / 2.0) as f64, (rect.y + rect.h / 2.0) as f64);
            cr.scale(rect.w as f64 / 2.0, rect.h as f64 / 2.0);
            cr.arc(0.0, 0.0, 1.0, 0.0, 2.0 * PI);
            cr.restore()?;
            cr.fill()
        })
    }

    fn fill_triangle(&mut self, ctx: &DrawContext, points: [Point; 3], color: Color) -> Result<()> {
        self.with_context(ctx, |cr| {
            set_color(cr, color);
            cr.move_to(points[0].x as f64, points[0].y as f64);
            cr.line_to(points[1].x as f64, points[1].y as f64);
            cr.line_to(points[2].x as f64, points[2].y as f64);
            cr.close_path();
            cr.fill()
        })
    }

    fn draw_text(&mut self, ctx: &DrawContext, run: &TextRun<'_>) -> Result<()> {
        if run.rect.is_empty() {
            return Ok(());
        }
        let font = run.font.and_then(|id| self.fonts.get(id)).map(Rc::clone);
        if font.is_none() && !run.text.is_empty() {
            log::debug!("text {:?} skipped: font {:?} not registered", run.text, run.font);
        }

        let rect = run.rect;
        self.with_context(ctx, |cr| {
            set_color(cr, run.background);
            cr.rectangle(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
            cr.fill()?;

            let Some(font) = font.filter(|_| !run.text.is_empty()) else {
                return Ok(());
            };
            font.apply(cr, run.height);
            let extents = cr.font_extents()?;
            let th = extents.ascent() + extents.descent();
            let baseline = rect.y as f64 + rect.h as f64 / 2.0 - th / 2.0 + extents.ascent();

            set_color(cr, run.foreground);
            cr.move_to(rect.x as f64, baseline);
            cr.show_text(run.text)
        })
    }

    fn draw_image(&mut self, ctx: &DrawContext, rect: Rect, image: ImageId) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        let Some(source) = self.images.get(&image).cloned() else {
            log::debug!("image {image:?} not registered, skipping");
            return Ok(());
        };

        self.with_context(ctx, |cr| {
            cr.set_source_surface(&source, rect.x as f64, rect.y as f64)?;
            cr.rectangle(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
            cr.fill()
        })
    }

    fn end_frame(&mut self, _ctx: &DrawContext) -> Result<()> {
        self.cr = None;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.read_back()?;
        let frame = Frame {
            pixels: &self.pixels,
            size: self.size,
            frame_id: self.frame_id,
        };
        self.target.present(&frame)?;
        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }

    fn snapshot(&mut self) -> Result<RgbaImage> {
        self.read_back()?;
        Ok(RgbaImage::from_rgb24(&self.pixels, self.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::present::FrameCapture;
    use crate::render::{Command, CommandBuffer, Dispatcher};

    const BG: u32 = 0x0030_3030;

    fn backend(w: u32, h: u32) -> CairoBackend<FrameCapture> {
        let mut b = CairoBackend::new(FrameCapture::new(), SurfaceSize::new(w, h)).unwrap();
        b.clear(Color::from_rgb24(BG)).unwrap();
        b
    }

    fn run(b: &mut CairoBackend<FrameCapture>, commands: Vec<Command>) {
        let mut buffer: CommandBuffer = commands.into_iter().collect();
        Dispatcher::new().dispatch(&mut buffer, b);
        b.present().unwrap();
    }

    fn red() -> Color {
        Color::from_u8(255, 0, 0, 255)
    }

    #[test]
    fn clear_and_present() {
        let mut b = backend(4, 4);
        b.present().unwrap();
        assert_eq!(b.target().presented(), 1);
        assert!(b.target().pixels().iter().all(|p| *p == BG));
    }

    #[test]
    fn scissor_bounds_fill() {
        let mut b = backend(20, 20);
        run(
            &mut b,
            vec![
                Command::Scissor {
                    rect: Rect::new(5.0, 5.0, 5.0, 5.0),
                },
                Command::Rect {
                    rect: Rect::new(0.0, 0.0, 20.0, 20.0),
                    rounding: 0.0,
                    color: red(),
                },
            ],
        );

        assert_eq!(b.target().pixel(7, 7), Some(0x00ff_0000));
        assert_eq!(b.target().pixel(2, 2), Some(BG));
        assert_eq!(b.target().pixel(12, 12), Some(BG));
    }

    #[test]
    fn rounded_corners_leave_background() {
        let mut b = backend(40, 40);
        run(
            &mut b,
            vec![Command::Rect {
                rect: Rect::new(10.0, 10.0, 20.0, 20.0),
                rounding: 5.0,
                color: red(),
            }],
        );

        assert_eq!(b.target().pixel(10, 10), Some(BG));
        assert_eq!(b.target().pixel(20, 20), Some(0x00ff_0000));
    }

    #[test]
    fn image_is_composited_at_rect_origin() {
        let mut b = backend(8, 8);
        let image = cairo::ImageSurface::create(cairo::Format::ARgb32, 2, 2).unwrap();
        {
            let cr = cairo::Context::new(&image).unwrap();
            cr.set_source_rgb(0.0, 0.0, 1.0);
            cr.paint().unwrap();
        }
        let id = b.add_image(image);

        run(
            &mut b,
            vec![
                Command::Image {
                    rect: Rect::new(1.0, 1.0, 4.0, 4.0),
                    image: id,
                },
                Command::Image {
                    rect: Rect::new(5.0, 5.0, 2.0, 2.0),
                    image: ImageId(99),
                },
            ],
        );

        assert_eq!(b.target().pixel(1, 1), Some(0x0000_00ff));
        assert_eq!(b.target().pixel(2, 2), Some(0x0000_00ff));
        assert_eq!(b.target().pixel(3, 3), Some(BG));
        assert_eq!(b.target().pixel(5, 5), Some(BG));
    }

    #[test]
    fn resize_same_size_keeps_surface() {
        let mut b = backend(8, 8);
        b.resize(SurfaceSize::new(8, 8)).unwrap();
        b.resize(SurfaceSize::new(10, 6)).unwrap();
        b.resize(SurfaceSize::new(10, 6)).unwrap();
        assert_eq!(b.reallocations(), 1);
        assert_eq!(b.snapshot().unwrap().pixel(9, 5).map(|p| p[3]), Some(255));
    }

    #[test]
    fn font_measurement_is_monotonic() {
        let mut b = backend(8, 8);
        let font = b.add_font(CairoFont::new("Sans", 13.0).unwrap());

        assert_eq!(font.text_width(13.0, ""), 0.0);
        assert!(font.text_width(13.0, "iiii") >= font.text_width(13.0, "ii"));
        assert!(CairoFont::new("Sans", -1.0).is_err());
    }

    fn count(b: &CairoBackend<FrameCapture>, rgb: u32) -> usize {
        b.target().pixels().iter().filter(|p| **p == rgb).count()
    }

    fn text(rect: Rect, text: &str, font: Option<FontId>) -> Command {
        Command::Text {
            rect,
            text: text.into(),
            font,
            background: red(),
            foreground: Color::WHITE,
            height: 13.0,
        }
    }

    #[test]
    fn empty_text_paints_background_only() {
        let mut b = backend(20, 20);
        let font = b.add_font(CairoFont::new("Sans", 13.0).unwrap());
        run(&mut b, vec![text(Rect::new(2.0, 2.0, 10.0, 10.0), "", Some(font.handle()))]);

        assert_eq!(count(&b, 0x00ff_0000), 100);
        assert_eq!(count(&b, BG), 300);
    }

    #[test]
    fn text_without_font_paints_background() {
        let mut b = backend(8, 8);
        run(
            &mut b,
            vec![
                text(Rect::new(0.0, 0.0, 8.0, 8.0), "hello", Some(FontId(42))),
                text(Rect::new(0.0, 0.0, 8.0, 8.0), "hello", None),
            ],
        );
        assert_eq!(count(&b, 0x00ff_0000), 64);
    }

    #[test]
    fn circle_and_triangle_are_clipped() {
        let mut b = backend(20, 40);
        run(
            &mut b,
            vec![
                Command::Scissor {
                    rect: Rect::new(0.0, 0.0, 10.0, 40.0),
                },
                Command::Circle {
                    rect: Rect::new(0.0, 0.0, 20.0, 20.0),
                    color: red(),
                },
                Command::Triangle {
                    a: Point::new(0.0, 20.0),
                    b: Point::new(20.0, 20.0),
                    c: Point::new(0.0, 40.0),
                    color: red(),
                },
            ],
        );

        let px = |x, y| b.target().pixel(x, y);
        assert_eq!(px(5, 10), Some(0x00ff_0000));
        assert_eq!(px(15, 10), Some(BG));
        assert_eq!(px(0, 0), Some(BG));
        assert_eq!(px(8, 25), Some(0x00ff_0000));
        assert_eq!(px(12, 22), Some(BG));
        assert_eq!(px(9, 38), Some(BG));
    }

    #[test]
    fn line_and_curve_are_stroked() {
        let mut b = backend(20, 20);
        run(
            &mut b,
            vec![
                Command::Line {
                    from: Point::new(0.0, 0.0),
                    to: Point::new(9.0, 0.0),
                    color: red(),
                },
                Command::Curve {
                    from: Point::new(0.0, 10.0),
                    ctrl: [Point::new(5.0, 10.0), Point::new(10.0, 10.0)],
                    to: Point::new(15.0, 10.0),
                    color: red(),
                },
            ],
        );

        assert_eq!(b.target().pixel(4, 0), Some(0x00ff_0000));
        assert_eq!(b.target().pixel(4, 1), Some(BG));
        // Curves are flattened by cairo, so allow a trace of antialiasing.
        let green = b.target().pixel(7, 10).map(|p| (p >> 8) & 0xff);
        assert!(matches!(green, Some(g) if g < 0x08));
        assert_eq!(b.target().pixel(18, 10), Some(BG));
    }

    #[test]
    fn rounded_rect_agrees_with_raster_backend() {
        use crate::render::backends::raster::RasterBackend;

        let rect = Command::Rect {
            rect: Rect::new(10.0, 10.0, 20.0, 20.0),
            rounding: 5.0,
            color: red(),
        };
        let mut vector = backend(40, 40);
        run(&mut vector, vec![rect.clone()]);

        let mut raster = RasterBackend::new(FrameCapture::new(), SurfaceSize::new(40, 40)).unwrap();
        raster.clear(Color::from_rgb24(BG)).unwrap();
        let mut buffer: CommandBuffer = vec![rect].into_iter().collect();
        Dispatcher::new().dispatch(&mut buffer, &mut raster);

        // At least half covered: green drops below half of the background's.
        let painted = |rgb: u32| ((rgb >> 8) & 0xff) <= 0x18;
        let mask: Vec<bool> = raster.surface().pixels().iter().map(|p| *p == 0x00ff_0000).collect();
        let at = |x: i32, y: i32| mask[(y * 40 + x) as usize];

        let mut differing = 0;
        for y in 0..40 {
            for x in 0..40 {
                let Some(v) = vector.target().pixel(x as u32, y as u32) else {
                    continue;
                };
                if painted(v) == at(x, y) {
                    continue;
                }
                differing += 1;
                let on_edge = (-1..=1)
                    .flat_map(|dy| (-1..=1).map(move |dx| (x + dx, y + dy)))
                    .filter(|(nx, ny)| (0..40).contains(nx) && (0..40).contains(ny))
                    .any(|(nx, ny)| at(nx, ny) != at(x, y));
                assert!(on_edge, "pixel ({x}, {y}) differs away from the outline");
            }
        }
        assert!(differing <= 16, "{differing} pixels differ");
    }
}
