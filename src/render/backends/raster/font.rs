//! Bitmap fonts for the raster backend.

use crate::errors::AdapterError;
use crate::font::FontMetrics;

/// Coverage bitmap of one rasterized glyph.
#[derive(Clone, Debug, Default)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Horizontal offset from the pen position to the first column.
    pub left: i32,
    /// Vertical offset from the baseline to the first row, down is positive.
    pub top: i32,
    /// Row-major coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

/// A font the raster backend can draw with.
///
/// Raster fonts have one fixed pixel size. The height carried on text
/// commands is ignored when measuring and drawing, the font's own size wins.
pub trait RasterFont: FontMetrics {
    /// Pixels above the baseline.
    fn ascent(&self) -> i32;

    /// Pixels below the baseline.
    fn descent(&self) -> i32;

    /// Pen advance after `ch`.
    fn advance(&self, ch: char) -> f32;

    /// Rasterizes `ch`. `None` for blank glyphs such as spaces.
    fn glyph(&self, ch: char) -> Option<GlyphBitmap>;
}

/// Raster font backed by fontdue.
pub struct FontdueFont {
    font: fontdue::Font,
    px: f32,
    ascent: i32,
    descent: i32,
}

impl FontdueFont {
    /// Parses a TrueType/OpenType font from memory at a fixed pixel size.
    pub fn from_bytes(bytes: &[u8], px: f32) -> Result<Self, AdapterError> {
        if !(px.is_finite() && px > 0.0) {
            return Err(AdapterError::FontLoad(format!("invalid pixel size {px}")));
        }

        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| AdapterError::FontLoad(e.to_string()))?;

        let (ascent, descent) = match font.horizontal_line_metrics(px) {
            Some(m) => (m.ascent.ceil() as i32, (-m.descent).ceil() as i32),
            None => (px.ceil() as i32, 0),
        };
        log::debug!("loaded raster font at {px}px: ascent={ascent} descent={descent}");

        Ok(Self {
            font,
            px,
            ascent,
            descent,
        })
    }

    pub fn pixel_size(&self) -> f32 {
        self.px
    }
}

impl FontMetrics for FontdueFont {
    fn text_width(&self, _height: f32, text: &str) -> f32 {
        text.chars().map(|ch| self.advance(ch)).sum()
    }

    fn line_height(&self) -> f32 {
        (self.ascent + self.descent) as f32
    }
}

impl RasterFont for FontdueFont {
    fn ascent(&self) -> i32 {
        self.ascent
    }

    fn descent(&self) -> i32 {
        self.descent
    }

    fn advance(&self, ch: char) -> f32 {
        self.font.metrics(ch, self.px).advance_width
    }

    fn glyph(&self, ch: char) -> Option<GlyphBitmap> {
        let (metrics, coverage) = self.font.rasterize(ch, self.px);
        if metrics.width == 0 || metrics.height == 0 {
            return None;
        }

        Some(GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            left: metrics.xmin,
            top: -(metrics.ymin + metrics.height as i32),
            coverage,
        })
    }
}
