//! Font handles and text measurement.
//!
//! The toolkit lays out text before anything is drawn, so it needs to ask the
//! backend how wide a run of text is. Each backend owns its fonts in a
//! [`FontTable`] and gives the toolkit a [`UserFont`]: the opaque handle that
//! ends up in text commands, the line height, and the measurement callback.

use crate::render::FontId;
use hashbrown::HashMap;
use std::rc::Rc;

/// Text measurement for one font.
///
/// Measurement is an oracle for layout: it has no side effects and never
/// fails. Anything it cannot measure is zero pixels wide.
pub trait FontMetrics {
    /// Width in pixels of `text` rendered at `height` pixels.
    fn text_width(&self, height: f32, text: &str) -> f32;

    /// Distance between two baselines, in pixels.
    fn line_height(&self) -> f32;
}

/// Font descriptor registered with the toolkit.
#[derive(Clone)]
pub struct UserFont {
    handle: FontId,
    height: f32,
    metrics: Rc<dyn FontMetrics>,
}

impl UserFont {
    pub fn new(handle: FontId, metrics: Rc<dyn FontMetrics>) -> Self {
        Self {
            handle,
            height: metrics.line_height(),
            metrics,
        }
    }

    pub fn handle(&self) -> FontId {
        self.handle
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Width of `text` at `height`; empty text measures zero.
    pub fn text_width(&self, height: f32, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let w = self.metrics.text_width(height, text);
        if w.is_finite() && w > 0.0 {
            w
        } else {
            0.0
        }
    }
}

impl std::fmt::Debug for UserFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserFont")
            .field("handle", &self.handle)
            .field("height", &self.height)
            .finish()
    }
}

/// Fonts owned by a backend, addressed by [`FontId`].
pub struct FontTable<F> {
    fonts: HashMap<FontId, F>,
    next_id: u32,
}

impl<F> FontTable<F> {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            next_id: 1,
        }
    }

    /// Stores `font` and returns its new handle. Handles are never reused.
    pub fn insert(&mut self, font: F) -> FontId {
        let id = FontId(self.next_id);
        self.next_id += 1;
        self.fonts.insert(id, font);
        id
    }

    pub fn get(&self, id: FontId) -> Option<&F> {
        self.fonts.get(&id)
    }

    pub fn remove(&mut self, id: FontId) -> Option<F> {
        self.fonts.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn clear(&mut self) {
        self.fonts.clear();
    }
}

impl<F> Default for FontTable<F> {
    fn default() -> Self {
        Self::new()
    }
}
