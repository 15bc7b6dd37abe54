//! Input translation.
//!
//! Platform events are mapped onto the toolkit's small input vocabulary and
//! fed to an [`InputSink`] inside an [`InputTransaction`]. Window level events
//! (resize, expose, quit) are not input; translators classify them separately
//! through [`EventTranslator::window_action`] so they are handled even when no
//! transaction is open.
//!
//! # Main Types
//!
//! - [`Key`]: the keys the toolkit understands.
//! - [`MouseButton`]: left and right buttons.
//! - [`Glyph`]: one UTF-8 encoded character in a fixed size buffer.
//! - [`InputSink`]: ingestion calls implemented by the toolkit.
//! - [`InputTransaction`]: begin/end bracket around one frame's input.
//! - [`InputBatch`]: a sink that records what it is fed.

pub mod sdl;
pub mod x11;

use crate::geometry::SurfaceSize;
use bitflags::bitflags;
use std::fmt::Display;

/// Keys forwarded to the toolkit. Everything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Shift,
    Del,
    Enter,
    Tab,
    Backspace,
    Left,
    Right,
    /// Control + C
    Copy,
    /// Control + V
    Paste,
    /// Control + X
    Cut,
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Key::Shift => "Shift",
            Key::Del => "Delete",
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Backspace => "Backspace",
            Key::Left => "Left",
            Key::Right => "Right",
            Key::Copy => "Copy",
            Key::Paste => "Paste",
            Key::Cut => "Cut",
        };
        write!(f, "{name}")
    }
}

/// Represents a mouse button that can be pressed or released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Left mouse button pressed (or depressed)
    Left,
    /// Right mouse button pressed (or depressed)
    Right,
}

impl Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::Left => write!(f, "Left"),
            MouseButton::Right => write!(f, "Right"),
        }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const META    = 0b1000;
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::CONTROL) {
            parts.push("Control");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::META) {
            parts.push("Meta");
        }

        if parts.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", parts.join("+"))
        }
    }
}

/// Bytes in a [`Glyph`], enough for any UTF-8 encoded character.
pub const GLYPH_SIZE: usize = 4;

/// Text entry passed through to the toolkit without interpretation.
///
/// Longer input is truncated to [`GLYPH_SIZE`] bytes, shorter input is zero
/// padded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Glyph([u8; GLYPH_SIZE]);

impl Glyph {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut glyph = [0u8; GLYPH_SIZE];
        let n = bytes.len().min(GLYPH_SIZE);
        glyph[..n].copy_from_slice(&bytes[..n]);
        Self(glyph)
    }

    pub fn as_bytes(&self) -> &[u8; GLYPH_SIZE] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; GLYPH_SIZE]
    }
}

/// One normalized input event, as recorded by [`InputBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key { key: Key, down: bool },
    Motion { x: i32, y: i32 },
    Button { button: MouseButton, x: i32, y: i32, down: bool },
    /// Positive is forward/up.
    Scroll(f32),
    Glyph(Glyph),
    Char(char),
}

/// Input ingestion side of the toolkit.
pub trait InputSink {
    fn input_begin(&mut self);
    fn input_key(&mut self, key: Key, down: bool);
    fn input_motion(&mut self, x: i32, y: i32);
    fn input_button(&mut self, button: MouseButton, x: i32, y: i32, down: bool);
    fn input_scroll(&mut self, delta: f32);
    fn input_glyph(&mut self, glyph: &Glyph);
    fn input_char(&mut self, ch: char);
    fn input_end(&mut self);
}

/// Window level events, handled by the session rather than the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    /// The drawable changed size (or may have).
    Resize(SurfaceSize),
    /// Part of the window needs to be redrawn.
    Expose,
    /// The keyboard mapping changed.
    KeymapChanged,
    /// The window was closed or the application asked to quit.
    Quit,
}

/// Maps one platform's events onto the input vocabulary.
///
/// Translation must be deterministic and must not reorder events.
pub trait EventTranslator {
    type Event;

    /// Classifies window level events. `None` for everything else.
    fn window_action(&self, event: &Self::Event) -> Option<WindowAction>;

    /// Feeds the input carried by `event`, if any, to `sink`.
    fn translate(&mut self, event: &Self::Event, sink: &mut dyn InputSink);
}

/// Brackets one frame's input.
///
/// `input_begin` is called when the transaction is opened and `input_end`
/// exactly once when it is committed or dropped, also on early exit.
pub struct InputTransaction<'a> {
    sink: &'a mut dyn InputSink,
    fed: usize,
}

impl<'a> InputTransaction<'a> {
    pub fn begin(sink: &'a mut dyn InputSink) -> Self {
        sink.input_begin();
        Self { sink, fed: 0 }
    }

    /// Translates `event` into the open transaction.
    pub fn feed<T>(&mut self, translator: &mut T, event: &T::Event)
    where
        T: EventTranslator + ?Sized,
    {
        translator.translate(event, &mut *self.sink);
        self.fed += 1;
    }

    pub fn sink(&mut self) -> &mut dyn InputSink {
        &mut *self.sink
    }

    /// Ends the transaction and returns how many events were fed.
    pub fn commit(self) -> usize {
        self.fed
    }
}

impl Drop for InputTransaction<'_> {
    fn drop(&mut self) {
        self.sink.input_end();
    }
}

/// Whether an [`InputBatch`] is inside a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputPhase {
    #[default]
    Idle,
    Collecting,
}

/// Sink that records the input it receives while collecting.
///
/// Input arriving outside of a transaction is dropped.
#[derive(Debug, Default)]
pub struct InputBatch {
    phase: InputPhase,
    events: Vec<InputEvent>,
    transactions: usize,
}

impl InputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> InputPhase {
        self.phase
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Removes and returns the recorded events.
    pub fn take(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of completed transactions.
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    fn record(&mut self, event: InputEvent) {
        if self.phase != InputPhase::Collecting {
            log::trace!("input outside of a transaction dropped: {event:?}");
            return;
        }
        self.events.push(event);
    }
}

impl InputSink for InputBatch {
    fn input_begin(&mut self) {
        self.phase = InputPhase::Collecting;
    }

    fn input_key(&mut self, key: Key, down: bool) {
        self.record(InputEvent::Key { key, down });
    }

    fn input_motion(&mut self, x: i32, y: i32) {
        self.record(InputEvent::Motion { x, y });
    }

    fn input_button(&mut self, button: MouseButton, x: i32, y: i32, down: bool) {
        self.record(InputEvent::Button { button, x, y, down });
    }

    fn input_scroll(&mut self, delta: f32) {
        self.record(InputEvent::Scroll(delta));
    }

    fn input_glyph(&mut self, glyph: &Glyph) {
        self.record(InputEvent::Glyph(*glyph));
    }

    fn input_char(&mut self, ch: char) {
        self.record(InputEvent::Char(ch));
    }

    fn input_end(&mut self) {
        if self.phase == InputPhase::Collecting {
            self.transactions += 1;
        }
        self.phase = InputPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes a scroll of the event's value.
    struct Echo;

    impl EventTranslator for Echo {
        type Event = f32;

        fn window_action(&self, _event: &f32) -> Option<WindowAction> {
            None
        }

        fn translate(&mut self, event: &f32, sink: &mut dyn InputSink) {
            sink.input_scroll(*event);
        }
    }

    #[test]
    fn glyph_is_truncated_and_padded() {
        assert_eq!(Glyph::from_bytes("abcdef".as_bytes()).as_bytes(), b"abcd");
        assert_eq!(Glyph::from_bytes("é".as_bytes()).as_bytes(), &[0xc3, 0xa9, 0, 0]);
        assert!(Glyph::from_bytes(&[]).is_empty());
    }

    #[test]
    fn transaction_brackets_input() {
        let mut batch = InputBatch::new();
        {
            let mut tx = InputTransaction::begin(&mut batch);
            tx.feed(&mut Echo, &1.0);
            tx.feed(&mut Echo, &-1.0);
            assert_eq!(tx.commit(), 2);
        }

        assert_eq!(batch.phase(), InputPhase::Idle);
        assert_eq!(batch.transactions(), 1);
        assert_eq!(batch.events(), &[InputEvent::Scroll(1.0), InputEvent::Scroll(-1.0)]);
    }

    #[test]
    fn dropped_transaction_still_ends() {
        let mut batch = InputBatch::new();
        {
            let mut tx = InputTransaction::begin(&mut batch);
            tx.sink().input_char('a');
        }
        assert_eq!(batch.phase(), InputPhase::Idle);
        assert_eq!(batch.transactions(), 1);
    }

    #[test]
    fn input_outside_transaction_is_ignored() {
        let mut batch = InputBatch::new();
        batch.input_motion(1, 2);
        assert!(batch.events().is_empty());
        assert_eq!(batch.transactions(), 0);
    }

    #[test]
    fn modifiers_display() {
        assert_eq!(Modifiers::empty().to_string(), "None");
        assert_eq!((Modifiers::CONTROL | Modifiers::SHIFT).to_string(), "Shift+Control");
        assert_eq!(Key::Del.to_string(), "Delete");
    }
}
