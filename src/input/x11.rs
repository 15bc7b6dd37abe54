//! X11 style events: keysyms with the modifier mask carried on each event.

use super::{EventTranslator, Glyph, InputSink, Key, MouseButton, WindowAction};
use crate::geometry::SurfaceSize;
use bitflags::bitflags;

/// The keysyms the translator looks at.
pub mod keysym {
    pub const SPACE: u32 = 0x0020;
    pub const C: u32 = 0x0063;
    pub const V: u32 = 0x0076;
    pub const X: u32 = 0x0078;
    pub const BACKSPACE: u32 = 0xff08;
    pub const TAB: u32 = 0xff09;
    pub const RETURN: u32 = 0xff0d;
    pub const LEFT: u32 = 0xff51;
    pub const RIGHT: u32 = 0xff53;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const SHIFT_R: u32 = 0xffe2;
    pub const CONTROL_L: u32 = 0xffe3;
    pub const CONTROL_R: u32 = 0xffe4;
    pub const DELETE: u32 = 0xffff;
}

bitflags! {
    /// Modifier state of a key or button event.
    #[derive(Default)]
    pub struct ModMask: u32 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
    }
}

pub const BUTTON_LEFT: u32 = 1;
pub const BUTTON_RIGHT: u32 = 3;
pub const BUTTON_WHEEL_UP: u32 = 4;
pub const BUTTON_WHEEL_DOWN: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub keysym: u32,
    pub state: ModMask,
    /// Text produced by looking up the key, possibly empty.
    pub text: Vec<u8>,
}

impl KeyEvent {
    pub fn new(keysym: u32, state: ModMask) -> Self {
        Self {
            keysym,
            state,
            text: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.as_bytes().to_vec();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    ButtonPress { button: u32, x: i32, y: i32 },
    ButtonRelease { button: u32, x: i32, y: i32 },
    MotionNotify { x: i32, y: i32 },
    /// Carries the window size as reported by the window attributes.
    Expose { width: u32, height: u32 },
    ConfigureNotify { width: u32, height: u32 },
    KeymapNotify,
    /// `WM_DELETE_WINDOW` client message.
    DeleteWindow,
    Other,
}

#[derive(Debug, Default)]
pub struct X11Translator;

impl X11Translator {
    pub fn new() -> Self {
        Self
    }

    fn key(&self, ev: &KeyEvent, down: bool, sink: &mut dyn InputSink) {
        let ctrl = ev.state.contains(ModMask::CONTROL);
        match ev.keysym {
            keysym::SHIFT_L | keysym::SHIFT_R => sink.input_key(Key::Shift, down),
            keysym::DELETE => sink.input_key(Key::Del, down),
            keysym::RETURN => sink.input_key(Key::Enter, down),
            keysym::TAB => sink.input_key(Key::Tab, down),
            keysym::LEFT => sink.input_key(Key::Left, down),
            keysym::RIGHT => sink.input_key(Key::Right, down),
            keysym::BACKSPACE => sink.input_key(Key::Backspace, down),
            keysym::SPACE if !down => sink.input_char(' '),
            keysym::C if ctrl => sink.input_key(Key::Copy, down),
            keysym::V if ctrl => sink.input_key(Key::Paste, down),
            keysym::X if ctrl => sink.input_key(Key::Cut, down),
            _ if !down && !ctrl && !ev.text.is_empty() => sink.input_glyph(&Glyph::from_bytes(&ev.text)),
            _ => {}
        }
    }
}

impl EventTranslator for X11Translator {
    type Event = XEvent;

    fn window_action(&self, event: &XEvent) -> Option<WindowAction> {
        match event {
            XEvent::Expose { width, height } | XEvent::ConfigureNotify { width, height } => {
                Some(WindowAction::Resize(SurfaceSize::new(*width, *height)))
            }
            XEvent::KeymapNotify => Some(WindowAction::KeymapChanged),
            XEvent::DeleteWindow => Some(WindowAction::Quit),
            _ => None,
        }
    }

    fn translate(&mut self, event: &XEvent, sink: &mut dyn InputSink) {
        match event {
            XEvent::KeyPress(ev) => self.key(ev, true, sink),
            XEvent::KeyRelease(ev) => self.key(ev, false, sink),
            XEvent::ButtonPress { button, x, y } => button_event(*button, *x, *y, true, sink),
            XEvent::ButtonRelease { button, x, y } => button_event(*button, *x, *y, false, sink),
            XEvent::MotionNotify { x, y } => sink.input_motion(*x, *y),
            _ => {}
        }
    }
}

fn button_event(button: u32, x: i32, y: i32, down: bool, sink: &mut dyn InputSink) {
    match button {
        BUTTON_LEFT => sink.input_button(MouseButton::Left, x, y, down),
        BUTTON_RIGHT => sink.input_button(MouseButton::Right, x, y, down),
        // The server sends a press and a release per wheel step; count it once.
        BUTTON_WHEEL_UP if down => sink.input_scroll(1.0),
        BUTTON_WHEEL_DOWN if down => sink.input_scroll(-1.0),
        _ => {}
    }
}
