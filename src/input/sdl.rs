//! SDL style events: keycodes, with modifiers read from the live keyboard state.

use super::{EventTranslator, Glyph, InputSink, Key, Modifiers, MouseButton, WindowAction};
use crate::geometry::SurfaceSize;

/// The keycodes the translator looks at.
pub mod keycode {
    pub const BACKSPACE: i32 = 8;
    pub const TAB: i32 = 9;
    pub const RETURN: i32 = 13;
    pub const C: i32 = 'c' as i32;
    pub const V: i32 = 'v' as i32;
    pub const X: i32 = 'x' as i32;
    pub const DELETE: i32 = 127;
    pub const RIGHT: i32 = 0x4000_004f;
    pub const LEFT: i32 = 0x4000_0050;
    pub const LCTRL: i32 = 0x4000_00e0;
    pub const LSHIFT: i32 = 0x4000_00e1;
    pub const RCTRL: i32 = 0x4000_00e4;
    pub const RSHIFT: i32 = 0x4000_00e5;
}

pub const BUTTON_LEFT: u8 = 1;
pub const BUTTON_RIGHT: u8 = 3;

/// Current modifier state of the keyboard.
///
/// Queried at the moment an event is translated, so a modifier that changed
/// between two events is seen by the second one.
pub trait KeyboardState {
    fn modifiers(&self) -> Modifiers;
}

impl<F: Fn() -> Modifiers> KeyboardState for F {
    fn modifiers(&self) -> Modifiers {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Resized { width: u32, height: u32 },
    SizeChanged { width: u32, height: u32 },
    Exposed,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdlEvent {
    KeyDown { keycode: i32 },
    KeyUp { keycode: i32 },
    MouseButtonDown { button: u8, x: i32, y: i32 },
    MouseButtonUp { button: u8, x: i32, y: i32 },
    MouseMotion { x: i32, y: i32 },
    MouseWheel { y: i32 },
    TextInput { text: String },
    Window(WindowEvent),
    Quit,
    Other,
}

pub struct SdlTranslator<K> {
    keyboard: K,
}

impl<K: KeyboardState> SdlTranslator<K> {
    pub fn new(keyboard: K) -> Self {
        Self { keyboard }
    }

    fn key(&self, code: i32, down: bool, sink: &mut dyn InputSink) {
        let key = match code {
            keycode::LSHIFT | keycode::RSHIFT => Key::Shift,
            keycode::DELETE => Key::Del,
            keycode::RETURN => Key::Enter,
            keycode::TAB => Key::Tab,
            keycode::LEFT => Key::Left,
            keycode::RIGHT => Key::Right,
            keycode::BACKSPACE => Key::Backspace,
            keycode::C | keycode::V | keycode::X => {
                let modifiers = self.keyboard.modifiers();
                if !modifiers.contains(Modifiers::CONTROL) {
                    log::trace!("keycode {code} with {modifiers} dropped");
                    return;
                }
                match code {
                    keycode::C => Key::Copy,
                    keycode::V => Key::Paste,
                    _ => Key::Cut,
                }
            }
            _ => return,
        };
        sink.input_key(key, down);
    }
}

impl<K: KeyboardState> EventTranslator for SdlTranslator<K> {
    type Event = SdlEvent;

    fn window_action(&self, event: &SdlEvent) -> Option<WindowAction> {
        match event {
            SdlEvent::Window(WindowEvent::Resized { width, height })
            | SdlEvent::Window(WindowEvent::SizeChanged { width, height }) => {
                Some(WindowAction::Resize(SurfaceSize::new(*width, *height)))
            }
            SdlEvent::Window(WindowEvent::Exposed) => Some(WindowAction::Expose),
            SdlEvent::Window(WindowEvent::Close) | SdlEvent::Quit => Some(WindowAction::Quit),
            _ => None,
        }
    }

    fn translate(&mut self, event: &SdlEvent, sink: &mut dyn InputSink) {
        match event {
            SdlEvent::KeyDown { keycode } => self.key(*keycode, true, sink),
            SdlEvent::KeyUp { keycode } => self.key(*keycode, false, sink),
            SdlEvent::MouseButtonDown { button, x, y } => button_event(*button, *x, *y, true, sink),
            SdlEvent::MouseButtonUp { button, x, y } => button_event(*button, *x, *y, false, sink),
            SdlEvent::MouseMotion { x, y } => sink.input_motion(*x, *y),
            SdlEvent::MouseWheel { y } => sink.input_scroll(*y as f32),
            SdlEvent::TextInput { text } => sink.input_glyph(&Glyph::from_bytes(text.as_bytes())),
            _ => {}
        }
    }
}

fn button_event(button: u8, x: i32, y: i32, down: bool, sink: &mut dyn InputSink) {
    match button {
        BUTTON_LEFT => sink.input_button(MouseButton::Left, x, y, down),
        BUTTON_RIGHT => sink.input_button(MouseButton::Right, x, y, down),
        _ => {}
    }
}
