//! Drawing commands and the per-frame command buffer.
//!
//! The UI toolkit describes every frame as an ordered list of [`Command`]s.
//! The list is replayed once against a render backend by the
//! [`Dispatcher`](crate::render::Dispatcher) and then cleared; commands never
//! survive their frame.
//!
//! Commands do not own backend resources. Fonts and images are referenced by
//! the opaque [`FontId`] and [`ImageId`] handles handed out by the backend
//! that owns them.
//!
//! # Example
//!
//! ```rust
//! use uibridge::geometry::Rect;
//! use uibridge::render::{Color, Command, CommandBuffer};
//!
//! let mut commands = CommandBuffer::new();
//!
//! // Window background, then a rounded button on top of it
//! commands.add_command(Command::Rect {
//!     rect: Rect::new(0.0, 0.0, 200.0, 100.0),
//!     rounding: 0.0,
//!     color: Color::from_u8(45, 45, 45, 255),
//! });
//! commands.add_command(Command::Rect {
//!     rect: Rect::new(10.0, 10.0, 80.0, 24.0),
//!     rounding: 4.0,
//!     color: Color::from_u8(100, 100, 100, 255),
//! });
//!
//! assert_eq!(commands.len(), 2);
//! ```

use crate::geometry::{Point, Rect};
use serde::Deserialize;

/// RGBA color used for drawing commands.
///
/// Channels are represented as `f32` in the range `0.0 ..= 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel (opacity)
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new color from `f32` channel values in the range `0.0 ..= 1.0`.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    /// Creates a new color from `u8` channel values in the range `0 ..= 255`.
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Creates an opaque color from a packed `0xRRGGBB` value.
    pub fn from_rgb24(rgb: u32) -> Color {
        Color::from_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255)
    }

    /// Parses `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn parse_hex(s: &str) -> Option<Color> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

        match hex.len() {
            6 => Some(Color::from_u8(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Color::from_u8(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Returns the red channel as an `u8` (0–255).
    pub fn r_u8(&self) -> u8 {
        to_u8(self.r)
    }
    /// Returns the green channel as an `u8` (0–255).
    pub fn g_u8(&self) -> u8 {
        to_u8(self.g)
    }
    /// Returns the blue channel as an `u8` (0–255).
    pub fn b_u8(&self) -> u8 {
        to_u8(self.b)
    }
    /// Returns the alpha channel as an `u8` (0–255).
    pub fn a_u8(&self) -> u8 {
        to_u8(self.a)
    }

    /// Packs the color channels into `0x00RRGGBB`, dropping alpha.
    pub fn to_rgb24(&self) -> u32 {
        (self.r_u8() as u32) << 16 | (self.g_u8() as u32) << 8 | self.b_u8() as u32
    }
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value).ok_or_else(|| format!("invalid color '{value}', expected #rrggbb or #rrggbbaa"))
    }
}

/// Opaque handle to a font owned by a render backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

/// Opaque handle to an image registered with a render backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

/// A single drawing command emitted by the toolkit for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Placeholder that draws nothing.
    Nop,

    /// Restrict all following commands of the frame to `rect`.
    Scissor { rect: Rect },

    /// Stroke a straight line.
    Line { from: Point, to: Point, color: Color },

    /// Stroke a cubic Bézier curve from `from` to `to` with two control points.
    Curve {
        from: Point,
        ctrl: [Point; 2],
        to: Point,
        color: Color,
    },

    /// Fill a rectangle, with quarter-circle corners of radius `rounding` when it is positive.
    Rect { rect: Rect, rounding: f32, color: Color },

    /// Fill the ellipse inscribed in `rect`.
    Circle { rect: Rect, color: Color },

    /// Fill the triangle spanned by three vertices.
    Triangle {
        a: Point,
        b: Point,
        c: Point,
        color: Color,
    },

    /// Fill `rect` with `background`, then draw `text` vertically centered in it.
    Text {
        rect: Rect,
        text: String,
        /// Font to draw with. `None` paints the background only.
        font: Option<FontId>,
        background: Color,
        foreground: Color,
        /// Requested font height in pixels.
        height: f32,
    },

    /// Composite a registered image into `rect`.
    Image { rect: Rect, image: ImageId },

    /// Reserved. No backend draws arcs.
    Arc,
}

impl Command {
    /// True for commands that never reach a backend.
    pub fn is_noop(&self) -> bool {
        matches!(self, Command::Nop | Command::Arc)
    }
}

/// The ordered list of commands that make up one frame.
///
/// Collects commands while the toolkit runs its layout pass; they are consumed
/// exactly once by the dispatcher, which drains the buffer.
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    /// Sequence of drawing commands to execute.
    items: Vec<Command>,
}

impl CommandBuffer {
    /// Creates a new, empty command buffer.
    pub fn new() -> Self {
        CommandBuffer { items: Vec::new() }
    }

    /// Adds a new drawing command to the end of the buffer.
    pub fn add_command(&mut self, command: Command) {
        self.items.push(command);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.items.iter()
    }

    /// Yields every command in emission order and leaves the buffer empty,
    /// even when the iterator is dropped early.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.items.drain(..)
    }

    /// Clears all commands from the buffer.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Extend<Command> for CommandBuffer {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl FromIterator<Command> for CommandBuffer {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        CommandBuffer {
            items: iter.into_iter().collect(),
        }
    }
}
