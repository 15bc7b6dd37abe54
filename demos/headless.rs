//! Drives a tiny panel through the session without a window and writes the
//! last frame to a PNG.
//!
//! ```sh
//! UIBRIDGE_FONT=/usr/share/fonts/TTF/DejaVuSans.ttf cargo run --example headless [config.json]
//! ```

use std::collections::VecDeque;
use std::time::Duration;
use uibridge::config::Config;
use uibridge::font::UserFont;
use uibridge::geometry::{Point, Rect};
use uibridge::input::x11::{KeyEvent, ModMask, X11Translator, XEvent};
use uibridge::input::{InputBatch, InputEvent, InputSink, MouseButton};
use uibridge::logging;
use uibridge::render::backend::RenderBackend;
use uibridge::render::backends::raster::{FontdueFont, RasterBackend};
use uibridge::render::present::FrameCapture;
use uibridge::render::{Color, Command, CommandBuffer};
use uibridge::session::{EventSource, Session, Toolkit};

const BUTTON: Rect = Rect {
    x: 40.0,
    y: 60.0,
    w: 120.0,
    h: 30.0,
};

/// Replays a fixed list of window events.
struct Script(VecDeque<XEvent>);

impl EventSource for Script {
    type Event = XEvent;

    fn poll_event(&mut self) -> Option<XEvent> {
        self.0.pop_front()
    }

    fn wait_event(&mut self, _timeout: Duration) -> Option<XEvent> {
        self.0.pop_front()
    }
}

/// A window with one button that counts clicks.
struct Panel {
    input: InputBatch,
    commands: CommandBuffer,
    font: Option<UserFont>,
    pointer: (i32, i32),
    clicks: u32,
    frames_left: u32,
}

impl Panel {
    fn hovered(&self) -> bool {
        BUTTON.contains(Point::new(self.pointer.0 as f32, self.pointer.1 as f32))
    }
}

impl Toolkit for Panel {
    fn input(&mut self) -> &mut dyn InputSink {
        &mut self.input
    }

    fn frame(&mut self) -> bool {
        if self.frames_left == 0 {
            return false;
        }
        self.frames_left -= 1;

        for event in self.input.take() {
            match event {
                InputEvent::Motion { x, y } => self.pointer = (x, y),
                InputEvent::Button {
                    button: MouseButton::Left,
                    down: false,
                    ..
                } if self.hovered() => self.clicks += 1,
                _ => {}
            }
        }

        let window = Rect::new(20.0, 20.0, 260.0, 160.0);
        let button_color = if self.hovered() {
            Color::from_rgb24(0x5a_5a_5a)
        } else {
            Color::from_rgb24(0x46_46_46)
        };
        let text = format!("clicked {}x", self.clicks);
        let font = self.font.as_ref().map(|f| f.handle());
        let text_w = self.font.as_ref().map_or(0.0, |f| f.text_width(f.height(), &text));
        let font_h = self.font.as_ref().map_or(15.0, |f| f.height());

        self.commands.extend([
            Command::Rect {
                rect: window,
                rounding: 4.0,
                color: Color::from_rgb24(0x2d_2d_2d),
            },
            Command::Line {
                from: Point::new(20.0, 48.0),
                to: Point::new(279.0, 48.0),
                color: Color::from_rgb24(0x64_64_64),
            },
            Command::Scissor { rect: window },
            Command::Rect {
                rect: BUTTON,
                rounding: 6.0,
                color: button_color,
            },
            Command::Text {
                rect: Rect::new(BUTTON.x + (BUTTON.w - text_w) / 2.0, BUTTON.y, text_w, BUTTON.h),
                text,
                font,
                background: button_color,
                foreground: Color::from_rgb24(0xaf_af_af),
                height: font_h,
            },
            Command::Circle {
                rect: Rect::new(200.0, 120.0, 40.0, 40.0),
                color: Color::from_rgb24(0xc8_32_32),
            },
            Command::Triangle {
                a: Point::new(60.0, 150.0),
                b: Point::new(90.0, 110.0),
                c: Point::new(120.0, 150.0),
                color: Color::from_rgb24(0x32_c8_32),
            },
            Command::Curve {
                from: Point::new(140.0, 150.0),
                ctrl: [Point::new(160.0, 100.0), Point::new(180.0, 190.0)],
                to: Point::new(200.0, 110.0),
                color: Color::WHITE,
            },
        ]);
        true
    }

    fn commands(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    logging::init(config.log_level);
    log::info!("{}: headless run at {}", config.window.title, config.surface_size());

    let mut backend = RasterBackend::new(FrameCapture::new(), config.surface_size())?;
    let font = match std::env::var("UIBRIDGE_FONT") {
        Ok(path) => {
            let bytes = std::fs::read(&path)?;
            Some(backend.add_font(FontdueFont::from_bytes(&bytes, config.font_height)?))
        }
        Err(_) => {
            log::warn!("UIBRIDGE_FONT not set, text will be drawn as background only");
            None
        }
    };

    let mut script = Script(VecDeque::from([
        XEvent::ConfigureNotify { width: 300, height: 200 },
        XEvent::MotionNotify { x: 80, y: 70 },
        XEvent::ButtonPress { button: 1, x: 80, y: 70 },
        XEvent::ButtonRelease { button: 1, x: 80, y: 70 },
        XEvent::KeyRelease(KeyEvent::new(0x61, ModMask::empty()).with_text("a")),
    ]));
    let mut panel = Panel {
        input: InputBatch::new(),
        commands: CommandBuffer::new(),
        font,
        pointer: (0, 0),
        clicks: 0,
        frames_left: 3,
    };

    let mut session = Session::new(&config, X11Translator::new(), backend);
    let frames = session.run(&mut script, &mut panel)?;

    let mut backend = session.into_backend();
    let out = std::env::temp_dir().join("uibridge-headless.png");
    backend.snapshot()?.save_png(&out)?;
    println!(
        "{frames} frames, {} presented, {} clicks, snapshot at {}",
        backend.target().presented(),
        panel.clicks,
        out.display()
    );

    backend.shutdown();
    Ok(())
}
