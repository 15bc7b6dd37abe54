//! Replays a frame's commands against a render backend.

use crate::render::backend::{Clip, DrawContext, RenderBackend, TextRun};
use crate::render::{Command, CommandBuffer};

/// Counters for one replayed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Commands handed to the backend.
    pub executed: usize,
    /// `Nop` and `Arc` commands.
    pub skipped: usize,
    /// Backend calls that reported an error. Those commands are dropped.
    pub failed: usize,
}

/// Maps each command to one backend primitive, in emission order.
///
/// The dispatcher owns the frame's [`DrawContext`]. The clip starts out
/// unbounded for every frame and is reset again when the frame ends, so a
/// scissor never leaks into the next frame.
#[derive(Debug, Default)]
pub struct Dispatcher {
    ctx: DrawContext,
    frames: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context as left by the last frame.
    pub fn context(&self) -> &DrawContext {
        &self.ctx
    }

    /// Number of frames replayed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Replays every command in `commands` once and leaves the buffer empty.
    pub fn dispatch(&mut self, commands: &mut CommandBuffer, backend: &mut dyn RenderBackend) -> DispatchStats {
        self.replay(commands.drain(), backend)
    }

    /// Replays a stream of commands, consuming it.
    pub fn replay<I>(&mut self, commands: I, backend: &mut dyn RenderBackend) -> DispatchStats
    where
        I: IntoIterator<Item = Command>,
    {
        let mut stats = DispatchStats::default();

        self.ctx = DrawContext::new(backend.size());
        if let Err(e) = backend.begin_frame(&self.ctx) {
            log::warn!("[{}] begin_frame failed: {e:#}", backend.name());
        }

        for command in commands {
            if command.is_noop() {
                stats.skipped += 1;
                continue;
            }

            stats.executed += 1;
            if let Err(e) = self.execute(&command, backend) {
                stats.failed += 1;
                log::debug!("[{}] dropped {command:?}: {e:#}", backend.name());
            }
        }

        self.ctx.reset_clip();
        if let Err(e) = backend.end_frame(&self.ctx) {
            log::warn!("[{}] end_frame failed: {e:#}", backend.name());
        }

        self.frames += 1;
        log::trace!(
            "frame {} replayed: {} executed, {} skipped, {} failed",
            self.frames,
            stats.executed,
            stats.skipped,
            stats.failed
        );
        stats
    }

    fn execute(&mut self, command: &Command, backend: &mut dyn RenderBackend) -> anyhow::Result<()> {
        let ctx = &mut self.ctx;
        match command {
            Command::Nop | Command::Arc => Ok(()),
            Command::Scissor { rect } => {
                ctx.clip = Clip::Rect(*rect);
                backend.set_clip(ctx)
            }
            Command::Line { from, to, color } => backend.stroke_line(ctx, *from, *to, *color),
            Command::Curve { from, ctrl, to, color } => backend.stroke_curve(ctx, *from, *ctrl, *to, *color),
            Command::Rect { rect, rounding, color } => backend.fill_rect(ctx, *rect, *rounding, *color),
            Command::Circle { rect, color } => backend.fill_circle(ctx, *rect, *color),
            Command::Triangle { a, b, c, color } => backend.fill_triangle(ctx, [*a, *b, *c], *color),
            Command::Text {
                rect,
                text,
                font,
                background,
                foreground,
                height,
            } => {
                let run = TextRun {
                    rect: *rect,
                    text: text.as_str(),
                    font: *font,
                    background: *background,
                    foreground: *foreground,
                    height: *height,
                };
                backend.draw_text(ctx, &run)
            }
            Command::Image { rect, image } => backend.draw_image(ctx, *rect, *image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect, SurfaceSize};
    use crate::render::backends::null::{DrawCall, NullBackend};
    use crate::render::{Color, FontId, ImageId};

    fn red() -> Color {
        Color::from_u8(255, 0, 0, 255)
    }

    fn sample_frame() -> CommandBuffer {
        vec![
            Command::Nop,
            Command::Rect {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                rounding: 0.0,
                color: red(),
            },
            Command::Scissor {
                rect: Rect::new(2.0, 2.0, 4.0, 4.0),
            },
            Command::Arc,
            Command::Line {
                from: Point::new(0.0, 0.0),
                to: Point::new(9.0, 9.0),
                color: red(),
            },
            Command::Text {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                text: "hi".into(),
                font: Some(FontId(1)),
                background: Color::BLACK,
                foreground: Color::WHITE,
                height: 10.0,
            },
            Command::Image {
                rect: Rect::new(0.0, 0.0, 4.0, 4.0),
                image: ImageId(3),
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn one_backend_call_per_drawable_command_in_order() {
        let mut backend = NullBackend::new(SurfaceSize::new(32, 32));
        let mut dispatcher = Dispatcher::new();
        let mut frame = sample_frame();
        let drawable = frame.iter().filter(|c| !c.is_noop()).count();

        let stats = dispatcher.dispatch(&mut frame, &mut backend);

        assert_eq!(stats.executed, drawable);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.failed, 0);
        assert!(frame.is_empty());

        let kinds: Vec<&str> = backend.calls().iter().map(DrawCall::kind).collect();
        assert_eq!(kinds, vec!["rect", "clip", "line", "text", "image"]);
    }

    #[test]
    fn scissor_bounds_following_draws_and_resets_next_frame() {
        let clip = Rect::new(2.0, 2.0, 4.0, 4.0);
        let mut backend = NullBackend::new(SurfaceSize::new(32, 32));
        let mut dispatcher = Dispatcher::new();

        let mut frame: CommandBuffer = vec![
            Command::Scissor { rect: clip },
            Command::Circle {
                rect: Rect::new(0.0, 0.0, 8.0, 8.0),
                color: red(),
            },
            Command::Triangle {
                a: Point::new(0.0, 0.0),
                b: Point::new(8.0, 0.0),
                c: Point::new(0.0, 8.0),
                color: red(),
            },
        ]
        .into_iter()
        .collect();
        dispatcher.dispatch(&mut frame, &mut backend);

        let clips: Vec<Clip> = backend.calls().iter().skip(1).map(DrawCall::clip).collect();
        assert_eq!(clips, vec![Clip::Rect(clip), Clip::Rect(clip)]);
        assert_eq!(dispatcher.context().clip, Clip::Unbounded);

        backend.reset_calls();
        let mut next: CommandBuffer = vec![Command::Rect {
            rect: Rect::new(0.0, 0.0, 8.0, 8.0),
            rounding: 0.0,
            color: red(),
        }]
        .into_iter()
        .collect();
        dispatcher.dispatch(&mut next, &mut backend);

        assert_eq!(backend.calls()[0].clip(), Clip::Unbounded);
    }

    #[test]
    fn empty_frame_leaves_state_unchanged() {
        let mut backend = NullBackend::new(SurfaceSize::new(8, 8));
        let mut dispatcher = Dispatcher::new();
        let before = *dispatcher.context();

        let stats = dispatcher.dispatch(&mut CommandBuffer::new(), &mut backend);

        assert_eq!(stats, DispatchStats::default());
        assert!(backend.calls().is_empty());
        assert_eq!(dispatcher.context().clip, before.clip);
        assert_eq!(dispatcher.frames(), 1);
    }

    #[test]
    fn replay_accepts_streamed_commands() {
        let mut backend = NullBackend::new(SurfaceSize::new(8, 8));
        let mut dispatcher = Dispatcher::new();

        let stream = (0..5).map(|i| Command::Line {
            from: Point::new(i as f32, 0.0),
            to: Point::new(i as f32, 7.0),
            color: red(),
        });
        let stats = dispatcher.replay(stream, &mut backend);

        assert_eq!(stats.executed, 5);
        assert_eq!(backend.calls().len(), 5);
    }

    #[test]
    fn failing_primitive_does_not_abort_frame() {
        let mut backend = NullBackend::new(SurfaceSize::new(8, 8));
        backend.fail_on("circle");
        let mut dispatcher = Dispatcher::new();

        let mut frame: CommandBuffer = vec![
            Command::Circle {
                rect: Rect::new(0.0, 0.0, 4.0, 4.0),
                color: red(),
            },
            Command::Rect {
                rect: Rect::new(0.0, 0.0, 4.0, 4.0),
                rounding: 0.0,
                color: red(),
            },
        ]
        .into_iter()
        .collect();
        let stats = dispatcher.dispatch(&mut frame, &mut backend);

        assert_eq!(stats.executed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(backend.calls().last().map(DrawCall::kind), Some("rect"));
    }
}
