//! Single threaded frame loop.
//!
//! One frame is: collect input inside a transaction, let the toolkit build
//! its frame, clear the surface, replay the commands, present. Window actions
//! seen while collecting (resize, quit) are applied before anything is drawn,
//! so a resize never lands in the middle of a replay.
//!
//! After activity the session keeps polling for a few frames, then blocks in
//! [`EventSource::wait_event`] for at most the configured idle timeout.

use crate::config::Config;
use crate::input::{EventTranslator, InputSink, InputTransaction, WindowAction};
use crate::render::backend::RenderBackend;
use crate::render::{Color, CommandBuffer, DispatchStats, Dispatcher};
use anyhow::Result;
use std::time::Duration;

/// The immediate-mode toolkit driven by the session.
pub trait Toolkit {
    /// Where translated input goes.
    fn input(&mut self) -> &mut dyn InputSink;

    /// Runs the application for one frame, filling [`commands`](Self::commands).
    /// Returns `false` when the application wants to quit.
    fn frame(&mut self) -> bool;

    fn commands(&mut self) -> &mut CommandBuffer;
}

/// Source of raw platform events.
pub trait EventSource {
    type Event;

    /// Next pending event, without blocking.
    fn poll_event(&mut self) -> Option<Self::Event>;

    /// Blocks until an event arrives or `timeout` passes.
    fn wait_event(&mut self, timeout: Duration) -> Option<Self::Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn(DispatchStats),
    Quit,
}

pub struct Session<T: EventTranslator, B: RenderBackend> {
    translator: T,
    backend: B,
    dispatcher: Dispatcher,
    clear_color: Color,
    idle_timeout: Duration,
    poll_frames: u32,
    /// Frames left to poll before the next blocking wait
    poll: u32,
}

impl<T: EventTranslator, B: RenderBackend> Session<T, B> {
    pub fn new(config: &Config, translator: T, backend: B) -> Self {
        Self {
            translator,
            backend,
            dispatcher: Dispatcher::new(),
            clear_color: config.clear_color,
            idle_timeout: config.idle_timeout(),
            poll_frames: config.poll_frames,
            poll: config.poll_frames,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn frames(&self) -> u64 {
        self.dispatcher.frames()
    }

    /// Ends the session and hands back the backend for teardown.
    pub fn into_backend(self) -> B {
        log::info!("session ended after {} frames", self.dispatcher.frames());
        self.backend
    }

    /// Runs frames until the window is closed or the toolkit quits.
    /// Returns the number of frames drawn.
    pub fn run<S, K>(&mut self, events: &mut S, toolkit: &mut K) -> Result<u64>
    where
        S: EventSource<Event = T::Event>,
        K: Toolkit,
    {
        let mut drawn = 0;
        while let FrameOutcome::Drawn(_) = self.run_frame(events, toolkit)? {
            drawn += 1;
        }
        log::info!("session quit after {drawn} frames");
        Ok(drawn)
    }

    pub fn run_frame<S, K>(&mut self, events: &mut S, toolkit: &mut K) -> Result<FrameOutcome>
    where
        S: EventSource<Event = T::Event>,
        K: Toolkit,
    {
        if self.collect_input(events, toolkit.input())? {
            log::debug!("quit requested");
            return Ok(FrameOutcome::Quit);
        }

        if !toolkit.frame() {
            log::debug!("toolkit asked to quit");
            return Ok(FrameOutcome::Quit);
        }

        self.backend.clear(self.clear_color)?;
        let stats = self.dispatcher.dispatch(toolkit.commands(), &mut self.backend);
        self.backend.present()?;

        Ok(FrameOutcome::Drawn(stats))
    }

    /// Feeds pending events to `sink`. Returns `true` if a quit was seen.
    fn collect_input<S>(&mut self, events: &mut S, sink: &mut dyn InputSink) -> Result<bool>
    where
        S: EventSource<Event = T::Event>,
    {
        let mut tx = InputTransaction::begin(sink);

        let mut next = if self.poll > 0 {
            events.poll_event()
        } else {
            log::trace!("idle, waiting up to {:?}", self.idle_timeout);
            events.wait_event(self.idle_timeout)
        };

        let mut seen = 0;
        while let Some(event) = next {
            seen += 1;
            match self.translator.window_action(&event) {
                Some(action) => {
                    if self.apply(action)? {
                        return Ok(true);
                    }
                }
                None => tx.feed(&mut self.translator, &event),
            }
            next = events.poll_event();
        }
        tx.commit();

        self.poll = if seen > 0 {
            self.poll_frames
        } else {
            self.poll.saturating_sub(1)
        };
        Ok(false)
    }

    /// Applies a window action. Returns `true` for quit.
    fn apply(&mut self, action: WindowAction) -> Result<bool> {
        match action {
            WindowAction::Resize(size) => self.backend.resize(size)?,
            WindowAction::Expose => log::trace!("expose"),
            WindowAction::KeymapChanged => log::debug!("keyboard mapping changed"),
            WindowAction::Quit => return Ok(true),
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, SurfaceSize};
    use crate::input::x11::{KeyEvent, ModMask, X11Translator, XEvent};
    use crate::input::{InputBatch, InputEvent, Key};
    use crate::render::backends::null::{DrawCall, NullBackend};
    use crate::render::Command;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Events {
        queue: VecDeque<XEvent>,
        waits: usize,
    }

    impl Events {
        fn push(&mut self, ev: XEvent) {
            self.queue.push_back(ev);
        }
    }

    impl EventSource for Events {
        type Event = XEvent;

        fn poll_event(&mut self) -> Option<XEvent> {
            self.queue.pop_front()
        }

        fn wait_event(&mut self, _timeout: Duration) -> Option<XEvent> {
            self.waits += 1;
            self.queue.pop_front()
        }
    }

    /// Draws one rectangle per frame and quits after `frames_left` frames.
    struct Demo {
        input: InputBatch,
        commands: CommandBuffer,
        frames: usize,
        frames_left: usize,
        pending_at_input: Vec<usize>,
    }

    impl Demo {
        fn new(frames_left: usize) -> Self {
            Self {
                input: InputBatch::new(),
                commands: CommandBuffer::new(),
                frames: 0,
                frames_left,
                pending_at_input: Vec::new(),
            }
        }
    }

    impl Toolkit for Demo {
        fn input(&mut self) -> &mut dyn InputSink {
            self.pending_at_input.push(self.commands.len());
            &mut self.input
        }

        fn frame(&mut self) -> bool {
            if self.frames_left == 0 {
                return false;
            }
            self.frames_left -= 1;
            self.frames += 1;
            self.commands.add_command(Command::Rect {
                rect: Rect::new(0.0, 0.0, 4.0, 4.0),
                rounding: 0.0,
                color: Color::WHITE,
            });
            true
        }

        fn commands(&mut self) -> &mut CommandBuffer {
            &mut self.commands
        }
    }

    fn session() -> Session<X11Translator, NullBackend> {
        Session::new(&Config::default(), X11Translator::new(), NullBackend::new(SurfaceSize::new(32, 32)))
    }

    #[test]
    fn frame_collects_input_then_draws() {
        let mut s = session();
        let mut events = Events::default();
        events.push(XEvent::MotionNotify { x: 3, y: 4 });
        events.push(XEvent::ConfigureNotify { width: 100, height: 50 });
        let mut demo = Demo::new(10);

        let outcome = s.run_frame(&mut events, &mut demo).unwrap();

        assert!(matches!(outcome, FrameOutcome::Drawn(stats) if stats.executed == 1));
        assert_eq!(demo.input.events(), &[InputEvent::Motion { x: 3, y: 4 }]);
        assert_eq!(demo.input.transactions(), 1);
        assert_eq!(s.backend().size(), SurfaceSize::new(100, 50));
        assert_eq!(s.backend().calls().iter().map(DrawCall::kind).collect::<Vec<_>>(), vec!["rect"]);
        assert_eq!(s.backend().presented(), 1);
        assert!(demo.commands.is_empty());
    }

    #[test]
    fn quit_stops_before_dispatch() {
        let mut s = session();
        let mut events = Events::default();
        events.push(XEvent::KeyPress(KeyEvent::new(crate::input::x11::keysym::TAB, ModMask::empty())));
        events.push(XEvent::DeleteWindow);
        let mut demo = Demo::new(10);

        assert_eq!(s.run_frame(&mut events, &mut demo).unwrap(), FrameOutcome::Quit);
        assert_eq!(demo.frames, 0);
        assert_eq!(demo.input.transactions(), 1);
        assert_eq!(demo.input.events(), &[InputEvent::Key { key: Key::Tab, down: true }]);
        assert_eq!(s.backend().presented(), 0);
    }

    #[test]
    fn commands_are_consumed_before_next_input() {
        let mut s = session();
        let mut events = Events::default();
        let mut demo = Demo::new(3);

        assert_eq!(s.run(&mut events, &mut demo).unwrap(), 3);
        assert!(demo.pending_at_input.iter().all(|n| *n == 0));
        assert_eq!(s.frames(), 3);
        assert_eq!(s.backend().presented(), 3);
    }

    #[test]
    fn idle_session_waits_after_polling() {
        let config = Config {
            poll_frames: 2,
            ..Config::default()
        };
        let mut s = Session::new(&config, X11Translator::new(), NullBackend::new(SurfaceSize::new(8, 8)));
        let mut events = Events::default();
        let mut demo = Demo::new(10);

        s.run_frame(&mut events, &mut demo).unwrap();
        s.run_frame(&mut events, &mut demo).unwrap();
        assert_eq!(events.waits, 0);

        s.run_frame(&mut events, &mut demo).unwrap();
        assert_eq!(events.waits, 1);

        // Activity switches back to polling.
        events.push(XEvent::MotionNotify { x: 1, y: 1 });
        s.run_frame(&mut events, &mut demo).unwrap();
        s.run_frame(&mut events, &mut demo).unwrap();
        assert_eq!(events.waits, 2);
    }

    #[test]
    fn backend_is_handed_back() {
        let mut s = session();
        let mut events = Events::default();
        let mut demo = Demo::new(1);
        s.run(&mut events, &mut demo).unwrap();

        let backend = s.into_backend();
        assert_eq!(backend.presented(), 1);
    }
}
