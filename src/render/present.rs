//! Presentation of finished frames to the visible window.
//!
//! Backends draw into an offscreen buffer and hand the finished frame to a
//! [`PresentTarget`] once per frame, after the whole command buffer has been
//! replayed. Pixels are `0x00RRGGBB`, row by row, `size.width` pixels per row.

use crate::geometry::SurfaceSize;
use anyhow::Result;

/// A finished frame ready to be copied to the window.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub pixels: &'a [u32],
    pub size: SurfaceSize,
    pub frame_id: u64,
}

/// Destination of finished frames, usually a window.
pub trait PresentTarget {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// Present target that keeps a copy of the last frame in memory.
///
/// Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct FrameCapture {
    presented: u64,
    last_id: Option<u64>,
    size: SurfaceSize,
    pixels: Vec<u32>,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many frames have been presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn last_frame_id(&self) -> Option<u64> {
        self.last_id
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels.get(y as usize * self.size.width as usize + x as usize).copied()
    }
}

impl PresentTarget for FrameCapture {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.presented += 1;
        self.last_id = Some(frame.frame_id);
        self.size = frame.size;
        self.pixels.clear();
        self.pixels.extend_from_slice(frame.pixels);
        Ok(())
    }
}

impl<T: PresentTarget + ?Sized> PresentTarget for Box<T> {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        (**self).present(frame)
    }
}

#[cfg(feature = "present_softbuffer")]
pub use self::softbuffer_target::SoftbufferTarget;

#[cfg(feature = "present_softbuffer")]
mod softbuffer_target {
    use super::{Frame, PresentTarget};
    use crate::errors::AdapterError;
    use crate::geometry::SurfaceSize;
    use anyhow::{anyhow, Result};
    use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
    use std::num::NonZeroU32;

    /// Presents frames into a native window through softbuffer.
    pub struct SoftbufferTarget<D, W> {
        // Declared first so the surface is released before its context.
        surface: softbuffer::Surface<D, W>,
        _context: softbuffer::Context<D>,
        size: Option<SurfaceSize>,
    }

    impl<D: HasDisplayHandle, W: HasWindowHandle> SoftbufferTarget<D, W> {
        pub fn new(display: D, window: W) -> Result<Self, AdapterError> {
            let context = softbuffer::Context::new(display)
                .map_err(|e| AdapterError::Present(format!("failed to create softbuffer context: {e}")))?;
            let surface = softbuffer::Surface::new(&context, window)
                .map_err(|e| AdapterError::Present(format!("failed to create softbuffer surface: {e}")))?;

            Ok(Self {
                surface,
                _context: context,
                size: None,
            })
        }
    }

    impl<D: HasDisplayHandle, W: HasWindowHandle> PresentTarget for SoftbufferTarget<D, W> {
        fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
            if self.size != Some(frame.size) {
                let (Some(w), Some(h)) = (NonZeroU32::new(frame.size.width), NonZeroU32::new(frame.size.height)) else {
                    return Ok(());
                };
                self.surface
                    .resize(w, h)
                    .map_err(|e| anyhow!("failed to resize softbuffer: {e}"))?;
                self.size = Some(frame.size);
                log::debug!("softbuffer surface resized to {}", frame.size);
            }

            let mut buffer = self
                .surface
                .buffer_mut()
                .map_err(|e| anyhow!("failed to get softbuffer: {e}"))?;
            let n = buffer.len().min(frame.pixels.len());
            buffer[..n].copy_from_slice(&frame.pixels[..n]);
            buffer
                .present()
                .map_err(|e| anyhow!("failed to present softbuffer: {e}"))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_keeps_last_frame() {
        let mut capture = FrameCapture::new();
        let pixels = [1u32, 2, 3, 4];
        capture
            .present(&Frame {
                pixels: &pixels,
                size: SurfaceSize::new(2, 2),
                frame_id: 7,
            })
            .unwrap();

        assert_eq!(capture.presented(), 1);
        assert_eq!(capture.last_frame_id(), Some(7));
        assert_eq!(capture.pixel(1, 1), Some(4));
        assert_eq!(capture.pixel(2, 0), None);
    }
}
