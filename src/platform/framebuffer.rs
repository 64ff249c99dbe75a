//! Software framebuffer and its scoped lock
//!
//! A `PixelBuffer` is owned by the platform window and backed by a
//! `tiny_skia::Pixmap`. Painting goes through a `FramebufferLock`, which marks
//! the buffer locked for its lifetime and releases it on drop, including early
//! returns and unwinding.

use std::ops::{Deref, DerefMut};

use log::trace;
use tiny_skia::{Pixmap, PixmapMut, Transform};

use crate::error::PlatformError;
use crate::geometry::PixelSize;
use crate::ui::Color;

/// Memory layout of the pixels behind `PixelBuffer::data`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Four bytes per pixel in R, G, B, A order, color premultiplied by alpha
    Rgba8888Premultiplied,
}

/// Row-major 32-bit pixel storage; empty until it has a non-zero size
#[derive(Debug, Default)]
pub struct PixelBuffer {
    pixmap: Option<Pixmap>,
    size: PixelSize,
    locked: bool,
    available: bool,
}

impl PixelBuffer {
    pub fn new(size: PixelSize) -> Self {
        let mut buffer = Self { available: true, ..Self::default() };
        buffer.resize(size);
        buffer
    }

    /// Reallocate for `size`; the contents are cleared when the size changes
    pub fn resize(&mut self, size: PixelSize) {
        let size = PixelSize::new(size.width.max(0), size.height.max(0));
        if size == self.size && (self.pixmap.is_some() || size.is_empty()) {
            return;
        }
        self.size = size;
        self.pixmap = Pixmap::new(size.width as u32, size.height as u32);
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8888Premultiplied
    }

    /// Bytes between the starts of two consecutive rows
    pub fn row_bytes(&self) -> usize {
        self.size.width as usize * 4
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.as_ref().map_or(&[][..], |pixmap| pixmap.data())
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        match self.pixmap.as_mut() {
            Some(pixmap) => pixmap.data_mut(),
            None => &mut [],
        }
    }

    /// Drawing target over the whole buffer, `None` while it is empty
    pub fn pixmap_mut(&mut self) -> Option<PixmapMut<'_>> {
        self.pixmap.as_mut().map(|pixmap| pixmap.as_mut())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Mark the surface as (un)available, e.g. while a window is minimized
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 {
            return None;
        }
        let pixel = self.pixmap.as_ref()?.pixel(x as u32, y as u32)?;
        Some(Color::from(pixel.demultiply()))
    }

    pub fn clear(&mut self, color: Color) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(color.into());
        }
    }

    /// Paint one pixel, blending translucent colors over the existing value
    pub fn put(&mut self, x: i32, y: i32, color: Color) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if let Some(rect) = tiny_skia::Rect::from_xywh(x as f32, y as f32, 1.0, 1.0) {
            pixmap.fill_rect(rect, &color.paint(), Transform::identity(), None);
        }
    }

    /// Acquire the buffer for drawing; released when the guard drops
    pub fn lock(&mut self) -> Result<FramebufferLock<'_>, PlatformError> {
        FramebufferLock::acquire(self)
    }
}

/// Exclusive drawing access to a `PixelBuffer`
#[derive(Debug)]
pub struct FramebufferLock<'a> {
    buffer: &'a mut PixelBuffer,
}

impl<'a> FramebufferLock<'a> {
    fn acquire(buffer: &'a mut PixelBuffer) -> Result<Self, PlatformError> {
        if !buffer.available || buffer.pixmap.is_none() {
            return Err(PlatformError::SurfaceUnavailable);
        }
        if buffer.locked {
            return Err(PlatformError::SurfaceBusy);
        }
        buffer.locked = true;
        trace!("[Paint] framebuffer locked ({}x{})", buffer.size.width, buffer.size.height);
        Ok(Self { buffer })
    }
}

impl Deref for FramebufferLock<'_> {
    type Target = PixelBuffer;

    fn deref(&self) -> &PixelBuffer {
        self.buffer
    }
}

impl DerefMut for FramebufferLock<'_> {
    fn deref_mut(&mut self) -> &mut PixelBuffer {
        self.buffer
    }
}

impl Drop for FramebufferLock<'_> {
    fn drop(&mut self) {
        self.buffer.locked = false;
        trace!("[Paint] framebuffer released");
    }
}
