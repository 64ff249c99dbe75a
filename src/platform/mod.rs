//! Platform windowing capability consumed by the toolkit core
//!
//! A host implements `WindowingPlatform` and `WindowImpl`; the core never
//! names a concrete platform type. Host callbacks (input, paint, resize,
//! close) are delivered to `Window::handle_event` as `WindowEvent` values.

pub mod framebuffer;
pub mod headless;
#[cfg(unix)]
pub mod terminal;

pub use framebuffer::{FramebufferLock, PixelBuffer, PixelFormat};

use crate::error::PlatformError;
use crate::geometry::{PixelPoint, PixelRect, Point, Rect, Size};
use crate::input::Modifiers;

/// Opaque identity of a platform window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// Raw pointer event kinds as reported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawMouseKind {
    Move,
    LeftButtonDown,
    LeftButtonUp,
    MiddleButtonDown,
    MiddleButtonUp,
    RightButtonDown,
    RightButtonUp,
    LeaveWindow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawKeyKind {
    KeyDown,
    KeyUp,
}

/// Raw input as captured by the platform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawInput {
    /// `position` is in client coordinates
    Mouse {
        kind: RawMouseKind,
        position: Point,
        modifiers: Modifiers,
    },
    /// `code` is a Win32-style virtual-key code
    Key {
        kind: RawKeyKind,
        code: u32,
        modifiers: Modifiers,
    },
    TextInput { text: String },
}

/// Host callbacks into a window
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    Input(RawInput),
    /// Repaint the given client rectangle
    Paint(Rect),
    Resized(Size),
    Closed,
}

/// A physical display
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub bounds: PixelRect,
    /// Usable area excluding system-reserved regions
    pub working_area: PixelRect,
    pub primary: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Screens {
    screens: Vec<Screen>,
}

impl Screens {
    pub fn new(screens: Vec<Screen>) -> Self {
        Self { screens }
    }

    pub fn all(&self) -> &[Screen] {
        &self.screens
    }

    pub fn primary(&self) -> Option<&Screen> {
        self.screens.iter().find(|s| s.primary)
    }

    /// First screen whose bounds contain `point`
    pub fn screen_from_point(&self, point: PixelPoint) -> Option<&Screen> {
        self.screens.iter().find(|s| s.bounds.contains(point))
    }
}

/// Factory for platform windows
pub trait WindowingPlatform {
    fn create_window(&mut self) -> Result<Box<dyn WindowImpl>, PlatformError>;
}

/// One platform window and its drawing surface
pub trait WindowImpl {
    fn handle(&self) -> WindowHandle;

    /// Resize the client area (device-independent units)
    fn resize(&mut self, size: Size);

    fn set_title(&mut self, title: &str);

    fn set_system_decorations(&mut self, enabled: bool);

    fn show(&mut self);

    /// Show modally over `owner`
    fn show_dialog(&mut self, owner: WindowHandle);

    /// Release the native window and its surface
    fn dispose(&mut self);

    /// Client size in device-independent units
    fn client_size(&self) -> Size;

    /// Top-left corner in screen pixels
    fn position(&self) -> PixelPoint;

    fn set_position(&mut self, position: PixelPoint);

    fn window_state(&self) -> WindowState;

    fn set_window_state(&mut self, state: WindowState);

    /// Physical pixels per device-independent unit
    fn scaling(&self) -> f64;

    fn screens(&self) -> Screens;

    /// Schedule a future paint of `rect` (client coordinates)
    fn invalidate(&mut self, rect: Rect);

    /// Enter a platform-driven move interaction
    fn begin_move_drag(&mut self);

    fn lock_framebuffer(&mut self) -> Result<FramebufferLock<'_>, PlatformError>;

    /// Show the last painted frame; called after the framebuffer lock is released
    fn present(&mut self) {}
}
