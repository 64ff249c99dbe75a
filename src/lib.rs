//! forms: a retained control tree with software painting
//!
//! A `Window` owns one platform surface and a `ControlAdapter` holding the
//! control tree. Raw platform input goes through the `InputTranslator`,
//! painting goes through a locked framebuffer and a `Canvas`. Hosts plug in by
//! implementing `WindowingPlatform` and `WindowImpl`; `platform::headless`
//! is an in-memory host and `platform::terminal` renders into an ANSI
//! terminal.

pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod platform;
#[cfg(unix)]
pub mod terminal;
pub mod ui;
pub mod window;

pub use config::FormsConfig;
pub use error::{ConfigError, PlatformError, ScriptError, TreeError};
pub use geometry::{Padding, PixelPoint, PixelRect, PixelSize, Point, Rect, Size};
pub use input::{InputTranslator, KeyEvent, KeyPressEvent, Keys, Modifiers, MouseButton, MouseEvent, UiEvent};
pub use platform::{RawInput, WindowEvent, WindowImpl, WindowState, WindowingPlatform};
pub use ui::{Control, ControlAdapter, ControlId, ControlTree, Theme};
pub use window::{StartPosition, Window};
