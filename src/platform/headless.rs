//! Headless platform: an in-memory window host for tests and replays
//!
//! Every window records what the core asked of it (title, invalidations,
//! move drags, disposal) in a shared `HeadlessState` that stays readable
//! after the window itself has been handed to a `Window`.
//!
//! Raw input comes from an `InputScript`, a line-oriented text format:
//!
//! ```text
//! # ms   event
//! 0      move 20 20
//! 10     down left 20 20
//! 60     up left 20 20
//! 200    key 0x41
//! 250    text hello
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use log::trace;

use crate::error::{PlatformError, ScriptError};
use crate::geometry::{PixelPoint, PixelRect, PixelSize, Point, Rect, Size};
use crate::input::Modifiers;

use super::{
    FramebufferLock, PixelBuffer, RawInput, RawKeyKind, RawMouseKind, Screen, Screens,
    WindowHandle, WindowImpl, WindowState, WindowingPlatform,
};

/// Everything a headless window has been told, for inspection
#[derive(Debug, Clone)]
pub struct HeadlessState {
    pub handle: WindowHandle,
    pub title: String,
    pub decorations: bool,
    pub visible: bool,
    pub dialog_owner: Option<WindowHandle>,
    pub dispose_count: u32,
    pub client_size: Size,
    pub position: PixelPoint,
    pub window_state: WindowState,
    pub scaling: f64,
    pub screens: Screens,
    pub invalidated: Vec<Rect>,
    pub move_drags: u32,
    /// Successful framebuffer locks
    pub frames: u32,
    /// When false the surface refuses to lock
    pub surface_available: bool,
}

impl HeadlessState {
    pub fn is_disposed(&self) -> bool {
        self.dispose_count > 0
    }
}

pub type SharedState = Rc<RefCell<HeadlessState>>;

/// Creates headless windows on a configurable set of screens
pub struct HeadlessPlatform {
    screens: Screens,
    scaling: f64,
    next_handle: u64,
    windows: Vec<SharedState>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// One 1920x1080 primary screen at scaling 1.0
    pub fn new() -> Self {
        let full = PixelRect::new(0, 0, 1920, 1080);
        Self::with_screens(Screens::new(vec![Screen { bounds: full, working_area: full, primary: true }]))
    }

    pub fn with_screens(screens: Screens) -> Self {
        Self { screens, scaling: 1.0, next_handle: 1, windows: Vec::new() }
    }

    /// Scaling reported by windows created from now on
    pub fn with_scaling(mut self, scaling: f64) -> Self {
        self.scaling = scaling;
        self
    }

    /// Shared state of every window created so far, in creation order
    pub fn windows(&self) -> &[SharedState] {
        &self.windows
    }

    pub fn last_window(&self) -> Option<SharedState> {
        self.windows.last().cloned()
    }
}

impl WindowingPlatform for HeadlessPlatform {
    fn create_window(&mut self) -> Result<Box<dyn WindowImpl>, PlatformError> {
        let handle = WindowHandle(self.next_handle);
        self.next_handle += 1;
        let state = Rc::new(RefCell::new(HeadlessState {
            handle,
            title: String::new(),
            decorations: true,
            visible: false,
            dialog_owner: None,
            dispose_count: 0,
            client_size: Size::EMPTY,
            position: PixelPoint::ORIGIN,
            window_state: WindowState::Normal,
            scaling: self.scaling,
            screens: self.screens.clone(),
            invalidated: Vec::new(),
            move_drags: 0,
            frames: 0,
            surface_available: true,
        }));
        self.windows.push(state.clone());
        trace!("[Headless] created {:?}", handle);
        Ok(Box::new(HeadlessWindow {
            state,
            frame: PixelBuffer::new(PixelSize::new(0, 0)),
        }))
    }
}

pub struct HeadlessWindow {
    state: SharedState,
    frame: PixelBuffer,
}

impl WindowImpl for HeadlessWindow {
    fn handle(&self) -> WindowHandle {
        self.state.borrow().handle
    }

    fn resize(&mut self, size: Size) {
        self.state.borrow_mut().client_size = size.clamped();
    }

    fn set_title(&mut self, title: &str) {
        self.state.borrow_mut().title = title.to_string();
    }

    fn set_system_decorations(&mut self, enabled: bool) {
        self.state.borrow_mut().decorations = enabled;
    }

    fn show(&mut self) {
        self.state.borrow_mut().visible = true;
    }

    fn show_dialog(&mut self, owner: WindowHandle) {
        let mut state = self.state.borrow_mut();
        state.visible = true;
        state.dialog_owner = Some(owner);
    }

    fn dispose(&mut self) {
        let mut state = self.state.borrow_mut();
        state.visible = false;
        state.dispose_count += 1;
    }

    fn client_size(&self) -> Size {
        self.state.borrow().client_size
    }

    fn position(&self) -> PixelPoint {
        self.state.borrow().position
    }

    fn set_position(&mut self, position: PixelPoint) {
        self.state.borrow_mut().position = position;
    }

    fn window_state(&self) -> WindowState {
        self.state.borrow().window_state
    }

    fn set_window_state(&mut self, window_state: WindowState) {
        self.state.borrow_mut().window_state = window_state;
    }

    fn scaling(&self) -> f64 {
        self.state.borrow().scaling
    }

    fn screens(&self) -> Screens {
        self.state.borrow().screens.clone()
    }

    fn invalidate(&mut self, rect: Rect) {
        self.state.borrow_mut().invalidated.push(rect);
    }

    fn begin_move_drag(&mut self) {
        self.state.borrow_mut().move_drags += 1;
    }

    fn lock_framebuffer(&mut self) -> Result<FramebufferLock<'_>, PlatformError> {
        let (size, available) = {
            let state = self.state.borrow();
            if state.is_disposed() {
                return Err(PlatformError::Disposed);
            }
            (PixelSize::from_size(state.client_size, state.scaling), state.surface_available)
        };
        self.frame.resize(size);
        self.frame.set_available(available);
        let lock = self.frame.lock()?;
        self.state.borrow_mut().frames += 1;
        Ok(lock)
    }
}

/// One scripted raw input and when it happens, relative to the script start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub at: Duration,
    pub input: RawInput,
}

/// A parsed raw-input script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputScript {
    steps: Vec<ScriptStep>,
}

impl InputScript {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut steps: Vec<ScriptStep> = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw_line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let step = parse_step(content).map_err(|message| ScriptError::Parse { line, message })?;
            if steps.last().map_or(false, |last| last.at > step.at) {
                return Err(ScriptError::Parse { line, message: "timestamps must not decrease".into() });
            }
            steps.push(step);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn parse_step(content: &str) -> Result<ScriptStep, String> {
    let (time, rest) = split_word(content);
    let ms: u64 = time.parse().map_err(|_| format!("invalid timestamp '{}'", time))?;
    let (command, args) = split_word(rest);
    let input = match command {
        "move" => mouse(RawMouseKind::Move, args)?,
        "leave" => mouse(RawMouseKind::LeaveWindow, args)?,
        "down" | "up" => {
            let (button, coords) = split_word(args);
            let kind = match (command, button) {
                ("down", "left") => RawMouseKind::LeftButtonDown,
                ("down", "middle") => RawMouseKind::MiddleButtonDown,
                ("down", "right") => RawMouseKind::RightButtonDown,
                ("up", "left") => RawMouseKind::LeftButtonUp,
                ("up", "middle") => RawMouseKind::MiddleButtonUp,
                ("up", "right") => RawMouseKind::RightButtonUp,
                _ => return Err(format!("unknown button '{}'", button)),
            };
            mouse(kind, coords)?
        }
        "key" | "keyup" => {
            let (code, _) = split_word(args);
            let kind = if command == "key" { RawKeyKind::KeyDown } else { RawKeyKind::KeyUp };
            RawInput::Key { kind, code: parse_code(code)?, modifiers: Modifiers::NONE }
        }
        // Text keeps everything after the command, inner spaces included
        "text" => RawInput::TextInput { text: args.to_string() },
        "" => return Err("missing event".into()),
        other => return Err(format!("unknown event '{}'", other)),
    };
    Ok(ScriptStep { at: Duration::from_millis(ms), input })
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

fn mouse(kind: RawMouseKind, args: &str) -> Result<RawInput, String> {
    let mut coords = args.split_whitespace().map(|v| v.parse::<i32>());
    match (coords.next(), coords.next(), coords.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Ok(RawInput::Mouse {
            kind,
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }),
        _ => Err(format!("expected 'x y', got '{}'", args)),
    }
}

fn parse_code(code: &str) -> Result<u32, String> {
    let parsed = match code.strip_prefix("0x").or_else(|| code.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => code.parse(),
    };
    parsed.map_err(|_| format!("invalid key code '{}'", code))
}
