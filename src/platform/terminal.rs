//! Terminal host: a single window rendered into an ANSI terminal
//!
//! The terminal is the screen. Each cell shows two vertically stacked pixels
//! with the upper half block, foreground for the top pixel and background for
//! the bottom one, so the screen is `cols` pixels wide and `2 * rows` high at
//! scaling 1.0. Only cells that changed since the last present are written.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::io;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::error::PlatformError;
use crate::geometry::{PixelPoint, PixelRect, PixelSize, Point, Rect, Size};
use crate::terminal::{decode, virtual_key_for_char, SgrButton, SgrMouse, TermInput, Terminal};
use crate::ui::Color;
use crate::window::Window;

use super::{
    FramebufferLock, PixelBuffer, RawInput, RawKeyKind, RawMouseKind, Screen, Screens,
    WindowEvent, WindowHandle, WindowImpl, WindowState, WindowingPlatform,
};

/// How long one host loop iteration waits for input
const POLL_MS: i32 = 50;

const UPPER_HALF_BLOCK: char = '\u{2580}';

/// Window geometry shared between the host loop and the window
#[derive(Debug)]
struct TerminalState {
    handle: WindowHandle,
    visible: bool,
    disposed: bool,
    client_size: Size,
    position: PixelPoint,
    window_state: WindowState,
    /// Geometry to return to when leaving Maximized
    restore: Option<(PixelPoint, Size)>,
    screen: PixelRect,
    damage: Vec<Rect>,
    pointer: PixelPoint,
    /// Pointer position the current move drag last moved from
    drag_anchor: Option<PixelPoint>,
    /// Clear the terminal before the next present
    redraw_all: bool,
}

type SharedState = Rc<RefCell<TerminalState>>;

pub struct TerminalPlatform {
    terminal: Rc<RefCell<Terminal>>,
    window: Option<SharedState>,
    clipboard: Option<arboard::Clipboard>,
    /// Whether the pointer was last seen over the client area
    inside: bool,
}

impl TerminalPlatform {
    /// Take over the terminal; it is restored when the platform drops
    pub fn new() -> Result<Self, PlatformError> {
        let terminal = Terminal::new()?;
        Ok(Self {
            terminal: Rc::new(RefCell::new(terminal)),
            window: None,
            clipboard: None,
            inside: false,
        })
    }

    /// The whole terminal as one screen, in pixels
    pub fn screen_rect(&self) -> PixelRect {
        let (cols, rows) = self.terminal.borrow().size();
        screen_rect(cols, rows)
    }

    /// Drive `window` until it closes
    pub fn run(&mut self, window: &mut Window) -> Result<(), PlatformError> {
        let state = self
            .window
            .clone()
            .ok_or_else(|| PlatformError::Unsupported("no window to run".into()))?;
        window.invalidate();
        let mut size = window.client_size();

        while !window.is_closed() {
            if self.terminal.borrow_mut().update_size() {
                self.sync_screen(&state);
                window.invalidate();
            }

            let bytes = self.terminal.borrow_mut().read_input(POLL_MS)?;
            for input in decode(&bytes) {
                self.dispatch(window, &state, input);
                if window.is_closed() {
                    return Ok(());
                }
            }

            let current = window.client_size();
            if current != size {
                size = current;
                window.handle_event(WindowEvent::Resized(size));
            }

            let damage = std::mem::take(&mut state.borrow_mut().damage);
            if let Some(rect) = damage.into_iter().reduce(|a, b| a.union(&b)) {
                window.handle_event(WindowEvent::Paint(rect));
            }
        }
        Ok(())
    }

    fn sync_screen(&self, state: &SharedState) {
        let screen = self.screen_rect();
        let mut state = state.borrow_mut();
        state.screen = screen;
        if state.window_state == WindowState::Maximized {
            state.position = screen.position();
            state.client_size = Size::new(screen.width, screen.height);
        }
        state.redraw_all = true;
    }

    fn dispatch(&mut self, window: &mut Window, state: &SharedState, input: TermInput) {
        if window.window_state() == WindowState::Minimized {
            // Any key or click brings a minimized window back
            let wakes = match &input {
                TermInput::Mouse(mouse) => mouse.pressed && !mouse.motion,
                TermInput::Quit => false,
                _ => true,
            };
            if wakes {
                window.set_window_state(WindowState::Normal);
                window.invalidate();
                return;
            }
        }

        match input {
            TermInput::Mouse(mouse) => self.dispatch_mouse(window, state, &mouse),
            TermInput::Key { code, modifiers } => {
                window.handle_event(WindowEvent::Input(RawInput::Key { kind: RawKeyKind::KeyDown, code, modifiers }));
            }
            TermInput::Char(ch) => {
                if let Some((code, modifiers)) = virtual_key_for_char(ch) {
                    window.handle_event(WindowEvent::Input(RawInput::Key { kind: RawKeyKind::KeyDown, code, modifiers }));
                }
                window.handle_event(WindowEvent::Input(RawInput::TextInput { text: ch.to_string() }));
            }
            TermInput::Paste => {
                if let Some(text) = self.clipboard_text() {
                    window.handle_event(WindowEvent::Input(RawInput::TextInput { text }));
                }
            }
            TermInput::Quit => {
                debug!("[Terminal] quit requested");
                window.close();
            }
            TermInput::Unknown(bytes) => trace!("[Terminal] unrecognized input {:?}", bytes),
        }
    }

    fn dispatch_mouse(&mut self, window: &mut Window, state: &SharedState, mouse: &SgrMouse) {
        let pixel = cell_to_pixel(mouse.col, mouse.row);
        let (position, client, dragging) = {
            let mut state = state.borrow_mut();
            state.pointer = pixel;
            (state.position, state.client_size, state.drag_anchor.is_some())
        };

        if dragging {
            if mouse.motion && mouse.button == SgrButton::Left {
                self.move_window(state, pixel);
                return;
            }
            if !mouse.pressed {
                state.borrow_mut().drag_anchor = None;
            }
        }

        let Some(kind) = raw_mouse_kind(mouse) else {
            trace!("[Terminal] wheel input ignored");
            return;
        };
        let local = Point::new(pixel.x - position.x, pixel.y - position.y);
        let inside = Rect::from_size(client).contains(local);
        let held = window.translator().gesture().pressed;

        let kind = match kind {
            RawMouseKind::Move if !inside && held.is_empty() => {
                if !self.inside {
                    return;
                }
                RawMouseKind::LeaveWindow
            }
            RawMouseKind::LeftButtonDown | RawMouseKind::MiddleButtonDown | RawMouseKind::RightButtonDown
                if !inside =>
            {
                return;
            }
            other => other,
        };
        self.inside = inside;
        window.handle_event(WindowEvent::Input(RawInput::Mouse { kind, position: local, modifiers: mouse.modifiers }));
    }

    fn move_window(&self, state: &SharedState, pointer: PixelPoint) {
        let mut state = state.borrow_mut();
        if let Some(anchor) = state.drag_anchor {
            let (dx, dy) = (pointer.x - anchor.x, pointer.y - anchor.y);
            if dx != 0 || dy != 0 {
                state.position = PixelPoint::new(state.position.x + dx, state.position.y + dy);
                state.drag_anchor = Some(pointer);
                state.redraw_all = true;
                let full = Rect::from_size(state.client_size);
                state.damage.push(full);
            }
        }
    }

    fn clipboard_text(&mut self) -> Option<String> {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    warn!("[Terminal] clipboard unavailable: {}", err);
                    return None;
                }
            }
        }
        let clipboard = self.clipboard.as_mut()?;
        match clipboard.get_text() {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(err) => {
                warn!("[Terminal] clipboard read failed: {}", err);
                None
            }
        }
    }
}

impl WindowingPlatform for TerminalPlatform {
    fn create_window(&mut self) -> Result<Box<dyn WindowImpl>, PlatformError> {
        if self.window.is_some() {
            return Err(PlatformError::Unsupported("the terminal hosts a single window".into()));
        }
        let state = Rc::new(RefCell::new(TerminalState {
            handle: WindowHandle(1),
            visible: false,
            disposed: false,
            client_size: Size::EMPTY,
            position: PixelPoint::ORIGIN,
            window_state: WindowState::Normal,
            restore: None,
            screen: self.screen_rect(),
            damage: Vec::new(),
            pointer: PixelPoint::ORIGIN,
            drag_anchor: None,
            redraw_all: true,
        }));
        self.window = Some(state.clone());
        Ok(Box::new(TerminalWindow {
            state,
            terminal: self.terminal.clone(),
            frame: PixelBuffer::new(PixelSize::new(0, 0)),
            front: FrontBuffer::default(),
        }))
    }
}

pub struct TerminalWindow {
    state: SharedState,
    terminal: Rc<RefCell<Terminal>>,
    frame: PixelBuffer,
    front: FrontBuffer,
}

impl WindowImpl for TerminalWindow {
    fn handle(&self) -> WindowHandle {
        self.state.borrow().handle
    }

    fn resize(&mut self, size: Size) {
        let mut state = self.state.borrow_mut();
        state.client_size = size.clamped();
        state.redraw_all = true;
    }

    fn set_title(&mut self, title: &str) {
        // xterm window title
        let mut terminal = self.terminal.borrow_mut();
        let _ = terminal.write_raw(&format!("\x1b]2;{}\x07", title));
        let _ = terminal.flush();
    }

    fn set_system_decorations(&mut self, enabled: bool) {
        trace!("[Terminal] decorations {} (no-op)", enabled);
    }

    fn show(&mut self) {
        let mut state = self.state.borrow_mut();
        state.visible = true;
        state.redraw_all = true;
    }

    fn show_dialog(&mut self, owner: WindowHandle) {
        debug!("[Terminal] dialog of {:?} shown as the only window", owner);
        self.show();
    }

    fn dispose(&mut self) {
        let mut state = self.state.borrow_mut();
        state.visible = false;
        state.disposed = true;
    }

    fn client_size(&self) -> Size {
        self.state.borrow().client_size
    }

    fn position(&self) -> PixelPoint {
        self.state.borrow().position
    }

    fn set_position(&mut self, position: PixelPoint) {
        let mut state = self.state.borrow_mut();
        state.position = position;
        state.redraw_all = true;
    }

    fn window_state(&self) -> WindowState {
        self.state.borrow().window_state
    }

    fn set_window_state(&mut self, window_state: WindowState) {
        let mut state = self.state.borrow_mut();
        match (state.window_state, window_state) {
            (from, to) if from == to => return,
            (_, WindowState::Maximized) => {
                state.restore = Some((state.position, state.client_size));
                state.position = state.screen.position();
                state.client_size = Size::new(state.screen.width, state.screen.height);
            }
            (WindowState::Maximized, WindowState::Normal) => {
                if let Some((position, size)) = state.restore.take() {
                    state.position = position;
                    state.client_size = size;
                }
            }
            _ => {}
        }
        state.window_state = window_state;
        state.redraw_all = true;
        let full = Rect::from_size(state.client_size);
        state.damage.push(full);
    }

    fn scaling(&self) -> f64 {
        1.0
    }

    fn screens(&self) -> Screens {
        let screen = self.state.borrow().screen;
        Screens::new(vec![Screen { bounds: screen, working_area: screen, primary: true }])
    }

    fn invalidate(&mut self, rect: Rect) {
        self.state.borrow_mut().damage.push(rect);
    }

    fn begin_move_drag(&mut self) {
        let mut state = self.state.borrow_mut();
        state.drag_anchor = Some(state.pointer);
    }

    fn lock_framebuffer(&mut self) -> Result<FramebufferLock<'_>, PlatformError> {
        let (size, available) = {
            let state = self.state.borrow();
            if state.disposed {
                return Err(PlatformError::Disposed);
            }
            let available = state.visible && state.window_state != WindowState::Minimized;
            (PixelSize::from_size(state.client_size, 1.0), available)
        };
        self.frame.resize(size);
        self.frame.set_available(available);
        self.frame.lock()
    }

    fn present(&mut self) {
        let (origin, screen, redraw_all) = {
            let mut state = self.state.borrow_mut();
            let redraw_all = std::mem::replace(&mut state.redraw_all, false);
            (state.position, state.screen, redraw_all)
        };
        let (cols, rows) = (screen.width.max(0) as u16, (screen.height / 2).max(0) as u16);
        if redraw_all || !self.front.fits(cols, rows) {
            self.front.reset(cols, rows);
        }
        let out = compose(&self.frame, origin, &mut self.front);

        let mut terminal = self.terminal.borrow_mut();
        if let Err(err) = write_frame(&mut terminal, &out, redraw_all) {
            warn!("[Terminal] present failed: {}", err);
        }
    }
}

fn write_frame(terminal: &mut Terminal, out: &str, clear: bool) -> io::Result<()> {
    if clear {
        terminal.clear()?;
    }
    terminal.write_raw(out)?;
    terminal.write_raw("\x1b[0m")?;
    terminal.flush()
}

/// Pixel rectangle of a terminal of `cols` x `rows` cells
fn screen_rect(cols: u16, rows: u16) -> PixelRect {
    PixelRect::new(0, 0, cols as i32, rows as i32 * 2)
}

/// Top pixel of a 1-based cell
fn cell_to_pixel(col: u16, row: u16) -> PixelPoint {
    PixelPoint::new(col as i32 - 1, (row as i32 - 1) * 2)
}

/// Raw pointer kind for an SGR report, `None` for wheel input
fn raw_mouse_kind(mouse: &SgrMouse) -> Option<RawMouseKind> {
    if mouse.motion {
        return Some(RawMouseKind::Move);
    }
    let kind = match (mouse.button, mouse.pressed) {
        (SgrButton::Left, true) => RawMouseKind::LeftButtonDown,
        (SgrButton::Left, false) => RawMouseKind::LeftButtonUp,
        (SgrButton::Middle, true) => RawMouseKind::MiddleButtonDown,
        (SgrButton::Middle, false) => RawMouseKind::MiddleButtonUp,
        (SgrButton::Right, true) => RawMouseKind::RightButtonDown,
        (SgrButton::Right, false) => RawMouseKind::RightButtonUp,
        (SgrButton::None, _) => RawMouseKind::Move,
        (SgrButton::WheelUp | SgrButton::WheelDown, _) => return None,
    };
    Some(kind)
}

/// What is currently on the terminal, one (top, bottom) pair per cell
#[derive(Debug, Default)]
struct FrontBuffer {
    cols: u16,
    rows: u16,
    cells: Vec<Option<(Color, Color)>>,
}

impl FrontBuffer {
    fn fits(&self, cols: u16, rows: u16) -> bool {
        self.cols == cols && self.rows == rows
    }

    fn reset(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![None; cols as usize * rows as usize];
    }

    fn cell_mut(&mut self, col: i32, row: i32) -> Option<&mut Option<(Color, Color)>> {
        if col < 0 || row < 0 || col >= self.cols as i32 || row >= self.rows as i32 {
            return None;
        }
        self.cells.get_mut(row as usize * self.cols as usize + col as usize)
    }
}

/// ANSI output for every cell of `frame` at `origin` that differs from `front`
fn compose(frame: &PixelBuffer, origin: PixelPoint, front: &mut FrontBuffer) -> String {
    let size = frame.size();
    let mut out = String::new();
    if size.is_empty() {
        return out;
    }
    let first_row = origin.y.div_euclid(2);
    let last_row = (origin.y + size.height - 1).div_euclid(2);
    let mut cursor: Option<(i32, i32)> = None;

    for row in first_row..=last_row {
        for x in 0..size.width {
            let col = origin.x + x;
            let top_y = row * 2 - origin.y;
            let top = frame.pixel(x, top_y);
            let bottom = frame.pixel(x, top_y + 1);
            let (top, bottom) = match (top, bottom) {
                (Some(t), Some(b)) => (t, b),
                (Some(t), None) => (t, Color::rgb(0, 0, 0)),
                (None, Some(b)) => (Color::rgb(0, 0, 0), b),
                (None, None) => continue,
            };
            let Some(cell) = front.cell_mut(col, row) else {
                continue;
            };
            if *cell == Some((top, bottom)) {
                continue;
            }
            *cell = Some((top, bottom));

            if cursor != Some((col, row)) {
                let _ = write!(out, "\x1b[{};{}H", row + 1, col + 1);
            }
            let _ = write!(
                out,
                "\x1b[38;2;{};{};{};48;2;{};{};{}m{}",
                top.r, top.g, top.b, bottom.r, bottom.g, bottom.b, UPPER_HALF_BLOCK
            );
            cursor = Some((col + 1, row));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn sgr(button: SgrButton, pressed: bool, motion: bool) -> SgrMouse {
        SgrMouse { button, col: 1, row: 1, pressed, motion, modifiers: Modifiers::NONE }
    }

    #[test]
    fn test_cells_map_to_top_pixels() {
        assert_eq!(cell_to_pixel(1, 1), PixelPoint::new(0, 0));
        assert_eq!(cell_to_pixel(10, 4), PixelPoint::new(9, 6));
        assert_eq!(screen_rect(80, 24), PixelRect::new(0, 0, 80, 48));
    }

    #[test]
    fn test_sgr_reports_map_to_raw_kinds() {
        assert_eq!(raw_mouse_kind(&sgr(SgrButton::Left, true, false)), Some(RawMouseKind::LeftButtonDown));
        assert_eq!(raw_mouse_kind(&sgr(SgrButton::Right, false, false)), Some(RawMouseKind::RightButtonUp));
        assert_eq!(raw_mouse_kind(&sgr(SgrButton::Left, true, true)), Some(RawMouseKind::Move));
        assert_eq!(raw_mouse_kind(&sgr(SgrButton::None, true, true)), Some(RawMouseKind::Move));
        assert_eq!(raw_mouse_kind(&sgr(SgrButton::WheelUp, true, false)), None);
    }

    #[test]
    fn test_compose_writes_half_blocks_once() {
        let mut frame = PixelBuffer::new(PixelSize::new(2, 2));
        frame.clear(Color::rgb(255, 0, 0));
        frame.put(0, 1, Color::rgb(0, 0, 255));
        let mut front = FrontBuffer::default();
        front.reset(10, 5);

        let out = compose(&frame, PixelPoint::new(3, 2), &mut front);
        assert!(out.starts_with("\x1b[2;4H"));
        assert!(out.contains("\x1b[38;2;255;0;0;48;2;0;0;255m\u{2580}"));
        assert_eq!(out.matches('\u{2580}').count(), 2);
        // Second cell follows the first without another cursor move
        assert_eq!(out.matches('H').count(), 1);

        // Nothing changed, nothing written
        assert!(compose(&frame, PixelPoint::new(3, 2), &mut front).is_empty());

        frame.put(1, 0, Color::rgb(0, 255, 0));
        let out = compose(&frame, PixelPoint::new(3, 2), &mut front);
        assert!(out.starts_with("\x1b[2;5H"));
        assert_eq!(out.matches('\u{2580}').count(), 1);
    }

    #[test]
    fn test_compose_clips_to_terminal() {
        let frame = PixelBuffer::new(PixelSize::new(4, 4));
        let mut front = FrontBuffer::default();
        front.reset(2, 1);
        let out = compose(&frame, PixelPoint::new(-1, 0), &mut front);
        // Columns 0 and 1 of row 0 only
        assert_eq!(out.matches('\u{2580}').count(), 2);
    }

    #[test]
    fn test_odd_origin_pairs_rows_across_cells() {
        let mut frame = PixelBuffer::new(PixelSize::new(1, 2));
        frame.put(0, 0, Color::rgb(1, 1, 1));
        frame.put(0, 1, Color::rgb(2, 2, 2));
        let mut front = FrontBuffer::default();
        front.reset(4, 4);
        let out = compose(&frame, PixelPoint::new(0, 1), &mut front);
        // Window row 0 is the bottom half of cell row 0, row 1 the top half of cell row 1
        assert!(out.contains("48;2;1;1;1m"));
        assert!(out.contains("38;2;2;2;2;"));
        assert_eq!(out.matches('\u{2580}').count(), 2);
    }
}
