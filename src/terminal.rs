//! Raw ANSI terminal I/O and input decoding
//!
//! `Terminal` owns raw mode for its lifetime and restores the original
//! settings on drop. `decode` splits a chunk of bytes read from stdin into
//! terminal inputs: SGR mouse reports, navigation and function keys, control
//! chords and UTF-8 text.

use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;

use log::trace;

use crate::input::Modifiers;

/// Virtual-key codes produced by the decoder
pub mod vk {
    pub const BACK: u32 = 0x08;
    pub const TAB: u32 = 0x09;
    pub const ENTER: u32 = 0x0D;
    pub const ESCAPE: u32 = 0x1B;
    pub const SPACE: u32 = 0x20;
    pub const PAGE_UP: u32 = 0x21;
    pub const PAGE_DOWN: u32 = 0x22;
    pub const END: u32 = 0x23;
    pub const HOME: u32 = 0x24;
    pub const LEFT: u32 = 0x25;
    pub const UP: u32 = 0x26;
    pub const RIGHT: u32 = 0x27;
    pub const DOWN: u32 = 0x28;
    pub const INSERT: u32 = 0x2D;
    pub const DELETE: u32 = 0x2E;
    pub const F1: u32 = 0x70;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SgrButton {
    Left,
    Middle,
    Right,
    /// Motion with no button held
    None,
    WheelUp,
    WheelDown,
}

/// One SGR (1006) mouse report; `col` and `row` are 1-based cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SgrMouse {
    pub button: SgrButton,
    pub col: u16,
    pub row: u16,
    /// `M` terminator; `m` is a release
    pub pressed: bool,
    pub motion: bool,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TermInput {
    Mouse(SgrMouse),
    Key { code: u32, modifiers: Modifiers },
    Char(char),
    /// Ctrl+V
    Paste,
    /// Ctrl+Q
    Quit,
    Unknown(Vec<u8>),
}

pub struct Terminal {
    stdout: io::Stdout,
    original: libc::termios,
    cols: u16,
    rows: u16,
}

impl Terminal {
    /// Enter raw mode on the alternate screen with any-event mouse tracking
    pub fn new() -> io::Result<Self> {
        let fd = io::stdin().as_raw_fd();
        // SAFETY: termios is plain data and tcgetattr fully initializes it on success
        let original = unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            termios
        };

        let mut raw = original;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN);
        raw.c_iflag &= !(libc::IXON | libc::ICRNL | libc::BRKINT | libc::INPCK | libc::ISTRIP);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        // Non-blocking; `read_input` waits with poll(2)
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 0;
        // SAFETY: fd is stdin and raw is a valid termios copy
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut term = Self { stdout: io::stdout(), original, cols: 80, rows: 25 };
        term.update_size();
        term.write_raw("\x1b[?1049h")?; // Alternate screen
        term.write_raw("\x1b[?25l")?; // Hide cursor
        term.write_raw("\x1b[?1003h")?; // Any-event mouse tracking
        term.write_raw("\x1b[?1006h")?; // SGR extended mouse mode
        term.clear()?;
        term.flush()?;
        Ok(term)
    }

    /// Terminal dimensions in cells (columns, rows)
    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Re-read the size from the tty; true when it changed
    pub fn update_size(&mut self) -> bool {
        // SAFETY: winsize is plain data and only read after ioctl succeeds
        let size = unsafe {
            let mut ws: libc::winsize = std::mem::zeroed();
            if libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) == 0 {
                Some((ws.ws_col, ws.ws_row))
            } else {
                None
            }
        };
        match size {
            Some((cols, rows)) if cols > 0 && rows > 0 && (cols, rows) != (self.cols, self.rows) => {
                trace!("[Terminal] size {}x{} -> {}x{}", self.cols, self.rows, cols, rows);
                self.cols = cols;
                self.rows = rows;
                true
            }
            _ => false,
        }
    }

    /// Wait up to `timeout_ms` for input and return whatever bytes arrived
    pub fn read_input(&mut self, timeout_ms: i32) -> io::Result<Vec<u8>> {
        let mut stdin = io::stdin();
        let mut poll = libc::pollfd { fd: stdin.as_raw_fd(), events: libc::POLLIN, revents: 0 };
        // SAFETY: one valid pollfd for the duration of the call
        let ready = unsafe { libc::poll(&mut poll, 1, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted { Ok(Vec::new()) } else { Err(err) };
        }
        if ready == 0 {
            return Ok(Vec::new());
        }

        let mut buf = [0u8; 256];
        let n = stdin.read(&mut buf)?;
        let mut bytes = buf[..n].to_vec();
        // A lone ESC may be the start of a sequence that has not fully arrived
        if bytes == [0x1b] {
            std::thread::sleep(std::time::Duration::from_millis(10));
            if let Ok(more) = stdin.read(&mut buf) {
                bytes.extend_from_slice(&buf[..more]);
            }
        }
        Ok(bytes)
    }

    pub fn write_raw(&mut self, s: &str) -> io::Result<()> {
        self.stdout.write_all(s.as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }

    pub fn clear(&mut self) -> io::Result<()> {
        self.write_raw("\x1b[0m\x1b[2J\x1b[H")
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.write_raw("\x1b[?1006l");
        let _ = self.write_raw("\x1b[?1003l");
        let _ = self.write_raw("\x1b[0m\x1b[?25h");
        let _ = self.write_raw("\x1b[?1049l");
        let _ = self.flush();
        let fd = io::stdin().as_raw_fd();
        // SAFETY: restores the settings captured in `new`
        unsafe {
            libc::tcsetattr(fd, libc::TCSAFLUSH, &self.original);
        }
    }
}

/// Split raw bytes into terminal inputs
pub fn decode(buf: &[u8]) -> Vec<TermInput> {
    let mut inputs = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() {
        let (input, used) = decode_one(rest);
        inputs.push(input);
        rest = &rest[used.max(1)..];
    }
    inputs
}

fn decode_one(buf: &[u8]) -> (TermInput, usize) {
    match buf[0] {
        0x1b => decode_escape(buf),
        b'\r' | b'\n' => (key(vk::ENTER, Modifiers::NONE), 1),
        b'\t' => (key(vk::TAB, Modifiers::NONE), 1),
        0x7f | 0x08 => (key(vk::BACK, Modifiers::NONE), 1),
        0x00 => (key(vk::SPACE, CTRL), 1),
        0x11 => (TermInput::Quit, 1),
        0x16 => (TermInput::Paste, 1),
        // Ctrl+A through Ctrl+Z
        c @ 1..=26 => (key(0x40 + c as u32, CTRL), 1),
        c if c < 0x20 => (TermInput::Unknown(vec![c]), 1),
        _ => decode_utf8(buf),
    }
}

const CTRL: Modifiers = Modifiers { shift: false, ctrl: true, alt: false };

fn key(code: u32, modifiers: Modifiers) -> TermInput {
    TermInput::Key { code, modifiers }
}

fn decode_utf8(buf: &[u8]) -> (TermInput, usize) {
    let len = match buf[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        other => return (TermInput::Unknown(vec![other]), 1),
    };
    if buf.len() < len {
        return (TermInput::Unknown(buf.to_vec()), buf.len());
    }
    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(c) => (TermInput::Char(c), len),
        None => (TermInput::Unknown(buf[..len].to_vec()), len),
    }
}

fn decode_escape(buf: &[u8]) -> (TermInput, usize) {
    match buf.get(1) {
        None => (key(vk::ESCAPE, Modifiers::NONE), 1),
        Some(b'[') => decode_csi(buf),
        Some(b'O') => match buf.get(2) {
            Some(&c) => (ss3_key(c).unwrap_or_else(|| TermInput::Unknown(buf[..3].to_vec())), 3),
            None => (TermInput::Unknown(buf.to_vec()), buf.len()),
        },
        // Alt+letter arrives as ESC followed by the letter
        Some(&c) if c.is_ascii_alphanumeric() => {
            let alt = Modifiers { alt: true, shift: c.is_ascii_uppercase(), ctrl: false };
            (key(c.to_ascii_uppercase() as u32, alt), 2)
        }
        Some(_) => (key(vk::ESCAPE, Modifiers::NONE), 1),
    }
}

fn ss3_key(c: u8) -> Option<TermInput> {
    let code = match c {
        b'P'..=b'S' => vk::F1 + (c - b'P') as u32,
        _ => cursor_key(c)?,
    };
    Some(key(code, Modifiers::NONE))
}

fn cursor_key(c: u8) -> Option<u32> {
    match c {
        b'A' => Some(vk::UP),
        b'B' => Some(vk::DOWN),
        b'C' => Some(vk::RIGHT),
        b'D' => Some(vk::LEFT),
        b'H' => Some(vk::HOME),
        b'F' => Some(vk::END),
        _ => None,
    }
}

/// `ESC [ params final`
fn decode_csi(buf: &[u8]) -> (TermInput, usize) {
    let Some(end) = buf[2..].iter().position(|b| (0x40..=0x7e).contains(b)) else {
        return (TermInput::Unknown(buf.to_vec()), buf.len());
    };
    let end = end + 2;
    let params = &buf[2..end];
    let last = buf[end];
    let used = end + 1;

    if params.first() == Some(&b'<') {
        let input = parse_sgr_mouse(&buf[..used]).map_or_else(|| TermInput::Unknown(buf[..used].to_vec()), TermInput::Mouse);
        return (input, used);
    }

    let text = std::str::from_utf8(params).unwrap_or("");
    let mut numbers = text.split(';').map(|p| p.parse::<u32>().ok());
    let first = numbers.next().flatten();
    let modifiers = numbers.next().flatten().map_or(Modifiers::NONE, csi_modifiers);

    let code = match last {
        b'Z' => return (key(vk::TAB, Modifiers { shift: true, ..Modifiers::NONE }), used),
        b'~' => match first {
            Some(1) | Some(7) => Some(vk::HOME),
            Some(2) => Some(vk::INSERT),
            Some(3) => Some(vk::DELETE),
            Some(4) | Some(8) => Some(vk::END),
            Some(5) => Some(vk::PAGE_UP),
            Some(6) => Some(vk::PAGE_DOWN),
            Some(n @ 11..=15) => Some(vk::F1 + n - 11),
            Some(n @ 17..=21) => Some(vk::F1 + n - 12),
            Some(n @ 23..=24) => Some(vk::F1 + n - 13),
            _ => None,
        },
        b'P'..=b'S' => Some(vk::F1 + (last - b'P') as u32),
        other => cursor_key(other),
    };
    match code {
        Some(code) => (key(code, modifiers), used),
        None => (TermInput::Unknown(buf[..used].to_vec()), used),
    }
}

/// xterm modifier parameter: 1 + (shift | alt << 1 | ctrl << 2)
fn csi_modifiers(param: u32) -> Modifiers {
    let bits = param.saturating_sub(1);
    Modifiers { shift: bits & 1 != 0, alt: bits & 2 != 0, ctrl: bits & 4 != 0 }
}

/// Parse `ESC [ < Cb ; Cx ; Cy (M|m)`
pub fn parse_sgr_mouse(buf: &[u8]) -> Option<SgrMouse> {
    let s = std::str::from_utf8(buf).ok()?;
    let content = s.strip_prefix("\x1b[<")?;
    let pressed = content.ends_with('M');
    let content = content.strip_suffix(['M', 'm'])?;

    let mut parts = content.split(';');
    let cb: u16 = parts.next()?.parse().ok()?;
    let col: u16 = parts.next()?.parse().ok()?;
    let row: u16 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let button = if cb & 64 != 0 {
        if cb & 1 != 0 { SgrButton::WheelDown } else { SgrButton::WheelUp }
    } else {
        match cb & 0b11 {
            0 => SgrButton::Left,
            1 => SgrButton::Middle,
            2 => SgrButton::Right,
            _ => SgrButton::None,
        }
    };

    Some(SgrMouse {
        button,
        col,
        row,
        pressed,
        motion: cb & 32 != 0,
        modifiers: Modifiers { shift: cb & 4 != 0, alt: cb & 8 != 0, ctrl: cb & 16 != 0 },
    })
}

/// Virtual-key code for a typed character, when it has one
pub fn virtual_key_for_char(c: char) -> Option<(u32, Modifiers)> {
    match c {
        'a'..='z' => Some((c.to_ascii_uppercase() as u32, Modifiers::NONE)),
        'A'..='Z' => Some((c as u32, Modifiers { shift: true, ..Modifiers::NONE })),
        '0'..='9' => Some((c as u32, Modifiers::NONE)),
        ' ' => Some((vk::SPACE, Modifiers::NONE)),
        _ => None,
    }
}
