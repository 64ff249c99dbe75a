//! Input translation: raw platform input into semantic pointer and key events
//!
//! The translator owns the per-window gesture state (last click time and the
//! pressed-button set). Click multiplicity is decided on button release and is
//! global to the window, not to the control under the pointer.

use std::time::{Duration, Instant};

use log::trace;

use crate::geometry::Point;
use crate::platform::{RawInput, RawKeyKind, RawMouseKind};

/// Two releases closer together than this count as a double click
pub const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);

/// Mouse button carried by a semantic mouse event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
}

impl MouseButton {
    fn bit(self) -> u8 {
        match self {
            MouseButton::None => 0,
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 4,
        }
    }
}

/// Set of currently pressed mouse buttons
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u8);

impl ButtonSet {
    pub const EMPTY: ButtonSet = ButtonSet(0);

    pub fn contains(&self, button: MouseButton) -> bool {
        button != MouseButton::None && self.0 & button.bit() != 0
    }

    pub fn insert(&mut self, button: MouseButton) {
        self.0 |= button.bit();
    }

    pub fn remove(&mut self, button: MouseButton) {
        self.0 &= !button.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false };
}

/// Immutable description of a mouse event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub clicks: u32,
    pub location: Point,
    pub modifiers: Modifiers,
    /// Buttons held down after this event was applied
    pub pressed: ButtonSet,
}

impl MouseEvent {
    /// Copy of this event with the location rebased by `origin`
    pub fn relative_to(&self, origin: Point) -> MouseEvent {
        MouseEvent {
            location: Point::new(self.location.x - origin.x, self.location.y - origin.y),
            ..*self
        }
    }
}

/// Logical key codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keys {
    Back,
    Tab,
    Enter,
    Shift,
    Control,
    Alt,
    Pause,
    CapsLock,
    Escape,
    Space,
    PageUp,
    PageDown,
    End,
    Home,
    Left,
    Up,
    Right,
    Down,
    Insert,
    Delete,
    /// `0`-`9` on the main row
    Digit(u8),
    /// `A`-`Z`, uppercase
    Letter(char),
    /// F1-F24
    F(u8),
    /// A code without a logical mapping
    Unknown(u32),
}

impl Keys {
    /// Map a Win32-style virtual-key code to a logical key
    pub fn from_virtual_key(code: u32) -> Keys {
        match code {
            0x08 => Keys::Back,
            0x09 => Keys::Tab,
            0x0D => Keys::Enter,
            0x10 => Keys::Shift,
            0x11 => Keys::Control,
            0x12 => Keys::Alt,
            0x13 => Keys::Pause,
            0x14 => Keys::CapsLock,
            0x1B => Keys::Escape,
            0x20 => Keys::Space,
            0x21 => Keys::PageUp,
            0x22 => Keys::PageDown,
            0x23 => Keys::End,
            0x24 => Keys::Home,
            0x25 => Keys::Left,
            0x26 => Keys::Up,
            0x27 => Keys::Right,
            0x28 => Keys::Down,
            0x2D => Keys::Insert,
            0x2E => Keys::Delete,
            0x30..=0x39 => Keys::Digit((code - 0x30) as u8),
            0x41..=0x5A => match char::from_u32(code) {
                Some(c) => Keys::Letter(c),
                None => Keys::Unknown(code),
            },
            0x70..=0x87 => Keys::F((code - 0x6F) as u8),
            other => Keys::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Keys,
    pub modifiers: Modifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPressEvent {
    pub ch: char,
}

/// Semantic events produced by the translator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiEvent {
    MouseDown(MouseEvent),
    MouseUp(MouseEvent),
    MouseMove(MouseEvent),
    MouseLeave(MouseEvent),
    Click(MouseEvent),
    DoubleClick(MouseEvent),
    KeyDown(KeyEvent),
    KeyPress(KeyPressEvent),
}

/// Transient click-timing state for one window
#[derive(Clone, Copy, Debug, Default)]
pub struct GestureState {
    /// Time of the last counted click; cleared after a double click
    pub last_click: Option<Instant>,
    pub pressed: ButtonSet,
}

/// Converts raw platform input into semantic events, in dispatch order
#[derive(Debug)]
pub struct InputTranslator {
    gesture: GestureState,
    double_click_time: Duration,
}

impl Default for InputTranslator {
    fn default() -> Self {
        Self::new(DOUBLE_CLICK_TIME)
    }
}

impl InputTranslator {
    pub fn new(double_click_time: Duration) -> Self {
        Self {
            gesture: GestureState::default(),
            double_click_time,
        }
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    pub fn double_click_time(&self) -> Duration {
        self.double_click_time
    }

    /// Translate one raw event observed at `now`
    pub fn translate(&mut self, raw: &RawInput, now: Instant) -> Vec<UiEvent> {
        match raw {
            RawInput::Mouse { kind, position, modifiers } => {
                self.translate_mouse(*kind, *position, *modifiers, now)
            }
            RawInput::Key { kind: RawKeyKind::KeyDown, code, modifiers } => {
                vec![UiEvent::KeyDown(KeyEvent {
                    key: Keys::from_virtual_key(*code),
                    modifiers: *modifiers,
                })]
            }
            // Key-up has no semantic counterpart
            RawInput::Key { kind: RawKeyKind::KeyUp, code, .. } => {
                trace!("[Input] key-up {:#04x} not translated", code);
                Vec::new()
            }
            RawInput::TextInput { text } => match text.chars().next() {
                Some(ch) => vec![UiEvent::KeyPress(KeyPressEvent { ch })],
                None => {
                    trace!("[Input] empty text input dropped");
                    Vec::new()
                }
            },
        }
    }

    fn translate_mouse(
        &mut self,
        kind: RawMouseKind,
        location: Point,
        modifiers: Modifiers,
        now: Instant,
    ) -> Vec<UiEvent> {
        match kind {
            RawMouseKind::LeftButtonDown => self.button_down(MouseButton::Left, location, modifiers),
            RawMouseKind::MiddleButtonDown => self.button_down(MouseButton::Middle, location, modifiers),
            RawMouseKind::RightButtonDown => self.button_down(MouseButton::Right, location, modifiers),
            RawMouseKind::LeftButtonUp => self.button_up(MouseButton::Left, location, modifiers, now),
            RawMouseKind::MiddleButtonUp => self.button_up(MouseButton::Middle, location, modifiers, now),
            RawMouseKind::RightButtonUp => self.button_up(MouseButton::Right, location, modifiers, now),
            RawMouseKind::LeaveWindow => {
                vec![UiEvent::MouseLeave(self.pointer_args(location, modifiers))]
            }
            RawMouseKind::Move => vec![UiEvent::MouseMove(self.pointer_args(location, modifiers))],
        }
    }

    fn pointer_args(&self, location: Point, modifiers: Modifiers) -> MouseEvent {
        MouseEvent {
            button: MouseButton::None,
            clicks: 0,
            location,
            modifiers,
            pressed: self.gesture.pressed,
        }
    }

    fn button_down(&mut self, button: MouseButton, location: Point, modifiers: Modifiers) -> Vec<UiEvent> {
        self.gesture.pressed.insert(button);
        vec![UiEvent::MouseDown(MouseEvent {
            button,
            clicks: 1,
            location,
            modifiers,
            pressed: self.gesture.pressed,
        })]
    }

    fn button_up(
        &mut self,
        button: MouseButton,
        location: Point,
        modifiers: Modifiers,
        now: Instant,
    ) -> Vec<UiEvent> {
        self.gesture.pressed.remove(button);
        let event = MouseEvent {
            button,
            clicks: self.click_count(now),
            location,
            modifiers,
            pressed: self.gesture.pressed,
        };

        let mut events = Vec::with_capacity(3);
        if event.clicks > 1 {
            events.push(UiEvent::DoubleClick(event));
        }
        events.push(UiEvent::Click(event));
        events.push(UiEvent::MouseUp(event));
        events
    }

    /// Count this release and update the stored timestamp.
    /// A double click clears the timestamp so the next release starts over at 1.
    fn click_count(&mut self, now: Instant) -> u32 {
        let clicks = match self.gesture.last_click {
            Some(last) if now.saturating_duration_since(last) < self.double_click_time => 2,
            _ => 1,
        };
        trace!("[Input] release counted as {} click(s)", clicks);
        self.gesture.last_click = if clicks > 1 { None } else { Some(now) };
        clicks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(kind: RawMouseKind, x: i32, y: i32) -> RawInput {
        RawInput::Mouse {
            kind,
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    fn clicks_of(events: &[UiEvent]) -> u32 {
        events
            .iter()
            .find_map(|e| match e {
                UiEvent::Click(m) => Some(m.clicks),
                _ => None,
            })
            .unwrap_or(0)
    }

    fn names(events: &[UiEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                UiEvent::MouseDown(_) => "down",
                UiEvent::MouseUp(_) => "up",
                UiEvent::MouseMove(_) => "move",
                UiEvent::MouseLeave(_) => "leave",
                UiEvent::Click(_) => "click",
                UiEvent::DoubleClick(_) => "double",
                UiEvent::KeyDown(_) => "keydown",
                UiEvent::KeyPress(_) => "keypress",
            })
            .collect()
    }

    #[test]
    fn test_button_down_emits_single_mouse_down() {
        let mut translator = InputTranslator::default();
        let events = translator.translate(&mouse(RawMouseKind::RightButtonDown, 4, 5), Instant::now());
        assert_eq!(events.len(), 1);
        match events[0] {
            UiEvent::MouseDown(e) => {
                assert_eq!(e.button, MouseButton::Right);
                assert_eq!(e.clicks, 1);
                assert_eq!(e.location, Point::new(4, 5));
                assert!(e.pressed.contains(MouseButton::Right));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_slow_clicks_always_count_one() {
        let mut translator = InputTranslator::default();
        let start = Instant::now();
        for i in 0..5u64 {
            let at = start + Duration::from_millis(i * 500);
            translator.translate(&mouse(RawMouseKind::LeftButtonDown, 1, 1), at);
            let events = translator.translate(&mouse(RawMouseKind::LeftButtonUp, 1, 1), at);
            assert_eq!(clicks_of(&events), 1, "click {} should be single", i);
            assert_eq!(names(&events), vec!["click", "up"]);
        }
    }

    #[test]
    fn test_fast_second_release_is_double_click_in_order() {
        let mut translator = InputTranslator::default();
        let start = Instant::now();
        translator.translate(&mouse(RawMouseKind::LeftButtonUp, 1, 1), start);
        let events = translator.translate(
            &mouse(RawMouseKind::LeftButtonUp, 1, 1),
            start + Duration::from_millis(499),
        );
        assert_eq!(names(&events), vec!["double", "click", "up"]);
        assert_eq!(clicks_of(&events), 2);
    }

    #[test]
    fn test_third_rapid_click_restarts_counting() {
        let mut translator = InputTranslator::default();
        let start = Instant::now();
        let counts: Vec<u32> = (0..4u64)
            .map(|i| {
                let events = translator.translate(
                    &mouse(RawMouseKind::LeftButtonUp, 1, 1),
                    start + Duration::from_millis(i * 100),
                );
                clicks_of(&events)
            })
            .collect();
        assert_eq!(counts, vec![1, 2, 1, 2]);
        assert!(translator.gesture().last_click.is_none());
    }

    #[test]
    fn test_click_timing_is_shared_across_buttons_and_positions() {
        let mut translator = InputTranslator::default();
        let start = Instant::now();
        translator.translate(&mouse(RawMouseKind::LeftButtonUp, 0, 0), start);
        let events = translator.translate(
            &mouse(RawMouseKind::RightButtonUp, 300, 200),
            start + Duration::from_millis(120),
        );
        assert_eq!(clicks_of(&events), 2);
        match events[0] {
            UiEvent::DoubleClick(e) => assert_eq!(e.button, MouseButton::Right),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_move_and_leave_carry_no_button() {
        let mut translator = InputTranslator::default();
        let now = Instant::now();
        for (kind, name) in [(RawMouseKind::Move, "move"), (RawMouseKind::LeaveWindow, "leave")] {
            let events = translator.translate(&mouse(kind, 7, 8), now);
            assert_eq!(names(&events), vec![name]);
            match events[0] {
                UiEvent::MouseMove(e) | UiEvent::MouseLeave(e) => {
                    assert_eq!(e.button, MouseButton::None);
                    assert_eq!(e.clicks, 0);
                }
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn test_key_up_is_not_translated() {
        let mut translator = InputTranslator::default();
        let now = Instant::now();
        let down = RawInput::Key { kind: RawKeyKind::KeyDown, code: 0x41, modifiers: Modifiers::NONE };
        let up = RawInput::Key { kind: RawKeyKind::KeyUp, code: 0x41, modifiers: Modifiers::NONE };
        assert_eq!(
            translator.translate(&down, now),
            vec![UiEvent::KeyDown(KeyEvent { key: Keys::Letter('A'), modifiers: Modifiers::NONE })]
        );
        assert!(translator.translate(&up, now).is_empty());
    }

    #[test]
    fn test_text_input_keeps_only_first_character() {
        let mut translator = InputTranslator::default();
        let now = Instant::now();
        let events = translator.translate(&RawInput::TextInput { text: "héllo".to_string() }, now);
        assert_eq!(events, vec![UiEvent::KeyPress(KeyPressEvent { ch: 'h' })]);
        assert!(translator
            .translate(&RawInput::TextInput { text: String::new() }, now)
            .is_empty());
    }

    #[test]
    fn test_virtual_key_mapping() {
        assert_eq!(Keys::from_virtual_key(0x0D), Keys::Enter);
        assert_eq!(Keys::from_virtual_key(0x35), Keys::Digit(5));
        assert_eq!(Keys::from_virtual_key(0x5A), Keys::Letter('Z'));
        assert_eq!(Keys::from_virtual_key(0x70), Keys::F(1));
        assert_eq!(Keys::from_virtual_key(0x7B), Keys::F(12));
        assert_eq!(Keys::from_virtual_key(0xFF), Keys::Unknown(0xFF));
    }
}
