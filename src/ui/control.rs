//! Control trait and event plumbing
//!
//! A control encapsulates painting and event handling for one node of the
//! control tree. The tree owns bounds, style and visibility; the control owns
//! its own state and reacts to hooks.

use std::any::Any;

use crate::geometry::{Padding, Rect, Size};
use crate::input::{KeyEvent, KeyPressEvent, MouseEvent};
use crate::platform::WindowState;

use super::canvas::Canvas;
use super::control_tree::ControlId;
use super::layout::{Dock, LayoutEngine};
use super::paint::DamageTracker;
use super::style::ControlStyle;

/// Result of handling an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled, stop propagation
    Consumed,
    /// Event was not handled, continue propagation
    Ignored,
}

impl EventResult {
    pub fn is_consumed(&self) -> bool {
        matches!(self, EventResult::Consumed)
    }
}

/// Which mouse hook is being raised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down,
    Up,
    Move,
    Enter,
    Leave,
    Click,
    DoubleClick,
}

/// Window-level actions a control can ask for while handling an event.
/// They are applied by the window after dispatch completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowRequest {
    BeginMoveDrag,
    Close,
    SetWindowState(WindowState),
}

/// Per-dispatch access to the tree's invalidation and the owning window
pub struct EventContext<'a> {
    id: ControlId,
    bounds: Rect,
    window_state: WindowState,
    damage: &'a mut DamageTracker,
    requests: &'a mut Vec<WindowRequest>,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        id: ControlId,
        bounds: Rect,
        window_state: WindowState,
        damage: &'a mut DamageTracker,
        requests: &'a mut Vec<WindowRequest>,
    ) -> Self {
        Self { id, bounds, window_state, damage, requests }
    }

    /// The control receiving the event
    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    pub fn window_state(&self) -> WindowState {
        self.window_state
    }

    /// Schedule a repaint of the whole control
    pub fn invalidate(&mut self) {
        self.damage.add(self.bounds);
    }

    /// Schedule a repaint of part of the control (local coordinates)
    pub fn invalidate_rect(&mut self, rect: Rect) {
        let rect = rect.offset(self.bounds.x, self.bounds.y).intersect(&self.bounds);
        self.damage.add(rect);
    }

    pub fn request(&mut self, request: WindowRequest) {
        self.requests.push(request);
    }
}

/// Behavior of one node in the control tree
///
/// Every hook has a default, so simple controls only override what they need.
pub trait Control: Any {
    /// Space between the control's edges and its children's layout area
    fn padding(&self) -> Padding {
        Padding::EMPTY
    }

    /// How children are arranged; `None` leaves child bounds to the application
    fn layout_engine(&self) -> Option<LayoutEngine> {
        None
    }

    /// Preferred size given a proposed size and the children's preferred sizes
    fn preferred_size(&self, proposed: Size, _children: &[Size]) -> Size {
        proposed
    }

    fn default_style(&self) -> ControlStyle {
        ControlStyle::default()
    }

    fn default_dock(&self) -> Dock {
        Dock::None
    }

    fn focusable(&self) -> bool {
        false
    }

    fn set_focused(&mut self, _focused: bool) {}

    /// Paint behind children and foreground; the canvas origin is the
    /// control's top-left corner and the clip is its bounds
    fn paint_background(&self, canvas: &mut Canvas, style: &ControlStyle, size: Size) {
        let rect = Rect::from_size(size);
        canvas.draw_background(rect, style);
        canvas.draw_border(rect, style);
    }

    fn paint(&self, _canvas: &mut Canvas, _size: Size) {}

    /// `event.location` is in the control's local coordinates
    fn on_mouse(&mut self, _kind: MouseEventKind, _event: &MouseEvent, _ctx: &mut EventContext) -> EventResult {
        EventResult::Ignored
    }

    fn on_key_down(&mut self, _event: &KeyEvent, _ctx: &mut EventContext) -> EventResult {
        EventResult::Ignored
    }

    fn on_key_press(&mut self, _event: &KeyPressEvent, _ctx: &mut EventContext) -> EventResult {
        EventResult::Ignored
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support (mutable)
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
