//! Control adapter: the bridge between a window and its control tree
//!
//! The adapter owns the window's top-level controls and re-dispatches
//! semantic input into the tree:
//! - Mouse events hit-test front to back and bubble from the deepest control
//! - The control receiving a press captures the pointer until all buttons are up
//! - Hover changes raise leave on the old control and enter on the new one
//! - Key events go to the focused control and bubble the same way
//!
//! Event locations arrive in window client coordinates; every control sees
//! them relative to its own top-left corner.

use log::trace;

use crate::error::TreeError;
use crate::geometry::{Point, Rect};
use crate::input::{KeyEvent, KeyPressEvent, MouseEvent, UiEvent};
use crate::platform::WindowState;

use super::canvas::Canvas;
use super::control::{Control, EventResult, MouseEventKind, WindowRequest};
use super::control_tree::{ControlId, ControlTree};
use super::paint::paint_tree;
use super::style::ControlStyle;

#[derive(Default)]
pub struct ControlAdapter {
    tree: ControlTree,
    /// Window client coordinates
    bounds: Rect,
    style: ControlStyle,
    window_state: WindowState,
    hovered: Option<ControlId>,
    captured: Option<ControlId>,
    focused: Option<ControlId>,
    requests: Vec<WindowRequest>,
}

impl ControlAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level control collection
    pub fn controls(&self) -> &ControlTree {
        &self.tree
    }

    pub fn controls_mut(&mut self) -> &mut ControlTree {
        &mut self.tree
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Move the adapter and lay out every top-level control again
    pub fn set_bounds(&mut self, bounds: Rect) {
        let bounds = bounds.clamped();
        if self.bounds != bounds {
            trace!("[Adapter] bounds {:?} -> {:?}", self.bounds, bounds);
            self.bounds = bounds;
        }
        self.tree.layout_roots(Rect::from_size(bounds.size()));
    }

    pub fn style(&self) -> &ControlStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: ControlStyle) {
        self.style = style;
    }

    pub(crate) fn set_window_state(&mut self, state: WindowState) {
        self.window_state = state;
    }

    pub fn hovered(&self) -> Option<ControlId> {
        self.hovered.filter(|id| self.tree.contains(*id))
    }

    pub fn captured(&self) -> Option<ControlId> {
        self.captured.filter(|id| self.tree.contains(*id))
    }

    pub fn focused(&self) -> Option<ControlId> {
        self.focused.filter(|id| self.tree.contains(*id))
    }

    /// Give keyboard focus to a control
    pub fn focus(&mut self, id: ControlId) -> Result<(), TreeError> {
        if !self.tree.contains(id) {
            return Err(TreeError::StaleControl(id));
        }
        self.set_focus(Some(id));
        Ok(())
    }

    fn set_focus(&mut self, id: Option<ControlId>) {
        let old = self.focused();
        if old == id {
            return;
        }
        for (target, focused) in [(old, false), (id, true)] {
            let Some(target) = target else {
                continue;
            };
            self.with_control(target, |control| control.set_focused(focused));
            self.tree.invalidate(target);
        }
        self.focused = id;
    }

    fn with_control(&mut self, id: ControlId, f: impl FnOnce(&mut dyn Control)) {
        let Self { tree, requests, window_state, .. } = self;
        let mut f = Some(f);
        tree.dispatch(id, false, *window_state, requests, |control, _, _| {
            if let Some(f) = f.take() {
                f(control);
            }
            EventResult::Consumed
        });
    }

    /// `point` in tree coordinates, or `None` outside the adapter, where nothing is painted
    fn to_tree(&self, point: Point) -> Option<Point> {
        self.bounds
            .contains(point)
            .then(|| Point::new(point.x - self.bounds.x, point.y - self.bounds.y))
    }

    fn hit_path(&self, event: &MouseEvent) -> Vec<ControlId> {
        self.to_tree(event.location).map(|point| self.tree.hit_path(point)).unwrap_or_default()
    }

    fn hit_test(&self, event: &MouseEvent) -> Option<ControlId> {
        let hit = self.to_tree(event.location).and_then(|point| self.tree.hit_test(point));
        if hit.is_none() {
            trace!("[Adapter] no control at {:?}", event.location);
        }
        hit
    }

    fn raise_mouse(&mut self, target: ControlId, kind: MouseEventKind, event: &MouseEvent, bubble: bool) -> EventResult {
        let event = event.relative_to(self.bounds.location());
        let Self { tree, requests, window_state, .. } = self;
        tree.dispatch(target, bubble, *window_state, requests, |control, bounds, ctx| {
            control.on_mouse(kind, &event.relative_to(bounds.location()), ctx)
        })
    }

    /// Route one semantic event
    pub fn dispatch(&mut self, event: &UiEvent) -> EventResult {
        match event {
            UiEvent::MouseDown(e) => self.raise_mouse_down(e),
            UiEvent::MouseUp(e) => self.raise_mouse_up(e),
            UiEvent::MouseMove(e) => self.raise_mouse_move(e),
            UiEvent::MouseLeave(e) => self.raise_mouse_leave(e),
            UiEvent::Click(e) => self.raise_click(e),
            UiEvent::DoubleClick(e) => self.raise_double_click(e),
            UiEvent::KeyDown(e) => self.raise_key_down(e),
            UiEvent::KeyPress(e) => self.raise_key_press(e),
        }
    }

    pub fn raise_mouse_down(&mut self, event: &MouseEvent) -> EventResult {
        // A further button pressed during a drag stays with the captured control
        let mut others = event.pressed;
        others.remove(event.button);
        if let Some(captured) = self.captured().filter(|_| !others.is_empty()) {
            return self.raise_mouse(captured, MouseEventKind::Down, event, true);
        }

        let path = self.hit_path(event);
        let Some(&target) = path.last() else {
            trace!("[Adapter] no control at {:?}", event.location);
            return EventResult::Ignored;
        };
        self.captured = Some(target);
        let focusable = path.iter().rev().copied().find(|&id| {
            self.tree.node(id).map_or(false, |node| node.control().focusable())
        });
        if focusable.is_some() {
            self.set_focus(focusable);
        }
        self.raise_mouse(target, MouseEventKind::Down, event, true)
    }

    pub fn raise_mouse_up(&mut self, event: &MouseEvent) -> EventResult {
        let target = self.captured().or_else(|| self.hit_test(event));
        if event.pressed.is_empty() {
            self.captured = None;
        }
        match target {
            Some(target) => self.raise_mouse(target, MouseEventKind::Up, event, true),
            None => EventResult::Ignored,
        }
    }

    pub fn raise_mouse_move(&mut self, event: &MouseEvent) -> EventResult {
        let hit = self.to_tree(event.location).and_then(|point| self.tree.hit_test(point));
        let hovered = self.hovered();
        if hovered != hit {
            if let Some(old) = hovered {
                self.raise_mouse(old, MouseEventKind::Leave, event, false);
            }
            if let Some(new) = hit {
                self.raise_mouse(new, MouseEventKind::Enter, event, false);
            }
            self.hovered = hit;
        }

        let captured = self.captured().filter(|_| !event.pressed.is_empty());
        match captured.or(hit) {
            Some(target) => self.raise_mouse(target, MouseEventKind::Move, event, true),
            None => EventResult::Ignored,
        }
    }

    /// The pointer left the window
    pub fn raise_mouse_leave(&mut self, event: &MouseEvent) -> EventResult {
        let hovered = self.hovered();
        self.hovered = None;
        match hovered {
            Some(old) => self.raise_mouse(old, MouseEventKind::Leave, event, false),
            None => EventResult::Ignored,
        }
    }

    pub fn raise_click(&mut self, event: &MouseEvent) -> EventResult {
        self.raise_click_kind(MouseEventKind::Click, event)
    }

    pub fn raise_double_click(&mut self, event: &MouseEvent) -> EventResult {
        self.raise_click_kind(MouseEventKind::DoubleClick, event)
    }

    /// Clicks reach the hit control only when the press started on it or an ancestor
    fn raise_click_kind(&mut self, kind: MouseEventKind, event: &MouseEvent) -> EventResult {
        let Some(target) = self.hit_test(event) else {
            return EventResult::Ignored;
        };
        if let Some(captured) = self.captured() {
            if !self.tree.is_ancestor_or_self(captured, target) {
                trace!("[Adapter] {:?} cancelled, released outside {:?}", kind, captured);
                return EventResult::Ignored;
            }
        }
        self.raise_mouse(target, kind, event, true)
    }

    pub fn raise_key_down(&mut self, event: &KeyEvent) -> EventResult {
        let Some(target) = self.focused() else {
            trace!("[Adapter] key {:?} dropped, nothing focused", event.key);
            return EventResult::Ignored;
        };
        let Self { tree, requests, window_state, .. } = self;
        tree.dispatch(target, true, *window_state, requests, |control, _, ctx| control.on_key_down(event, ctx))
    }

    pub fn raise_key_press(&mut self, event: &KeyPressEvent) -> EventResult {
        let Some(target) = self.focused() else {
            trace!("[Adapter] char {:?} dropped, nothing focused", event.ch);
            return EventResult::Ignored;
        };
        let Self { tree, requests, window_state, .. } = self;
        tree.dispatch(target, true, *window_state, requests, |control, _, ctx| control.on_key_press(event, ctx))
    }

    /// Paint the adapter's own background and border
    pub fn raise_paint_background(&self, canvas: &mut Canvas) {
        canvas.draw_background(self.bounds, &self.style);
        canvas.draw_border(self.bounds, &self.style);
    }

    /// Paint the control tree clipped to the adapter's bounds
    pub fn raise_paint(&self, canvas: &mut Canvas) {
        canvas.save();
        canvas.translate(self.bounds.x, self.bounds.y);
        canvas.clip_rect(Rect::from_size(self.bounds.size()));
        if !canvas.is_clip_empty() {
            paint_tree(&self.tree, canvas);
        }
        canvas.restore();
    }

    /// Coalesced damage in window client coordinates
    pub fn take_damage(&mut self) -> Vec<Rect> {
        let (dx, dy) = (self.bounds.x, self.bounds.y);
        self.tree
            .take_damage()
            .into_iter()
            .map(|rect| rect.offset(dx, dy))
            .collect()
    }

    /// Window requests raised by controls since the last call
    pub fn take_requests(&mut self) -> Vec<WindowRequest> {
        std::mem::take(&mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::input::{ButtonSet, Keys, Modifiers, MouseButton};
    use crate::ui::control::EventContext;
    use crate::ui::layout::LayoutEngine;
    use crate::ui::widgets::{RibbonItem, RibbonItemGroup};
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(&'static str, MouseEventKind, Point)>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        consume: bool,
        focusable: bool,
        keys: Rc<RefCell<Vec<Keys>>>,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self { name, log: log.clone(), consume: true, focusable: false, keys: Rc::default() }
        }
    }

    impl Control for Recorder {
        fn focusable(&self) -> bool {
            self.focusable
        }
        fn on_mouse(&mut self, kind: MouseEventKind, event: &MouseEvent, _ctx: &mut EventContext) -> EventResult {
            self.log.borrow_mut().push((self.name, kind, event.location));
            if self.consume {
                EventResult::Consumed
            } else {
                EventResult::Ignored
            }
        }
        fn on_key_down(&mut self, event: &KeyEvent, _ctx: &mut EventContext) -> EventResult {
            self.keys.borrow_mut().push(event.key);
            EventResult::Consumed
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn mouse(x: i32, y: i32, button: MouseButton, pressed: ButtonSet) -> MouseEvent {
        MouseEvent {
            button,
            clicks: if button == MouseButton::None { 0 } else { 1 },
            location: Point::new(x, y),
            modifiers: Modifiers::NONE,
            pressed,
        }
    }

    fn held() -> ButtonSet {
        let mut set = ButtonSet::EMPTY;
        set.insert(MouseButton::Left);
        set
    }

    /// Adapter at (10, 10) holding `outer` at (0, 0, 100, 100) with `inner` at (20, 20, 30, 30)
    fn fixture(log: &Log, inner_consumes: bool) -> (ControlAdapter, ControlId, ControlId) {
        let mut adapter = ControlAdapter::new();
        adapter.set_bounds(Rect::new(10, 10, 200, 200));
        let tree = adapter.controls_mut();
        let outer = tree.add_root(Recorder::new("outer", log));
        tree.set_bounds(outer, Rect::new(0, 0, 100, 100)).unwrap();
        let mut inner = Recorder::new("inner", log);
        inner.consume = inner_consumes;
        let inner = tree.add_child(outer, inner).unwrap();
        tree.set_bounds(inner, Rect::new(20, 20, 30, 30)).unwrap();
        (adapter, outer, inner)
    }

    #[test]
    fn test_miss_is_silently_dropped() {
        let log = Log::default();
        let (mut adapter, _, _) = fixture(&log, true);
        let result = adapter.raise_mouse_down(&mouse(500, 500, MouseButton::Left, held()));
        assert_eq!(result, EventResult::Ignored);
        assert!(log.borrow().is_empty());
        assert_eq!(adapter.captured(), None);
    }

    #[test]
    fn test_events_arrive_in_local_coordinates() {
        let log = Log::default();
        let (mut adapter, _, _) = fixture(&log, true);
        adapter.raise_mouse_down(&mouse(35, 40, MouseButton::Left, held()));
        assert_eq!(log.borrow()[0], ("inner", MouseEventKind::Down, Point::new(5, 10)));
    }

    #[test]
    fn test_unhandled_events_bubble_to_parent() {
        let log = Log::default();
        let (mut adapter, _, _) = fixture(&log, false);
        adapter.raise_mouse_down(&mouse(35, 40, MouseButton::Left, held()));
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "inner");
        assert_eq!(log[1], ("outer", MouseEventKind::Down, Point::new(25, 30)));
    }

    #[test]
    fn test_capture_routes_moves_and_cancels_outside_click() {
        let log = Log::default();
        let (mut adapter, _, inner) = fixture(&log, true);
        adapter.raise_mouse_down(&mouse(35, 40, MouseButton::Left, held()));
        assert_eq!(adapter.captured(), Some(inner));

        // Dragging off the control still reaches it, in its own coordinates
        log.borrow_mut().clear();
        adapter.raise_mouse_move(&mouse(15, 15, MouseButton::None, held()));
        assert!(log.borrow().contains(&("inner", MouseEventKind::Move, Point::new(-15, -15))));

        // Released over the parent: no click, but the up goes to the captured control
        log.borrow_mut().clear();
        adapter.raise_click(&mouse(15, 15, MouseButton::Left, ButtonSet::EMPTY));
        adapter.raise_mouse_up(&mouse(15, 15, MouseButton::Left, ButtonSet::EMPTY));
        assert_eq!(*log.borrow(), vec![("inner", MouseEventKind::Up, Point::new(-15, -15))]);
        assert_eq!(adapter.captured(), None);
    }

    #[test]
    fn test_click_inside_captured_control_is_delivered() {
        let log = Log::default();
        let (mut adapter, outer, _) = fixture(&log, true);
        // Press on the parent, release on its child
        adapter.raise_mouse_down(&mouse(12, 12, MouseButton::Left, held()));
        assert_eq!(adapter.captured(), Some(outer));
        log.borrow_mut().clear();
        adapter.raise_click(&mouse(35, 40, MouseButton::Left, ButtonSet::EMPTY));
        assert_eq!(*log.borrow(), vec![("inner", MouseEventKind::Click, Point::new(5, 10))]);
    }

    #[test]
    fn test_hover_raises_enter_and_leave() {
        let log = Log::default();
        let (mut adapter, _, _) = fixture(&log, true);
        adapter.raise_mouse_move(&mouse(15, 15, MouseButton::None, ButtonSet::EMPTY));
        adapter.raise_mouse_move(&mouse(35, 40, MouseButton::None, ButtonSet::EMPTY));
        adapter.raise_mouse_leave(&mouse(-1, -1, MouseButton::None, ButtonSet::EMPTY));

        let kinds: Vec<_> = log.borrow().iter().map(|(name, kind, _)| (*name, *kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("outer", MouseEventKind::Enter),
                ("outer", MouseEventKind::Move),
                ("outer", MouseEventKind::Leave),
                ("inner", MouseEventKind::Enter),
                ("inner", MouseEventKind::Move),
                ("inner", MouseEventKind::Leave),
            ]
        );
        assert_eq!(adapter.hovered(), None);
    }

    #[test]
    fn test_keys_go_to_focused_control() {
        let log = Log::default();
        let mut adapter = ControlAdapter::new();
        adapter.set_bounds(Rect::new(0, 0, 100, 100));
        let mut field = Recorder::new("field", &log);
        field.focusable = true;
        let keys = field.keys.clone();
        let tree = adapter.controls_mut();
        let id = tree.add_root(field);
        tree.set_bounds(id, Rect::new(0, 0, 50, 50)).unwrap();

        let key = KeyEvent { key: Keys::Letter('A'), modifiers: Modifiers::NONE };
        assert_eq!(adapter.raise_key_down(&key), EventResult::Ignored);
        adapter.raise_mouse_down(&mouse(5, 5, MouseButton::Left, held()));
        assert_eq!(adapter.focused(), Some(id));
        assert_eq!(adapter.raise_key_down(&key), EventResult::Consumed);
        assert_eq!(*keys.borrow(), vec![Keys::Letter('A')]);
    }

    #[test]
    fn test_ribbon_item_click_through_adapter() {
        let clicked = Rc::new(RefCell::new(0));
        let counter = clicked.clone();
        let mut adapter = ControlAdapter::new();
        adapter.set_bounds(Rect::new(0, 0, 300, 100));
        let tree = adapter.controls_mut();
        let group = tree.add_root(RibbonItemGroup::new("Font"));
        let item = tree
            .add_child(group, RibbonItem::new("Bold", 40).on_click(move |_| *counter.borrow_mut() += 1))
            .unwrap();
        tree.set_bounds(group, Rect::new(10, 10, 107, 30)).unwrap();

        adapter.raise_mouse_down(&mouse(20, 20, MouseButton::Left, held()));
        assert_eq!(adapter.captured(), Some(item));
        adapter.raise_click(&mouse(20, 20, MouseButton::Left, ButtonSet::EMPTY));
        adapter.raise_mouse_up(&mouse(20, 20, MouseButton::Left, ButtonSet::EMPTY));
        assert_eq!(*clicked.borrow(), 1);
        assert_eq!(adapter.focused(), Some(item));
    }

    #[test]
    fn test_damage_is_reported_in_window_coordinates() {
        let mut adapter = ControlAdapter::new();
        adapter.set_bounds(Rect::new(5, 7, 100, 100));
        let tree = adapter.controls_mut();
        let id = tree.add_root(crate::ui::widgets::Panel::new().with_layout(LayoutEngine::Dock));
        tree.take_damage();
        tree.set_bounds(id, Rect::new(1, 1, 10, 10)).unwrap();
        assert_eq!(adapter.take_damage(), vec![Rect::new(6, 8, 10, 10)]);
        assert_eq!(adapter.bounds().size(), Size::new(100, 100));
    }

    #[test]
    fn test_border_pixels_outside_adapter_are_not_hit() {
        let log = Log::default();
        let mut adapter = ControlAdapter::new();
        adapter.set_bounds(Rect::new(1, 1, 18, 8));
        let tree = adapter.controls_mut();
        let id = tree.add_root(Recorder::new("panel", &log));
        tree.set_bounds(id, Rect::new(-5, -5, 100, 100)).unwrap();

        assert_eq!(adapter.raise_mouse_down(&mouse(0, 0, MouseButton::Left, held())), EventResult::Ignored);
        assert_eq!(adapter.captured(), None);
        adapter.raise_mouse_move(&mouse(19, 4, MouseButton::None, ButtonSet::EMPTY));
        assert_eq!(adapter.hovered(), None);
        assert!(log.borrow().is_empty());

        adapter.raise_mouse_down(&mouse(1, 1, MouseButton::Left, held()));
        assert_eq!(adapter.captured(), Some(id));
    }

    #[test]
    fn test_second_button_keeps_first_capture() {
        let log = Log::default();
        let (mut adapter, outer, inner) = fixture(&log, true);
        adapter.raise_mouse_down(&mouse(35, 40, MouseButton::Left, held()));
        assert_eq!(adapter.captured(), Some(inner));

        let mut both = held();
        both.insert(MouseButton::Right);
        log.borrow_mut().clear();
        adapter.raise_mouse_down(&mouse(12, 12, MouseButton::Right, both));
        assert_eq!(adapter.captured(), Some(inner));
        assert_eq!(*log.borrow(), vec![("inner", MouseEventKind::Down, Point::new(-18, -18))]);

        // Once everything is released, a new press captures afresh
        adapter.raise_mouse_up(&mouse(12, 12, MouseButton::Left, ButtonSet::EMPTY));
        adapter.raise_mouse_down(&mouse(12, 12, MouseButton::Left, held()));
        assert_eq!(adapter.captured(), Some(outer));
    }
}
