//! Title bar drawing and hit testing
//!
//! Window buttons sit at the right edge, close outermost. The rest of the bar
//! is the caption: pressing it starts a platform move drag and
//! double-clicking it toggles maximize.

use std::any::Any;

use crate::geometry::{Point, Rect, Size};
use crate::input::{MouseButton, MouseEvent};
use crate::platform::WindowState;
use crate::ui::canvas::Canvas;
use crate::ui::control::{Control, EventContext, EventResult, MouseEventKind, WindowRequest};
use crate::ui::layout::Dock;
use crate::ui::style::{Color, ControlStyle};
use crate::ui::theme::Theme;

pub const TITLE_BAR_HEIGHT: i32 = 32;

/// Width of each window button
pub const BUTTON_WIDTH: i32 = 46;

/// Side of the square each button glyph is drawn in
const GLYPH_SIZE: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TitleBarButton {
    Close,
    Maximize,
    Minimize,
}

impl TitleBarButton {
    /// Right to left
    const ALL: [TitleBarButton; 3] = [TitleBarButton::Close, TitleBarButton::Maximize, TitleBarButton::Minimize];
}

/// Bounds of a window button inside a bar of the given size
pub fn button_bounds(size: Size, button: TitleBarButton) -> Rect {
    let slot = TitleBarButton::ALL.iter().position(|b| *b == button).unwrap_or(0) as i32;
    Rect::new(size.width - BUTTON_WIDTH * (slot + 1), 0, BUTTON_WIDTH, size.height)
}

/// Window button under a point, `None` on the caption
pub fn button_at(size: Size, point: Point) -> Option<TitleBarButton> {
    TitleBarButton::ALL
        .into_iter()
        .find(|&button| button_bounds(size, button).contains(point))
}

pub struct TitleBar {
    text: String,
    hovered: Option<TitleBarButton>,
    pressed: Option<TitleBarButton>,
    maximized: bool,
}

impl TitleBar {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), hovered: None, pressed: None, maximized: false }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn hovered(&self) -> Option<TitleBarButton> {
        self.hovered
    }

    fn set_hovered(&mut self, hovered: Option<TitleBarButton>, ctx: &mut EventContext) {
        if self.hovered != hovered {
            let size = ctx.size();
            for button in [self.hovered, hovered].into_iter().flatten() {
                ctx.invalidate_rect(button_bounds(size, button));
            }
            self.hovered = hovered;
        }
    }

    fn toggle_maximize(&mut self, ctx: &mut EventContext) {
        let state = if ctx.window_state() == WindowState::Maximized {
            WindowState::Normal
        } else {
            WindowState::Maximized
        };
        self.maximized = state == WindowState::Maximized;
        ctx.request(WindowRequest::SetWindowState(state));
        ctx.invalidate();
    }

    fn draw_glyph(&self, canvas: &mut Canvas, button: TitleBarButton, bounds: Rect, color: Color) {
        let x = bounds.x + (bounds.width - GLYPH_SIZE) / 2;
        let y = bounds.y + (bounds.height - GLYPH_SIZE) / 2;
        let (right, bottom) = (x + GLYPH_SIZE - 1, y + GLYPH_SIZE - 1);
        match button {
            TitleBarButton::Close => {
                canvas.draw_line(x, y, right, bottom, color);
                canvas.draw_line(x, bottom, right, y, color);
            }
            TitleBarButton::Maximize => {
                let outline = ControlStyle::new().with_border(1, color);
                if self.maximized {
                    canvas.draw_border(Rect::new(x + 2, y, GLYPH_SIZE - 2, GLYPH_SIZE - 2), &outline);
                    let background = canvas.theme().title_bar_background;
                    canvas.fill_rect(Rect::new(x, y + 2, GLYPH_SIZE - 2, GLYPH_SIZE - 2), background);
                    canvas.draw_border(Rect::new(x, y + 2, GLYPH_SIZE - 2, GLYPH_SIZE - 2), &outline);
                } else {
                    canvas.draw_border(Rect::new(x, y, GLYPH_SIZE, GLYPH_SIZE), &outline);
                }
            }
            TitleBarButton::Minimize => {
                let mid = y + GLYPH_SIZE / 2;
                canvas.draw_line(x, mid, right, mid, color);
            }
        }
    }
}

impl Control for TitleBar {
    fn preferred_size(&self, proposed: Size, _children: &[Size]) -> Size {
        Size::new(proposed.width, TITLE_BAR_HEIGHT)
    }

    fn default_style(&self) -> ControlStyle {
        ControlStyle::new().with_background(Theme::MODERN.title_bar_background)
    }

    fn default_dock(&self) -> Dock {
        Dock::Top
    }

    fn paint(&self, canvas: &mut Canvas, size: Size) {
        let theme = canvas.theme().clone();
        for button in TitleBarButton::ALL {
            let bounds = button_bounds(size, button);
            if self.hovered == Some(button) {
                let hover = match button {
                    TitleBarButton::Close => theme.title_bar_close_hover,
                    _ => theme.title_bar_button_hover,
                };
                canvas.fill_rect(bounds, hover);
            }
            self.draw_glyph(canvas, button, bounds, theme.title_bar_glyph);
        }
    }

    fn on_mouse(&mut self, kind: MouseEventKind, event: &MouseEvent, ctx: &mut EventContext) -> EventResult {
        let size = ctx.size();
        let target = button_at(size, event.location);
        match kind {
            MouseEventKind::Enter | MouseEventKind::Move => {
                self.set_hovered(target, ctx);
                EventResult::Consumed
            }
            MouseEventKind::Leave => {
                self.set_hovered(None, ctx);
                EventResult::Consumed
            }
            MouseEventKind::Down if event.button == MouseButton::Left => {
                self.pressed = target;
                if target.is_none() {
                    ctx.request(WindowRequest::BeginMoveDrag);
                }
                EventResult::Consumed
            }
            MouseEventKind::Up => {
                self.pressed = None;
                EventResult::Consumed
            }
            MouseEventKind::DoubleClick if event.button == MouseButton::Left && target.is_none() => {
                self.toggle_maximize(ctx);
                EventResult::Consumed
            }
            MouseEventKind::Click if event.button == MouseButton::Left => {
                // Buttons fire only when pressed and released on the same button
                match target.filter(|button| self.pressed == Some(*button)) {
                    Some(TitleBarButton::Close) => ctx.request(WindowRequest::Close),
                    Some(TitleBarButton::Maximize) => self.toggle_maximize(ctx),
                    Some(TitleBarButton::Minimize) => {
                        ctx.request(WindowRequest::SetWindowState(WindowState::Minimized))
                    }
                    None => {}
                }
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ButtonSet, Modifiers};
    use crate::ui::control_tree::ControlTree;

    fn left(clicks: u32, location: Point) -> MouseEvent {
        MouseEvent {
            button: MouseButton::Left,
            clicks,
            location,
            modifiers: Modifiers::NONE,
            pressed: ButtonSet::EMPTY,
        }
    }

    fn raise(tree: &mut ControlTree, state: WindowState, kind: MouseEventKind, event: MouseEvent) -> Vec<WindowRequest> {
        let id = tree.roots()[0];
        let mut requests = Vec::new();
        tree.dispatch(id, true, state, &mut requests, |control, _, ctx| control.on_mouse(kind, &event, ctx));
        requests
    }

    fn bar() -> ControlTree {
        let mut tree = ControlTree::new();
        tree.add_root(TitleBar::new("Demo"));
        tree.layout_roots(Rect::new(0, 0, 400, 300));
        tree
    }

    #[test]
    fn test_buttons_are_laid_out_from_the_right() {
        let size = Size::new(400, TITLE_BAR_HEIGHT);
        assert_eq!(button_bounds(size, TitleBarButton::Close), Rect::new(354, 0, 46, 32));
        assert_eq!(button_bounds(size, TitleBarButton::Minimize), Rect::new(262, 0, 46, 32));
        assert_eq!(button_at(size, Point::new(399, 5)), Some(TitleBarButton::Close));
        assert_eq!(button_at(size, Point::new(320, 5)), Some(TitleBarButton::Maximize));
        assert_eq!(button_at(size, Point::new(10, 5)), None);
    }

    #[test]
    fn test_caption_press_starts_move_drag() {
        let mut tree = bar();
        let requests = raise(&mut tree, WindowState::Normal, MouseEventKind::Down, left(1, Point::new(20, 10)));
        assert_eq!(requests, vec![WindowRequest::BeginMoveDrag]);

        let requests = raise(&mut tree, WindowState::Normal, MouseEventKind::Down, left(1, Point::new(390, 10)));
        assert!(requests.is_empty());
    }

    #[test]
    fn test_caption_double_click_toggles_maximize() {
        let mut tree = bar();
        let requests = raise(&mut tree, WindowState::Normal, MouseEventKind::DoubleClick, left(2, Point::new(20, 10)));
        assert_eq!(requests, vec![WindowRequest::SetWindowState(WindowState::Maximized)]);
        let requests = raise(&mut tree, WindowState::Maximized, MouseEventKind::DoubleClick, left(2, Point::new(20, 10)));
        assert_eq!(requests, vec![WindowRequest::SetWindowState(WindowState::Normal)]);
    }

    #[test]
    fn test_button_clicks_map_to_requests() {
        let mut tree = bar();
        raise(&mut tree, WindowState::Normal, MouseEventKind::Down, left(1, Point::new(380, 10)));
        let close = raise(&mut tree, WindowState::Normal, MouseEventKind::Click, left(1, Point::new(380, 10)));
        assert_eq!(close, vec![WindowRequest::Close]);
        raise(&mut tree, WindowState::Normal, MouseEventKind::Down, left(1, Point::new(270, 10)));
        let minimize = raise(&mut tree, WindowState::Normal, MouseEventKind::Click, left(1, Point::new(270, 10)));
        assert_eq!(minimize, vec![WindowRequest::SetWindowState(WindowState::Minimized)]);

        // Pressed on minimize, released on close
        raise(&mut tree, WindowState::Normal, MouseEventKind::Down, left(1, Point::new(270, 10)));
        let cancelled = raise(&mut tree, WindowState::Normal, MouseEventKind::Click, left(1, Point::new(380, 10)));
        assert!(cancelled.is_empty());
    }

    #[test]
    fn test_hover_tracks_buttons() {
        let mut tree = bar();
        raise(&mut tree, WindowState::Normal, MouseEventKind::Move, left(0, Point::new(380, 10)));
        let id = tree.roots()[0];
        assert_eq!(tree.control::<TitleBar>(id).unwrap().hovered(), Some(TitleBarButton::Close));
        raise(&mut tree, WindowState::Normal, MouseEventKind::Leave, left(0, Point::new(380, 10)));
        assert_eq!(tree.control::<TitleBar>(id).unwrap().hovered(), None);
    }
}
