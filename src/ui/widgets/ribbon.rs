//! Ribbon toolbar: tab pages holding groups of items
//!
//! A tab page lays its groups out left to right. Each group pads its items,
//! lays them out left to right at their preferred widths, and draws a
//! separator along its right edge.

use std::any::Any;

use crate::geometry::{Padding, Rect, Size};
use crate::input::{KeyEvent, Keys, MouseButton, MouseEvent};
use crate::ui::canvas::Canvas;
use crate::ui::control::{Control, EventContext, EventResult, MouseEventKind};
use crate::ui::layout::{Dock, LayoutEngine};
use crate::ui::style::ControlStyle;
use crate::ui::theme::Theme;

/// Padding inside every item group
pub const GROUP_PADDING: Padding = Padding::new(3, 3, 4, 3);

/// Height a tab page asks for when docked
pub const TAB_PAGE_HEIGHT: i32 = 96;

/// Horizontal strip of item groups
pub struct RibbonTabPage {
    text: String,
    height: i32,
}

impl RibbonTabPage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), height: TAB_PAGE_HEIGHT }
    }

    pub fn with_height(mut self, height: i32) -> Self {
        self.height = height.max(0);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Control for RibbonTabPage {
    fn layout_engine(&self) -> Option<LayoutEngine> {
        Some(LayoutEngine::HorizontalExpand)
    }

    fn preferred_size(&self, proposed: Size, _children: &[Size]) -> Size {
        Size::new(proposed.width, self.height)
    }

    fn default_style(&self) -> ControlStyle {
        let mut style = ControlStyle::new().with_background(Theme::MODERN.ribbon_tab_background);
        style.border.bottom.width = 1;
        style.border.bottom.color = Theme::MODERN.border_gray;
        style
    }

    fn default_dock(&self) -> Dock {
        Dock::Top
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Labelled group of ribbon items; its tab page is its parent in the tree
pub struct RibbonItemGroup {
    text: String,
}

impl RibbonItemGroup {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl Control for RibbonItemGroup {
    fn padding(&self) -> Padding {
        GROUP_PADDING
    }

    fn layout_engine(&self) -> Option<LayoutEngine> {
        Some(LayoutEngine::HorizontalExpand)
    }

    /// Width of the padding plus every item; height follows the tab page
    fn preferred_size(&self, _proposed: Size, children: &[Size]) -> Size {
        let items: i32 = children.iter().map(|child| child.width).sum();
        Size::new(GROUP_PADDING.horizontal() + items, 0)
    }

    fn paint(&self, canvas: &mut Canvas, size: Size) {
        let x = size.width - 1;
        let (top, bottom) = (4, size.height - 4);
        if x < 0 || bottom < top {
            return;
        }
        let color = canvas.theme().border_gray;
        canvas.draw_line(x, top, x, bottom, color);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

type ClickHandler = Box<dyn FnMut(&mut EventContext)>;

/// A clickable ribbon button with a fixed width
pub struct RibbonItem {
    text: String,
    width: i32,
    hovered: bool,
    selected: bool,
    focused: bool,
    on_click: Option<ClickHandler>,
}

impl RibbonItem {
    pub fn new(text: impl Into<String>, width: i32) -> Self {
        Self {
            text: text.into(),
            width: width.max(0),
            hovered: false,
            selected: false,
            focused: false,
            on_click: None,
        }
    }

    /// Run `handler` every time the item is clicked
    pub fn on_click(mut self, handler: impl FnMut(&mut EventContext) + 'static) -> Self {
        self.on_click = Some(Box::new(handler));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    fn activate(&mut self, ctx: &mut EventContext) {
        self.selected = !self.selected;
        if let Some(handler) = self.on_click.as_mut() {
            handler(ctx);
        }
        ctx.invalidate();
    }
}

impl Control for RibbonItem {
    fn preferred_size(&self, _proposed: Size, _children: &[Size]) -> Size {
        Size::new(self.width, 0)
    }

    fn focusable(&self) -> bool {
        true
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn paint(&self, canvas: &mut Canvas, size: Size) {
        let theme = canvas.theme().clone();
        let bounds = Rect::from_size(size);
        if self.selected {
            canvas.fill_rect(bounds, theme.ribbon_item_selected);
        } else if self.hovered {
            canvas.fill_rect(bounds, theme.ribbon_item_highlight);
            let style = ControlStyle::new().with_border(1, theme.ribbon_item_highlight_border);
            canvas.draw_border(bounds, &style);
        }
        if self.focused {
            let style = ControlStyle::new().with_border(1, theme.focus_border);
            canvas.draw_border(bounds, &style);
        }

        // Icon face, centered near the top
        let face = 16.min(size.width - 4).min(size.height - 4);
        if face > 0 {
            let x = (size.width - face) / 2;
            canvas.fill_rect(Rect::new(x, 4, face, face), theme.ribbon_item_face);
        }
    }

    fn on_mouse(&mut self, kind: MouseEventKind, event: &MouseEvent, ctx: &mut EventContext) -> EventResult {
        match kind {
            MouseEventKind::Enter => {
                self.hovered = true;
                ctx.invalidate();
                EventResult::Consumed
            }
            MouseEventKind::Leave => {
                self.hovered = false;
                ctx.invalidate();
                EventResult::Consumed
            }
            MouseEventKind::Down if event.button == MouseButton::Left => EventResult::Consumed,
            MouseEventKind::Click if event.button == MouseButton::Left => {
                self.activate(ctx);
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }

    fn on_key_down(&mut self, event: &KeyEvent, ctx: &mut EventContext) -> EventResult {
        match event.key {
            Keys::Enter | Keys::Space => {
                self.activate(ctx);
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
