//! Top-level window: one platform surface and one control adapter
//!
//! The window receives host callbacks as `WindowEvent`s, translates raw input
//! into semantic events, dispatches them through its adapter and forwards the
//! resulting damage to the platform. Painting locks the platform framebuffer
//! for exactly one frame.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Instant;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::FormsConfig;
use crate::error::PlatformError;
use crate::geometry::{PixelPoint, PixelRect, PixelSize, Rect, Size};
use crate::input::{InputTranslator, UiEvent};
use crate::platform::{PixelBuffer, RawInput, Screens, WindowEvent, WindowHandle, WindowImpl, WindowState, WindowingPlatform};
use crate::ui::{Canvas, ControlAdapter, ControlStyle, ControlTree, Theme, WindowRequest};

/// Where a window is placed when it is first shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartPosition {
    /// Keep whatever location was assigned
    Manual,
    #[default]
    CenterScreen,
    CenterParent,
}

impl FromStr for StartPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "manual" => Ok(StartPosition::Manual),
            "centerscreen" => Ok(StartPosition::CenterScreen),
            "centerparent" => Ok(StartPosition::CenterParent),
            _ => Err(format!("unknown start position '{}'", s)),
        }
    }
}

impl fmt::Display for StartPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartPosition::Manual => "manual",
            StartPosition::CenterScreen => "center-screen",
            StartPosition::CenterParent => "center-parent",
        };
        f.write_str(name)
    }
}

/// Geometry of the window a dialog is shown over
#[derive(Clone, Copy, Debug)]
struct OwnerGeometry {
    handle: WindowHandle,
    position: PixelPoint,
    client_size: Size,
    scaling: f64,
}

/// Default window style: form background with a one-unit ribbon-colored border
pub fn default_style() -> ControlStyle {
    ControlStyle::new()
        .with_background(Theme::MODERN.form_background)
        .with_border(1, Theme::MODERN.ribbon_color)
}

type ClosedHandler = Box<dyn FnMut()>;

pub struct Window {
    platform: Box<dyn WindowImpl>,
    adapter: ControlAdapter,
    translator: InputTranslator,
    theme: Theme,
    style: ControlStyle,
    text: String,
    start_position: StartPosition,
    closed: bool,
    closed_handlers: Vec<ClosedHandler>,
    /// Number of open modal dialogs owned by this window
    modal_children: Rc<Cell<u32>>,
    /// Owner's counter while this window is shown as a dialog
    modal_owner: Option<Rc<Cell<u32>>>,
}

impl Window {
    pub fn new(platform: &mut dyn WindowingPlatform) -> Result<Self, PlatformError> {
        Self::with_config(platform, &FormsConfig::default())
    }

    pub fn with_config(platform: &mut dyn WindowingPlatform, config: &FormsConfig) -> Result<Self, PlatformError> {
        let mut native = platform.create_window()?;
        native.set_system_decorations(false);
        native.resize(config.window.size());

        let mut window = Self {
            platform: native,
            adapter: ControlAdapter::new(),
            translator: InputTranslator::new(config.input.double_click_time()),
            theme: Theme::default(),
            style: default_style(),
            text: String::new(),
            start_position: config.window.start_position,
            closed: false,
            closed_handlers: Vec::new(),
            modal_children: Rc::new(Cell::new(0)),
            modal_owner: None,
        };
        window.set_text(config.window.title.clone());
        window.layout();
        debug!("[Window] created {:?} at {:?}", window.handle(), window.client_size());
        Ok(window)
    }

    pub fn handle(&self) -> WindowHandle {
        self.platform.handle()
    }

    /// The root control collection
    pub fn controls(&self) -> &ControlTree {
        self.adapter.controls()
    }

    /// Mutations record damage; call `flush` (or let the next event do it) to repaint
    pub fn controls_mut(&mut self) -> &mut ControlTree {
        self.adapter.controls_mut()
    }

    pub fn adapter(&self) -> &ControlAdapter {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut ControlAdapter {
        &mut self.adapter
    }

    pub fn translator(&self) -> &InputTranslator {
        &self.translator
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Forwarded to the platform only when it changes
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.text != text {
            self.platform.set_title(&text);
            self.text = text;
        }
    }

    pub fn window_state(&self) -> WindowState {
        self.platform.window_state()
    }

    pub fn set_window_state(&mut self, state: WindowState) {
        if self.platform.window_state() != state {
            debug!("[Window] state -> {:?}", state);
            self.platform.set_window_state(state);
        }
        self.adapter.set_window_state(state);
    }

    /// Top-left corner in screen pixels
    pub fn location(&self) -> PixelPoint {
        self.platform.position()
    }

    pub fn set_location(&mut self, location: PixelPoint) {
        if self.platform.position() != location {
            self.platform.set_position(location);
        }
    }

    pub fn start_position(&self) -> StartPosition {
        self.start_position
    }

    /// Takes effect the next time the window is shown
    pub fn set_start_position(&mut self, start_position: StartPosition) {
        self.start_position = start_position;
    }

    pub fn style(&self) -> &ControlStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: ControlStyle) {
        if self.style != style {
            self.style = style;
            self.layout();
            self.invalidate();
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.invalidate();
    }

    pub fn screens(&self) -> Screens {
        self.platform.screens()
    }

    pub fn client_size(&self) -> Size {
        self.platform.client_size()
    }

    /// Client rectangle inset by the style's border widths
    pub fn display_rectangle(&self) -> Rect {
        let size = self.platform.client_size();
        let border = &self.style.border;
        Rect::new(
            border.left.width,
            border.top.width,
            size.width - border.left.width - border.right.width,
            size.height - border.top.width - border.bottom.width,
        )
        .clamped()
    }

    /// Run `handler` when the window closes
    pub fn on_closed(&mut self, handler: impl FnMut() + 'static) {
        self.closed_handlers.push(Box::new(handler));
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True while a modal dialog owned by this window is open
    pub fn is_blocked(&self) -> bool {
        self.modal_children.get() > 0
    }

    pub fn show(&mut self) {
        self.set_startup_location(None);
        debug!("[Window] show {:?} at {:?}", self.handle(), self.location());
        self.platform.show();
    }

    /// Show modally over `owner`; the owner ignores input until this window closes
    pub fn show_dialog(&mut self, owner: &Window) {
        let geometry = OwnerGeometry {
            handle: owner.handle(),
            position: owner.location(),
            client_size: owner.client_size(),
            scaling: owner.platform.scaling(),
        };
        self.set_startup_location(Some(geometry));
        if self.modal_owner.is_none() {
            owner.modal_children.set(owner.modal_children.get() + 1);
            self.modal_owner = Some(owner.modal_children.clone());
        }
        debug!("[Window] show {:?} as dialog of {:?}", self.handle(), geometry.handle);
        self.platform.show_dialog(geometry.handle);
    }

    /// Release the platform window; `Closed` fires once however often this is called
    pub fn close(&mut self) {
        if self.closed {
            debug!("[Window] {:?} already closed", self.handle());
            return;
        }
        self.platform.dispose();
        self.mark_closed();
    }

    fn mark_closed(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(owner) = self.modal_owner.take() {
            owner.set(owner.get().saturating_sub(1));
        }
        debug!("[Window] {:?} closed", self.handle());
        for handler in self.closed_handlers.iter_mut() {
            handler();
        }
    }

    /// Schedule a repaint of the whole client area
    pub fn invalidate(&mut self) {
        let size = self.platform.client_size();
        self.platform.invalidate(Rect::from_size(size));
    }

    pub fn begin_move_drag(&mut self) {
        self.platform.begin_move_drag();
    }

    /// Host callback entry point
    pub fn handle_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::Input(raw) => {
                self.handle_input(&raw, Instant::now());
            }
            WindowEvent::Paint(rect) => self.on_paint(rect),
            WindowEvent::Resized(size) => self.on_resize(size),
            WindowEvent::Closed => self.mark_closed(),
        }
    }

    /// Translate and dispatch one raw input observed at `now`; returns the
    /// semantic events in dispatch order
    pub fn handle_input(&mut self, raw: &RawInput, now: Instant) -> Vec<UiEvent> {
        if self.closed {
            trace!("[Window] input after close dropped");
            return Vec::new();
        }
        if self.is_blocked() {
            debug!("[Window] {:?} blocked by a modal dialog, input dropped", self.handle());
            return Vec::new();
        }
        let events = self.translator.translate(raw, now);
        self.adapter.set_window_state(self.platform.window_state());
        for event in &events {
            self.adapter.dispatch(event);
        }
        self.flush();
        events
    }

    /// Forward pending damage to the platform and apply control requests
    pub fn flush(&mut self) {
        for rect in self.adapter.take_damage() {
            self.platform.invalidate(rect);
        }
        for request in self.adapter.take_requests() {
            trace!("[Window] applying {:?}", request);
            match request {
                WindowRequest::BeginMoveDrag => self.begin_move_drag(),
                WindowRequest::Close => self.close(),
                WindowRequest::SetWindowState(state) => self.set_window_state(state),
            }
        }
    }

    fn on_resize(&mut self, size: Size) {
        trace!("[Window] resized to {:?}", size);
        self.layout();
        self.invalidate();
        self.flush();
    }

    fn layout(&mut self) {
        let display = self.display_rectangle();
        self.adapter.set_bounds(display);
    }

    fn on_paint(&mut self, rect: Rect) {
        let client = Rect::from_size(self.platform.client_size());
        let display = self.display_rectangle();
        let scaling = self.platform.scaling();
        let mut framebuffer = match self.platform.lock_framebuffer() {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                warn!("[Paint] skipping frame: {}", err);
                return;
            }
        };
        render(&mut framebuffer, &self.adapter, &self.theme, &self.style, client, display, scaling, rect);
        drop(framebuffer);
        self.platform.present();
    }

    /// Paint `rect` of the window into `target`
    pub fn render(&self, target: &mut PixelBuffer, rect: Rect) {
        let client = Rect::from_size(self.platform.client_size());
        render(
            target,
            &self.adapter,
            &self.theme,
            &self.style,
            client,
            self.display_rectangle(),
            self.platform.scaling(),
            rect,
        );
    }

    fn set_startup_location(&mut self, owner: Option<OwnerGeometry>) {
        let scaling = owner.map_or_else(|| self.platform.scaling(), |o| o.scaling);
        let rect = PixelRect::from_parts(
            PixelPoint::ORIGIN,
            PixelSize::from_size(self.platform.client_size(), scaling),
        );
        match self.start_position {
            StartPosition::Manual => {}
            StartPosition::CenterScreen => {
                let anchor = owner.map_or_else(|| self.location(), |o| o.position);
                let screens = self.platform.screens();
                match screens.screen_from_point(anchor) {
                    Some(screen) => {
                        let location = screen.working_area.center_rect(rect).position();
                        debug!("[Window] centered on screen at {:?}", location);
                        self.set_location(location);
                    }
                    None => debug!("[Window] no screen at {:?}, location unchanged", anchor),
                }
            }
            StartPosition::CenterParent => {
                if let Some(owner) = owner {
                    let owner_rect = PixelRect::from_parts(
                        owner.position,
                        PixelSize::from_size(owner.client_size, scaling),
                    );
                    let location = owner_rect.center_rect(rect).position();
                    debug!("[Window] centered on owner at {:?}", location);
                    self.set_location(location);
                }
            }
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Some(owner) = self.modal_owner.take() {
            owner.set(owner.get().saturating_sub(1));
        }
    }
}

/// One paint cycle: window background and border, then the adapter clipped to
/// the display rectangle
#[allow(clippy::too_many_arguments)]
fn render(
    target: &mut PixelBuffer,
    adapter: &ControlAdapter,
    theme: &Theme,
    style: &ControlStyle,
    client: Rect,
    display: Rect,
    scaling: f64,
    rect: Rect,
) {
    let mut canvas = Canvas::new(target, theme, scaling);
    canvas.clip_rect(rect);
    canvas.draw_background(client, style);
    canvas.draw_border(client, style);
    canvas.clip_rect(display);
    adapter.raise_paint_background(&mut canvas);
    adapter.raise_paint(&mut canvas);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::input::Modifiers;
    use crate::platform::headless::{HeadlessPlatform, InputScript};
    use crate::platform::{RawMouseKind, Screen};
    use crate::ui::widgets::{RibbonItem, RibbonItemGroup, TitleBar};
    use crate::ui::Color;
    use std::cell::RefCell;
    use std::time::Duration;

    fn mouse(kind: RawMouseKind, x: i32, y: i32) -> RawInput {
        RawInput::Mouse { kind, position: Point::new(x, y), modifiers: Modifiers::NONE }
    }

    fn kinds(events: &[UiEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                UiEvent::MouseDown(_) => "down",
                UiEvent::MouseUp(_) => "up",
                UiEvent::MouseMove(_) => "move",
                UiEvent::MouseLeave(_) => "leave",
                UiEvent::Click(_) => "click",
                UiEvent::DoubleClick(_) => "double",
                UiEvent::KeyDown(_) => "key",
                UiEvent::KeyPress(_) => "char",
            })
            .collect()
    }

    #[test]
    fn test_construction_applies_defaults() {
        let mut platform = HeadlessPlatform::new();
        let window = Window::new(&mut platform).unwrap();
        let state = platform.last_window().unwrap();
        assert!(!state.borrow().decorations);
        assert_eq!(window.client_size(), Size::new(1080, 720));
        assert_eq!(window.style().background_color, Theme::MODERN.form_background);
        assert_eq!(window.display_rectangle(), Rect::new(1, 1, 1078, 718));
        assert_eq!(window.adapter().bounds(), Rect::new(1, 1, 1078, 718));
    }

    #[test]
    fn test_center_screen_placement() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        window.show();
        assert_eq!(window.location(), PixelPoint::new(420, 180));
    }

    #[test]
    fn test_center_screen_uses_working_area_and_scaling() {
        let screen = Screen {
            bounds: PixelRect::new(0, 0, 3840, 2160),
            working_area: PixelRect::new(0, 0, 3840, 2080),
            primary: true,
        };
        let mut platform = HeadlessPlatform::with_screens(Screens::new(vec![screen])).with_scaling(2.0);
        let mut window = Window::new(&mut platform).unwrap();
        window.show();
        // 1080x720 units are 2160x1440 pixels
        assert_eq!(window.location(), PixelPoint::new(840, 320));
    }

    #[test]
    fn test_manual_and_missing_screen_keep_location() {
        let mut platform = HeadlessPlatform::with_screens(Screens::default());
        let mut window = Window::new(&mut platform).unwrap();
        window.set_location(PixelPoint::new(7, 9));
        window.show();
        assert_eq!(window.location(), PixelPoint::new(7, 9));

        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        window.set_start_position(StartPosition::Manual);
        window.set_location(PixelPoint::new(3, 4));
        window.show();
        assert_eq!(window.location(), PixelPoint::new(3, 4));
    }

    #[test]
    fn test_dialog_centers_on_owner_and_blocks_it() {
        let mut platform = HeadlessPlatform::new();
        let mut owner = Window::new(&mut platform).unwrap();
        owner.set_location(PixelPoint::new(100, 100));

        let mut config = FormsConfig::default();
        config.window.width = 400;
        config.window.height = 200;
        config.window.start_position = StartPosition::CenterParent;
        let mut dialog = Window::with_config(&mut platform, &config).unwrap();
        dialog.show_dialog(&owner);

        assert_eq!(dialog.location(), PixelPoint::new(440, 360));
        let dialog_state = platform.windows()[1].clone();
        assert_eq!(dialog_state.borrow().dialog_owner, Some(owner.handle()));
        assert!(owner.is_blocked());

        let now = Instant::now();
        assert!(owner.handle_input(&mouse(RawMouseKind::LeftButtonDown, 5, 5), now).is_empty());

        dialog.close();
        assert!(!owner.is_blocked());
        assert_eq!(kinds(&owner.handle_input(&mouse(RawMouseKind::LeftButtonDown, 5, 5), now)), vec!["down"]);
    }

    #[test]
    fn test_close_twice_fires_closed_once() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        window.on_closed(move || counter.set(counter.get() + 1));

        window.close();
        window.close();
        window.handle_event(WindowEvent::Closed);
        assert_eq!(count.get(), 1);
        assert!(window.is_closed());
        assert_eq!(platform.last_window().unwrap().borrow().dispose_count, 1);
    }

    #[test]
    fn test_text_forwards_only_changes() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        window.set_text("Ribbon");
        assert_eq!(platform.last_window().unwrap().borrow().title, "Ribbon");
        platform.last_window().unwrap().borrow_mut().title = "changed by host".into();
        window.set_text("Ribbon");
        assert_eq!(platform.last_window().unwrap().borrow().title, "changed by host");
        assert_eq!(window.text(), "Ribbon");
    }

    #[test]
    fn test_ribbon_group_example() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        let tree = window.controls_mut();
        let group = tree.add_root(RibbonItemGroup::new("Clipboard"));
        let first = tree.add_child(group, RibbonItem::new("Paste", 40)).unwrap();
        let second = tree.add_child(group, RibbonItem::new("Cut", 60)).unwrap();
        tree.set_bounds(group, Rect::new(10, 10, tree.preferred_size(group, Size::EMPTY).width, 30))
            .unwrap();

        let tree = window.controls();
        let first_bounds = tree.absolute_bounds(first).unwrap();
        let second_bounds = tree.absolute_bounds(second).unwrap();
        assert_eq!(first_bounds.x, 13);
        assert_eq!(first_bounds.width, 40);
        assert_eq!(second_bounds.x, first_bounds.right());
        assert_eq!(second_bounds.width, 60);
        assert_eq!(first_bounds.height, 24);
    }

    #[test]
    fn test_click_timing_through_window() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        let start = Instant::now();
        let at = |ms| start + Duration::from_millis(ms);

        window.handle_input(&mouse(RawMouseKind::LeftButtonDown, 5, 5), at(0));
        let first = window.handle_input(&mouse(RawMouseKind::LeftButtonUp, 5, 5), at(10));
        assert_eq!(kinds(&first), vec!["click", "up"]);

        // Different button and location, still inside the window-wide interval
        window.handle_input(&mouse(RawMouseKind::RightButtonDown, 600, 400), at(100));
        let second = window.handle_input(&mouse(RawMouseKind::RightButtonUp, 600, 400), at(110));
        assert_eq!(kinds(&second), vec!["double", "click", "up"]);

        let third = window.handle_input(&mouse(RawMouseKind::LeftButtonUp, 5, 5), at(150));
        assert_eq!(kinds(&third), vec!["click", "up"]);
        if let UiEvent::Click(e) = third[0] {
            assert_eq!(e.clicks, 1);
        }
    }

    #[test]
    fn test_scripted_title_bar_interaction() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        let closed = Rc::new(RefCell::new(false));
        let flag = closed.clone();
        window.on_closed(move || *flag.borrow_mut() = true);
        window.controls_mut().add_root(TitleBar::new("Demo"));

        // Caption drag, caption double click, then the close button
        let script = InputScript::parse(
            "0 down left 100 10\n\
             20 up left 100 10\n\
             100 down left 100 10\n\
             120 up left 100 10\n\
             900 move 1060 10\n\
             910 down left 1060 10\n\
             920 up left 1060 10\n",
        )
        .unwrap();
        let start = Instant::now();
        for step in script.steps() {
            window.handle_input(&step.input, start + step.at);
            if step.at == Duration::from_millis(120) {
                assert_eq!(window.window_state(), WindowState::Maximized);
            }
        }

        let state = platform.last_window().unwrap();
        assert!(state.borrow().move_drags >= 2);
        assert!(*closed.borrow());
        assert_eq!(state.borrow().dispose_count, 1);
        assert!(!state.borrow().invalidated.is_empty());
    }

    #[test]
    fn test_paint_draws_frame_and_clips_children() {
        let mut platform = HeadlessPlatform::new();
        let mut config = FormsConfig::default();
        config.window.width = 20;
        config.window.height = 10;
        let mut window = Window::with_config(&mut platform, &config).unwrap();
        let tree = window.controls_mut();
        let panel = tree.add_root(
            crate::ui::widgets::Panel::new().with_style(ControlStyle::new().with_background(Color::WHITE)),
        );
        tree.set_bounds(panel, Rect::new(-5, -5, 100, 100)).unwrap();

        let mut target = PixelBuffer::new(PixelSize::new(20, 10));
        window.render(&mut target, Rect::new(0, 0, 20, 10));
        // Border survives, the overflowing panel stays inside it
        assert_eq!(target.pixel(0, 0), Some(Theme::MODERN.ribbon_color));
        assert_eq!(target.pixel(19, 9), Some(Theme::MODERN.ribbon_color));
        assert_eq!(target.pixel(1, 1), Some(Color::WHITE));
        assert_eq!(target.pixel(18, 8), Some(Color::WHITE));

        window.handle_event(WindowEvent::Paint(Rect::new(0, 0, 20, 10)));
        assert_eq!(platform.last_window().unwrap().borrow().frames, 1);
    }

    #[test]
    fn test_paint_skips_frame_when_surface_unavailable() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        let state = platform.last_window().unwrap();
        state.borrow_mut().surface_available = false;
        window.handle_event(WindowEvent::Paint(Rect::new(0, 0, 10, 10)));
        assert_eq!(state.borrow().frames, 0);

        window.close();
        window.handle_event(WindowEvent::Paint(Rect::new(0, 0, 10, 10)));
        assert_eq!(state.borrow().frames, 0);
    }

    #[test]
    fn test_resize_relayouts_and_invalidates() {
        let mut platform = HeadlessPlatform::new();
        let mut window = Window::new(&mut platform).unwrap();
        let bar = window.controls_mut().add_root(TitleBar::new("Demo"));
        let state = platform.last_window().unwrap();
        state.borrow_mut().client_size = Size::new(400, 300);
        window.handle_event(WindowEvent::Resized(Size::new(400, 300)));

        assert_eq!(window.controls().bounds(bar), Some(Rect::new(0, 0, 398, 32)));
        assert!(state.borrow().invalidated.contains(&Rect::new(0, 0, 400, 300)));
    }
}
