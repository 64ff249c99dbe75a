//! Panel - a container that optionally arranges its children

use std::any::Any;

use crate::geometry::{Padding, Size};
use crate::ui::control::Control;
use crate::ui::layout::{Dock, LayoutEngine};
use crate::ui::style::ControlStyle;

/// A plain container
pub struct Panel {
    padding: Padding,
    layout: Option<LayoutEngine>,
    dock: Dock,
    style: ControlStyle,
    /// Extent along the docked axis; unset panels take the proposed size
    preferred: Option<Size>,
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    pub fn new() -> Self {
        Self {
            padding: Padding::EMPTY,
            layout: None,
            dock: Dock::None,
            style: ControlStyle::default(),
            preferred: None,
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_layout(mut self, layout: LayoutEngine) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_dock(mut self, dock: Dock) -> Self {
        self.dock = dock;
        self
    }

    pub fn with_style(mut self, style: ControlStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_preferred_size(mut self, size: Size) -> Self {
        self.preferred = Some(size);
        self
    }
}

impl Control for Panel {
    fn padding(&self) -> Padding {
        self.padding
    }

    fn layout_engine(&self) -> Option<LayoutEngine> {
        self.layout
    }

    fn preferred_size(&self, proposed: Size, children: &[Size]) -> Size {
        if let Some(size) = self.preferred {
            return size;
        }
        match self.layout {
            Some(LayoutEngine::HorizontalExpand) => Size::new(
                self.padding.horizontal() + children.iter().map(|c| c.width).sum::<i32>(),
                self.padding.vertical() + children.iter().map(|c| c.height).max().unwrap_or(0),
            ),
            _ => proposed,
        }
    }

    fn default_style(&self) -> ControlStyle {
        self.style
    }

    fn default_dock(&self) -> Dock {
        self.dock
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
    use crate::geometry::Rect;
    use crate::ui::control_tree::ControlTree;

    #[test]
    fn test_horizontal_panel_sizes_to_children() {
        let panel = Panel::new()
            .with_padding(Padding::all(2))
            .with_layout(LayoutEngine::HorizontalExpand);
        let size = panel.preferred_size(Size::EMPTY, &[Size::new(10, 5), Size::new(20, 8)]);
        assert_eq!(size, Size::new(34, 12));
    }

    #[test]
    fn test_dock_panel_fills_after_top_strip() {
        let mut tree = ControlTree::new();
        let root = tree.add_root(Panel::new().with_layout(LayoutEngine::Dock));
        let top = tree
            .add_child(root, Panel::new().with_dock(Dock::Top).with_preferred_size(Size::new(0, 10)))
            .unwrap();
        let fill = tree.add_child(root, Panel::new().with_dock(Dock::Fill)).unwrap();
        tree.set_bounds(root, Rect::new(0, 0, 50, 40)).unwrap();

        assert_eq!(tree.bounds(top), Some(Rect::new(0, 0, 50, 10)));
        assert_eq!(tree.bounds(fill), Some(Rect::new(0, 10, 50, 30)));
    }
}
