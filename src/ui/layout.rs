//! Layout engines: pure functions from a content rectangle and child
//! requests to child bounds
//!
//! Engines never clip. Children that do not fit simply extend past the
//! content rectangle and are cut off by the paint pass.

use log::trace;

use crate::geometry::{Rect, Size};

/// Edge a child attaches to inside a dock layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dock {
    /// Keeps whatever bounds the application assigned
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
    Fill,
}

/// What a child asks of its container's layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutRequest {
    pub preferred: Size,
    pub dock: Dock,
}

/// Strategy a container uses to place its children
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutEngine {
    /// Left to right at preferred width, full content height
    HorizontalExpand,
    /// Children attach to the remaining space's edges in child order
    Dock,
}

impl LayoutEngine {
    /// Bounds for each request, in the content rectangle's coordinate space.
    /// `None` means the child keeps its current bounds.
    pub fn arrange(self, content: Rect, requests: &[LayoutRequest]) -> Vec<Option<Rect>> {
        trace!("[Layout] {:?} arranging {} children in {:?}", self, requests.len(), content);
        match self {
            LayoutEngine::HorizontalExpand => {
                horizontal_expand(content, requests.iter().map(|r| r.preferred.width))
                    .into_iter()
                    .map(Some)
                    .collect()
            }
            LayoutEngine::Dock => dock(content, requests),
        }
    }
}

/// Stack children left to right starting at the content's left edge
pub fn horizontal_expand(content: Rect, preferred_widths: impl IntoIterator<Item = i32>) -> Vec<Rect> {
    let height = content.height.max(0);
    let mut x = content.x;
    preferred_widths
        .into_iter()
        .map(|width| {
            let width = width.max(0);
            let bounds = Rect::new(x, content.y, width, height);
            x += width;
            bounds
        })
        .collect()
}

/// Dock layout: each docked child takes a strip off the remaining space
pub fn dock(content: Rect, requests: &[LayoutRequest]) -> Vec<Option<Rect>> {
    let mut remaining = content.clamped();
    requests
        .iter()
        .map(|request| {
            let preferred = request.preferred.clamped();
            let bounds = match request.dock {
                Dock::None => return None,
                Dock::Top => {
                    let height = preferred.height.min(remaining.height);
                    let bounds = Rect::new(remaining.x, remaining.y, remaining.width, height);
                    remaining = Rect::new(remaining.x, remaining.y + height, remaining.width, remaining.height - height);
                    bounds
                }
                Dock::Bottom => {
                    let height = preferred.height.min(remaining.height);
                    let bounds = Rect::new(remaining.x, remaining.bottom() - height, remaining.width, height);
                    remaining.height -= height;
                    bounds
                }
                Dock::Left => {
                    let width = preferred.width.min(remaining.width);
                    let bounds = Rect::new(remaining.x, remaining.y, width, remaining.height);
                    remaining = Rect::new(remaining.x + width, remaining.y, remaining.width - width, remaining.height);
                    bounds
                }
                Dock::Right => {
                    let width = preferred.width.min(remaining.width);
                    let bounds = Rect::new(remaining.right() - width, remaining.y, width, remaining.height);
                    remaining.width -= width;
                    bounds
                }
                Dock::Fill => remaining,
            };
            Some(bounds)
        })
        .collect()
}
