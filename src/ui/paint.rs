//! Paint pass and damage tracking
//!
//! The paint pass walks the tree depth-first in child order. Each control is
//! painted with the canvas origin at its top-left corner and the clip reduced
//! to its bounds, so a control can never draw over its ancestors' siblings.

use log::trace;

use crate::geometry::Rect;

use super::canvas::Canvas;
use super::control_tree::{ControlId, ControlTree};

/// Coalesces invalidated rectangles.
///
/// Overlapping or adjacent rectangles merge into their union, so repeated
/// invalidation of the same area collapses into one repaint request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageTracker {
    rects: Vec<Rect>,
}

impl DamageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut merged = rect;
        while let Some(pos) = self.rects.iter().position(|r| r.touches(&merged)) {
            merged = merged.union(&self.rects.swap_remove(pos));
        }
        self.rects.push(merged);
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn take(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.rects)
    }
}

/// Paint every visible root and its subtree
pub fn paint_tree(tree: &ControlTree, canvas: &mut Canvas) {
    paint_children(tree, tree.roots(), canvas);
}

fn paint_children(tree: &ControlTree, ids: &[ControlId], canvas: &mut Canvas) {
    for &id in ids {
        paint_control(tree, id, canvas);
    }
}

fn paint_control(tree: &ControlTree, id: ControlId, canvas: &mut Canvas) {
    let Some(node) = tree.node(id) else {
        return;
    };
    if !node.visible() {
        return;
    }
    let bounds = node.bounds();
    canvas.save();
    canvas.translate(bounds.x, bounds.y);
    canvas.clip_rect(Rect::from_size(bounds.size()));
    if canvas.is_clip_empty() {
        trace!("[Paint] skipping {:?}, outside clip", id);
    } else {
        node.control().paint_background(canvas, node.style(), bounds.size());
        node.control().paint(canvas, bounds.size());
        paint_children(tree, node.children(), canvas);
    }
    canvas.restore();
}
