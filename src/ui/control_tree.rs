//! Control tree: hierarchical composition of controls
//!
//! Nodes live in an arena and refer to each other by `ControlId`. A node owns
//! its children (removing a node removes its whole subtree) while the parent
//! link is a plain id, so walking upward never implies ownership.
//!
//! The tree provides:
//! - Recursive layout driven by each control's layout engine
//! - Hit testing, topmost (last added) child first
//! - Event bubbling from a target toward the root
//! - Damage tracking for every mutation that changes what is on screen

use log::trace;

use crate::error::TreeError;
use crate::geometry::{Point, Rect, Size};
use crate::platform::WindowState;

use super::control::{Control, EventContext, EventResult, WindowRequest};
use super::layout::{Dock, LayoutEngine, LayoutRequest};
use super::paint::DamageTracker;
use super::style::ControlStyle;

/// Identity of a node; stale ids are detected through the generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControlId {
    index: u32,
    generation: u32,
}

/// One node of the tree
pub struct ControlNode {
    control: Box<dyn Control>,
    /// Relative to the parent's top-left corner
    bounds: Rect,
    style: ControlStyle,
    visible: bool,
    dock: Dock,
    parent: Option<ControlId>,
    children: Vec<ControlId>,
}

impl ControlNode {
    fn new(control: Box<dyn Control>, parent: Option<ControlId>) -> Self {
        Self {
            style: control.default_style(),
            dock: control.default_dock(),
            control,
            bounds: Rect::EMPTY,
            visible: true,
            parent,
            children: Vec::new(),
        }
    }

    pub fn control(&self) -> &dyn Control {
        self.control.as_ref()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn style(&self) -> &ControlStyle {
        &self.style
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn dock(&self) -> Dock {
        self.dock
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    pub fn children(&self) -> &[ControlId] {
        &self.children
    }
}

struct Slot {
    generation: u32,
    node: Option<ControlNode>,
}

fn slot_node_mut(slots: &mut [Slot], id: ControlId) -> Option<&mut ControlNode> {
    slots
        .get_mut(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.node.as_mut())
}

#[derive(Default)]
pub struct ControlTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<ControlId>,
    /// Area the roots were last laid out in
    root_content: Rect,
    damage: DamageTracker,
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Top-level controls, back to front
    pub fn roots(&self) -> &[ControlId] {
        &self.roots
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: ControlId) -> Option<&ControlNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: ControlId) -> Option<&mut ControlNode> {
        slot_node_mut(&mut self.slots, id)
    }

    pub fn parent(&self, id: ControlId) -> Option<ControlId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Children in paint order; empty for stale ids
    pub fn children(&self, id: ControlId) -> &[ControlId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Downcast a node's control
    pub fn control<T: Control>(&self, id: ControlId) -> Option<&T> {
        self.node(id).and_then(|node| node.control.as_any().downcast_ref::<T>())
    }

    /// Mutable downcast; call `invalidate` if the change is visible
    pub fn control_mut<T: Control>(&mut self, id: ControlId) -> Option<&mut T> {
        self.node_mut(id)
            .and_then(|node| node.control.as_any_mut().downcast_mut::<T>())
    }

    /// Add a top-level control (frontmost)
    pub fn add_root(&mut self, control: impl Control) -> ControlId {
        let id = self.allocate(Box::new(control), None);
        self.roots.push(id);
        self.layout_roots(self.root_content);
        id
    }

    /// Append a child (frontmost among its siblings) and lay the parent out again
    pub fn add_child(&mut self, parent: ControlId, control: impl Control) -> Result<ControlId, TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::StaleControl(parent));
        }
        let id = self.allocate(Box::new(control), Some(parent));
        if let Some(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        self.perform_layout(parent);
        Ok(id)
    }

    fn allocate(&mut self, control: Box<dyn Control>, parent: Option<ControlId>) -> ControlId {
        let node = ControlNode::new(control, parent);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                ControlId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, node: Some(node) });
                ControlId { index: (self.slots.len() - 1) as u32, generation: 0 }
            }
        }
    }

    /// Remove a control and its whole subtree
    pub fn remove(&mut self, id: ControlId) -> Result<(), TreeError> {
        let area = self.absolute_bounds(id).ok_or(TreeError::StaleControl(id))?;
        let parent = self.parent(id);
        match parent.and_then(|p| self.node_mut(p)) {
            Some(parent_node) => parent_node.children.retain(|c| *c != id),
            None => self.roots.retain(|c| *c != id),
        }
        if self.is_shown(id) {
            self.damage.add(area);
        }
        self.release_subtree(id);
        trace!("[Tree] removed {:?}", id);
        Ok(())
    }

    fn release_subtree(&mut self, id: ControlId) {
        let Some(slot) = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            return;
        };
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        for child in node.children {
            self.release_subtree(child);
        }
    }

    pub fn bounds(&self, id: ControlId) -> Option<Rect> {
        self.node(id).map(|node| node.bounds)
    }

    /// Bounds in tree coordinates (relative to the roots' container)
    pub fn absolute_bounds(&self, id: ControlId) -> Option<Rect> {
        let mut bounds = self.node(id)?.bounds;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            let node = self.node(parent)?;
            bounds = bounds.offset(node.bounds.x, node.bounds.y);
            current = node.parent;
        }
        Some(bounds)
    }

    /// Set a control's bounds (negative sizes clamp to zero) and lay out its children
    pub fn set_bounds(&mut self, id: ControlId, bounds: Rect) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::StaleControl(id));
        }
        self.place(id, bounds);
        Ok(())
    }

    /// `set_bounds` for ids already known to be live
    fn place(&mut self, id: ControlId, bounds: Rect) {
        let Some(old) = self.absolute_bounds(id) else {
            return;
        };
        let bounds = bounds.clamped();
        let changed = self.node(id).map_or(false, |node| node.bounds != bounds);
        if changed {
            if let Some(node) = self.node_mut(id) {
                node.bounds = bounds;
            }
            if self.is_shown(id) {
                self.damage.add(old);
                if let Some(new) = self.absolute_bounds(id) {
                    self.damage.add(new);
                }
            }
        }
        self.perform_layout(id);
    }

    pub fn style(&self, id: ControlId) -> Option<&ControlStyle> {
        self.node(id).map(|node| &node.style)
    }

    pub fn set_style(&mut self, id: ControlId, style: ControlStyle) -> Result<(), TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::StaleControl(id))?;
        if node.style != style {
            node.style = style;
            self.invalidate(id);
        }
        Ok(())
    }

    pub fn is_visible(&self, id: ControlId) -> bool {
        self.node(id).map_or(false, |node| node.visible)
    }

    /// Visible along the whole ancestor chain
    pub fn is_shown(&self, id: ControlId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.node(node_id) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_visible(&mut self, id: ControlId, visible: bool) -> Result<(), TreeError> {
        let area = self.absolute_bounds(id).ok_or(TreeError::StaleControl(id))?;
        if self.is_visible(id) == visible {
            return Ok(());
        }
        if let Some(node) = self.node_mut(id) {
            node.visible = visible;
        }
        self.damage.add(area);
        self.relayout_parent_of(id);
        Ok(())
    }

    pub fn dock(&self, id: ControlId) -> Dock {
        self.node(id).map_or(Dock::None, |node| node.dock)
    }

    pub fn set_dock(&mut self, id: ControlId, dock: Dock) -> Result<(), TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::StaleControl(id))?;
        if node.dock != dock {
            node.dock = dock;
            self.relayout_parent_of(id);
        }
        Ok(())
    }

    /// Preferred size of a control, composing its visible children's preferred sizes
    pub fn preferred_size(&self, id: ControlId, proposed: Size) -> Size {
        let Some(node) = self.node(id) else {
            return Size::EMPTY;
        };
        let children: Vec<Size> = node
            .children
            .iter()
            .filter(|&&child| self.is_visible(child))
            .map(|&child| self.preferred_size(child, Size::EMPTY))
            .collect();
        node.control.preferred_size(proposed, &children).clamped()
    }

    /// Lay out a control's children according to its layout engine.
    /// Controls without an engine keep their children's bounds but still
    /// lay out each child's own subtree.
    pub fn perform_layout(&mut self, id: ControlId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let children = node.children.clone();
        match node.control.layout_engine() {
            Some(engine) => {
                let content = Rect::from_size(node.bounds.size()).deflate(node.control.padding());
                self.arrange(engine, content, &children);
            }
            None => {
                for child in children {
                    self.perform_layout(child);
                }
            }
        }
    }

    /// Dock the top-level controls inside `content` and lay out every subtree
    pub fn layout_roots(&mut self, content: Rect) {
        self.root_content = content.clamped();
        let roots = self.roots.clone();
        self.arrange(LayoutEngine::Dock, self.root_content, &roots);
    }

    fn relayout_parent_of(&mut self, id: ControlId) {
        match self.parent(id) {
            Some(parent) => self.perform_layout(parent),
            None => self.layout_roots(self.root_content),
        }
    }

    /// Place the visible `children` inside the padded `content` rectangle.
    ///
    /// Every placed child lies within `content` vertically. Horizontally a
    /// `HorizontalExpand` row may run past the right edge; the paint clip cuts
    /// it off. Dock strips and fills always stay inside `content`, while
    /// `Dock::None` children keep whatever bounds the application gave them.
    fn arrange(&mut self, engine: LayoutEngine, content: Rect, children: &[ControlId]) {
        let visible: Vec<ControlId> = children
            .iter()
            .copied()
            .filter(|&child| self.is_visible(child))
            .collect();
        let requests: Vec<LayoutRequest> = visible
            .iter()
            .map(|&child| LayoutRequest {
                preferred: self.preferred_size(child, content.size()),
                dock: self.dock(child),
            })
            .collect();
        for (&child, bounds) in visible.iter().zip(engine.arrange(content, &requests)) {
            match bounds {
                Some(bounds) => self.place(child, bounds),
                None => self.perform_layout(child),
            }
        }
    }

    /// Deepest visible control under `point` (tree coordinates)
    pub fn hit_test(&self, point: Point) -> Option<ControlId> {
        self.hit_path(point).last().copied()
    }

    /// Controls under `point` from the topmost root down to the deepest hit
    pub fn hit_path(&self, point: Point) -> Vec<ControlId> {
        let mut path = Vec::new();
        self.hit_in(&self.roots, point, &mut path);
        path
    }

    fn hit_in(&self, ids: &[ControlId], point: Point, path: &mut Vec<ControlId>) -> bool {
        for &id in ids.iter().rev() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !node.visible || !node.bounds.contains(point) {
                continue;
            }
            path.push(id);
            let local = Point::new(point.x - node.bounds.x, point.y - node.bounds.y);
            self.hit_in(&node.children, local, path);
            return true;
        }
        false
    }

    /// True when `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: ControlId, id: ControlId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.parent(node_id);
        }
        false
    }

    /// Schedule a repaint of a control's bounds
    pub fn invalidate(&mut self, id: ControlId) {
        if !self.is_shown(id) {
            return;
        }
        if let Some(area) = self.absolute_bounds(id) {
            self.damage.add(area);
        }
    }

    /// Drain coalesced damage in tree coordinates
    pub fn take_damage(&mut self) -> Vec<Rect> {
        self.damage.take()
    }

    /// Raise an event on `target`, then on its ancestors while unhandled
    /// (when `bubble` is set). The handler receives the control, its
    /// absolute bounds and an event context.
    pub(crate) fn dispatch<F>(
        &mut self,
        target: ControlId,
        bubble: bool,
        window_state: WindowState,
        requests: &mut Vec<WindowRequest>,
        mut handler: F,
    ) -> EventResult
    where
        F: FnMut(&mut dyn Control, Rect, &mut EventContext) -> EventResult,
    {
        let mut current = Some(target);
        while let Some(id) = current {
            let Some(bounds) = self.absolute_bounds(id) else {
                break;
            };
            let parent = self.parent(id);
            let Self { slots, damage, .. } = self;
            let Some(node) = slot_node_mut(slots, id) else {
                break;
            };
            let mut ctx = EventContext::new(id, bounds, window_state, damage, requests);
            let result = handler(node.control.as_mut(), bounds, &mut ctx);
            if result.is_consumed() || !bubble {
                return result;
            }
            current = parent;
        }
        EventResult::Ignored
    }
}
