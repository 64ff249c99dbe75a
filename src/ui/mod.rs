//! Control tree, painting and the concrete controls

pub mod adapter;
pub mod canvas;
pub mod control;
pub mod control_tree;
pub mod layout;
pub mod paint;
pub mod style;
pub mod theme;
pub mod widgets;

pub use adapter::ControlAdapter;
pub use canvas::Canvas;
pub use control::{Control, EventContext, EventResult, MouseEventKind, WindowRequest};
pub use control_tree::{ControlId, ControlNode, ControlTree};
pub use layout::{Dock, LayoutEngine, LayoutRequest};
pub use paint::{paint_tree, DamageTracker};
pub use style::{Border, BorderSide, Color, ControlStyle};
pub use theme::Theme;
