//! Concrete controls
//!
//! - Panel: plain container with optional layout
//! - RibbonTabPage, RibbonItemGroup, RibbonItem: ribbon toolbar pieces
//! - TitleBar: caption strip with window buttons

mod panel;
mod ribbon;
mod title_bar;

pub use panel::Panel;
pub use ribbon::{RibbonItem, RibbonItemGroup, RibbonTabPage, GROUP_PADDING, TAB_PAGE_HEIGHT};
pub use title_bar::{TitleBar, TitleBarButton, TITLE_BAR_HEIGHT};
