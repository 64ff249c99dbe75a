//! Centralized theme for control and window colors
//!
//! Controls take their default styles from `Theme::MODERN`; paint hooks read
//! state colors (hover, selection) from the theme carried by the canvas, so a
//! window can switch themes without rebuilding its controls.

use super::style::Color;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    // Window colors
    pub form_background: Color,
    pub ribbon_color: Color,

    // General control colors
    pub control_background: Color,
    pub border_gray: Color,

    // Title bar colors
    pub title_bar_background: Color,
    pub title_bar_button_hover: Color,
    pub title_bar_close_hover: Color,
    pub title_bar_glyph: Color,

    // Ribbon colors
    pub ribbon_tab_background: Color,
    pub ribbon_item_highlight: Color,
    pub ribbon_item_highlight_border: Color,
    pub ribbon_item_selected: Color,
    pub ribbon_item_face: Color,

    // Focus indication
    pub focus_border: Color,
}

impl Theme {
    /// Light theme with a blue ribbon
    pub const MODERN: Theme = Theme {
        form_background: Color::rgb(240, 240, 240),
        ribbon_color: Color::rgb(16, 110, 190),

        control_background: Color::rgb(255, 255, 255),
        border_gray: Color::rgb(171, 171, 171),

        title_bar_background: Color::rgb(16, 110, 190),
        title_bar_button_hover: Color::rgb(42, 138, 212),
        title_bar_close_hover: Color::rgb(232, 17, 35),
        title_bar_glyph: Color::rgb(255, 255, 255),

        ribbon_tab_background: Color::rgb(243, 243, 243),
        ribbon_item_highlight: Color::rgb(197, 222, 245),
        ribbon_item_highlight_border: Color::rgb(132, 172, 221),
        ribbon_item_selected: Color::rgb(163, 189, 227),
        ribbon_item_face: Color::rgb(120, 120, 120),

        focus_border: Color::rgb(0, 120, 215),
    };

    /// Same layout, darker surfaces
    pub fn dark() -> Self {
        let mut theme = Self::MODERN;

        theme.form_background = Color::rgb(43, 43, 43);
        theme.control_background = Color::rgb(30, 30, 30);
        theme.border_gray = Color::rgb(90, 90, 90);
        theme.ribbon_tab_background = Color::rgb(50, 50, 50);
        theme.ribbon_item_highlight = Color::rgb(70, 70, 70);
        theme.ribbon_item_highlight_border = Color::rgb(110, 110, 110);
        theme.ribbon_item_selected = Color::rgb(85, 85, 85);
        theme.ribbon_item_face = Color::rgb(200, 200, 200);

        theme
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::MODERN
    }
}
