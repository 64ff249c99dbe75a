//! Colors, borders and per-control style

use tiny_skia::{ColorU8, Paint};

/// 8-bit RGBA color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Solid, aliased paint for the rasterizer
    pub(crate) fn paint(self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(self.into());
        paint.anti_alias = false;
        paint
    }
}

impl From<Color> for tiny_skia::Color {
    fn from(color: Color) -> Self {
        tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

impl From<ColorU8> for Color {
    fn from(color: ColorU8) -> Self {
        Color::rgba(color.red(), color.green(), color.blue(), color.alpha())
    }
}

/// One edge of a border
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BorderSide {
    pub width: i32,
    pub color: Color,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Border {
    pub left: BorderSide,
    pub top: BorderSide,
    pub right: BorderSide,
    pub bottom: BorderSide,
}

impl Border {
    pub fn uniform(width: i32, color: Color) -> Self {
        let side = BorderSide { width: width.max(0), color };
        Self { left: side, top: side, right: side, bottom: side }
    }

    pub fn set_width(&mut self, width: i32) {
        let width = width.max(0);
        for side in self.sides_mut() {
            side.width = width;
        }
    }

    pub fn set_color(&mut self, color: Color) {
        for side in self.sides_mut() {
            side.color = color;
        }
    }

    fn sides_mut(&mut self) -> [&mut BorderSide; 4] {
        [&mut self.left, &mut self.top, &mut self.right, &mut self.bottom]
    }
}

/// Visual style of a control or window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlStyle {
    pub background_color: Color,
    pub border: Border,
}

impl ControlStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_border(mut self, width: i32, color: Color) -> Self {
        self.border = Border::uniform(width, color);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_survives_rasterizer_conversion() {
        let color = Color::rgba(10, 20, 30, 255);
        let converted = tiny_skia::Color::from(color).to_color_u8();
        assert_eq!(Color::from(converted), color);
        assert!(!Color::TRANSPARENT.paint().anti_alias);
    }

    #[test]
    fn test_border_width_never_negative() {
        let mut border = Border::uniform(-3, Color::BLACK);
        assert_eq!(border.left.width, 0);
        border.set_width(2);
        assert_eq!(border.bottom.width, 2);
    }
}
