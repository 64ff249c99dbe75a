//! Drawing context over a locked framebuffer
//!
//! Coordinates passed to a canvas are device-independent and relative to the
//! current origin. Rasterization goes through `tiny_skia`; the clip is a
//! `Mask` that only ever shrinks until `restore`, so nothing drawn by a
//! control can land outside the intersection of its own bounds and every
//! ancestor clip.

use tiny_skia::{FillRule, LineCap, Mask, PathBuilder, PixmapMut, Stroke, Transform};

use crate::geometry::{Point, Rect};
use crate::platform::PixelBuffer;

use super::style::{Color, ControlStyle};
use super::theme::Theme;

#[derive(Clone)]
struct CanvasState {
    origin: Point,
    clip: Rect,
    mask: Option<Mask>,
}

pub struct Canvas<'a> {
    /// `None` for an empty target; every draw is then a no-op
    pixmap: Option<PixmapMut<'a>>,
    theme: &'a Theme,
    scaling: f64,
    origin: Point,
    /// Device-pixel bounds of the clip
    clip: Rect,
    /// Coverage of the clip; `None` while the clip is the whole target
    mask: Option<Mask>,
    saved: Vec<CanvasState>,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut PixelBuffer, theme: &'a Theme, scaling: f64) -> Self {
        let size = target.size();
        Self {
            pixmap: target.pixmap_mut(),
            theme,
            scaling: if scaling > 0.0 { scaling } else { 1.0 },
            origin: Point::ORIGIN,
            clip: Rect::new(0, 0, size.width, size.height),
            mask: None,
            saved: Vec::new(),
        }
    }

    pub fn theme(&self) -> &Theme {
        self.theme
    }

    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    pub fn save(&mut self) {
        self.saved.push(CanvasState { origin: self.origin, clip: self.clip, mask: self.mask.clone() });
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.origin = state.origin;
            self.clip = state.clip;
            self.mask = state.mask;
        }
    }

    /// Move the origin by (dx, dy) device-independent units
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.origin = self.origin.offset(dx, dy);
    }

    /// Intersect the clip with `rect`
    pub fn clip_rect(&mut self, rect: Rect) {
        let rect = rect.clamped();
        let before = self.clip;
        self.clip = self.clip.intersect(&self.to_device(rect));
        if self.clip == before || self.clip.is_empty() {
            return;
        }
        let (Some(pixmap), Some(path)) = (self.pixmap.as_ref(), to_skia_rect(rect).map(PathBuilder::from_rect))
        else {
            return;
        };
        let transform = self.transform();
        match self.mask.as_mut() {
            Some(mask) => mask.intersect_path(&path, FillRule::Winding, false, transform),
            None => {
                if let Some(mut mask) = Mask::new(pixmap.width(), pixmap.height()) {
                    mask.fill_path(&path, FillRule::Winding, false, transform);
                    self.mask = Some(mask);
                }
            }
        }
    }

    pub fn is_clip_empty(&self) -> bool {
        self.clip.is_empty()
    }

    /// The current clip in device pixels
    pub fn device_clip(&self) -> Rect {
        self.clip
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.is_transparent() || rect.is_empty() || self.to_device(rect).intersect(&self.clip).is_empty() {
            return;
        }
        let transform = self.transform();
        if let (Some(pixmap), Some(area)) = (self.pixmap.as_mut(), to_skia_rect(rect)) {
            pixmap.fill_rect(area, &color.paint(), transform, self.mask.as_ref());
        }
    }

    pub fn draw_background(&mut self, rect: Rect, style: &ControlStyle) {
        self.fill_rect(rect, style.background_color);
    }

    pub fn draw_border(&mut self, rect: Rect, style: &ControlStyle) {
        let border = &style.border;
        if border.left.width > 0 {
            self.fill_rect(Rect::new(rect.x, rect.y, border.left.width, rect.height), border.left.color);
        }
        if border.right.width > 0 {
            self.fill_rect(
                Rect::new(rect.right() - border.right.width, rect.y, border.right.width, rect.height),
                border.right.color,
            );
        }
        if border.top.width > 0 {
            self.fill_rect(Rect::new(rect.x, rect.y, rect.width, border.top.width), border.top.color);
        }
        if border.bottom.width > 0 {
            self.fill_rect(
                Rect::new(rect.x, rect.bottom() - border.bottom.width, rect.width, border.bottom.width),
                border.bottom.color,
            );
        }
    }

    /// One-unit-wide line between two points, both ends inclusive
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) {
        if color.is_transparent() || self.clip.is_empty() {
            return;
        }
        if (x1, y1) == (x2, y2) {
            return self.fill_rect(Rect::new(x1, y1, 1, 1), color);
        }
        // Stroke through unit centers; square caps cover both end units
        let mut builder = PathBuilder::new();
        builder.move_to(x1 as f32 + 0.5, y1 as f32 + 0.5);
        builder.line_to(x2 as f32 + 0.5, y2 as f32 + 0.5);
        let Some(path) = builder.finish() else {
            return;
        };
        let stroke = Stroke { width: 1.0, line_cap: LineCap::Square, ..Stroke::default() };
        let transform = self.transform();
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.stroke_path(&path, &color.paint(), &stroke, transform, self.mask.as_ref());
        }
    }

    /// Units relative to the origin into device pixels
    fn transform(&self) -> Transform {
        let scale = self.scaling as f32;
        Transform::from_row(scale, 0.0, 0.0, scale, self.origin.x as f32 * scale, self.origin.y as f32 * scale)
    }

    fn to_device(&self, rect: Rect) -> Rect {
        let scale = |v: i32| (v as f64 * self.scaling).round() as i32;
        let left = scale(self.origin.x + rect.left());
        let top = scale(self.origin.y + rect.top());
        let right = scale(self.origin.x + rect.right());
        let bottom = scale(self.origin.y + rect.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

fn to_skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelSize;

    const RED: Color = Color::rgb(255, 0, 0);

    fn buffer(width: i32, height: i32) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(PixelSize::new(width, height));
        buffer.clear(Color::BLACK);
        buffer
    }

    fn count(buffer: &PixelBuffer, color: Color) -> usize {
        let size = buffer.size();
        (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| (x, y)))
            .filter(|&(x, y)| buffer.pixel(x, y) == Some(color))
            .count()
    }

    #[test]
    fn test_nested_clip_limits_fill() {
        let mut target = buffer(20, 20);
        let theme = Theme::default();
        {
            let mut canvas = Canvas::new(&mut target, &theme, 1.0);
            canvas.clip_rect(Rect::new(2, 2, 10, 10));
            canvas.save();
            canvas.translate(8, 8);
            canvas.clip_rect(Rect::new(0, 0, 10, 10));
            canvas.fill_rect(Rect::new(-5, -5, 50, 50), RED);
            canvas.restore();
        }
        // Only the 4x4 overlap of (2..12) and (8..18) is painted
        assert_eq!(count(&target, RED), 16);
        assert_eq!(target.pixel(8, 8), Some(RED));
        assert_eq!(target.pixel(12, 12), Some(Color::BLACK));
    }

    #[test]
    fn test_restore_widens_clip_again() {
        let mut target = buffer(10, 10);
        let theme = Theme::default();
        let mut canvas = Canvas::new(&mut target, &theme, 1.0);
        canvas.save();
        canvas.clip_rect(Rect::new(0, 0, 1, 1));
        canvas.restore();
        assert_eq!(canvas.device_clip(), Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_border_paints_edges_only() {
        let mut target = buffer(6, 6);
        let theme = Theme::default();
        {
            let mut canvas = Canvas::new(&mut target, &theme, 1.0);
            let style = ControlStyle::new().with_border(1, RED);
            canvas.draw_border(Rect::new(0, 0, 6, 6), &style);
        }
        assert_eq!(count(&target, RED), 20);
        assert_eq!(target.pixel(3, 3), Some(Color::BLACK));
    }

    #[test]
    fn test_scaling_maps_units_to_pixels() {
        let mut target = buffer(8, 8);
        let theme = Theme::default();
        {
            let mut canvas = Canvas::new(&mut target, &theme, 2.0);
            canvas.fill_rect(Rect::new(1, 1, 2, 1), RED);
        }
        assert_eq!(count(&target, RED), 8);
        assert_eq!(target.pixel(2, 2), Some(RED));
        assert_eq!(target.pixel(5, 3), Some(RED));
    }

    #[test]
    fn test_vertical_line_is_inclusive() {
        let mut target = buffer(5, 10);
        let theme = Theme::default();
        {
            let mut canvas = Canvas::new(&mut target, &theme, 1.0);
            canvas.draw_line(2, 1, 2, 6, RED);
        }
        assert_eq!(count(&target, RED), 6);
    }

    #[test]
    fn test_diagonal_line_stays_inside_clip() {
        let mut target = buffer(10, 10);
        let theme = Theme::default();
        {
            let mut canvas = Canvas::new(&mut target, &theme, 1.0);
            canvas.clip_rect(Rect::new(0, 0, 5, 5));
            canvas.draw_line(0, 0, 9, 9, RED);
        }
        assert!(count(&target, RED) > 0);
        for y in 0..10 {
            for x in 0..10 {
                if x >= 5 || y >= 5 {
                    assert_eq!(target.pixel(x, y), Some(Color::BLACK), "pixel ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_empty_target_ignores_drawing() {
        let mut target = PixelBuffer::new(PixelSize::new(0, 0));
        let theme = Theme::default();
        let mut canvas = Canvas::new(&mut target, &theme, 1.0);
        assert!(canvas.is_clip_empty());
        canvas.fill_rect(Rect::new(0, 0, 4, 4), RED);
        canvas.draw_line(0, 0, 3, 3, RED);
    }
}
