//! Geometry primitives shared by layout, hit testing and painting
//!
//! Control coordinates are device-independent units stored as integers.
//! Screen coordinates (window positions, working areas) are physical pixels
//! and use the `Pixel*` types.

/// A point in device-independent units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A size in device-independent units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const EMPTY: Size = Size { width: 0, height: 0 };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Negative extents from a degenerate layout become zero
    pub fn clamped(self) -> Self {
        Self::new(self.width.max(0), self.height.max(0))
    }
}

/// Represents a rectangular region
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect { x: 0, y: 0, width: 0, height: 0 };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Same origin, negative width/height clamped to zero
    pub fn clamped(self) -> Self {
        Self::new(self.x, self.y, self.width.max(0), self.height.max(0))
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// True when `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Intersection of two rectangles; `Rect::EMPTY`-sized when they do not overlap
    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Rect::new(left, top, 0, 0);
        }
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Overlapping or sharing an edge
    pub fn touches(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Shrink by padding, clamping the result to a non-negative size
    pub fn deflate(&self, padding: Padding) -> Rect {
        Rect::new(
            self.x + padding.left,
            self.y + padding.top,
            self.width - padding.horizontal(),
            self.height - padding.vertical(),
        )
        .clamped()
    }
}

/// Inner spacing of a container, per edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Padding {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Padding {
    pub const EMPTY: Padding = Padding { left: 0, top: 0, right: 0, bottom: 0 };

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub const fn all(value: i32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

/// A position in physical screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const ORIGIN: PixelPoint = PixelPoint { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A size in physical pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: i32,
    pub height: i32,
}

impl PixelSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Convert a device-independent size to pixels, rounding partial pixels up
    pub fn from_size(size: Size, scaling: f64) -> Self {
        let scaling = if scaling > 0.0 { scaling } else { 1.0 };
        Self::new(
            (size.width.max(0) as f64 * scaling).ceil() as i32,
            (size.height.max(0) as f64 * scaling).ceil() as i32,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// A rectangle in physical pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_parts(position: PixelPoint, size: PixelSize) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn position(&self) -> PixelPoint {
        PixelPoint::new(self.x, self.y)
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    pub fn contains(&self, point: PixelPoint) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Position `rect` (only its size is used) centered inside this rectangle
    pub fn center_rect(&self, rect: PixelRect) -> PixelRect {
        PixelRect::new(
            self.x + (self.width - rect.width) / 2,
            self.y + (self.height - rect.height) / 2,
            rect.width,
            rect.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_clamps_degenerate_rects() {
        let rect = Rect::new(10, 10, 5, 4);
        let inner = rect.deflate(Padding::new(3, 3, 4, 3));
        assert_eq!(inner.x, 13);
        assert_eq!(inner.y, 13);
        assert_eq!(inner.width, 0);
        assert_eq!(inner.height, 0);
    }

    #[test]
    fn test_intersect_and_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert!(a.intersect(&Rect::new(20, 20, 2, 2)).is_empty());
        // Edge-adjacent rects touch but do not intersect
        let c = Rect::new(10, 0, 4, 4);
        assert!(!a.intersects(&c));
        assert!(a.touches(&c));
    }

    #[test]
    fn test_center_rect_on_full_hd_working_area() {
        let working_area = PixelRect::new(0, 0, 1920, 1080);
        let window = PixelRect::from_parts(PixelPoint::ORIGIN, PixelSize::new(1080, 720));
        assert_eq!(working_area.center_rect(window).position(), PixelPoint::new(420, 180));
    }

    #[test]
    fn test_pixel_size_from_scaled_size() {
        assert_eq!(PixelSize::from_size(Size::new(100, 50), 1.5), PixelSize::new(150, 75));
        assert_eq!(PixelSize::from_size(Size::new(3, 3), 1.25), PixelSize::new(4, 4));
        assert_eq!(PixelSize::from_size(Size::new(10, 10), 0.0), PixelSize::new(10, 10));
    }
}
