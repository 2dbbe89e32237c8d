//! Integer and floating point geometry shared by the tree and the workspace.
//!
//! Rectangles are stored as edges (`left`, `top`, `right`, `bottom`) with
//! `right`/`bottom` exclusive, the same way the window server reports frames.

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self { Self { x, y } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Size = Size { width: 0, height: 0 };
    /// Used as the maximum size of nodes that do not constrain growth.
    pub const UNBOUNDED: Size = Size { width: i32::MAX, height: i32::MAX };

    pub const fn new(width: i32, height: i32) -> Self { Self { width, height } }

    pub fn along(&self, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }

    pub fn across(&self, orientation: Orientation) -> i32 { self.along(orientation.flip()) }

    /// Builds a size from its extent along and across `orientation`.
    pub fn from_axes(orientation: Orientation, along: i32, across: i32) -> Self {
        match orientation {
            Orientation::Horizontal => Size::new(along, across),
            Orientation::Vertical => Size::new(across, along),
        }
    }

    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }

    pub fn min(self, other: Size) -> Size {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }

    pub fn saturating_add(self, other: Size) -> Size {
        Size::new(
            self.width.saturating_add(other.width),
            self.height.saturating_add(other.height),
        )
    }

    pub fn fits_in(&self, other: Size) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

/// Per-edge spacing around a node's content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thickness {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Thickness {
    pub const ZERO: Thickness = Thickness { left: 0, top: 0, right: 0, bottom: 0 };

    pub const fn uniform(value: i32) -> Self {
        Self { left: value, top: value, right: value, bottom: value }
    }

    pub fn horizontal(&self) -> i32 { self.left + self.right }

    pub fn vertical(&self) -> i32 { self.top + self.bottom }

    pub fn size(&self) -> Size { Size::new(self.horizontal(), self.vertical()) }

    pub fn saturating_add(self, other: Thickness) -> Thickness {
        Thickness {
            left: self.left.saturating_add(other.left),
            top: self.top.saturating_add(other.top),
            right: self.right.saturating_add(other.right),
            bottom: self.bottom.saturating_add(other.bottom),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> i32 { self.right - self.left }

    pub fn height(&self) -> i32 { self.bottom - self.top }

    pub fn size(&self) -> Size { Size::new(self.width(), self.height()) }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width() / 2, self.top + self.height() / 2)
    }

    pub fn is_empty(&self) -> bool { self.width() <= 0 || self.height() <= 0 }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    pub fn extent(&self, orientation: Orientation) -> i32 { self.size().along(orientation) }

    pub fn start(&self, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => self.left,
            Orientation::Vertical => self.top,
        }
    }

    pub fn end(&self, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => self.right,
            Orientation::Vertical => self.bottom,
        }
    }

    /// Shrinks the rectangle by `thickness`, never producing a negative size.
    pub fn deflate(&self, thickness: Thickness) -> Rect {
        let left = self.left + thickness.left;
        let top = self.top + thickness.top;
        Rect {
            left,
            top,
            right: (self.right - thickness.right).max(left),
            bottom: (self.bottom - thickness.bottom).max(top),
        }
    }

    pub fn to_f64(&self) -> RectF {
        RectF {
            left: f64::from(self.left),
            top: f64::from(self.top),
            right: f64::from(self.right),
            bottom: f64::from(self.bottom),
        }
    }
}

/// Floating point rectangle used for intermediate arrange math so that
/// rounding happens once per edge rather than once per child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl RectF {
    pub fn width(&self) -> f64 { self.right - self.left }

    pub fn height(&self) -> f64 { self.bottom - self.top }

    /// Returns the slice `[start, start + length)` of this rectangle along
    /// `orientation`, spanning its full extent across it.
    pub fn slice(&self, orientation: Orientation, start: f64, length: f64) -> RectF {
        match orientation {
            Orientation::Horizontal => RectF {
                left: self.left + start,
                right: self.left + start + length,
                ..*self
            },
            Orientation::Vertical => RectF {
                top: self.top + start,
                bottom: self.top + start + length,
                ..*self
            },
        }
    }
}

pub trait Round {
    type Output;
    fn round(&self) -> Self::Output;
}

impl Round for RectF {
    type Output = Rect;

    fn round(&self) -> Rect {
        Rect {
            left: self.left.round() as i32,
            top: self.top.round() as i32,
            right: self.right.round() as i32,
            bottom: self.bottom.round() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_never_inverts() {
        let rect = Rect::from_xywh(0, 0, 10, 10);
        let shrunk = rect.deflate(Thickness::uniform(8));
        assert_eq!(shrunk.width(), 0);
        assert_eq!(shrunk.height(), 0);
        assert!(shrunk.is_empty());
    }

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::from_xywh(0, 0, 10, 10);
        assert!(rect.contains(Point::new(0, 0)));
        assert!(rect.contains(Point::new(9, 9)));
        assert!(!rect.contains(Point::new(10, 5)));
    }

    #[test]
    fn slices_round_per_edge() {
        let rect = Rect::from_xywh(0, 0, 100, 50).to_f64();
        let third = 100.0 / 3.0;
        let a = rect.slice(Orientation::Horizontal, 0.0, third).round();
        let b = rect.slice(Orientation::Horizontal, third, third).round();
        let c = rect.slice(Orientation::Horizontal, 2.0 * third, third).round();
        assert_eq!(a.right, b.left);
        assert_eq!(b.right, c.left);
        assert_eq!(c.right, 100);
        assert_eq!(a.height(), 50);
    }
}
