use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::graph::{Orientation, ResizeDirection};
use crate::sys::geometry::Rect;

bitflags! {
    /// Edges of a window frame that moved between two observations.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResizeEdges: u8 {
        const LEFT   = 0b0001;
        const TOP    = 0b0010;
        const RIGHT  = 0b0100;
        const BOTTOM = 0b1000;
    }
}

impl ResizeEdges {
    pub fn between(old: Rect, new: Rect) -> ResizeEdges {
        let mut edges = ResizeEdges::empty();
        edges.set(ResizeEdges::LEFT, old.left != new.left);
        edges.set(ResizeEdges::TOP, old.top != new.top);
        edges.set(ResizeEdges::RIGHT, old.right != new.right);
        edges.set(ResizeEdges::BOTTOM, old.bottom != new.bottom);
        edges
    }

    /// Which side of a flex item the change should be taken from along
    /// `orientation`, or `None` when neither edge on that axis moved.
    pub fn direction(self, orientation: Orientation) -> Option<ResizeDirection> {
        let (start, end) = match orientation {
            Orientation::Horizontal => (ResizeEdges::LEFT, ResizeEdges::RIGHT),
            Orientation::Vertical => (ResizeEdges::TOP, ResizeEdges::BOTTOM),
        };
        match (self.contains(start), self.contains(end)) {
            (true, true) => Some(ResizeDirection::Both),
            (true, false) => Some(ResizeDirection::TowardsStart),
            (false, true) => Some(ResizeDirection::TowardsEnd),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Relative to current size
    #[default]
    Relative,
    /// Absolute target size
    Exact,
}

/// A resize value that can be specified as pixels or percentage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResizeValue {
    Pixels(f64),
    Percent(f64),
}

impl ResizeValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some(num_str) = trimmed.strip_suffix('%') {
            let pct: f64 = num_str.trim().parse().ok()?;
            Some(Self::Percent(pct / 100.0))
        } else {
            let px: f64 = trimmed.parse().ok()?;
            Some(Self::Pixels(px))
        }
    }
}

/// 2-dimensional resize request applied to the end edges of a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResizeDelta {
    pub x: ResizeValue,
    pub y: ResizeValue,
    #[serde(default)]
    pub mode: ResizeMode,
}

impl Default for ResizeDelta {
    fn default() -> Self {
        Self {
            x: ResizeValue::Pixels(0.0),
            y: ResizeValue::Pixels(0.0),
            mode: ResizeMode::Relative,
        }
    }
}

impl ResizeDelta {
    pub fn relative(x: ResizeValue, y: ResizeValue) -> Self {
        Self {
            x,
            y,
            mode: ResizeMode::Relative,
        }
    }

    pub fn exact(x: ResizeValue, y: ResizeValue) -> Self {
        Self {
            x,
            y,
            mode: ResizeMode::Exact,
        }
    }

    /// Moves the right and bottom edges of `frame`. Percentages are of the
    /// current size in relative mode and of `work_area` in exact mode.
    pub fn apply(&self, frame: Rect, work_area: Rect) -> Rect {
        let width = Self::one_dim(self.x, self.mode, frame.width(), work_area.width());
        let height = Self::one_dim(self.y, self.mode, frame.height(), work_area.height());
        Rect::from_xywh(frame.left, frame.top, width, height)
    }

    fn one_dim(value: ResizeValue, mode: ResizeMode, current: i32, whole: i32) -> i32 {
        let current = f64::from(current);
        let target = match (mode, value) {
            (ResizeMode::Relative, ResizeValue::Pixels(px)) => current + px,
            (ResizeMode::Relative, ResizeValue::Percent(pct)) => current * (1.0 + pct),
            (ResizeMode::Exact, ResizeValue::Pixels(px)) => px,
            (ResizeMode::Exact, ResizeValue::Percent(pct)) => f64::from(whole) * pct,
        };
        target.round().max(0.0) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_between_frames() {
        let old = Rect::new(0, 0, 100, 100);
        assert_eq!(ResizeEdges::between(old, old), ResizeEdges::empty());
        assert_eq!(
            ResizeEdges::between(old, Rect::new(10, 0, 100, 120)),
            ResizeEdges::LEFT | ResizeEdges::BOTTOM
        );
    }

    #[test]
    fn direction_per_axis() {
        let edges = ResizeEdges::LEFT | ResizeEdges::RIGHT | ResizeEdges::BOTTOM;
        assert_eq!(edges.direction(Orientation::Horizontal), Some(ResizeDirection::Both));
        assert_eq!(edges.direction(Orientation::Vertical), Some(ResizeDirection::TowardsEnd));
        assert_eq!(
            ResizeEdges::TOP.direction(Orientation::Vertical),
            Some(ResizeDirection::TowardsStart)
        );
        assert_eq!(ResizeEdges::TOP.direction(Orientation::Horizontal), None);
    }

    #[test]
    fn parse_values() {
        assert_eq!(ResizeValue::parse("25%"), Some(ResizeValue::Percent(0.25)));
        assert_eq!(ResizeValue::parse(" -40 "), Some(ResizeValue::Pixels(-40.0)));
        assert_eq!(ResizeValue::parse("wide"), None);
    }

    #[test]
    fn apply_moves_end_edges() {
        let frame = Rect::from_xywh(100, 50, 400, 300);
        let screen = Rect::from_xywh(0, 0, 1000, 800);

        let grown = ResizeDelta::relative(ResizeValue::Pixels(50.0), ResizeValue::Percent(-0.5))
            .apply(frame, screen);
        assert_eq!(grown, Rect::from_xywh(100, 50, 450, 150));

        let exact = ResizeDelta::exact(ResizeValue::Percent(0.5), ResizeValue::Pixels(200.0))
            .apply(frame, screen);
        assert_eq!(exact, Rect::from_xywh(100, 50, 500, 200));
    }
}
