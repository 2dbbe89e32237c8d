use serde::{Deserialize, Serialize};

/// Primary axis of a split panel. `Horizontal` places children side by side.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn flip(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Whether the direction points towards higher coordinates.
    pub fn is_forward(self) -> bool { matches!(self, Direction::Right | Direction::Down) }
}

/// Which edge(s) of a flex item move when it is resized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeDirection {
    /// The start edge moves; items before the resized one absorb the change.
    TowardsStart,
    /// The end edge moves; items after the resized one absorb the change.
    TowardsEnd,
    Both,
}

/// The kinds of node a layout tree is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindTag {
    Split,
    Stack,
    Static,
    Window,
    Placeholder,
}

impl NodeKindTag {
    pub fn is_panel(self) -> bool {
        matches!(self, NodeKindTag::Split | NodeKindTag::Stack | NodeKindTag::Static)
    }
}
