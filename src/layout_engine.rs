pub mod error;
pub mod flex;
pub(crate) mod graph;
pub mod layout;
pub mod resize;
pub mod workspace;

pub use error::TilingError;
pub use flex::{Flex, FlexError, FlexItem};
pub use graph::{Direction, NodeKindTag, Orientation, ResizeDirection};
pub use layout::{GridLayout, LayoutFunction, Spacing};
pub use resize::{ResizeDelta, ResizeEdges, ResizeMode, ResizeValue};
pub use workspace::{DesktopState, TilingWorkspace};
