pub mod desktop;
pub mod tree;

pub use desktop::DesktopTree;
pub use tree::{Generation, Node, NodeId, NodeKind, SplitPanel, StackPanel, StaticPanel};
