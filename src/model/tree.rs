//! Nodes of a layout tree.
//!
//! Nodes live in a per-desktop [`slotmap::SlotMap`] arena owned by
//! [`DesktopTree`](super::desktop::DesktopTree). Parent and child edges are
//! arena keys, so cloning the arena clones the tree with every key intact.
//! Each node additionally carries a [`Generation`], a process-wide identity
//! that survives cloning and is used to find a node's counterpart in a copy.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::layout_engine::flex::Flex;
use crate::layout_engine::layout::LayoutFunction;
use crate::layout_engine::{NodeKindTag, Orientation};
use crate::sys::geometry::{Rect, Size, Thickness};
use crate::sys::window::WindowId;

new_key_type! {
    pub struct NodeId;
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a node, preserved when its tree is cloned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn next() -> Generation { Generation(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)) }

    pub fn get(&self) -> u64 { self.0 }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) generation: Generation,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) min_size: Size,
    pub(crate) max_size: Size,
    pub(crate) padding: Thickness,
    /// Rectangle allotted by the parent on the last arrange, padding included.
    pub(crate) rect: Rect,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Node {
        Node {
            generation: Generation::next(),
            parent: None,
            kind,
            min_size: Size::ZERO,
            max_size: Size::UNBOUNDED,
            padding: Thickness::ZERO,
            rect: Rect::default(),
        }
    }

    pub fn generation(&self) -> Generation { self.generation }

    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn kind(&self) -> &NodeKind { &self.kind }

    pub fn tag(&self) -> NodeKindTag { self.kind.tag() }

    pub fn min_size(&self) -> Size { self.min_size }

    pub fn max_size(&self) -> Size { self.max_size }

    pub fn padding(&self) -> Thickness { self.padding }

    pub fn rect(&self) -> Rect { self.rect }

    /// The rectangle of the node's content, i.e. its rect minus padding.
    pub fn content_rect(&self) -> Rect { self.rect.deflate(self.padding) }

    pub fn window(&self) -> Option<WindowId> {
        match self.kind {
            NodeKind::Window(window) => Some(window),
            _ => None,
        }
    }

    pub fn children(&self) -> &[NodeId] { self.kind.children() }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Split(SplitPanel),
    Stack(StackPanel),
    Static(StaticPanel),
    Window(WindowId),
    Placeholder,
}

impl NodeKind {
    pub fn split(orientation: Orientation) -> NodeKind {
        NodeKind::Split(SplitPanel {
            orientation,
            children: Vec::new(),
            flex: Flex::default(),
            synced: Vec::new(),
        })
    }

    pub fn stack() -> NodeKind {
        NodeKind::Stack(StackPanel { children: Vec::new(), active: None })
    }

    pub fn with_layout(function: Arc<dyn LayoutFunction + Send + Sync>) -> NodeKind {
        NodeKind::Static(StaticPanel { children: Vec::new(), function })
    }

    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Split(_) => NodeKindTag::Split,
            NodeKind::Stack(_) => NodeKindTag::Stack,
            NodeKind::Static(_) => NodeKindTag::Static,
            NodeKind::Window(_) => NodeKindTag::Window,
            NodeKind::Placeholder => NodeKindTag::Placeholder,
        }
    }

    pub fn is_panel(&self) -> bool { self.tag().is_panel() }

    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKind::Split(split) => &split.children,
            NodeKind::Stack(stack) => &stack.children,
            NodeKind::Static(panel) => &panel.children,
            NodeKind::Window(_) | NodeKind::Placeholder => &[],
        }
    }

    pub(crate) fn insert_child(&mut self, index: usize, child: NodeId) {
        match self {
            NodeKind::Split(split) => split.insert(index, child),
            NodeKind::Stack(stack) => {
                let index = index.min(stack.children.len());
                stack.children.insert(index, child);
                stack.active.get_or_insert(child);
            }
            NodeKind::Static(panel) => {
                let index = index.min(panel.children.len());
                panel.children.insert(index, child);
            }
            NodeKind::Window(_) | NodeKind::Placeholder => {}
        }
    }

    pub(crate) fn remove_child(&mut self, index: usize) -> NodeId {
        match self {
            NodeKind::Split(split) => split.remove(index),
            NodeKind::Stack(stack) => {
                let child = stack.children.remove(index);
                if stack.active == Some(child) {
                    let next = index.min(stack.children.len().saturating_sub(1));
                    stack.active = stack.children.get(next).copied();
                }
                child
            }
            NodeKind::Static(panel) => panel.children.remove(index),
            NodeKind::Window(_) | NodeKind::Placeholder => {
                unreachable!("leaf nodes have no children")
            }
        }
    }

    /// Puts `child` into the slot at `index`, keeping the slot's size.
    pub(crate) fn replace_child(&mut self, index: usize, child: NodeId) -> NodeId {
        let slot = match self {
            NodeKind::Split(split) => &mut split.children[index],
            NodeKind::Stack(stack) => {
                if stack.active == Some(stack.children[index]) {
                    stack.active = Some(child);
                }
                &mut stack.children[index]
            }
            NodeKind::Static(panel) => &mut panel.children[index],
            NodeKind::Window(_) | NodeKind::Placeholder => {
                unreachable!("leaf nodes have no children")
            }
        };
        std::mem::replace(slot, child)
    }

    pub(crate) fn move_child(&mut self, from: usize, to: usize) {
        match self {
            NodeKind::Split(split) => {
                let child = split.children.remove(from);
                let synced = split.synced.remove(from);
                let to = to.min(split.children.len());
                split.children.insert(to, child);
                split.synced.insert(to, synced);
                split.flex.move_item(from, to);
            }
            NodeKind::Stack(StackPanel { children, .. })
            | NodeKind::Static(StaticPanel { children, .. }) => {
                let child = children.remove(from);
                let to = to.min(children.len());
                children.insert(to, child);
            }
            NodeKind::Window(_) | NodeKind::Placeholder => {}
        }
    }
}

/// Arranges children sequentially along `orientation`, sized by a [`Flex`]
/// solver whose items are index-aligned with the children.
#[derive(Clone, Debug)]
pub struct SplitPanel {
    pub(crate) orientation: Orientation,
    pub(crate) children: Vec<NodeId>,
    pub(crate) flex: Flex,
    /// Whether the flex item at the same index has been given the child's
    /// measured bounds yet.
    pub(crate) synced: Vec<bool>,
}

impl SplitPanel {
    pub fn orientation(&self) -> Orientation { self.orientation }

    pub fn flex(&self) -> &Flex { &self.flex }

    fn insert(&mut self, index: usize, child: NodeId) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
        self.synced.insert(index, false);
        // The child's real bounds are applied on the next arrange.
        let inserted = self.flex.insert(index, 0.0, f64::INFINITY);
        debug_assert!(inserted.is_ok(), "an unconstrained flex item always fits");
    }

    fn remove(&mut self, index: usize) -> NodeId {
        self.synced.remove(index);
        self.flex.remove(index);
        self.children.remove(index)
    }
}

/// Overlays its children in the same rectangle. Only windows may live in a
/// stack.
#[derive(Clone, Debug)]
pub struct StackPanel {
    pub(crate) children: Vec<NodeId>,
    pub(crate) active: Option<NodeId>,
}

impl StackPanel {
    pub fn active(&self) -> Option<NodeId> { self.active }
}

/// Delegates measure and arrange of its children to a [`LayoutFunction`].
#[derive(Clone)]
pub struct StaticPanel {
    pub(crate) children: Vec<NodeId>,
    pub(crate) function: Arc<dyn LayoutFunction + Send + Sync>,
}

impl fmt::Debug for StaticPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPanel")
            .field("children", &self.children)
            .field("function", &self.function.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn generations_increase() {
        let a = Generation::next();
        let b = Generation::next();
        assert!(b > a);
    }

    #[test]
    fn split_children_stay_aligned_with_flex() {
        let ids = ids(3);
        let mut kind = NodeKind::split(Orientation::Horizontal);
        kind.insert_child(0, ids[0]);
        kind.insert_child(0, ids[1]);
        kind.insert_child(5, ids[2]);
        assert_eq!(kind.children(), &[ids[1], ids[0], ids[2]]);

        kind.move_child(0, 2);
        assert_eq!(kind.children(), &[ids[0], ids[2], ids[1]]);
        assert_eq!(kind.remove_child(1), ids[2]);

        let NodeKind::Split(split) = &kind else { unreachable!() };
        assert_eq!(split.flex.len(), 2);
        assert_eq!(split.synced.len(), 2);
    }

    #[test]
    fn stack_keeps_an_active_child() {
        let ids = ids(3);
        let mut kind = NodeKind::stack();
        for (i, &id) in ids.iter().enumerate() {
            kind.insert_child(i, id);
        }
        let NodeKind::Stack(stack) = &kind else { unreachable!() };
        assert_eq!(stack.active, Some(ids[0]));

        kind.remove_child(0);
        let NodeKind::Stack(stack) = &kind else { unreachable!() };
        assert_eq!(stack.active, Some(ids[1]));

        kind.replace_child(0, ids[0]);
        let NodeKind::Stack(stack) = &kind else { unreachable!() };
        assert_eq!(stack.active, Some(ids[0]));
    }
}
