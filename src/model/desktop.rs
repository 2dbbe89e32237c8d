use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use super::tree::{Generation, Node, NodeId, NodeKind};
use crate::common::collections::HashMap;
use crate::layout_engine::error::{Result, TilingError};
use crate::layout_engine::layout::Spacing;
use crate::layout_engine::{NodeKindTag, Orientation};
use crate::sys::geometry::{Point, Rect};
use crate::sys::window::WindowId;

/// One layout tree bound to a work area.
///
/// The tree owns its nodes in an arena. Detached nodes may exist in the arena
/// while an edit is in progress; only nodes reachable from the root take part
/// in layout, and only windows reachable from the root are in the window
/// index. The index is maintained by [`attach`](Self::attach),
/// [`detach`](Self::detach) and [`replace`](Self::replace) and is never
/// written anywhere else.
#[derive(Clone, Debug)]
pub struct DesktopTree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) root: NodeId,
    pub(crate) work_area: Rect,
    pub(crate) spacing: Spacing,
    windows: HashMap<WindowId, NodeId>,
    generations: HashMap<Generation, NodeId>,
}

impl DesktopTree {
    pub fn new(root: NodeKind, work_area: Rect) -> DesktopTree {
        debug_assert!(root.is_panel(), "the root of a desktop must be a panel");
        let mut nodes = SlotMap::with_key();
        let mut node = Node::new(root);
        node.rect = work_area;
        let generation = node.generation;
        let root = nodes.insert(node);
        let mut generations = HashMap::default();
        generations.insert(generation, root);
        DesktopTree {
            nodes,
            root,
            work_area,
            spacing: Spacing::default(),
            windows: HashMap::default(),
            generations,
        }
    }

    pub fn with_split(orientation: Orientation, work_area: Rect) -> DesktopTree {
        Self::new(NodeKind::split(orientation), work_area)
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn work_area(&self) -> Rect { self.work_area }

    pub fn set_work_area(&mut self, work_area: Rect) { self.work_area = work_area; }

    pub fn spacing(&self) -> Spacing { self.spacing }

    pub fn set_spacing(&mut self, spacing: Spacing) { self.spacing = spacing; }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains_key(id) }

    pub fn tag(&self, id: NodeId) -> Option<NodeKindTag> { self.nodes.get(id).map(Node::tag) }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.nodes.get(id)?.parent }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Iterates over the ancestors of `id`, nearest first. Does not include
    /// `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Whether `node` is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn is_attached(&self, id: NodeId) -> bool { self.is_within(id, self.root) }

    /// Whether any ancestor of `id` is a stack panel.
    pub fn has_stack_ancestor(&self, id: NodeId) -> bool {
        self.ancestors(id).any(|a| self.tag(a) == Some(NodeKindTag::Stack))
    }

    /// All nodes of the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    pub fn find_window(&self, window: WindowId) -> Option<NodeId> {
        self.windows.get(&window).copied()
    }

    pub fn has_window(&self, window: WindowId) -> bool { self.windows.contains_key(&window) }

    /// Windows in tree order.
    pub fn windows(&self) -> Vec<WindowId> {
        self.descendants(self.root).into_iter().filter_map(|id| self.nodes[id].window()).collect()
    }

    pub fn window_count(&self) -> usize { self.windows.len() }

    /// Finds the node with the given generation, which also works on a clone
    /// of the tree the generation was taken from.
    pub fn locate(&self, generation: Generation) -> Option<NodeId> {
        self.generations.get(&generation).copied()
    }

    pub fn generation(&self, id: NodeId) -> Option<Generation> {
        self.nodes.get(id).map(Node::generation)
    }

    /// Creates a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(kind);
        let generation = node.generation;
        let id = self.nodes.insert(node);
        self.generations.insert(generation, id);
        id
    }

    pub fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        let Some(parent_node) = self.nodes.get(parent) else {
            return Err(TilingError::MissingTarget);
        };
        if !parent_node.kind.is_panel() || !self.contains(child) {
            return Err(TilingError::MissingTarget);
        }
        if child == self.root || self.is_within(parent, child) {
            return Err(TilingError::CausesRecursiveNesting);
        }
        debug_assert!(self.nodes[child].parent.is_none(), "attaching an attached node");

        if self.is_attached(parent) {
            self.register_subtree(child)?;
        }
        self.nodes[parent].kind.insert_child(index, child);
        self.nodes[child].parent = Some(parent);
        trace!(?child, ?parent, index, "attached");
        Ok(())
    }

    /// Removes `child` from its parent, returning the parent and the index it
    /// was removed from. The node stays in the arena.
    pub fn detach(&mut self, child: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(child)?;
        let index = self.index_in_parent(child)?;
        if self.is_attached(parent) {
            self.unregister_subtree(child);
        }
        self.nodes[parent].kind.remove_child(index);
        self.nodes[child].parent = None;
        trace!(?child, ?parent, index, "detached");
        Some((parent, index))
    }

    /// Puts the detached node `new` into the slot currently held by `old`,
    /// which becomes detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == self.root {
            return Err(TilingError::ModifiesTopLevelPanel);
        }
        let (Some(parent), Some(index)) = (self.parent(old), self.index_in_parent(old)) else {
            return Err(TilingError::MissingTarget);
        };
        if !self.contains(new) || self.is_within(parent, new) {
            return Err(TilingError::CausesRecursiveNesting);
        }
        if self.is_attached(parent) {
            self.unregister_subtree(old);
            if let Err(err) = self.register_subtree(new) {
                self.register_subtree(old)?;
                return Err(err);
            }
        }
        self.nodes[parent].kind.replace_child(index, new);
        self.nodes[old].parent = None;
        self.nodes[new].parent = Some(parent);
        Ok(())
    }

    /// Moves `node` to position `to` among its siblings, keeping sizes.
    pub fn reorder(&mut self, node: NodeId, to: usize) -> Result<()> {
        let (Some(parent), Some(from)) = (self.parent(node), self.index_in_parent(node)) else {
            return Err(TilingError::MissingTarget);
        };
        self.nodes[parent].kind.move_child(from, to);
        Ok(())
    }

    /// Exchanges the slots of two nodes, neither of which may contain the
    /// other.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        if a == self.root || b == self.root {
            return Err(TilingError::ModifiesTopLevelPanel);
        }
        if self.is_within(a, b) || self.is_within(b, a) {
            return Err(TilingError::CausesRecursiveNesting);
        }
        let hole = self.create(NodeKind::Placeholder);
        self.replace(a, hole)?;
        self.replace(b, a)?;
        self.replace(hole, b)?;
        self.destroy(hole);
        Ok(())
    }

    /// Removes a detached subtree from the arena.
    pub fn destroy(&mut self, id: NodeId) {
        debug_assert!(self.parent(id).is_none() && id != self.root, "destroying an attached node");
        for node in self.descendants(id) {
            if let Some(removed) = self.nodes.remove(node) {
                self.generations.remove(&removed.generation);
            }
        }
    }

    /// Walks from `from` to the root, removing empty panels and collapsing
    /// panels with a single child into that child. The root is never
    /// touched.
    pub fn cleanup(&mut self, from: NodeId) {
        let mut current = Some(from);
        while let Some(id) = current {
            if id == self.root || !self.contains(id) {
                break;
            }
            let parent = self.parent(id);
            if self.nodes[id].kind.is_panel() {
                let children = self.children(id).to_vec();
                match children.as_slice() {
                    [] => {
                        debug!(?id, "removing empty panel");
                        self.detach(id);
                        self.destroy(id);
                    }
                    &[only] => {
                        debug!(?id, ?only, "collapsing panel into its only child");
                        self.detach(only);
                        match self.replace(id, only) {
                            Ok(()) => self.destroy(id),
                            Err(err) => {
                                warn!(?id, ?err, "could not collapse panel");
                                let _ = self.attach(id, 0, only);
                            }
                        }
                    }
                    _ => {}
                }
            }
            current = parent;
        }
    }

    pub fn placeholders(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.tag(id) == Some(NodeKindTag::Placeholder))
            .collect()
    }

    /// Removes every placeholder, cleaning up panels they leave behind.
    /// Returns whether anything was removed.
    pub fn remove_placeholders(&mut self) -> bool {
        let placeholders = self.placeholders();
        for &placeholder in &placeholders {
            if let Some((parent, _)) = self.detach(placeholder) {
                self.destroy(placeholder);
                self.cleanup(parent);
            }
        }
        !placeholders.is_empty()
    }

    /// Returns the deepest node whose rectangle contains `point`. Inside a
    /// stack only the active child is considered.
    pub fn node_at_point(&self, point: Point) -> Option<NodeId> {
        if !self.nodes[self.root].rect.contains(point) {
            return None;
        }
        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            let next = match &node.kind {
                NodeKind::Stack(stack) => stack.active,
                kind => kind.children().iter().copied().find(|&c| self.nodes[c].rect.contains(point)),
            };
            match next.filter(|&c| self.nodes[c].rect.contains(point)) {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// The content rectangle of every window, in tree order.
    pub fn frames(&self) -> Vec<(WindowId, Rect)> {
        self.descendants(self.root)
            .into_iter()
            .filter_map(|id| {
                let node = &self.nodes[id];
                node.window().map(|w| (w, node.content_rect()))
            })
            .collect()
    }

    /// Like [`frames`](Self::frames) but skips windows hidden behind the
    /// active child of a stack.
    pub fn visible_frames(&self) -> Vec<(WindowId, Rect)> {
        self.visible_windows()
            .into_iter()
            .filter_map(|id| {
                let node = &self.nodes[id];
                node.window().map(|w| (w, node.content_rect()))
            })
            .collect()
    }

    /// Window nodes that are not hidden inside a stack, in tree order.
    pub fn visible_windows(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match &self.nodes[id].kind {
                NodeKind::Window(_) => out.push(id),
                NodeKind::Stack(panel) => stack.extend(panel.active),
                kind => stack.extend(kind.children().iter().rev()),
            }
        }
        out
    }

    /// Makes `node` the active child of every stack on its path to the root.
    pub fn activate(&mut self, node: NodeId) {
        let mut child = node;
        while let Some(parent) = self.parent(child) {
            if let NodeKind::Stack(stack) = &mut self.nodes[parent].kind {
                stack.active = Some(child);
            }
            child = parent;
        }
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.get_ascii_tree(self.root);
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn get_ascii_tree(&self, id: NodeId) -> ascii_tree::Tree {
        let node = &self.nodes[id];
        let status = match node.parent.map(|p| &self.nodes[p].kind) {
            Some(NodeKind::Stack(stack)) if stack.active == Some(id) => "☒ ",
            Some(NodeKind::Stack(_)) => "☐ ",
            _ => "",
        };
        let rect = node.rect;
        let desc = match &node.kind {
            NodeKind::Split(split) => format!("Split({:?})", split.orientation),
            NodeKind::Stack(_) => "Stack".to_string(),
            NodeKind::Static(panel) => format!("Static({})", panel.function.name()),
            NodeKind::Window(window) => format!("{window:?}"),
            NodeKind::Placeholder => "Placeholder".to_string(),
        };
        let desc = format!(
            "{status}{desc} {}x{}+{}+{}",
            rect.width(),
            rect.height(),
            rect.left,
            rect.top
        );
        let children: Vec<_> = node.children().iter().map(|&c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }

    fn register_subtree(&mut self, id: NodeId) -> Result<()> {
        let windows: Vec<(WindowId, NodeId)> = self
            .descendants(id)
            .into_iter()
            .filter_map(|n| self.nodes[n].window().map(|w| (w, n)))
            .collect();
        if let Some(&(window, _)) = windows.iter().find(|(w, _)| self.windows.contains_key(w)) {
            return Err(TilingError::AlreadyRegistered(window));
        }
        self.windows.extend(windows);
        Ok(())
    }

    fn unregister_subtree(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            if let Some(window) = self.nodes[node].window() {
                self.windows.remove(&window);
            }
        }
    }
}
