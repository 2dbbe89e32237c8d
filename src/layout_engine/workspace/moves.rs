use tracing::{debug, instrument};

use super::editor::{Editor, wrap};
use crate::layout_engine::error::{Result, TilingError};
use crate::layout_engine::resize::ResizeEdges;
use crate::layout_engine::{Direction, NodeKindTag, Orientation, ResizeDirection};
use crate::model::desktop::DesktopTree;
use crate::model::tree::{Node, NodeId, NodeKind};
use crate::sys::geometry::{Point, Rect};
use crate::sys::window::WindowSource;

/// Which side of `rect` a drop at `point` refers to: the axis where the point
/// is relatively furthest from the center, and whether it lies after the
/// center on that axis.
fn drop_side(rect: Rect, point: Point) -> (Orientation, bool) {
    let center = rect.center();
    let dx = i64::from(point.x - center.x);
    let dy = i64::from(point.y - center.y);
    let horizontal =
        dx.abs() * i64::from(rect.height().max(1)) >= dy.abs() * i64::from(rect.width().max(1));
    if horizontal {
        (Orientation::Horizontal, dx > 0)
    } else {
        (Orientation::Vertical, dy > 0)
    }
}

fn in_stack(tree: &DesktopTree, node: NodeId) -> bool {
    tree.parent(node).is_some_and(|p| tree.tag(p) == Some(NodeKindTag::Stack))
}

fn is_window(tree: &DesktopTree, node: NodeId) -> bool {
    tree.tag(node) == Some(NodeKindTag::Window)
}

/// Length of the overlap of two half-open ranges.
fn overlap(a: (i32, i32), b: (i32, i32)) -> i32 { a.1.min(b.1) - a.0.max(b.0) }

impl<S: WindowSource> Editor<'_, S> {
    /// Moves `node` to wherever `point` is on the current arrangement.
    #[instrument(skip(self))]
    pub fn move_node(&mut self, node: NodeId, point: Point, allow_nesting: bool) -> Result<()> {
        let tree = &*self.tree;
        if node == tree.root() {
            return Err(TilingError::ModifiesTopLevelPanel);
        }
        if !tree.is_attached(node) {
            return Err(TilingError::MissingTarget);
        }
        let target = tree.node_at_point(point).ok_or(TilingError::MissingTarget)?;
        if target == node {
            return Ok(());
        }
        if tree.is_within(target, node) {
            return Err(TilingError::CausesRecursiveNesting);
        }
        if target == tree.root() || tree.is_within(node, target) {
            return Err(TilingError::MissingTarget);
        }

        let contains_point = move |tree: &DesktopTree, nodes: &[NodeId], _: &()| {
            tree.node(nodes[0]).is_some_and(|n| n.rect().contains(point))
        };

        if tree.tag(target) == Some(NodeKindTag::Placeholder) {
            if tree.has_stack_ancestor(target) && !is_window(tree, node) {
                return Err(TilingError::NestingInStackPanel);
            }
            debug!(?node, ?target, "taking placeholder slot");
            return self.commit(&[node, target], |tree, nodes| {
                let (node, hole) = (nodes[0], nodes[1]);
                let (old_parent, _) = tree.detach(node).ok_or(TilingError::MissingTarget)?;
                tree.replace(hole, node)?;
                tree.destroy(hole);
                tree.cleanup(old_parent);
                tree.remove_placeholders();
                Ok(())
            });
        }

        if tree.parent(target) == tree.parent(node) {
            debug!(?node, ?target, "reordering siblings");
            return self.speculate(
                &[node, target],
                |tree, nodes| {
                    let index = tree.index_in_parent(nodes[1]).ok_or(TilingError::MissingTarget)?;
                    tree.reorder(nodes[0], index)?;
                    tree.remove_placeholders();
                    Ok(())
                },
                contains_point,
            );
        }

        if allow_nesting {
            self.nest(node, target, point)
        } else {
            self.swap(node, target)
        }
    }

    fn nest(&mut self, node: NodeId, target: NodeId, point: Point) -> Result<()> {
        let tree = &*self.tree;
        let rect = tree.node(target).map(Node::rect).ok_or(TilingError::MissingTarget)?;
        if (in_stack(tree, target) || tree.has_stack_ancestor(target)) && !is_window(tree, node) {
            return Err(TilingError::NestingInStackPanel);
        }
        let (orientation, after) = drop_side(rect, point);
        debug!(?node, ?target, ?orientation, after, "nesting");

        self.speculate(
            &[node, target],
            move |tree, nodes| {
                let (node, target) = (nodes[0], nodes[1]);
                let (old_parent, _) = tree.detach(node).ok_or(TilingError::MissingTarget)?;
                let parent = tree.parent(target).ok_or(TilingError::MissingTarget)?;
                let index = tree.index_in_parent(target).ok_or(TilingError::MissingTarget)?;
                let joins_parent = match tree.node(parent).map(Node::kind) {
                    Some(NodeKind::Stack(_)) => true,
                    Some(NodeKind::Split(split)) => split.orientation() == orientation,
                    _ => false,
                };
                if joins_parent {
                    tree.attach(parent, index + usize::from(after), node)?;
                } else {
                    let split = wrap(tree, target, NodeKind::split(orientation))?;
                    tree.attach(split, usize::from(after), node)?;
                }
                tree.cleanup(old_parent);
                tree.remove_placeholders();
                Ok(())
            },
            move |tree, nodes, _| tree.node(nodes[0]).is_some_and(|n| n.rect().contains(point)),
        )
    }

    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        let tree = &*self.tree;
        if a == b {
            return Ok(());
        }
        if (tree.has_stack_ancestor(a) && !is_window(tree, b))
            || (tree.has_stack_ancestor(b) && !is_window(tree, a))
        {
            return Err(TilingError::NestingInStackPanel);
        }
        self.commit(&[a, b], |tree, nodes| {
            tree.swap(nodes[0], nodes[1])?;
            tree.remove_placeholders();
            Ok(())
        })
    }

    /// Moves `node` next to `target`, before it or after it.
    pub fn move_beside(&mut self, node: NodeId, target: NodeId, after: bool) -> Result<()> {
        let tree = &*self.tree;
        if node == tree.root() || target == tree.root() {
            return Err(TilingError::ModifiesTopLevelPanel);
        }
        if node == target {
            return Ok(());
        }
        if !tree.is_attached(node) || !tree.is_attached(target) {
            return Err(TilingError::MissingTarget);
        }
        if tree.is_within(target, node) {
            return Err(TilingError::CausesRecursiveNesting);
        }
        if tree.has_stack_ancestor(target) && !is_window(tree, node) {
            return Err(TilingError::NestingInStackPanel);
        }
        self.commit(&[node, target], |tree, nodes| {
            let (node, target) = (nodes[0], nodes[1]);
            let (old_parent, _) = tree.detach(node).ok_or(TilingError::MissingTarget)?;
            let parent = tree.parent(target).ok_or(TilingError::MissingTarget)?;
            let index = tree.index_in_parent(target).ok_or(TilingError::MissingTarget)?;
            tree.attach(parent, index + usize::from(after), node)?;
            tree.cleanup(old_parent);
            tree.remove_placeholders();
            Ok(())
        })
    }

    /// The visible window closest to `from` in `direction` that overlaps it
    /// on the other axis.
    pub fn adjacent(&self, from: NodeId, direction: Direction) -> Option<NodeId> {
        let tree = &*self.tree;
        let rect = tree.node(from)?.rect();
        let axis = direction.orientation();
        let across = axis.flip();
        tree.visible_windows()
            .into_iter()
            .filter(|&c| !tree.is_within(c, from))
            .filter_map(|c| {
                let r = tree.node(c)?.rect();
                let gap = if direction.is_forward() {
                    r.start(axis) - rect.end(axis)
                } else {
                    rect.start(axis) - r.end(axis)
                };
                let shared = overlap(
                    (r.start(across), r.end(across)),
                    (rect.start(across), rect.end(across)),
                );
                (gap >= 0 && shared > 0).then_some((gap, -shared, c))
            })
            .min_by_key(|&(gap, shared, _)| (gap, shared))
            .map(|(_, _, c)| c)
    }

    pub fn move_in_direction(&mut self, node: NodeId, direction: Direction) -> Result<()> {
        let neighbour = self.adjacent(node, direction).ok_or(TilingError::MissingAdjacentWindow)?;
        self.swap(node, neighbour)
    }

    /// Applies an observed frame change of `node` to the split ancestors
    /// that own the moved edges.
    #[instrument(skip(self))]
    pub fn resize(&mut self, node: NodeId, new: Rect, old: Rect) -> Result<()> {
        let tree = &*self.tree;
        let edges = ResizeEdges::between(old, new);
        if edges.is_empty() || new.size() == old.size() {
            return Ok(());
        }

        let mut branches = Vec::new();
        let mut plans = Vec::new();
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let Some(direction) = edges.direction(orientation) else {
                continue;
            };
            let delta = new.extent(orientation) - old.extent(orientation);
            if delta == 0 {
                continue;
            }
            let mut branch = node;
            for ancestor in tree.ancestors(node) {
                let Some(NodeKind::Split(split)) = tree.node(ancestor).map(Node::kind) else {
                    branch = ancestor;
                    continue;
                };
                if split.orientation() != orientation {
                    branch = ancestor;
                    continue;
                }
                let index = tree.index_in_parent(branch).unwrap_or(0);
                let has_before = index > 0;
                let has_after = index + 1 < tree.children(ancestor).len();
                let usable = match (direction, has_before, has_after) {
                    (ResizeDirection::Both, true, true) => Some(ResizeDirection::Both),
                    (ResizeDirection::Both | ResizeDirection::TowardsStart, true, _) => {
                        Some(ResizeDirection::TowardsStart)
                    }
                    (ResizeDirection::Both | ResizeDirection::TowardsEnd, _, true) => {
                        Some(ResizeDirection::TowardsEnd)
                    }
                    _ => None,
                };
                if let Some(usable) = usable {
                    branches.push(branch);
                    plans.push((usable, f64::from(delta)));
                    break;
                }
                branch = ancestor;
            }
        }

        if branches.is_empty() {
            return Err(TilingError::MissingAdjacentWindow);
        }
        self.commit(&branches, |tree, nodes| {
            for (&branch, &(direction, delta)) in nodes.iter().zip(&plans) {
                let current = tree.slot_length(branch).ok_or(TilingError::MissingTarget)?;
                tree.resize_child(branch, current + delta, direction);
            }
            Ok(())
        })
    }
}
