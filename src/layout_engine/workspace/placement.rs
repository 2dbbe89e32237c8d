use tracing::{debug, instrument};

use super::editor::{Editor, wrap};
use crate::layout_engine::NodeKindTag;
use crate::layout_engine::error::{Result, TilingError};
use crate::model::desktop::DesktopTree;
use crate::model::tree::{NodeId, NodeKind};
use crate::sys::window::{WindowId, WindowSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    /// Nest the reference node in a split oriented against its full parent.
    SplitReference,
    /// Insert next to the reference node.
    Insert,
    /// Stack with the reference window.
    Stack,
}

/// The node a new window is placed relative to: the anchor if there is one,
/// otherwise the last child of the root. Windows inside a stack are
/// represented by the stack itself.
fn reference(tree: &DesktopTree, anchor: Option<NodeId>) -> Option<NodeId> {
    let root = tree.root();
    let node = anchor
        .filter(|&n| n != root && tree.is_attached(n))
        .or_else(|| tree.children(root).last().copied())?;
    match tree.parent(node) {
        Some(parent) if tree.tag(parent) == Some(NodeKindTag::Stack) => Some(parent),
        _ => Some(node),
    }
}

/// Panel and index a new window goes to when inserted after `reference`.
fn slot(tree: &DesktopTree, reference: Option<NodeId>) -> (NodeId, usize) {
    reference
        .and_then(|r| Some((tree.parent(r)?, tree.index_in_parent(r)? + 1)))
        .unwrap_or((tree.root(), tree.children(tree.root()).len()))
}

fn place(
    tree: &mut DesktopTree,
    window: WindowId,
    anchor: Option<NodeId>,
    strategy: Strategy,
) -> Result<NodeId> {
    tree.remove_placeholders();
    let reference = reference(tree, anchor);
    let leaf = tree.create(NodeKind::Window(window));
    match strategy {
        Strategy::SplitReference => {
            let reference = reference.ok_or(TilingError::MissingTarget)?;
            let parent = tree.parent(reference).ok_or(TilingError::MissingTarget)?;
            let Some(NodeKind::Split(split)) = tree.node(parent).map(|n| n.kind()) else {
                return Err(TilingError::MissingTarget);
            };
            let orientation = split.orientation().flip();
            let split = wrap(tree, reference, NodeKind::split(orientation))?;
            tree.attach(split, 1, leaf)?;
        }
        Strategy::Insert => {
            let (parent, index) = slot(tree, reference);
            tree.attach(parent, index, leaf)?;
        }
        Strategy::Stack => {
            let reference = reference.ok_or(TilingError::MissingTarget)?;
            match tree.tag(reference) {
                Some(NodeKindTag::Stack) => {
                    let index = tree.children(reference).len();
                    tree.attach(reference, index, leaf)?;
                }
                Some(NodeKindTag::Window) => {
                    let stack = wrap(tree, reference, NodeKind::stack())?;
                    tree.attach(stack, 1, leaf)?;
                }
                _ => return Err(TilingError::NoValidPlacement),
            }
        }
    }
    Ok(leaf)
}

impl<S: WindowSource> Editor<'_, S> {
    /// Finds a place for `window` next to `anchor` (or at the end of the
    /// root) and inserts it there.
    ///
    /// Each strategy is validated on a clone of the tree. A panel below
    /// `max_panel_children` gets a plain insert, a full one gets the
    /// reference wrapped in a split. Stacking with the reference window is
    /// the fallback for both.
    #[instrument(skip(self))]
    pub fn register(&mut self, window: WindowId, anchor: Option<NodeId>) -> Result<NodeId> {
        let tree = &*self.tree;
        let reference_node = reference(tree, anchor);
        let (target, _) = slot(tree, reference_node);
        let full = tree.children(target).len() >= self.settings.max_panel_children
            && tree.tag(target) == Some(NodeKindTag::Split)
            && reference_node.is_some();

        let strategies = if full {
            [Strategy::SplitReference, Strategy::Stack]
        } else {
            [Strategy::Insert, Strategy::Stack]
        };

        let anchors: Vec<NodeId> = anchor.into_iter().collect();
        for strategy in strategies {
            let result = self.commit(&anchors, |tree, nodes| {
                place(tree, window, nodes.first().copied(), strategy)
            });
            match result {
                Ok(leaf) => {
                    debug!(?window, ?strategy, "placed window");
                    return Ok(leaf);
                }
                Err(TilingError::AlreadyRegistered(window)) => {
                    return Err(TilingError::AlreadyRegistered(window));
                }
                Err(err) => debug!(?window, ?strategy, ?err, "placement strategy failed"),
            }
        }
        Err(TilingError::NoValidPlacement)
    }
}
