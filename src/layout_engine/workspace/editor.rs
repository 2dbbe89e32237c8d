use tracing::{debug, trace, warn};

use crate::common::config::Settings;
use crate::layout_engine::error::{Result, TilingError};
use crate::layout_engine::{NodeKindTag, Orientation};
use crate::model::desktop::DesktopTree;
use crate::model::tree::{NodeId, NodeKind};
use crate::sys::window::WindowSource;

/// Structural edits on one desktop tree.
///
/// Every edit goes through [`speculate`](Editor::speculate): it is first
/// applied to a clone of the tree, the clone is laid out and checked, and
/// only then is the same edit replayed on the real tree.
pub(crate) struct Editor<'a, S> {
    pub tree: &'a mut DesktopTree,
    pub source: &'a S,
    pub settings: &'a Settings,
}

impl<S: WindowSource> Editor<'_, S> {
    /// Runs `edit` on a clone of the tree, lays the clone out and checks the
    /// result with `check`. If everything succeeds the edit is replayed on
    /// the real tree.
    ///
    /// `nodes` are handed to `edit` translated to the tree it runs on. A
    /// failing `check` is reported as [`TilingError::TargetCannotFit`].
    pub fn speculate<T>(
        &mut self,
        nodes: &[NodeId],
        edit: impl Fn(&mut DesktopTree, &[NodeId]) -> Result<T>,
        check: impl Fn(&DesktopTree, &[NodeId], &T) -> bool,
    ) -> Result<T> {
        let generations = nodes
            .iter()
            .map(|&n| self.tree.generation(n).ok_or(TilingError::MissingTarget))
            .collect::<Result<Vec<_>>>()?;

        let mut trial = self.tree.clone();
        let located = generations
            .iter()
            .map(|&g| trial.locate(g).ok_or(TilingError::MissingTarget))
            .collect::<Result<Vec<_>>>()?;
        let value = edit(&mut trial, &located)?;
        if let Err(err) = trial.layout(self.source) {
            trace!(?err, "trial layout failed");
            return Err(err);
        }
        if !check(&trial, &located, &value) {
            trace!("trial rejected by check");
            return Err(TilingError::TargetCannotFit);
        }

        let replayed = edit(self.tree, nodes)
            .and_then(|value| self.tree.layout(self.source).map(|()| value));
        match replayed {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(?err, "replay diverged from trial, keeping the trial tree");
                *self.tree = trial;
                Ok(value)
            }
        }
    }

    /// [`speculate`](Self::speculate) without a geometric check.
    pub fn commit<T>(
        &mut self,
        nodes: &[NodeId],
        edit: impl Fn(&mut DesktopTree, &[NodeId]) -> Result<T>,
    ) -> Result<T> {
        self.speculate(nodes, edit, |_, _, _| true)
    }

    pub fn wrap_in_split(&mut self, node: NodeId, orientation: Orientation) -> Result<NodeId> {
        self.check_wrap(node, false)?;
        self.commit(&[node], |tree, nodes| {
            let split = wrap(tree, nodes[0], NodeKind::split(orientation))?;
            tree.remove_placeholders();
            Ok(split)
        })
    }

    pub fn wrap_in_stack(&mut self, node: NodeId) -> Result<NodeId> {
        self.check_wrap(node, true)?;
        self.commit(&[node], |tree, nodes| {
            let stack = wrap(tree, nodes[0], NodeKind::stack())?;
            tree.remove_placeholders();
            Ok(stack)
        })
    }

    fn check_wrap(&self, node: NodeId, into_stack: bool) -> Result<()> {
        let tree = &*self.tree;
        if node == tree.root() {
            return Err(TilingError::ModifiesTopLevelPanel);
        }
        if !tree.is_attached(node) {
            return Err(TilingError::MissingTarget);
        }
        if into_stack && tree.tag(node) != Some(NodeKindTag::Window) {
            return Err(TilingError::NestingInStackPanel);
        }
        if tree.has_stack_ancestor(node) {
            return Err(TilingError::NestingInStackPanel);
        }
        Ok(())
    }

    /// Moves `node` up into the nearest ancestor above its parent that can
    /// hold it, right after the branch it came from.
    pub fn pull_up(&mut self, node: NodeId) -> Result<()> {
        let tree = &*self.tree;
        if node == tree.root() {
            return Err(TilingError::ModifiesTopLevelPanel);
        }
        let parent = tree.parent(node).ok_or(TilingError::MissingTarget)?;
        if parent == tree.root() {
            return Err(TilingError::PullsBeyondTopLevelPanel);
        }

        let mut branch = parent;
        let mut candidates = Vec::new();
        for ancestor in tree.ancestors(parent) {
            candidates.push((ancestor, branch));
            branch = ancestor;
        }

        let root = tree.root();
        for (ancestor, branch) in candidates {
            if self.tree.tag(ancestor) == Some(NodeKindTag::Stack) {
                continue;
            }
            if ancestor == root && !self.settings.allow_pull_to_root {
                debug!(?node, "only the root is left and pulling into it is disabled");
                return Err(TilingError::PullsBeyondTopLevelPanel);
            }
            let result = self.commit(&[node, ancestor, branch], |tree, nodes| {
                let (node, ancestor, branch) = (nodes[0], nodes[1], nodes[2]);
                let (old_parent, _) = tree.detach(node).ok_or(TilingError::MissingTarget)?;
                let index = tree.index_in_parent(branch).ok_or(TilingError::MissingTarget)?;
                tree.attach(ancestor, index + 1, node)?;
                tree.cleanup(old_parent);
                tree.remove_placeholders();
                Ok(())
            });
            match result {
                Ok(()) => return Ok(()),
                Err(
                    err @ (TilingError::UnsatisfiableConstraints | TilingError::TargetCannotFit),
                ) => {
                    debug!(?ancestor, ?err, "pull-up target rejected");
                }
                Err(err) => return Err(err),
            }
        }
        Err(TilingError::TargetCannotFit)
    }

    pub fn insert_placeholder(&mut self, anchor: NodeId, after: bool) -> Result<NodeId> {
        let tree = &*self.tree;
        if !tree.is_attached(anchor) {
            return Err(TilingError::MissingTarget);
        }
        if tree.has_stack_ancestor(anchor) {
            return Err(TilingError::NestingInStackPanel);
        }
        self.commit(&[anchor], |tree, nodes| {
            let anchor = nodes[0];
            tree.remove_placeholders();
            if !tree.contains(anchor) {
                return Err(TilingError::MissingTarget);
            }
            let (parent, index) = match tree.parent(anchor) {
                Some(parent) => {
                    let index = tree.index_in_parent(anchor).ok_or(TilingError::MissingTarget)?;
                    (parent, index + usize::from(after))
                }
                None => (anchor, if after { tree.children(anchor).len() } else { 0 }),
            };
            let hole = tree.create(NodeKind::Placeholder);
            tree.attach(parent, index, hole)?;
            Ok(hole)
        })
    }
}

/// Puts `node` into a new container of `kind` that takes over its slot.
///
/// When `node` is the only child of a non-root panel the new container
/// takes over that panel's slot instead, so wrapping never produces two
/// single-child panels in a row.
pub(crate) fn wrap(tree: &mut DesktopTree, node: NodeId, kind: NodeKind) -> Result<NodeId> {
    let parent = tree.parent(node).ok_or(TilingError::ModifiesTopLevelPanel)?;
    let container = tree.create(kind);
    if parent != tree.root() && tree.children(parent).len() == 1 {
        tree.replace(parent, container)?;
        tree.detach(node);
        tree.attach(container, 0, node)?;
        tree.destroy(parent);
        debug!(?node, ?container, "replaced lone-child panel");
    } else {
        tree.replace(node, container)?;
        tree.attach(container, 0, node)?;
    }
    Ok(container)
}
