//! The tiling workspace: one layout tree per desktop plus the editing
//! operations the window manager drives it with.

mod editor;
mod moves;
mod placement;

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use self::editor::Editor;
use super::error::{Result, TilingError};
use super::layout::{LayoutFunction, Spacing};
use super::resize::ResizeDelta;
use super::{Direction, Orientation};
use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::model::desktop::DesktopTree;
use crate::model::tree::{NodeId, NodeKind};
use crate::sys::geometry::{Point, Rect};
use crate::sys::window::{DesktopId, WindowId, WindowSource};

#[derive(Clone, Debug)]
pub struct DesktopState {
    tree: DesktopTree,
    focus: Option<NodeId>,
}

impl DesktopState {
    fn new(tree: DesktopTree) -> Self { Self { tree, focus: None } }

    pub fn tree(&self) -> &DesktopTree { &self.tree }

    pub fn focus(&self) -> Option<NodeId> { self.focus }

    /// Drops the focus if its node was removed by an edit.
    fn validate_focus(&mut self) {
        if self.focus.is_some_and(|f| !self.tree.contains(f) || !self.tree.is_attached(f)) {
            self.focus = None;
        }
    }
}

/// Owns the layout trees of all desktops.
///
/// Every editing operation either completes, leaving the desktop laid out,
/// or fails with a [`TilingError`] leaving the desktop exactly as it was.
pub struct TilingWorkspace<S> {
    desktops: HashMap<DesktopId, DesktopState>,
    source: S,
    settings: Settings,
}

impl<S: WindowSource> TilingWorkspace<S> {
    pub fn new(source: S, settings: Settings) -> Self {
        Self {
            desktops: HashMap::default(),
            source,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    /// Replaces the settings and lays every desktop out again with the new
    /// spacing. Desktops that no longer fit keep their previous geometry.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        let spacing = Spacing::from_settings(&self.settings);
        for (id, state) in self.desktops.iter_mut() {
            state.tree.set_spacing(spacing);
            if let Err(err) = state.tree.layout(&self.source) {
                warn!(desktop = %id, ?err, "desktop does not fit after settings change");
            }
        }
    }

    pub fn source(&self) -> &S { &self.source }

    /// Gives access to the window source, e.g. to record new minimum sizes.
    /// Call [`relayout`](Self::relayout) afterwards to apply them.
    pub fn source_mut(&mut self) -> &mut S { &mut self.source }

    pub fn desktops(&self) -> impl Iterator<Item = DesktopId> + '_ { self.desktops.keys().copied() }

    pub fn desktop(&self, desktop: DesktopId) -> Option<&DesktopState> { self.desktops.get(&desktop) }

    /// Adds a desktop whose root is a split of `orientation`. Returns false
    /// if the desktop already exists, in which case it is left alone.
    pub fn register_desktop(
        &mut self,
        desktop: DesktopId,
        orientation: Orientation,
        work_area: Rect,
    ) -> bool {
        self.register_desktop_with_tree(desktop, DesktopTree::with_split(orientation, work_area))
    }

    /// Adds a desktop whose root arranges its children with `function`.
    pub fn register_desktop_with_layout(
        &mut self,
        desktop: DesktopId,
        function: Arc<dyn LayoutFunction + Send + Sync>,
        work_area: Rect,
    ) -> bool {
        let tree = DesktopTree::new(NodeKind::with_layout(function), work_area);
        self.register_desktop_with_tree(desktop, tree)
    }

    /// Adopts a prebuilt tree, e.g. one restored by the caller. Windows that
    /// are already managed on another desktop make the call fail.
    pub fn register_desktop_with_tree(&mut self, desktop: DesktopId, mut tree: DesktopTree) -> bool {
        if self.desktops.contains_key(&desktop) {
            debug!(%desktop, "desktop already registered");
            return false;
        }
        if tree.windows().into_iter().any(|w| self.has_window(w)) {
            warn!(%desktop, "tree contains windows managed elsewhere");
            return false;
        }
        tree.set_spacing(Spacing::from_settings(&self.settings));
        if let Err(err) = tree.layout(&self.source) {
            warn!(%desktop, ?err, "new desktop does not fit its work area");
        }
        self.desktops.insert(desktop, DesktopState::new(tree));
        true
    }

    /// Removes a desktop and returns the windows that were on it.
    pub fn unregister_desktop(&mut self, desktop: DesktopId) -> Result<Vec<WindowId>> {
        let state = self.desktops.remove(&desktop).ok_or(TilingError::UnknownDesktop(desktop))?;
        Ok(state.tree.windows())
    }

    pub fn set_work_area(&mut self, desktop: DesktopId, work_area: Rect) -> Result<()> {
        let state = self.desktops.get_mut(&desktop).ok_or(TilingError::UnknownDesktop(desktop))?;
        let previous = state.tree.work_area();
        state.tree.set_work_area(work_area);
        if let Err(err) = state.tree.layout(&self.source) {
            state.tree.set_work_area(previous);
            return Err(err);
        }
        Ok(())
    }

    /// Measures the desktop again, picking up changed window sizes, and
    /// arranges it. On failure the previous arrangement is kept and the
    /// caller is expected to take a window out of the tree.
    pub fn relayout(&mut self, desktop: DesktopId) -> Result<()> {
        let state = self.desktops.get_mut(&desktop).ok_or(TilingError::UnknownDesktop(desktop))?;
        state.tree.layout(&self.source)
    }

    pub fn get_tree(&self, desktop: DesktopId) -> Option<&DesktopTree> {
        self.desktops.get(&desktop).map(DesktopState::tree)
    }

    pub fn frames(&self, desktop: DesktopId) -> Result<Vec<(WindowId, Rect)>> {
        Ok(self.state(desktop)?.tree.frames())
    }

    pub fn visible_frames(&self, desktop: DesktopId) -> Result<Vec<(WindowId, Rect)>> {
        Ok(self.state(desktop)?.tree.visible_frames())
    }

    pub fn draw_tree(&self, desktop: DesktopId) -> Result<String> {
        Ok(self.state(desktop)?.tree.draw_tree())
    }

    pub fn has_window(&self, window: WindowId) -> bool { self.find_window(window).is_some() }

    pub fn find_window(&self, window: WindowId) -> Option<(DesktopId, NodeId)> {
        self.desktops
            .iter()
            .find_map(|(&id, state)| state.tree.find_window(window).map(|node| (id, node)))
    }

    /// Places `window` on `desktop` next to `anchor`, or next to the focused
    /// node when no anchor is given, and focuses it.
    ///
    /// Fails with [`TilingError::NoValidPlacement`] when the window fits
    /// nowhere; the caller should then float it.
    #[instrument(skip(self))]
    pub fn register_window(
        &mut self,
        desktop: DesktopId,
        window: WindowId,
        anchor: Option<WindowId>,
    ) -> Result<NodeId> {
        if self.has_window(window) {
            return Err(TilingError::AlreadyRegistered(window));
        }
        let state = self.state(desktop)?;
        let anchor = anchor.and_then(|w| state.tree.find_window(w)).or(state.focus);
        let leaf = self.edit(desktop, |editor| editor.register(window, anchor))?;
        self.set_focus(desktop, leaf)?;
        Ok(leaf)
    }

    #[instrument(skip(self))]
    pub fn unregister_window(&mut self, window: WindowId) -> Result<()> {
        let (desktop, node) = self.find_window(window).ok_or(TilingError::MissingTarget)?;
        let state = self.desktops.get_mut(&desktop).ok_or(TilingError::UnknownDesktop(desktop))?;
        if let Some((parent, _)) = state.tree.detach(node) {
            state.tree.destroy(node);
            state.tree.cleanup(parent);
        }
        state.tree.remove_placeholders();
        state.validate_focus();
        if let Err(err) = state.tree.layout(&self.source) {
            warn!(?err, "desktop still does not fit after removing a window");
        }
        Ok(())
    }

    pub fn wrap_in_split(
        &mut self,
        desktop: DesktopId,
        node: NodeId,
        orientation: Orientation,
    ) -> Result<NodeId> {
        self.edit(desktop, |editor| editor.wrap_in_split(node, orientation))
    }

    pub fn wrap_in_stack(&mut self, desktop: DesktopId, node: NodeId) -> Result<NodeId> {
        self.edit(desktop, |editor| editor.wrap_in_stack(node))
    }

    #[instrument(skip(self))]
    pub fn pull_up(&mut self, desktop: DesktopId, node: NodeId) -> Result<()> {
        self.edit(desktop, |editor| editor.pull_up(node))
    }

    pub fn move_node(
        &mut self,
        desktop: DesktopId,
        node: NodeId,
        point: Point,
        allow_nesting: bool,
    ) -> Result<()> {
        self.edit(desktop, |editor| editor.move_node(node, point, allow_nesting))
    }

    pub fn move_window(&mut self, window: WindowId, point: Point, allow_nesting: bool) -> Result<()> {
        let (desktop, node) = self.find_window(window).ok_or(TilingError::MissingTarget)?;
        self.move_node(desktop, node, point, allow_nesting)
    }

    pub fn move_before(&mut self, desktop: DesktopId, node: NodeId, target: NodeId) -> Result<()> {
        self.edit(desktop, |editor| editor.move_beside(node, target, false))
    }

    pub fn move_after(&mut self, desktop: DesktopId, node: NodeId, target: NodeId) -> Result<()> {
        self.edit(desktop, |editor| editor.move_beside(node, target, true))
    }

    pub fn swap_nodes(&mut self, desktop: DesktopId, a: NodeId, b: NodeId) -> Result<()> {
        self.edit(desktop, |editor| editor.swap(a, b))
    }

    /// Where `node` would end up if it were moved to `point`, without
    /// changing anything.
    pub fn mock_move_node(
        &self,
        desktop: DesktopId,
        node: NodeId,
        point: Point,
        allow_nesting: bool,
    ) -> Result<Rect> {
        let mut tree = self.state(desktop)?.tree.clone();
        let mut editor = Editor {
            tree: &mut tree,
            source: &self.source,
            settings: &self.settings,
        };
        editor.move_node(node, point, allow_nesting)?;
        tree.node(node).map(|n| n.content_rect()).ok_or(TilingError::MissingTarget)
    }

    pub fn mock_move_window(
        &self,
        window: WindowId,
        point: Point,
        allow_nesting: bool,
    ) -> Result<Rect> {
        let (desktop, node) = self.find_window(window).ok_or(TilingError::MissingTarget)?;
        self.mock_move_node(desktop, node, point, allow_nesting)
    }

    /// Applies a frame change the user made to `window` (e.g. by dragging
    /// one of its edges) to the layout.
    #[instrument(skip(self))]
    pub fn resize_window(&mut self, window: WindowId, new_rect: Rect, old_rect: Rect) -> Result<()> {
        let (desktop, node) = self.find_window(window).ok_or(TilingError::MissingTarget)?;
        self.edit(desktop, |editor| editor.resize(node, new_rect, old_rect))
    }

    /// Resizes `window` by moving its right and bottom edges.
    pub fn resize_window_by(&mut self, window: WindowId, delta: ResizeDelta) -> Result<()> {
        let (desktop, node) = self.find_window(window).ok_or(TilingError::MissingTarget)?;
        let tree = &self.state(desktop)?.tree;
        let old = tree.node(node).map(|n| n.content_rect()).ok_or(TilingError::MissingTarget)?;
        let new = delta.apply(old, tree.work_area());
        self.resize_window(window, new, old)
    }

    pub fn node_at_point(&self, desktop: DesktopId, point: Point) -> Option<NodeId> {
        self.desktops.get(&desktop)?.tree.node_at_point(point)
    }

    pub fn get_focus(&self, desktop: DesktopId) -> Option<NodeId> {
        self.desktops.get(&desktop)?.focus
    }

    /// Focuses `node`, making it the visible child of any stack it is in.
    pub fn set_focus(&mut self, desktop: DesktopId, node: NodeId) -> Result<()> {
        let state = self.state_mut(desktop)?;
        if !state.tree.contains(node) || !state.tree.is_attached(node) {
            return Err(TilingError::MissingTarget);
        }
        state.tree.activate(node);
        state.focus = Some(node);
        if let Err(err) = state.tree.arrange() {
            warn!(?err, "could not arrange after changing the active stack child");
        }
        Ok(())
    }

    pub fn unset_focus(&mut self, desktop: DesktopId) {
        if let Some(state) = self.desktops.get_mut(&desktop) {
            state.focus = None;
        }
    }

    pub fn focus_in_direction(&mut self, desktop: DesktopId, direction: Direction) -> Result<NodeId> {
        let focus = self.get_focus(desktop).ok_or(TilingError::MissingTarget)?;
        let neighbour = self
            .edit(desktop, |editor| Ok(editor.adjacent(focus, direction)))?
            .ok_or(TilingError::MissingAdjacentWindow)?;
        self.set_focus(desktop, neighbour)?;
        Ok(neighbour)
    }

    pub fn move_in_direction(&mut self, desktop: DesktopId, direction: Direction) -> Result<()> {
        let focus = self.get_focus(desktop).ok_or(TilingError::MissingTarget)?;
        self.edit(desktop, |editor| editor.move_in_direction(focus, direction))
    }

    /// Reserves a slot next to `anchor` for a drag preview. Any other
    /// placeholder on the desktop is removed.
    pub fn insert_placeholder(
        &mut self,
        desktop: DesktopId,
        anchor: NodeId,
        after: bool,
    ) -> Result<NodeId> {
        self.edit(desktop, |editor| editor.insert_placeholder(anchor, after))
    }

    pub fn clear_placeholders(&mut self, desktop: DesktopId) -> Result<bool> {
        let state = self.desktops.get_mut(&desktop).ok_or(TilingError::UnknownDesktop(desktop))?;
        let removed = state.tree.remove_placeholders();
        state.validate_focus();
        if removed {
            state.tree.layout(&self.source)?;
        }
        Ok(removed)
    }

    fn state(&self, desktop: DesktopId) -> Result<&DesktopState> {
        self.desktops.get(&desktop).ok_or(TilingError::UnknownDesktop(desktop))
    }

    fn state_mut(&mut self, desktop: DesktopId) -> Result<&mut DesktopState> {
        self.desktops.get_mut(&desktop).ok_or(TilingError::UnknownDesktop(desktop))
    }

    fn edit<T>(
        &mut self,
        desktop: DesktopId,
        f: impl FnOnce(&mut Editor<'_, S>) -> Result<T>,
    ) -> Result<T> {
        let state = self.desktops.get_mut(&desktop).ok_or(TilingError::UnknownDesktop(desktop))?;
        let mut editor = Editor {
            tree: &mut state.tree,
            source: &self.source,
            settings: &self.settings,
        };
        let result = f(&mut editor);
        state.validate_focus();
        result
    }
}
