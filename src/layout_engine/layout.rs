//! Two-pass layout: `measure` bottom-up, then `arrange` top-down.
//!
//! Measuring records every node's minimum and maximum size (padding
//! included). Arranging hands each node a rectangle and lets its panel divide
//! the content area among the children. A split panel divides space with its
//! [`Flex`] solver, a stack gives every child the whole area and a static
//! panel asks its [`LayoutFunction`].
//!
//! Arrange is computed against scratch copies of the split panels' solvers
//! and only written back once the whole tree has been arranged, so a failed
//! arrange leaves every node and solver as it was.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::{Result, TilingError};
use super::flex::Flex;
use super::graph::{Orientation, ResizeDirection};
use crate::common::config::Settings;
use crate::model::desktop::DesktopTree;
use crate::model::tree::{NodeId, NodeKind};
use crate::sys::geometry::{Rect, Round, Size, Thickness};
use crate::sys::window::WindowSource;

/// Sizing policy of a [`StaticPanel`](crate::model::tree::StaticPanel).
pub trait LayoutFunction {
    fn name(&self) -> &'static str;

    /// Minimum size of the panel's content given its children's minimums.
    fn measure(&self, children: &[Size]) -> Size;

    /// Rectangles for each child, in order. Must return one per child.
    fn arrange(&self, rect: Rect, children: &[Size]) -> Vec<Rect>;
}

/// Equal cells filled row by row. The last row stretches its cells when it
/// is not full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub columns: usize,
}

impl GridLayout {
    fn shape(&self, count: usize) -> (usize, usize) {
        let columns = self.columns.max(1).min(count.max(1));
        (columns, count.div_ceil(columns))
    }
}

impl LayoutFunction for GridLayout {
    fn name(&self) -> &'static str { "grid" }

    fn measure(&self, children: &[Size]) -> Size {
        if children.is_empty() {
            return Size::ZERO;
        }
        let (columns, rows) = self.shape(children.len());
        let cell = children.iter().fold(Size::ZERO, |acc, &s| acc.max(s));
        Size::new(
            cell.width.saturating_mul(columns as i32),
            cell.height.saturating_mul(rows as i32),
        )
    }

    fn arrange(&self, rect: Rect, children: &[Size]) -> Vec<Rect> {
        let (columns, rows) = self.shape(children.len());
        let area = rect.to_f64();
        let row_height = area.height() / rows as f64;
        let mut out = Vec::with_capacity(children.len());
        for row in 0..rows {
            let row_area = area.slice(Orientation::Vertical, row as f64 * row_height, row_height);
            let in_row = (children.len() - row * columns).min(columns);
            let cell_width = row_area.width() / in_row as f64;
            for col in 0..in_row {
                out.push(
                    row_area.slice(Orientation::Horizontal, col as f64 * cell_width, cell_width).round(),
                );
            }
        }
        out
    }
}

/// Padding the tree applies to its nodes on every measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacing {
    /// Around every window.
    pub window: Thickness,
    /// Added around windows that live in a stack.
    pub stack: Thickness,
    /// Around the root panel.
    pub root: Thickness,
}

impl Spacing {
    pub fn from_settings(settings: &Settings) -> Spacing {
        Spacing {
            window: settings.gaps.window_padding(),
            stack: Thickness::uniform(settings.stack.window_padding),
            root: settings.gaps.root_padding(),
        }
    }
}

fn flex_bound(value: i32) -> f64 {
    if value == i32::MAX { f64::INFINITY } else { f64::from(value) }
}

#[derive(Default)]
struct Arrangement {
    rects: Vec<(NodeId, Rect)>,
    flexes: Vec<(NodeId, Flex, Vec<bool>)>,
}

impl DesktopTree {
    /// Recomputes the minimum and maximum size of every node reachable from
    /// the root and returns the root's minimum size.
    pub fn measure(&mut self, source: &impl WindowSource) -> Size {
        self.apply_spacing();
        let root = self.root;
        self.measure_node(root, source).0
    }

    /// Arranges the tree inside the work area using the sizes of the last
    /// [`measure`](Self::measure).
    pub fn arrange(&mut self) -> Result<()> {
        let mut arrangement = Arrangement::default();
        self.arrange_node(self.root, self.work_area, &mut arrangement)?;

        for (id, rect) in arrangement.rects {
            self.nodes[id].rect = rect;
        }
        for (id, flex, synced) in arrangement.flexes {
            if let NodeKind::Split(split) = &mut self.nodes[id].kind {
                split.flex = flex;
                split.synced = synced;
            }
        }
        Ok(())
    }

    /// Measures and arranges the tree. On failure every node keeps the sizes
    /// and padding of the last successful layout.
    pub fn layout(&mut self, source: &impl WindowSource) -> Result<()> {
        let measured: Vec<(NodeId, Size, Size, Thickness)> = self
            .nodes
            .iter()
            .map(|(id, node)| (id, node.min_size, node.max_size, node.padding))
            .collect();
        self.measure(source);
        self.arrange().inspect_err(|_| {
            for (id, min, max, padding) in measured {
                let node = &mut self.nodes[id];
                node.min_size = min;
                node.max_size = max;
                node.padding = padding;
            }
        })
    }

    /// Resizes the slot of `child` in its split parent along the split's
    /// axis. Returns the resulting length, or `None` when the parent is not
    /// a split.
    pub fn resize_child(
        &mut self,
        child: NodeId,
        length: f64,
        direction: ResizeDirection,
    ) -> Option<f64> {
        let index = self.index_in_parent(child)?;
        let parent = self.parent(child)?;
        match &mut self.nodes[parent].kind {
            NodeKind::Split(split) => Some(split.flex.resize_item(index, length, direction)),
            _ => None,
        }
    }

    /// Current flex length of `child`'s slot in its split parent.
    pub fn slot_length(&self, child: NodeId) -> Option<f64> {
        let index = self.index_in_parent(child)?;
        match &self.nodes[self.parent(child)?].kind {
            NodeKind::Split(split) => split.flex.item(index).map(|item| item.length),
            _ => None,
        }
    }

    fn apply_spacing(&mut self) {
        let root = self.root;
        for id in self.descendants(root) {
            let in_stack = self
                .parent(id)
                .is_some_and(|p| matches!(self.nodes[p].kind, NodeKind::Stack(_)));
            let node = &mut self.nodes[id];
            node.padding = match node.kind {
                _ if id == root => self.spacing.root,
                NodeKind::Window(_) if in_stack => self.spacing.window.saturating_add(self.spacing.stack),
                NodeKind::Window(_) => self.spacing.window,
                _ => Thickness::ZERO,
            };
        }
    }

    fn measure_node(&mut self, id: NodeId, source: &impl WindowSource) -> (Size, Size) {
        let children = self.children(id).to_vec();
        let sizes: Vec<(Size, Size)> =
            children.iter().map(|&child| self.measure_node(child, source)).collect();
        let mins: Vec<Size> = sizes.iter().map(|s| s.0).collect();

        let node = &self.nodes[id];
        let (min, max) = match &node.kind {
            NodeKind::Window(window) => {
                let min = source.minimum_size(*window).unwrap_or(Size::ZERO).max(Size::ZERO);
                let max = source.maximum_size(*window).unwrap_or(Size::UNBOUNDED).max(min);
                (min, max)
            }
            NodeKind::Placeholder => (Size::ZERO, Size::UNBOUNDED),
            _ if children.is_empty() => (Size::ZERO, Size::UNBOUNDED),
            NodeKind::Split(split) => {
                let o = split.orientation;
                let min_along = mins.iter().fold(0i32, |acc, s| acc.saturating_add(s.along(o)));
                let min_across = mins.iter().map(|s| s.across(o)).max().unwrap_or(0);
                let max_along =
                    sizes.iter().fold(0i32, |acc, (_, max)| acc.saturating_add(max.along(o)));
                let max_across = sizes.iter().map(|(_, max)| max.across(o)).min().unwrap_or(i32::MAX);
                (
                    Size::from_axes(o, min_along, min_across),
                    Size::from_axes(o, max_along, max_across.max(min_across)),
                )
            }
            NodeKind::Stack(_) => {
                let min = mins.iter().fold(Size::ZERO, |acc, &s| acc.max(s));
                let max = sizes.iter().fold(Size::UNBOUNDED, |acc, &(_, s)| acc.min(s));
                (min, max.max(min))
            }
            NodeKind::Static(panel) => (panel.function.measure(&mins), Size::UNBOUNDED),
        };

        let padding = node.padding.size();
        let min = min.saturating_add(padding);
        let max = max.saturating_add(padding);
        let node = &mut self.nodes[id];
        node.min_size = min;
        node.max_size = max;
        (min, max)
    }

    fn arrange_node(&self, id: NodeId, rect: Rect, out: &mut Arrangement) -> Result<()> {
        let node = &self.nodes[id];
        if !node.min_size.fits_in(rect.size()) {
            trace!(?id, min = ?node.min_size, ?rect, "node does not fit its rectangle");
            return Err(TilingError::UnsatisfiableConstraints);
        }
        out.rects.push((id, rect));
        let content = rect.deflate(node.padding);

        match &node.kind {
            NodeKind::Split(split) => {
                let o = split.orientation;
                let bounds: Vec<(f64, f64)> = split
                    .children
                    .iter()
                    .map(|&c| {
                        let child = &self.nodes[c];
                        (f64::from(child.min_size.along(o)), flex_bound(child.max_size.along(o)))
                    })
                    .collect();
                let length = f64::from(content.extent(o));
                let (flex, synced) = sync_flex(&split.flex, &split.synced, &bounds, length)?;

                let area = content.to_f64();
                let mut offset = 0.0;
                let slots: Vec<(NodeId, f64)> =
                    split.children.iter().copied().zip(flex.lengths()).collect();
                out.flexes.push((id, flex, synced));
                for (child, length) in slots {
                    let child_rect = area.slice(o, offset, length).round();
                    offset += length;
                    self.arrange_node(child, child_rect, out)?;
                }
            }
            NodeKind::Stack(stack) => {
                for &child in &stack.children {
                    self.arrange_node(child, content, out)?;
                }
            }
            NodeKind::Static(panel) => {
                let mins: Vec<Size> = panel.children.iter().map(|&c| self.nodes[c].min_size).collect();
                let rects = panel.function.arrange(content, &mins);
                if rects.len() != panel.children.len() {
                    debug!(
                        function = panel.function.name(),
                        expected = panel.children.len(),
                        got = rects.len(),
                        "layout function returned the wrong number of rectangles"
                    );
                    return Err(TilingError::UnsatisfiableConstraints);
                }
                for (&child, child_rect) in panel.children.iter().zip(rects) {
                    self.arrange_node(child, child_rect, out)?;
                }
            }
            NodeKind::Window(_) | NodeKind::Placeholder => {}
        }
        Ok(())
    }
}

/// Brings a copy of `flex` up to date with the children's bounds and the
/// new container length.
///
/// A child seen for the first time gets its item removed and re-inserted
/// with its real bounds; known children have their constraints updated.
/// Shrinking the container and raising minimums can conflict depending on
/// the order they are applied in, so both orders are tried.
fn sync_flex(
    flex: &Flex,
    synced: &[bool],
    bounds: &[(f64, f64)],
    length: f64,
) -> Result<(Flex, Vec<bool>)> {
    let apply_bounds = |flex: &mut Flex, synced: &mut Vec<bool>| -> Result<()> {
        for (index, &(min, max)) in bounds.iter().enumerate() {
            if synced[index] {
                flex.update_constraints(index, min, max)?;
            } else {
                flex.remove(index);
                flex.insert(index, min, max)?;
                synced[index] = true;
            }
        }
        Ok(())
    };

    let mut first = flex.clone();
    let mut first_synced = synced.to_vec();
    let container_first = first
        .set_container_length(length)
        .map_err(TilingError::from)
        .and_then(|()| apply_bounds(&mut first, &mut first_synced));
    if container_first.is_ok() {
        return Ok((first, first_synced));
    }

    let mut second = flex.clone();
    let mut second_synced = synced.to_vec();
    apply_bounds(&mut second, &mut second_synced)?;
    second.set_container_length(length)?;
    debug!("synced flex by applying bounds before the container length");
    Ok((second, second_synced))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::sys::window::{RecordedSizes, Unconstrained, WindowId};

    fn w(idx: u32) -> WindowId { WindowId::new(1, idx) }

    fn add_window(tree: &mut DesktopTree, parent: NodeId, window: WindowId) -> NodeId {
        let node = tree.create(NodeKind::Window(window));
        let index = tree.children(parent).len();
        tree.attach(parent, index, node).unwrap();
        node
    }

    fn rect_of(tree: &DesktopTree, id: NodeId) -> Rect { tree.node(id).unwrap().rect() }

    #[test]
    fn split_divides_work_area_evenly() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 900, 600));
        let root = tree.root();
        let nodes: Vec<_> = (1..=3).map(|i| add_window(&mut tree, root, w(i))).collect();
        tree.layout(&Unconstrained).unwrap();

        let rects: Vec<_> = nodes.iter().map(|&n| rect_of(&tree, n)).collect();
        assert_eq!(
            rects,
            vec![
                Rect::from_xywh(0, 0, 300, 600),
                Rect::from_xywh(300, 0, 300, 600),
                Rect::from_xywh(600, 0, 300, 600),
            ]
        );
    }

    #[test]
    fn half_screen_minimums_leave_no_room_for_a_third_window() {
        let mut tree =
            DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 1920, 1080));
        let root = tree.root();
        let sizes: RecordedSizes = (1..=3).map(|i| (w(i), Size::new(960, 540))).collect();

        add_window(&mut tree, root, w(1));
        add_window(&mut tree, root, w(2));
        tree.layout(&sizes).unwrap();
        let frames = tree.frames();
        assert_eq!(frames[1].1, Rect::from_xywh(960, 0, 960, 1080));

        add_window(&mut tree, root, w(3));
        assert_eq!(tree.layout(&sizes), Err(TilingError::UnsatisfiableConstraints));
        assert_eq!(tree.frames()[..2], frames[..]);
    }

    #[test]
    fn measure_sums_along_and_maxes_across() {
        let mut tree = DesktopTree::with_split(Orientation::Vertical, Rect::from_xywh(0, 0, 800, 800));
        let root = tree.root();
        add_window(&mut tree, root, w(1));
        let row = tree.create(NodeKind::split(Orientation::Horizontal));
        tree.attach(root, 1, row).unwrap();
        add_window(&mut tree, row, w(2));
        add_window(&mut tree, row, w(3));

        let mut sizes = RecordedSizes::new();
        sizes.set_minimum(w(1), Size::new(300, 100));
        sizes.set_minimum(w(2), Size::new(200, 150));
        sizes.set_minimum(w(3), Size::new(250, 50));

        assert_eq!(tree.measure(&sizes), Size::new(450, 250));
        assert_eq!(tree.node(row).unwrap().min_size(), Size::new(450, 150));
    }

    #[test]
    fn cross_axis_minimum_is_enforced() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 800, 400));
        let root = tree.root();
        add_window(&mut tree, root, w(1));
        let mut sizes = RecordedSizes::new();
        sizes.set_minimum(w(1), Size::new(100, 500));
        assert_eq!(tree.layout(&sizes), Err(TilingError::UnsatisfiableConstraints));
    }

    #[test]
    fn maximums_leave_split_underfull() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 1000, 400));
        let root = tree.root();
        let a = add_window(&mut tree, root, w(1));
        let b = add_window(&mut tree, root, w(2));
        let mut sizes = RecordedSizes::new();
        sizes.set_maximum(w(1), Size::new(200, 400));
        sizes.set_maximum(w(2), Size::new(300, 400));
        tree.layout(&sizes).unwrap();

        assert_eq!(rect_of(&tree, a), Rect::from_xywh(0, 0, 200, 400));
        assert_eq!(rect_of(&tree, b), Rect::from_xywh(200, 0, 300, 400));
    }

    #[test]
    fn stack_overlays_children_and_adds_padding() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 1000, 500));
        tree.set_spacing(Spacing {
            window: Thickness::uniform(5),
            stack: Thickness::uniform(10),
            root: Thickness::uniform(5),
        });
        let root = tree.root();
        let a = add_window(&mut tree, root, w(1));
        let stack = tree.create(NodeKind::stack());
        tree.attach(root, 1, stack).unwrap();
        add_window(&mut tree, stack, w(2));
        add_window(&mut tree, stack, w(3));
        tree.layout(&Unconstrained).unwrap();

        let frames = tree.frames();
        assert_eq!(frames[0], (w(1), Rect::from_xywh(10, 10, 485, 480)));
        assert_eq!(frames[1], (w(2), Rect::from_xywh(515, 20, 465, 460)));
        assert_eq!(frames[1].1, frames[2].1);
        assert_eq!(rect_of(&tree, a).right, rect_of(&tree, stack).left);

        let visible = tree.visible_frames();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[1].0, w(2));
    }

    #[test]
    fn grid_layout_fills_rows() {
        let grid = GridLayout { columns: 2 };
        let rects = grid.arrange(Rect::from_xywh(0, 0, 100, 100), &[Size::ZERO; 3]);
        assert_eq!(
            rects,
            vec![
                Rect::from_xywh(0, 0, 50, 50),
                Rect::from_xywh(50, 0, 50, 50),
                Rect::from_xywh(0, 50, 100, 50),
            ]
        );
        assert_eq!(grid.measure(&[Size::new(10, 20), Size::new(30, 5), Size::ZERO]), Size::new(60, 40));
    }

    #[test]
    fn static_panel_uses_its_function() {
        let mut tree = DesktopTree::new(
            NodeKind::with_layout(Arc::new(GridLayout { columns: 2 })),
            Rect::from_xywh(0, 0, 400, 400),
        );
        let root = tree.root();
        for i in 1..=4 {
            add_window(&mut tree, root, w(i));
        }
        tree.layout(&Unconstrained).unwrap();
        assert_eq!(tree.frames()[3], (w(4), Rect::from_xywh(200, 200, 200, 200)));
    }

    #[test]
    fn failed_arrange_keeps_flex_state() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 1000, 500));
        let root = tree.root();
        add_window(&mut tree, root, w(1));
        add_window(&mut tree, root, w(2));
        tree.layout(&Unconstrained).unwrap();
        let before = tree.clone();

        let mut sizes = RecordedSizes::new();
        sizes.set_minimum(w(1), Size::new(600, 0));
        sizes.set_minimum(w(2), Size::new(600, 0));
        assert_eq!(tree.layout(&sizes), Err(TilingError::UnsatisfiableConstraints));

        let NodeKind::Split(now) = tree.node(root).unwrap().kind() else { unreachable!() };
        let NodeKind::Split(then) = before.node(root).unwrap().kind() else { unreachable!() };
        assert_eq!(now.flex(), then.flex());
        assert_eq!(tree.frames(), before.frames());
    }

    #[test]
    fn failed_layout_keeps_measured_sizes() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 1920, 1080));
        let root = tree.root();
        let a = add_window(&mut tree, root, w(1));
        add_window(&mut tree, root, w(2));
        tree.layout(&Unconstrained).unwrap();

        let mut sizes = RecordedSizes::new();
        sizes.set_minimum(w(1), Size::new(1500, 0));
        sizes.set_minimum(w(2), Size::new(1500, 0));
        assert_eq!(tree.layout(&sizes), Err(TilingError::UnsatisfiableConstraints));

        assert_eq!(tree.node(root).unwrap().min_size(), Size::ZERO);
        assert_eq!(tree.node(a).unwrap().min_size(), Size::ZERO);
        tree.arrange().unwrap();
        assert_eq!(rect_of(&tree, a), Rect::from_xywh(0, 0, 960, 1080));
    }

    #[test]
    fn growing_minimum_takes_space_from_siblings() {
        let mut tree = DesktopTree::with_split(Orientation::Horizontal, Rect::from_xywh(0, 0, 1000, 500));
        let root = tree.root();
        let a = add_window(&mut tree, root, w(1));
        let b = add_window(&mut tree, root, w(2));
        tree.layout(&Unconstrained).unwrap();

        let mut sizes = RecordedSizes::new();
        sizes.set_minimum(w(1), Size::new(700, 0));
        tree.layout(&sizes).unwrap();
        assert_eq!(rect_of(&tree, a).width(), 700);
        assert_eq!(rect_of(&tree, b).width(), 300);
    }
}
