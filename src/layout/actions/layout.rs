//! The geometry solver: computes every container's rectangle from its
//! parent's rectangle, orientation, layout, and per-child percentages.

use log::trace;
use petgraph::graph::NodeIndex;

use super::super::core::container::{
    Container, ContainerType, DockPosition, FullscreenMode, Layout, Orientation,
};
use super::super::LayoutTree;
use crate::geometry::{Geometry, Point, Size};
use crate::x11::XOp;

impl LayoutTree {
    /// Recomputes the rectangles of the whole tree and queues the X11
    /// configure requests for every visible leaf whose inner rectangle
    /// changed.
    pub fn arrange(&mut self) {
        for output_ix in self.tree.outputs() {
            if self.tree[output_ix].is_internal() {
                continue;
            }
            let rect = self.tree[output_ix]
                .get_geometry()
                .expect("output had no geometry");
            self.arrange_output(output_ix, rect);
        }
        self.validate();
    }

    /// Lays out one output: dockareas consume their strut heights from the
    /// top and bottom edges, the content slot gets the remainder.
    fn arrange_output(&mut self, output_ix: NodeIndex, rect: Geometry) {
        let mut top_height = 0;
        let mut bottom_height = 0;
        for child_ix in self.tree.children_of(output_ix) {
            if let Container::Dockarea { position, .. } = self.tree[child_ix] {
                let height = self.arrange_dockarea(child_ix, position, rect);
                match position {
                    DockPosition::Top => top_height += height,
                    DockPosition::Bottom => bottom_height += height,
                }
            }
        }
        let content_rect = Geometry {
            origin: Point {
                x: rect.origin.x,
                y: rect.origin.y + top_height as i32,
            },
            size: Size {
                w: rect.size.w,
                h: rect.size.h.saturating_sub(top_height + bottom_height),
            },
        };
        if let Some(content_ix) = self.tree.content_of(output_ix) {
            self.tree[content_ix].set_geometry(content_rect);
            for ws_ix in self.tree.children_of(content_ix) {
                self.arrange_workspace(ws_ix, content_rect);
            }
        }
        // Fullscreen overrides the computed rectangles: output-fullscreen
        // containers cover the whole output, dockareas included; a global
        // one covers every output.
        if let Some(ws_ix) = self.visible_workspace_of(output_ix) {
            for leaf_ix in self.tree.leaves_of(ws_ix) {
                match self.tree[leaf_ix].fullscreen_mode() {
                    FullscreenMode::None => {}
                    FullscreenMode::Output => {
                        self.assign_leaf_rect(leaf_ix, rect, true);
                    }
                    FullscreenMode::Global => {
                        let bounds = self.outputs_bounding_rect();
                        self.assign_leaf_rect(leaf_ix, bounds, true);
                    }
                }
            }
        }
    }

    /// Stacks the dock windows by their reserved struts. Returns the total
    /// height taken off the output edge.
    fn arrange_dockarea(
        &mut self,
        dock_ix: NodeIndex,
        position: DockPosition,
        output_rect: Geometry,
    ) -> u32 {
        let children = self.tree.children_of(dock_ix);
        let mut total = 0;
        for child_ix in &children {
            let window = self.tree[*child_ix]
                .window()
                .expect("dockarea child without window");
            let reserved = match position {
                DockPosition::Top => window.strut.top,
                DockPosition::Bottom => window.strut.bottom,
            };
            total += if reserved > 0 {
                reserved
            } else {
                window.geometry.size.h
            };
        }
        let rect = match position {
            DockPosition::Top => Geometry {
                origin: output_rect.origin,
                size: Size { w: output_rect.size.w, h: total },
            },
            DockPosition::Bottom => Geometry {
                origin: Point {
                    x: output_rect.origin.x,
                    y: output_rect.origin.y + (output_rect.size.h - total) as i32,
                },
                size: Size { w: output_rect.size.w, h: total },
            },
        };
        self.tree[dock_ix].set_geometry(rect);
        let mut offset = rect.origin.y;
        for child_ix in children {
            let height = {
                let window = self.tree[child_ix].window().unwrap();
                let reserved = match position {
                    DockPosition::Top => window.strut.top,
                    DockPosition::Bottom => window.strut.bottom,
                };
                if reserved > 0 { reserved } else { window.geometry.size.h }
            };
            let child_rect = Geometry::new(rect.origin.x, offset, rect.size.w, height);
            self.assign_leaf_rect(child_ix, child_rect, true);
            offset += height as i32;
        }
        total
    }

    fn arrange_workspace(&mut self, ws_ix: NodeIndex, rect: Geometry) {
        self.tree[ws_ix].set_geometry(rect);
        if self.tree[ws_ix].orientation() == Orientation::Unset {
            let orientation = if rect.size.w >= rect.size.h {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let _ = self.tree[ws_ix].set_orientation(orientation);
        }
        let visible = self.workspace_is_visible(ws_ix);
        self.arrange_children(ws_ix, rect, visible);
        for wrapper_ix in self.tree.floating_children_of(ws_ix) {
            self.arrange_floating(wrapper_ix, visible);
        }
    }

    /// Lays out the tiling children of a workspace or split into `rect`
    /// according to the container's layout.
    fn arrange_children(&mut self, node_ix: NodeIndex, rect: Geometry, visible: bool) {
        let children = self.tree.tiling_children_of(node_ix);
        if children.is_empty() {
            return;
        }
        let layout = self.tree[node_ix].get_layout().unwrap_or(Layout::Split);
        match layout {
            Layout::Split => {
                self.tree.fix_percent(node_ix);
                let orientation = self.effective_orientation(node_ix);
                let axis = match orientation {
                    Orientation::Vertical => rect.size.h,
                    _ => rect.size.w,
                };
                let mut used = 0;
                for (index, child_ix) in children.iter().enumerate() {
                    let percent = self.tree.percent_of(*child_ix);
                    let extent = if index == children.len() - 1 {
                        axis - used
                    } else {
                        (percent * axis as f64).floor() as u32
                    };
                    let child_rect = match orientation {
                        Orientation::Vertical => Geometry::new(
                            rect.origin.x,
                            rect.origin.y + used as i32,
                            rect.size.w,
                            extent,
                        ),
                        _ => Geometry::new(
                            rect.origin.x + used as i32,
                            rect.origin.y,
                            extent,
                            rect.size.h,
                        ),
                    };
                    used += extent;
                    self.arrange_node(*child_ix, child_rect, visible, false);
                }
            }
            Layout::Stacked => {
                let deco = self.config.deco_height;
                let strip_total = deco * children.len() as u32;
                let body = rect.shave_top(strip_total);
                for (index, child_ix) in children.iter().enumerate() {
                    let strip = Geometry::new(
                        rect.origin.x,
                        rect.origin.y + (index as u32 * deco) as i32,
                        rect.size.w,
                        deco,
                    );
                    self.tree[*child_ix].set_deco_rect(strip);
                    self.arrange_node(*child_ix, body, visible, true);
                }
            }
            Layout::Tabbed => {
                let deco = self.config.deco_height;
                let body = rect.shave_top(deco);
                let tab_width = rect.size.w / children.len() as u32;
                for (index, child_ix) in children.iter().enumerate() {
                    let strip = Geometry::new(
                        rect.origin.x + (index as u32 * tab_width) as i32,
                        rect.origin.y,
                        tab_width,
                        deco,
                    );
                    self.tree[*child_ix].set_deco_rect(strip);
                    self.arrange_node(*child_ix, body, visible, true);
                }
            }
            Layout::Dockarea | Layout::Output => {
                trace!("arrange: {:?} containers lay themselves out", layout);
            }
        }
    }

    fn arrange_node(&mut self, node_ix: NodeIndex, rect: Geometry, visible: bool, decorated: bool) {
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf => {
                if !decorated {
                    self.tree[node_ix].set_deco_rect(Geometry::zero());
                }
                self.assign_leaf_rect(node_ix, rect, visible);
            }
            ContainerType::Split => {
                self.tree[node_ix].set_geometry(rect);
                self.arrange_children(node_ix, rect, visible);
            }
            c_type => panic!("arrange: unexpected {:?} in a tiling area", c_type),
        }
    }

    /// Clamps a floating wrapper against the configured minimum and
    /// maximum sizes (−1 = unlimited) and lays out its subtree.
    fn arrange_floating(&mut self, wrapper_ix: NodeIndex, visible: bool) {
        let mut rect = self.tree[wrapper_ix]
            .get_geometry()
            .expect("wrapper had no geometry");
        let (min_w, min_h) = self.config.floating_minimum_size;
        let (max_w, max_h) = self.config.floating_maximum_size;
        if min_w > 0 {
            rect.size.w = rect.size.w.max(min_w as u32);
        }
        if min_h > 0 {
            rect.size.h = rect.size.h.max(min_h as u32);
        }
        if max_w > 0 {
            rect.size.w = rect.size.w.min(max_w as u32);
        }
        if max_h > 0 {
            rect.size.h = rect.size.h.min(max_h as u32);
        }
        self.tree[wrapper_ix].set_geometry(rect);
        for child_ix in self.tree.children_of(wrapper_ix) {
            self.arrange_node(child_ix, rect, visible, false);
        }
    }

    /// Sets a leaf's outer and inner rectangles and queues the configure
    /// request when the client-visible rectangle changed.
    fn assign_leaf_rect(&mut self, leaf_ix: NodeIndex, rect: Geometry, visible: bool) {
        let border = self.config.border_px;
        // Deco strips of stacked/tabbed parents sit above the shared body
        // rect, so only the border is taken off here.
        let mut inner = rect.inset(border);
        if inner.size.w == 0 {
            inner.size.w = 1;
        }
        if inner.size.h == 0 {
            inner.size.h = 1;
        }
        let old = self.tree[leaf_ix].window_rect();
        self.tree[leaf_ix].set_geometry(rect);
        self.tree[leaf_ix]
            .set_window_rect(inner)
            .expect("assign_leaf_rect: not a leaf");
        if visible && old != Some(inner) {
            let window = self.tree[leaf_ix].window_id().unwrap();
            self.queue_x(XOp::Configure { window, geometry: inner });
        }
    }

    /// The rectangle spanned by every active output together.
    pub(crate) fn outputs_bounding_rect(&self) -> Geometry {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        let mut any = false;
        for output_ix in self.tree.outputs() {
            if self.tree[output_ix].is_internal() {
                continue;
            }
            let rect = self.tree[output_ix].get_geometry().unwrap();
            any = true;
            min_x = min_x.min(rect.origin.x);
            min_y = min_y.min(rect.origin.y);
            max_x = max_x.max(rect.origin.x + rect.size.w as i32);
            max_y = max_y.max(rect.origin.y + rect.size.h as i32);
        }
        if !any {
            return Geometry::zero();
        }
        Geometry::new(min_x, min_y, (max_x - min_x) as u32, (max_y - min_y) as u32)
    }

    /// `layout default|stacked|tabbed` on the focused container's parent
    /// (or the workspace itself when focus sits directly below one).
    pub fn set_layout_of_focused(&mut self, layout: Layout) -> super::super::CommandResult {
        use super::super::TreeError;
        let focused_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        self.set_layout_of(focused_ix, layout)
    }

    /// Layout change anchored at an arbitrary container.
    pub fn set_layout_of(&mut self, node_ix: NodeIndex, layout: Layout) -> super::super::CommandResult {
        use super::super::TreeError;
        let focused_ix = node_ix;
        let target_ix = match self.tree[focused_ix].get_type() {
            ContainerType::Workspace | ContainerType::Split => focused_ix,
            _ => {
                let parent_ix = self.tree.parent_of(focused_ix)?;
                match self.tree[parent_ix].get_type() {
                    ContainerType::Workspace | ContainerType::Split => parent_ix,
                    // A floating leaf: the wrapped subtree has no layout
                    // siblings to present differently.
                    _ => return Ok(()),
                }
            }
        };
        self.tree[target_ix]
            .set_layout(layout)
            .map_err(TreeError::Container)?;
        self.validate();
        Ok(())
    }

    /// `layout toggle`: default -> stacked -> tabbed -> default.
    pub fn toggle_layout_of(&mut self, node_ix: NodeIndex) -> super::super::CommandResult {
        let target_ix = match self.tree[node_ix].get_type() {
            ContainerType::Workspace | ContainerType::Split => node_ix,
            _ => self.tree.parent_of(node_ix)?,
        };
        let next = match self.tree[target_ix].get_layout() {
            Ok(Layout::Split) => Layout::Stacked,
            Ok(Layout::Stacked) => Layout::Tabbed,
            _ => Layout::Split,
        };
        self.set_layout_of(node_ix, next)
    }

    /// `split h` / `split v`: wraps the focused container in a fresh split
    /// with the requested orientation. The new split inherits the child's
    /// share of its parent, so sibling percentages are untouched.
    pub fn split_focused(&mut self, orientation: Orientation) -> super::super::CommandResult {
        use super::super::TreeError;
        let focused_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        self.split_node(focused_ix, orientation)
    }

    /// The split operation anchored at an arbitrary container.
    pub fn split_node(&mut self, focused_ix: NodeIndex, orientation: Orientation) -> super::super::CommandResult {
        use super::super::TreeError;
        match self.tree[focused_ix].get_type() {
            ContainerType::Workspace => {
                // Splitting an empty workspace just forces its orientation.
                self.tree[focused_ix]
                    .set_orientation(orientation)
                    .map_err(TreeError::Container)?;
                return Ok(());
            }
            ContainerType::Leaf | ContainerType::Split => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        let rect = self.tree[focused_ix].get_geometry().unwrap_or_default();
        let floating = self.tree[focused_ix].floating_state();
        let split = Container::new_split(Layout::Split, orientation, rect);
        let split_id = split.get_id();
        let split_ix = self.tree.add_node_detached(split);
        self.tree.replace(focused_ix, split_ix)?;
        self.tree.attach_child(split_ix, focused_ix);
        if floating.is_floating() {
            // The wrapped root of a floating wrapper moved down a level.
            let _ = self.tree[split_ix].set_floating_state(floating);
            let _ = self.tree[focused_ix].set_floating_state(super::super::FloatingState::AutoOff);
        }
        trace!("split: wrapped {:?} in new split {}", focused_ix, split_id);
        self.validate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::core::tree::tests::basic_tree;
    use super::super::super::{Container, ContainerType, Layout, Orientation, PERCENT_EPSILON};
    use crate::geometry::Geometry;
    use crate::manage::Window;

    #[test]
    fn split_partitions_by_percent() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        tree.arrange();
        let leaves = tree.tree.children_of(split);
        let left = tree.tree[leaves[0]].get_geometry().unwrap();
        let right = tree.tree[leaves[1]].get_geometry().unwrap();
        assert_eq!(left.size.w, 400);
        assert_eq!(right.size.w, 400);
        assert_eq!(right.origin.x, 400);
        assert_eq!(left.size.h, 600);
    }

    #[test]
    fn uneven_percents_round_into_last_child() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let third = tree
            .tree
            .add_child(split, Container::new_leaf(Window::for_tests(202)), false);
        tree.arrange();
        let children = tree.tree.children_of(split);
        let widths: Vec<u32> = children
            .iter()
            .map(|c| tree.tree[*c].get_geometry().unwrap().size.w)
            .collect();
        assert_eq!(widths.iter().sum::<u32>(), 800);
        // 800 is not divisible by three; the residual lands on the tail.
        assert_eq!(widths[0], 266);
        assert_eq!(widths[1], 266);
        assert_eq!(widths[2], 268);
        assert!((tree.tree.percent_of(third) - 1.0 / 3.0).abs() < PERCENT_EPSILON);
    }

    #[test]
    fn stacked_layout_stacks_deco_strips() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        tree.tree[split].set_layout(Layout::Stacked).unwrap();
        tree.arrange();
        let deco = tree.config.deco_height;
        let leaves = tree.tree.children_of(split);
        let first_strip = tree.tree[leaves[0]].deco_rect();
        let second_strip = tree.tree[leaves[1]].deco_rect();
        assert_eq!(first_strip.origin.y, 0);
        assert_eq!(second_strip.origin.y, deco as i32);
        // Both bodies share the rectangle below the strips.
        let first = tree.tree[leaves[0]].get_geometry().unwrap();
        let second = tree.tree[leaves[1]].get_geometry().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.origin.y, (2 * deco) as i32);
    }

    #[test]
    fn split_command_preserves_percentages() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.tree.set_percent(leaves[0], 0.25);
        tree.tree.set_percent(leaves[1], 0.75);
        tree.focus_node(leaves[1]).unwrap();
        tree.split_focused(Orientation::Horizontal).unwrap();
        let children = tree.tree.children_of(split);
        assert_eq!(tree.tree[children[1]].get_type(), ContainerType::Split);
        assert!((tree.tree.percent_of(children[0]) - 0.25).abs() < PERCENT_EPSILON);
        assert!((tree.tree.percent_of(children[1]) - 0.75).abs() < PERCENT_EPSILON);
        // The leaf now fills the new split alone.
        assert_eq!(tree.tree.children_of(children[1]), vec![leaves[1]]);
    }

    #[test]
    fn floating_minimum_size_clamps() {
        let mut tree = basic_tree();
        tree.config.floating_minimum_size = (60, 40);
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let wrapper = tree.tree.add_child(
            ws_1,
            Container::new_floating_wrapper(Geometry::new(10, 10, 20, 20)),
            false,
        );
        let mut window = Window::for_tests(900);
        window.geometry = Geometry::new(10, 10, 20, 20);
        let leaf = tree.tree.add_child(wrapper, Container::new_leaf(window), false);
        let _ = tree.tree[leaf].set_floating_state(super::super::super::FloatingState::AutoOn);
        tree.arrange();
        let rect = tree.tree[wrapper].get_geometry().unwrap();
        assert_eq!((rect.size.w, rect.size.h), (60, 40));
    }

    #[test]
    fn floating_maximum_size_clamps_and_unlimited_passes() {
        let mut tree = basic_tree();
        tree.config.floating_maximum_size = (100, 100);
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let wrapper = tree.tree.add_child(
            ws_1,
            Container::new_floating_wrapper(Geometry::new(0, 0, 150, 150)),
            false,
        );
        let mut window = Window::for_tests(901);
        window.geometry = Geometry::new(0, 0, 150, 150);
        tree.tree.add_child(wrapper, Container::new_leaf(window), false);
        tree.arrange();
        let rect = tree.tree[wrapper].get_geometry().unwrap();
        assert_eq!((rect.size.w, rect.size.h), (100, 100));

        tree.config.floating_maximum_size = (-1, -1);
        let big = tree.tree.add_child(
            ws_1,
            Container::new_floating_wrapper(Geometry::new(0, 0, 2048, 2048)),
            false,
        );
        let mut window = Window::for_tests(902);
        window.geometry = Geometry::new(0, 0, 2048, 2048);
        tree.tree.add_child(big, Container::new_leaf(window), false);
        tree.arrange();
        let rect = tree.tree[big].get_geometry().unwrap();
        assert_eq!((rect.size.w, rect.size.h), (2048, 2048));
    }
}
