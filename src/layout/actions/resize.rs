//! Percent arithmetic for the `resize` command.

use log::trace;
use petgraph::graph::NodeIndex;
use uuid::Uuid;

use super::super::core::container::ContainerType;
use super::super::{CommandResult, Direction, LayoutTree, TreeError};

/// No tiling child may shrink below this share of its parent.
const MIN_PERCENT: f64 = 0.05;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResizeErr {
    /// There is no sibling on that side to trade space with.
    NoSiblingInDirection(Uuid, Direction),
}

impl LayoutTree {
    /// `resize grow|shrink <dir> <px> px or <ppt> ppt`.
    ///
    /// Tiling containers trade percentage points with the adjacent sibling
    /// on the requested side: the same absolute amount leaves one and
    /// enters the other, so the parent's shares keep summing to one. When
    /// both units are supplied the percentage is authoritative for tiling
    /// and the pixel amount for floating; a pixel amount alone is converted
    /// against the parent's axis extent.
    pub fn resize(
        &mut self,
        node_ix: NodeIndex,
        direction: Direction,
        grow: bool,
        px: u32,
        ppt: u32,
    ) -> CommandResult {
        if self.tree[node_ix].floating()
            || self
                .tree
                .ancestor_of_type(node_ix, ContainerType::FloatingWrapper)
                .is_ok()
        {
            return self.resize_floating(node_ix, direction, grow, px);
        }
        let (subject_ix, sibling_ix, parent_ix) = self.resize_pair(node_ix, direction)?;
        let delta = if ppt > 0 {
            ppt as f64 / 100.0
        } else {
            let parent_rect = self.tree[parent_ix]
                .get_geometry()
                .expect("resize: parent had no geometry");
            let axis = match direction.axis() {
                super::super::Orientation::Vertical => parent_rect.size.h,
                _ => parent_rect.size.w,
            };
            if axis == 0 {
                return Ok(());
            }
            px as f64 / axis as f64
        };
        let delta = if grow { delta } else { -delta };
        let subject = self.tree.percent_of(subject_ix);
        let sibling = self.tree.percent_of(sibling_ix);
        if subject + delta < MIN_PERCENT || sibling - delta < MIN_PERCENT {
            trace!("resize: clamped, {} <-> {} with delta {}", subject, sibling, delta);
            return Ok(());
        }
        self.tree.set_percent(subject_ix, subject + delta);
        self.tree.set_percent(sibling_ix, sibling - delta);
        self.tree.fix_percent(parent_ix);
        self.validate();
        Ok(())
    }

    /// Walks up from the node until an ancestor's orientation matches the
    /// resize direction, and returns (subject, traded sibling, parent).
    fn resize_pair(
        &self,
        node_ix: NodeIndex,
        direction: Direction,
    ) -> Result<(NodeIndex, NodeIndex, NodeIndex), TreeError> {
        let mut cur_ix = node_ix;
        loop {
            let parent_ix = match self.tree.parent_of(cur_ix) {
                Ok(ix) => ix,
                Err(_) => {
                    return Err(TreeError::Resize(ResizeErr::NoSiblingInDirection(
                        self.tree[node_ix].get_id(),
                        direction,
                    )))
                }
            };
            match self.tree[parent_ix].get_type() {
                ContainerType::Split | ContainerType::Workspace => {
                    if self.effective_orientation(parent_ix) == direction.axis() {
                        let siblings = self.tree.tiling_children_of(parent_ix);
                        let pos = siblings
                            .iter()
                            .position(|ix| *ix == cur_ix)
                            .expect("resize: node not among parent's children");
                        let next = if direction.towards_head() {
                            pos.checked_sub(1)
                        } else if pos + 1 < siblings.len() {
                            Some(pos + 1)
                        } else {
                            None
                        };
                        if let Some(next) = next {
                            return Ok((cur_ix, siblings[next], parent_ix));
                        }
                    }
                    cur_ix = parent_ix;
                }
                _ => {
                    return Err(TreeError::Resize(ResizeErr::NoSiblingInDirection(
                        self.tree[node_ix].get_id(),
                        direction,
                    )))
                }
            }
        }
    }

    /// Floating containers resize in pixels, growing away from the given
    /// edge.
    fn resize_floating(
        &mut self,
        node_ix: NodeIndex,
        direction: Direction,
        grow: bool,
        px: u32,
    ) -> CommandResult {
        let wrapper_ix = if self.tree[node_ix].get_type() == ContainerType::FloatingWrapper {
            node_ix
        } else {
            self.tree
                .ancestor_of_type(node_ix, ContainerType::FloatingWrapper)
                .map_err(TreeError::PetGraph)?
        };
        let mut rect = self.tree[wrapper_ix]
            .get_geometry()
            .expect("wrapper had no geometry");
        let px = px as i32;
        let signed = if grow { px } else { -px };
        match direction {
            Direction::Up => {
                rect.origin.y -= signed;
                rect.size.h = add_signed(rect.size.h, signed);
            }
            Direction::Down => {
                rect.size.h = add_signed(rect.size.h, signed);
            }
            Direction::Left => {
                rect.origin.x -= signed;
                rect.size.w = add_signed(rect.size.w, signed);
            }
            Direction::Right => {
                rect.size.w = add_signed(rect.size.w, signed);
            }
        }
        self.tree[wrapper_ix].set_geometry(rect);
        self.validate();
        Ok(())
    }
}

fn add_signed(value: u32, delta: i32) -> u32 {
    if delta < 0 {
        value.saturating_sub(delta.unsigned_abs())
    } else {
        value + delta as u32
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::core::tree::tests::basic_tree;
    use super::super::super::{Container, Direction, Orientation, PERCENT_EPSILON};
    use crate::geometry::Geometry;
    use crate::manage::Window;

    #[test]
    fn grow_up_in_vertical_split_moves_a_quarter() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        tree.tree[split]
            .set_orientation(Orientation::Vertical)
            .unwrap();
        tree.arrange();
        let leaves = tree.tree.children_of(split);
        // Grow the lower child upwards by 10 px or 25 ppt: the percentage
        // wins for tiling children.
        tree.resize(leaves[1], Direction::Up, true, 10, 25).unwrap();
        assert!((tree.tree.percent_of(leaves[0]) - 0.25).abs() < PERCENT_EPSILON);
        assert!((tree.tree.percent_of(leaves[1]) - 0.75).abs() < PERCENT_EPSILON);
        // A subsequent `split h` must leave the percentages alone.
        tree.focus_node(leaves[1]).unwrap();
        tree.split_focused(Orientation::Horizontal).unwrap();
        let children = tree.tree.children_of(split);
        assert!((tree.tree.percent_of(children[0]) - 0.25).abs() < PERCENT_EPSILON);
        assert!((tree.tree.percent_of(children[1]) - 0.75).abs() < PERCENT_EPSILON);
    }

    #[test]
    fn pixel_resize_converts_against_the_axis() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        tree.arrange();
        let leaves = tree.tree.children_of(split);
        // 80 px of an 800 px wide parent is 10%.
        tree.resize(leaves[0], Direction::Right, true, 80, 0).unwrap();
        assert!((tree.tree.percent_of(leaves[0]) - 0.6).abs() < 1e-3);
        assert!((tree.tree.percent_of(leaves[1]) - 0.4).abs() < 1e-3);
    }

    #[test]
    fn resize_never_starves_a_sibling() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        tree.arrange();
        let leaves = tree.tree.children_of(split);
        tree.resize(leaves[0], Direction::Right, true, 0, 60).unwrap();
        // Would leave the sibling below the minimum share: no-op.
        assert!((tree.tree.percent_of(leaves[0]) - 0.5).abs() < PERCENT_EPSILON);
    }

    #[test]
    fn resize_without_aligned_ancestor_errors() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        assert!(tree.resize(leaves[0], Direction::Down, true, 0, 10).is_err());
    }

    #[test]
    fn floating_resize_is_pixel_based() {
        let mut tree = basic_tree();
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let wrapper = tree.tree.add_child(
            ws_1,
            Container::new_floating_wrapper(Geometry::new(100, 100, 200, 150)),
            false,
        );
        let mut window = Window::for_tests(950);
        window.geometry = Geometry::new(100, 100, 200, 150);
        let leaf = tree.tree.add_child(wrapper, Container::new_leaf(window), false);
        let _ = tree.tree[leaf]
            .set_floating_state(super::super::super::FloatingState::AutoOn);
        tree.resize(leaf, Direction::Right, true, 10, 25).unwrap();
        let rect = tree.tree[wrapper].get_geometry().unwrap();
        assert_eq!(rect.size.w, 210);
        assert_eq!(rect.size.h, 150);
    }
}
