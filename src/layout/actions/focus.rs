use log::trace;
use petgraph::graph::NodeIndex;
use serde_json::json;

use super::super::core::container::{ContainerType, Orientation};
use super::super::{CommandResult, Direction, LayoutTree, TreeError};
use crate::x11::{XOp, WINDOW_NONE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusError {
    /// Tried to focus off the edge of the tree in the given direction.
    NoneInDirection(Direction),
    /// The workspace has nothing on the requested side (floating/tiling).
    NothingToFocus,
}

impl LayoutTree {
    /// Makes the container the focused one: promotes it at every ancestor
    /// focus stack up to the root, and queues the input-focus handover for
    /// the leaf at the end of its focus chain.
    ///
    /// A leaf advertising `WM_TAKE_FOCUS` gets the ICCCM client message and
    /// no `SetInputFocus`; everything else gets `SetInputFocus`.
    pub fn focus_node(&mut self, node_ix: NodeIndex) -> CommandResult {
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf | ContainerType::Split | ContainerType::Workspace => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        self.tree.set_focus_path(node_ix);
        self.focused = Some(node_ix);
        if let Ok(leaf_ix) = self
            .tree
            .follow_focused_until(node_ix, ContainerType::Leaf)
        {
            self.emit_input_focus(leaf_ix);
        }
        self.validate();
        Ok(())
    }

    /// Queues the X11 side of a focus change.
    pub(crate) fn emit_input_focus(&mut self, leaf_ix: NodeIndex) {
        let (window, needs_take_focus) = {
            let window = self.tree[leaf_ix]
                .window()
                .expect("emit_input_focus: not a leaf");
            (window.id, window.needs_take_focus)
        };
        if needs_take_focus {
            trace!("focus: sending WM_TAKE_FOCUS to {:#x}", window);
            self.queue_x(XOp::TakeFocus(window));
        } else {
            trace!("focus: SetInputFocus {:#x}", window);
            self.queue_x(XOp::SetInputFocus(window));
        }
        self.queue_x(XOp::UpdateActiveWindow(window));
        self.queue_event("window", json!({ "change": "focus", "window": window }));
    }

    /// Updates focus after a container was moved or removed: descends the
    /// focus stack from the given node and focuses the leaf it ends at.
    /// With nothing focusable left, input focus is released.
    pub fn focus_on_next_container(&mut self, start_ix: NodeIndex) {
        let end_ix = self.tree.follow_focused(start_ix);
        if self.tree[end_ix].get_type() == ContainerType::Leaf {
            self.focus_node(end_ix)
                .expect("focus_on_next_container: leaf refused focus");
        } else {
            trace!("nothing left to focus under {:?}", start_ix);
            self.focused = None;
            self.queue_x(XOp::UpdateActiveWindow(WINDOW_NONE));
        }
    }

    /// Interprets a direction against the tiling tree: walks up from the
    /// focused container until an ancestor's orientation aligns with the
    /// direction, picks the adjacent sibling there and descends its focus
    /// stack.
    pub fn focus_direction(&mut self, direction: Direction) -> CommandResult {
        let mut start_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        if self.tree[start_ix].floating() {
            // Directional focus is a tiling concept; start from the tiling
            // side of the workspace.
            let ws_ix = self
                .workspace_of(start_ix)
                .ok_or(TreeError::NoActiveContainer)?;
            let tiling = self.tree.tiling_children_of(ws_ix);
            match tiling.first() {
                Some(first) => start_ix = self.tree.follow_focused(*first),
                None => return Err(TreeError::Focus(FocusError::NothingToFocus)),
            }
        }
        let target_ix = self.neighbor_in_direction(start_ix, direction)?;
        let focus_ix = self.tree.follow_focused(target_ix);
        self.focus_node(focus_ix)
    }

    /// The sibling subtree adjacent to `node_ix` in the given direction,
    /// escalating to ancestors until one's orientation aligns.
    pub(crate) fn neighbor_in_direction(
        &self,
        node_ix: NodeIndex,
        direction: Direction,
    ) -> Result<NodeIndex, TreeError> {
        let mut cur_ix = node_ix;
        loop {
            let parent_ix = match self.tree.parent_of(cur_ix) {
                Ok(ix) => ix,
                Err(_) => return Err(TreeError::Focus(FocusError::NoneInDirection(direction))),
            };
            match self.tree[parent_ix].get_type() {
                ContainerType::Split | ContainerType::Workspace => {
                    if self.effective_orientation(parent_ix) == direction.axis() {
                        let siblings = self.tree.tiling_children_of(parent_ix);
                        let pos = siblings
                            .iter()
                            .position(|ix| *ix == cur_ix)
                            .expect("neighbor: node not among parent's children");
                        let next = if direction.towards_head() {
                            pos.checked_sub(1)
                        } else if pos + 1 < siblings.len() {
                            Some(pos + 1)
                        } else {
                            None
                        };
                        if let Some(next) = next {
                            return Ok(siblings[next]);
                        }
                    }
                    cur_ix = parent_ix;
                }
                _ => return Err(TreeError::Focus(FocusError::NoneInDirection(direction))),
            }
        }
    }

    /// The orientation geometry actually uses: `Unset` tiles horizontally.
    pub(crate) fn effective_orientation(&self, node_ix: NodeIndex) -> Orientation {
        match self.tree[node_ix].orientation() {
            Orientation::Unset => Orientation::Horizontal,
            orientation => orientation,
        }
    }

    /// `focus parent`: move the focus target one level up, stopping at the
    /// workspace.
    pub fn focus_parent(&mut self) -> CommandResult {
        let focused_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        if self.tree[focused_ix].get_type() == ContainerType::Workspace {
            return Ok(());
        }
        let mut parent_ix = self.tree.parent_of(focused_ix)?;
        // Floating wrappers are invisible to the user; skip over them.
        if self.tree[parent_ix].get_type() == ContainerType::FloatingWrapper {
            parent_ix = self.tree.parent_of(parent_ix)?;
        }
        match self.tree[parent_ix].get_type() {
            ContainerType::Split | ContainerType::Workspace => {
                self.focused = Some(parent_ix);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// `focus child`: descend one level along the focus stack.
    pub fn focus_child(&mut self) -> CommandResult {
        let focused_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        if let Some(child_ix) = self.tree.focused_child_of(focused_ix) {
            match self.tree[child_ix].get_type() {
                ContainerType::Leaf | ContainerType::Split => {
                    self.focused = Some(child_ix);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Swaps focus between the floating and the tiling side of the current
    /// workspace, each side remembering its own most recent leaf through
    /// the focus ranks.
    pub fn focus_mode_toggle(&mut self) -> CommandResult {
        let focused_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        let ws_ix = self
            .workspace_of(focused_ix)
            .ok_or(TreeError::NoActiveContainer)?;
        let on_floating_side = self
            .tree
            .ancestor_of_type(focused_ix, ContainerType::FloatingWrapper)
            .is_ok();
        let candidates = if on_floating_side {
            self.tree.tiling_children_of(ws_ix)
        } else {
            self.tree.floating_children_of(ws_ix)
        };
        // The most recently used child of the other side.
        let target = self
            .tree
            .focus_children_of(ws_ix)
            .into_iter()
            .find(|ix| candidates.contains(ix))
            .ok_or(TreeError::Focus(FocusError::NothingToFocus))?;
        let leaf_ix = self.tree.follow_focused(target);
        self.focus_node(leaf_ix)
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::core::tree::tests::basic_tree;
    use super::super::super::core::tree::KillPolicy;
    use super::super::super::{Container, Direction};
    use crate::manage::Window;
    use crate::x11::XOp;

    #[test]
    fn focus_direction_within_split() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.focus_node(leaves[0]).unwrap();
        tree.focus_direction(Direction::Right).unwrap();
        assert_eq!(tree.focused_leaf(), Some(leaves[1]));
        tree.focus_direction(Direction::Left).unwrap();
        assert_eq!(tree.focused_leaf(), Some(leaves[0]));
        // Off the edge: error, focus unchanged.
        assert!(tree.focus_direction(Direction::Left).is_err());
        assert_eq!(tree.focused_leaf(), Some(leaves[0]));
        // No vertical ancestor in a horizontal split.
        assert!(tree.focus_direction(Direction::Up).is_err());
    }

    #[test]
    fn take_focus_windows_get_the_client_message() {
        let mut tree = basic_tree();
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let mut window = Window::for_tests(777);
        window.needs_take_focus = true;
        let leaf = tree.tree.add_child(ws_1, Container::new_leaf(window), false);
        tree.take_pending_x();
        tree.focus_node(leaf).unwrap();
        let ops = tree.take_pending_x();
        assert!(ops.contains(&XOp::TakeFocus(777)));
        assert!(!ops.contains(&XOp::SetInputFocus(777)));
    }

    #[test]
    fn plain_windows_get_set_input_focus() {
        let mut tree = basic_tree();
        let leaf = tree.focused_leaf().unwrap();
        tree.take_pending_x();
        tree.focus_node(leaf).unwrap();
        let ops = tree.take_pending_x();
        assert!(ops.contains(&XOp::SetInputFocus(100)));
        assert!(!ops.iter().any(|op| matches!(op, XOp::TakeFocus(_))));
    }

    #[test]
    fn focus_parent_then_child_round_trips() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.focus_node(leaves[1]).unwrap();
        tree.focus_parent().unwrap();
        assert_eq!(tree.focused_ix(), Some(split));
        tree.focus_child().unwrap();
        assert_eq!(tree.focused_ix(), Some(leaves[1]));
    }

    #[test]
    fn closing_focused_leaf_refocuses_sibling() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.focus_node(leaves[0]).unwrap();
        tree.close(leaves[0], KillPolicy::Window).unwrap();
        let focused = tree.focused_leaf().expect("nothing focused after close");
        assert_eq!(tree.tree[focused].window_id(), Some(201));
    }
}
