use log::{info, trace};
use petgraph::graph::NodeIndex;
use serde_json::json;
use uuid::Uuid;

use super::super::core::container::{ContainerType, FullscreenMode};
use super::super::core::graph_tree::ShiftDirection;
use super::super::{CommandResult, Direction, LayoutTree, TreeError};

/// Pixels a floating container moves per `move <direction>`.
const FLOAT_MOVE_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementError {
    /// Attempted to move the node behind the UUID in the given direction,
    /// which would cause it to leave its siblings.
    MoveOutsideSiblings(Uuid, Direction),
}

impl LayoutTree {
    /// Will attempt to move the container in the given direction: swap
    /// with a leaf sibling, descend into a split sibling, or escalate to
    /// an ancestor whose orientation matches. Floating containers move by
    /// a pixel step instead.
    pub fn move_container(&mut self, node_ix: NodeIndex, direction: Direction) -> CommandResult {
        if self.tree[node_ix].floating()
            || self
                .tree
                .ancestor_of_type(node_ix, ContainerType::FloatingWrapper)
                .is_ok()
        {
            return self.move_floating(node_ix, direction);
        }
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf | ContainerType::Split => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        let old_parent_ix = self.tree.parent_of(node_ix)?;
        self.move_recurse(node_ix, None, direction)?;
        if self.tree.get(old_parent_ix).is_some() {
            let _ = self.repair_after_detach(old_parent_ix)?;
        }
        self.tree.set_focus_path(node_ix);
        self.validate();
        Ok(())
    }

    /// Returns the new parent of the moved container if the move succeeds.
    fn move_recurse(
        &mut self,
        node_to_move: NodeIndex,
        move_ancestor: Option<NodeIndex>,
        direction: Direction,
    ) -> Result<NodeIndex, TreeError> {
        let anchor_ix = move_ancestor.unwrap_or(node_to_move);
        let parent_ix = self.tree.parent_of(anchor_ix)?;
        match self.tree[parent_ix].get_type() {
            ContainerType::Split | ContainerType::Workspace => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        if self.effective_orientation(parent_ix) == direction.axis() {
            if let Some(ancestor_ix) = move_ancestor {
                return self.move_between_ancestors(node_to_move, ancestor_ix, direction);
            }
            match self.move_within_container(node_to_move, direction) {
                Ok(new_parent_ix) => Ok(new_parent_ix),
                Err(TreeError::Movement(MovementError::MoveOutsideSiblings(..))) => {
                    if self.tree[parent_ix].get_type() == ContainerType::Workspace {
                        Err(TreeError::Movement(MovementError::MoveOutsideSiblings(
                            self.tree[node_to_move].get_id(),
                            direction,
                        )))
                    } else {
                        self.move_recurse(node_to_move, Some(parent_ix), direction)
                    }
                }
                Err(err) => Err(err),
            }
        } else if self.tree[parent_ix].get_type() == ContainerType::Workspace {
            Err(TreeError::Movement(MovementError::MoveOutsideSiblings(
                self.tree[node_to_move].get_id(),
                direction,
            )))
        } else {
            self.move_recurse(node_to_move, Some(parent_ix), direction)
        }
    }

    /// Attempt to move a container among its current siblings.
    ///
    /// If the node would leave its container by moving in that direction,
    /// `MovementError::MoveOutsideSiblings` is returned.
    fn move_within_container(
        &mut self,
        node_ix: NodeIndex,
        direction: Direction,
    ) -> Result<NodeIndex, TreeError> {
        let parent_ix = self.tree.parent_of(node_ix)?;
        let siblings = self.tree.tiling_children_of(parent_ix);
        let cur_index = siblings
            .iter()
            .position(|ix| *ix == node_ix)
            .ok_or_else(|| TreeError::NodeNotFound(self.tree[node_ix].get_id()))?;
        let maybe_new_index = if direction.towards_head() {
            cur_index.checked_sub(1)
        } else if cur_index + 1 < siblings.len() {
            Some(cur_index + 1)
        } else {
            None
        };
        let swap_index = maybe_new_index.ok_or(TreeError::Movement(
            MovementError::MoveOutsideSiblings(self.tree[node_ix].get_id(), direction),
        ))?;
        let swap_ix = siblings[swap_index];
        match self.tree[swap_ix].get_type() {
            ContainerType::Leaf => {
                self.tree.swap_node_order(node_ix, swap_ix)?;
            }
            ContainerType::Split => {
                // Slide into the neighbouring split instead of past it.
                self.tree.move_into(node_ix, swap_ix)?;
            }
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        Ok(self.tree.parent_of(node_ix)?)
    }

    /// Moves the node in the direction, out to an ancestor's siblings.
    ///
    /// This should only be called by the recursive function.
    fn move_between_ancestors(
        &mut self,
        node_to_move: NodeIndex,
        move_ancestor: NodeIndex,
        direction: Direction,
    ) -> Result<NodeIndex, TreeError> {
        let cur_parent_ix = self.tree.parent_of(move_ancestor)?;
        let siblings = self.tree.tiling_children_of(cur_parent_ix);
        let cur_index = siblings
            .iter()
            .position(|ix| *ix == move_ancestor)
            .ok_or_else(|| TreeError::NodeNotFound(self.tree[move_ancestor].get_id()))?;
        let next_ix = if direction.towards_head() {
            match cur_index.checked_sub(1) {
                Some(next_index) => siblings[next_index],
                None => {
                    // Already at the head: land before everything.
                    return self
                        .tree
                        .add_to_end(node_to_move, siblings[0], ShiftDirection::Right)
                        .map_err(TreeError::PetGraph);
                }
            }
        } else {
            let next_index = cur_index + 1;
            if next_index >= siblings.len() {
                return self
                    .tree
                    .add_to_end(
                        node_to_move,
                        siblings[siblings.len() - 1],
                        ShiftDirection::Left,
                    )
                    .map_err(TreeError::PetGraph);
            }
            siblings[next_index]
        };
        match self.tree[next_ix].get_type() {
            ContainerType::Leaf => {
                let shift = if direction.towards_head() {
                    ShiftDirection::Right
                } else {
                    ShiftDirection::Left
                };
                self.tree
                    .place_node_at(node_to_move, next_ix, shift)
                    .map_err(TreeError::PetGraph)
            }
            ContainerType::Split => self
                .tree
                .move_into(node_to_move, next_ix)
                .map_err(TreeError::PetGraph),
            c_type => Err(TreeError::InvalidOperationOn(c_type)),
        }
    }

    /// Floating containers move by a fixed pixel step.
    fn move_floating(&mut self, node_ix: NodeIndex, direction: Direction) -> CommandResult {
        let wrapper_ix = if self.tree[node_ix].get_type() == ContainerType::FloatingWrapper {
            node_ix
        } else {
            self.tree
                .ancestor_of_type(node_ix, ContainerType::FloatingWrapper)
                .map_err(TreeError::PetGraph)?
        };
        let rect = self.tree[wrapper_ix].get_geometry().unwrap();
        let moved = match direction {
            Direction::Up => rect.translate(0, -FLOAT_MOVE_STEP),
            Direction::Down => rect.translate(0, FLOAT_MOVE_STEP),
            Direction::Left => rect.translate(-FLOAT_MOVE_STEP, 0),
            Direction::Right => rect.translate(FLOAT_MOVE_STEP, 0),
        };
        self.tree[wrapper_ix].set_geometry(moved);
        Ok(())
    }

    /// `move container to workspace <name>`: detaches the container (the
    /// whole wrapper for floating ones) and re-attaches it to the target
    /// workspace, fixing visibility and focus on both sides. The moved
    /// container does not steal focus.
    pub fn send_to_workspace(&mut self, node_ix: NodeIndex, name: &str) -> CommandResult {
        let (ws_ix, _) = self.workspace_get(name)?;
        self.send_to_workspace_ix(node_ix, ws_ix)
    }

    pub fn send_to_workspace_ix(&mut self, node_ix: NodeIndex, ws_ix: NodeIndex) -> CommandResult {
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf | ContainerType::Split => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        let source_ws = self
            .workspace_of(node_ix)
            .ok_or_else(|| TreeError::NodeNotFound(self.tree[node_ix].get_id()))?;
        if source_ws == ws_ix {
            trace!("move: container already on that workspace");
            return Ok(());
        }
        // Floating subtrees travel with their wrapper.
        let moving_ix = match self
            .tree
            .ancestor_of_type(node_ix, ContainerType::FloatingWrapper)
        {
            Ok(wrapper_ix) => wrapper_ix,
            Err(_) => node_ix,
        };
        let source_visible = self.workspace_is_visible(source_ws);
        let target_visible = self.workspace_is_visible(ws_ix);
        let old_parent_ix = self.tree.parent_of(moving_ix)?;
        let need_refocus = self
            .focused
            .map(|f| f == moving_ix || self.is_descendant(f, moving_ix))
            .unwrap_or(false);

        self.tree.detach(moving_ix)?;
        if self.tree[moving_ix].get_type() == ContainerType::FloatingWrapper {
            let source_origin = self.tree[source_ws].get_geometry().unwrap().origin;
            let target_origin = self.tree[ws_ix].get_geometry().unwrap().origin;
            let rect = self.tree[moving_ix].get_geometry().unwrap();
            self.tree[moving_ix].set_geometry(rect.translate(
                target_origin.x - source_origin.x,
                target_origin.y - source_origin.y,
            ));
            self.tree.attach_child(ws_ix, moving_ix);
        } else {
            // Insert next to the target workspace's focus head, falling
            // back to the workspace itself when it is empty.
            let insert_parent = match self
                .tree
                .follow_focused_until(ws_ix, ContainerType::Leaf)
            {
                Ok(leaf_ix) => self.tree.parent_of(leaf_ix)?,
                Err(_) => ws_ix,
            };
            let insert_parent = match self.tree[insert_parent].get_type() {
                ContainerType::Split | ContainerType::Workspace => insert_parent,
                _ => ws_ix,
            };
            self.tree.attach_child(insert_parent, moving_ix);
        }

        match (source_visible, target_visible) {
            (true, false) => {
                for leaf_ix in self.tree.leaves_of(moving_ix) {
                    let window = self.tree[leaf_ix].window_id().unwrap();
                    self.tree[leaf_ix].bump_ignore_unmap();
                    self.pending_x.push(crate::x11::XOp::Unmap(window));
                }
            }
            (false, true) => {
                for leaf_ix in self.tree.leaves_of(moving_ix) {
                    let window = self.tree[leaf_ix].window_id().unwrap();
                    self.pending_x.push(crate::x11::XOp::Map(window));
                }
            }
            _ => {}
        }

        let (survivor, _) = self.repair_after_detach(old_parent_ix)?;
        // Focus stays on the source workspace when the focused container
        // itself was moved away; otherwise it is untouched.
        if need_refocus {
            self.focus_on_next_container(survivor);
        }
        self.update_urgent_flag(moving_ix);
        let name = self.tree[ws_ix].name();
        info!("Moved container to workspace {}", name);
        self.queue_event("window", json!({ "change": "move" }));
        self.validate();
        Ok(())
    }

    /// `move container to output <name>`: lands on the output's visible
    /// workspace.
    pub fn send_to_output(&mut self, node_ix: NodeIndex, output_name: &str) -> CommandResult {
        use super::workspace::WorkspaceErr;
        let output_ix = self.tree.output_ix_by_name(output_name).ok_or_else(|| {
            TreeError::Workspace(WorkspaceErr::OutputNotFound(output_name.into()))
        })?;
        let ws_ix = self
            .visible_workspace_of(output_ix)
            .ok_or(TreeError::Workspace(WorkspaceErr::NoOutputs))?;
        self.send_to_workspace_ix(node_ix, ws_ix)
    }

    /// Guard used by the executor: moving and focusing by direction is
    /// disabled while something is fullscreen on the workspace.
    pub fn fullscreen_on_workspace(&self, ws_ix: NodeIndex) -> bool {
        self.tree.leaves_of(ws_ix).into_iter().any(|leaf| {
            self.tree[leaf].fullscreen_mode() != FullscreenMode::None
        }) || self
            .tree
            .all_descendants_of(ws_ix)
            .into_iter()
            .any(|ix| {
                self.tree[ix].get_type() == ContainerType::Split
                    && self.tree[ix].fullscreen_mode() != FullscreenMode::None
            })
    }
}
