//! Floating toggles, fullscreen modes, and the scratchpad.

use log::trace;
use petgraph::graph::NodeIndex;
use serde_json::json;

use super::super::core::container::{
    Container, ContainerType, FloatingState, FullscreenMode,
};
use super::super::{CommandResult, LayoutTree, TreeError, SCRATCH_WORKSPACE};
use crate::geometry::Geometry;
use crate::x11::XOp;

impl LayoutTree {
    /// `floating enable`: detaches the container from tiling and wraps it
    /// in a fresh floating wrapper on its workspace. `user` distinguishes
    /// an explicit command from a window-type implied float.
    pub fn float_container(&mut self, node_ix: NodeIndex, user: bool) -> CommandResult {
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf | ContainerType::Split => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        if self.tree[node_ix].floating() {
            return Ok(());
        }
        let ws_ix = self
            .workspace_of(node_ix)
            .ok_or_else(|| TreeError::NodeNotFound(self.tree[node_ix].get_id()))?;
        let old_parent_ix = self.tree.parent_of(node_ix)?;
        let mut rect = self.tree[node_ix].get_geometry().unwrap_or_else(Geometry::zero);
        if rect.size.w == 0 || rect.size.h == 0 {
            rect = self.tree[node_ix]
                .window()
                .map(|w| w.geometry)
                .unwrap_or(rect);
        }
        // A window that never got a position is centered on its workspace.
        if rect.origin.x == 0 && rect.origin.y == 0 {
            let ws_rect = self.tree[ws_ix].get_geometry().unwrap();
            rect = rect.center_in(ws_rect);
        }

        self.tree.detach(node_ix)?;
        let wrapper_ix = self
            .tree
            .add_node_detached(Container::new_floating_wrapper(rect));
        self.tree.attach_child(ws_ix, wrapper_ix);
        self.tree.attach_child(wrapper_ix, node_ix);
        let state = if user { FloatingState::UserOn } else { FloatingState::AutoOn };
        let _ = self.tree[node_ix].set_floating_state(state);

        if self.tree.get(old_parent_ix).is_some() {
            let _ = self.repair_after_detach(old_parent_ix)?;
        }
        self.tree.set_focus_path(node_ix);
        self.focused = Some(node_ix);
        self.queue_event("window", json!({ "change": "floating" }));
        self.validate();
        Ok(())
    }

    /// `floating disable`: unwraps the container and re-inserts it into
    /// the tiling side of its workspace, next to the tiling focus head.
    pub fn unfloat_container(&mut self, node_ix: NodeIndex, user: bool) -> CommandResult {
        if !self.tree[node_ix].floating() {
            return Ok(());
        }
        let wrapper_ix = self.tree.parent_of(node_ix)?;
        if self.tree[wrapper_ix].get_type() != ContainerType::FloatingWrapper {
            return Err(TreeError::InvalidOperationOn(
                self.tree[wrapper_ix].get_type(),
            ));
        }
        let ws_ix = self.tree.parent_of(wrapper_ix)?;
        self.tree.detach(node_ix)?;
        self.tree.detach(wrapper_ix)?;
        self.tree.remove(wrapper_ix);

        // Back into tiling next to the workspace's tiling focus head.
        let insert_parent = self
            .tree
            .tiling_children_of(ws_ix)
            .first()
            .map(|first| {
                let head = self.tree.follow_focused(*first);
                self.tree
                    .parent_of(head)
                    .unwrap_or(ws_ix)
            })
            .unwrap_or(ws_ix);
        let insert_parent = match self.tree[insert_parent].get_type() {
            ContainerType::Split | ContainerType::Workspace => insert_parent,
            _ => ws_ix,
        };
        self.tree.attach_child(insert_parent, node_ix);
        let state = if user { FloatingState::UserOff } else { FloatingState::AutoOff };
        let _ = self.tree[node_ix].set_floating_state(state);
        self.tree.set_focus_path(node_ix);
        self.focused = Some(node_ix);
        self.queue_event("window", json!({ "change": "floating" }));
        self.validate();
        Ok(())
    }

    pub fn toggle_floating(&mut self, node_ix: NodeIndex) -> CommandResult {
        if self.tree[node_ix].floating() {
            self.unfloat_container(node_ix, true)
        } else {
            self.float_container(node_ix, true)
        }
    }

    /// `fullscreen enable|disable [global]`. `global` is exclusive: at
    /// most one fullscreen container exists anywhere while it is set.
    pub fn set_fullscreen(
        &mut self,
        node_ix: NodeIndex,
        enable: bool,
        global: bool,
    ) -> CommandResult {
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf | ContainerType::Split => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        if !enable {
            let _ = self.tree[node_ix].set_fullscreen_mode(FullscreenMode::None);
            self.queue_event("window", json!({ "change": "fullscreen_mode" }));
            self.validate();
            return Ok(());
        }
        let mode = if global { FullscreenMode::Global } else { FullscreenMode::Output };
        // Drop every other fullscreen container first: per output for
        // plain fullscreen, everywhere for global.
        let scope_ix = if global {
            self.tree.root_ix()
        } else {
            self.output_of(node_ix)
                .ok_or_else(|| TreeError::NodeNotFound(self.tree[node_ix].get_id()))?
        };
        for other_ix in self.tree.all_descendants_of(scope_ix) {
            if other_ix == node_ix {
                continue;
            }
            match self.tree[other_ix].get_type() {
                ContainerType::Leaf | ContainerType::Split => {
                    if self.tree[other_ix].fullscreen_mode() != FullscreenMode::None {
                        trace!("fullscreen: displacing {:?}", other_ix);
                        let _ = self.tree[other_ix].set_fullscreen_mode(FullscreenMode::None);
                    }
                }
                _ => {}
            }
        }
        // A global request also displaces fullscreen containers on other
        // outputs.
        if global {
            for other_ix in self.tree.all_descendants_of(self.tree.root_ix()) {
                if other_ix != node_ix
                    && matches!(
                        self.tree[other_ix].get_type(),
                        ContainerType::Leaf | ContainerType::Split
                    )
                    && self.tree[other_ix].fullscreen_mode() != FullscreenMode::None
                {
                    let _ = self.tree[other_ix].set_fullscreen_mode(FullscreenMode::None);
                }
            }
        }
        let _ = self.tree[node_ix].set_fullscreen_mode(mode);
        self.queue_event("window", json!({ "change": "fullscreen_mode" }));
        self.validate();
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self, node_ix: NodeIndex, global: bool) -> CommandResult {
        let enable = self.tree[node_ix].fullscreen_mode() == FullscreenMode::None;
        self.set_fullscreen(node_ix, enable, global)
    }

    /// `move scratchpad`: floats the container if needed and stashes its
    /// wrapper on the internal scratchpad workspace.
    pub fn move_to_scratchpad(&mut self, node_ix: NodeIndex) -> CommandResult {
        if !self.tree[node_ix].floating() {
            self.float_container(node_ix, false)?;
        }
        let wrapper_ix = self.tree.parent_of(node_ix)?;
        let scratch_ix = self
            .tree
            .workspace_ix_by_name(SCRATCH_WORKSPACE)
            .expect("scratchpad workspace missing");
        let old_parent_ix = self.tree.parent_of(wrapper_ix)?;
        self.tree.detach(wrapper_ix)?;
        self.tree.attach_child(scratch_ix, wrapper_ix);
        for leaf_ix in self.tree.leaves_of(wrapper_ix) {
            let window = self.tree[leaf_ix].window_id().unwrap();
            self.tree[leaf_ix].bump_ignore_unmap();
            self.queue_x(XOp::Unmap(window));
        }
        let (survivor, _) = self.repair_after_detach(old_parent_ix)?;
        self.focus_on_next_container(survivor);
        self.queue_event("window", json!({ "change": "move" }));
        self.validate();
        Ok(())
    }

    /// `scratchpad show`: fetches the most recently stashed container onto
    /// the current workspace, centered; if the focused container is a
    /// shown scratchpad window, it is stashed back instead.
    pub fn scratchpad_show(&mut self) -> CommandResult {
        let scratch_ix = self
            .tree
            .workspace_ix_by_name(SCRATCH_WORKSPACE)
            .expect("scratchpad workspace missing");
        // Toggle away a shown scratchpad container.
        if let Some(focused_ix) = self.focused_ix() {
            if self.tree[focused_ix].floating_state() == FloatingState::AutoOn
                && self
                    .tree
                    .ancestor_of_type(focused_ix, ContainerType::FloatingWrapper)
                    .is_ok()
                && self.workspace_of(focused_ix) != Some(scratch_ix)
            {
                return self.move_to_scratchpad(focused_ix);
            }
        }
        let wrapper_ix = self
            .tree
            .focus_children_of(scratch_ix)
            .into_iter()
            .next()
            .ok_or(TreeError::NoActiveContainer)?;
        let ws_ix = self
            .focused_ix()
            .and_then(|f| self.workspace_of(f))
            .or_else(|| {
                self.focused_output()
                    .ok()
                    .and_then(|o| self.visible_workspace_of(o))
            })
            .ok_or(TreeError::NoActiveContainer)?;
        self.tree.detach(wrapper_ix)?;
        self.tree.attach_child(ws_ix, wrapper_ix);
        let ws_rect = self.tree[ws_ix].get_geometry().unwrap();
        let rect = self.tree[wrapper_ix].get_geometry().unwrap().center_in(ws_rect);
        self.tree[wrapper_ix].set_geometry(rect);
        for leaf_ix in self.tree.leaves_of(wrapper_ix) {
            let window = self.tree[leaf_ix].window_id().unwrap();
            self.queue_x(XOp::Map(window));
        }
        let focus_ix = self.tree.follow_focused(wrapper_ix);
        if self.tree[focus_ix].get_type() == ContainerType::Leaf {
            self.focus_node(focus_ix)?;
        }
        self.validate();
        Ok(())
    }
}
