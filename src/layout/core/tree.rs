//! Main module to handle the layout.
//! This is where the i3-specific semantics live.

use std::fmt;

use log::{trace, warn};
use petgraph::graph::NodeIndex;
use serde_json::json;
use uuid::Uuid;

use super::super::actions::focus::FocusError;
use super::super::actions::movement::MovementError;
use super::super::actions::resize::ResizeErr;
use super::super::actions::workspace::WorkspaceErr;
use super::super::LayoutTree;
use super::container::{ContainerErr, ContainerType, FullscreenMode, Orientation};
use super::graph_tree::{GraphError, PERCENT_EPSILON};
use crate::x11::{WindowId, XOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Right,
    Left,
}

impl Direction {
    /// The orientation a container must have for movement in this
    /// direction to stay among its children.
    pub fn axis(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Whether this direction walks towards the head of the child list.
    pub fn towards_head(self) -> bool {
        matches!(self, Direction::Left | Direction::Up)
    }
}

/// What to do with the X window(s) of a closed container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillPolicy {
    /// Just drop the containers; the window is already gone.
    None,
    /// Ask nicely with `WM_DELETE_WINDOW`.
    Window,
    /// Disconnect the client.
    Client,
}

#[derive(Clone, Debug)]
pub enum TreeError {
    /// A node can not be found in the tree with this ID.
    NodeNotFound(Uuid),
    /// An X11 window could not be found in the tree.
    WindowNotFound(WindowId),
    /// There was no focused container.
    NoActiveContainer,
    /// The operation cannot be applied to this kind of container.
    InvalidOperationOn(ContainerType),
    /// There was an error in the graph; an invariant of one of the
    /// primitives was not held.
    PetGraph(GraphError),
    /// A container-level operation was misapplied.
    Container(ContainerErr),
    /// An error occurred while trying to focus a container.
    Focus(FocusError),
    /// An error occurred while trying to move a container.
    Movement(MovementError),
    /// An error occurred while trying to resize a container.
    Resize(ResizeErr),
    /// An error occurred in workspace management.
    Workspace(WorkspaceErr),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TreeError::NodeNotFound(id) => write!(f, "no container with id {}", id),
            TreeError::WindowNotFound(w) => write!(f, "no container for window {:#x}", w),
            TreeError::NoActiveContainer => write!(f, "no container is focused"),
            TreeError::InvalidOperationOn(c_type) => {
                write!(f, "operation not valid on a {:?} container", c_type)
            }
            TreeError::PetGraph(err) => write!(f, "tree inconsistency: {:?}", err),
            TreeError::Container(ref err) => write!(f, "container error: {:?}", err),
            TreeError::Focus(ref err) => write!(f, "focus error: {:?}", err),
            TreeError::Movement(ref err) => write!(f, "movement error: {:?}", err),
            TreeError::Resize(err) => write!(f, "resize error: {:?}", err),
            TreeError::Workspace(ref err) => write!(f, "workspace error: {:?}", err),
        }
    }
}

impl From<GraphError> for TreeError {
    fn from(err: GraphError) -> TreeError {
        TreeError::PetGraph(err)
    }
}

impl LayoutTree {
    /// The leaf at the end of the focus-stack chain from the root, if the
    /// chain ends at a leaf.
    pub fn focused_leaf(&self) -> Option<NodeIndex> {
        let leaf_ix = self.tree.follow_focused(self.tree.root_ix());
        if self.tree[leaf_ix].get_type() == ContainerType::Leaf {
            Some(leaf_ix)
        } else {
            None
        }
    }

    /// The focused container: the explicit focus target if set, else the
    /// focused leaf.
    pub fn focused_ix(&self) -> Option<NodeIndex> {
        self.focused.or_else(|| self.focused_leaf())
    }

    /// Gets the index of the currently focused container with the given
    /// type. Starts at the focused container and moves up until either a
    /// container with that type is found or the root node is hit.
    pub fn active_ix_of(&self, c_type: ContainerType) -> Option<NodeIndex> {
        let ix = self.focused_ix()?;
        if self.tree[ix].get_type() == c_type {
            Some(ix)
        } else {
            self.tree.ancestor_of_type(ix, c_type).ok()
        }
    }

    /// The workspace the node lives on.
    pub fn workspace_of(&self, node_ix: NodeIndex) -> Option<NodeIndex> {
        if self.tree[node_ix].get_type() == ContainerType::Workspace {
            return Some(node_ix);
        }
        self.tree
            .ancestor_of_type(node_ix, ContainerType::Workspace)
            .ok()
    }

    /// The output the node lives on.
    pub fn output_of(&self, node_ix: NodeIndex) -> Option<NodeIndex> {
        if self.tree[node_ix].get_type() == ContainerType::Output {
            return Some(node_ix);
        }
        self.tree.ancestor_of_type(node_ix, ContainerType::Output).ok()
    }

    /// The visible workspace of an output: the one fullscreened onto it.
    pub fn visible_workspace_of(&self, output_ix: NodeIndex) -> Option<NodeIndex> {
        let content_ix = self.tree.content_of(output_ix)?;
        self.tree
            .children_of(content_ix)
            .into_iter()
            .find(|ws| self.tree[*ws].fullscreen_mode() == FullscreenMode::Output)
    }

    /// Whether the workspace is the visible one on its output.
    pub fn workspace_is_visible(&self, ws_ix: NodeIndex) -> bool {
        self.tree[ws_ix].fullscreen_mode() == FullscreenMode::Output
    }

    /// Whether `node_ix` sits beneath `ancestor_ix`.
    pub fn is_descendant(&self, node_ix: NodeIndex, ancestor_ix: NodeIndex) -> bool {
        let mut cur_ix = node_ix;
        while let Ok(parent_ix) = self.tree.parent_of(cur_ix) {
            if parent_ix == ancestor_ix {
                return true;
            }
            cur_ix = parent_ix;
        }
        false
    }

    /// Recursive teardown. Queues the X teardown of every leaf under the
    /// node according to the kill policy, removes the subtree, then repairs
    /// the ancestors: empty and single-child splits are eliminated, empty
    /// wrappers die with their subtree, and a workspace emptied by the
    /// close is pruned if it is invisible and numbered.
    ///
    /// Returns the names of workspaces that became empty, for the event
    /// plumbing.
    pub fn close(
        &mut self,
        node_ix: NodeIndex,
        policy: KillPolicy,
    ) -> Result<Vec<String>, TreeError> {
        match self.tree[node_ix].get_type() {
            ContainerType::Leaf
            | ContainerType::Split
            | ContainerType::FloatingWrapper
            | ContainerType::Workspace => {}
            c_type => return Err(TreeError::InvalidOperationOn(c_type)),
        }
        for leaf_ix in self.tree.leaves_of(node_ix) {
            let window = self.tree[leaf_ix]
                .window_id()
                .expect("close: leaf without window");
            match policy {
                KillPolicy::None => {}
                KillPolicy::Window => {
                    self.pending_x.push(XOp::Unmap(window));
                    self.pending_x.push(XOp::SendDelete(window));
                }
                KillPolicy::Client => {
                    self.pending_x.push(XOp::Unmap(window));
                    self.pending_x.push(XOp::KillClient(window));
                }
            }
            self.queue_event("window", json!({ "change": "close", "window": window }));
        }
        let parent_ix = self.tree.parent_of(node_ix)?;
        let need_refocus = self
            .focused
            .map(|f| f == node_ix || self.is_descendant(f, node_ix))
            .unwrap_or(false)
            || self.focused.is_none();

        trace!("close: removing {:?} below {:?}", node_ix, parent_ix);
        self.tree.detach(node_ix)?;
        let mut doomed = self.tree.all_descendants_of(node_ix);
        doomed.push(node_ix);
        for ix in doomed.into_iter().rev() {
            self.tree.remove(ix);
        }
        if self.focused.map(|f| self.tree.get(f).is_none()).unwrap_or(false) {
            self.focused = None;
        }

        let (survivor, emptied) = self.repair_after_detach(parent_ix)?;

        if need_refocus {
            self.focus_on_next_container(survivor);
        }
        self.pending_x.push(XOp::UpdateClientList(self.client_list()));
        self.validate();
        Ok(emptied)
    }

    /// Walks up from the former parent of a detached node and repairs the
    /// structure: empty and single-child splits are eliminated, empty
    /// wrappers die, a workspace emptied by the detach is pruned if it is
    /// invisible and numbered. Returns the highest surviving ancestor and
    /// the names of workspaces that became empty.
    pub(crate) fn repair_after_detach(
        &mut self,
        start_ix: NodeIndex,
    ) -> Result<(NodeIndex, Vec<String>), TreeError> {
        let mut emptied = Vec::new();
        let mut survivor = start_ix;
        let mut cur_ix = start_ix;
        loop {
            match self.tree[cur_ix].get_type() {
                ContainerType::Split => {
                    let children = self.tree.children_of(cur_ix);
                    match children.len() {
                        0 => {
                            let parent = self.tree.parent_of(cur_ix)?;
                            self.tree.detach(cur_ix)?;
                            self.tree.remove(cur_ix);
                            cur_ix = parent;
                            survivor = parent;
                        }
                        1 => {
                            survivor = self.reduce_split(cur_ix)?;
                            break;
                        }
                        _ => break,
                    }
                }
                ContainerType::FloatingWrapper => {
                    if self.tree.children_of(cur_ix).is_empty() {
                        let parent = self.tree.parent_of(cur_ix)?;
                        self.tree.detach(cur_ix)?;
                        self.tree.remove(cur_ix);
                        cur_ix = parent;
                        survivor = parent;
                    } else {
                        break;
                    }
                }
                ContainerType::Workspace => {
                    survivor = cur_ix;
                    if self.tree.children_of(cur_ix).is_empty() {
                        let name = self.tree[cur_ix].name();
                        emptied.push(name.clone());
                        let visible = self.workspace_is_visible(cur_ix);
                        let internal = self.tree[cur_ix].is_internal();
                        let numbered =
                            self.tree[cur_ix].workspace_num().unwrap_or(-1) >= 0;
                        if !visible && !internal && numbered {
                            trace!("pruning emptied workspace {}", name);
                            let content = self.tree.parent_of(cur_ix)?;
                            self.tree.detach(cur_ix)?;
                            self.tree.remove(cur_ix);
                            survivor = content;
                            self.queue_event(
                                "workspace",
                                json!({ "change": "empty", "old": { "name": name } }),
                            );
                        }
                    }
                    break;
                }
                _ => {
                    survivor = cur_ix;
                    break;
                }
            }
        }
        Ok((survivor, emptied))
    }

    /// The single-child split elimination of the reduction rule: the split
    /// is replaced by its only child, which inherits its spatial slot,
    /// focus slot, and percent. Returns the parent.
    pub(crate) fn reduce_split(&mut self, split_ix: NodeIndex) -> Result<NodeIndex, TreeError> {
        debug_assert_eq!(self.tree[split_ix].get_type(), ContainerType::Split);
        let children = self.tree.children_of(split_ix);
        debug_assert_eq!(children.len(), 1);
        let child_ix = children[0];
        // The wrapped root of a floating wrapper keeps the floating state.
        let floating = self.tree[split_ix].floating_state();
        self.tree.detach(child_ix)?;
        let parent_ix = self.tree.replace(split_ix, child_ix)?;
        self.tree.remove(split_ix);
        if floating.is_floating() {
            let _ = self.tree[child_ix].set_floating_state(floating);
        }
        if self.focused == Some(split_ix) {
            self.focused = Some(child_ix);
        }
        trace!("reduced single-child split into {:?}", child_ix);
        Ok(parent_ix)
    }

    /// Settle-step flattening: a single-child split whose only child is
    /// itself a split carries no information and is eliminated. A split
    /// holding a single leaf survives (it is the passthrough produced by
    /// an explicit `split` command, waiting for siblings).
    pub(crate) fn flatten_redundant_splits(&mut self) {
        loop {
            let mut candidate = None;
            for node_ix in self.tree.all_descendants_of(self.tree.root_ix()) {
                if self.tree[node_ix].get_type() != ContainerType::Split {
                    continue;
                }
                let children = self.tree.children_of(node_ix);
                if children.len() == 1
                    && self.tree[children[0]].get_type() == ContainerType::Split
                {
                    candidate = Some(node_ix);
                    break;
                }
            }
            match candidate {
                Some(split_ix) => {
                    if let Err(err) = self.reduce_split(split_ix) {
                        warn!("flatten: could not reduce {:?}: {:?}", split_ix, err);
                        break;
                    }
                }
                None => break,
            }
        }
    }

    /// Prunes every invisible, empty, numbered workspace. Returns the
    /// pruned names.
    pub(crate) fn prune_empty_workspaces(&mut self) -> Vec<String> {
        let mut pruned = Vec::new();
        for ws_ix in self.tree.workspaces() {
            if !self.tree.children_of(ws_ix).is_empty() {
                continue;
            }
            if self.workspace_is_visible(ws_ix) || self.tree[ws_ix].is_internal() {
                continue;
            }
            if self.tree[ws_ix].workspace_num().unwrap_or(-1) < 0 {
                continue;
            }
            let name = self.tree[ws_ix].name();
            if let Ok(_) = self.tree.detach(ws_ix) {
                self.tree.remove(ws_ix);
                self.queue_event(
                    "workspace",
                    json!({ "change": "empty", "old": { "name": name } }),
                );
                pruned.push(name);
            }
        }
        pruned
    }

    /// Recomputes the urgency flags on the path from the node to its
    /// workspace. Leaves derive urgency from their window's hint, inner
    /// containers from their children. A change at the workspace level
    /// emits a workspace event.
    pub fn update_urgent_flag(&mut self, node_ix: NodeIndex) {
        let mut cur_ix = node_ix;
        loop {
            let c_type = self.tree[cur_ix].get_type();
            let urgent = match c_type {
                ContainerType::Leaf => self.tree[cur_ix]
                    .window()
                    .map(|w| w.urgent)
                    .unwrap_or(false),
                _ => self
                    .tree
                    .children_of(cur_ix)
                    .iter()
                    .any(|child| self.tree[*child].urgent()),
            };
            let changed = self.tree[cur_ix].urgent() != urgent;
            self.tree[cur_ix].set_urgent(urgent);
            if c_type == ContainerType::Workspace {
                if changed {
                    let name = self.tree[cur_ix].name();
                    self.queue_event(
                        "workspace",
                        json!({ "change": "urgent",
                                "current": { "name": name, "urgent": urgent } }),
                    );
                }
                return;
            }
            match self.tree.parent_of(cur_ix) {
                Ok(parent_ix) => cur_ix = parent_ix,
                Err(_) => return,
            }
        }
    }

    /// Every managed window id, in tree order. Feeds `_NET_CLIENT_LIST`.
    pub fn client_list(&self) -> Vec<WindowId> {
        self.tree
            .leaves_of(self.tree.root_ix())
            .into_iter()
            .filter_map(|leaf| self.tree[leaf].window_id())
            .collect()
    }

    /// Validates the tree invariants.
    #[cfg(debug_assertions)]
    pub fn validate(&self) {
        // Recursive check that child/parent nodes are connected and the
        // kind discipline holds on every edge.
        fn validate_connections(this: &LayoutTree, parent_ix: NodeIndex) {
            let parent_type = this.tree[parent_ix].get_type();
            for child_ix in this.tree.children_of(parent_ix) {
                let child_parent = this
                    .tree
                    .parent_of(child_ix)
                    .expect("connections: child did not point to parent!");
                assert_eq!(child_parent, parent_ix, "child has the wrong parent");
                let child_type = this.tree[child_ix].get_type();
                assert!(
                    parent_type.can_have_child(child_type),
                    "kind discipline violated: {:?} has a {:?} child",
                    parent_type,
                    child_type
                );
                validate_connections(this, child_ix);
            }
        }
        validate_connections(self, self.tree.root_ix());

        // Both sibling orders must be gap-free.
        fn validate_orders(this: &LayoutTree, parent_ix: NodeIndex) {
            let children = this.tree.children_of(parent_ix);
            for (pos, child_ix) in children.iter().enumerate() {
                let path = this
                    .tree
                    .get_edge_weight_between(parent_ix, *child_ix)
                    .expect("child had no edge weight");
                assert_eq!(
                    path.weight,
                    pos as u32 + 1,
                    "hole or duplicate in sibling weights"
                );
            }
            let by_rank = this.tree.focus_children_of(parent_ix);
            for (pos, child_ix) in by_rank.iter().enumerate() {
                let path = this
                    .tree
                    .get_edge_weight_between(parent_ix, *child_ix)
                    .expect("child had no edge weight");
                assert_eq!(
                    path.rank,
                    pos as u32 + 1,
                    "hole or duplicate in focus ranks"
                );
            }
            for child_ix in children {
                validate_orders(this, child_ix);
            }
        }
        validate_orders(self, self.tree.root_ix());

        // Tiling children sum to one, once the solver has assigned shares.
        for node_ix in self.tree.all_descendants_of(self.tree.root_ix()) {
            match self.tree[node_ix].get_type() {
                ContainerType::Workspace | ContainerType::Split => {}
                _ => continue,
            }
            let children = self.tree.tiling_children_of(node_ix);
            if children.is_empty() {
                continue;
            }
            let sum: f64 = children.iter().map(|c| self.tree.percent_of(*c)).sum();
            if sum > PERCENT_EPSILON {
                assert!(
                    (sum - 1.0).abs() < 1e-3,
                    "tiling children of {:?} sum to {}",
                    node_ix,
                    sum
                );
            }
        }

        // At most one visible workspace per output.
        for output_ix in self.tree.outputs() {
            if let Some(content_ix) = self.tree.content_of(output_ix) {
                let visible = self
                    .tree
                    .children_of(content_ix)
                    .into_iter()
                    .filter(|ws| self.tree[*ws].fullscreen_mode() == FullscreenMode::Output)
                    .count();
                assert!(
                    visible <= 1,
                    "output {:?} has {} visible workspaces",
                    self.tree[output_ix].name(),
                    visible
                );
            }
        }

        // The focused container must still exist.
        if let Some(focused_ix) = self.focused {
            assert!(
                self.tree.get(focused_ix).is_some(),
                "focused container is gone"
            );
        }
    }

    #[cfg(not(debug_assertions))]
    pub fn validate(&self) {}
}

#[cfg(test)]
pub mod tests {
    use super::super::super::LayoutTree;
    use super::*;
    use crate::config::Config;
    use crate::geometry::Geometry;
    use crate::layout::{Container, Layout};
    use crate::manage::Window;

    /// Makes a basic world: one real output ("fake-0", 800x600 at the
    /// origin) with workspace "1" visible holding one leaf, workspace "2"
    /// holding a split with two leaves.
    pub fn basic_tree() -> LayoutTree {
        let mut tree = LayoutTree::new(Config::default());
        tree.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let leaf = tree
            .tree
            .add_child(ws_1, Container::new_leaf(Window::for_tests(100)), true);
        tree.focused = Some(leaf);
        let ws_2 = {
            let content = tree.tree.parent_of(ws_1).unwrap();
            tree.tree.add_child(
                content,
                Container::new_workspace("2".into(), Geometry::new(0, 0, 800, 600), Layout::Split),
                false,
            )
        };
        let split = tree.tree.add_child(
            ws_2,
            Container::new_split(
                Layout::Split,
                crate::layout::Orientation::Horizontal,
                Geometry::new(0, 0, 800, 600),
            ),
            false,
        );
        tree.tree
            .add_child(split, Container::new_leaf(Window::for_tests(200)), false);
        tree.tree
            .add_child(split, Container::new_leaf(Window::for_tests(201)), false);
        tree.validate();
        tree
    }

    #[test]
    fn focused_leaf_follows_ranks() {
        let tree = basic_tree();
        let leaf = tree.focused_leaf().expect("no focused leaf");
        assert_eq!(tree.tree[leaf].window_id(), Some(100));
    }

    #[test]
    fn close_leaf_prunes_singleton_split() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.close(leaves[0], KillPolicy::Window).unwrap();
        // The split had two leaves; removing one reduces it away.
        let remaining = tree.tree.children_of(ws_2);
        assert_eq!(remaining.len(), 1);
        assert_eq!(tree.tree[remaining[0]].get_type(), ContainerType::Leaf);
        assert_eq!(tree.tree[remaining[0]].window_id(), Some(201));
    }

    #[test]
    fn close_emits_delete_for_window_policy() {
        let mut tree = basic_tree();
        let leaf = tree.focused_leaf().unwrap();
        tree.close(leaf, KillPolicy::Window).unwrap();
        let ops = tree.take_pending_x();
        assert!(ops.contains(&XOp::Unmap(100)));
        assert!(ops.contains(&XOp::SendDelete(100)));
        assert!(!ops.iter().any(|op| matches!(op, XOp::KillClient(_))));
    }

    #[test]
    fn close_last_leaf_of_invisible_workspace_prunes_it() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let emptied = tree.close(split, KillPolicy::Window).unwrap();
        assert_eq!(emptied, vec!["2".to_string()]);
        assert!(tree.tree.workspace_ix_by_name("2").is_none());
    }

    #[test]
    fn close_last_leaf_of_visible_workspace_keeps_it() {
        let mut tree = basic_tree();
        let leaf = tree.focused_leaf().unwrap();
        let emptied = tree.close(leaf, KillPolicy::Window).unwrap();
        assert_eq!(emptied, vec!["1".to_string()]);
        // Workspace 1 is visible; it survives empty.
        assert!(tree.tree.workspace_ix_by_name("1").is_some());
    }

    #[test]
    fn named_workspaces_survive_emptying() {
        let mut tree = basic_tree();
        let content = {
            let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
            tree.tree.parent_of(ws_1).unwrap()
        };
        let named = tree.tree.add_child(
            content,
            Container::new_workspace("mail".into(), Geometry::new(0, 0, 800, 600), Layout::Split),
            false,
        );
        let leaf = tree
            .tree
            .add_child(named, Container::new_leaf(Window::for_tests(300)), false);
        tree.close(leaf, KillPolicy::Window).unwrap();
        assert!(tree.tree.workspace_ix_by_name("mail").is_some());
    }

    #[test]
    fn urgency_propagates_to_workspace() {
        let mut tree = basic_tree();
        let leaf = tree.focused_leaf().unwrap();
        tree.tree[leaf].window_mut().unwrap().urgent = true;
        tree.update_urgent_flag(leaf);
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        assert!(tree.tree[ws_1].urgent());
        let events = tree.take_pending_events();
        assert!(events.iter().any(|e| e.name == "workspace"));
        tree.tree[leaf].window_mut().unwrap().urgent = false;
        tree.update_urgent_flag(leaf);
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        assert!(!tree.tree[ws_1].urgent());
    }
}
