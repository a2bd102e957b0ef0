//! The command executor: applies parsed commands to the tree, then runs
//! the settle step that restores the invariants and queues the resulting
//! X11 traffic.

use log::{debug, trace};
use petgraph::graph::NodeIndex;

use super::parse;
use super::{
    Command, CommandReply, FocusTarget, LayoutArg, MoveTarget, Op, ToggleArg, WorkspaceTarget,
};
use crate::layout::{
    CommandResult, ContainerType, Layout, LayoutTree, RunControl, TreeError,
};

impl LayoutTree {
    /// Executes a full command string: one reply per `;`-separated
    /// command, in input order, followed by a single settle step. A parse
    /// failure fails only its own command.
    pub fn execute_str(&mut self, input: &str) -> Vec<CommandReply> {
        debug!("executing: {}", input);
        let mut replies = Vec::new();
        for parsed in parse::parse(input) {
            match parsed {
                Ok(command) => replies.push(self.execute_command(&command)),
                Err(err) => replies.push(CommandReply::err(err.message)),
            }
        }
        self.settle();
        replies
    }

    fn execute_command(&mut self, command: &Command) -> CommandReply {
        for op in &command.ops {
            let result = if command.criteria.is_empty() {
                self.apply_op(op, None)
            } else {
                // The selection is re-evaluated before every operation:
                // an op may have moved leaves around or killed them.
                let selection: Vec<NodeIndex> = self
                    .tree
                    .leaves_of(self.tree.root_ix())
                    .into_iter()
                    .filter(|leaf| command.criteria.matches_leaf(self, *leaf))
                    .collect();
                if selection.is_empty() {
                    // Criteria matching nothing is not an error.
                    trace!("criteria matched no leaves");
                    Ok(())
                } else {
                    selection
                        .into_iter()
                        .try_for_each(|leaf_ix| self.apply_op(op, Some(leaf_ix)))
                }
            };
            if let Err(err) = result {
                return CommandReply::err(err.to_string());
            }
        }
        CommandReply::ok()
    }

    /// Applies one operation to an explicit target, or to the focused
    /// container when none is given.
    fn apply_op(&mut self, op: &Op, target: Option<NodeIndex>) -> CommandResult {
        let target_or_focused = |tree: &LayoutTree| {
            target
                .or_else(|| tree.focused_ix())
                .ok_or(TreeError::NoActiveContainer)
        };
        match *op {
            Op::Focus(FocusTarget::Direction(direction)) => {
                if self.focus_locked_by_fullscreen() {
                    return Ok(());
                }
                match target {
                    Some(node_ix) => {
                        let neighbor = self.neighbor_in_direction(node_ix, direction)?;
                        let leaf_ix = self.tree.follow_focused(neighbor);
                        self.focus_node(leaf_ix)
                    }
                    None => self.focus_direction(direction),
                }
            }
            Op::Focus(FocusTarget::Parent) => {
                if let Some(node_ix) = target {
                    self.focus_node(node_ix)?;
                }
                self.focus_parent()
            }
            Op::Focus(FocusTarget::Child) => {
                if let Some(node_ix) = target {
                    self.focus_node(node_ix)?;
                }
                self.focus_child()
            }
            Op::Focus(FocusTarget::Floating) => self.focus_side(true),
            Op::Focus(FocusTarget::Tiling) => self.focus_side(false),
            Op::Focus(FocusTarget::ModeToggle) => self.focus_mode_toggle(),
            Op::Move(MoveTarget::Direction(direction)) => {
                if self.focus_locked_by_fullscreen() {
                    return Ok(());
                }
                let node_ix = target_or_focused(self)?;
                self.move_container(node_ix, direction)
            }
            Op::Move(MoveTarget::ToWorkspace(ref name)) => {
                let node_ix = target_or_focused(self)?;
                self.send_to_workspace(node_ix, name)
            }
            Op::Move(MoveTarget::ToWorkspaceNumber(number)) => {
                let node_ix = target_or_focused(self)?;
                let name = self.workspace_name_for_number(number);
                self.send_to_workspace(node_ix, &name)
            }
            Op::Move(MoveTarget::ToWorkspaceCurrent) => {
                let node_ix = target_or_focused(self)?;
                let ws_ix = self.focused_or_visible_workspace()?;
                self.send_to_workspace_ix(node_ix, ws_ix)
            }
            Op::Move(MoveTarget::WorkspaceNext) => {
                let node_ix = target_or_focused(self)?;
                let ws_ix = self.relative_workspace_of(node_ix, true)?;
                self.send_to_workspace_ix(node_ix, ws_ix)
            }
            Op::Move(MoveTarget::WorkspacePrev) => {
                let node_ix = target_or_focused(self)?;
                let ws_ix = self.relative_workspace_of(node_ix, false)?;
                self.send_to_workspace_ix(node_ix, ws_ix)
            }
            Op::Move(MoveTarget::ToOutput(ref name)) => {
                let node_ix = target_or_focused(self)?;
                self.send_to_output(node_ix, name)
            }
            Op::Move(MoveTarget::WorkspaceToOutput(ref name)) => {
                let node_ix = target_or_focused(self)?;
                let ws_ix = self
                    .workspace_of(node_ix)
                    .ok_or(TreeError::NoActiveContainer)?;
                self.move_workspace_to_output(ws_ix, name)
            }
            Op::Move(MoveTarget::Scratchpad) => {
                let node_ix = target_or_focused(self)?;
                self.move_to_scratchpad(node_ix)
            }
            Op::Resize { grow, direction, px, ppt } => {
                let node_ix = target_or_focused(self)?;
                self.resize(node_ix, direction, grow, px, ppt)
            }
            Op::Split(orientation) => {
                let node_ix = target_or_focused(self)?;
                self.split_node(node_ix, orientation)
            }
            Op::Layout(LayoutArg::Default) => {
                let node_ix = target_or_focused(self)?;
                self.set_layout_of(node_ix, Layout::Split)
            }
            Op::Layout(LayoutArg::Stacked) => {
                let node_ix = target_or_focused(self)?;
                self.set_layout_of(node_ix, Layout::Stacked)
            }
            Op::Layout(LayoutArg::Tabbed) => {
                let node_ix = target_or_focused(self)?;
                self.set_layout_of(node_ix, Layout::Tabbed)
            }
            Op::Layout(LayoutArg::Toggle) => {
                let node_ix = target_or_focused(self)?;
                self.toggle_layout_of(node_ix)
            }
            Op::Floating(arg) => {
                let node_ix = target_or_focused(self)?;
                match arg {
                    ToggleArg::Enable => self.float_container(node_ix, true),
                    ToggleArg::Disable => self.unfloat_container(node_ix, true),
                    ToggleArg::Toggle => self.toggle_floating(node_ix),
                }
            }
            Op::Fullscreen { arg, global } => {
                let node_ix = target_or_focused(self)?;
                match arg {
                    ToggleArg::Enable => self.set_fullscreen(node_ix, true, global),
                    ToggleArg::Disable => self.set_fullscreen(node_ix, false, global),
                    ToggleArg::Toggle => self.toggle_fullscreen(node_ix, global),
                }
            }
            Op::Kill(policy) => {
                let node_ix = target_or_focused(self)?;
                self.close(node_ix, policy).map(|_| ())
            }
            Op::Mark(ref mark) => {
                let node_ix = target_or_focused(self)?;
                self.set_unique_mark(node_ix, mark)
            }
            Op::Unmark(ref mark) => {
                self.clear_mark(target, mark.as_deref());
                Ok(())
            }
            Op::Workspace(WorkspaceTarget::Name(ref name)) => self.switch_to_workspace(name),
            Op::Workspace(WorkspaceTarget::Number(number)) => {
                self.switch_to_workspace_number(number)
            }
            Op::Workspace(WorkspaceTarget::BackAndForth) => self.workspace_back_and_forth(),
            Op::Workspace(WorkspaceTarget::Next) => self.workspace_relative(true, false),
            Op::Workspace(WorkspaceTarget::Prev) => self.workspace_relative(false, false),
            Op::Workspace(WorkspaceTarget::NextOnOutput) => self.workspace_relative(true, true),
            Op::Workspace(WorkspaceTarget::PrevOnOutput) => self.workspace_relative(false, true),
            Op::ScratchpadShow => self.scratchpad_show(),
            Op::Sticky(arg, ref group) => {
                let node_ix = target_or_focused(self)?;
                self.set_sticky(node_ix, arg, group.as_deref())
            }
            Op::Exec(ref command_line) => {
                self.pending_exec.push(command_line.clone());
                Ok(())
            }
            Op::Nop(_) => Ok(()),
            Op::Restart => {
                self.control = Some(RunControl::Restart);
                Ok(())
            }
            Op::Reload => {
                self.control = Some(RunControl::Reload);
                Ok(())
            }
            Op::Exit => {
                self.control = Some(RunControl::Exit);
                Ok(())
            }
        }
    }

    /// The settle step: reduce redundant splits, fix percentages,
    /// recompute urgency, prune drained workspaces, and recompute the
    /// geometry. The queued X requests are drained by the reactor
    /// afterwards, in one flush.
    pub fn settle(&mut self) {
        self.flatten_redundant_splits();
        for node_ix in self.tree.all_descendants_of(self.tree.root_ix()) {
            match self.tree.node_type(node_ix) {
                Some(ContainerType::Workspace) | Some(ContainerType::Split) => {
                    self.tree.fix_percent(node_ix);
                }
                _ => {}
            }
        }
        self.recompute_urgent(self.tree.root_ix());
        let _ = self.prune_empty_workspaces();
        self.arrange();
        let workareas: Vec<_> = self
            .ordered_workspaces(None)
            .into_iter()
            .filter_map(|ws| self.tree[ws].get_geometry())
            .collect();
        self.queue_x(crate::x11::XOp::UpdateWorkarea(workareas));
        self.validate();
    }

    /// Post-order urgency recomputation over a whole subtree.
    fn recompute_urgent(&mut self, node_ix: NodeIndex) -> bool {
        let c_type = self.tree[node_ix].get_type();
        let urgent = if c_type == ContainerType::Leaf {
            self.tree[node_ix]
                .window()
                .map(|w| w.urgent)
                .unwrap_or(false)
        } else {
            let mut any = false;
            for child_ix in self.tree.children_of(node_ix) {
                if self.recompute_urgent(child_ix) {
                    any = true;
                }
            }
            any
        };
        let changed = self.tree[node_ix].urgent() != urgent;
        self.tree[node_ix].set_urgent(urgent);
        if changed && c_type == ContainerType::Workspace {
            let name = self.tree[node_ix].name();
            self.queue_event(
                "workspace",
                serde_json::json!({ "change": "urgent",
                                    "current": { "name": name, "urgent": urgent } }),
            );
        }
        urgent
    }

    /// Directional focus and movement are locked while something is
    /// fullscreen on the focused workspace.
    fn focus_locked_by_fullscreen(&self) -> bool {
        self.focused_ix()
            .and_then(|f| self.workspace_of(f))
            .map(|ws| self.fullscreen_on_workspace(ws))
            .unwrap_or(false)
    }

    /// `focus floating` / `focus tiling`.
    fn focus_side(&mut self, floating: bool) -> CommandResult {
        let focused_ix = self.focused_ix().ok_or(TreeError::NoActiveContainer)?;
        let currently_floating = self
            .tree
            .ancestor_of_type(focused_ix, ContainerType::FloatingWrapper)
            .is_ok();
        if currently_floating == floating {
            return Ok(());
        }
        self.focus_mode_toggle()
    }

    /// Name of the workspace with this number, or the number itself for a
    /// fresh one.
    fn workspace_name_for_number(&self, number: i32) -> String {
        self.tree
            .workspaces()
            .into_iter()
            .find(|ws| self.tree[*ws].workspace_num() == Some(number))
            .map(|ws| self.tree[ws].name())
            .unwrap_or_else(|| number.to_string())
    }

    /// The workspace after/before the node's own, in traversal order.
    fn relative_workspace_of(
        &mut self,
        node_ix: NodeIndex,
        forwards: bool,
    ) -> Result<NodeIndex, TreeError> {
        let current_ws = self
            .workspace_of(node_ix)
            .ok_or(TreeError::NoActiveContainer)?;
        let ordered = self.ordered_workspaces(None);
        let pos = ordered
            .iter()
            .position(|ws| *ws == current_ws)
            .unwrap_or(0);
        let next = if forwards {
            (pos + 1) % ordered.len()
        } else {
            (pos + ordered.len() - 1) % ordered.len()
        };
        Ok(ordered[next])
    }

    /// Marks are unique: setting one steals it from any other leaf.
    fn set_unique_mark(&mut self, node_ix: NodeIndex, mark: &str) -> CommandResult {
        for leaf_ix in self.tree.leaves_of(self.tree.root_ix()) {
            if self.tree[leaf_ix].mark() == Some(mark) {
                let _ = self.tree[leaf_ix].set_mark(None);
            }
        }
        self.tree[node_ix]
            .set_mark(Some(mark.to_string()))
            .map_err(TreeError::Container)
    }

    /// `unmark <m>` drops the mark wherever it is; bare `unmark` drops
    /// the target's mark (or every mark without a target).
    fn clear_mark(&mut self, target: Option<NodeIndex>, mark: Option<&str>) {
        match (target, mark) {
            (_, Some(mark)) => {
                for leaf_ix in self.tree.leaves_of(self.tree.root_ix()) {
                    if self.tree[leaf_ix].mark() == Some(mark) {
                        let _ = self.tree[leaf_ix].set_mark(None);
                    }
                }
            }
            (Some(node_ix), None) => {
                let _ = self.tree[node_ix].set_mark(None);
            }
            (None, None) => {
                for leaf_ix in self.tree.leaves_of(self.tree.root_ix()) {
                    let _ = self.tree[leaf_ix].set_mark(None);
                }
            }
        }
    }

    fn set_sticky(
        &mut self,
        node_ix: NodeIndex,
        arg: ToggleArg,
        group: Option<&str>,
    ) -> CommandResult {
        let enable = match arg {
            ToggleArg::Enable => true,
            ToggleArg::Disable => false,
            ToggleArg::Toggle => self.tree[node_ix].sticky_group().is_none(),
        };
        match self.tree[node_ix] {
            crate::layout::Container::Leaf { ref mut sticky_group, .. } => {
                *sticky_group = if enable {
                    Some(group.unwrap_or("default").to_string())
                } else {
                    None
                };
                Ok(())
            }
            ref other => Err(TreeError::InvalidOperationOn(other.get_type())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::layout::core::tree::tests::basic_tree;
    use crate::layout::{ContainerType, FullscreenMode, RunControl};

    #[test]
    fn kill_sequence_empties_the_workspace() {
        for input in ["kill ; kill", "kill;kill", "kill\t;  kill"] {
            let mut tree = basic_tree();
            tree.switch_to_workspace("2").unwrap();
            let replies = tree.execute_str(input);
            assert_eq!(replies.len(), 2);
            assert!(replies.iter().all(|r| r.success), "{:?}", replies);
            let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
            assert!(tree.tree.children_of(ws_2).is_empty());
        }
    }

    #[test]
    fn criteria_select_the_right_leaf() {
        let mut tree = basic_tree();
        let replies = tree.execute_str(r#"[title="0xc8$"] mark two-hundred"#);
        assert!(replies[0].success);
        // Window 200 formats as 0xc8.
        let leaf = tree.tree.lookup_window(200).unwrap();
        assert_eq!(tree.tree[leaf].mark(), Some("two-hundred"));
        let other = tree.tree.lookup_window(100).unwrap();
        assert_eq!(tree.tree[other].mark(), None);
    }

    #[test]
    fn empty_selection_is_success() {
        let mut tree = basic_tree();
        let replies = tree.execute_str(r#"[class="NoSuchClass"] kill"#);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].success);
        // Nothing was killed.
        assert_eq!(tree.tree.leaves_of(tree.tree.root_ix()).len(), 3);
    }

    #[test]
    fn invalid_command_does_not_stop_the_rest() {
        let mut tree = basic_tree();
        let replies = tree.execute_str("frobnicate ; workspace 2");
        assert_eq!(replies.len(), 2);
        assert!(!replies[0].success);
        assert!(replies[0].error.is_some());
        assert!(replies[1].success);
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        assert!(tree.workspace_is_visible(ws_2));
    }

    #[test]
    fn mark_is_unique_across_leaves() {
        let mut tree = basic_tree();
        tree.execute_str("mark a");
        tree.switch_to_workspace("2").unwrap();
        tree.execute_str("mark a");
        let marked: Vec<_> = tree
            .tree
            .leaves_of(tree.tree.root_ix())
            .into_iter()
            .filter(|leaf| tree.tree[*leaf].mark() == Some("a"))
            .collect();
        assert_eq!(marked.len(), 1);
    }

    #[test]
    fn con_mark_criteria_target_marked_leaf() {
        let mut tree = basic_tree();
        tree.execute_str("mark victim");
        let replies = tree.execute_str(r#"[con_mark="victim"] kill"#);
        assert!(replies[0].success);
        assert!(tree.tree.lookup_window(100).is_none());
    }

    #[test]
    fn settle_runs_after_commands() {
        let mut tree = basic_tree();
        // Leave a percent imbalance behind, then let settle fix it.
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.tree.set_percent(leaves[0], 0.4);
        tree.tree.set_percent(leaves[1], 0.4);
        tree.execute_str("nop");
        let sum: f64 = tree
            .tree
            .children_of(split)
            .iter()
            .map(|c| tree.tree.percent_of(*c))
            .sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn exec_is_queued_not_run() {
        let mut tree = basic_tree();
        let replies = tree.execute_str("exec notify-send hello");
        assert!(replies[0].success);
        assert_eq!(tree.take_pending_exec(), vec!["notify-send hello".to_string()]);
    }

    #[test]
    fn control_ops_set_the_flag() {
        let mut tree = basic_tree();
        tree.execute_str("restart");
        assert_eq!(tree.take_control(), Some(RunControl::Restart));
        tree.execute_str("exit");
        assert_eq!(tree.take_control(), Some(RunControl::Exit));
    }

    #[test]
    fn fullscreen_toggle_via_command() {
        let mut tree = basic_tree();
        tree.execute_str("fullscreen");
        let leaf = tree.focused_leaf().unwrap();
        assert_eq!(tree.tree[leaf].fullscreen_mode(), FullscreenMode::Output);
        tree.execute_str("fullscreen");
        assert_eq!(tree.tree[leaf].fullscreen_mode(), FullscreenMode::None);
    }

    #[test]
    fn floating_toggle_via_command() {
        let mut tree = basic_tree();
        let leaf = tree.focused_leaf().unwrap();
        tree.execute_str("floating toggle");
        assert!(tree.tree[leaf].floating());
        let wrapper = tree.tree.parent_of(leaf).unwrap();
        assert_eq!(
            tree.tree[wrapper].get_type(),
            ContainerType::FloatingWrapper
        );
        tree.execute_str("floating toggle");
        assert!(!tree.tree[leaf].floating());
    }

    #[test]
    fn layout_stacked_then_default_preserves_focus() {
        let mut tree = basic_tree();
        tree.switch_to_workspace("2").unwrap();
        let before = tree.focused_leaf().unwrap();
        tree.execute_str("layout stacked");
        assert_eq!(tree.focused_leaf(), Some(before));
        tree.execute_str("layout default");
        assert_eq!(tree.focused_leaf(), Some(before));
    }
}
