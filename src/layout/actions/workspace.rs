//! Workspace lifecycle: creation on demand, visibility switching,
//! back-and-forth, ordered traversal, and moving workspaces between
//! outputs.

use log::{info, trace, warn};
use petgraph::graph::NodeIndex;
use serde_json::json;

use super::super::core::container::{
    Container, ContainerType, DockPosition, FullscreenMode,
};
use super::super::{CommandResult, LayoutTree, TreeError};
use crate::geometry::Geometry;
use crate::x11::XOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceErr {
    /// No usable output to place a workspace on.
    NoOutputs,
    /// `__`-prefixed workspaces are not switch targets.
    Internal(String),
    /// The named output does not exist.
    OutputNotFound(String),
    /// Nothing remembered for back-and-forth yet.
    NoPreviousWorkspace,
}

impl LayoutTree {
    /// Registers a new output: builds its dockareas and content slot,
    /// creates an initial workspace, and shows it. Used both at startup
    /// and on RandR hotplug.
    pub fn output_added(&mut self, name: &str, rect: Geometry) -> NodeIndex {
        if let Some(existing) = self.tree.output_ix_by_name(name) {
            // Re-activation or a mode change.
            self.tree[existing].set_geometry(rect);
            if let Container::Output { ref mut active, .. } = self.tree[existing] {
                *active = true;
            }
            self.queue_event("output", json!({ "change": "unspecified" }));
            return existing;
        }
        info!("Adding new output {} at {:?}", name, rect);
        let root_ix = self.tree.root_ix();
        let output_ix = self
            .tree
            .add_child(root_ix, Container::new_output(name.into(), rect), false);
        self.tree.add_child(
            output_ix,
            Container::new_dockarea(DockPosition::Top, Geometry::zero()),
            false,
        );
        self.tree.add_child(output_ix, Container::new_content(rect), false);
        self.tree.add_child(
            output_ix,
            Container::new_dockarea(DockPosition::Bottom, Geometry::zero()),
            false,
        );
        let ws_ix = self.create_on_output(output_ix);
        let _ = self.tree[ws_ix].set_fullscreen_mode(FullscreenMode::Output);
        self.queue_event("output", json!({ "change": "unspecified" }));
        self.validate();
        output_ix
    }

    /// Deactivates an output: its workspaces are evacuated to the first
    /// remaining active output, or the output is merely marked inactive
    /// when it is the last one.
    pub fn output_removed(&mut self, name: &str) -> CommandResult {
        let output_ix = self
            .tree
            .output_ix_by_name(name)
            .ok_or(TreeError::Workspace(WorkspaceErr::OutputNotFound(name.into())))?;
        let refuge = self.tree.outputs().into_iter().find(|ix| {
            *ix != output_ix
                && !self.tree[*ix].is_internal()
                && matches!(self.tree[*ix], Container::Output { active: true, .. })
        });
        match refuge {
            Some(refuge_ix) => {
                info!("Output {} disappeared, evacuating workspaces", name);
                let refuge_name = self.tree[refuge_ix].name();
                if let Some(content_ix) = self.tree.content_of(output_ix) {
                    for ws_ix in self.tree.children_of(content_ix) {
                        let ws_name = self.tree[ws_ix].name();
                        self.move_workspace_to_output(ws_ix, &refuge_name)
                            .unwrap_or_else(|err| {
                                warn!("Could not evacuate {}: {}", ws_name, err)
                            });
                    }
                }
                self.tree.detach(output_ix)?;
                let mut doomed = self.tree.all_descendants_of(output_ix);
                doomed.push(output_ix);
                for ix in doomed.into_iter().rev() {
                    self.tree.remove(ix);
                }
            }
            None => {
                warn!("Output {} disappeared with nowhere to evacuate to", name);
                if let Container::Output { ref mut active, .. } = self.tree[output_ix] {
                    *active = false;
                }
            }
        }
        self.queue_event("output", json!({ "change": "unspecified" }));
        self.validate();
        Ok(())
    }

    /// The output new windows and workspaces land on: the focused one,
    /// else the first active real output.
    pub fn focused_output(&self) -> Result<NodeIndex, TreeError> {
        if let Some(output_ix) = self.active_ix_of(ContainerType::Output) {
            if !self.tree[output_ix].is_internal() {
                return Ok(output_ix);
            }
        }
        self.tree
            .outputs()
            .into_iter()
            .find(|ix| {
                !self.tree[*ix].is_internal()
                    && matches!(self.tree[*ix], Container::Output { active: true, .. })
            })
            .ok_or(TreeError::Workspace(WorkspaceErr::NoOutputs))
    }

    /// Returns the workspace of that name, creating it if absent. The
    /// output is picked from the workspace→output assignments, falling
    /// back to the focused output with a warning when the assigned output
    /// is missing.
    pub fn workspace_get(&mut self, name: &str) -> Result<(NodeIndex, bool), TreeError> {
        if let Some(ws_ix) = self.tree.workspace_ix_by_name(name) {
            return Ok((ws_ix, false));
        }
        let assigned = self
            .config
            .workspace_outputs
            .iter()
            .find(|(ws_name, _)| ws_name == name)
            .map(|(_, output_name)| output_name.clone());
        let output_ix = match assigned {
            Some(output_name) => match self.tree.output_ix_by_name(&output_name) {
                Some(ix) if !self.tree[ix].is_internal() => ix,
                _ => {
                    warn!(
                        "workspace {} is assigned to missing output {}, using the focused one",
                        name, output_name
                    );
                    self.focused_output()?
                }
            },
            None => self.focused_output()?,
        };
        let ws_ix = self.create_workspace_on(output_ix, name);
        Ok((ws_ix, true))
    }

    /// Builds a workspace on the given output. Does not show it.
    pub fn create_workspace_on(&mut self, output_ix: NodeIndex, name: &str) -> NodeIndex {
        let content_ix = self
            .tree
            .content_of(output_ix)
            .expect("output without a content slot");
        let rect = self.tree[content_ix]
            .get_geometry()
            .expect("content had no geometry");
        let layout = self.config.workspace_layout;
        trace!("Adding workspace {}", name);
        let ws_ix = self.tree.add_child(
            content_ix,
            Container::new_workspace(name.into(), rect, layout),
            false,
        );
        self.queue_event(
            "workspace",
            json!({ "change": "init", "current": { "name": name } }),
        );
        self.validate();
        ws_ix
    }

    /// Synthesizes a fresh workspace on the output, preferring unused
    /// names from the configured bindings' `workspace …` targets that are
    /// not assigned elsewhere, falling back to the lowest free positive
    /// number.
    pub fn create_on_output(&mut self, output_ix: NodeIndex) -> NodeIndex {
        let output_name = self.tree[output_ix].name();
        let binding_names = self.config.binding_workspace_names.clone();
        for name in binding_names {
            if self.tree.workspace_ix_by_name(&name).is_some() {
                continue;
            }
            let assigned_elsewhere = self
                .config
                .workspace_outputs
                .iter()
                .any(|(ws, output)| *ws == name && *output != output_name);
            if assigned_elsewhere {
                continue;
            }
            return self.create_workspace_on(output_ix, &name);
        }
        let mut number = 1;
        while self
            .tree
            .workspaces()
            .iter()
            .any(|ws| self.tree[*ws].workspace_num() == Some(number))
        {
            number += 1;
        }
        self.create_workspace_on(output_ix, &number.to_string())
    }

    /// User-facing switch by name. Creates the workspace if needed.
    pub fn switch_to_workspace(&mut self, name: &str) -> CommandResult {
        if name.starts_with("__") {
            return Err(TreeError::Workspace(WorkspaceErr::Internal(name.into())));
        }
        let (ws_ix, _) = self.workspace_get(name)?;
        self.show_workspace(ws_ix)
    }

    /// Switch by number: `workspace number 5` refuses to create.
    pub fn switch_to_workspace_number(&mut self, number: i32) -> CommandResult {
        let target = self
            .tree
            .workspaces()
            .into_iter()
            .find(|ws| self.tree[*ws].workspace_num() == Some(number));
        match target {
            Some(ws_ix) => self.show_workspace(ws_ix),
            None => self.switch_to_workspace(&number.to_string()),
        }
    }

    /// Makes the workspace the visible one on its output, unmapping the
    /// previously visible workspace's windows and mapping the target's.
    /// Remembers the focused workspace for back-and-forth, reassigns
    /// sticky containers, focuses down the target's focus stack, and
    /// prunes the workspace being left if the switch emptied it.
    pub fn show_workspace(&mut self, ws_ix: NodeIndex) -> CommandResult {
        let output_ix = self
            .output_of(ws_ix)
            .ok_or_else(|| TreeError::NodeNotFound(self.tree[ws_ix].get_id()))?;
        let old_ws = self.visible_workspace_of(output_ix).filter(|old| *old != ws_ix);
        // The workspace the user is leaving: where focus is, or where the
        // focus chain ends when nothing is focused (empty workspace).
        let focused_ws_name = self
            .focused_ix()
            .and_then(|f| self.workspace_of(f))
            .or_else(|| {
                self.tree
                    .follow_focused_until(self.tree.root_ix(), ContainerType::Workspace)
                    .ok()
            })
            .map(|ws| self.tree[ws].name());
        let target_name = self.tree[ws_ix].name();

        if let Some(ref name) = focused_ws_name {
            if *name != target_name {
                self.prev_workspace = Some(name.clone());
            }
        }

        // Sticky containers move before visibility flips so their windows
        // never get unmapped.
        if let Some(old_ix) = old_ws {
            self.reassign_sticky(old_ix, ws_ix);
        }
        if let Some(old_ix) = old_ws {
            let _ = self.tree[old_ix].set_fullscreen_mode(FullscreenMode::None);
            self.set_workspace_mapped(old_ix, false);
        }
        let _ = self.tree[ws_ix].set_fullscreen_mode(FullscreenMode::Output);
        self.set_workspace_mapped(ws_ix, true);

        trace!("Switching to workspace {}", target_name);
        // Promote the workspace itself first: an empty workspace has no
        // leaf to focus, but the focus chain must still lead here.
        self.tree.set_focus_path(ws_ix);
        self.focus_on_next_container(ws_ix);

        // Leaving a drained workspace destroys it.
        if let Some(old_ix) = old_ws {
            if self.tree.get(old_ix).is_some() {
                let _ = self.repair_after_detach(old_ix);
            }
        }

        let old_name = focused_ws_name.filter(|n| *n != target_name);
        self.queue_event(
            "workspace",
            json!({
                "change": "focus",
                "current": { "name": target_name },
                "old": old_name.map(|n| json!({ "name": n })).unwrap_or(json!(null)),
            }),
        );
        let desktop = self.desktop_index_of(ws_ix).unwrap_or(0);
        self.queue_x(XOp::UpdateCurrentDesktop(desktop));
        self.validate();
        Ok(())
    }

    /// Maps or unmaps every window of the workspace. Unmaps are
    /// self-caused, so each leaf's ignore count is bumped first.
    pub(crate) fn set_workspace_mapped(&mut self, ws_ix: NodeIndex, mapped: bool) {
        for leaf_ix in self.tree.leaves_of(ws_ix) {
            let window = self.tree[leaf_ix].window_id().unwrap();
            if mapped {
                self.pending_x.push(XOp::Map(window));
            } else {
                self.tree[leaf_ix].bump_ignore_unmap();
                self.pending_x.push(XOp::Unmap(window));
            }
        }
    }

    /// Moves sticky-tagged floating containers from the workspace being
    /// left to the one being shown. When several members of one group
    /// would move, the leftmost wins and the rest stay put.
    fn reassign_sticky(&mut self, from_ws: NodeIndex, to_ws: NodeIndex) {
        let mut moved_groups: Vec<String> = Vec::new();
        for wrapper_ix in self.tree.floating_children_of(from_ws) {
            let group = self
                .tree
                .leaves_of(wrapper_ix)
                .into_iter()
                .find_map(|leaf| self.tree[leaf].sticky_group().map(String::from));
            let group = match group {
                Some(g) => g,
                None => continue,
            };
            if moved_groups.contains(&group) {
                continue;
            }
            moved_groups.push(group);
            trace!("sticky: moving {:?} to the shown workspace", wrapper_ix);
            if self.tree.detach(wrapper_ix).is_ok() {
                self.tree.attach_child(to_ws, wrapper_ix);
            }
        }
    }

    /// `workspace back_and_forth`.
    pub fn workspace_back_and_forth(&mut self) -> CommandResult {
        let name = self
            .prev_workspace
            .clone()
            .ok_or(TreeError::Workspace(WorkspaceErr::NoPreviousWorkspace))?;
        self.switch_to_workspace(&name)
    }

    /// Workspaces in traversal order: numbered ones ascending by number,
    /// then named ones in tree order. Internal workspaces are skipped.
    pub fn ordered_workspaces(&self, output_scope: Option<NodeIndex>) -> Vec<NodeIndex> {
        let mut numbered: Vec<NodeIndex> = Vec::new();
        let mut named: Vec<NodeIndex> = Vec::new();
        for ws_ix in self.tree.workspaces() {
            if self.tree[ws_ix].is_internal() {
                continue;
            }
            if let Some(scope) = output_scope {
                if self.output_of(ws_ix) != Some(scope) {
                    continue;
                }
            }
            if self.tree[ws_ix].workspace_num().unwrap_or(-1) >= 0 {
                numbered.push(ws_ix);
            } else {
                named.push(ws_ix);
            }
        }
        numbered.sort_by_key(|ws| self.tree[*ws].workspace_num().unwrap_or(-1));
        numbered.extend(named);
        numbered
    }

    /// `workspace next|prev|next_on_output|prev_on_output`.
    pub fn workspace_relative(&mut self, forwards: bool, same_output: bool) -> CommandResult {
        let scope = if same_output {
            Some(self.focused_output()?)
        } else {
            None
        };
        let ordered = self.ordered_workspaces(scope);
        if ordered.is_empty() {
            return Err(TreeError::Workspace(WorkspaceErr::NoOutputs));
        }
        let current = self
            .focused_ix()
            .and_then(|f| self.workspace_of(f))
            .or_else(|| {
                self.focused_output()
                    .ok()
                    .and_then(|o| self.visible_workspace_of(o))
            });
        let pos = current
            .and_then(|cur| ordered.iter().position(|ws| *ws == cur))
            .unwrap_or(0);
        let next = if forwards {
            (pos + 1) % ordered.len()
        } else {
            (pos + ordered.len() - 1) % ordered.len()
        };
        self.show_workspace(ordered[next])
    }

    /// Position of the workspace in the EWMH desktop numbering.
    pub fn desktop_index_of(&self, ws_ix: NodeIndex) -> Option<u32> {
        self.ordered_workspaces(None)
            .iter()
            .position(|ws| *ws == ws_ix)
            .map(|pos| pos as u32)
    }

    /// Relocates the workspace (content and floating wrappers alike) to
    /// another output. If this would drain the source output, a
    /// replacement workspace is created there first. Floating rectangles
    /// are translated so their offsets relative to the workspace origin
    /// survive the move.
    pub fn move_workspace_to_output(
        &mut self,
        ws_ix: NodeIndex,
        output_name: &str,
    ) -> CommandResult {
        let target_ix = self
            .tree
            .output_ix_by_name(output_name)
            .ok_or_else(|| {
                TreeError::Workspace(WorkspaceErr::OutputNotFound(output_name.into()))
            })?;
        let source_ix = self
            .output_of(ws_ix)
            .ok_or_else(|| TreeError::NodeNotFound(self.tree[ws_ix].get_id()))?;
        if source_ix == target_ix {
            return Ok(());
        }
        let was_visible = self.workspace_is_visible(ws_ix);

        // Never leave the source output without workspaces.
        let source_content = self
            .tree
            .content_of(source_ix)
            .expect("output without content");
        if self.tree.children_of(source_content).len() == 1 {
            let replacement = self.create_on_output(source_ix);
            let _ = self.tree[replacement].set_fullscreen_mode(FullscreenMode::Output);
        } else if was_visible {
            // Another workspace takes over visibility on the source.
            let _ = self.tree[ws_ix].set_fullscreen_mode(FullscreenMode::None);
            if let Some(next_visible) = self
                .tree
                .children_of(source_content)
                .into_iter()
                .find(|ix| *ix != ws_ix)
            {
                let _ = self.tree[next_visible].set_fullscreen_mode(FullscreenMode::Output);
            }
        }

        let source_origin = self.tree[source_ix].get_geometry().unwrap().origin;
        let target_origin = self.tree[target_ix].get_geometry().unwrap().origin;
        let dx = target_origin.x - source_origin.x;
        let dy = target_origin.y - source_origin.y;

        let target_content = self
            .tree
            .content_of(target_ix)
            .expect("output without content");
        self.tree.detach(ws_ix)?;
        self.tree.attach_child(target_content, ws_ix);

        for wrapper_ix in self.tree.floating_children_of(ws_ix) {
            let rect = self.tree[wrapper_ix].get_geometry().unwrap();
            self.tree[wrapper_ix].set_geometry(rect.translate(dx, dy));
        }

        if was_visible {
            // The workspace stays visible, now on the target output.
            let old_visible = self
                .visible_workspace_of(target_ix)
                .filter(|ix| *ix != ws_ix);
            if let Some(old_ix) = old_visible {
                let _ = self.tree[old_ix].set_fullscreen_mode(FullscreenMode::None);
                self.set_workspace_mapped(old_ix, false);
            }
            let _ = self.tree[ws_ix].set_fullscreen_mode(FullscreenMode::Output);
        } else {
            let _ = self.tree[ws_ix].set_fullscreen_mode(FullscreenMode::None);
        }

        let name = self.tree[ws_ix].name();
        info!("Moved workspace {} to output {}", name, output_name);
        self.queue_event(
            "workspace",
            json!({ "change": "move", "current": { "name": name, "output": output_name } }),
        );
        self.validate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::core::tree::tests::basic_tree;
    use super::super::super::{Container, FullscreenMode, LayoutTree};
    use crate::config::Config;
    use crate::geometry::Geometry;
    use crate::manage::Window;

    fn two_output_tree() -> LayoutTree {
        let mut tree = basic_tree();
        tree.output_added("fake-1", Geometry::new(1024, 0, 800, 600));
        tree
    }

    #[test]
    fn workspace_get_creates_on_demand() {
        let mut tree = basic_tree();
        let (ws, created) = tree.workspace_get("5").unwrap();
        assert!(created);
        assert_eq!(tree.tree[ws].workspace_num(), Some(5));
        let (again, created) = tree.workspace_get("5").unwrap();
        assert!(!created);
        assert_eq!(ws, again);
    }

    #[test]
    fn workspace_assignment_picks_the_output() {
        let mut tree = two_output_tree();
        tree.config.workspace_outputs =
            vec![("mail".to_string(), "fake-1".to_string())];
        let (ws, _) = tree.workspace_get("mail").unwrap();
        let output = tree.output_of(ws).unwrap();
        assert_eq!(tree.tree[output].name(), "fake-1");
    }

    #[test]
    fn missing_assignment_target_falls_back_to_focused() {
        let mut tree = basic_tree();
        tree.config.workspace_outputs =
            vec![("mail".to_string(), "gone-9".to_string())];
        let (ws, _) = tree.workspace_get("mail").unwrap();
        let output = tree.output_of(ws).unwrap();
        assert_eq!(tree.tree[output].name(), "fake-0");
    }

    #[test]
    fn switching_hides_and_shows() {
        let mut tree = basic_tree();
        tree.take_pending_x();
        tree.switch_to_workspace("2").unwrap();
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        assert_eq!(tree.tree[ws_1].fullscreen_mode(), FullscreenMode::None);
        assert_eq!(tree.tree[ws_2].fullscreen_mode(), FullscreenMode::Output);
        let ops = tree.take_pending_x();
        use crate::x11::XOp;
        assert!(ops.contains(&XOp::Unmap(100)));
        assert!(ops.contains(&XOp::Map(200)));
        assert!(ops.contains(&XOp::Map(201)));
        // The hidden leaf must swallow its own unmap.
        let leaf = tree.tree.lookup_window(100).unwrap();
        assert_eq!(tree.tree[leaf].ignore_unmap_count(), 1);
        // Focus went down workspace 2's stack.
        let focused = tree.focused_leaf().unwrap();
        assert!(matches!(tree.tree[focused].window_id(), Some(200) | Some(201)));
    }

    #[test]
    fn back_and_forth_round_trips() {
        let mut tree = basic_tree();
        tree.switch_to_workspace("2").unwrap();
        assert_eq!(tree.prev_workspace.as_deref(), Some("1"));
        tree.workspace_back_and_forth().unwrap();
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        assert!(tree.workspace_is_visible(ws_1));
        assert_eq!(tree.prev_workspace.as_deref(), Some("2"));
    }

    #[test]
    fn switching_away_prunes_drained_numbered_workspace() {
        let mut tree = basic_tree();
        // Workspace "3" exists but is empty and invisible after we leave.
        tree.switch_to_workspace("3").unwrap();
        assert!(tree.tree.workspace_ix_by_name("3").is_some());
        tree.switch_to_workspace("1").unwrap();
        assert!(tree.tree.workspace_ix_by_name("3").is_none());
    }

    #[test]
    fn internal_workspaces_are_not_switch_targets() {
        let mut tree = basic_tree();
        assert!(tree.switch_to_workspace("__i3_scratch").is_err());
    }

    #[test]
    fn ordered_traversal_numbers_then_names() {
        let mut tree = basic_tree();
        tree.workspace_get("mail").unwrap();
        tree.workspace_get("10").unwrap();
        let ordered = tree.ordered_workspaces(None);
        let names: Vec<String> = ordered.iter().map(|ws| tree.tree[*ws].name()).collect();
        assert_eq!(names, vec!["1", "2", "10", "mail"]);
    }

    #[test]
    fn move_workspace_translates_floating_and_leaves_replacement() {
        let mut tree = two_output_tree();
        let (ws_5, _) = tree.workspace_get("5").unwrap();
        tree.show_workspace(ws_5).unwrap();
        // One floating window at (100, 100) 200x150 on fake-0.
        let wrapper = tree.tree.add_child(
            ws_5,
            Container::new_floating_wrapper(Geometry::new(100, 100, 200, 150)),
            false,
        );
        let mut window = Window::for_tests(500);
        window.geometry = Geometry::new(100, 100, 200, 150);
        tree.tree.add_child(wrapper, Container::new_leaf(window), false);

        // Drain fake-0 of its other workspaces so the move empties it.
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let split_or_leaf = tree.tree.children_of(ws_1)[0];
        tree.close(split_or_leaf, super::super::super::core::tree::KillPolicy::Window)
            .unwrap();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let content = tree.tree.parent_of(ws_2).unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        tree.close(split, super::super::super::core::tree::KillPolicy::Window)
            .unwrap();
        let _ = content;

        tree.move_workspace_to_output(ws_5, "fake-1").unwrap();

        let output = tree.output_of(ws_5).unwrap();
        assert_eq!(tree.tree[output].name(), "fake-1");
        let rect = tree.tree[wrapper].get_geometry().unwrap();
        assert_eq!(
            (rect.origin.x, rect.origin.y, rect.size.w, rect.size.h),
            (1124, 100, 200, 150)
        );
        // A fresh workspace appeared on fake-0.
        let fake_0 = tree.tree.output_ix_by_name("fake-0").unwrap();
        let fresh = tree.visible_workspace_of(fake_0);
        assert!(fresh.is_some());
        assert_ne!(fresh, Some(ws_5));
    }

    #[test]
    fn sticky_containers_follow_the_switch() {
        let mut tree = basic_tree();
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        let wrapper = tree.tree.add_child(
            ws_1,
            Container::new_floating_wrapper(Geometry::new(10, 10, 100, 100)),
            false,
        );
        let mut window = Window::for_tests(600);
        window.geometry = Geometry::new(10, 10, 100, 100);
        let leaf = tree.tree.add_child(wrapper, Container::new_leaf(window), false);
        if let Container::Leaf { ref mut sticky_group, .. } = tree.tree[leaf] {
            *sticky_group = Some("notes".into());
        }
        tree.switch_to_workspace("2").unwrap();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        assert_eq!(tree.tree.floating_children_of(ws_2), vec![wrapper]);
        let ws_1 = tree.tree.workspace_ix_by_name("1").unwrap();
        assert!(tree.tree.floating_children_of(ws_1).is_empty());
    }

    #[test]
    fn create_on_output_prefers_binding_names() {
        let mut config = Config::default();
        config.binding_workspace_names = vec!["1".into(), "web".into()];
        let mut tree = LayoutTree::new(config);
        tree.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        // "1" is taken by the initial workspace, so the next synthesized
        // one is "web".
        let output = tree.tree.output_ix_by_name("fake-0").unwrap();
        let ws = tree.create_on_output(output);
        assert_eq!(tree.tree[ws].name(), "web");
    }
}
