//! Window adoption and property tracking: binds X11 windows to fresh
//! leaves, applies the user's assignment rules, and keeps the descriptor
//! in sync with property changes.

use log::{info, trace};
use petgraph::graph::NodeIndex;
use serde_json::json;

use crate::config::AssignAction;
use crate::geometry::Geometry;
use crate::layout::{
    Container, ContainerType, DockPosition, Layout, LayoutTree, TreeError,
};
use crate::x11::{Strut, WindowAttributes, WindowId, WindowKind, WindowProperty, XOp};

/// Everything the manager knows about one X11 window.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub id: WindowId,
    pub leader: WindowId,
    pub transient_for: Option<WindowId>,
    pub class: String,
    pub instance: String,
    pub title: String,
    pub kind: WindowKind,
    pub dock: Option<DockPosition>,
    /// `WM_TAKE_FOCUS` in `WM_PROTOCOLS`.
    pub needs_take_focus: bool,
    /// `WM_HINTS` input field; absent hints accept input.
    pub accepts_input: bool,
    /// Urgency bit of `WM_HINTS`.
    pub urgent: bool,
    pub strut: Strut,
    pub min_size: Option<(u32, u32)>,
    /// Geometry the client asked for before we started managing it.
    pub geometry: Geometry,
    /// Indices of assignment rules that already ran for this window.
    pub ran_assignments: Vec<usize>,
}

impl Window {
    pub fn from_attrs(id: WindowId, attrs: &WindowAttributes) -> Window {
        let dock = if attrs.kind == WindowKind::Dock {
            if attrs.strut.bottom > 0 && attrs.strut.top == 0 {
                Some(DockPosition::Bottom)
            } else {
                Some(DockPosition::Top)
            }
        } else {
            None
        };
        Window {
            id,
            leader: attrs.leader,
            transient_for: attrs.transient_for,
            class: attrs.class.clone(),
            instance: attrs.instance.clone(),
            title: attrs.title.clone(),
            kind: attrs.kind,
            dock,
            needs_take_focus: attrs.protocols.contains(crate::x11::Protocols::TAKE_FOCUS),
            accepts_input: attrs.accepts_input,
            urgent: attrs.urgent,
            strut: attrs.strut,
            min_size: attrs.min_size,
            geometry: attrs.geometry,
            ran_assignments: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn for_tests(id: WindowId) -> Window {
        Window {
            id,
            leader: 0,
            transient_for: None,
            class: "TestClass".into(),
            instance: "test".into(),
            title: format!("window {:#x}", id),
            kind: WindowKind::Normal,
            dock: None,
            needs_take_focus: false,
            accepts_input: true,
            urgent: false,
            strut: Strut::default(),
            min_size: None,
            geometry: Geometry::new(0, 0, 640, 480),
            ran_assignments: Vec::new(),
        }
    }
}

impl LayoutTree {
    /// Adopts a map-requested window: builds the descriptor, applies the
    /// assignment rules, places the fresh leaf (tiling, floating, or
    /// dock), and focuses it when it landed on a visible workspace.
    ///
    /// Returns the `run_command` assignment payloads that matched; the
    /// caller feeds them through the executor after adoption.
    pub fn manage_window(
        &mut self,
        id: WindowId,
        attrs: &WindowAttributes,
    ) -> Result<Vec<String>, TreeError> {
        debug_assert!(self.tree.lookup_window(id).is_none());
        let mut window = Window::from_attrs(id, attrs);
        info!(
            "Managing window {:#x} ({} / {})",
            id, window.class, window.title
        );

        // Assignments: the first placement rule wins, every matching
        // command rule fires. Applied rules are recorded on the window.
        let mut placement: Option<AssignAction> = None;
        let mut commands = Vec::new();
        let assignments = self.config.assignments.clone();
        for (index, assignment) in assignments.iter().enumerate() {
            if window.ran_assignments.contains(&index) {
                continue;
            }
            if !assignment.criteria.matches_window(&window) {
                continue;
            }
            window.ran_assignments.push(index);
            match assignment.action {
                AssignAction::Command(ref cmd) => commands.push(cmd.clone()),
                ref action => {
                    if placement.is_none() {
                        placement = Some(action.clone());
                    }
                }
            }
        }

        if window.dock.is_some() {
            self.manage_dock(window)?;
            return Ok(commands);
        }

        let target_ws = self.assignment_workspace(&placement)?;
        let wants_floating = window.kind.wants_floating() || window.transient_for.is_some();
        let visible = self.workspace_is_visible(target_ws);
        let initially_fullscreen = attrs.initially_fullscreen;

        let leaf_ix = if wants_floating {
            self.place_floating(target_ws, window)?
        } else {
            self.place_tiling(target_ws, window)?
        };

        if initially_fullscreen {
            self.set_fullscreen(leaf_ix, true, false)?;
        }
        if visible {
            self.queue_x(XOp::Map(id));
            self.focus_node(leaf_ix)?;
        }
        self.queue_x(XOp::UpdateClientList(self.client_list()));
        self.queue_event("window", json!({ "change": "new", "window": id }));
        self.update_urgent_flag(leaf_ix);
        self.validate();
        Ok(commands)
    }

    /// Resolves the assignment placement to a workspace, defaulting to
    /// the focused one.
    fn assignment_workspace(
        &mut self,
        placement: &Option<AssignAction>,
    ) -> Result<NodeIndex, TreeError> {
        match *placement {
            Some(AssignAction::ToWorkspace(ref name)) => {
                Ok(self.workspace_get(name)?.0)
            }
            Some(AssignAction::ToOutput(ref name)) => {
                match self.tree.output_ix_by_name(name) {
                    Some(output_ix) => self
                        .visible_workspace_of(output_ix)
                        .ok_or(TreeError::NoActiveContainer),
                    None => {
                        log::warn!(
                            "assignment targets missing output {}, using the focused workspace",
                            name
                        );
                        self.focused_or_visible_workspace()
                    }
                }
            }
            _ => self.focused_or_visible_workspace(),
        }
    }

    pub(crate) fn focused_or_visible_workspace(&self) -> Result<NodeIndex, TreeError> {
        if let Some(ws_ix) = self.focused_ix().and_then(|f| self.workspace_of(f)) {
            return Ok(ws_ix);
        }
        let output_ix = self.focused_output()?;
        self.visible_workspace_of(output_ix)
            .ok_or(TreeError::NoActiveContainer)
    }

    /// Dock windows land in the dockarea of the output containing them.
    fn manage_dock(&mut self, window: Window) -> Result<(), TreeError> {
        let position = window.dock.expect("manage_dock on a non-dock window");
        let id = window.id;
        let output_ix = self
            .output_at(window.geometry.origin)
            .map(Ok)
            .unwrap_or_else(|| self.focused_output())?;
        let dock_ix = self
            .tree
            .children_of(output_ix)
            .into_iter()
            .find(|child| {
                matches!(self.tree[*child], Container::Dockarea { position: p, .. } if p == position)
            })
            .expect("output without dockareas");
        trace!("adopting dock window {:#x} into {:?}", id, position);
        self.tree.add_child(dock_ix, Container::new_leaf(window), false);
        self.queue_x(XOp::Map(id));
        self.queue_x(XOp::UpdateClientList(self.client_list()));
        self.queue_event("window", json!({ "change": "new", "window": id }));
        Ok(())
    }

    /// The active output whose rectangle contains the point.
    pub fn output_at(&self, point: crate::geometry::Point) -> Option<NodeIndex> {
        self.tree.outputs().into_iter().find(|output_ix| {
            !self.tree[*output_ix].is_internal()
                && self.tree[*output_ix]
                    .get_geometry()
                    .map(|geo| geo.contains(point))
                    .unwrap_or(false)
        })
    }

    /// Tiling placement: beside the workspace's focused leaf for the
    /// default workspace layout, inside a fresh split carrying the
    /// workspace layout otherwise.
    fn place_tiling(&mut self, ws_ix: NodeIndex, window: Window) -> Result<NodeIndex, TreeError> {
        let ws_layout = self.tree[ws_ix].get_layout().unwrap_or(Layout::Split);
        let leaf = Container::new_leaf(window);
        if ws_layout == Layout::Split {
            // Insert as a sibling right after the focused leaf.
            match self.tree.follow_focused_until(ws_ix, ContainerType::Leaf) {
                Ok(focused_leaf) => {
                    let parent_ix = self.tree.parent_of(focused_leaf)?;
                    let parent_ix = match self.tree[parent_ix].get_type() {
                        ContainerType::Split | ContainerType::Workspace => parent_ix,
                        // Focused leaf floats; fall back to the workspace.
                        _ => ws_ix,
                    };
                    let pos = self
                        .tree
                        .get_edge_weight_between(parent_ix, focused_leaf)
                        .map(|path| path.weight)
                        .unwrap_or(0);
                    let leaf_ix = self.tree.add_child(parent_ix, leaf, false);
                    if parent_ix != ws_ix || !self.tree[focused_leaf].floating() {
                        self.tree.set_child_pos(leaf_ix, pos + 1);
                    }
                    Ok(leaf_ix)
                }
                Err(_) => Ok(self.tree.add_child(ws_ix, leaf, false)),
            }
        } else {
            // Stacked/tabbed workspaces wrap new windows in a split with
            // the workspace's layout.
            let rect = self.tree[ws_ix].get_geometry().unwrap_or_default();
            let orientation = self.effective_orientation(ws_ix);
            let mut split = Container::new_split(Layout::Split, orientation, rect);
            split
                .set_layout(ws_layout)
                .expect("split refused a layout");
            let split_ix = self.tree.add_child(ws_ix, split, false);
            Ok(self.tree.add_child(split_ix, leaf, false))
        }
    }

    /// Floating placement: the leaf goes into a fresh wrapper sized from
    /// the client's requested geometry, centered when it asked for the
    /// origin.
    fn place_floating(&mut self, ws_ix: NodeIndex, window: Window) -> Result<NodeIndex, TreeError> {
        let mut rect = window.geometry;
        if rect.origin.x == 0 && rect.origin.y == 0 {
            let ws_rect = self.tree[ws_ix].get_geometry().unwrap();
            rect = rect.center_in(ws_rect);
        }
        let wrapper_ix = self
            .tree
            .add_child(ws_ix, Container::new_floating_wrapper(rect), false);
        let leaf_ix = self.tree.add_child(wrapper_ix, Container::new_leaf(window), false);
        let _ = self.tree[leaf_ix].set_floating_state(crate::layout::FloatingState::AutoOn);
        Ok(leaf_ix)
    }

    /// Applies a property change to the stored descriptor. The attributes
    /// carry the freshly read values for the changed group.
    pub fn refresh_window_property(
        &mut self,
        id: WindowId,
        property: WindowProperty,
        attrs: &WindowAttributes,
    ) -> Result<(), TreeError> {
        let leaf_ix = self
            .tree
            .lookup_window(id)
            .ok_or(TreeError::WindowNotFound(id))?;
        match property {
            WindowProperty::Title => {
                let changed = {
                    let window = self.tree[leaf_ix].window_mut().unwrap();
                    let changed = window.title != attrs.title;
                    window.title = attrs.title.clone();
                    changed
                };
                if changed {
                    self.queue_event(
                        "window",
                        json!({ "change": "title", "window": id }),
                    );
                }
            }
            WindowProperty::Class => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.class = attrs.class.clone();
                window.instance = attrs.instance.clone();
            }
            WindowProperty::Hints => {
                let urgent = attrs.urgent;
                {
                    let window = self.tree[leaf_ix].window_mut().unwrap();
                    window.urgent = urgent;
                    window.accepts_input = attrs.accepts_input;
                }
                self.update_urgent_flag(leaf_ix);
            }
            WindowProperty::NormalHints => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.min_size = attrs.min_size;
            }
            WindowProperty::TransientFor => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.transient_for = attrs.transient_for;
            }
            WindowProperty::Leader => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.leader = attrs.leader;
            }
            WindowProperty::Protocols => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.needs_take_focus =
                    attrs.protocols.contains(crate::x11::Protocols::TAKE_FOCUS);
            }
            WindowProperty::Strut => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.strut = attrs.strut;
                // Dock strut changes resize the content area.
            }
            WindowProperty::WindowType => {
                let window = self.tree[leaf_ix].window_mut().unwrap();
                window.kind = attrs.kind;
            }
            WindowProperty::Other => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Criterion, Match};
    use crate::config::Assignment;
    use crate::layout::core::tree::tests::basic_tree;
    use crate::layout::FloatingState;
    use regex::Regex;

    fn attrs(id: WindowId) -> WindowAttributes {
        WindowAttributes {
            title: format!("window {:#x}", id),
            class: "TestClass".into(),
            instance: "test".into(),
            geometry: Geometry::new(0, 0, 640, 480),
            accepts_input: true,
            ..WindowAttributes::default()
        }
    }

    #[test]
    fn plain_window_tiles_beside_focus() {
        let mut tree = basic_tree();
        let focused = tree.focused_leaf().unwrap();
        tree.manage_window(0x1000, &attrs(0x1000)).unwrap();
        let leaf = tree.tree.lookup_window(0x1000).unwrap();
        assert_eq!(
            tree.tree.parent_of(leaf).unwrap(),
            tree.tree.parent_of(focused).unwrap()
        );
        // The new window is focused and right of its predecessor.
        assert_eq!(tree.focused_leaf(), Some(leaf));
        let siblings = tree.tree.children_of(tree.tree.parent_of(leaf).unwrap());
        assert_eq!(siblings, vec![focused, leaf]);
    }

    #[test]
    fn utility_windows_float() {
        let mut tree = basic_tree();
        let mut a = attrs(0x2000);
        a.kind = WindowKind::Utility;
        a.geometry = Geometry::new(0, 0, 300, 200);
        tree.manage_window(0x2000, &a).unwrap();
        let leaf = tree.tree.lookup_window(0x2000).unwrap();
        assert_eq!(
            tree.tree[leaf].floating_state(),
            FloatingState::AutoOn
        );
        let wrapper = tree.tree.parent_of(leaf).unwrap();
        assert_eq!(
            tree.tree[wrapper].get_type(),
            ContainerType::FloatingWrapper
        );
        // Centered because it asked for (0, 0).
        let rect = tree.tree[wrapper].get_geometry().unwrap();
        assert_eq!((rect.origin.x, rect.origin.y), (250, 200));
    }

    #[test]
    fn dock_windows_join_the_dockarea() {
        let mut tree = basic_tree();
        let mut a = attrs(0x3000);
        a.kind = WindowKind::Dock;
        a.strut = Strut { top: 20, ..Strut::default() };
        tree.manage_window(0x3000, &a).unwrap();
        let leaf = tree.tree.lookup_window(0x3000).unwrap();
        let dock = tree.tree.parent_of(leaf).unwrap();
        assert_eq!(tree.tree[dock].get_type(), ContainerType::Dockarea);
        // Dock windows never steal focus.
        assert_ne!(tree.focused_leaf(), Some(leaf));
    }

    #[test]
    fn assignment_sends_to_workspace() {
        let mut tree = basic_tree();
        tree.config.assignments = vec![Assignment {
            criteria: Match {
                criteria: vec![Criterion::Class(Regex::new("^Mail$").unwrap())],
            },
            action: AssignAction::ToWorkspace("9".into()),
        }];
        let mut a = attrs(0x4000);
        a.class = "Mail".into();
        tree.manage_window(0x4000, &a).unwrap();
        let leaf = tree.tree.lookup_window(0x4000).unwrap();
        let ws = tree.workspace_of(leaf).unwrap();
        assert_eq!(tree.tree[ws].name(), "9");
        // Adopted into an invisible workspace: not mapped, not focused.
        assert_ne!(tree.focused_leaf(), Some(leaf));
        let ops = tree.take_pending_x();
        assert!(!ops.contains(&XOp::Map(0x4000)));
    }

    #[test]
    fn matching_command_assignments_are_returned() {
        let mut tree = basic_tree();
        tree.config.assignments = vec![Assignment {
            criteria: Match {
                criteria: vec![Criterion::Class(Regex::new("TestClass").unwrap())],
            },
            action: AssignAction::Command("floating enable".into()),
        }];
        let commands = tree.manage_window(0x5000, &attrs(0x5000)).unwrap();
        assert_eq!(commands, vec!["floating enable".to_string()]);
        let leaf = tree.tree.lookup_window(0x5000).unwrap();
        let window = tree.tree[leaf].window().unwrap();
        assert_eq!(window.ran_assignments, vec![0]);
    }

    #[test]
    fn stacked_workspace_layout_wraps_new_windows() {
        let mut tree = basic_tree();
        tree.switch_to_workspace("7").unwrap();
        let ws = tree.tree.workspace_ix_by_name("7").unwrap();
        tree.tree[ws].set_layout(Layout::Stacked).unwrap();
        tree.manage_window(0x6000, &attrs(0x6000)).unwrap();
        let leaf = tree.tree.lookup_window(0x6000).unwrap();
        let parent = tree.tree.parent_of(leaf).unwrap();
        assert_eq!(tree.tree[parent].get_type(), ContainerType::Split);
        assert_eq!(tree.tree[parent].get_layout().unwrap(), Layout::Stacked);
    }

    #[test]
    fn urgency_hint_refresh_propagates() {
        let mut tree = basic_tree();
        tree.manage_window(0x7000, &attrs(0x7000)).unwrap();
        let mut updated = attrs(0x7000);
        updated.urgent = true;
        tree.refresh_window_property(0x7000, WindowProperty::Hints, &updated)
            .unwrap();
        let ws = tree.tree.workspace_ix_by_name("1").unwrap();
        assert!(tree.tree[ws].urgent());
    }

    #[test]
    fn title_refresh_emits_an_event() {
        let mut tree = basic_tree();
        tree.manage_window(0x8000, &attrs(0x8000)).unwrap();
        tree.take_pending_events();
        let mut updated = attrs(0x8000);
        updated.title = "new title".into();
        tree.refresh_window_property(0x8000, WindowProperty::Title, &updated)
            .unwrap();
        let events = tree.take_pending_events();
        assert!(events.iter().any(|e| e.name == "window"));
        let leaf = tree.tree.lookup_window(0x8000).unwrap();
        assert_eq!(tree.tree[leaf].window().unwrap().title, "new title");
    }
}
