//! The reactor: translates incoming X events into tree operations and
//! pushes the tree's queued effects back out.

use log::{debug, trace, warn};

use super::ignore::IgnoreTable;
use super::{EventKind, Seq, StateAction, WindowAttributes, WindowId, XConn, XEvent, XOp};
use crate::layout::{KillPolicy, LayoutTree};

/// Reactor state that lives outside the tree: the event-ignore table and
/// the `I3_SYNC` requests answered after the next settle step.
#[derive(Debug, Default)]
pub struct Reactor {
    pub ignore: IgnoreTable,
    pending_syncs: Vec<(WindowId, u32)>,
}

impl Reactor {
    pub fn new() -> Reactor {
        Reactor {
            ignore: IgnoreTable::new(),
            pending_syncs: Vec::new(),
        }
    }

    /// Handles one translated X event.
    pub fn dispatch(
        &mut self,
        tree: &mut LayoutTree,
        conn: &mut dyn XConn,
        seq: Seq,
        event: XEvent,
    ) {
        if self.ignore.should_ignore(seq, event.kind()) {
            return;
        }
        trace!("dispatching {:?}", event);
        match event {
            XEvent::MapRequest { window, override_redirect } => {
                if override_redirect {
                    return;
                }
                if tree.tree.lookup_window(window).is_some() {
                    debug!("map request for already managed {:#x}", window);
                    return;
                }
                let attrs = conn.window_attributes(window);
                if attrs.override_redirect {
                    return;
                }
                conn.subscribe_to(window);
                match tree.manage_window(window, &attrs) {
                    Ok(commands) => {
                        for command in commands {
                            // Assignment commands run against the window
                            // they matched, not whatever has focus.
                            tree.execute_str(&format!("[id={:#x}] {}", window, command));
                        }
                    }
                    Err(err) => warn!("could not manage {:#x}: {}", window, err),
                }
            }
            XEvent::UnmapNotify { window } => {
                let leaf_ix = match tree.tree.lookup_window(window) {
                    Some(ix) => ix,
                    None => return,
                };
                if tree.tree[leaf_ix].consume_ignore_unmap() {
                    trace!("ignoring self-caused unmap of {:#x}", window);
                    return;
                }
                if let Err(err) = tree.close(leaf_ix, KillPolicy::None) {
                    warn!("close on unmap of {:#x} failed: {}", window, err);
                }
            }
            XEvent::DestroyNotify { window } => {
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    if let Err(err) = tree.close(leaf_ix, KillPolicy::None) {
                        warn!("close on destroy of {:#x} failed: {}", window, err);
                    }
                }
            }
            XEvent::ConfigureRequest { window, geometry } => {
                match tree.tree.lookup_window(window) {
                    Some(leaf_ix) => {
                        // Managed windows do not get to pick their own
                        // geometry; reply with what they actually have.
                        let current = tree.tree[leaf_ix]
                            .window_rect()
                            .unwrap_or(geometry);
                        tree.queue_x(XOp::DenyConfigure { window, geometry: current });
                    }
                    None => {
                        conn.configure_window(window, geometry);
                    }
                }
            }
            XEvent::PropertyNotify { window, property } => {
                if tree.tree.lookup_window(window).is_none() {
                    return;
                }
                let mut attrs = WindowAttributes::default();
                conn.refresh_property(window, property, &mut attrs);
                if let Err(err) = tree.refresh_window_property(window, property, &attrs) {
                    warn!("property refresh for {:#x} failed: {}", window, err);
                }
            }
            XEvent::EnterNotify { window } => {
                if !tree.config().focus_follows_mouse {
                    return;
                }
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    let _ = tree.focus_node(leaf_ix);
                }
            }
            XEvent::ButtonPress { window, .. } => {
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    let _ = tree.focus_node(leaf_ix);
                }
            }
            XEvent::ActiveWindowRequest { window } => {
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    // Pull the workspace into view first if needed.
                    if let Some(ws_ix) = tree.workspace_of(leaf_ix) {
                        if !tree.workspace_is_visible(ws_ix) {
                            let _ = tree.show_workspace(ws_ix);
                        }
                    }
                    let _ = tree.focus_node(leaf_ix);
                }
            }
            XEvent::FullscreenRequest { window, action } => {
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    let result = match action {
                        StateAction::Add => tree.set_fullscreen(leaf_ix, true, false),
                        StateAction::Remove => tree.set_fullscreen(leaf_ix, false, false),
                        StateAction::Toggle => tree.toggle_fullscreen(leaf_ix, false),
                    };
                    if let Err(err) = result {
                        warn!("fullscreen request for {:#x} failed: {}", window, err);
                    }
                }
            }
            XEvent::CurrentDesktopRequest { index } => {
                let ordered = tree.ordered_workspaces(None);
                if let Some(ws_ix) = ordered.get(index as usize).copied() {
                    let _ = tree.show_workspace(ws_ix);
                }
            }
            XEvent::CloseWindowRequest { window } => {
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    let _ = tree.close(leaf_ix, KillPolicy::Window);
                }
            }
            XEvent::MoveResizeRequest { window, geometry } => {
                if let Some(leaf_ix) = tree.tree.lookup_window(window) {
                    if let Ok(wrapper_ix) = tree.tree.ancestor_of_type(
                        leaf_ix,
                        crate::layout::ContainerType::FloatingWrapper,
                    ) {
                        tree.tree[wrapper_ix].set_geometry(geometry);
                    }
                }
            }
            XEvent::SyncRequest { window, cookie } => {
                self.pending_syncs.push((window, cookie));
            }
            XEvent::MappingNotify => {
                // Keybinding translation lives outside the core; the
                // binding layer regrabs on its own.
                debug!("keyboard mapping changed");
            }
            XEvent::ScreenChange => {
                reconcile_outputs(tree, conn);
            }
        }
    }

    /// The outgoing half of a loop turn: run the settle step, push the
    /// queued X requests (recording the self-caused ones in the ignore
    /// table), answer pending syncs, and flush once.
    pub fn flush_effects(&mut self, tree: &mut LayoutTree, conn: &mut dyn XConn) {
        tree.settle();
        for op in tree.take_pending_x() {
            let seq = conn.apply(&op);
            match op {
                XOp::Configure { .. } | XOp::Map(_) | XOp::Unmap(_) => {
                    self.ignore.add(seq, EventKind::Enter);
                }
                _ => {}
            }
        }
        for (window, cookie) in self.pending_syncs.drain(..) {
            conn.send_sync_reply(window, cookie);
        }
        if let Err(err) = conn.flush() {
            warn!("flush failed: {}", err);
        }
    }
}

/// Brings the tree's outputs in line with what RandR reports: new CRTCs
/// become outputs, vanished ones are evacuated.
pub fn reconcile_outputs(tree: &mut LayoutTree, conn: &mut dyn XConn) {
    let reported = conn.outputs();
    for info in &reported {
        if info.active {
            tree.output_added(&info.name, info.rect);
        }
    }
    let known: Vec<String> = tree
        .tree
        .outputs()
        .into_iter()
        .filter(|ix| !tree.tree[*ix].is_internal())
        .map(|ix| tree.tree[ix].name())
        .collect();
    for name in known {
        let still_there = reported.iter().any(|info| info.name == name && info.active);
        if !still_there {
            if let Err(err) = tree.output_removed(&name) {
                warn!("could not retire output {}: {}", name, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::dummy::{DummyConn, Recorded};
    use super::super::{Protocols, WindowAttributes, XEvent, XOp};
    use super::*;
    use crate::config::Config;
    use crate::geometry::Geometry;
    use crate::layout::LayoutTree;

    fn world() -> (LayoutTree, DummyConn, Reactor) {
        let mut conn = DummyConn::with_one_output();
        let mut tree = LayoutTree::new(Config::default());
        reconcile_outputs(&mut tree, &mut conn);
        (tree, conn, Reactor::new())
    }

    fn plain_attrs() -> WindowAttributes {
        WindowAttributes {
            title: "xterm".into(),
            class: "XTerm".into(),
            instance: "xterm".into(),
            geometry: Geometry::new(0, 0, 484, 316),
            accepts_input: true,
            ..WindowAttributes::default()
        }
    }

    fn drain(tree: &mut LayoutTree, conn: &mut DummyConn, reactor: &mut Reactor) {
        while let Some((seq, event)) = conn.poll_event().unwrap() {
            reactor.dispatch(tree, conn, seq, event);
        }
        reactor.flush_effects(tree, conn);
    }

    #[test]
    fn map_request_without_take_focus_gets_input_focus() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.set_attrs(0x100, plain_attrs());
        conn.script(XEvent::MapRequest { window: 0x100, override_redirect: false });
        drain(&mut tree, &mut conn, &mut reactor);
        let ops = conn.ops();
        assert!(ops.contains(&XOp::SetInputFocus(0x100)));
        assert!(!ops.contains(&XOp::TakeFocus(0x100)));
        assert!(ops.contains(&XOp::Map(0x100)));
    }

    #[test]
    fn map_request_with_take_focus_gets_the_client_message() {
        let (mut tree, mut conn, mut reactor) = world();
        let mut attrs = plain_attrs();
        attrs.protocols = Protocols::TAKE_FOCUS | Protocols::DELETE_WINDOW;
        conn.set_attrs(0x200, attrs);
        conn.script(XEvent::MapRequest { window: 0x200, override_redirect: false });
        drain(&mut tree, &mut conn, &mut reactor);
        let ops = conn.ops();
        assert!(ops.contains(&XOp::TakeFocus(0x200)));
        assert!(!ops.contains(&XOp::SetInputFocus(0x200)));
    }

    #[test]
    fn override_redirect_windows_are_left_alone() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.script(XEvent::MapRequest { window: 0x300, override_redirect: true });
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(tree.tree.lookup_window(0x300).is_none());
    }

    #[test]
    fn unmap_closes_unless_self_caused() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.set_attrs(0x400, plain_attrs());
        conn.script(XEvent::MapRequest { window: 0x400, override_redirect: false });
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(tree.tree.lookup_window(0x400).is_some());

        // A self-caused unmap is swallowed exactly once.
        let leaf = tree.tree.lookup_window(0x400).unwrap();
        tree.tree[leaf].bump_ignore_unmap();
        conn.script(XEvent::UnmapNotify { window: 0x400 });
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(tree.tree.lookup_window(0x400).is_some());

        conn.script(XEvent::UnmapNotify { window: 0x400 });
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(tree.tree.lookup_window(0x400).is_none());
    }

    #[test]
    fn configure_requests_on_managed_windows_are_denied() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.set_attrs(0x500, plain_attrs());
        conn.script(XEvent::MapRequest { window: 0x500, override_redirect: false });
        drain(&mut tree, &mut conn, &mut reactor);
        conn.requests.clear();

        conn.script(XEvent::ConfigureRequest {
            window: 0x500,
            geometry: Geometry::new(5, 5, 50, 50),
        });
        drain(&mut tree, &mut conn, &mut reactor);
        let denied = conn.ops().iter().any(|op| {
            matches!(op, XOp::DenyConfigure { window: 0x500, geometry }
                     if geometry.size.w != 50)
        });
        assert!(denied, "expected a synthetic ConfigureNotify with the real rect");
    }

    #[test]
    fn configure_requests_on_unmanaged_windows_are_forwarded() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.script(XEvent::ConfigureRequest {
            window: 0x600,
            geometry: Geometry::new(5, 5, 50, 50),
        });
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(conn.ops().contains(&XOp::Configure {
            window: 0x600,
            geometry: Geometry::new(5, 5, 50, 50),
        }));
    }

    #[test]
    fn sync_requests_are_answered_after_the_settle_step() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.script(XEvent::SyncRequest { window: 0x700, cookie: 1234 });
        drain(&mut tree, &mut conn, &mut reactor);
        let position = conn
            .requests
            .iter()
            .position(|r| *r == Recorded::SyncReply { window: 0x700, cookie: 1234 })
            .expect("sync reply missing");
        // The reply goes out with the flush, after everything else.
        assert!(matches!(conn.requests.last(), Some(Recorded::Flush)));
        assert!(position < conn.requests.len() - 1);
    }

    #[test]
    fn ignore_table_swallows_echoed_enters() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.set_attrs(0x800, plain_attrs());
        conn.set_attrs(0x801, plain_attrs());
        conn.script(XEvent::MapRequest { window: 0x800, override_redirect: false });
        conn.script(XEvent::MapRequest { window: 0x801, override_redirect: false });
        drain(&mut tree, &mut conn, &mut reactor);
        // Window 0x801 was mapped last and holds focus; the flush left
        // configure entries in the ignore table.
        assert!(!reactor.ignore.is_empty());
        assert_eq!(
            tree.focused_leaf().map(|l| tree.tree[l].window_id().unwrap()),
            Some(0x801)
        );

        // An EnterNotify stamped with an ignored sequence is an echo of
        // our own configure: it must not move focus.
        reactor.ignore.add(9999, super::super::EventKind::Enter);
        conn.scripted.push_back((9999, XEvent::EnterNotify { window: 0x800 }));
        while let Some((seq, event)) = conn.poll_event().unwrap() {
            reactor.dispatch(&mut tree, &mut conn, seq, event);
        }
        assert_eq!(
            tree.focused_leaf().map(|l| tree.tree[l].window_id().unwrap()),
            Some(0x801)
        );

        // The same event with a fresh sequence is the user moving the
        // pointer: focus follows.
        conn.scripted.push_back((10001, XEvent::EnterNotify { window: 0x800 }));
        while let Some((seq, event)) = conn.poll_event().unwrap() {
            reactor.dispatch(&mut tree, &mut conn, seq, event);
        }
        assert_eq!(
            tree.focused_leaf().map(|l| tree.tree[l].window_id().unwrap()),
            Some(0x800)
        );
    }

    #[test]
    fn hotplug_adds_and_removes_outputs() {
        let (mut tree, mut conn, mut reactor) = world();
        conn.set_attrs(0x900, plain_attrs());
        conn.script(XEvent::MapRequest { window: 0x900, override_redirect: false });
        drain(&mut tree, &mut conn, &mut reactor);

        conn.outputs.push(super::super::OutputInfo {
            name: "fake-1".into(),
            rect: Geometry::new(800, 0, 1024, 768),
            active: true,
        });
        conn.script(XEvent::ScreenChange);
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(tree.tree.output_ix_by_name("fake-1").is_some());

        // fake-0 disappears; its workspaces evacuate to fake-1.
        conn.outputs.remove(0);
        conn.script(XEvent::ScreenChange);
        drain(&mut tree, &mut conn, &mut reactor);
        assert!(tree.tree.output_ix_by_name("fake-0").is_none());
        let leaf = tree.tree.lookup_window(0x900).unwrap();
        let output = tree.output_of(leaf).unwrap();
        assert_eq!(tree.tree[output].name(), "fake-1");
    }
}
