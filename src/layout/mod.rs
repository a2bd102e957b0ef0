pub(crate) mod actions;
pub(crate) mod core;

pub use self::actions::focus::FocusError;
pub use self::actions::movement::MovementError;
pub use self::actions::resize::ResizeErr;
pub use self::actions::workspace::WorkspaceErr;
pub use self::core::container::{
    parse_workspace_num, Container, ContainerErr, ContainerType, DockPosition, FloatingState,
    FullscreenMode, Layout, Orientation,
};
pub use self::core::graph_tree::{GraphError, InnerTree, ShiftDirection, PERCENT_EPSILON};
pub use self::core::tree::{Direction, KillPolicy, TreeError};

use petgraph::graph::NodeIndex;
use serde_json::Value;

use crate::config::Config;
use crate::x11::XOp;

/// Result type for all tree-mutating operations.
pub type CommandResult = Result<(), TreeError>;

/// How a command asked the event loop to end the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunControl {
    Exit,
    Restart,
    Reload,
}

/// An IPC event queued by a mutation, broadcast to subscribed clients at
/// the settle step.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    /// Event name on the wire: "workspace", "window", "output", ...
    pub name: &'static str,
    pub payload: Value,
}

/// The world the manager operates on: the container tree plus the focus
/// bookkeeping and the effects queued for the reactor. All mutation happens
/// through methods on this type, on the single event-loop thread.
#[derive(Debug)]
pub struct LayoutTree {
    pub(crate) tree: InnerTree,
    /// The focused container. Usually a leaf; `focus parent` can park it on
    /// a split.
    pub(crate) focused: Option<NodeIndex>,
    /// Name of the most recently left workspace, for back-and-forth.
    pub(crate) prev_workspace: Option<String>,
    /// X requests queued by mutations, drained once per settle step.
    pub(crate) pending_x: Vec<XOp>,
    /// IPC events queued by mutations, drained once per settle step.
    pub(crate) pending_events: Vec<PendingEvent>,
    /// Command lines queued by `exec`, launched by the loop after the
    /// settle step.
    pub(crate) pending_exec: Vec<String>,
    pub(crate) config: Config,
    /// Set by `exit` / `restart` / `reload`.
    pub(crate) control: Option<RunControl>,
}

/// Name of the synthetic output holding internal workspaces.
pub const INTERNAL_OUTPUT: &str = "__i3";
/// Name of the scratchpad workspace on the synthetic output.
pub const SCRATCH_WORKSPACE: &str = "__i3_scratch";

impl LayoutTree {
    /// Creates a tree holding only the root and the synthetic `__i3`
    /// output with its scratchpad workspace. Real outputs arrive through
    /// the output manager.
    pub fn new(config: Config) -> LayoutTree {
        let mut this = LayoutTree {
            tree: InnerTree::new(),
            focused: None,
            prev_workspace: None,
            pending_x: Vec::new(),
            pending_events: Vec::new(),
            pending_exec: Vec::new(),
            config,
            control: None,
        };
        let root_ix = this.tree.root_ix();
        let geo = crate::geometry::Geometry::zero();
        let internal_ix = this
            .tree
            .add_child(root_ix, Container::new_output(INTERNAL_OUTPUT.into(), geo), false);
        let content_ix = this
            .tree
            .add_child(internal_ix, Container::new_content(geo), false);
        this.tree.add_child(
            content_ix,
            Container::new_workspace(SCRATCH_WORKSPACE.into(), geo, Layout::Split),
            false,
        );
        this
    }

    pub fn queue_x(&mut self, op: XOp) {
        self.pending_x.push(op);
    }

    pub fn queue_event(&mut self, name: &'static str, payload: Value) {
        self.pending_events.push(PendingEvent { name, payload });
    }

    pub fn take_pending_x(&mut self) -> Vec<XOp> {
        std::mem::take(&mut self.pending_x)
    }

    pub fn take_pending_events(&mut self) -> Vec<PendingEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn take_pending_exec(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_exec)
    }

    pub fn take_control(&mut self) -> Option<RunControl> {
        self.control.take()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
