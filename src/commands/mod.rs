//! Command records: the parsed form of the user-facing command language.
//!
//! A command string is a `;`-separated sequence of commands, each holding
//! an optional criteria set and a `,`-separated list of operations. The
//! executor applies operations to the leaves selected by the criteria, or
//! to the focused container when no criteria are given.

pub mod exec;
pub mod parse;

use regex::Regex;

use crate::layout::{ContainerType, Direction, KillPolicy, LayoutTree, Orientation};
use crate::manage::Window;
use crate::x11::WindowId;
use petgraph::graph::NodeIndex;

/// One predicate of a criteria set. All predicates of a set must hold.
#[derive(Debug, Clone)]
pub enum Criterion {
    Class(Regex),
    Instance(Regex),
    Title(Regex),
    Mark(String),
    /// `con_id=<uuid>`: a specific container.
    ConId(uuid::Uuid),
    /// `id=<x11-window-id>`.
    Id(WindowId),
    WindowType(String),
    Floating,
    Tiling,
    Urgent,
}

impl Criterion {
    /// Whether the predicate holds for a window descriptor. Criteria that
    /// need tree context (mark, con_id, floating) are checked in
    /// [`Match::matches_leaf`].
    pub fn matches_window(&self, window: &Window) -> bool {
        match *self {
            Criterion::Class(ref re) => re.is_match(&window.class),
            Criterion::Instance(ref re) => re.is_match(&window.instance),
            Criterion::Title(ref re) => re.is_match(&window.title),
            Criterion::Id(id) => window.id == id,
            Criterion::WindowType(ref kind) => {
                format!("{:?}", window.kind).eq_ignore_ascii_case(kind)
            }
            Criterion::Urgent => window.urgent,
            // Tree-context criteria cannot be decided from the descriptor
            // alone; adoption-time matching treats them as non-matching.
            Criterion::Mark(_) | Criterion::ConId(_) => false,
            Criterion::Floating => false,
            Criterion::Tiling => true,
        }
    }
}

/// A conjunction of criteria, as used by command selection and by the
/// assignment rules.
#[derive(Debug, Clone, Default)]
pub struct Match {
    pub criteria: Vec<Criterion>,
}

impl Match {
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Adoption-time matching against a bare window descriptor.
    pub fn matches_window(&self, window: &Window) -> bool {
        self.criteria.iter().all(|c| c.matches_window(window))
    }

    /// Full matching against a leaf in the tree.
    pub fn matches_leaf(&self, tree: &LayoutTree, leaf_ix: NodeIndex) -> bool {
        let container = &tree.tree[leaf_ix];
        let window = match container.window() {
            Some(window) => window,
            None => return false,
        };
        self.criteria.iter().all(|criterion| match *criterion {
            Criterion::Mark(ref mark) => container.mark() == Some(mark.as_str()),
            Criterion::ConId(id) => tree.tree.lookup_id(id) == Some(leaf_ix),
            Criterion::Floating => {
                tree.tree
                    .ancestor_of_type(leaf_ix, ContainerType::FloatingWrapper)
                    .is_ok()
            }
            Criterion::Tiling => {
                tree.tree
                    .ancestor_of_type(leaf_ix, ContainerType::FloatingWrapper)
                    .is_err()
            }
            Criterion::Urgent => container.urgent(),
            ref other => other.matches_window(window),
        })
    }
}

/// `focus <…>` targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    Direction(Direction),
    Parent,
    Child,
    Floating,
    Tiling,
    ModeToggle,
}

/// `move <…>` targets.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveTarget {
    Direction(Direction),
    ToWorkspace(String),
    ToWorkspaceNumber(i32),
    ToWorkspaceCurrent,
    WorkspaceNext,
    WorkspacePrev,
    ToOutput(String),
    /// `move workspace to output <name>`: moves the whole workspace.
    WorkspaceToOutput(String),
    Scratchpad,
}

/// `workspace <…>` targets.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceTarget {
    Name(String),
    Number(i32),
    BackAndForth,
    Next,
    Prev,
    NextOnOutput,
    PrevOnOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
    Default,
    Stacked,
    Tabbed,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleArg {
    Enable,
    Disable,
    Toggle,
}

/// The closed set of operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Focus(FocusTarget),
    Move(MoveTarget),
    Resize {
        grow: bool,
        direction: Direction,
        px: u32,
        ppt: u32,
    },
    Split(Orientation),
    Layout(LayoutArg),
    Floating(ToggleArg),
    Fullscreen { arg: ToggleArg, global: bool },
    Kill(KillPolicy),
    Mark(String),
    Unmark(Option<String>),
    Workspace(WorkspaceTarget),
    ScratchpadShow,
    Sticky(ToggleArg, Option<String>),
    Exec(String),
    Nop(Option<String>),
    Restart,
    Reload,
    Exit,
}

/// One parsed command: criteria plus a non-empty operation list.
#[derive(Debug, Clone)]
pub struct Command {
    pub criteria: Match,
    pub ops: Vec<Op>,
}

/// Per-command reply entry, serialized into the COMMAND response.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    pub success: bool,
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok() -> CommandReply {
        CommandReply { success: true, error: None }
    }

    pub fn err(message: String) -> CommandReply {
        CommandReply { success: false, error: Some(message) }
    }
}
