//! Container types

use std::fmt;

use uuid::Uuid;

use crate::geometry::Geometry;
use crate::manage::Window;
use crate::x11::WindowId;

/// Types of containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    /// Root container, only one exists
    Root,
    /// A monitor (plus the synthetic `__i3` output)
    Output,
    /// The slot of an output that holds its workspaces
    Content,
    /// The slot of an output that holds dock windows, top or bottom
    Dockarea,
    /// A workspace
    Workspace,
    /// A tiling split, houses leaves and other splits
    Split,
    /// A leaf, exactly one window attached
    Leaf,
    /// Detaches exactly one subtree from tiling geometry
    FloatingWrapper,
}

impl ContainerType {
    /// Whether this container can be used as the parent of another.
    pub fn can_have_child(self, other: ContainerType) -> bool {
        use self::ContainerType::*;
        match self {
            Root => other == Output,
            Output => other == Content || other == Dockarea,
            Content => other == Workspace,
            Dockarea => other == Leaf,
            Workspace => other == Split || other == Leaf || other == FloatingWrapper,
            Split => other == Split || other == Leaf,
            FloatingWrapper => other == Split || other == Leaf,
            Leaf => false,
        }
    }

    /// The integer exposed as `type` in the tree dump. Matches the order the
    /// kinds are declared in.
    pub fn ordinal(self) -> u32 {
        use self::ContainerType::*;
        match self {
            Root => 0,
            Output => 1,
            Content => 2,
            Dockarea => 3,
            Workspace => 4,
            Split => 5,
            Leaf => 6,
            FloatingWrapper => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerErr {
    /// A bad operation on the container type.
    /// The human readable string provides more context.
    BadOperationOn(ContainerType, String),
}

/// How a container presents its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Split,
    Stacked,
    Tabbed,
    Dockarea,
    Output,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match *self {
            Layout::Split => "split",
            Layout::Stacked => "stacked",
            Layout::Tabbed => "tabbed",
            Layout::Dockarea => "dockarea",
            Layout::Output => "output",
        })
    }
}

/// Direction of the primary axis of a workspace or split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Unset,
    Horizontal,
    Vertical,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match *self {
            Orientation::Unset => "none",
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        })
    }
}

/// Floating runs on a four-value scale so that the manager can tell apart
/// "the user asked for this" from "a window type implied it". Everything at
/// `AutoOn` and above is detached from tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FloatingState {
    AutoOff,
    UserOff,
    AutoOn,
    UserOn,
}

impl FloatingState {
    pub fn is_floating(self) -> bool {
        self >= FloatingState::AutoOn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenMode {
    None,
    /// Fills its output. On a workspace this marks the visible one.
    Output,
    /// Fills everything; exclusive across the whole tree.
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockPosition {
    Top,
    Bottom,
}

/// Parses the leading decimal of a workspace name, i3-style: "5" and
/// "5: mail" are both workspace number 5, "mail" is -1.
pub fn parse_workspace_num(name: &str) -> i32 {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return -1;
    }
    digits.parse().unwrap_or(-1)
}

/// Represents an item in the container tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    /// Root node of the tree, exists for the process lifetime
    Root { id: Uuid },
    /// A monitor
    Output {
        /// RandR name of the output, or `__i3` for the synthetic one
        name: String,
        /// False once the CRTC disappears and before children are evacuated
        active: bool,
        rect: Geometry,
        id: Uuid,
    },
    /// The workspace slot of an output
    Content { rect: Geometry, id: Uuid },
    /// A dock slot of an output
    Dockarea {
        position: DockPosition,
        rect: Geometry,
        id: Uuid,
    },
    /// Workspace
    Workspace {
        /// Name of the workspace
        name: String,
        /// Leading decimal of the name, or -1
        num: i32,
        /// Layout given to fresh tiling children
        layout: Layout,
        orientation: Orientation,
        rect: Geometry,
        /// `Output` here marks the workspace visible on its output
        fullscreen_mode: FullscreenMode,
        urgent: bool,
        id: Uuid,
    },
    /// A tiling split
    Split {
        layout: Layout,
        orientation: Orientation,
        rect: Geometry,
        deco_rect: Geometry,
        floating: FloatingState,
        fullscreen_mode: FullscreenMode,
        urgent: bool,
        id: Uuid,
    },
    /// A leaf with its window
    Leaf {
        window: Window,
        rect: Geometry,
        /// Inner rectangle handed to the client
        window_rect: Geometry,
        /// Title strip, empty unless the parent stacks or tabs
        deco_rect: Geometry,
        floating: FloatingState,
        fullscreen_mode: FullscreenMode,
        urgent: bool,
        /// User-assigned identifier for command targeting
        mark: Option<String>,
        /// At most one container per group displays the window at a time
        sticky_group: Option<String>,
        /// Self-caused unmaps still in flight; matching UnmapNotify events
        /// decrement instead of closing the leaf
        ignore_unmap_count: u32,
        id: Uuid,
    },
    /// Wraps exactly one floating subtree on a workspace
    FloatingWrapper { rect: Geometry, id: Uuid },
}

impl Container {
    /// Creates a new root container.
    pub fn new_root() -> Container {
        Container::Root { id: Uuid::new_v4() }
    }

    /// Creates a new output container with the given RandR name and rect.
    pub fn new_output(name: String, rect: Geometry) -> Container {
        Container::Output {
            name,
            active: true,
            rect,
            id: Uuid::new_v4(),
        }
    }

    pub fn new_content(rect: Geometry) -> Container {
        Container::Content {
            rect,
            id: Uuid::new_v4(),
        }
    }

    pub fn new_dockarea(position: DockPosition, rect: Geometry) -> Container {
        Container::Dockarea {
            position,
            rect,
            id: Uuid::new_v4(),
        }
    }

    /// Creates a new workspace container with the given name and size.
    /// Usually the size is the same as the output content area it resides
    /// on. Starts invisible; the workspace manager flips visibility.
    pub fn new_workspace(name: String, rect: Geometry, layout: Layout) -> Container {
        let num = parse_workspace_num(&name);
        Container::Workspace {
            name,
            num,
            layout,
            orientation: Orientation::Unset,
            rect,
            fullscreen_mode: FullscreenMode::None,
            urgent: false,
            id: Uuid::new_v4(),
        }
    }

    /// Creates a new split container.
    pub fn new_split(layout: Layout, orientation: Orientation, rect: Geometry) -> Container {
        Container::Split {
            layout,
            orientation,
            rect,
            deco_rect: Geometry::zero(),
            floating: FloatingState::AutoOff,
            fullscreen_mode: FullscreenMode::None,
            urgent: false,
            id: Uuid::new_v4(),
        }
    }

    /// Creates a new leaf adopting the given window descriptor.
    pub fn new_leaf(window: Window) -> Container {
        let rect = window.geometry;
        Container::Leaf {
            window,
            rect,
            window_rect: rect,
            deco_rect: Geometry::zero(),
            floating: FloatingState::AutoOff,
            fullscreen_mode: FullscreenMode::None,
            urgent: false,
            mark: None,
            sticky_group: None,
            ignore_unmap_count: 0,
            id: Uuid::new_v4(),
        }
    }

    pub fn new_floating_wrapper(rect: Geometry) -> Container {
        Container::FloatingWrapper {
            rect,
            id: Uuid::new_v4(),
        }
    }

    /// Gets the type of this container
    pub fn get_type(&self) -> ContainerType {
        match *self {
            Container::Root { .. } => ContainerType::Root,
            Container::Output { .. } => ContainerType::Output,
            Container::Content { .. } => ContainerType::Content,
            Container::Dockarea { .. } => ContainerType::Dockarea,
            Container::Workspace { .. } => ContainerType::Workspace,
            Container::Split { .. } => ContainerType::Split,
            Container::Leaf { .. } => ContainerType::Leaf,
            Container::FloatingWrapper { .. } => ContainerType::FloatingWrapper,
        }
    }

    pub fn get_id(&self) -> Uuid {
        match *self {
            Container::Root { id }
            | Container::Output { id, .. }
            | Container::Content { id, .. }
            | Container::Dockarea { id, .. }
            | Container::Workspace { id, .. }
            | Container::Split { id, .. }
            | Container::Leaf { id, .. }
            | Container::FloatingWrapper { id, .. } => id,
        }
    }

    /// The attached window id, if this is a leaf.
    pub fn window_id(&self) -> Option<WindowId> {
        match *self {
            Container::Leaf { ref window, .. } => Some(window.id),
            _ => None,
        }
    }

    pub fn window(&self) -> Option<&Window> {
        match *self {
            Container::Leaf { ref window, .. } => Some(window),
            _ => None,
        }
    }

    pub fn window_mut(&mut self) -> Option<&mut Window> {
        match *self {
            Container::Leaf { ref mut window, .. } => Some(window),
            _ => None,
        }
    }

    /// Gets the name of the container.
    ///
    /// Root: the literal string "root". Output/Workspace: their names.
    /// Content/Dockarea: the slot name. Split/FloatingWrapper: the layout.
    /// Leaf: the window title.
    pub fn name(&self) -> String {
        match *self {
            Container::Root { .. } => "root".into(),
            Container::Output { ref name, .. } => name.clone(),
            Container::Content { .. } => "content".into(),
            Container::Dockarea { position, .. } => match position {
                DockPosition::Top => "topdock".into(),
                DockPosition::Bottom => "bottomdock".into(),
            },
            Container::Workspace { ref name, .. } => name.clone(),
            Container::Split { layout, orientation, .. } => {
                format!("{} {}", layout, orientation)
            }
            Container::Leaf { ref window, .. } => window.title.clone(),
            Container::FloatingWrapper { .. } => "floating".into(),
        }
    }

    /// Workspace name, if this is a workspace.
    pub fn workspace_name(&self) -> Option<&str> {
        match *self {
            Container::Workspace { ref name, .. } => Some(name),
            _ => None,
        }
    }

    /// Parsed workspace number, -1 for named workspaces, None otherwise.
    pub fn workspace_num(&self) -> Option<i32> {
        match *self {
            Container::Workspace { num, .. } => Some(num),
            _ => None,
        }
    }

    /// Whether this is a `__`-prefixed workspace or the `__i3` output.
    /// Internal containers are never shown by user commands and never
    /// pruned.
    pub fn is_internal(&self) -> bool {
        match *self {
            Container::Workspace { ref name, .. } | Container::Output { ref name, .. } => {
                name.starts_with("__")
            }
            _ => false,
        }
    }

    /// Gets the outer rectangle of the container. The root has none.
    pub fn get_geometry(&self) -> Option<Geometry> {
        match *self {
            Container::Root { .. } => None,
            Container::Output { rect, .. }
            | Container::Content { rect, .. }
            | Container::Dockarea { rect, .. }
            | Container::Workspace { rect, .. }
            | Container::Split { rect, .. }
            | Container::Leaf { rect, .. }
            | Container::FloatingWrapper { rect, .. } => Some(rect),
        }
    }

    /// Sets the outer rectangle. Panics if called on the root, which is a
    /// bug in the solver.
    pub fn set_geometry(&mut self, geo: Geometry) {
        match *self {
            Container::Root { .. } => panic!("Tried to set the geometry of the root!"),
            Container::Output { ref mut rect, .. }
            | Container::Content { ref mut rect, .. }
            | Container::Dockarea { ref mut rect, .. }
            | Container::Workspace { ref mut rect, .. }
            | Container::Split { ref mut rect, .. }
            | Container::Leaf { ref mut rect, .. }
            | Container::FloatingWrapper { ref mut rect, .. } => {
                *rect = geo;
            }
        }
    }

    /// Inner rectangle handed to the client; only leaves have one.
    pub fn window_rect(&self) -> Option<Geometry> {
        match *self {
            Container::Leaf { window_rect, .. } => Some(window_rect),
            _ => None,
        }
    }

    pub fn set_window_rect(&mut self, geo: Geometry) -> Result<(), ContainerErr> {
        match *self {
            Container::Leaf { ref mut window_rect, .. } => {
                *window_rect = geo;
                Ok(())
            }
            ref other => Err(ContainerErr::BadOperationOn(
                other.get_type(),
                "Only leaves have a window rect".into(),
            )),
        }
    }

    pub fn deco_rect(&self) -> Geometry {
        match *self {
            Container::Split { deco_rect, .. } | Container::Leaf { deco_rect, .. } => deco_rect,
            _ => Geometry::zero(),
        }
    }

    pub fn set_deco_rect(&mut self, geo: Geometry) {
        match *self {
            Container::Split { ref mut deco_rect, .. }
            | Container::Leaf { ref mut deco_rect, .. } => *deco_rect = geo,
            _ => {}
        }
    }

    pub fn get_layout(&self) -> Result<Layout, ContainerErr> {
        match *self {
            Container::Workspace { layout, .. } | Container::Split { layout, .. } => Ok(layout),
            Container::Dockarea { .. } => Ok(Layout::Dockarea),
            Container::Output { .. } => Ok(Layout::Output),
            ref other => Err(ContainerErr::BadOperationOn(
                other.get_type(),
                "Only workspaces and splits have a layout".into(),
            )),
        }
    }

    pub fn set_layout(&mut self, new_layout: Layout) -> Result<(), ContainerErr> {
        match *self {
            Container::Workspace { ref mut layout, .. }
            | Container::Split { ref mut layout, .. } => {
                *layout = new_layout;
                Ok(())
            }
            ref other => Err(ContainerErr::BadOperationOn(
                other.get_type(),
                format!("Can only set the layout of a workspace or split, not {:?}",
                        other.get_type()),
            )),
        }
    }

    pub fn orientation(&self) -> Orientation {
        match *self {
            Container::Workspace { orientation, .. } | Container::Split { orientation, .. } => {
                orientation
            }
            _ => Orientation::Unset,
        }
    }

    pub fn set_orientation(&mut self, new_orientation: Orientation) -> Result<(), ContainerErr> {
        match *self {
            Container::Workspace { ref mut orientation, .. }
            | Container::Split { ref mut orientation, .. } => {
                *orientation = new_orientation;
                Ok(())
            }
            ref other => Err(ContainerErr::BadOperationOn(
                other.get_type(),
                "Only workspaces and splits have an orientation".into(),
            )),
        }
    }

    pub fn floating(&self) -> bool {
        self.floating_state().is_floating()
    }

    pub fn floating_state(&self) -> FloatingState {
        match *self {
            Container::Split { floating, .. } | Container::Leaf { floating, .. } => floating,
            _ => FloatingState::AutoOff,
        }
    }

    /// If not set on a leaf or split, an error is returned telling what
    /// container type this function was (incorrectly) called on.
    pub fn set_floating_state(&mut self, val: FloatingState) -> Result<(), ContainerType> {
        let c_type = self.get_type();
        match *self {
            Container::Split { ref mut floating, .. }
            | Container::Leaf { ref mut floating, .. } => {
                *floating = val;
                Ok(())
            }
            _ => Err(c_type),
        }
    }

    pub fn fullscreen_mode(&self) -> FullscreenMode {
        match *self {
            Container::Workspace { fullscreen_mode, .. }
            | Container::Split { fullscreen_mode, .. }
            | Container::Leaf { fullscreen_mode, .. } => fullscreen_mode,
            _ => FullscreenMode::None,
        }
    }

    pub fn set_fullscreen_mode(&mut self, val: FullscreenMode) -> Result<(), ContainerType> {
        let c_type = self.get_type();
        match *self {
            Container::Workspace { ref mut fullscreen_mode, .. }
            | Container::Split { ref mut fullscreen_mode, .. }
            | Container::Leaf { ref mut fullscreen_mode, .. } => {
                *fullscreen_mode = val;
                Ok(())
            }
            _ => Err(c_type),
        }
    }

    pub fn urgent(&self) -> bool {
        match *self {
            Container::Workspace { urgent, .. }
            | Container::Split { urgent, .. }
            | Container::Leaf { urgent, .. } => urgent,
            _ => false,
        }
    }

    pub fn set_urgent(&mut self, val: bool) {
        match *self {
            Container::Workspace { ref mut urgent, .. }
            | Container::Split { ref mut urgent, .. }
            | Container::Leaf { ref mut urgent, .. } => *urgent = val,
            _ => {}
        }
    }

    pub fn mark(&self) -> Option<&str> {
        match *self {
            Container::Leaf { ref mark, .. } => mark.as_deref(),
            _ => None,
        }
    }

    pub fn set_mark(&mut self, val: Option<String>) -> Result<(), ContainerErr> {
        match *self {
            Container::Leaf { ref mut mark, .. } => {
                *mark = val;
                Ok(())
            }
            ref other => Err(ContainerErr::BadOperationOn(
                other.get_type(),
                "Only leaves can be marked".into(),
            )),
        }
    }

    pub fn sticky_group(&self) -> Option<&str> {
        match *self {
            Container::Leaf { ref sticky_group, .. } => sticky_group.as_deref(),
            _ => None,
        }
    }

    pub fn ignore_unmap_count(&self) -> u32 {
        match *self {
            Container::Leaf { ignore_unmap_count, .. } => ignore_unmap_count,
            _ => 0,
        }
    }

    /// Bumps the count of in-flight self-caused unmaps.
    pub fn bump_ignore_unmap(&mut self) {
        if let Container::Leaf { ref mut ignore_unmap_count, .. } = *self {
            *ignore_unmap_count += 1;
        }
    }

    /// Consumes one in-flight unmap. Returns true if one was pending, in
    /// which case the matching UnmapNotify must be dropped.
    pub fn consume_ignore_unmap(&mut self) -> bool {
        if let Container::Leaf { ref mut ignore_unmap_count, .. } = *self {
            if *ignore_unmap_count > 0 {
                *ignore_unmap_count -= 1;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_have_child() {
        use super::ContainerType::*;

        assert!(Root.can_have_child(Output), "Root > output");
        assert!(Output.can_have_child(Content), "Output > content");
        assert!(Output.can_have_child(Dockarea), "Output > dockarea");
        assert!(Content.can_have_child(Workspace), "Content > workspace");
        assert!(Dockarea.can_have_child(Leaf), "Dockarea > leaf");
        assert!(Workspace.can_have_child(Split), "Workspace > split");
        assert!(Workspace.can_have_child(Leaf), "Workspace > leaf");
        assert!(Workspace.can_have_child(FloatingWrapper), "Workspace > wrapper");
        assert!(Split.can_have_child(Split), "Split > split");
        assert!(Split.can_have_child(Leaf), "Split > leaf");
        assert!(FloatingWrapper.can_have_child(Leaf), "Wrapper > leaf");
        assert!(FloatingWrapper.can_have_child(Split), "Wrapper > split");

        assert!(!Root.can_have_child(Root), "! Root > root");
        assert!(!Root.can_have_child(Workspace), "! Root > workspace");
        assert!(!Output.can_have_child(Workspace), "! Output > workspace");
        assert!(!Workspace.can_have_child(Workspace), "! Workspace > workspace");
        assert!(!Split.can_have_child(Workspace), "! Split > workspace");
        assert!(!Split.can_have_child(FloatingWrapper), "! Split > wrapper");
        for other in [Root, Output, Content, Dockarea, Workspace, Split, Leaf, FloatingWrapper] {
            assert!(!Leaf.can_have_child(other), "! Leaf > anything");
        }
    }

    #[test]
    fn workspace_num_parsing() {
        assert_eq!(parse_workspace_num("5"), 5);
        assert_eq!(parse_workspace_num("10: mail"), 10);
        assert_eq!(parse_workspace_num("mail"), -1);
        assert_eq!(parse_workspace_num(""), -1);
        assert_eq!(parse_workspace_num("0"), 0);
        assert_eq!(parse_workspace_num("-3"), -1);
    }

    #[test]
    fn floating_scale() {
        assert!(!FloatingState::AutoOff.is_floating());
        assert!(!FloatingState::UserOff.is_floating());
        assert!(FloatingState::AutoOn.is_floating());
        assert!(FloatingState::UserOn.is_floating());
        assert!(FloatingState::UserOn > FloatingState::AutoOn);
    }

    #[test]
    fn internal_names() {
        let ws = Container::new_workspace("__i3_scratch".into(), Geometry::zero(), Layout::Split);
        assert!(ws.is_internal());
        let ws = Container::new_workspace("3".into(), Geometry::zero(), Layout::Split);
        assert!(!ws.is_internal());
        let output = Container::new_output("__i3".into(), Geometry::zero());
        assert!(output.is_internal());
    }

    #[test]
    fn layout_change_is_type_checked() {
        let mut split = Container::new_split(
            Layout::Split,
            Orientation::Horizontal,
            Geometry::zero(),
        );
        split.set_layout(Layout::Stacked).unwrap();
        assert_eq!(split.get_layout().unwrap(), Layout::Stacked);

        let mut root = Container::new_root();
        assert!(root.set_layout(Layout::Stacked).is_err());
        let mut wrapper = Container::new_floating_wrapper(Geometry::zero());
        assert!(wrapper.set_layout(Layout::Tabbed).is_err());
    }

    #[test]
    fn unmap_counting() {
        let window = Window::for_tests(0xdead);
        let mut leaf = Container::new_leaf(window);
        assert!(!leaf.consume_ignore_unmap());
        leaf.bump_ignore_unmap();
        leaf.bump_ignore_unmap();
        assert_eq!(leaf.ignore_unmap_count(), 2);
        assert!(leaf.consume_ignore_unmap());
        assert!(leaf.consume_ignore_unmap());
        assert!(!leaf.consume_ignore_unmap());
        assert_eq!(leaf.ignore_unmap_count(), 0);
    }
}
