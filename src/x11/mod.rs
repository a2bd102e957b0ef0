//! Types and the connection abstraction for talking to the X server.
//!
//! The layout engine never touches `xcb` directly: everything goes through
//! the [`XConn`] trait. The real backend lives in [`conn`], the recording
//! backend used by the test suite lives in [`dummy`].

pub mod conn;
#[cfg(test)]
pub mod dummy;
pub mod events;
pub mod ignore;

use std::fmt;
use std::os::unix::io::RawFd;

use bitflags::bitflags;

use crate::geometry::{Geometry, Point};

/// An X11 window resource id.
pub type WindowId = u32;

pub const WINDOW_NONE: WindowId = 0;

/// Sequence number stamped on requests and events by the connection.
pub type Seq = u64;

/// The property groups the reactor reacts to. Everything else is `Other`
/// and dropped on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowProperty {
    Title,
    Class,
    Hints,
    NormalHints,
    TransientFor,
    Leader,
    Protocols,
    Strut,
    WindowType,
    Other,
}

/// `_NET_WM_STATE` client message actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_data(data: u32) -> Option<StateAction> {
        match data {
            0 => Some(StateAction::Remove),
            1 => Some(StateAction::Add),
            2 => Some(StateAction::Toggle),
            _ => None,
        }
    }
}

/// X events, already translated out of their wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum XEvent {
    MapRequest { window: WindowId, override_redirect: bool },
    UnmapNotify { window: WindowId },
    DestroyNotify { window: WindowId },
    ConfigureRequest { window: WindowId, geometry: Geometry },
    PropertyNotify { window: WindowId, property: WindowProperty },
    EnterNotify { window: WindowId },
    ButtonPress { window: WindowId, button: u8, point: Point },
    /// `_NET_ACTIVE_WINDOW`
    ActiveWindowRequest { window: WindowId },
    /// `_NET_WM_STATE` with the fullscreen atom
    FullscreenRequest { window: WindowId, action: StateAction },
    /// `_NET_CURRENT_DESKTOP`
    CurrentDesktopRequest { index: u32 },
    /// `_NET_CLOSE_WINDOW`
    CloseWindowRequest { window: WindowId },
    /// `_NET_MOVERESIZE_WINDOW`
    MoveResizeRequest { window: WindowId, geometry: Geometry },
    /// `I3_SYNC` round-trip request
    SyncRequest { window: WindowId, cookie: u32 },
    MappingNotify,
    ScreenChange,
}

impl XEvent {
    /// The coarse kind used by the event-ignore table.
    pub fn kind(&self) -> EventKind {
        match *self {
            XEvent::EnterNotify { .. } => EventKind::Enter,
            XEvent::UnmapNotify { .. } => EventKind::Unmap,
            XEvent::ConfigureRequest { .. } => EventKind::Configure,
            _ => EventKind::Other,
        }
    }
}

/// Event kinds that self-caused requests can echo back at us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Enter,
    Unmap,
    Configure,
    Other,
}

/// Reserved screen edges advertised by a dock via `_NET_WM_STRUT_PARTIAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

bitflags! {
    /// The subset of `WM_PROTOCOLS` the manager acts on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Protocols: u32 {
        const DELETE_WINDOW = 1 << 0;
        const TAKE_FOCUS = 1 << 1;
    }
}

bitflags! {
    /// Flag word of `WM_HINTS`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmHintsFlags: u32 {
        const INPUT = 1 << 0;
        const URGENCY = 1 << 8;
    }
}

/// Window type derived from `_NET_WM_WINDOW_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    #[default]
    Normal,
    Dialog,
    Utility,
    Toolbar,
    Splash,
    Dock,
}

impl WindowKind {
    /// Types that are adopted straight into a floating wrapper.
    pub fn wants_floating(self) -> bool {
        matches!(
            self,
            WindowKind::Dialog | WindowKind::Utility | WindowKind::Toolbar | WindowKind::Splash
        )
    }
}

/// Everything the adopter needs to know about a window, read in one pass.
#[derive(Debug, Clone, Default)]
pub struct WindowAttributes {
    pub title: String,
    pub class: String,
    pub instance: String,
    pub leader: WindowId,
    pub transient_for: Option<WindowId>,
    pub kind: WindowKind,
    pub protocols: Protocols,
    pub accepts_input: bool,
    pub urgent: bool,
    pub strut: Strut,
    pub min_size: Option<(u32, u32)>,
    pub geometry: Geometry,
    pub override_redirect: bool,
    pub initially_fullscreen: bool,
}

/// One active CRTC as reported by RandR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub name: String,
    pub rect: Geometry,
    pub active: bool,
}

#[derive(Debug)]
pub enum XError {
    /// The server went away. Fatal; the loop exits.
    ConnectionLost,
    /// A request failed with an X protocol error outside the ignore table.
    Protocol(String),
}

impl fmt::Display for XError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            XError::ConnectionLost => write!(f, "X11 connection lost"),
            XError::Protocol(ref msg) => write!(f, "X protocol error: {}", msg),
        }
    }
}

/// A request queued by the layout engine, applied by the reactor at the
/// settle step. Nothing is written to the X socket between ops of a command
/// sequence; the queue is drained once and followed by a single flush.
#[derive(Debug, Clone, PartialEq)]
pub enum XOp {
    Map(WindowId),
    /// The queueing site must bump `ignore_unmap_count` on the owning leaf
    /// first if the leaf survives the unmap.
    Unmap(WindowId),
    Configure { window: WindowId, geometry: Geometry },
    /// Reply to a denied ConfigureRequest with a synthetic ConfigureNotify
    /// carrying the window's current rect.
    DenyConfigure { window: WindowId, geometry: Geometry },
    SetInputFocus(WindowId),
    /// ICCCM `WM_TAKE_FOCUS` client message; sent instead of SetInputFocus.
    TakeFocus(WindowId),
    SendDelete(WindowId),
    KillClient(WindowId),
    /// `_NET_CLIENT_LIST` refresh.
    UpdateClientList(Vec<WindowId>),
    /// `_NET_CURRENT_DESKTOP` refresh.
    UpdateCurrentDesktop(u32),
    /// `_NET_ACTIVE_WINDOW` refresh.
    UpdateActiveWindow(WindowId),
    /// `_NET_WORKAREA` refresh, one rectangle per desktop.
    UpdateWorkarea(Vec<Geometry>),
}

/// A handle on a running X11 connection.
///
/// Implementations stamp a monotonically increasing sequence number on every
/// request they issue and on every event they deliver, which is what the
/// event-ignore table keys on.
pub trait XConn {
    /// File descriptor to poll for readability.
    fn fd(&self) -> RawFd;

    /// Translate and return the next already-received event, if any.
    /// Never blocks.
    fn poll_event(&mut self) -> Result<Option<(Seq, XEvent)>, XError>;

    /// Sequence number of the most recently issued request.
    fn last_sequence(&self) -> Seq;

    /// Flush all buffered requests to the server in one write.
    fn flush(&mut self) -> Result<(), XError>;

    /// Active outputs, synthetic ones excluded.
    fn outputs(&mut self) -> Vec<OutputInfo>;

    /// Top-level windows that existed before we started managing.
    fn existing_windows(&mut self) -> Vec<WindowId>;

    /// One-pass property read at adoption time.
    fn window_attributes(&mut self, window: WindowId) -> WindowAttributes;

    /// Re-read a single property group after a PropertyNotify.
    fn refresh_property(
        &mut self,
        window: WindowId,
        property: WindowProperty,
        attrs: &mut WindowAttributes,
    );

    fn map_window(&mut self, window: WindowId) -> Seq;
    fn unmap_window(&mut self, window: WindowId) -> Seq;
    fn configure_window(&mut self, window: WindowId, geometry: Geometry) -> Seq;
    fn send_configure_notify(&mut self, window: WindowId, geometry: Geometry);
    fn set_input_focus(&mut self, window: WindowId);
    fn send_take_focus(&mut self, window: WindowId);
    fn send_delete(&mut self, window: WindowId);
    fn kill_client(&mut self, window: WindowId);
    fn subscribe_to(&mut self, window: WindowId);

    /// Root property bookkeeping.
    fn set_client_list(&mut self, windows: &[WindowId]);
    fn set_current_desktop(&mut self, index: u32);
    fn set_active_window(&mut self, window: WindowId);
    fn set_workarea(&mut self, areas: &[Geometry]);
    /// `I3_SOCKET_PATH`, `I3_CONFIG_PATH`, `_NET_SUPPORTED`,
    /// `_NET_SUPPORTING_WM_CHECK`, `_NET_WM_NAME`.
    fn init_wm_properties(&mut self, socket_path: &str, config_path: &str);

    /// `I3_SYNC` reply, echoing the client's payload.
    fn send_sync_reply(&mut self, window: WindowId, cookie: u32);

    /// Apply one queued op.
    fn apply(&mut self, op: &XOp) -> Seq {
        match *op {
            XOp::Map(w) => return self.map_window(w),
            XOp::Unmap(w) => return self.unmap_window(w),
            XOp::Configure { window, geometry } => {
                return self.configure_window(window, geometry)
            }
            XOp::DenyConfigure { window, geometry } => {
                self.send_configure_notify(window, geometry)
            }
            XOp::SetInputFocus(w) => self.set_input_focus(w),
            XOp::TakeFocus(w) => self.send_take_focus(w),
            XOp::SendDelete(w) => self.send_delete(w),
            XOp::KillClient(w) => self.kill_client(w),
            XOp::UpdateClientList(ref list) => self.set_client_list(list),
            XOp::UpdateCurrentDesktop(n) => self.set_current_desktop(n),
            XOp::UpdateActiveWindow(w) => self.set_active_window(w),
            XOp::UpdateWorkarea(ref areas) => self.set_workarea(areas),
        }
        self.last_sequence()
    }
}
