//! A recording stand-in for the X server, used by the test suite the way
//! a headless compositor stub would be: events are scripted in, every
//! request is logged for assertions, and nothing touches a real display.

use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;

use crate::geometry::Geometry;

use super::{
    OutputInfo, Seq, WindowAttributes, WindowId, WindowProperty, XConn, XError, XEvent, XOp,
};

/// Everything a [`DummyConn`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Op(XOp),
    Subscribed(WindowId),
    SyncReply { window: WindowId, cookie: u32 },
    InitProperties { socket_path: String, config_path: String },
    Flush,
}

#[derive(Debug, Default)]
pub struct DummyConn {
    /// Events handed out by `poll_event`, front first.
    pub scripted: VecDeque<(Seq, XEvent)>,
    /// Everything that was sent, in order.
    pub requests: Vec<Recorded>,
    /// Attribute replies per window.
    pub attrs: HashMap<WindowId, WindowAttributes>,
    pub outputs: Vec<OutputInfo>,
    pub existing: Vec<WindowId>,
    seq: Seq,
}

impl DummyConn {
    pub fn new() -> DummyConn {
        DummyConn::default()
    }

    /// A dummy with one 800x600 output at the origin.
    pub fn with_one_output() -> DummyConn {
        let mut conn = DummyConn::new();
        conn.outputs.push(OutputInfo {
            name: "fake-0".into(),
            rect: Geometry::new(0, 0, 800, 600),
            active: true,
        });
        conn
    }

    pub fn script(&mut self, event: XEvent) -> Seq {
        self.seq += 1;
        self.scripted.push_back((self.seq, event));
        self.seq
    }

    pub fn set_attrs(&mut self, window: WindowId, attrs: WindowAttributes) {
        self.attrs.insert(window, attrs);
    }

    /// The ops among the recorded requests, for compact assertions.
    pub fn ops(&self) -> Vec<XOp> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                Recorded::Op(op) => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, op: XOp) -> Seq {
        self.seq += 1;
        self.requests.push(Recorded::Op(op));
        self.seq
    }
}

impl XConn for DummyConn {
    fn fd(&self) -> RawFd {
        -1
    }

    fn poll_event(&mut self) -> Result<Option<(Seq, XEvent)>, XError> {
        Ok(self.scripted.pop_front())
    }

    fn last_sequence(&self) -> Seq {
        self.seq
    }

    fn flush(&mut self) -> Result<(), XError> {
        self.requests.push(Recorded::Flush);
        Ok(())
    }

    fn outputs(&mut self) -> Vec<OutputInfo> {
        self.outputs.clone()
    }

    fn existing_windows(&mut self) -> Vec<WindowId> {
        self.existing.clone()
    }

    fn window_attributes(&mut self, window: WindowId) -> WindowAttributes {
        self.attrs.get(&window).cloned().unwrap_or_default()
    }

    fn refresh_property(
        &mut self,
        window: WindowId,
        _property: WindowProperty,
        attrs: &mut WindowAttributes,
    ) {
        if let Some(stored) = self.attrs.get(&window) {
            *attrs = stored.clone();
        }
    }

    fn map_window(&mut self, window: WindowId) -> Seq {
        self.record(XOp::Map(window))
    }

    fn unmap_window(&mut self, window: WindowId) -> Seq {
        self.record(XOp::Unmap(window))
    }

    fn configure_window(&mut self, window: WindowId, geometry: Geometry) -> Seq {
        self.record(XOp::Configure { window, geometry })
    }

    fn send_configure_notify(&mut self, window: WindowId, geometry: Geometry) {
        self.record(XOp::DenyConfigure { window, geometry });
    }

    fn set_input_focus(&mut self, window: WindowId) {
        self.record(XOp::SetInputFocus(window));
    }

    fn send_take_focus(&mut self, window: WindowId) {
        self.record(XOp::TakeFocus(window));
    }

    fn send_delete(&mut self, window: WindowId) {
        self.record(XOp::SendDelete(window));
    }

    fn kill_client(&mut self, window: WindowId) {
        self.record(XOp::KillClient(window));
    }

    fn subscribe_to(&mut self, window: WindowId) {
        self.seq += 1;
        self.requests.push(Recorded::Subscribed(window));
    }

    fn set_client_list(&mut self, windows: &[WindowId]) {
        self.record(XOp::UpdateClientList(windows.to_vec()));
    }

    fn set_current_desktop(&mut self, index: u32) {
        self.record(XOp::UpdateCurrentDesktop(index));
    }

    fn set_active_window(&mut self, window: WindowId) {
        self.record(XOp::UpdateActiveWindow(window));
    }

    fn set_workarea(&mut self, areas: &[Geometry]) {
        self.record(XOp::UpdateWorkarea(areas.to_vec()));
    }

    fn init_wm_properties(&mut self, socket_path: &str, config_path: &str) {
        self.seq += 1;
        self.requests.push(Recorded::InitProperties {
            socket_path: socket_path.into(),
            config_path: config_path.into(),
        });
    }

    fn send_sync_reply(&mut self, window: WindowId, cookie: u32) {
        self.seq += 1;
        self.requests.push(Recorded::SyncReply { window, cookie });
    }
}
