//! The xcb-backed [`XConn`] implementation. Everything that actually
//! touches the X server lives here; the rest of the crate only sees the
//! trait.

use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, info, trace, warn};
use xcb::x;
use xcb::{Xid, XidNew};

use crate::geometry::{Geometry, Point};

use super::{
    OutputInfo, Protocols, Seq, StateAction, Strut, WindowAttributes, WindowId, WindowKind,
    WindowProperty, WmHintsFlags, XConn, XError, XEvent,
};

const WM_NAME: &str = "arbor";

xcb::atoms_struct! {
    #[derive(Debug)]
    pub struct Atoms {
        pub utf8_string => b"UTF8_STRING",
        pub wm_protocols => b"WM_PROTOCOLS",
        pub wm_delete_window => b"WM_DELETE_WINDOW",
        pub wm_take_focus => b"WM_TAKE_FOCUS",
        pub wm_client_leader => b"WM_CLIENT_LEADER",
        pub net_wm_name => b"_NET_WM_NAME",
        pub net_supported => b"_NET_SUPPORTED",
        pub net_supporting_wm_check => b"_NET_SUPPORTING_WM_CHECK",
        pub net_client_list => b"_NET_CLIENT_LIST",
        pub net_client_list_stacking => b"_NET_CLIENT_LIST_STACKING",
        pub net_current_desktop => b"_NET_CURRENT_DESKTOP",
        pub net_active_window => b"_NET_ACTIVE_WINDOW",
        pub net_close_window => b"_NET_CLOSE_WINDOW",
        pub net_moveresize_window => b"_NET_MOVERESIZE_WINDOW",
        pub net_workarea => b"_NET_WORKAREA",
        pub net_wm_state => b"_NET_WM_STATE",
        pub net_wm_state_fullscreen => b"_NET_WM_STATE_FULLSCREEN",
        pub net_wm_window_type => b"_NET_WM_WINDOW_TYPE",
        pub net_wm_window_type_dialog => b"_NET_WM_WINDOW_TYPE_DIALOG",
        pub net_wm_window_type_utility => b"_NET_WM_WINDOW_TYPE_UTILITY",
        pub net_wm_window_type_toolbar => b"_NET_WM_WINDOW_TYPE_TOOLBAR",
        pub net_wm_window_type_splash => b"_NET_WM_WINDOW_TYPE_SPLASH",
        pub net_wm_window_type_dock => b"_NET_WM_WINDOW_TYPE_DOCK",
        pub net_wm_strut => b"_NET_WM_STRUT",
        pub net_wm_strut_partial => b"_NET_WM_STRUT_PARTIAL",
        pub i3_socket_path => b"I3_SOCKET_PATH",
        pub i3_config_path => b"I3_CONFIG_PATH",
        pub i3_sync => b"I3_SYNC",
    }
}

pub struct XcbConn {
    conn: xcb::Connection,
    root: x::Window,
    atoms: Atoms,
    /// Monotonic request/event stamp for the ignore table. rust-xcb does
    /// not surface the wire sequence of events, so both sides of the
    /// table use this counter instead: requests bump it, and incoming
    /// events are stamped with its current value, which within one
    /// drain-then-flush turn matches the request that caused them.
    seq: Seq,
    /// Timestamp of the last input event, for ICCCM client messages.
    last_time: u32,
}

impl XcbConn {
    /// Connects and claims substructure redirection on the root window.
    /// Fails if another window manager is already running.
    pub fn connect() -> Result<XcbConn, XError> {
        let (conn, screen_num) = xcb::Connection::connect_with_extensions(
            None,
            &[xcb::Extension::RandR],
            &[],
        )
        .map_err(|err| XError::Protocol(format!("cannot connect to X: {}", err)))?;
        let root = {
            let setup = conn.get_setup();
            let screen = setup
                .roots()
                .nth(screen_num as usize)
                .ok_or_else(|| XError::Protocol("no such screen".into()))?;
            screen.root()
        };
        let atoms = Atoms::intern_all(&conn)
            .map_err(|err| XError::Protocol(format!("cannot intern atoms: {}", err)))?;

        let cookie = conn.send_request_checked(&x::ChangeWindowAttributes {
            window: root,
            value_list: &[x::Cw::EventMask(
                x::EventMask::SUBSTRUCTURE_REDIRECT
                    | x::EventMask::SUBSTRUCTURE_NOTIFY
                    | x::EventMask::STRUCTURE_NOTIFY
                    | x::EventMask::PROPERTY_CHANGE,
            )],
        });
        conn.check_request(cookie).map_err(|_| {
            XError::Protocol("another window manager is already running".into())
        })?;

        conn.send_request(&xcb::randr::SelectInput {
            window: root,
            enable: xcb::randr::NotifyMask::SCREEN_CHANGE,
        });

        info!("connected to X, managing root {:?}", root);
        Ok(XcbConn {
            conn,
            root,
            atoms,
            seq: 0,
            last_time: x::CURRENT_TIME,
        })
    }

    /// Reads `I3_SOCKET_PATH` off the root window of the default display.
    /// Client-mode discovery; no manager state involved.
    pub fn socket_path_from_root() -> Option<String> {
        let (conn, screen_num) = xcb::Connection::connect(None).ok()?;
        let root = {
            let setup = conn.get_setup();
            setup.roots().nth(screen_num as usize)?.root()
        };
        let atom_cookie = conn.send_request(&x::InternAtom {
            only_if_exists: true,
            name: b"I3_SOCKET_PATH",
        });
        let atom = conn.wait_for_reply(atom_cookie).ok()?.atom();
        if atom == x::ATOM_NONE {
            return None;
        }
        let utf8_cookie = conn.send_request(&x::InternAtom {
            only_if_exists: true,
            name: b"UTF8_STRING",
        });
        let utf8 = conn.wait_for_reply(utf8_cookie).ok()?.atom();
        let cookie = conn.send_request(&x::GetProperty {
            delete: false,
            window: root,
            property: atom,
            r#type: utf8,
            long_offset: 0,
            long_length: 256,
        });
        let reply = conn.wait_for_reply(cookie).ok()?;
        if reply.value::<u8>().is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(reply.value::<u8>()).into_owned())
    }

    fn win(&self, id: WindowId) -> x::Window {
        unsafe { x::Window::new(id) }
    }

    fn bump(&mut self) -> Seq {
        self.seq += 1;
        self.seq
    }

    fn get_prop(
        &self,
        window: x::Window,
        property: x::Atom,
        r#type: x::Atom,
        long_length: u32,
    ) -> Option<x::GetPropertyReply> {
        let cookie = self.conn.send_request(&x::GetProperty {
            delete: false,
            window,
            property,
            r#type,
            long_offset: 0,
            long_length,
        });
        match self.conn.wait_for_reply(cookie) {
            Ok(reply) if !reply.value::<u8>().is_empty() => Some(reply),
            _ => None,
        }
    }

    fn string_prop(&self, window: x::Window, property: x::Atom, r#type: x::Atom) -> Option<String> {
        self.get_prop(window, property, r#type, 256)
            .map(|reply| String::from_utf8_lossy(reply.value::<u8>()).into_owned())
    }

    fn title_of(&self, window: x::Window) -> String {
        self.string_prop(window, self.atoms.net_wm_name, self.atoms.utf8_string)
            .or_else(|| self.string_prop(window, x::ATOM_WM_NAME, x::ATOM_STRING))
            .unwrap_or_default()
    }

    /// WM_CLASS is two NUL-separated strings: instance, then class.
    fn class_of(&self, window: x::Window) -> (String, String) {
        let raw = self
            .string_prop(window, x::ATOM_WM_CLASS, x::ATOM_STRING)
            .unwrap_or_default();
        let mut parts = raw.split('\0');
        let instance = parts.next().unwrap_or("").to_string();
        let class = parts.next().unwrap_or("").to_string();
        (instance, class)
    }

    fn atom_list(&self, window: x::Window, property: x::Atom) -> Vec<u32> {
        self.get_prop(window, property, x::ATOM_ATOM, 32)
            .map(|reply| reply.value::<u32>().to_vec())
            .unwrap_or_default()
    }

    fn window_prop(&self, window: x::Window, property: x::Atom) -> Option<WindowId> {
        self.get_prop(window, property, x::ATOM_WINDOW, 1)
            .and_then(|reply| reply.value::<u32>().first().copied())
    }

    fn kind_of(&self, window: x::Window) -> WindowKind {
        let types = self.atom_list(window, self.atoms.net_wm_window_type);
        for atom in types {
            if atom == self.atoms.net_wm_window_type_dialog.resource_id() {
                return WindowKind::Dialog;
            } else if atom == self.atoms.net_wm_window_type_utility.resource_id() {
                return WindowKind::Utility;
            } else if atom == self.atoms.net_wm_window_type_toolbar.resource_id() {
                return WindowKind::Toolbar;
            } else if atom == self.atoms.net_wm_window_type_splash.resource_id() {
                return WindowKind::Splash;
            } else if atom == self.atoms.net_wm_window_type_dock.resource_id() {
                return WindowKind::Dock;
            }
        }
        WindowKind::Normal
    }

    fn protocols_of(&self, window: x::Window) -> Protocols {
        let mut protocols = Protocols::empty();
        for atom in self.atom_list(window, self.atoms.wm_protocols) {
            if atom == self.atoms.wm_delete_window.resource_id() {
                protocols |= Protocols::DELETE_WINDOW;
            } else if atom == self.atoms.wm_take_focus.resource_id() {
                protocols |= Protocols::TAKE_FOCUS;
            }
        }
        protocols
    }

    /// `WM_HINTS`: flag word, then input, initial state, icons, group.
    fn hints_of(&self, window: x::Window) -> (bool, bool) {
        match self.get_prop(window, x::ATOM_WM_HINTS, x::ATOM_WM_HINTS, 9) {
            Some(reply) => {
                let data = reply.value::<u32>();
                let flags =
                    WmHintsFlags::from_bits_truncate(data.first().copied().unwrap_or(0));
                let accepts_input = if flags.contains(WmHintsFlags::INPUT) {
                    data.get(1).copied().unwrap_or(1) != 0
                } else {
                    true
                };
                let urgent = flags.contains(WmHintsFlags::URGENCY);
                (accepts_input, urgent)
            }
            None => (true, false),
        }
    }

    /// `WM_NORMAL_HINTS`: min size lives at words 5 and 6 when PMinSize
    /// is set.
    fn min_size_of(&self, window: x::Window) -> Option<(u32, u32)> {
        let reply = self.get_prop(window, x::ATOM_WM_NORMAL_HINTS, x::ATOM_WM_SIZE_HINTS, 18)?;
        let data = reply.value::<u32>();
        let flags = data.first().copied().unwrap_or(0);
        if flags & (1 << 4) == 0 {
            return None;
        }
        let min_w = data.get(5).copied().unwrap_or(0);
        let min_h = data.get(6).copied().unwrap_or(0);
        Some((min_w, min_h))
    }

    fn strut_of(&self, window: x::Window) -> Strut {
        let data = self
            .get_prop(window, self.atoms.net_wm_strut_partial, x::ATOM_CARDINAL, 12)
            .or_else(|| self.get_prop(window, self.atoms.net_wm_strut, x::ATOM_CARDINAL, 4))
            .map(|reply| reply.value::<u32>().to_vec())
            .unwrap_or_default();
        Strut {
            left: data.first().copied().unwrap_or(0),
            right: data.get(1).copied().unwrap_or(0),
            top: data.get(2).copied().unwrap_or(0),
            bottom: data.get(3).copied().unwrap_or(0),
        }
    }

    fn geometry_of(&self, window: x::Window) -> Geometry {
        let cookie = self.conn.send_request(&x::GetGeometry {
            drawable: x::Drawable::Window(window),
        });
        match self.conn.wait_for_reply(cookie) {
            Ok(reply) => Geometry::new(
                reply.x() as i32,
                reply.y() as i32,
                reply.width() as u32,
                reply.height() as u32,
            ),
            Err(_) => Geometry::zero(),
        }
    }

    fn send_client_message(&mut self, window: x::Window, r#type: x::Atom, data: [u32; 5]) {
        let event =
            x::ClientMessageEvent::new(window, r#type, x::ClientMessageData::Data32(data));
        self.conn.send_request(&x::SendEvent {
            propagate: false,
            destination: x::SendEventDest::Window(window),
            event_mask: x::EventMask::NO_EVENT,
            event: &event,
        });
        self.bump();
    }

    fn replace_prop_u32(&mut self, window: x::Window, property: x::Atom, r#type: x::Atom, data: &[u32]) {
        self.conn.send_request(&x::ChangeProperty {
            mode: x::PropMode::Replace,
            window,
            property,
            r#type,
            data,
        });
        self.bump();
    }

    fn replace_prop_string(&mut self, window: x::Window, property: x::Atom, r#type: x::Atom, data: &str) {
        self.conn.send_request(&x::ChangeProperty {
            mode: x::PropMode::Replace,
            window,
            property,
            r#type,
            data: data.as_bytes(),
        });
        self.bump();
    }

    fn translate(&mut self, event: xcb::Event) -> Option<XEvent> {
        match event {
            xcb::Event::X(x::Event::MapRequest(ev)) => Some(XEvent::MapRequest {
                window: ev.window().resource_id(),
                override_redirect: false,
            }),
            xcb::Event::X(x::Event::UnmapNotify(ev)) => Some(XEvent::UnmapNotify {
                window: ev.window().resource_id(),
            }),
            xcb::Event::X(x::Event::DestroyNotify(ev)) => Some(XEvent::DestroyNotify {
                window: ev.window().resource_id(),
            }),
            xcb::Event::X(x::Event::ConfigureRequest(ev)) => Some(XEvent::ConfigureRequest {
                window: ev.window().resource_id(),
                geometry: Geometry::new(
                    ev.x() as i32,
                    ev.y() as i32,
                    ev.width() as u32,
                    ev.height() as u32,
                ),
            }),
            xcb::Event::X(x::Event::PropertyNotify(ev)) => {
                self.last_time = ev.time();
                let atom = ev.atom();
                let property = if atom == x::ATOM_WM_NAME || atom == self.atoms.net_wm_name {
                    WindowProperty::Title
                } else if atom == x::ATOM_WM_CLASS {
                    WindowProperty::Class
                } else if atom == x::ATOM_WM_HINTS {
                    WindowProperty::Hints
                } else if atom == x::ATOM_WM_NORMAL_HINTS {
                    WindowProperty::NormalHints
                } else if atom == x::ATOM_WM_TRANSIENT_FOR {
                    WindowProperty::TransientFor
                } else if atom == self.atoms.wm_client_leader {
                    WindowProperty::Leader
                } else if atom == self.atoms.wm_protocols {
                    WindowProperty::Protocols
                } else if atom == self.atoms.net_wm_strut
                    || atom == self.atoms.net_wm_strut_partial
                {
                    WindowProperty::Strut
                } else if atom == self.atoms.net_wm_window_type {
                    WindowProperty::WindowType
                } else {
                    WindowProperty::Other
                };
                Some(XEvent::PropertyNotify {
                    window: ev.window().resource_id(),
                    property,
                })
            }
            xcb::Event::X(x::Event::EnterNotify(ev)) => {
                self.last_time = ev.time();
                if ev.mode() != x::NotifyMode::Normal {
                    return None;
                }
                Some(XEvent::EnterNotify {
                    window: ev.event().resource_id(),
                })
            }
            xcb::Event::X(x::Event::ButtonPress(ev)) => {
                self.last_time = ev.time();
                Some(XEvent::ButtonPress {
                    window: ev.event().resource_id(),
                    button: ev.detail(),
                    point: Point {
                        x: ev.root_x() as i32,
                        y: ev.root_y() as i32,
                    },
                })
            }
            xcb::Event::X(x::Event::ClientMessage(ev)) => {
                let data = match ev.data() {
                    x::ClientMessageData::Data32(data) => data,
                    _ => return None,
                };
                let window = ev.window().resource_id();
                let r#type = ev.r#type();
                if r#type == self.atoms.net_active_window {
                    Some(XEvent::ActiveWindowRequest { window })
                } else if r#type == self.atoms.net_wm_state {
                    let concerns_fullscreen = data[1]
                        == self.atoms.net_wm_state_fullscreen.resource_id()
                        || data[2] == self.atoms.net_wm_state_fullscreen.resource_id();
                    if !concerns_fullscreen {
                        return None;
                    }
                    StateAction::from_data(data[0])
                        .map(|action| XEvent::FullscreenRequest { window, action })
                } else if r#type == self.atoms.net_current_desktop {
                    Some(XEvent::CurrentDesktopRequest { index: data[0] })
                } else if r#type == self.atoms.net_close_window {
                    Some(XEvent::CloseWindowRequest { window })
                } else if r#type == self.atoms.net_moveresize_window {
                    Some(XEvent::MoveResizeRequest {
                        window,
                        geometry: Geometry::new(
                            data[1] as i32,
                            data[2] as i32,
                            data[3],
                            data[4],
                        ),
                    })
                } else if r#type == self.atoms.i3_sync {
                    Some(XEvent::SyncRequest {
                        window: data[0],
                        cookie: data[1],
                    })
                } else {
                    None
                }
            }
            xcb::Event::X(x::Event::MappingNotify(_)) => Some(XEvent::MappingNotify),
            xcb::Event::RandR(xcb::randr::Event::ScreenChangeNotify(_))
            | xcb::Event::RandR(xcb::randr::Event::Notify(_)) => Some(XEvent::ScreenChange),
            _ => None,
        }
    }
}

impl XConn for XcbConn {
    fn fd(&self) -> RawFd {
        self.conn.as_raw_fd()
    }

    fn poll_event(&mut self) -> Result<Option<(Seq, XEvent)>, XError> {
        loop {
            match self.conn.poll_for_event() {
                Ok(Some(event)) => {
                    if let Some(translated) = self.translate(event) {
                        return Ok(Some((self.seq, translated)));
                    }
                }
                Ok(None) => return Ok(None),
                Err(xcb::Error::Connection(_)) => return Err(XError::ConnectionLost),
                Err(xcb::Error::Protocol(err)) => {
                    // Errors from requests in the ignore table are
                    // expected (racing clients); everything else is
                    // logged and survived.
                    debug!("X protocol error: {:?}", err);
                }
            }
        }
    }

    fn last_sequence(&self) -> Seq {
        self.seq
    }

    fn flush(&mut self) -> Result<(), XError> {
        self.conn.flush().map_err(|_| XError::ConnectionLost)
    }

    fn outputs(&mut self) -> Vec<OutputInfo> {
        let cookie = self.conn.send_request(&xcb::randr::GetMonitors {
            window: self.root,
            get_active: true,
        });
        self.bump();
        let reply = match self.conn.wait_for_reply(cookie) {
            Ok(reply) => reply,
            Err(err) => {
                warn!("cannot query monitors: {:?}", err);
                return Vec::new();
            }
        };
        let mut result = Vec::new();
        for monitor in reply.monitors() {
            let name_cookie = self.conn.send_request(&x::GetAtomName {
                atom: monitor.name(),
            });
            let name = match self.conn.wait_for_reply(name_cookie) {
                Ok(name_reply) => {
                    String::from_utf8_lossy(name_reply.name().as_bytes()).into_owned()
                }
                Err(_) => format!("monitor-{}", result.len()),
            };
            result.push(OutputInfo {
                name,
                rect: Geometry::new(
                    monitor.x() as i32,
                    monitor.y() as i32,
                    monitor.width() as u32,
                    monitor.height() as u32,
                ),
                active: true,
            });
        }
        trace!("RandR reports {} monitors", result.len());
        result
    }

    fn existing_windows(&mut self) -> Vec<WindowId> {
        let cookie = self.conn.send_request(&x::QueryTree { window: self.root });
        self.bump();
        let reply = match self.conn.wait_for_reply(cookie) {
            Ok(reply) => reply,
            Err(_) => return Vec::new(),
        };
        let mut result = Vec::new();
        for child in reply.children() {
            let attr_cookie = self.conn.send_request(&x::GetWindowAttributes {
                window: *child,
            });
            if let Ok(attrs) = self.conn.wait_for_reply(attr_cookie) {
                if !attrs.override_redirect() && attrs.map_state() == x::MapState::Viewable {
                    result.push(child.resource_id());
                }
            }
        }
        result
    }

    fn window_attributes(&mut self, window: WindowId) -> WindowAttributes {
        let win = self.win(window);
        let (instance, class) = self.class_of(win);
        let (accepts_input, urgent) = self.hints_of(win);
        let override_redirect = {
            let cookie = self.conn.send_request(&x::GetWindowAttributes { window: win });
            self.conn
                .wait_for_reply(cookie)
                .map(|reply| reply.override_redirect())
                .unwrap_or(false)
        };
        let initially_fullscreen = self
            .atom_list(win, self.atoms.net_wm_state)
            .contains(&self.atoms.net_wm_state_fullscreen.resource_id());
        self.bump();
        WindowAttributes {
            title: self.title_of(win),
            class,
            instance,
            leader: self.window_prop(win, self.atoms.wm_client_leader).unwrap_or(0),
            transient_for: self.window_prop(win, x::ATOM_WM_TRANSIENT_FOR),
            kind: self.kind_of(win),
            protocols: self.protocols_of(win),
            accepts_input,
            urgent,
            strut: self.strut_of(win),
            min_size: self.min_size_of(win),
            geometry: self.geometry_of(win),
            override_redirect,
            initially_fullscreen,
        }
    }

    fn refresh_property(
        &mut self,
        window: WindowId,
        property: WindowProperty,
        attrs: &mut WindowAttributes,
    ) {
        let win = self.win(window);
        match property {
            WindowProperty::Title => attrs.title = self.title_of(win),
            WindowProperty::Class => {
                let (instance, class) = self.class_of(win);
                attrs.instance = instance;
                attrs.class = class;
            }
            WindowProperty::Hints => {
                let (accepts_input, urgent) = self.hints_of(win);
                attrs.accepts_input = accepts_input;
                attrs.urgent = urgent;
            }
            WindowProperty::NormalHints => attrs.min_size = self.min_size_of(win),
            WindowProperty::TransientFor => {
                attrs.transient_for = self.window_prop(win, x::ATOM_WM_TRANSIENT_FOR)
            }
            WindowProperty::Leader => {
                attrs.leader = self
                    .window_prop(win, self.atoms.wm_client_leader)
                    .unwrap_or(0)
            }
            WindowProperty::Protocols => attrs.protocols = self.protocols_of(win),
            WindowProperty::Strut => attrs.strut = self.strut_of(win),
            WindowProperty::WindowType => attrs.kind = self.kind_of(win),
            WindowProperty::Other => {}
        }
    }

    fn map_window(&mut self, window: WindowId) -> Seq {
        let window = self.win(window);
        self.conn.send_request(&x::MapWindow { window });
        self.bump()
    }

    fn unmap_window(&mut self, window: WindowId) -> Seq {
        let window = self.win(window);
        self.conn.send_request(&x::UnmapWindow { window });
        self.bump()
    }

    fn configure_window(&mut self, window: WindowId, geometry: Geometry) -> Seq {
        let window = self.win(window);
        self.conn.send_request(&x::ConfigureWindow {
            window,
            value_list: &[
                x::ConfigWindow::X(geometry.origin.x),
                x::ConfigWindow::Y(geometry.origin.y),
                x::ConfigWindow::Width(geometry.size.w),
                x::ConfigWindow::Height(geometry.size.h),
            ],
        });
        self.bump()
    }

    fn send_configure_notify(&mut self, window: WindowId, geometry: Geometry) {
        let win = self.win(window);
        let event = x::ConfigureNotifyEvent::new(
            win,
            win,
            self.win(super::WINDOW_NONE),
            geometry.origin.x as i16,
            geometry.origin.y as i16,
            geometry.size.w as u16,
            geometry.size.h as u16,
            0,
            false,
        );
        self.conn.send_request(&x::SendEvent {
            propagate: false,
            destination: x::SendEventDest::Window(win),
            event_mask: x::EventMask::STRUCTURE_NOTIFY,
            event: &event,
        });
        self.bump();
    }

    fn set_input_focus(&mut self, window: WindowId) {
        let focus = self.win(window);
        self.conn.send_request(&x::SetInputFocus {
            revert_to: x::InputFocus::PointerRoot,
            focus,
            time: x::CURRENT_TIME,
        });
        self.bump();
    }

    fn send_take_focus(&mut self, window: WindowId) {
        let win = self.win(window);
        let data = [
            self.atoms.wm_take_focus.resource_id(),
            self.last_time,
            0,
            0,
            0,
        ];
        self.send_client_message(win, self.atoms.wm_protocols, data);
    }

    fn send_delete(&mut self, window: WindowId) {
        let win = self.win(window);
        let data = [self.atoms.wm_delete_window.resource_id(), self.last_time, 0, 0, 0];
        self.send_client_message(win, self.atoms.wm_protocols, data);
    }

    fn kill_client(&mut self, window: WindowId) {
        self.conn.send_request(&x::KillClient { resource: window });
        self.bump();
    }

    fn subscribe_to(&mut self, window: WindowId) {
        let window = self.win(window);
        self.conn.send_request(&x::ChangeWindowAttributes {
            window,
            value_list: &[x::Cw::EventMask(
                x::EventMask::PROPERTY_CHANGE
                    | x::EventMask::ENTER_WINDOW
                    | x::EventMask::STRUCTURE_NOTIFY,
            )],
        });
        self.bump();
    }

    fn set_client_list(&mut self, windows: &[WindowId]) {
        let root = self.root;
        let (net_client_list, net_client_list_stacking) =
            (self.atoms.net_client_list, self.atoms.net_client_list_stacking);
        self.replace_prop_u32(root, net_client_list, x::ATOM_WINDOW, windows);
        self.replace_prop_u32(root, net_client_list_stacking, x::ATOM_WINDOW, windows);
    }

    fn set_current_desktop(&mut self, index: u32) {
        let root = self.root;
        let atom = self.atoms.net_current_desktop;
        self.replace_prop_u32(root, atom, x::ATOM_CARDINAL, &[index]);
    }

    fn set_active_window(&mut self, window: WindowId) {
        let root = self.root;
        let atom = self.atoms.net_active_window;
        self.replace_prop_u32(root, atom, x::ATOM_WINDOW, &[window]);
    }

    fn set_workarea(&mut self, areas: &[Geometry]) {
        let mut data = Vec::with_capacity(areas.len() * 4);
        for area in areas {
            data.push(area.origin.x as u32);
            data.push(area.origin.y as u32);
            data.push(area.size.w);
            data.push(area.size.h);
        }
        let root = self.root;
        let atom = self.atoms.net_workarea;
        self.replace_prop_u32(root, atom, x::ATOM_CARDINAL, &data);
    }

    fn init_wm_properties(&mut self, socket_path: &str, config_path: &str) {
        let check_window = self.conn.generate_id();
        self.conn.send_request(&x::CreateWindow {
            depth: x::COPY_FROM_PARENT as u8,
            wid: check_window,
            parent: self.root,
            x: -1,
            y: -1,
            width: 1,
            height: 1,
            border_width: 0,
            class: x::WindowClass::InputOnly,
            visual: x::COPY_FROM_PARENT,
            value_list: &[],
        });
        self.bump();

        let root = self.root;
        let utf8 = self.atoms.utf8_string;
        let check_id = check_window.resource_id();
        let supporting = self.atoms.net_supporting_wm_check;
        let net_wm_name = self.atoms.net_wm_name;
        self.replace_prop_u32(root, supporting, x::ATOM_WINDOW, &[check_id]);
        self.replace_prop_u32(check_window, supporting, x::ATOM_WINDOW, &[check_id]);
        self.replace_prop_string(check_window, net_wm_name, utf8, WM_NAME);
        self.replace_prop_string(root, net_wm_name, utf8, WM_NAME);

        let supported = [
            self.atoms.net_supported.resource_id(),
            self.atoms.net_supporting_wm_check.resource_id(),
            self.atoms.net_wm_name.resource_id(),
            self.atoms.net_client_list.resource_id(),
            self.atoms.net_client_list_stacking.resource_id(),
            self.atoms.net_current_desktop.resource_id(),
            self.atoms.net_active_window.resource_id(),
            self.atoms.net_close_window.resource_id(),
            self.atoms.net_moveresize_window.resource_id(),
            self.atoms.net_wm_state.resource_id(),
            self.atoms.net_wm_state_fullscreen.resource_id(),
            self.atoms.net_wm_window_type.resource_id(),
            self.atoms.net_wm_strut_partial.resource_id(),
            self.atoms.net_workarea.resource_id(),
        ];
        let net_supported = self.atoms.net_supported;
        self.replace_prop_u32(root, net_supported, x::ATOM_ATOM, &supported);

        let socket_atom = self.atoms.i3_socket_path;
        let config_atom = self.atoms.i3_config_path;
        self.replace_prop_string(root, socket_atom, utf8, socket_path);
        self.replace_prop_string(root, config_atom, utf8, config_path);
    }

    fn send_sync_reply(&mut self, window: WindowId, cookie: u32) {
        let win = self.win(window);
        let data = [window, cookie, 0, 0, 0];
        self.send_client_message(win, self.atoms.i3_sync, data);
    }
}
