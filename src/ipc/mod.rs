//! IPC for arbor: the i3-ipc protocol over a UNIX socket.
//!
//! The socket is polled by the single event loop; clients are
//! non-blocking and buffered, so a stalled client can neither block the
//! manager nor corrupt the framing.

pub mod channel;
pub mod reply;

use std::fs;
use std::io::{ErrorKind, Read};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};
use serde_json::Value;

use crate::layout::{LayoutTree, PendingEvent};

/// Where the socket lands when neither the config nor `I3SOCK` say
/// otherwise.
pub fn default_socket_path() -> PathBuf {
    PathBuf::from(format!("/tmp/arbor-ipc.{}.sock", std::process::id()))
}

struct IpcClient {
    stream: UnixStream,
    /// Event names this client subscribed to.
    subscriptions: Vec<String>,
    /// Partial frame data carried between reads.
    buf: Vec<u8>,
}

pub struct IpcServer {
    listener: UnixListener,
    clients: Vec<IpcClient>,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the listening socket, replacing a stale one if needed.
    pub fn bind(socket_path: PathBuf) -> std::io::Result<IpcServer> {
        if socket_path.exists() {
            fs::remove_file(&socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::DirBuilder::new().recursive(true).create(parent).ok();
            }
        }
        let listener = UnixListener::bind(&socket_path)?;
        listener.set_nonblocking(true)?;
        info!("IPC listening on {}", socket_path.display());
        Ok(IpcServer {
            listener,
            clients: Vec::new(),
            socket_path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Every fd the event loop must poll: the listener first, then the
    /// clients in order.
    pub fn fds(&self) -> Vec<RawFd> {
        let mut fds = vec![self.listener.as_raw_fd()];
        fds.extend(self.clients.iter().map(|c| c.stream.as_raw_fd()));
        fds
    }

    /// Accepts every pending connection.
    pub fn accept_ready(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if stream.set_nonblocking(true).is_err() {
                        continue;
                    }
                    debug!("ipc: new client");
                    self.clients.push(IpcClient {
                        stream,
                        subscriptions: Vec::new(),
                        buf: Vec::new(),
                    });
                }
                Err(ref err) if err.kind() == ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!("ipc accept failed: {}", err);
                    return;
                }
            }
        }
    }

    /// Reads every client with pending data and answers complete
    /// requests. Dead or misbehaving clients are dropped.
    pub fn poll_clients(&mut self, tree: &mut LayoutTree) {
        let mut index = 0;
        while index < self.clients.len() {
            match self.service_client(index, tree) {
                Ok(()) => index += 1,
                Err(reason) => {
                    debug!("ipc: dropping client: {}", reason);
                    self.clients.remove(index);
                }
            }
        }
    }

    fn service_client(&mut self, index: usize, tree: &mut LayoutTree) -> Result<(), String> {
        let mut chunk = [0u8; 4096];
        loop {
            let client = &mut self.clients[index];
            match client.stream.read(&mut chunk) {
                Ok(0) => return Err("disconnected".into()),
                Ok(n) => client.buf.extend_from_slice(&chunk[..n]),
                Err(ref err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(ref err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.to_string()),
            }
        }
        let messages = {
            let client = &mut self.clients[index];
            channel::drain_frames(&mut client.buf).map_err(|err| format!("{:?}", err))?
        };
        for (message_type, payload) in messages {
            let reply = self.handle_request(index, tree, message_type, &payload);
            let client = &mut self.clients[index];
            channel::write_message(&mut client.stream, message_type, reply.to_string().as_bytes())
                .map_err(|err| format!("{:?}", err))?;
        }
        Ok(())
    }

    fn handle_request(
        &mut self,
        index: usize,
        tree: &mut LayoutTree,
        message_type: u32,
        payload: &[u8],
    ) -> Value {
        match message_type {
            channel::COMMAND => {
                let input = String::from_utf8_lossy(payload);
                let replies = tree.execute_str(&input);
                reply::command_replies_json(&replies)
            }
            channel::GET_WORKSPACES => reply::workspaces_json(tree),
            channel::SUBSCRIBE => {
                let wanted: Vec<String> =
                    serde_json::from_slice(payload).unwrap_or_default();
                trace!("ipc: client subscribes to {:?}", wanted);
                self.clients[index].subscriptions = wanted;
                serde_json::json!({ "success": true })
            }
            channel::GET_OUTPUTS => reply::outputs_json(tree),
            channel::GET_TREE => reply::tree_json(tree),
            channel::GET_MARKS => reply::marks_json(tree),
            channel::GET_BAR_CONFIG => reply::bar_config_json(payload),
            channel::GET_VERSION => reply::version_json(tree),
            other => {
                warn!("ipc: unknown message type {}", other);
                serde_json::json!({ "success": false, "error": "unknown message type" })
            }
        }
    }

    /// Pushes queued events to every subscribed client.
    pub fn broadcast(&mut self, events: Vec<PendingEvent>) {
        for event in events {
            let payload = event.payload.to_string();
            let event_type = channel::EVENT_BIT
                | match event.name {
                    "workspace" => 0,
                    "output" => 1,
                    "mode" => 2,
                    "window" => 3,
                    "barconfig_update" => 4,
                    _ => continue,
                };
            self.clients.retain_mut(|client| {
                if !client.subscriptions.iter().any(|s| s == event.name) {
                    return true;
                }
                channel::write_message(&mut client.stream, event_type, payload.as_bytes())
                    .is_ok()
            });
        }
    }

    /// Unlinks the socket. Called on clean shutdown.
    pub fn cleanup(&self) {
        let _ = fs::remove_file(&self.socket_path);
    }
}

/// Client side: send one message to a running instance and read the
/// reply. Used by the CLI for `arbor <command>` and `--get-socketpath`.
pub fn client_request(
    socket_path: &Path,
    message_type: u32,
    payload: &[u8],
) -> Result<Vec<u8>, String> {
    let mut stream =
        UnixStream::connect(socket_path).map_err(|err| format!("cannot connect: {}", err))?;
    channel::write_message(&mut stream, message_type, payload)
        .map_err(|err| format!("cannot send: {:?}", err))?;
    let (_, reply) =
        channel::read_message(&mut stream).map_err(|err| format!("cannot read: {:?}", err))?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geometry::Geometry;

    fn server() -> (IpcServer, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "arbor-test-{}-{:?}.sock",
            std::process::id(),
            std::thread::current().id()
        ));
        (IpcServer::bind(path.clone()).unwrap(), path)
    }

    fn test_tree() -> LayoutTree {
        let mut tree = LayoutTree::new(Config::default());
        tree.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        tree
    }

    #[test]
    fn command_round_trip_over_the_socket() {
        let (mut server, path) = server();
        let mut tree = test_tree();

        let client = std::thread::spawn(move || {
            client_request(&path, channel::COMMAND, b"workspace 3 ; frobnicate").unwrap()
        });
        // Serve until the client got its answer.
        let reply = loop {
            server.accept_ready();
            server.poll_clients(&mut tree);
            if client.is_finished() {
                break client.join().unwrap();
            }
            std::thread::yield_now();
        };
        let value: Value = serde_json::from_slice(&reply).unwrap();
        let list = value.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["success"], true);
        assert_eq!(list[1]["success"], false);
        assert!(tree.tree.workspace_ix_by_name("3").is_some());
        server.cleanup();
    }

    #[test]
    fn get_tree_over_the_socket() {
        let (mut server, path) = server();
        let mut tree = test_tree();
        let client = std::thread::spawn(move || {
            client_request(&path, channel::GET_TREE, b"").unwrap()
        });
        let reply = loop {
            server.accept_ready();
            server.poll_clients(&mut tree);
            if client.is_finished() {
                break client.join().unwrap();
            }
            std::thread::yield_now();
        };
        let value: Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(value["name"], "root");
        server.cleanup();
    }

    #[test]
    fn subscribed_clients_get_events() {
        let (mut server, path) = server();
        let mut tree = test_tree();
        let client = std::thread::spawn(move || {
            let mut stream = UnixStream::connect(&path).unwrap();
            channel::write_message(&mut stream, channel::SUBSCRIBE, br#"["workspace"]"#)
                .unwrap();
            let (t, _) = channel::read_message(&mut stream).unwrap();
            assert_eq!(t, channel::SUBSCRIBE);
            // Now wait for the pushed event.
            let (event_type, payload) = channel::read_message(&mut stream).unwrap();
            (event_type, payload)
        });
        // Serve the subscription, then broadcast a workspace event.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !client.is_finished() && std::time::Instant::now() < deadline {
            server.accept_ready();
            server.poll_clients(&mut tree);
            server.broadcast(vec![PendingEvent {
                name: "workspace",
                payload: serde_json::json!({ "change": "focus" }),
            }]);
            std::thread::yield_now();
        }
        let (event_type, payload) = client.join().unwrap();
        assert_eq!(event_type & channel::EVENT_BIT, channel::EVENT_BIT);
        assert_eq!(event_type & !channel::EVENT_BIT, 0);
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["change"], "focus");
        server.cleanup();
    }
}
