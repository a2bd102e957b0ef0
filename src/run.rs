//! The event loop: a single thread polling the X connection, the IPC
//! sockets, and a signal fd. Per turn: drain X events FIFO, then IPC
//! requests, then one settle step, then a single flush.

use std::fmt;
use std::os::unix::io::BorrowedFd;

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::config::Config;
use crate::exec;
use crate::ipc::IpcServer;
use crate::layout::{LayoutTree, RunControl};
use crate::x11::events::Reactor;
use crate::x11::{XConn, XError};

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exit,
    Restart,
}

#[derive(Debug)]
pub enum RunError {
    X(XError),
    Os(Errno),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RunError::X(ref err) => write!(f, "{}", err),
            RunError::Os(err) => write!(f, "{}", err),
        }
    }
}

impl From<Errno> for RunError {
    fn from(err: Errno) -> RunError {
        RunError::Os(err)
    }
}

pub fn run(
    tree: &mut LayoutTree,
    conn: &mut dyn XConn,
    ipc: &mut IpcServer,
) -> Result<RunOutcome, RunError> {
    let mut reactor = Reactor::new();

    let mut mask = SigSet::empty();
    mask.add(Signal::SIGCHLD);
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGTERM);
    mask.thread_block()?;
    let mut signal_fd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)?;

    // Push the initial state out before waiting for anything.
    reactor.flush_effects(tree, conn);
    ipc.broadcast(tree.take_pending_events());

    loop {
        let x_raw = conn.fd();
        let ipc_raw = ipc.fds();
        let signal_raw = {
            use std::os::unix::io::AsRawFd;
            signal_fd.as_raw_fd()
        };
        // The ignore-table GC supplies the timeout; with nothing pending
        // we sleep until a fd wakes us.
        let timeout = match reactor.ignore.gc() {
            Some(next) => {
                let ms = next.as_millis().min(u16::MAX as u128) as u16;
                PollTimeout::from(ms.max(1))
            }
            None => PollTimeout::NONE,
        };
        {
            let x_fd = unsafe { BorrowedFd::borrow_raw(x_raw) };
            let sig_fd = unsafe { BorrowedFd::borrow_raw(signal_raw) };
            let mut fds = Vec::with_capacity(2 + ipc_raw.len());
            fds.push(PollFd::new(x_fd, PollFlags::POLLIN));
            fds.push(PollFd::new(sig_fd, PollFlags::POLLIN));
            for raw in &ipc_raw {
                let fd = unsafe { BorrowedFd::borrow_raw(*raw) };
                fds.push(PollFd::new(fd, PollFlags::POLLIN));
            }
            match poll(&mut fds, timeout) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(RunError::Os(err)),
            }
        }

        while let Ok(Some(siginfo)) = signal_fd.read_signal() {
            match Signal::try_from(siginfo.ssi_signo as i32) {
                Ok(Signal::SIGCHLD) => reap_children(),
                Ok(Signal::SIGINT) | Ok(Signal::SIGTERM) => {
                    info!("caught termination signal, shutting down");
                    return Ok(RunOutcome::Exit);
                }
                _ => {}
            }
        }

        // All X events available without blocking, in FIFO order.
        loop {
            match conn.poll_event() {
                Ok(Some((seq, event))) => reactor.dispatch(tree, conn, seq, event),
                Ok(None) => break,
                Err(XError::ConnectionLost) => {
                    warn!("X connection lost, exiting");
                    return Err(RunError::X(XError::ConnectionLost));
                }
                Err(err) => {
                    warn!("{}", err);
                    break;
                }
            }
        }

        // IPC strictly after the X batch of this turn.
        ipc.accept_ready();
        ipc.poll_clients(tree);

        // One settle step, one flush.
        reactor.flush_effects(tree, conn);
        ipc.broadcast(tree.take_pending_events());
        for command_line in tree.take_pending_exec() {
            exec::spawn(&command_line);
        }

        match tree.take_control() {
            Some(RunControl::Exit) => return Ok(RunOutcome::Exit),
            Some(RunControl::Restart) => return Ok(RunOutcome::Restart),
            Some(RunControl::Reload) => reload_config(tree),
            None => {}
        }
    }
}

fn reload_config(tree: &mut LayoutTree) {
    let path = match tree.config().config_path.clone() {
        Some(path) => path,
        None => {
            debug!("reload without a config file is a no-op");
            return;
        }
    };
    match Config::load(&path) {
        Ok(config) => {
            info!("reloaded configuration from {}", path.display());
            tree.config = config;
            tree.settle();
        }
        Err(err) => warn!("reload failed, keeping the old configuration: {}", err),
    }
}

/// Collects every exited child without blocking.
fn reap_children() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => return,
            Ok(status) => debug!("reaped child: {:?}", status),
        }
    }
}
