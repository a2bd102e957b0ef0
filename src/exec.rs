//! Launching external programs: double-forked and detached, so children
//! reparent to init and never turn into zombies the loop has to track.

use std::ffi::CString;

use log::{error, warn};
use nix::sys::wait::waitpid;
use nix::unistd::{execvp, fork, setsid, ForkResult};

/// Runs `/bin/sh -c <command_line>` detached from the manager.
pub fn spawn(command_line: &str) {
    let cmd = match CString::new(command_line) {
        Ok(cmd) => cmd,
        Err(_) => {
            warn!("exec argument contains a NUL byte, ignoring");
            return;
        }
    };
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            // The intermediate child exits immediately; reap it here so
            // nothing is left behind.
            let _ = waitpid(child, None);
        }
        Ok(ForkResult::Child) => {
            let _ = setsid();
            match unsafe { fork() } {
                Ok(ForkResult::Parent { .. }) => std::process::exit(0),
                Ok(ForkResult::Child) => {
                    let sh = CString::new("/bin/sh").unwrap();
                    let dash_c = CString::new("-c").unwrap();
                    let args = [sh.clone(), dash_c, cmd];
                    let _ = execvp(&sh, &args);
                    std::process::exit(1);
                }
                Err(_) => std::process::exit(1),
            }
        }
        Err(err) => error!("cannot fork for exec: {}", err),
    }
}
