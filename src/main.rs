//! Main module of arbor

mod commands;
mod config;
mod exec;
mod geometry;
mod ipc;
mod layout;
mod manage;
mod run;
mod snapshot;
mod x11;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;

use getopts::Options;
use log::{error, info, warn};

use crate::config::Config;
use crate::ipc::{channel, IpcServer};
use crate::layout::LayoutTree;
use crate::run::RunOutcome;
use crate::x11::conn::XcbConn;
use crate::x11::events::reconcile_outputs;
use crate::x11::XConn;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut opts = Options::new();
    opts.optopt("c", "config", "path to the configuration file", "FILE");
    opts.optflag("C", "validate", "validate the configuration and exit");
    opts.optflag("a", "no-autostart", "disable the autostart exec lines");
    opts.optopt("L", "layout", "restore a layout snapshot", "FILE");
    opts.optflag("v", "version", "show the version and exit");
    opts.optflag("h", "help", "show this help");
    opts.optflag("", "get-socketpath", "print the IPC socket path and exit");
    opts.optopt("", "restart", "internal: re-exec with a serialized layout", "FILE");

    let matches = match opts.parse(&args) {
        Ok(matches) => matches,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    if matches.opt_present("h") {
        print!("{}", opts.usage("Usage: arbor [options] [command…]"));
        return;
    }
    if matches.opt_present("v") {
        println!("arbor {}", VERSION);
        return;
    }
    if matches.opt_present("get-socketpath") {
        match find_socket_path() {
            Some(path) => println!("{}", path),
            None => {
                eprintln!("arbor is not running (no socket path found)");
                exit(1);
            }
        }
        return;
    }

    // Positional arguments go to a running instance as one COMMAND.
    if !matches.free.is_empty() {
        exit(send_command(&matches.free.join(" ")));
    }

    let config_path = matches.opt_str("c").map(PathBuf::from);
    if matches.opt_present("C") {
        let path = config_path.or_else(default_config_path);
        match path {
            Some(path) => match Config::load(&path) {
                Ok(_) => {
                    println!("{}: ok", path.display());
                    return;
                }
                Err(err) => {
                    eprintln!("{}", err);
                    exit(1);
                }
            },
            None => {
                eprintln!("no configuration file found");
                exit(1);
            }
        }
    }

    let config = load_config(config_path.clone());
    let autostart = !matches.opt_present("a") && !matches.opt_present("restart");
    let restore_path = matches
        .opt_str("restart")
        .or_else(|| matches.opt_str("L"))
        .map(PathBuf::from);

    exit(run_manager(config, autostart, restore_path));
}

fn load_config(explicit: Option<PathBuf>) -> Config {
    let path = explicit.or_else(default_config_path);
    match path {
        Some(path) => match Config::load(&path) {
            Ok(config) => {
                info!("loaded configuration from {}", path.display());
                config
            }
            Err(err) => {
                error!("{}; continuing with defaults", err);
                Config::default()
            }
        },
        None => {
            info!("no configuration file, using defaults");
            Config::default()
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg).join("arbor/config"));
    }
    if let Ok(home) = env::var("HOME") {
        candidates.push(PathBuf::from(home).join(".config/arbor/config"));
    }
    candidates.push(PathBuf::from("/etc/arbor/config"));
    candidates.into_iter().find(|path| path.exists())
}

/// The socket path of the running instance: `I3SOCK` wins, then the root
/// window property.
fn find_socket_path() -> Option<String> {
    if let Ok(path) = env::var("I3SOCK") {
        if !path.is_empty() {
            return Some(path);
        }
    }
    XcbConn::socket_path_from_root()
}

/// Client mode: hand the command to the running instance, print errors,
/// exit 0 on success, 1 on connection trouble, 2 on command failure.
fn send_command(command: &str) -> i32 {
    let path = match find_socket_path() {
        Some(path) => path,
        None => {
            eprintln!("arbor is not running (no socket path found)");
            return 1;
        }
    };
    let reply = match ipc::client_request(
        Path::new(&path),
        channel::COMMAND,
        command.as_bytes(),
    ) {
        Ok(reply) => reply,
        Err(err) => {
            eprintln!("{}", err);
            return 1;
        }
    };
    let parsed: serde_json::Value = match serde_json::from_slice(&reply) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("malformed reply: {}", err);
            return 1;
        }
    };
    let mut code = 0;
    for entry in parsed.as_array().into_iter().flatten() {
        if entry["success"] != serde_json::Value::Bool(true) {
            eprintln!(
                "command failed: {}",
                entry["error"].as_str().unwrap_or("unknown error")
            );
            code = 2;
        }
    }
    code
}

fn run_manager(config: Config, autostart: bool, restore_path: Option<PathBuf>) -> i32 {
    let mut conn = match XcbConn::connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!("{}", err);
            return 1;
        }
    };

    let socket_path = config
        .ipc_socket_path
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(ipc::default_socket_path);
    let mut ipc_server = match IpcServer::bind(socket_path) {
        Ok(server) => server,
        Err(err) => {
            error!("cannot bind the IPC socket: {}", err);
            return 1;
        }
    };
    // Children and clients find us through the environment.
    env::set_var("I3SOCK", ipc_server.socket_path());

    let config_display = config
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut tree = LayoutTree::new(config);
    reconcile_outputs(&mut tree, &mut conn);
    conn.init_wm_properties(
        &ipc_server.socket_path().display().to_string(),
        &config_display,
    );

    // Windows that existed before we started (or survived a restart).
    let mut alive = HashMap::new();
    for window in conn.existing_windows() {
        let attrs = conn.window_attributes(window);
        if !attrs.override_redirect {
            alive.insert(window, attrs);
        }
    }
    if let Some(path) = restore_path {
        match snapshot::restore(&mut tree, &path, &alive) {
            Ok(count) => info!("restart-in-place restored {} windows", count),
            Err(err) => warn!("{}; starting with an empty tree", err),
        }
        let _ = std::fs::remove_file(&path);
    }
    for (window, attrs) in &alive {
        if tree.tree.lookup_window(*window).is_none() {
            conn.subscribe_to(*window);
            if let Err(err) = tree.manage_window(*window, attrs) {
                warn!("cannot adopt existing window {:#x}: {}", window, err);
            }
        }
    }

    if autostart {
        for command_line in tree.config().autostart.clone() {
            exec::spawn(&command_line);
        }
    }

    let outcome = run::run(&mut tree, &mut conn, &mut ipc_server);
    ipc_server.cleanup();
    match outcome {
        Ok(RunOutcome::Exit) => 0,
        Ok(RunOutcome::Restart) => {
            let path = env::temp_dir().join(format!("arbor-restart.{}.json", std::process::id()));
            if let Err(err) = snapshot::save(&tree, &path) {
                error!("cannot write the restart snapshot: {}", err);
            }
            restart_in_place(&path);
            // Only reached when the re-exec failed.
            1
        }
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}

/// Replaces this process with a fresh one consuming the snapshot.
fn restart_in_place(snapshot_path: &Path) {
    use std::os::unix::process::CommandExt;
    let exe = match env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            error!("cannot find my own binary: {}", err);
            return;
        }
    };
    info!("restarting in place");
    let err = std::process::Command::new(exe)
        .arg("--restart")
        .arg(snapshot_path)
        .exec();
    error!("re-exec failed: {}", err);
}
