//! The configuration model and the directive reader.
//!
//! Only the directives the core consumes are understood; key binding
//! translation itself happens outside, so `bindsym` lines are read solely
//! to harvest workspace-name preferences.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::commands::parse::parse_criteria;
use crate::commands::Match;
use crate::layout::Layout;

/// What an assignment does with a matching window.
#[derive(Debug, Clone)]
pub enum AssignAction {
    ToWorkspace(String),
    ToOutput(String),
    /// `for_window`: run a command against the fresh window.
    Command(String),
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub criteria: Match,
    pub action: AssignAction,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: Option<PathBuf>,
    pub assignments: Vec<Assignment>,
    /// Minimum floating size; -1 leaves the axis unconstrained.
    pub floating_minimum_size: (i32, i32),
    /// Maximum floating size; -1 leaves the axis unconstrained.
    pub floating_maximum_size: (i32, i32),
    pub focus_follows_mouse: bool,
    /// Layout given to fresh workspaces.
    pub workspace_layout: Layout,
    /// `workspace <name> output <output>` directives.
    pub workspace_outputs: Vec<(String, String)>,
    /// Workspace names mentioned in `bindsym … workspace <name>` lines,
    /// preferred when a fresh workspace needs a name.
    pub binding_workspace_names: Vec<String>,
    pub ipc_socket_path: Option<String>,
    /// `exec` lines started once at startup unless `-a` was given.
    pub autostart: Vec<String>,
    /// Height of a stacked/tabbed title strip.
    pub deco_height: u32,
    pub border_px: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            config_path: None,
            assignments: Vec::new(),
            floating_minimum_size: (75, 50),
            floating_maximum_size: (-1, -1),
            focus_follows_mouse: true,
            workspace_layout: Layout::Split,
            workspace_outputs: Vec::new(),
            binding_workspace_names: Vec::new(),
            ipc_socket_path: None,
            autostart: Vec::new(),
            deco_height: 18,
            border_px: 2,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Directive { line: usize, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref err) => write!(f, "cannot read config: {}", err),
            ConfigError::Directive { line, ref message } => {
                write!(f, "config line {}: {}", line, message)
            }
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config = Config::from_str_inner(&text)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_str_inner(text: &str) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            config
                .apply_directive(line)
                .map_err(|message| ConfigError::Directive { line: index + 1, message })?;
        }
        Ok(config)
    }

    fn apply_directive(&mut self, line: &str) -> Result<(), String> {
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };
        match keyword {
            "assign" => {
                let (criteria, rest) = parse_criteria(rest).map_err(|e| e.message)?;
                if criteria.is_empty() {
                    return Err("assign needs criteria".into());
                }
                let target = rest.trim().trim_start_matches('→').trim();
                if target.is_empty() {
                    return Err("assign needs a target workspace".into());
                }
                let action = match target.strip_prefix("output ") {
                    Some(output) => AssignAction::ToOutput(output.trim().to_string()),
                    None => AssignAction::ToWorkspace(target.to_string()),
                };
                self.assignments.push(Assignment { criteria, action });
            }
            "for_window" => {
                let (criteria, rest) = parse_criteria(rest).map_err(|e| e.message)?;
                if criteria.is_empty() || rest.trim().is_empty() {
                    return Err("for_window needs criteria and a command".into());
                }
                self.assignments.push(Assignment {
                    criteria,
                    action: AssignAction::Command(rest.trim().to_string()),
                });
            }
            "floating_minimum_size" => {
                self.floating_minimum_size = parse_size_pair(rest)?;
            }
            "floating_maximum_size" => {
                self.floating_maximum_size = parse_size_pair(rest)?;
            }
            "focus_follows_mouse" => {
                self.focus_follows_mouse = match rest {
                    "yes" | "true" => true,
                    "no" | "false" => false,
                    other => return Err(format!("expected yes or no, got {}", other)),
                };
            }
            "workspace_layout" => {
                self.workspace_layout = match rest {
                    "default" => Layout::Split,
                    "stacked" | "stacking" => Layout::Stacked,
                    "tabbed" => Layout::Tabbed,
                    other => return Err(format!("unknown workspace layout {}", other)),
                };
            }
            "workspace" => {
                // `workspace <name> output <output>`
                let mut parts = rest.splitn(2, " output ");
                let name = parts.next().unwrap_or("").trim().trim_matches('"');
                let output = parts.next().map(str::trim);
                match output {
                    Some(output) if !name.is_empty() => {
                        self.workspace_outputs
                            .push((name.to_string(), output.to_string()));
                    }
                    _ => return Err("expected: workspace <name> output <output>".into()),
                }
            }
            "bindsym" | "bindcode" => {
                // Only the workspace targets matter here; the key grabbing
                // is somebody else's job.
                if let Some(pos) = rest.find("workspace ") {
                    let target = rest[pos + "workspace ".len()..].trim();
                    let reserved = [
                        "next",
                        "prev",
                        "next_on_output",
                        "prev_on_output",
                        "back_and_forth",
                    ];
                    let first = target.split_whitespace().next().unwrap_or("");
                    if !first.is_empty() && !reserved.contains(&first) && first != "number" {
                        let name = target.trim_matches('"').to_string();
                        if !self.binding_workspace_names.contains(&name) {
                            self.binding_workspace_names.push(name);
                        }
                    }
                }
            }
            "ipc-socket" | "ipc_socket" => {
                if rest.is_empty() {
                    return Err("ipc-socket needs a path".into());
                }
                self.ipc_socket_path = Some(rest.to_string());
            }
            "exec" | "exec_always" => {
                if rest.is_empty() {
                    return Err("exec needs a command".into());
                }
                self.autostart.push(rest.to_string());
            }
            other => {
                warn!("ignoring unknown config directive: {}", other);
            }
        }
        Ok(())
    }
}

/// `<W> x <H>` with -1 meaning unconstrained.
fn parse_size_pair(input: &str) -> Result<(i32, i32), String> {
    let mut parts = input.split('x').map(str::trim);
    let w = parts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| format!("bad size: {}", input))?;
    let h = parts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| format!("bad size: {}", input))?;
    if parts.next().is_some() {
        return Err(format!("bad size: {}", input));
    }
    Ok((w, h))
}
