//! Layout snapshots: the tree dump written out on `restart` and read
//! back with `-L`, so a re-exec picks up where the old process stopped.
//!
//! The on-disk format is the GET_TREE dump itself. Restoring rebuilds
//! containers with fresh ids and re-attaches windows by their X11 ids;
//! windows that died during the restart are silently skipped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use petgraph::graph::NodeIndex;
use serde_json::Value;

use crate::geometry::Geometry;
use crate::ipc::reply;
use crate::layout::{Container, Layout, LayoutTree, Orientation};
use crate::manage::Window;
use crate::x11::{WindowAttributes, WindowId};

#[derive(Debug)]
pub enum RestoreError {
    Unreadable(std::io::Error),
    Malformed(String),
}

impl std::fmt::Display for RestoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            RestoreError::Unreadable(ref err) => write!(f, "cannot read snapshot: {}", err),
            RestoreError::Malformed(ref msg) => write!(f, "malformed snapshot: {}", msg),
        }
    }
}

pub fn save(tree: &LayoutTree, path: &Path) -> std::io::Result<()> {
    let dump = reply::tree_json(tree);
    fs::write(path, serde_json::to_string_pretty(&dump).unwrap_or_default())?;
    info!("layout snapshot written to {}", path.display());
    Ok(())
}

/// Rebuilds workspaces, splits, and floating wrappers from a snapshot,
/// re-adopting the windows that still exist. `alive` maps window ids to
/// their current attributes as reported by the X server.
pub fn restore(
    tree: &mut LayoutTree,
    path: &Path,
    alive: &HashMap<WindowId, WindowAttributes>,
) -> Result<usize, RestoreError> {
    let text = fs::read_to_string(path).map_err(RestoreError::Unreadable)?;
    let root: Value =
        serde_json::from_str(&text).map_err(|err| RestoreError::Malformed(err.to_string()))?;
    let outputs = root["nodes"]
        .as_array()
        .ok_or_else(|| RestoreError::Malformed("root without nodes".into()))?;

    let mut restored = 0;
    // Maps snapshot ids onto the freshly built nodes, for focus-order
    // replay.
    let mut id_map: HashMap<String, NodeIndex> = HashMap::new();

    for output in outputs {
        let output_name = output["name"].as_str().unwrap_or_default();
        let output_ix = match tree.tree.output_ix_by_name(output_name) {
            Some(ix) if !tree.tree[ix].is_internal() => ix,
            // The monitor layout changed across the restart; orphaned
            // workspaces land on whatever output is focused when their
            // windows re-map.
            _ => continue,
        };
        let content = output["nodes"]
            .as_array()
            .and_then(|slots| slots.iter().find(|slot| slot["type"] == 2));
        let content = match content {
            Some(content) => content,
            None => continue,
        };
        for ws_value in content["nodes"].as_array().into_iter().flatten() {
            restore_workspace(tree, output_ix, ws_value, alive, &mut id_map, &mut restored);
        }
        // The first workspace in the content focus order was the visible
        // one.
        if let Some(first) = content["focus"].as_array().and_then(|f| f.first()) {
            if let Some(ws_ix) = first.as_str().and_then(|id| id_map.get(id)).copied() {
                let _ = tree.show_workspace(ws_ix);
            }
        }
    }
    replay_focus_orders(tree, &root, &id_map);
    // The replayed ranks decide the focused leaf.
    let focus_ix = tree.tree.follow_focused(tree.tree.root_ix());
    if tree.tree[focus_ix].get_type() == crate::layout::ContainerType::Leaf {
        tree.focused = Some(focus_ix);
    }
    tree.settle();
    info!("restored {} windows from snapshot", restored);
    Ok(restored)
}

fn restore_workspace(
    tree: &mut LayoutTree,
    output_ix: NodeIndex,
    value: &Value,
    alive: &HashMap<WindowId, WindowAttributes>,
    id_map: &mut HashMap<String, NodeIndex>,
    restored: &mut usize,
) {
    let name = match value["name"].as_str() {
        Some(name) if !name.starts_with("__") => name.to_string(),
        _ => return,
    };
    let ws_ix = match tree.tree.workspace_ix_by_name(&name) {
        Some(ix) => ix,
        None => tree.create_workspace_on(output_ix, &name),
    };
    if let Some(orientation) = parse_orientation(value) {
        let _ = tree.tree[ws_ix].set_orientation(orientation);
    }
    if let Some(layout) = parse_layout(value) {
        let _ = tree.tree[ws_ix].set_layout(layout);
    }
    remember(id_map, value, ws_ix);
    for child in value["nodes"].as_array().into_iter().flatten() {
        restore_node(tree, ws_ix, child, alive, id_map, restored);
    }
    for wrapper in value["floating_nodes"].as_array().into_iter().flatten() {
        let rect = parse_rect(&wrapper["rect"]);
        let wrapper_ix = tree
            .tree
            .add_child(ws_ix, Container::new_floating_wrapper(rect), false);
        remember(id_map, wrapper, wrapper_ix);
        let mut any = false;
        for child in wrapper["nodes"].as_array().into_iter().flatten() {
            if restore_node(tree, wrapper_ix, child, alive, id_map, restored) {
                any = true;
            }
        }
        if !any {
            tree.tree.detach(wrapper_ix).ok();
            tree.tree.remove(wrapper_ix);
        } else {
            for leaf_ix in tree.tree.leaves_of(wrapper_ix) {
                let _ = tree.tree[leaf_ix]
                    .set_floating_state(crate::layout::FloatingState::AutoOn);
            }
        }
    }
}

/// Rebuilds one tiling node under `parent_ix`. Returns whether anything
/// survived beneath it.
fn restore_node(
    tree: &mut LayoutTree,
    parent_ix: NodeIndex,
    value: &Value,
    alive: &HashMap<WindowId, WindowAttributes>,
    id_map: &mut HashMap<String, NodeIndex>,
    restored: &mut usize,
) -> bool {
    match value["type"].as_u64() {
        // A leaf: only restored when its window survived the restart.
        Some(6) => {
            let window_id = match value["window"].as_u64() {
                Some(id) => id as WindowId,
                None => return false,
            };
            let attrs = match alive.get(&window_id) {
                Some(attrs) => attrs,
                None => {
                    warn!("window {:#x} from the snapshot is gone", window_id);
                    return false;
                }
            };
            let window = Window::from_attrs(window_id, attrs);
            let leaf_ix = tree.tree.add_child(parent_ix, Container::new_leaf(window), false);
            if let Some(percent) = value["percent"].as_f64() {
                tree.tree.set_percent(leaf_ix, percent);
            }
            remember(id_map, value, leaf_ix);
            *restored += 1;
            true
        }
        // A split: rebuilt, then dropped again if nothing survived in it.
        Some(5) => {
            let rect = parse_rect(&value["rect"]);
            let orientation = parse_orientation(value).unwrap_or(Orientation::Horizontal);
            let split = Container::new_split(Layout::Split, orientation, rect);
            let split_ix = tree.tree.add_child(parent_ix, split, false);
            if let Some(layout) = parse_layout(value) {
                let _ = tree.tree[split_ix].set_layout(layout);
            }
            let mut any = false;
            for child in value["nodes"].as_array().into_iter().flatten() {
                if restore_node(tree, split_ix, child, alive, id_map, restored) {
                    any = true;
                }
            }
            if !any {
                tree.tree.detach(split_ix).ok();
                tree.tree.remove(split_ix);
                return false;
            }
            if let Some(percent) = value["percent"].as_f64() {
                tree.tree.set_percent(split_ix, percent);
            }
            remember(id_map, value, split_ix);
            // A split whose other children died collapses around the
            // survivor, the same reduction a live detach would apply.
            if tree.tree.children_of(split_ix).len() == 1 {
                let _ = tree.reduce_split(split_ix);
            }
            true
        }
        _ => false,
    }
}

/// Replays the focus arrays bottom-up: promoting in reverse MRU order
/// reproduces each container's focus stack.
fn replay_focus_orders(
    tree: &mut LayoutTree,
    value: &Value,
    id_map: &HashMap<String, NodeIndex>,
) {
    for key in ["nodes", "floating_nodes"] {
        for child in value[key].as_array().into_iter().flatten() {
            replay_focus_orders(tree, child, id_map);
        }
    }
    if let Some(focus) = value["focus"].as_array() {
        for id in focus.iter().rev() {
            if let Some(node_ix) = id.as_str().and_then(|id| id_map.get(id)).copied() {
                if tree.tree.get(node_ix).is_some() {
                    tree.tree.promote_focus(node_ix);
                }
            }
        }
    }
}

fn remember(id_map: &mut HashMap<String, NodeIndex>, value: &Value, node_ix: NodeIndex) {
    if let Some(id) = value["id"].as_str() {
        id_map.insert(id.to_string(), node_ix);
    }
}

fn parse_rect(value: &Value) -> Geometry {
    Geometry::new(
        value["x"].as_i64().unwrap_or(0) as i32,
        value["y"].as_i64().unwrap_or(0) as i32,
        value["width"].as_u64().unwrap_or(0) as u32,
        value["height"].as_u64().unwrap_or(0) as u32,
    )
}

fn parse_orientation(value: &Value) -> Option<Orientation> {
    match value["orientation"].as_str() {
        Some("horizontal") => Some(Orientation::Horizontal),
        Some("vertical") => Some(Orientation::Vertical),
        Some("none") => Some(Orientation::Unset),
        _ => None,
    }
}

fn parse_layout(value: &Value) -> Option<Layout> {
    match value["layout"].as_str() {
        Some("split") => Some(Layout::Split),
        Some("stacked") => Some(Layout::Stacked),
        Some("tabbed") => Some(Layout::Tabbed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::core::tree::tests::basic_tree;
    use crate::layout::ContainerType;

    fn alive_from(tree: &LayoutTree) -> HashMap<WindowId, WindowAttributes> {
        tree.tree
            .leaves_of(tree.tree.root_ix())
            .into_iter()
            .filter_map(|leaf| tree.tree[leaf].window())
            .map(|window| {
                let attrs = WindowAttributes {
                    title: window.title.clone(),
                    class: window.class.clone(),
                    instance: window.instance.clone(),
                    geometry: window.geometry,
                    accepts_input: true,
                    ..WindowAttributes::default()
                };
                (window.id, attrs)
            })
            .collect()
    }

    fn snapshot_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("arbor-snap-{}-{}.json", std::process::id(), tag))
    }

    #[test]
    fn round_trip_preserves_structure() {
        let mut tree = basic_tree();
        tree.switch_to_workspace("2").unwrap();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.tree.set_percent(leaves[0], 0.3);
        tree.tree.set_percent(leaves[1], 0.7);
        tree.focus_node(leaves[1]).unwrap();
        tree.settle();

        let path = snapshot_path("round-trip");
        save(&tree, &path).unwrap();

        let alive = alive_from(&tree);
        let mut fresh = LayoutTree::new(Config::default());
        fresh.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        // The auto-created workspace "1" is reused by the restore.
        let restored = restore(&mut fresh, &path, &alive).unwrap();
        assert_eq!(restored, 3);

        let first = reply::tree_json(&tree);
        let second = reply::tree_json(&fresh);
        // Equality modulo container ids: compare with ids and focus
        // arrays (which hold ids) stripped.
        let mut a = first.clone();
        let mut b = second.clone();
        strip_ids(&mut a);
        strip_ids(&mut b);
        assert_eq!(a, b);
        fs::remove_file(&path).ok();
    }

    fn strip_ids(value: &mut Value) {
        match value {
            Value::Object(map) => {
                map.remove("id");
                map.remove("focus");
                for child in map.values_mut() {
                    strip_ids(child);
                }
            }
            Value::Array(items) => {
                for child in items.iter_mut() {
                    strip_ids(child);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn dead_windows_are_skipped_and_splits_collapse() {
        let mut tree = basic_tree();
        tree.settle();
        let path = snapshot_path("dead");
        save(&tree, &path).unwrap();

        // Only window 201 survives the restart.
        let mut alive = alive_from(&tree);
        alive.retain(|id, _| *id == 201);

        let mut fresh = LayoutTree::new(Config::default());
        fresh.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        let restored = restore(&mut fresh, &path, &alive).unwrap();
        assert_eq!(restored, 1);
        assert!(fresh.tree.lookup_window(100).is_none());
        assert!(fresh.tree.lookup_window(201).is_some());
        // The split that held 200 and 201 collapsed around the survivor.
        let leaf = fresh.tree.lookup_window(201).unwrap();
        let parent = fresh.tree.parent_of(leaf).unwrap();
        assert_eq!(fresh.tree[parent].get_type(), ContainerType::Workspace);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_snapshots_are_rejected() {
        let path = snapshot_path("malformed");
        fs::write(&path, "{ not json").unwrap();
        let mut tree = LayoutTree::new(Config::default());
        tree.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        assert!(matches!(
            restore(&mut tree, &path, &HashMap::new()),
            Err(RestoreError::Malformed(_))
        ));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn focus_order_survives_the_round_trip() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.focus_node(leaves[1]).unwrap();
        tree.focus_node(leaves[0]).unwrap();
        tree.settle();
        let path = snapshot_path("focus");
        save(&tree, &path).unwrap();

        let alive = alive_from(&tree);
        let mut fresh = LayoutTree::new(Config::default());
        fresh.output_added("fake-0", Geometry::new(0, 0, 800, 600));
        restore(&mut fresh, &path, &alive).unwrap();
        let ws_2 = fresh.tree.workspace_ix_by_name("2").unwrap();
        let split = fresh.tree.children_of(ws_2)[0];
        let head = fresh.tree.focused_child_of(split).unwrap();
        assert_eq!(fresh.tree[head].window_id(), Some(200));
        fs::remove_file(&path).ok();
    }
}
