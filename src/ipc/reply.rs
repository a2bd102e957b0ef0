//! Builders for the GET_* reply payloads, including the recursive tree
//! dump.

use petgraph::graph::NodeIndex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::geometry::Geometry;
use crate::layout::LayoutTree;

#[derive(Debug, Serialize)]
pub struct WorkspaceReply {
    pub num: i32,
    pub name: String,
    pub visible: bool,
    pub focused: bool,
    pub urgent: bool,
    pub rect: RectReply,
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct OutputReply {
    pub name: String,
    pub active: bool,
    pub primary: bool,
    pub rect: RectReply,
    pub current_workspace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RectReply {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl From<Geometry> for RectReply {
    fn from(geo: Geometry) -> RectReply {
        RectReply {
            x: geo.origin.x,
            y: geo.origin.y,
            width: geo.size.w,
            height: geo.size.h,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionReply {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub human_readable: String,
    pub loaded_config_file_name: String,
}

fn rect_json(geo: Geometry) -> Value {
    json!({
        "x": geo.origin.x,
        "y": geo.origin.y,
        "width": geo.size.w,
        "height": geo.size.h,
    })
}

/// The recursive GET_TREE dump. Also the on-disk layout snapshot format.
pub fn tree_json(tree: &LayoutTree) -> Value {
    node_json(tree, tree.tree.root_ix())
}

fn node_json(tree: &LayoutTree, node_ix: NodeIndex) -> Value {
    let container = &tree.tree[node_ix];
    let c_type = container.get_type();
    let focused = tree.focused_ix() == Some(node_ix);
    let focus: Vec<Value> = tree
        .tree
        .focus_children_of(node_ix)
        .into_iter()
        .map(|child| json!(tree.tree[child].get_id().to_string()))
        .collect();
    let nodes: Vec<Value> = tree
        .tree
        .tiling_children_of(node_ix)
        .into_iter()
        .map(|child| node_json(tree, child))
        .collect();
    let floating_nodes: Vec<Value> = tree
        .tree
        .floating_children_of(node_ix)
        .into_iter()
        .map(|child| node_json(tree, child))
        .collect();
    let percent = tree.tree.percent_of(node_ix);
    json!({
        "id": container.get_id().to_string(),
        "type": c_type.ordinal(),
        "orientation": container.orientation().to_string(),
        "layout": container.get_layout().map(|l| l.to_string()).unwrap_or_else(|_| "none".into()),
        "percent": if percent > 0.0 { json!(percent) } else { Value::Null },
        "rect": rect_json(container.get_geometry().unwrap_or_else(Geometry::zero)),
        "window_rect": rect_json(container.window_rect().unwrap_or_else(Geometry::zero)),
        "deco_rect": rect_json(container.deco_rect()),
        "geometry": rect_json(
            container.window().map(|w| w.geometry).unwrap_or_else(Geometry::zero)
        ),
        "name": container.name(),
        "num": container.workspace_num().map(Value::from).unwrap_or(Value::Null),
        "urgent": container.urgent(),
        "focused": focused,
        "focus": focus,
        "nodes": nodes,
        "floating_nodes": floating_nodes,
        "window": container.window_id().map(Value::from).unwrap_or(Value::Null),
        "marks": container.mark().map(|m| json!([m])).unwrap_or_else(|| json!([])),
        "sticky_group": container.sticky_group().map(Value::from).unwrap_or(Value::Null),
    })
}

pub fn workspaces_json(tree: &LayoutTree) -> Value {
    let mut result = Vec::new();
    let focused_ws = tree
        .focused_ix()
        .and_then(|focused| tree.workspace_of(focused));
    for ws_ix in tree.ordered_workspaces(None) {
        let container = &tree.tree[ws_ix];
        let output = tree
            .output_of(ws_ix)
            .map(|o| tree.tree[o].name())
            .unwrap_or_default();
        result.push(WorkspaceReply {
            num: container.workspace_num().unwrap_or(-1),
            name: container.name(),
            visible: tree.workspace_is_visible(ws_ix),
            focused: focused_ws == Some(ws_ix),
            urgent: container.urgent(),
            rect: container.get_geometry().unwrap_or_else(Geometry::zero).into(),
            output,
        });
    }
    serde_json::to_value(result).expect("workspace reply serialization")
}

pub fn outputs_json(tree: &LayoutTree) -> Value {
    let mut result = Vec::new();
    for output_ix in tree.tree.outputs() {
        let container = &tree.tree[output_ix];
        if container.is_internal() {
            continue;
        }
        let active = matches!(
            *container,
            crate::layout::Container::Output { active: true, .. }
        );
        result.push(OutputReply {
            name: container.name(),
            active,
            primary: false,
            rect: container.get_geometry().unwrap_or_else(Geometry::zero).into(),
            current_workspace: tree
                .visible_workspace_of(output_ix)
                .map(|ws| tree.tree[ws].name()),
        });
    }
    serde_json::to_value(result).expect("output reply serialization")
}

pub fn marks_json(tree: &LayoutTree) -> Value {
    let marks: Vec<String> = tree
        .tree
        .leaves_of(tree.tree.root_ix())
        .into_iter()
        .filter_map(|leaf| tree.tree[leaf].mark().map(String::from))
        .collect();
    json!(marks)
}

pub fn version_json(tree: &LayoutTree) -> Value {
    let version = env!("CARGO_PKG_VERSION");
    let mut parts = version.split('.').map(|p| p.parse().unwrap_or(0));
    let config = tree
        .config()
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    serde_json::to_value(VersionReply {
        major: parts.next().unwrap_or(0),
        minor: parts.next().unwrap_or(0),
        patch: parts.next().unwrap_or(0),
        human_readable: format!("arbor {}", version),
        loaded_config_file_name: config,
    })
    .expect("version reply serialization")
}

pub fn command_replies_json(replies: &[crate::commands::CommandReply]) -> Value {
    Value::Array(
        replies
            .iter()
            .map(|reply| {
                if reply.success {
                    json!({ "success": true })
                } else {
                    json!({ "success": false, "error": reply.error })
                }
            })
            .collect(),
    )
}

/// There is no bar sidecar configuration; the reply is an empty list of
/// bar ids (or an error object when a specific id was asked for).
pub fn bar_config_json(payload: &[u8]) -> Value {
    if payload.is_empty() {
        json!([])
    } else {
        json!({ "success": false, "error": "no bar configuration" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::core::tree::tests::basic_tree;

    #[test]
    fn tree_dump_shape() {
        let mut tree = basic_tree();
        tree.settle();
        let dump = tree_json(&tree);
        assert_eq!(dump["type"], 0);
        assert_eq!(dump["name"], "root");
        // Root children: the synthetic output plus fake-0.
        let outputs = dump["nodes"].as_array().unwrap();
        assert_eq!(outputs.len(), 2);
        let fake = outputs
            .iter()
            .find(|o| o["name"] == "fake-0")
            .expect("fake-0 missing from dump");
        assert_eq!(fake["type"], 1);
        // Output children: topdock, content, bottomdock.
        let slots = fake["nodes"].as_array().unwrap();
        assert_eq!(slots.len(), 3);
        let content = &slots[1];
        assert_eq!(content["type"], 2);
        let workspaces = content["nodes"].as_array().unwrap();
        assert_eq!(workspaces.len(), 2);
        let ws1 = &workspaces[0];
        assert_eq!(ws1["num"], 1);
        assert_eq!(ws1["type"], 4);
        let leaf = &ws1["nodes"].as_array().unwrap()[0];
        assert_eq!(leaf["type"], 6);
        assert_eq!(leaf["window"], 100);
        assert_eq!(leaf["percent"], 1.0);
    }

    #[test]
    fn focus_arrays_are_mru_ordered() {
        let mut tree = basic_tree();
        let ws_2 = tree.tree.workspace_ix_by_name("2").unwrap();
        let split = tree.tree.children_of(ws_2)[0];
        let leaves = tree.tree.children_of(split);
        tree.focus_node(leaves[1]).unwrap();
        tree.settle();
        let dump = tree_json(&tree);
        let content = &dump["nodes"].as_array().unwrap()[1]["nodes"].as_array().unwrap()[1];
        let ws2 = content["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|ws| ws["name"] == "2")
            .unwrap()
            .clone();
        let split_dump = &ws2["nodes"].as_array().unwrap()[0];
        let focus = split_dump["focus"].as_array().unwrap();
        let first_id = focus[0].as_str().unwrap();
        assert_eq!(first_id, tree.tree[leaves[1]].get_id().to_string());
    }

    #[test]
    fn workspaces_reply_lists_real_workspaces_only() {
        let mut tree = basic_tree();
        tree.settle();
        let value = workspaces_json(&tree);
        let list = value.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|ws| ws["name"] != "__i3_scratch"));
        let ws1 = &list[0];
        assert_eq!(ws1["num"], 1);
        assert_eq!(ws1["visible"], true);
        assert_eq!(ws1["output"], "fake-0");
    }

    #[test]
    fn outputs_reply_skips_the_internal_output() {
        let tree = basic_tree();
        let value = outputs_json(&tree);
        let list = value.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["name"], "fake-0");
        assert_eq!(list[0]["current_workspace"], "1");
    }

    #[test]
    fn command_reply_includes_errors() {
        use crate::commands::CommandReply;
        let replies = vec![CommandReply::ok(), CommandReply::err("nope".into())];
        let value = command_replies_json(&replies);
        assert_eq!(value[0]["success"], true);
        assert_eq!(value[1]["success"], false);
        assert_eq!(value[1]["error"], "nope");
    }
}
