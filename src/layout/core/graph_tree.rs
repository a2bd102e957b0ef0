//! A tree represented via a petgraph graph, used for arbor's layout.

use std::collections::HashMap;
use std::fmt::Result as FmtResult;
use std::fmt::{Debug, Formatter};
use std::iter::Iterator;

use log::{error, trace};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use uuid::Uuid;

use super::container::{Container, ContainerType};
use super::path::{Path, PathBuilder};
use crate::x11::WindowId;

/// Tolerance for the "tiling children sum to 1" invariant.
pub const PERCENT_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GraphError {
    /// These nodes were not siblings.
    NotSiblings(NodeIndex, NodeIndex),
    /// This node had no parent
    NoParent(NodeIndex),
    /// A node could not be found in the tree with this type.
    /// Gives the node where the search was started
    NotFound(ContainerType, NodeIndex),
}

/// The direction to shift sibling nodes when doing a tree transformation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// Layout tree implemented with petgraph.
pub struct InnerTree {
    graph: StableGraph<Container, Path>, // Directed graph
    id_map: HashMap<Uuid, NodeIndex>,
    window_map: HashMap<WindowId, NodeIndex>,
    root: NodeIndex,
}

impl Debug for InnerTree {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let focus_path: String = self
            .focus_path()
            .iter()
            .fold("0".into(), |acc, node_ix| {
                format!("{} -> {}", acc, node_ix.index())
            });
        f.debug_struct("InnerTree")
            .field("graph", &self.graph)
            .field("id_map", &self.id_map)
            .field("window_map", &self.window_map)
            .field("root", &self.root)
            .field("focus_path", &focus_path)
            .finish()
    }
}

impl InnerTree {
    /// Creates a new layout tree with a root node.
    pub fn new() -> InnerTree {
        let mut graph = StableGraph::new();
        let root_ix = graph.add_node(Container::new_root());
        InnerTree {
            graph,
            id_map: HashMap::new(),
            window_map: HashMap::new(),
            root: root_ix,
        }
    }

    /// Gets the index of the tree's root node
    pub fn root_ix(&self) -> NodeIndex {
        self.root
    }

    /// The focus path from the root: at every level the child at the head
    /// of the focus stack, until a container with no children.
    pub fn focus_path(&self) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut cur_ix = self.root;
        while let Some(next_ix) = self.focused_child_of(cur_ix) {
            result.push(next_ix);
            cur_ix = next_ix;
        }
        result
    }

    /// The head of a container's focus stack: the child whose edge has the
    /// lowest rank.
    pub fn focused_child_of(&self, node_ix: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges(node_ix)
            .min_by_key(|e| e.weight().rank)
            .map(|e| e.target())
    }

    /// Follows the focus stack heads beneath the node until the path ends.
    /// Returns the last node in the chain.
    pub fn follow_focused(&self, node_ix: NodeIndex) -> NodeIndex {
        let mut cur_ix = node_ix;
        while let Some(next_ix) = self.focused_child_of(cur_ix) {
            cur_ix = next_ix;
        }
        cur_ix
    }

    /// Follows the focus stack heads beneath the node until a container
    /// with the given type is found, or the path ends. If the path ends the
    /// last node found is returned as the error.
    pub fn follow_focused_until(
        &self,
        node_ix: NodeIndex,
        c_type: ContainerType,
    ) -> Result<NodeIndex, NodeIndex> {
        let mut cur_ix = node_ix;
        loop {
            if self[cur_ix].get_type() == c_type {
                return Ok(cur_ix);
            }
            match self.focused_child_of(cur_ix) {
                Some(next_ix) => cur_ix = next_ix,
                None => return Err(cur_ix),
            }
        }
    }

    /// Gets the weight of a possible edge between two nodes
    pub fn get_edge_weight_between(
        &self,
        parent_ix: NodeIndex,
        child_ix: NodeIndex,
    ) -> Option<&Path> {
        self.graph
            .find_edge(parent_ix, child_ix)
            .and_then(|edge_ix| self.graph.edge_weight(edge_ix))
    }

    fn edge_between(&self, parent_ix: NodeIndex, child_ix: NodeIndex) -> EdgeIndex {
        self.graph
            .find_edge(parent_ix, child_ix)
            .expect("parent and child were not connected")
    }

    /// Adds a new child to a node at the index, returning the node index
    /// of the new child node.
    ///
    /// The new child is placed at the tail of both the spatial order and the
    /// focus stack; if `focus` is true it is promoted to the head of every
    /// focus stack up to the root afterwards. Tiling children get the fair
    /// share of their parent's axis, with the siblings rescaled.
    pub fn add_child(&mut self, parent_ix: NodeIndex, val: Container, focus: bool) -> NodeIndex {
        let id = val.get_id();
        let maybe_window = val.window_id();
        let child_ix = self.graph.add_node(val);
        self.attach_child(parent_ix, child_ix);
        if focus {
            self.set_focus_path(child_ix);
        }
        self.id_map.insert(id, child_ix);
        if let Some(window) = maybe_window {
            self.window_map.insert(window, child_ix);
        }
        child_ix
    }

    /// Adds a container to the graph without attaching it anywhere. The
    /// caller must `replace` or `attach_child` it promptly; parentless
    /// nodes are invisible to every traversal.
    pub fn add_node_detached(&mut self, val: Container) -> NodeIndex {
        let id = val.get_id();
        let maybe_window = val.window_id();
        let node_ix = self.graph.add_node(val);
        self.id_map.insert(id, node_ix);
        if let Some(window) = maybe_window {
            self.window_map.insert(window, node_ix);
        }
        node_ix
    }

    /// Add an existing node (detached in the graph) to the tree at the tail
    /// of the parent's children.
    pub fn attach_child(&mut self, parent_ix: NodeIndex, child_ix: NodeIndex) -> EdgeIndex {
        if self.has_parent(child_ix) {
            panic!("attach_child: child had a parent!")
        }

        let parent_type = self
            .graph
            .node_weight(parent_ix)
            .expect("attach_child: parent not found")
            .get_type();
        let child_type = self
            .graph
            .node_weight(child_ix)
            .expect("attach_child: child not found")
            .get_type();

        if !parent_type.can_have_child(child_type) {
            panic!(
                "Attempted to give a {:?} a {:?} child!",
                parent_type, child_type
            );
        }
        let tail = self.children_of(parent_ix).len() as u32 + 1;
        let path = PathBuilder::new(tail).rank(tail).build();
        let result = self.graph.update_edge(parent_ix, child_ix, path);
        self.fair_share_after_attach(parent_ix, child_ix);
        self.normalize_edges(parent_ix);
        result
    }

    /// Gives a freshly attached tiling child `1/n` of the parent's axis and
    /// rescales its siblings by `(n-1)/n`. Non-tiling attachments (floating
    /// wrappers, dock children, workspaces) carry no percent.
    fn fair_share_after_attach(&mut self, parent_ix: NodeIndex, child_ix: NodeIndex) {
        match self[parent_ix].get_type() {
            ContainerType::Workspace | ContainerType::Split => {}
            _ => return,
        }
        if self[child_ix].get_type() == ContainerType::FloatingWrapper {
            return;
        }
        let siblings = self.tiling_children_of(parent_ix);
        let n = siblings.len() as f64;
        let rescale = (n - 1.0) / n;
        for sibling_ix in siblings {
            let edge = self.edge_between(parent_ix, sibling_ix);
            let weight = self.graph.edge_weight_mut(edge)
                .expect("fair_share: no edge weight");
            if sibling_ix == child_ix {
                weight.percent = 1.0 / n;
            } else {
                weight.percent *= rescale;
            }
        }
    }

    /// Finds the index of the container at the child index's parent,
    /// modifies it so that it's the given child number in the list.
    pub fn set_child_pos(&mut self, child_ix: NodeIndex, mut child_pos: u32) {
        let parent_ix = self.parent_of(child_ix).expect("Child had no parent");
        let siblings = self.children_of(parent_ix);
        if child_pos > siblings.len() as u32 {
            child_pos = siblings.len() as u32;
        }
        let mut counter = child_pos + 1;
        for sibling_ix in siblings {
            if sibling_ix == child_ix {
                continue;
            }
            let edge = self.edge_between(parent_ix, sibling_ix);
            let weight = self.graph.edge_weight_mut(edge)
                .expect("Sibling had no edge weight");
            if weight.weight < child_pos {
                continue;
            }
            weight.weight = counter;
            counter += 1;
        }
        let edge = self.edge_between(parent_ix, child_ix);
        let weight = self.graph.edge_weight_mut(edge)
            .expect("Child had no edge weight");
        weight.weight = child_pos;
        self.normalize_edges(parent_ix);
    }

    /// Swaps the spatial order of the two child nodes. The nodes must
    /// be siblings of each other, otherwise this function will fail.
    /// Focus ranks and percentages travel with the nodes, not the slots.
    pub fn swap_node_order(
        &mut self,
        child1_ix: NodeIndex,
        child2_ix: NodeIndex,
    ) -> Result<(), GraphError> {
        let parent1_ix = self.parent_of(child1_ix)?;
        let parent2_ix = self.parent_of(child2_ix)?;
        if parent2_ix != parent1_ix {
            return Err(GraphError::NotSiblings(child1_ix, child2_ix));
        }
        let parent_ix = parent1_ix;
        let weight1 = self
            .get_edge_weight_between(parent_ix, child1_ix)
            .expect("Could not get weight between parent and child")
            .weight;
        let weight2 = self
            .get_edge_weight_between(parent_ix, child2_ix)
            .expect("Could not get weight between parent and child")
            .weight;
        let edge1 = self.edge_between(parent_ix, child1_ix);
        self.graph.edge_weight_mut(edge1).unwrap().weight = weight2;
        let edge2 = self.edge_between(parent_ix, child2_ix);
        self.graph.edge_weight_mut(edge2).unwrap().weight = weight1;
        self.normalize_edges(parent_ix);
        Ok(())
    }

    /// Moves the node index at source so that it is a child of the target
    /// node, at the tail of its children. The freed share is redistributed
    /// at the old parent and a fair share claimed at the new one.
    pub fn move_into(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
    ) -> Result<NodeIndex, GraphError> {
        self.detach(source)?;
        self.attach_child(target, source);
        if !self[source].floating() {
            self.set_focus_path(source);
        }
        Ok(target)
    }

    /// Places the source node at the position where the target node is.
    ///
    /// Each sibling at or past the landing slot is shifted over by one.
    /// With `ShiftDirection::Left` the source lands in the target's slot,
    /// with `Right` it lands just past it.
    ///
    /// If the operation succeeds, the source's new parent (the target's
    /// parent) is returned.
    pub fn place_node_at(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        dir: ShiftDirection,
    ) -> Result<NodeIndex, GraphError> {
        trace!(
            "Placing source {:?} at target {:?}. Shifting to {:?}",
            source, target, dir
        );
        let target_parent = self.parent_of(target)?;
        self.detach(source)?;
        let target_weight = {
            let weight = self
                .get_edge_weight_between(target_parent, target)
                .expect("Target node and its parent were not linked")
                .weight;
            match dir {
                ShiftDirection::Left => weight,
                ShiftDirection::Right => weight + 1,
            }
        };
        let bigger_siblings: Vec<NodeIndex> = self
            .graph
            .edges(target_parent)
            .filter(|edge| edge.weight().weight >= target_weight)
            .map(|edge| edge.target())
            .collect();
        for sibling_ix in bigger_siblings {
            let edge = self.edge_between(target_parent, sibling_ix);
            let weight = self.graph.edge_weight_mut(edge)
                .expect("Sibling had no edge weight");
            weight.weight += 1;
        }
        let tail_rank = self.children_of(target_parent).len() as u32 + 1;
        let path = PathBuilder::new(target_weight).rank(tail_rank).build();
        self.graph.update_edge(target_parent, source, path);
        self.fair_share_after_attach(target_parent, source);
        self.normalize_edges(target_parent);
        Ok(target_parent)
    }

    /// Adds the source node to the far end of the target's siblings.
    /// If dir is Left it is added at the tail, with Right at the head.
    ///
    /// Returns the new parent of the source after the transformation.
    pub fn add_to_end(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        dir: ShiftDirection,
    ) -> Result<NodeIndex, GraphError> {
        let target_parent = self.parent_of(target)?;
        self.detach(source)?;
        self.attach_child(target_parent, source);
        if dir == ShiftDirection::Right {
            self.set_child_pos(source, 1);
        }
        Ok(target_parent)
    }

    /// Splices `new_ix` into `old_ix`'s position, taking over its spatial
    /// slot, focus-stack slot, and percent. `new_ix` must be detached;
    /// `old_ix` is left parentless but not destroyed.
    pub fn replace(&mut self, old_ix: NodeIndex, new_ix: NodeIndex) -> Result<NodeIndex, GraphError> {
        if self.has_parent(new_ix) {
            panic!("replace: new node already had a parent!");
        }
        let parent_ix = self.parent_of(old_ix)?;
        let parent_type = self[parent_ix].get_type();
        let new_type = self[new_ix].get_type();
        if !parent_type.can_have_child(new_type) {
            panic!(
                "Attempted to give a {:?} a {:?} child!",
                parent_type, new_type
            );
        }
        let path = *self
            .get_edge_weight_between(parent_ix, old_ix)
            .expect("replace: old node had no edge weight");
        let edge = self.edge_between(parent_ix, old_ix);
        self.graph.remove_edge(edge);
        self.graph.update_edge(parent_ix, new_ix, path);
        Ok(parent_ix)
    }

    /// Detaches a node from its parent, redistributing its share of the
    /// axis across the remaining tiling siblings and closing both the
    /// spatial and the focus order over the gap. Does **not** destroy.
    pub fn detach(&mut self, node_ix: NodeIndex) -> Result<NodeIndex, GraphError> {
        let parent_ix = self.parent_of(node_ix)?;
        let edge = self.edge_between(parent_ix, node_ix);
        let freed = self.graph.edge_weight(edge)
            .expect("detach: no edge weight").percent;
        self.graph.remove_edge(edge);
        if freed > 0.0 && freed < 1.0 {
            for sibling_ix in self.tiling_children_of(parent_ix) {
                let edge = self.edge_between(parent_ix, sibling_ix);
                let weight = self.graph.edge_weight_mut(edge)
                    .expect("detach: sibling had no edge weight");
                weight.percent *= 1.0 / (1.0 - freed);
            }
        }
        self.normalize_edges(parent_ix);
        Ok(parent_ix)
    }

    /// Removes a node at the given index, detaching it first if necessary.
    pub fn remove(&mut self, node_ix: NodeIndex) -> Option<Container> {
        {
            let container = &self.graph[node_ix];
            let id = container.get_id();
            self.id_map.remove(&id);
            if let Some(window) = container.window_id() {
                self.window_map.remove(&window);
            }
        }
        if let Ok(parent_ix) = self.parent_of(node_ix) {
            let result = self.graph.remove_node(node_ix);
            self.normalize_edges(parent_ix);
            result
        } else {
            self.graph.remove_node(node_ix)
        }
    }

    /// Normalizes the spatial weights and the focus ranks of the children
    /// of a node so that both are gap-free, preserving both orders.
    pub fn normalize_edges(&mut self, parent_ix: NodeIndex) {
        let by_weight = self.children_of(parent_ix);
        for (pos, child_ix) in by_weight.iter().enumerate() {
            let edge = self.edge_between(parent_ix, *child_ix);
            let weight = self.graph.edge_weight_mut(edge)
                .expect("normalize: no edge weight");
            weight.weight = pos as u32 + 1;
        }
        let by_rank = self.focus_children_of(parent_ix);
        for (pos, child_ix) in by_rank.iter().enumerate() {
            let edge = self.edge_between(parent_ix, *child_ix);
            let weight = self.graph.edge_weight_mut(edge)
                .expect("normalize: no edge weight");
            weight.rank = pos as u32 + 1;
        }
    }

    /// Rounds the aggregate percent error of a container's tiling children
    /// into the last child, and recovers from a degenerate zero sum by
    /// assigning equal shares.
    pub fn fix_percent(&mut self, parent_ix: NodeIndex) {
        match self[parent_ix].get_type() {
            ContainerType::Workspace | ContainerType::Split => {}
            _ => return,
        }
        let children = self.tiling_children_of(parent_ix);
        if children.is_empty() {
            return;
        }
        let sum: f64 = children
            .iter()
            .map(|c| self.percent_of(*c))
            .sum();
        if sum < PERCENT_EPSILON {
            let share = 1.0 / children.len() as f64;
            for child_ix in &children {
                self.set_percent(*child_ix, share);
            }
            return;
        }
        if (sum - 1.0).abs() <= PERCENT_EPSILON {
            return;
        }
        let scale = 1.0 / sum;
        let mut acc = 0.0;
        let last = *children.last().unwrap();
        for child_ix in &children {
            if *child_ix == last {
                self.set_percent(*child_ix, 1.0 - acc);
            } else {
                let new = self.percent_of(*child_ix) * scale;
                self.set_percent(*child_ix, new);
                acc += new;
            }
        }
    }

    pub fn percent_of(&self, node_ix: NodeIndex) -> f64 {
        self.parent_of(node_ix)
            .ok()
            .and_then(|parent_ix| self.get_edge_weight_between(parent_ix, node_ix))
            .map(|path| path.percent)
            .unwrap_or(0.0)
    }

    pub fn set_percent(&mut self, node_ix: NodeIndex, percent: f64) {
        if let Ok(parent_ix) = self.parent_of(node_ix) {
            let edge = self.edge_between(parent_ix, node_ix);
            self.graph.edge_weight_mut(edge)
                .expect("set_percent: no edge weight")
                .percent = percent;
        }
    }

    /// Promotes a child to the head of its parent's focus stack. Siblings
    /// that were more recently focused than it are pushed back one slot;
    /// everything behind its old rank is untouched.
    pub fn promote_focus(&mut self, node_ix: NodeIndex) {
        let parent_ix = match self.parent_of(node_ix) {
            Ok(ix) => ix,
            Err(_) => return,
        };
        let old_rank = self
            .get_edge_weight_between(parent_ix, node_ix)
            .expect("promote_focus: no edge weight")
            .rank;
        for sibling_ix in self.children_of(parent_ix) {
            let edge = self.edge_between(parent_ix, sibling_ix);
            let weight = self.graph.edge_weight_mut(edge)
                .expect("promote_focus: no edge weight");
            if sibling_ix == node_ix {
                weight.rank = 1;
            } else if weight.rank < old_rank {
                weight.rank += 1;
            }
        }
    }

    /// Makes the node the globally focused one: promotes it at its parent,
    /// its parent at the grandparent, and so on up to the root. Ancestors
    /// whose relevant child is already at the head are left as they are,
    /// which keeps focus stacks above the common ancestor stable.
    pub fn set_focus_path(&mut self, node_ix: NodeIndex) {
        let mut cur_ix = node_ix;
        while let Ok(parent_ix) = self.parent_of(cur_ix) {
            self.promote_focus(cur_ix);
            cur_ix = parent_ix;
        }
    }

    /// Whether a node has a parent
    pub fn has_parent(&self, node_ix: NodeIndex) -> bool {
        let neighbors = self.graph.neighbors_directed(node_ix, Direction::Incoming);
        match neighbors.count() {
            0 => false,
            1 => true,
            _ => panic!("Node has more than one parent!"),
        }
    }

    /// Gets the parent of a node, if the node exists
    pub fn parent_of(&self, node_ix: NodeIndex) -> Result<NodeIndex, GraphError> {
        let mut neighbors = self.graph.neighbors_directed(node_ix, Direction::Incoming);
        let result = neighbors.next().ok_or(GraphError::NoParent(node_ix));
        if cfg!(debug_assertions) && neighbors.next().is_some() {
            error!("{:?}", self);
            panic!("parent_of: node has multiple parents!")
        }
        result
    }

    /// Collects all children of a node, in spatial order.
    pub fn children_of(&self, node_ix: NodeIndex) -> Vec<NodeIndex> {
        let mut edges = self.graph.edges(node_ix).collect::<Vec<_>>();
        edges.sort_by_key(|e| e.weight().weight);
        edges.into_iter().map(|e| e.target()).collect()
    }

    /// Collects all children of a node, in most-recently-focused order.
    pub fn focus_children_of(&self, node_ix: NodeIndex) -> Vec<NodeIndex> {
        let mut edges = self.graph.edges(node_ix).collect::<Vec<_>>();
        edges.sort_by_key(|e| e.weight().rank);
        edges.into_iter().map(|e| e.target()).collect()
    }

    /// Collects the floating wrappers among a node's children, in order.
    pub fn floating_children_of(&self, node_ix: NodeIndex) -> Vec<NodeIndex> {
        self.children_of(node_ix)
            .into_iter()
            .filter(|child| self[*child].get_type() == ContainerType::FloatingWrapper)
            .collect()
    }

    /// Collects a node's children that take part in tiling, in order.
    pub fn tiling_children_of(&self, node_ix: NodeIndex) -> Vec<NodeIndex> {
        self.children_of(node_ix)
            .into_iter()
            .filter(|child| self[*child].get_type() != ContainerType::FloatingWrapper)
            .collect()
    }

    /// Looks up a container by id
    pub fn lookup_id(&self, id: Uuid) -> Option<NodeIndex> {
        self.id_map.get(&id).cloned()
    }

    /// Looks up the leaf holding this X11 window.
    pub fn lookup_window(&self, window: WindowId) -> Option<NodeIndex> {
        self.window_map.get(&window).cloned()
    }

    /// Gets the container of the given node.
    pub fn get(&self, node_ix: NodeIndex) -> Option<&Container> {
        self.graph.node_weight(node_ix)
    }

    /// Gets a mutable reference to a given node
    pub fn get_mut(&mut self, node_ix: NodeIndex) -> Option<&mut Container> {
        self.graph.node_weight_mut(node_ix)
    }

    /// Gets the ContainerType of the selected node
    pub fn node_type(&self, node_ix: NodeIndex) -> Option<ContainerType> {
        self.graph.node_weight(node_ix).map(Container::get_type)
    }

    /// The outputs, in tree order.
    pub fn outputs(&self) -> Vec<NodeIndex> {
        self.children_of(self.root)
    }

    /// The content slot of an output.
    pub fn content_of(&self, output_ix: NodeIndex) -> Option<NodeIndex> {
        self.children_of(output_ix)
            .into_iter()
            .find(|child| self[*child].get_type() == ContainerType::Content)
    }

    /// All workspaces of all outputs, in tree order.
    pub fn workspaces(&self) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        for output_ix in self.outputs() {
            if let Some(content_ix) = self.content_of(output_ix) {
                result.extend(self.children_of(content_ix));
            }
        }
        result
    }

    /// Gets the index of the workspace of this name
    pub fn workspace_ix_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.workspaces().into_iter().find(|ws| {
            self[*ws]
                .workspace_name()
                .expect("workspace_ix_by_name: bad tree structure")
                == name
        })
    }

    /// Gets the index of the output of this name
    pub fn output_ix_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.outputs()
            .into_iter()
            .find(|output| self[*output].name() == name)
    }

    /// Attempts to get an ancestor matching the matching type
    ///
    /// Note this does *NOT* check the given node.
    pub fn ancestor_of_type(
        &self,
        node_ix: NodeIndex,
        container_type: ContainerType,
    ) -> Result<NodeIndex, GraphError> {
        let mut cur_ix = node_ix;
        while let Ok(parent_ix) = self.parent_of(cur_ix) {
            let parent = self
                .graph
                .node_weight(parent_ix)
                .expect("ancestor_of_type: parent_of invalid");
            if parent.get_type() == container_type {
                return Ok(parent_ix);
            }
            assert!(cur_ix != parent_ix, "Parent of node was itself!");
            cur_ix = parent_ix;
        }
        Err(GraphError::NotFound(container_type, node_ix))
    }

    /// Attempts to get a descendant of the matching type.
    /// Looks down the left side of the tree first.
    ///
    /// Note this *DOES* check the given node.
    pub fn descendant_of_type(
        &self,
        node_ix: NodeIndex,
        container_type: ContainerType,
    ) -> Result<NodeIndex, GraphError> {
        if let Some(container) = self.get(node_ix) {
            if container.get_type() == container_type {
                return Ok(node_ix);
            }
        }
        for child in self.children_of(node_ix) {
            if let Ok(desc) = self.descendant_of_type(child, container_type) {
                return Ok(desc);
            }
        }
        Err(GraphError::NotFound(container_type, node_ix))
    }

    /// Returns the node indices of any node that is a descendant of a node
    pub fn all_descendants_of(&self, node_ix: NodeIndex) -> Vec<NodeIndex> {
        let mut index: usize = 0;
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors(node_ix).collect();
        while index != nodes.len() {
            let cur_node = nodes[index];
            for child in self.graph.neighbors(cur_node) {
                nodes.push(child);
            }
            index += 1;
        }
        nodes
    }

    /// All leaves beneath (and including) the node, in tree order.
    pub fn leaves_of(&self, node_ix: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        if self[node_ix].get_type() == ContainerType::Leaf {
            result.push(node_ix);
        }
        for child in self.children_of(node_ix) {
            result.extend(self.leaves_of(child));
        }
        result
    }

}

use std::ops::{Index, IndexMut};

impl Index<NodeIndex> for InnerTree {
    type Output = Container;
    #[inline]
    fn index(&self, index: NodeIndex) -> &Self::Output {
        self.get(index).expect("graph_tree: node not found")
    }
}

impl IndexMut<NodeIndex> for InnerTree {
    #[inline]
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        self.get_mut(index).expect("graph_tree: node not found")
    }
}

#[cfg(test)]
pub mod tests {
    use super::super::container::*;
    use super::*;
    use crate::geometry::Geometry;
    use crate::manage::Window;

    pub fn fake_geometry() -> Geometry {
        Geometry::new(0, 0, 800, 600)
    }

    /// Makes a very basic tree.
    /// There is one output with a content slot holding two workspaces.
    /// The first workspace has a single leaf, the second has a split with
    /// two leaves in it.
    pub fn basic_tree() -> InnerTree {
        let mut tree = InnerTree::new();
        let root_ix = tree.root_ix();
        let geo = fake_geometry();

        let output_ix = tree.add_child(root_ix, Container::new_output("fake-0".into(), geo), false);
        let content_ix = tree.add_child(output_ix, Container::new_content(geo), false);
        let ws_1_ix = tree.add_child(
            content_ix,
            Container::new_workspace("1".into(), geo, Layout::Split),
            false,
        );
        let ws_2_ix = tree.add_child(
            content_ix,
            Container::new_workspace("2".into(), geo, Layout::Split),
            false,
        );
        tree.add_child(ws_1_ix, Container::new_leaf(Window::for_tests(100)), true);
        let split_ix = tree.add_child(
            ws_2_ix,
            Container::new_split(Layout::Split, Orientation::Horizontal, geo),
            false,
        );
        tree.add_child(split_ix, Container::new_leaf(Window::for_tests(200)), false);
        tree.add_child(split_ix, Container::new_leaf(Window::for_tests(201)), false);
        tree
    }

    #[test]
    fn descendants_and_leaves() {
        let tree = basic_tree();
        let all = tree.all_descendants_of(tree.root_ix());
        assert_eq!(all.len(), 7);
        let leaves = tree.leaves_of(tree.root_ix());
        assert_eq!(leaves.len(), 3);
    }

    #[test]
    fn id_and_window_maps() {
        let mut tree = basic_tree();
        let root_ix = tree.root_ix();
        let leaf_ix = tree
            .descendant_of_type(root_ix, ContainerType::Leaf)
            .expect("no leaf in basic tree");
        let id = tree[leaf_ix].get_id();
        let window = tree[leaf_ix].window_id().unwrap();
        assert_eq!(tree.lookup_id(id), Some(leaf_ix));
        assert_eq!(tree.lookup_window(window), Some(leaf_ix));
        tree.remove(leaf_ix);
        assert_eq!(tree.lookup_id(id), None);
        assert_eq!(tree.lookup_window(window), None);
    }

    #[test]
    fn fair_share_on_attach() {
        let mut tree = basic_tree();
        let ws_ix = tree.workspace_ix_by_name("2").unwrap();
        let split_ix = tree.children_of(ws_ix)[0];
        let children = tree.children_of(split_ix);
        assert_eq!(children.len(), 2);
        for child in &children {
            assert!((tree.percent_of(*child) - 0.5).abs() < PERCENT_EPSILON);
        }
        let new_ix = tree.add_child(split_ix, Container::new_leaf(Window::for_tests(202)), false);
        assert!((tree.percent_of(new_ix) - 1.0 / 3.0).abs() < PERCENT_EPSILON);
        let sum: f64 = tree
            .children_of(split_ix)
            .iter()
            .map(|c| tree.percent_of(*c))
            .sum();
        assert!((sum - 1.0).abs() < PERCENT_EPSILON);
    }

    #[test]
    fn detach_redistributes() {
        let mut tree = basic_tree();
        let ws_ix = tree.workspace_ix_by_name("2").unwrap();
        let split_ix = tree.children_of(ws_ix)[0];
        let children = tree.children_of(split_ix);
        tree.detach(children[0]).unwrap();
        tree.remove(children[0]);
        let rest = tree.children_of(split_ix);
        assert_eq!(rest.len(), 1);
        assert!((tree.percent_of(rest[0]) - 1.0).abs() < PERCENT_EPSILON);
    }

    #[test]
    fn focus_promotion_is_mru() {
        let mut tree = basic_tree();
        let ws_ix = tree.workspace_ix_by_name("2").unwrap();
        let split_ix = tree.children_of(ws_ix)[0];
        let children = tree.children_of(split_ix);
        tree.set_focus_path(children[1]);
        assert_eq!(tree.focused_child_of(split_ix), Some(children[1]));
        assert_eq!(tree.follow_focused(tree.root_ix()), children[1]);
        tree.set_focus_path(children[0]);
        assert_eq!(
            tree.focus_children_of(split_ix),
            vec![children[0], children[1]]
        );
    }

    #[test]
    fn focus_above_common_ancestor_is_stable() {
        let mut tree = basic_tree();
        let ws_2 = tree.workspace_ix_by_name("2").unwrap();
        let split_ix = tree.children_of(ws_2)[0];
        let children = tree.children_of(split_ix);
        tree.set_focus_path(children[0]);
        let content_ix = tree.parent_of(ws_2).unwrap();
        let before = tree.focus_children_of(content_ix);
        // Focus movement inside workspace 2 must not reorder the content
        // slot's focus stack.
        tree.set_focus_path(children[1]);
        assert_eq!(tree.focus_children_of(content_ix), before);
    }

    #[test]
    fn place_node_at_shifts_siblings() {
        let mut tree = basic_tree();
        let ws_ix = tree.workspace_ix_by_name("2").unwrap();
        let split_ix = tree.children_of(ws_ix)[0];
        let third = tree.add_child(split_ix, Container::new_leaf(Window::for_tests(202)), false);
        let children = tree.children_of(split_ix);
        tree.place_node_at(third, children[0], ShiftDirection::Left)
            .unwrap();
        let children = tree.children_of(split_ix);
        assert_eq!(children[0], third);
    }

    #[test]
    #[should_panic(expected = "Attempted to give a")]
    fn kind_discipline_is_enforced() {
        let mut tree = basic_tree();
        let root_ix = tree.root_ix();
        // A workspace can never be a child of the root.
        tree.add_child(
            root_ix,
            Container::new_workspace("bad".into(), fake_geometry(), Layout::Split),
            false,
        );
    }
}
