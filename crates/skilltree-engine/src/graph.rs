//! The skill tree graph: an arena of nodes connected by index-pair edges.
//!
//! Nodes live in a `Vec` owned by the graph. Edges are stored twice, as
//! forward (`children`) and reverse (`parents`) adjacency lists of arena
//! indices, so parent/child traversal never needs owning back-references.
//!
//! The graph is acyclic between successful mutations: [`SkillTreeGraph::add_edge`]
//! walks from the proposed child looking for the proposed parent before
//! anything is written, so a rejected edge leaves the graph untouched.

use std::collections::{BTreeMap, VecDeque};

use skilltree_types::{NodeId, TreeId};

use crate::error::GraphError;
use crate::node::SkillNode;

/// A directed acyclic graph of skill nodes.
#[derive(Debug, Clone)]
pub struct SkillTreeGraph {
    id: TreeId,
    version: u32,
    name: String,
    /// Node arena, in insertion order.
    nodes: Vec<SkillNode>,
    /// Node id to arena index.
    index: BTreeMap<NodeId, usize>,
    /// Forward adjacency: arena index to child indices, in insertion order.
    children: Vec<Vec<usize>>,
    /// Reverse adjacency: arena index to parent indices, in insertion order.
    parents: Vec<Vec<usize>>,
}

impl SkillTreeGraph {
    /// Create an empty graph at version 1.
    pub fn new(id: TreeId, name: impl Into<String>) -> Self {
        Self {
            id,
            version: 1,
            name: name.into(),
            nodes: Vec::new(),
            index: BTreeMap::new(),
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Set the definition version recorded in save data.
    #[must_use]
    pub const fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Tree identifier.
    pub const fn id(&self) -> TreeId {
        self.id
    }

    /// Definition version.
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes.
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add a node. Fails if a node with the same id already exists.
    pub fn add_node(&mut self, node: SkillNode) -> Result<NodeId, GraphError> {
        let id = node.id;
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        let slot = self.nodes.len();
        self.nodes.push(node);
        self.children.push(Vec::new());
        self.parents.push(Vec::new());
        self.index.insert(id, slot);
        Ok(id)
    }

    /// Connect `parent` to `child`.
    ///
    /// Fails with [`GraphError::CycleDetected`] if `child` already reaches
    /// `parent` (including `parent == child`), and with
    /// [`GraphError::DuplicateEdge`] if the edge exists. The cycle check runs
    /// before the edge is committed.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let p = self.index_of(parent)?;
        let c = self.index_of(child)?;

        if self.child_indices(p).contains(&c) {
            return Err(GraphError::DuplicateEdge { parent, child });
        }
        if self.reaches(c, p) {
            tracing::debug!(%parent, %child, "Edge rejected: would create a cycle");
            return Err(GraphError::CycleDetected { parent, child });
        }

        let forward = self
            .children
            .get_mut(p)
            .ok_or(GraphError::NodeNotFound(parent))?;
        forward.push(c);
        let reverse = self
            .parents
            .get_mut(c)
            .ok_or(GraphError::NodeNotFound(child))?;
        reverse.push(p);
        Ok(())
    }

    /// Remove the edge `parent -> child`.
    pub fn remove_edge(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let p = self.index_of(parent)?;
        let c = self.index_of(child)?;
        let missing = GraphError::EdgeNotFound { parent, child };

        let forward = self.children.get_mut(p).ok_or_else(|| missing.clone())?;
        let before = forward.len();
        forward.retain(|&i| i != c);
        if forward.len() == before {
            return Err(missing);
        }
        if let Some(reverse) = self.parents.get_mut(c) {
            reverse.retain(|&i| i != p);
        }
        Ok(())
    }

    /// Whether `add_edge(parent, child)` would be rejected as a cycle.
    pub fn would_create_cycle(&self, parent: NodeId, child: NodeId) -> Result<bool, GraphError> {
        let p = self.index_of(parent)?;
        let c = self.index_of(child)?;
        Ok(self.reaches(c, p))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&SkillNode> {
        self.index.get(&id).and_then(|&i| self.nodes.get(i))
    }

    /// Mutably borrow a node's definition.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SkillNode> {
        let slot = *self.index.get(&id)?;
        self.nodes.get_mut(slot)
    }

    /// Iterate over every node in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &SkillNode> {
        self.nodes.iter()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SkillNode> {
        self.nodes.iter_mut()
    }

    /// Find the first node with the given display name.
    pub fn find_by_name(&self, name: &str) -> Option<&SkillNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes without parents, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.parents
            .iter()
            .zip(&self.nodes)
            .filter(|(parents, _)| parents.is_empty())
            .map(|(_, node)| node.id)
            .collect()
    }

    /// Children of a node, in insertion order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let slot = self.index_of(id)?;
        Ok(self.ids(self.child_indices(slot)))
    }

    /// Parents of a node, in insertion order.
    pub fn parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let slot = self.index_of(id)?;
        Ok(self.ids(self.parent_indices(slot)))
    }

    /// Every node reachable from `id`, breadth first, excluding `id`.
    ///
    /// `max_depth` limits how many edges away a descendant may be; `None`
    /// walks the whole subtree.
    pub fn descendants(&self, id: NodeId, max_depth: Option<u32>) -> Result<Vec<NodeId>, GraphError> {
        let start = self.index_of(id)?;
        let mut visited = vec![false; self.nodes.len()];
        if let Some(seen) = visited.get_mut(start) {
            *seen = true;
        }

        let mut queue = VecDeque::from([(start, 0_u32)]);
        let mut found = Vec::new();
        while let Some((current, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let next_depth = depth.saturating_add(1);
            for &child in self.child_indices(current) {
                match visited.get_mut(child) {
                    Some(seen) if !*seen => *seen = true,
                    _ => continue,
                }
                found.push(child);
                queue.push_back((child, next_depth));
            }
        }
        Ok(self.ids(&found))
    }

    /// All nodes ordered so that every parent precedes its children.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut pending: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for &child in self.child_indices(current) {
                if let Some(count) = pending.get_mut(child) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
        self.ids(&order)
    }

    /// Every edge as `(parent, child)`, grouped by parent in insertion order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.children
            .iter()
            .zip(&self.nodes)
            .flat_map(|(children, parent)| {
                children
                    .iter()
                    .filter_map(|&c| self.nodes.get(c).map(|child| (parent.id, child.id)))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn index_of(&self, id: NodeId) -> Result<usize, GraphError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GraphError::NodeNotFound(id))
    }

    fn child_indices(&self, slot: usize) -> &[usize] {
        self.children.get(slot).map(Vec::as_slice).unwrap_or_default()
    }

    fn parent_indices(&self, slot: usize) -> &[usize] {
        self.parents.get(slot).map(Vec::as_slice).unwrap_or_default()
    }

    fn ids(&self, slots: &[usize]) -> Vec<NodeId> {
        slots
            .iter()
            .filter_map(|&i| self.nodes.get(i).map(|n| n.id))
            .collect()
    }

    /// Depth-first walk along child edges from `from`, looking for `to`.
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            match visited.get_mut(current) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            stack.extend_from_slice(self.child_indices(current));
        }
        false
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn graph_with(names: &[&str]) -> (SkillTreeGraph, Vec<NodeId>) {
        let mut graph = SkillTreeGraph::new(TreeId::from_key("test"), "Test");
        let ids = names
            .iter()
            .map(|name| {
                graph
                    .add_node(SkillNode::new(NodeId::from_key(name), *name))
                    .unwrap_or_else(|_| NodeId::from_key(name))
            })
            .collect();
        (graph, ids)
    }

    #[test]
    fn duplicate_node_rejected() {
        let (mut graph, ids) = graph_with(&["a"]);
        let again = SkillNode::new(ids[0], "a");
        assert_eq!(graph.add_node(again), Err(GraphError::DuplicateNode(ids[0])));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn reverse_edge_is_a_cycle_and_leaves_graph_unchanged() {
        let (mut graph, ids) = graph_with(&["x", "y"]);
        let (x, y) = (ids[0], ids[1]);

        assert!(graph.add_edge(x, y).is_ok());
        assert_eq!(
            graph.add_edge(y, x),
            Err(GraphError::CycleDetected { parent: y, child: x })
        );
        assert_eq!(graph.edges(), vec![(x, y)]);
        assert_eq!(graph.parents(x).ok(), Some(vec![]));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let (mut graph, ids) = graph_with(&["a"]);
        assert!(matches!(
            graph.add_edge(ids[0], ids[0]),
            Err(GraphError::CycleDetected { .. })
        ));
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn long_cycle_detected() {
        let (mut graph, ids) = graph_with(&["a", "b", "c", "d"]);
        assert!(graph.add_edge(ids[0], ids[1]).is_ok());
        assert!(graph.add_edge(ids[1], ids[2]).is_ok());
        assert!(graph.add_edge(ids[2], ids[3]).is_ok());
        assert_eq!(graph.would_create_cycle(ids[3], ids[0]), Ok(true));
        assert!(graph.add_edge(ids[3], ids[0]).is_err());
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn diamond_is_allowed() {
        let (mut graph, ids) = graph_with(&["top", "left", "right", "bottom"]);
        assert!(graph.add_edge(ids[0], ids[1]).is_ok());
        assert!(graph.add_edge(ids[0], ids[2]).is_ok());
        assert!(graph.add_edge(ids[1], ids[3]).is_ok());
        assert!(graph.add_edge(ids[2], ids[3]).is_ok());
        assert_eq!(graph.parents(ids[3]).ok(), Some(vec![ids[1], ids[2]]));
        assert_eq!(graph.roots(), vec![ids[0]]);
    }

    #[test]
    fn duplicate_edge_rejected() {
        let (mut graph, ids) = graph_with(&["a", "b"]);
        assert!(graph.add_edge(ids[0], ids[1]).is_ok());
        assert_eq!(
            graph.add_edge(ids[0], ids[1]),
            Err(GraphError::DuplicateEdge { parent: ids[0], child: ids[1] })
        );
    }

    #[test]
    fn children_preserve_insertion_order() {
        let (mut graph, ids) = graph_with(&["root", "c", "a", "b"]);
        for child in &ids[1..] {
            assert!(graph.add_edge(ids[0], *child).is_ok());
        }
        assert_eq!(graph.children(ids[0]).ok(), Some(ids[1..].to_vec()));
    }

    #[test]
    fn remove_edge_updates_both_directions() {
        let (mut graph, ids) = graph_with(&["a", "b"]);
        assert!(graph.add_edge(ids[0], ids[1]).is_ok());
        assert!(graph.remove_edge(ids[0], ids[1]).is_ok());
        assert_eq!(graph.parents(ids[1]).ok(), Some(vec![]));
        assert_eq!(graph.roots().len(), 2);
        assert!(matches!(
            graph.remove_edge(ids[0], ids[1]),
            Err(GraphError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn descendants_respect_depth() {
        let (mut graph, ids) = graph_with(&["a", "b", "c", "d"]);
        assert!(graph.add_edge(ids[0], ids[1]).is_ok());
        assert!(graph.add_edge(ids[1], ids[2]).is_ok());
        assert!(graph.add_edge(ids[2], ids[3]).is_ok());

        assert_eq!(graph.descendants(ids[0], Some(1)).ok(), Some(vec![ids[1]]));
        assert_eq!(
            graph.descendants(ids[0], None).ok(),
            Some(vec![ids[1], ids[2], ids[3]])
        );
        assert_eq!(graph.descendants(ids[0], Some(0)).ok(), Some(vec![]));
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let (mut graph, ids) = graph_with(&["leaf", "mid", "root"]);
        assert!(graph.add_edge(ids[2], ids[1]).is_ok());
        assert!(graph.add_edge(ids[1], ids[0]).is_ok());
        assert_eq!(graph.topological_order(), vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn find_by_name_and_unknown_ids() {
        let (graph, ids) = graph_with(&["Fireball"]);
        assert_eq!(graph.find_by_name("Fireball").map(|n| n.id), Some(ids[0]));
        assert!(graph.find_by_name("Frostbolt").is_none());

        let missing = NodeId::new();
        assert_eq!(graph.children(missing), Err(GraphError::NodeNotFound(missing)));
    }
}
