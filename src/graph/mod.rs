//! Weighted undirected graph store addressed by integer ids.
//!
//! Both graphs the engine works with live here: the **fine** graph (one node
//! per original vertex, authoritative) and the **coarse** graph (one node per
//! community, rebuilt every round). Each is an arena: a `Vec<Node>` plus an
//! id → position index. Nodes refer to their neighbors by id only, so
//! dropping or rebuilding one graph can never leave the other dangling.
//!
//! ## Storage Conventions
//!
//! An undirected edge `{u, v}` of weight `w` is stored twice, as the entries
//! `u → v` and `v → u`. A self-loop on `u` is stored once, as `u → u`
//! carrying `2w`, because both half-steps land on the same entry:
//!
//! ```text
//! degree(u)      = Σ entries of u        (a self-loop counts twice)
//! total_weight() = Σ all entries / 2     (a self-loop counts once)
//! ```
//!
//! This is exactly what aggregation produces: an intra-community edge adds
//! `w` from each endpoint to its community's self-loop entry.
//!
//! ## Example
//!
//! ```rust
//! use ripple::graph::WeightedGraph;
//!
//! let mut g = WeightedGraph::with_nodes(3);
//! g.add_edge(0, 1, 1.0).unwrap();
//! g.add_edge(0, 1, 2.0).unwrap(); // accumulates, no parallel entry
//! g.add_edge(1, 2, 1.0).unwrap();
//!
//! assert_eq!(g.edge_weight(1, 0).unwrap(), 3.0);
//! assert_eq!(g.total_weight(), 4.0);
//! ```

mod community_index;
#[cfg(feature = "petgraph")]
mod convert;

pub use community_index::{CommunityIndex, Membership};

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Stable node identifier.
pub type NodeId = usize;

/// Community identifier. A singleton label equals the node's own id.
pub type Label = usize;

/// Relative tolerance when comparing the two halves of an undirected edge.
const MIRROR_TOLERANCE: f64 = 1e-9;

/// A node: id, community label, and ordered `(neighbor, weight)` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) label: Label,
    pub(crate) edges: Vec<(NodeId, f64)>,
}

impl Node {
    fn new(id: NodeId, label: Label) -> Self {
        Self {
            id,
            label,
            edges: Vec::new(),
        }
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current community label.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Outgoing entries in insertion order.
    pub fn edges(&self) -> &[(NodeId, f64)] {
        &self.edges
    }

    /// Weighted degree (sum of incident entries).
    pub fn degree(&self) -> f64 {
        self.edges.iter().map(|&(_, w)| w).sum()
    }

    fn entry(&self, target: NodeId) -> Option<usize> {
        self.edges.iter().position(|&(t, _)| t == target)
    }
}

/// Undirected weighted graph with O(1) id lookup.
#[derive(Debug, Default)]
pub struct WeightedGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl WeightedGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with nodes `0..n`, each in its own community.
    pub fn with_nodes(n: usize) -> Self {
        Self {
            nodes: (0..n).map(|id| Node::new(id, id)).collect(),
            index: (0..n).map(|id| (id, id)).collect(),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes in storage order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node ids in storage order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    fn position(&self, id: NodeId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(Error::NodeNotFound { id })
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        let pos = self.position(id)?;
        Ok(&self.nodes[pos])
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let pos = self.position(id)?;
        Ok(&mut self.nodes[pos])
    }

    /// Community label of `id`.
    pub fn label(&self, id: NodeId) -> Result<Label> {
        self.node(id).map(|n| n.label)
    }

    /// Label of `to`, reached through an entry of `from`.
    ///
    /// A miss means an entry outlived its target, which the mutation methods
    /// rule out, so it surfaces as `Inconsistent` rather than `NodeNotFound`.
    pub(crate) fn neighbor_label(&self, from: NodeId, to: NodeId) -> Result<Label> {
        self.label(to)
            .map_err(|_| Error::Inconsistent(format!("node {from} points at missing {to}")))
    }

    /// Move `id` into community `label`.
    pub fn set_label(&mut self, id: NodeId, label: Label) -> Result<()> {
        self.node_mut(id)?.label = label;
        Ok(())
    }

    /// Relabel every node with `f(node)`.
    pub(crate) fn relabel_with(&mut self, mut f: impl FnMut(&Node) -> Label) {
        for node in &mut self.nodes {
            node.label = f(node);
        }
    }

    /// Weighted degree of `id`.
    pub fn degree(&self, id: NodeId) -> Result<f64> {
        self.node(id).map(Node::degree)
    }

    /// Append a node with the given label.
    pub fn add_node(&mut self, id: NodeId, label: Label) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(Error::InvalidParameter {
                name: "id",
                message: "node id already present",
            });
        }
        let _ = self.index.insert(id, self.nodes.len());
        self.nodes.push(Node::new(id, label));
        Ok(())
    }

    /// Remove a node and every edge touching it.
    ///
    /// Positions after the removed node shift down by one, so the index is
    /// rewritten from there on: O(n), acceptable because node churn is rare
    /// next to edge churn.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node> {
        let pos = self.position(id)?;

        let neighbors: Vec<NodeId> = self.nodes[pos]
            .edges
            .iter()
            .map(|&(t, _)| t)
            .filter(|&t| t != id)
            .collect();
        for t in neighbors {
            let _ = self.remove_arc(t, id)?;
        }

        let node = self.nodes.remove(pos);
        let _ = self.index.remove(&id);
        for (i, n) in self.nodes.iter().enumerate().skip(pos) {
            let _ = self.index.insert(n.id, i);
        }
        Ok(node)
    }

    /// Accumulate `weight` onto the undirected edge `{u, v}`.
    ///
    /// A zero weight is a no-op. Both endpoints are resolved before either
    /// half-step is written.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, weight: f64) -> Result<()> {
        check_weight(weight)?;
        let _ = self.position(u)?;
        let _ = self.position(v)?;
        if weight == 0.0 {
            return Ok(());
        }
        self.add_arc(u, v, weight)?;
        self.add_arc(v, u, weight)
    }

    /// Accumulate `weight` onto the single directed entry `u → v`.
    pub(crate) fn add_arc(&mut self, u: NodeId, v: NodeId, weight: f64) -> Result<()> {
        if weight == 0.0 {
            return Ok(());
        }
        let node = self.node_mut(u)?;
        match node.entry(v) {
            Some(i) => node.edges[i].1 += weight,
            None => node.edges.push((v, weight)),
        }
        Ok(())
    }

    /// Delete the undirected edge `{u, v}`.
    ///
    /// Returns the removed weight, or `None` if the edge did not exist.
    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Result<Option<f64>> {
        let _ = self.position(v)?;
        let removed = self.remove_arc(u, v)?;
        if u != v {
            let _ = self.remove_arc(v, u)?;
        }
        // A self-loop entry carries twice the undirected weight.
        Ok(if u == v { removed.map(|w| w / 2.0) } else { removed })
    }

    fn remove_arc(&mut self, u: NodeId, v: NodeId) -> Result<Option<f64>> {
        let node = self.node_mut(u)?;
        Ok(node.entry(v).map(|i| node.edges.remove(i).1))
    }

    /// Weight stored on the entry `u → v` (0 when absent).
    pub fn edge_weight(&self, u: NodeId, v: NodeId) -> Result<f64> {
        let _ = self.position(v)?;
        let node = self.node(u)?;
        Ok(node.entry(v).map_or(0.0, |i| node.edges[i].1))
    }

    /// Total undirected edge weight `m`.
    pub fn total_weight(&self) -> f64 {
        self.nodes.iter().map(Node::degree).sum::<f64>() / 2.0
    }

    /// Deep clone.
    ///
    /// The index and every adjacency list are rebuilt from the node list
    /// rather than copied, so the snapshot shares nothing with `self`.
    pub fn snapshot(&self) -> Self {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (pos, node) in self.nodes.iter().enumerate() {
            let mut copy = Node::new(node.id, node.label);
            copy.edges.extend(node.edges.iter().copied());
            let _ = index.insert(node.id, pos);
            nodes.push(copy);
        }
        Self { nodes, index }
    }

    /// Subgraph on `ids`, keeping labels and the edges with both ends inside.
    pub fn induced(&self, ids: impl IntoIterator<Item = NodeId>) -> Result<Self> {
        let mut keep: Vec<NodeId> = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            let _ = self.position(id)?;
            if seen.insert(id) {
                keep.push(id);
            }
        }

        let mut sub = Self::new();
        for &id in &keep {
            sub.add_node(id, self.label(id)?)?;
        }
        for &id in &keep {
            for &(t, w) in &self.node(id)?.edges {
                if seen.contains(&t) {
                    sub.add_arc(id, t, w)?;
                }
            }
        }
        Ok(sub)
    }

    /// Check that the index matches the node list and every edge has its mirror.
    pub fn validate(&self) -> Result<()> {
        if self.index.len() != self.nodes.len() {
            return Err(Error::Inconsistent(format!(
                "index holds {} ids for {} nodes",
                self.index.len(),
                self.nodes.len()
            )));
        }
        for (pos, node) in self.nodes.iter().enumerate() {
            if self.index.get(&node.id) != Some(&pos) {
                return Err(Error::Inconsistent(format!(
                    "node {} stored at {pos} but indexed elsewhere",
                    node.id
                )));
            }
            for &(t, w) in &node.edges {
                if t == node.id {
                    continue;
                }
                let other = self.node(t).map_err(|_| {
                    Error::Inconsistent(format!("node {} points at missing {t}", node.id))
                })?;
                match other.entry(node.id).map(|i| other.edges[i].1) {
                    Some(b) if (b - w).abs() <= MIRROR_TOLERANCE * w.abs().max(1.0) => {}
                    _ => {
                        return Err(Error::Inconsistent(format!(
                            "edge {} -> {t} ({w}) has no matching mirror",
                            node.id
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Node id → community label, one entry per node.
    pub fn labels(&self) -> HashMap<NodeId, Label> {
        self.nodes.iter().map(|n| (n.id, n.label)).collect()
    }

    /// Community label → member ids.
    pub fn communities(&self) -> HashMap<Label, HashSet<NodeId>> {
        let mut out: HashMap<Label, HashSet<NodeId>> = HashMap::new();
        for node in &self.nodes {
            let _ = out.entry(node.label).or_default().insert(node.id);
        }
        out
    }
}

impl Clone for WeightedGraph {
    fn clone(&self) -> Self {
        self.snapshot()
    }
}

fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidWeight { weight })
    }
}
