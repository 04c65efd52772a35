//! Grouping of nodes by label.

use super::{Label, NodeId, WeightedGraph};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Result of [`CommunityIndex::get_or_insert`].
///
/// A miss is an expected, frequent outcome (every new label is one), so it
/// is reported as a variant instead of an error.
#[derive(Debug)]
pub enum Membership<'a> {
    /// The label was already indexed.
    Existing(&'a mut Vec<NodeId>),
    /// The label was seen for the first time; its member list is empty.
    Created(&'a mut Vec<NodeId>),
}

impl<'a> Membership<'a> {
    /// Whether the lookup created the entry.
    pub fn is_created(&self) -> bool {
        matches!(self, Membership::Created(_))
    }

    /// The member list, whichever way it was obtained.
    pub fn into_members(self) -> &'a mut Vec<NodeId> {
        match self {
            Membership::Existing(m) | Membership::Created(m) => m,
        }
    }
}

/// Communities of a graph, in order of first appearance.
#[derive(Debug, Default, Clone)]
pub struct CommunityIndex {
    order: Vec<Label>,
    members: HashMap<Label, Vec<NodeId>>,
}

impl CommunityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Group the nodes of `graph` by label, walking storage order.
    pub fn from_graph(graph: &WeightedGraph) -> Self {
        let mut index = Self::new();
        for node in graph.nodes() {
            index.get_or_insert(node.label).into_members().push(node.id);
        }
        index
    }

    /// Member list for `label`, creating an empty one on a miss.
    pub fn get_or_insert(&mut self, label: Label) -> Membership<'_> {
        match self.members.entry(label) {
            Entry::Occupied(e) => Membership::Existing(e.into_mut()),
            Entry::Vacant(e) => {
                self.order.push(label);
                Membership::Created(e.insert(Vec::new()))
            }
        }
    }

    /// Members of `label`, if indexed.
    pub fn members(&self, label: Label) -> Option<&[NodeId]> {
        self.members.get(&label).map(Vec::as_slice)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no label has been indexed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(label, members)` pairs in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &[NodeId])> + '_ {
        self.order
            .iter()
            .map(move |&label| (label, self.members[&label].as_slice()))
    }
}
