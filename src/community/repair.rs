//! Edge-stream repair: absorb one edge mutation into the fine and coarse graphs.
//!
//! A single edge can shift the balance of a whole community, so repair is
//! deliberately coarse-grained:
//!
//! 1. **Region**: `src`, `dst`, and every fine node sharing the *current*
//!    label of either endpoint. Both communities are exploded.
//! 2. **Mutate** the fine graph.
//! 3. **Disband**: each region node becomes a singleton (label = own id).
//! 4. **Resynchronize** the coarse graph: drop the (one or two) stale coarse
//!    nodes, add one singleton coarse node per region node, and rebuild the
//!    coarse entries touching the region from the region's fine entries.
//!
//! ```text
//! before:  [0 1 2] ── [3 4 5] ── [6 7]      coarse: (0) ─ (3) ─ (6)
//! remove (2,3)
//! after:   0 1 2      3 4 5  ── [6 7]       coarse: (0)(1)(2)(3)(4)(5) ─ (6)
//! ```
//!
//! Step 4 relies on every label in use being the id of one of its members
//! (the driver re-anchors labels after each optimization round): that is
//! what keeps the new singleton ids from clashing with surviving coarse nodes.
//!
//! Events are validated before anything is touched. A self-loop, a missing
//! endpoint or a bad weight rejects the event and leaves both graphs as they
//! were; anything failing after that point means the two graphs had drifted
//! apart and is reported as [`Error::Inconsistent`].

use crate::error::{Error, Result};
use crate::graph::{Label, NodeId, WeightedGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// One edge mutation from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeEvent {
    /// Add `weight` to the undirected edge `{src, dst}`.
    Insert {
        /// First endpoint.
        src: NodeId,
        /// Second endpoint.
        dst: NodeId,
        /// Weight to accumulate.
        weight: f64,
    },
    /// Delete the undirected edge `{src, dst}`.
    Remove {
        /// First endpoint.
        src: NodeId,
        /// Second endpoint.
        dst: NodeId,
    },
}

impl EdgeEvent {
    /// Unit-weight insertion.
    pub fn insert(src: NodeId, dst: NodeId) -> Self {
        EdgeEvent::Insert {
            src,
            dst,
            weight: 1.0,
        }
    }

    /// Weighted insertion.
    pub fn insert_weighted(src: NodeId, dst: NodeId, weight: f64) -> Self {
        EdgeEvent::Insert { src, dst, weight }
    }

    /// Removal.
    pub fn remove(src: NodeId, dst: NodeId) -> Self {
        EdgeEvent::Remove { src, dst }
    }

    /// `(src, dst)`.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        match *self {
            EdgeEvent::Insert { src, dst, .. } | EdgeEvent::Remove { src, dst } => (src, dst),
        }
    }
}

/// Pending edge events: insertions are drained before removals, FIFO within each.
#[derive(Debug, Clone, Default)]
pub struct EdgeStream {
    insertions: VecDeque<EdgeEvent>,
    removals: VecDeque<EdgeEvent>,
}

impl EdgeStream {
    /// Stream of unit-weight insertions followed by removals.
    pub fn new(
        insertions: impl IntoIterator<Item = (NodeId, NodeId)>,
        removals: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Self {
        Self {
            insertions: insertions
                .into_iter()
                .map(|(s, d)| EdgeEvent::insert(s, d))
                .collect(),
            removals: removals
                .into_iter()
                .map(|(s, d)| EdgeEvent::remove(s, d))
                .collect(),
        }
    }

    /// Empty stream.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Queue an event behind the others of its kind.
    pub fn push(&mut self, event: EdgeEvent) {
        match event {
            EdgeEvent::Insert { .. } => self.insertions.push_back(event),
            EdgeEvent::Remove { .. } => self.removals.push_back(event),
        }
    }

    /// Next event: the oldest insertion, else the oldest removal.
    pub fn pop(&mut self) -> Option<EdgeEvent> {
        self.insertions
            .pop_front()
            .or_else(|| self.removals.pop_front())
    }

    /// Number of events not yet consumed.
    pub fn pending(&self) -> usize {
        self.insertions.len() + self.removals.len()
    }

    /// Whether every event has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}

impl FromIterator<EdgeEvent> for EdgeStream {
    fn from_iter<I: IntoIterator<Item = EdgeEvent>>(iter: I) -> Self {
        let mut stream = Self::empty();
        for event in iter {
            stream.push(event);
        }
        stream
    }
}

/// What a repair touched.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairReport {
    /// The applied event.
    pub event: EdgeEvent,
    /// Fine nodes reset to singletons: `src`, `dst`, then the rest of both
    /// communities in storage order.
    pub region: Vec<NodeId>,
    /// Pre-mutation labels of `src` and `dst`; their coarse nodes were removed.
    pub stale_labels: (Label, Label),
}

/// Apply `event` to `fine`, disband the affected region and patch `coarse`.
///
/// `coarse` must be the aggregation of `fine` as it stood before the event.
pub fn repair(
    fine: &mut WeightedGraph,
    coarse: &mut WeightedGraph,
    event: &EdgeEvent,
) -> Result<RepairReport> {
    let (src, dst) = event.endpoints();
    if src == dst {
        return Err(Error::SelfLoop { id: src });
    }
    let src_label = fine.label(src)?;
    let dst_label = fine.label(dst)?;
    if let EdgeEvent::Insert { weight, .. } = *event {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(Error::InvalidWeight { weight });
        }
    }

    let (region, members) = affected_region(fine, (src, dst), (src_label, dst_label));

    match *event {
        EdgeEvent::Insert { weight, .. } => fine.add_edge(src, dst, weight).map_err(drifted)?,
        EdgeEvent::Remove { .. } => {
            if fine.remove_edge(src, dst).map_err(drifted)?.is_none() {
                tracing::debug!(src, dst, "removed edge was not present");
            }
        }
    }

    for &id in &region {
        fine.set_label(id, id).map_err(drifted)?;
    }

    resync_coarse(fine, coarse, (src_label, dst_label), &region, &members)?;

    Ok(RepairReport {
        event: *event,
        region,
        stale_labels: (src_label, dst_label),
    })
}

fn affected_region(
    fine: &WeightedGraph,
    (src, dst): (NodeId, NodeId),
    (src_label, dst_label): (Label, Label),
) -> (Vec<NodeId>, HashSet<NodeId>) {
    let mut region = Vec::new();
    let mut members = HashSet::new();
    for id in [src, dst] {
        if members.insert(id) {
            region.push(id);
        }
    }
    for node in fine.nodes() {
        let label = node.label();
        if (label == src_label || label == dst_label) && members.insert(node.id()) {
            region.push(node.id());
        }
    }
    (region, members)
}

fn resync_coarse(
    fine: &WeightedGraph,
    coarse: &mut WeightedGraph,
    (src_label, dst_label): (Label, Label),
    region: &[NodeId],
    members: &HashSet<NodeId>,
) -> Result<()> {
    let _ = coarse.remove_node(src_label).map_err(drifted)?;
    if dst_label != src_label {
        let _ = coarse.remove_node(dst_label).map_err(drifted)?;
    }

    for &id in region {
        coarse.add_node(id, id).map_err(drifted)?;
    }

    for &id in region {
        for &(t, w) in fine.node(id).map_err(drifted)?.edges() {
            if members.contains(&t) {
                // The entry t → id is added when t's own list is walked.
                coarse.add_arc(id, t, w).map_err(drifted)?;
            } else {
                let community = fine.neighbor_label(id, t)?;
                coarse.add_arc(id, community, w).map_err(drifted)?;
                coarse.add_arc(community, id, w).map_err(drifted)?;
            }
        }
    }
    Ok(())
}

fn drifted(err: Error) -> Error {
    match err {
        Error::Inconsistent(_) => err,
        other => Error::Inconsistent(format!("fine and coarse graphs drifted apart: {other}")),
    }
}
