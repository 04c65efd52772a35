//! Local moving: greedy single-node relabeling.
//!
//! One pass visits every node once, in a fresh random order, and moves it to
//! the neighboring community with the largest modularity gain, provided the
//! gain clears a small threshold ε. Moves are committed on the spot, so a
//! node visited later in the pass already sees them.
//!
//! A single pass is rarely a fixed point; [`LocalMoving::to_fixed_point`]
//! repeats passes on the same graph until one of them moves nothing. Since
//! every committed move raises modularity by more than ε and modularity is
//! bounded, the loop terminates; `max_passes` is only a safety net.
//!
//! ```text
//! pass 1:  [0] [1] [2] [3] [4] [5]   →  [0 1 2] [3 4 5]
//! pass 2:  no candidate beats ε      →  fixed point
//! ```

use super::modularity::{CommunityTotals, Modularity};
use super::traits::PermutationSource;
use crate::error::Result;
use crate::graph::{Label, NodeId, WeightedGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A committed relabeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Node that moved.
    pub node: NodeId,
    /// Label before the move.
    pub from: Label,
    /// Label after the move.
    pub to: Label,
}

/// Local-moving optimizer.
#[derive(Debug, Clone)]
pub struct LocalMoving {
    modularity: Modularity,
    /// Minimum gain for a move (ε).
    min_gain: f64,
    /// Maximum passes in [`LocalMoving::to_fixed_point`].
    max_passes: usize,
}

impl LocalMoving {
    /// Create an optimizer with default settings.
    pub fn new() -> Self {
        Self {
            modularity: Modularity::new(),
            min_gain: 1e-4,
            max_passes: 100,
        }
    }

    /// Set resolution parameter.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.modularity = self.modularity.with_resolution(resolution);
        self
    }

    /// Set the minimum gain a move must exceed.
    ///
    /// Keeps floating-point noise from bouncing a node between two
    /// near-equivalent communities forever.
    pub fn with_min_gain(mut self, min_gain: f64) -> Self {
        self.min_gain = min_gain;
        self
    }

    /// Set maximum passes per fixed-point run.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// The evaluator used for gains.
    pub fn modularity(&self) -> Modularity {
        self.modularity
    }

    /// One pass over all nodes. Returns the moves in commit order.
    pub fn one_level<P>(&self, graph: &mut WeightedGraph, rng: &mut P) -> Result<Vec<Move>>
    where
        P: PermutationSource + ?Sized,
    {
        let mut totals = CommunityTotals::from_graph(graph);
        let ids: Vec<NodeId> = graph.ids().collect();
        let order = rng.permutation(ids.len());

        let mut moves = Vec::new();
        let mut candidates: Vec<Label> = Vec::new();
        let mut seen: HashSet<Label> = HashSet::new();

        for pos in order {
            let id = ids[pos];
            let node = graph.node(id)?;
            let current = node.label();
            let degree = node.degree();

            // Neighbor labels in edge order; the first one seen wins ties.
            candidates.clear();
            seen.clear();
            for &(t, _) in node.edges() {
                let label = graph.neighbor_label(id, t)?;
                if label != current && seen.insert(label) {
                    candidates.push(label);
                }
            }

            let mut best = current;
            let mut best_gain = self.min_gain;
            for &candidate in &candidates {
                let gain = self
                    .modularity
                    .gain(graph, &totals, id, candidate, current)?;
                if gain > best_gain {
                    best_gain = gain;
                    best = candidate;
                }
            }

            if best != current {
                graph.set_label(id, best)?;
                totals.apply_move(degree, current, best);
                moves.push(Move {
                    node: id,
                    from: current,
                    to: best,
                });
            }
        }

        Ok(moves)
    }

    /// Repeat passes until one records no move.
    pub fn to_fixed_point<P>(&self, graph: &mut WeightedGraph, rng: &mut P) -> Result<Vec<Move>>
    where
        P: PermutationSource + ?Sized,
    {
        let mut all = Vec::new();
        for pass in 0..self.max_passes {
            let moves = self.one_level(graph, rng)?;
            if moves.is_empty() {
                return Ok(all);
            }
            tracing::trace!(pass, moves = moves.len(), "local moving pass");
            all.extend(moves);
        }
        tracing::warn!(
            max_passes = self.max_passes,
            "local moving stopped before reaching a fixed point"
        );
        Ok(all)
    }
}

impl Default for LocalMoving {
    fn default() -> Self {
        Self::new()
    }
}
