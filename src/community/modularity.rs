//! Modularity of a labeled graph and the gain of single-node moves.
//!
//! With `2m` the sum of all stored entries (each undirected edge counted
//! from both ends), `k_u` the weighted degree of `u` and `Σ_c` the summed
//! degree of community `c`:
//!
//! ```text
//! Q = (1/2m) × Σ_{u,v : c_u = c_v} [A_uv − γ × k_u × k_v / 2m]
//!   = (1/2m) × [ Σ_{entries u→v, c_u = c_v} w_uv − γ × Σ_c Σ_c² / 2m ]
//! ```
//!
//! The second form is what [`Modularity::score`] evaluates: one pass over
//! the entries plus one pass over the communities.
//!
//! Moving node `i` from community `a` to `b` changes `Q` by
//!
//! ```text
//! ΔQ = 2 (k_i,b − k_i,a) / 2m − 2γ × k_i × (Σ_b − (Σ_a − k_i)) / (2m)²
//! ```
//!
//! where `k_i,c` sums the entries from `i` to other nodes of `c`. Only the
//! entries of `i` and two community totals are read, which is what makes
//! trial moves cheap; [`Modularity::score`] is needed once per round.

use crate::error::Result;
use crate::graph::{Label, NodeId, WeightedGraph};
use std::collections::HashMap;

/// Modularity evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modularity {
    /// Resolution parameter (gamma).
    resolution: f64,
}

impl Modularity {
    /// Standard modularity (γ = 1).
    pub fn new() -> Self {
        Self { resolution: 1.0 }
    }

    /// Set resolution parameter.
    ///
    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Resolution parameter.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Modularity of the current labeling of `graph`.
    ///
    /// Zero when the graph carries no edge weight.
    pub fn score(&self, graph: &WeightedGraph) -> Result<f64> {
        let totals = CommunityTotals::from_graph(graph);
        let two_m = totals.two_m;
        if two_m == 0.0 {
            return Ok(0.0);
        }

        let mut inside = 0.0;
        for node in graph.nodes() {
            for &(t, w) in node.edges() {
                if graph.neighbor_label(node.id(), t)? == node.label() {
                    inside += w;
                }
            }
        }

        let expected: f64 = totals.totals.values().map(|s| s * s).sum::<f64>() / two_m;
        Ok((inside - self.resolution * expected) / two_m)
    }

    /// Gain in modularity from moving `node` out of `current` into `candidate`.
    ///
    /// `totals` must describe the labeling `graph` currently carries, with
    /// `node` still counted in `current`.
    pub fn gain(
        &self,
        graph: &WeightedGraph,
        totals: &CommunityTotals,
        node: NodeId,
        candidate: Label,
        current: Label,
    ) -> Result<f64> {
        let two_m = totals.two_m;
        if two_m == 0.0 || candidate == current {
            return Ok(0.0);
        }

        let n = graph.node(node)?;
        let ki = n.degree();
        let mut ki_candidate = 0.0;
        let mut ki_current = 0.0;
        for &(t, w) in n.edges() {
            if t == node {
                continue;
            }
            let label = graph.neighbor_label(node, t)?;
            if label == candidate {
                ki_candidate += w;
            } else if label == current {
                ki_current += w;
            }
        }

        let sigma_candidate = totals.total(candidate);
        let sigma_current = totals.total(current) - ki;

        Ok(2.0 * (ki_candidate - ki_current) / two_m
            - 2.0 * self.resolution * ki * (sigma_candidate - sigma_current) / (two_m * two_m))
    }
}

impl Default for Modularity {
    fn default() -> Self {
        Self::new()
    }
}

/// Summed degree per community, plus `2m`.
#[derive(Debug, Clone, Default)]
pub struct CommunityTotals {
    two_m: f64,
    totals: HashMap<Label, f64>,
}

impl CommunityTotals {
    /// Totals for the labeling `graph` currently carries.
    pub fn from_graph(graph: &WeightedGraph) -> Self {
        let mut totals: HashMap<Label, f64> = HashMap::new();
        let mut two_m = 0.0;
        for node in graph.nodes() {
            let k = node.degree();
            two_m += k;
            *totals.entry(node.label()).or_insert(0.0) += k;
        }
        Self { two_m, totals }
    }

    /// Sum of all entries (twice the total edge weight).
    pub fn two_m(&self) -> f64 {
        self.two_m
    }

    /// Summed degree of `label` (0 for an unknown label).
    pub fn total(&self, label: Label) -> f64 {
        self.totals.get(&label).copied().unwrap_or(0.0)
    }

    /// Record that a node of the given degree moved from `from` to `to`.
    pub fn apply_move(&mut self, degree: f64, from: Label, to: Label) {
        *self.totals.entry(from).or_insert(0.0) -= degree;
        *self.totals.entry(to).or_insert(0.0) += degree;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Two triangles {0,1,2} and {3,4,5} joined by the bridge (2,3).
    fn two_triangles() -> WeightedGraph {
        let mut g = WeightedGraph::with_nodes(6);
        for &(u, v) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            g.add_edge(u, v, 1.0).unwrap();
        }
        g
    }

    fn label_all(g: &mut WeightedGraph, labels: &[Label]) {
        for (id, &l) in labels.iter().enumerate() {
            g.set_label(id, l).unwrap();
        }
    }

    #[test]
    fn test_zero_weight_graph() {
        let g = WeightedGraph::with_nodes(5);
        assert_eq!(Modularity::new().score(&g).unwrap(), 0.0);
        assert_eq!(Modularity::new().score(&WeightedGraph::new()).unwrap(), 0.0);
    }

    #[test]
    fn test_two_triangles_split() {
        let mut g = two_triangles();
        label_all(&mut g, &[0, 0, 0, 3, 3, 3]);

        // 2 × (6/14 − (7/14)²)
        let q = Modularity::new().score(&g).unwrap();
        assert!((q - 5.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_community_is_zero() {
        let mut g = two_triangles();
        label_all(&mut g, &[0; 6]);
        assert!(Modularity::new().score(&g).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_singletons_are_negative() {
        let g = two_triangles();
        assert!(Modularity::new().score(&g).unwrap() < 0.0);
    }

    #[test]
    fn test_resolution_penalizes_merging() {
        let mut g = two_triangles();
        label_all(&mut g, &[0, 0, 0, 3, 3, 3]);
        let standard = Modularity::new().score(&g).unwrap();
        let strict = Modularity::new().with_resolution(2.0).score(&g).unwrap();
        assert!(strict < standard);
    }

    #[test]
    fn test_gain_on_empty_graph_is_zero() {
        let g = WeightedGraph::with_nodes(2);
        let totals = CommunityTotals::from_graph(&g);
        assert_eq!(Modularity::new().gain(&g, &totals, 0, 1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_gain_prefers_own_triangle() {
        let g = two_triangles();
        let totals = CommunityTotals::from_graph(&g);
        let m = Modularity::new();

        let inward = m.gain(&g, &totals, 2, 0, 2).unwrap();
        let across = m.gain(&g, &totals, 2, 3, 2).unwrap();
        assert!(inward > across);
        assert!(across > 0.0);
    }

    #[test]
    fn test_totals_track_moves() {
        let g = two_triangles();
        let mut totals = CommunityTotals::from_graph(&g);
        assert_eq!(totals.two_m(), 14.0);

        totals.apply_move(3.0, 2, 0);
        assert_eq!(totals.total(0), 5.0);
        assert_eq!(totals.total(2), 0.0);
        assert_eq!(totals.total(99), 0.0);
    }

    proptest! {
        #[test]
        fn gain_matches_score_difference(
            edges in proptest::collection::vec((0usize..8, 0usize..8, 1u8..4), 1..24),
            labels in proptest::collection::vec(0usize..3, 8),
            node in 0usize..8,
            candidate in 0usize..3,
        ) {
            let mut g = WeightedGraph::with_nodes(8);
            for (u, v, w) in edges {
                g.add_edge(u, v, f64::from(w)).unwrap();
            }
            label_all(&mut g, &labels);

            let m = Modularity::new();
            let current = labels[node];
            let before = m.score(&g).unwrap();
            let totals = CommunityTotals::from_graph(&g);
            let predicted = m.gain(&g, &totals, node, candidate, current).unwrap();

            g.set_label(node, candidate).unwrap();
            let after = m.score(&g).unwrap();

            prop_assert!((after - before - predicted).abs() < 1e-9);
        }
    }
}
