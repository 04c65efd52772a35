//! Planted-partition graphs for tests and demos.
//!
//! A stochastic block model: `nodes` ids are shuffled into `blocks` equal
//! blocks; every pair inside a block is joined with probability `p_in`, every
//! pair across blocks with probability `p_out`. With `p_in` well above
//! `p_out` the blocks are the communities a modularity optimizer should
//! recover.
//!
//! ```rust
//! use ripple::generate::PlantedPartition;
//!
//! let model = PlantedPartition::new(40, 4).with_probabilities(0.6, 0.02).with_seed(7);
//! let (graph, truth) = model.graph().unwrap();
//! assert_eq!(graph.len(), 40);
//! assert_eq!(truth.len(), 40);
//!
//! let events = model.events(&truth, 10).unwrap();
//! assert_eq!(events.len(), 10);
//! ```

use crate::error::{Error, Result};
use crate::graph::{Label, NodeId, WeightedGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Stochastic block model with equal blocks.
#[derive(Debug, Clone)]
pub struct PlantedPartition {
    nodes: usize,
    blocks: usize,
    p_in: f64,
    p_out: f64,
    seed: u64,
}

impl PlantedPartition {
    /// `nodes` split into `blocks` blocks, `p_in = 0.5`, `p_out = 0.05`.
    pub fn new(nodes: usize, blocks: usize) -> Self {
        Self {
            nodes,
            blocks,
            p_in: 0.5,
            p_out: 0.05,
            seed: 42,
        }
    }

    /// Set intra- and inter-block edge probabilities.
    pub fn with_probabilities(mut self, p_in: f64, p_out: f64) -> Self {
        self.p_in = p_in;
        self.p_out = p_out;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.blocks == 0 {
            return Err(Error::InvalidParameter {
                name: "blocks",
                message: "must be at least 1",
            });
        }
        if self.nodes % self.blocks != 0 {
            return Err(Error::InvalidParameter {
                name: "nodes",
                message: "must be a multiple of blocks",
            });
        }
        if !(0.0..=1.0).contains(&self.p_in) {
            return Err(Error::InvalidParameter {
                name: "p_in",
                message: "must be a probability in [0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.p_out) {
            return Err(Error::InvalidParameter {
                name: "p_out",
                message: "must be a probability in [0, 1]",
            });
        }
        Ok(())
    }

    /// Sample a graph. Returns it with the planted block of every node id.
    ///
    /// Every node starts in its own community; the block assignment is only
    /// in the returned vector.
    pub fn graph(&self) -> Result<(WeightedGraph, Vec<Label>)> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut ids: Vec<NodeId> = (0..self.nodes).collect();
        ids.shuffle(&mut rng);
        let size = self.nodes / self.blocks;
        let mut truth = vec![0; self.nodes];
        for (pos, &id) in ids.iter().enumerate() {
            truth[id] = pos / size;
        }

        let mut graph = WeightedGraph::with_nodes(self.nodes);
        for u in 0..self.nodes {
            for v in (u + 1)..self.nodes {
                let p = if truth[u] == truth[v] { self.p_in } else { self.p_out };
                if rng.random_bool(p) {
                    graph.add_edge(u, v, 1.0)?;
                }
            }
        }

        tracing::debug!(
            nodes = self.nodes,
            blocks = self.blocks,
            weight = graph.total_weight(),
            "planted partition sampled"
        );
        Ok((graph, truth))
    }

    /// Draw `count` plausible edge insertions for a graph with blocks `truth`.
    ///
    /// A pair is intra-block with probability proportional to
    /// `p_in × (intra-block pairs)` against `p_out × (inter-block pairs)`,
    /// then drawn uniformly among pairs of that kind. Pairs may repeat and
    /// may already be edges. Empty when no pair exists.
    pub fn events(&self, truth: &[Label], count: usize) -> Result<Vec<(NodeId, NodeId)>> {
        self.validate()?;
        if truth.len() != self.nodes {
            return Err(Error::InvalidParameter {
                name: "truth",
                message: "must hold one block per node",
            });
        }

        let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); self.blocks];
        for (id, &block) in truth.iter().enumerate() {
            let slot = members.get_mut(block).ok_or(Error::InvalidParameter {
                name: "truth",
                message: "block out of range",
            })?;
            slot.push(id);
        }

        let size = self.nodes / self.blocks;
        if members.iter().any(|block| block.len() != size) {
            return Err(Error::InvalidParameter {
                name: "truth",
                message: "blocks must be equal-sized",
            });
        }
        let intra_pairs = (self.blocks * size * size.saturating_sub(1) / 2) as f64;
        let inter_pairs = (self.nodes * (self.nodes - size) / 2) as f64;
        let intra_weight = self.p_in * intra_pairs;
        let inter_weight = self.p_out * inter_pairs;
        if intra_weight + inter_weight == 0.0 {
            return Ok(Vec::new());
        }
        let threshold = intra_weight / (intra_weight + inter_weight);

        // Separate stream from the one that sampled the graph.
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let mut events = Vec::with_capacity(count);
        while events.len() < count {
            let block = rng.random_range(0..self.blocks);
            let pair = if rng.random_bool(threshold) {
                let i = rng.random_range(0..size);
                let j = (i + rng.random_range(1..size)) % size;
                (members[block][i], members[block][j])
            } else {
                let offset = rng.random_range(1..self.blocks);
                let other = (block + offset) % self.blocks;
                (
                    members[block][rng.random_range(0..size)],
                    members[other][rng.random_range(0..size)],
                )
            };
            events.push(pair);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_blocks_are_equal() {
        let (graph, truth) = PlantedPartition::new(30, 3).graph().unwrap();
        assert_eq!(graph.len(), 30);
        for block in 0..3 {
            assert_eq!(truth.iter().filter(|&&b| b == block).count(), 10);
        }
        graph.validate().unwrap();
        for id in 0..30 {
            assert_eq!(graph.label(id).unwrap(), id);
        }
    }

    #[test]
    fn test_extreme_probabilities() {
        let model = PlantedPartition::new(12, 3).with_probabilities(1.0, 0.0);
        let (graph, truth) = model.graph().unwrap();

        // Three disjoint 4-cliques.
        assert_eq!(graph.total_weight(), 18.0);
        for u in 0..12 {
            for v in 0..12 {
                let expected = if u != v && truth[u] == truth[v] { 1.0 } else { 0.0 };
                assert_eq!(graph.edge_weight(u, v).unwrap(), expected);
            }
        }

        let events = model.events(&truth, 50).unwrap();
        assert!(events.iter().all(|&(u, v)| u != v && truth[u] == truth[v]));
    }

    #[test]
    fn test_inter_block_events_only() {
        let model = PlantedPartition::new(12, 4).with_probabilities(0.0, 0.3);
        let (_, truth) = model.graph().unwrap();
        let events = model.events(&truth, 40).unwrap();
        assert_eq!(events.len(), 40);
        assert!(events.iter().all(|&(u, v)| truth[u] != truth[v]));
    }

    #[test]
    fn test_seed_reproducibility() {
        let model = PlantedPartition::new(20, 2).with_seed(5);
        let (a, ta) = model.graph().unwrap();
        let (b, tb) = model.graph().unwrap();
        assert_eq!(ta, tb);
        assert_eq!(a.total_weight(), b.total_weight());
        assert_eq!(model.events(&ta, 8).unwrap(), model.events(&tb, 8).unwrap());

        let other: HashSet<Vec<Label>> = (0..5)
            .map(|seed| PlantedPartition::new(20, 2).with_seed(seed).graph().unwrap().1)
            .collect();
        assert!(other.len() > 1);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(PlantedPartition::new(10, 0).graph().is_err());
        assert!(PlantedPartition::new(10, 3).graph().is_err());
        assert!(PlantedPartition::new(10, 2)
            .with_probabilities(1.5, 0.0)
            .graph()
            .is_err());
        assert!(PlantedPartition::new(10, 2)
            .with_probabilities(0.5, -0.1)
            .graph()
            .is_err());

        let model = PlantedPartition::new(4, 2);
        assert!(model.events(&[0, 1], 1).is_err());
        assert!(model.events(&[0, 1, 2, 0], 1).is_err());
    }

    #[test]
    fn test_unequal_blocks_are_rejected() {
        let model = PlantedPartition::new(4, 2).with_probabilities(0.5, 0.5);
        let err = model.events(&[0, 0, 0, 1], 50).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidParameter {
                name: "truth",
                message: "blocks must be equal-sized",
            }
        );
        assert_eq!(model.events(&[0, 1, 1, 0], 50).unwrap().len(), 50);
    }

    #[test]
    fn test_no_pairs_no_events() {
        let model = PlantedPartition::new(3, 3).with_probabilities(1.0, 0.0);
        let (_, truth) = model.graph().unwrap();
        assert!(model.events(&truth, 5).unwrap().is_empty());
    }
}
