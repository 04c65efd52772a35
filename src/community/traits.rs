//! Community detection traits.

use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(feature = "petgraph")]
use crate::error::Result;
#[cfg(feature = "petgraph")]
use petgraph::graph::UnGraph;

/// Trait for community detection algorithms.
#[cfg(feature = "petgraph")]
pub trait CommunityDetection {
    /// Detect communities in a graph.
    ///
    /// Returns a mapping from node index to community ID.
    fn detect<N, E>(&self, graph: &UnGraph<N, E>) -> Result<Vec<usize>>;

    /// Get the resolution parameter (if applicable).
    fn resolution(&self) -> f64 {
        1.0
    }
}

/// Source of node visiting orders for the local-moving optimizer.
///
/// Blanket-implemented for every [`Rng`], so a seeded `StdRng` makes a run
/// reproducible.
pub trait PermutationSource {
    /// A permutation of `0..n`.
    fn permutation(&mut self, n: usize) -> Vec<usize>;
}

impl<R: Rng + ?Sized> PermutationSource for R {
    fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(self);
        order
    }
}
