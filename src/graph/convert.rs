//! Conversion from `petgraph` undirected graphs.

use super::WeightedGraph;
use crate::error::Result;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

impl WeightedGraph {
    /// Build a store from a petgraph graph, weighting each edge with `weight`.
    ///
    /// Node `i` of the result is petgraph's `NodeIndex::new(i)`, in its own
    /// community. Parallel edges accumulate.
    pub fn from_petgraph<N, E>(
        graph: &UnGraph<N, E>,
        mut weight: impl FnMut(&E) -> f64,
    ) -> Result<Self> {
        let mut g = Self::with_nodes(graph.node_count());
        for edge in graph.edge_references() {
            g.add_edge(
                edge.source().index(),
                edge.target().index(),
                weight(edge.weight()),
            )?;
        }
        Ok(g)
    }

    /// Build a store from a petgraph graph with unit edge weights.
    pub fn from_petgraph_unweighted<N, E>(graph: &UnGraph<N, E>) -> Result<Self> {
        Self::from_petgraph(graph, |_| 1.0)
    }
}
