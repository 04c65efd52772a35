//! Aggregation: contract each community into a single coarse node.
//!
//! ```text
//! fine:   0─1─2 ─── 3─4─5          coarse:   (0)═══(3)
//!         └───┘     └───┘                    ⟲6    ⟲6
//! labels: 0 0 0     3 3 3          bridge entry 1 each way
//! ```
//!
//! Every fine entry `u → v` of weight `w` is added to the coarse entry
//! `label(u) → label(v)`. Intra-community entries pile up on the community's
//! self-loop, so total weight and modularity are preserved exactly: scoring
//! the coarse graph with every coarse node in its own community gives the
//! fine graph's modularity.
//!
//! The coarse graph is always built from scratch; it is derived state and is
//! never patched here (the repair unit patches it between rebuilds).

use crate::error::Result;
use crate::graph::{CommunityIndex, WeightedGraph};

/// Contract `fine` by label.
///
/// Coarse node ids and labels both equal the community label; coarse nodes
/// appear in order of first appearance of their label in `fine`.
pub fn partition_to_graph(fine: &WeightedGraph) -> Result<WeightedGraph> {
    let index = CommunityIndex::from_graph(fine);

    let mut coarse = WeightedGraph::new();
    for (label, _) in index.iter() {
        coarse.add_node(label, label)?;
    }

    for node in fine.nodes() {
        for &(t, w) in node.edges() {
            let target = fine.neighbor_label(node.id(), t)?;
            coarse.add_arc(node.label(), target, w)?;
        }
    }

    Ok(coarse)
}
