//! Incremental community detection for graphs under edge streams.
//!
//! Given a graph, find natural groupings where nodes within groups are
//! densely connected, and connections between groups are sparse. Then keep
//! that grouping current as edges arrive and disappear, without starting
//! over after every change.
//!
//! ## The Modularity Objective
//!
//! Every decision is driven by **modularity** Q, which compares the actual
//! weight within communities to the expected weight in a random graph with
//! the same degree sequence:
//!
//! ```text
//! Q = (1/2m) × Σ[A_ij - γ(k_i × k_j)/(2m)] × δ(c_i, c_j)
//! ```
//!
//! Where:
//! - m = total edge weight
//! - A_ij = edge weight between i and j
//! - k_i = weighted degree of node i
//! - γ = resolution parameter
//! - δ(c_i, c_j) = 1 if i and j are in same community
//!
//! ## Two Graphs
//!
//! The engine keeps the **fine** graph (real nodes and edges, each node
//! labeled with its community) and the **coarse** graph (one node per
//! community, edge weights summed between communities, internal weight on a
//! self-loop). Optimization runs on the coarse graph, so one move there
//! relocates a whole community.
//!
//! ## Pipeline
//!
//! 1. [`LocalMoving`]: greedily move nodes to the neighboring community with
//!    the largest modularity gain until no move beats ε.
//! 2. [`partition_to_graph`]: contract communities into the coarse graph.
//! 3. [`repair`]: apply one [`EdgeEvent`], disband the two touched
//!    communities into singletons, and patch the coarse graph in place.
//! 4. [`DynamicLouvain`]: alternate the above until modularity stops
//!    improving and the stream is drained.
//!
//! A disbanded region is small, so the next round only has to re-decide a
//! handful of nodes while the rest of the partition stays contracted.
//!
//! ## Usage
//!
//! ```rust
//! use petgraph::graph::UnGraph;
//! use ripple::community::{CommunityDetection, Louvain};
//!
//! // Build a graph
//! let mut graph = UnGraph::<(), ()>::new_undirected();
//! let a = graph.add_node(());
//! let b = graph.add_node(());
//! let c = graph.add_node(());
//! graph.add_edge(a, b, ());
//! graph.add_edge(b, c, ());
//!
//! // Detect communities
//! let communities = Louvain::new().detect(&graph).unwrap();
//! // communities[i] = community ID for node i
//! assert_eq!(communities.len(), 3);
//! ```
//!
//! ## References
//!
//! - Blondel et al. (2008). "Fast unfolding of communities in large networks."
//! - Newman & Girvan (2004). "Finding and evaluating community structure in networks."

mod aggregate;
mod dynamic;
mod local_moving;
#[cfg(feature = "petgraph")]
mod louvain;
mod modularity;
mod repair;
mod traits;

pub use aggregate::partition_to_graph;
pub use dynamic::{DynamicLouvain, EngineConfig, Phase, RunSummary};
pub use local_moving::{LocalMoving, Move};
#[cfg(feature = "petgraph")]
pub use louvain::Louvain;
pub use modularity::{CommunityTotals, Modularity};
pub use repair::{repair, EdgeEvent, EdgeStream, RepairReport};
#[cfg(feature = "petgraph")]
pub use traits::CommunityDetection;
pub use traits::PermutationSource;
