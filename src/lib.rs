//! # ripple
//!
//! Incremental modularity communities: a Louvain-style partition kept up to
//! date while edges are inserted and removed.
//!
//! The engine holds a fine graph (the real nodes) and a coarse graph (one
//! node per community). Each edge event disbands only the two communities it
//! touches; the next optimization round re-decides those nodes against an
//! otherwise contracted graph.
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use ripple::{DynamicLouvain, EdgeStream, PlantedPartition};
//!
//! let model = PlantedPartition::new(40, 4).with_probabilities(0.7, 0.02);
//! let (graph, truth) = model.graph().unwrap();
//! let inserts = model.events(&truth, 5).unwrap();
//!
//! let stream = EdgeStream::new(inserts, Vec::<(usize, usize)>::new());
//! let mut engine = DynamicLouvain::new(graph, 4, stream).unwrap();
//! let summary = engine.run(&mut StdRng::seed_from_u64(1)).unwrap();
//! assert_eq!(summary.pending, 0);
//! ```

pub mod community;
/// Error types used across `ripple`.
pub mod error;
pub mod generate;
pub mod graph;


pub use community::{
    partition_to_graph, repair, DynamicLouvain, EdgeEvent, EdgeStream, EngineConfig, LocalMoving,
    Modularity, Phase, RunSummary,
};
#[cfg(feature = "petgraph")]
pub use community::{CommunityDetection, Louvain};
pub use error::{Error, Result};
pub use generate::PlantedPartition;
pub use graph::{Label, NodeId, WeightedGraph};
