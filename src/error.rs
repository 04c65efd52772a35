use crate::graph::NodeId;

/// Result alias for `ripple`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the graph store and the community engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// A lookup, edge event or removal referenced an id absent from the store.
    #[error("node {id} not found")]
    NodeNotFound {
        /// The missing id.
        id: NodeId,
    },

    /// An edge event whose endpoints coincide.
    #[error("self-loop edge event on node {id}")]
    SelfLoop {
        /// The repeated endpoint.
        id: NodeId,
    },

    /// An edge weight that is negative or not finite.
    #[error("invalid edge weight {weight}: must be finite and non-negative")]
    InvalidWeight {
        /// The rejected weight.
        weight: f64,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// The id index and the node list disagree, or an edge lost its mirror.
    ///
    /// Unreachable through the public mutation methods; treat as fatal.
    #[error("inconsistent graph state: {0}")]
    Inconsistent(String),
}

impl Error {
    /// Whether this error rejects a single stream event rather than the run.
    ///
    /// The driver drops such events and moves on to the next one.
    pub fn is_event_rejection(&self) -> bool {
        matches!(
            self,
            Error::NodeNotFound { .. } | Error::SelfLoop { .. } | Error::InvalidWeight { .. }
        )
    }
}
