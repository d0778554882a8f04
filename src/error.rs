//! Error types for the keyword clusterer

use std::fmt;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Which edge source produced a failing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrigin {
    CoOccurrence,
    Semantic,
}

impl fmt::Display for EdgeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeOrigin::CoOccurrence => write!(f, "co-occurrence"),
            EdgeOrigin::Semantic => write!(f, "semantic"),
        }
    }
}

/// Errors raised by graph construction, detection and labeling
#[derive(Debug, Error)]
pub enum ClusterError {
    /// An edge names a node id that is not in the vocabulary
    #[error("{origin} edge references unknown node id {id}")]
    UnknownNode { id: u32, origin: EdgeOrigin },

    /// The vocabulary lists the same node id twice
    #[error("duplicate node id {0} in vocabulary")]
    DuplicateNode(u32),

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The labeler returned a different number of labels than clusters requested
    #[error("labeler returned {returned} labels for {expected} clusters")]
    LabelCountMismatch { expected: usize, returned: usize },

    /// The labeler returned a label for a cluster id that was never requested
    #[error("labeler returned a label for unrequested cluster {0}")]
    LabelKeyMismatch(u32),

    /// No embedding is known for a keyword
    #[error("no embedding for keyword '{0}'")]
    MissingEmbedding(String),

    /// Embedding vectors disagree on length
    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Input records are structurally unusable
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedding store encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] polars::prelude::PolarsError),
}

impl ClusterError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        ClusterError::InvalidConfig(message.into())
    }
}
