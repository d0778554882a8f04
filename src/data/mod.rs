//! Input formats: snapshots, Parquet tables, embeddings and raw records

pub mod embeddings;
pub mod parquet;
pub mod preprocessing;
pub mod snapshot;

pub use embeddings::{Embedder, EmbeddingStore};
pub use snapshot::{LinkRecord, NodeRecord, Snapshot};
