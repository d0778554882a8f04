//! Core library functions for the keyword clusterer
//!
//! Fuses keyword co-occurrence and semantic-similarity edges into one weighted
//! graph, partitions it into communities and summarizes each community's
//! keywords.

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod storage;

pub use cluster::{ClusterAggregator, ClusterLabeler, ClusterLabels, ClusterStats, CommunityDetector, Partition, TopKRequest};
pub use config::ClusteringConfig;
pub use error::{ClusterError, Result};
pub use graph::{GraphBuilder, KeywordGraph};
pub use pipeline::{ClusteringOutcome, Pipeline};
