//! Graph representation and construction module

pub mod builder;
pub mod compressed;
pub mod edges;
pub mod keyword;
pub mod knn;

pub use builder::GraphBuilder;
pub use compressed::CompressedGraph;
pub use keyword::{BuildStats, Edge, KeywordGraph, Node};
