//! The fused keyword graph

use crate::graph::compressed::CompressedGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One keyword of the vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    pub label: String,
    pub frequency: u64,
}

impl Node {
    pub fn new(id: u32, label: impl Into<String>, frequency: u64) -> Self {
        Self {
            id,
            label: label.into(),
            frequency,
        }
    }

    /// Text used when aggregating keyword statistics
    pub fn keyword(&self) -> String {
        if self.label.is_empty() {
            self.id.to_string()
        } else {
            self.label.clone()
        }
    }
}

/// Undirected edge between vocabulary indices `u < v`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub u: usize,
    pub v: usize,
    pub weight: f64,
}

/// Counters collected while the graph was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Co-occurrence records that contributed weight
    pub co_occurrence_edges: usize,
    /// Semantic records that contributed weight
    pub semantic_edges: usize,
    /// Co-occurrence records under the similarity threshold
    pub below_threshold: usize,
    /// Records whose endpoints were the same node
    pub self_loops: usize,
    /// Semantic records with no meaningful weight
    pub negligible: usize,
}

/// Vocabulary plus deduplicated, weight-summed edges.
///
/// Built once per run by [`crate::graph::GraphBuilder`] and read-only afterwards.
#[derive(Debug, Clone)]
pub struct KeywordGraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) id_to_index: HashMap<u32, usize>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) adjacency: CompressedGraph,
    pub(crate) stats: BuildStats,
}

impl KeywordGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Edges sorted by `(u, v)`
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Vocabulary index of an external node id
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.id_to_index.get(&id).copied()
    }

    pub fn adjacency(&self) -> &CompressedGraph {
        &self.adjacency
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    pub fn build_stats(&self) -> &BuildStats {
        &self.stats
    }
}
