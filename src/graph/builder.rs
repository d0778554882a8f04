//! Graph construction: fuse co-occurrence and semantic edges into one graph

use crate::config::ClusteringConfig;
use crate::data::embeddings::EmbeddingStore;
use crate::data::snapshot::Snapshot;
use crate::error::{ClusterError, Result};
use crate::graph::compressed::CompressedGraph;
use crate::graph::edges::{Adapted, CoOccurrenceRecord, EdgeAdapter, EdgeContribution, SemanticRecord};
use crate::graph::knn;
use crate::graph::{BuildStats, Edge, KeywordGraph, Node};
use std::collections::{HashMap, HashSet};

/// Builder that accumulates edge contributions from any number of sources.
///
/// Contributions for one pair are summed, never overwritten. Each pair keeps
/// its individual contributions until [`GraphBuilder::build`], which sums them
/// in sorted order so the stored weight is bit-for-bit the same whatever
/// order the sources were added in.
pub struct GraphBuilder<'a> {
    config: &'a ClusteringConfig,

    /// Vocabulary in input order
    nodes: Vec<Node>,

    /// Mapping from external node ids to vocabulary indices
    id_to_index: HashMap<u32, usize>,

    /// Contributions per canonical pair
    contributions: HashMap<(usize, usize), Vec<f64>>,

    stats: BuildStats,
}

impl<'a> GraphBuilder<'a> {
    /// Start a graph over the given vocabulary
    pub fn new(nodes: Vec<Node>, config: &'a ClusteringConfig) -> Result<Self> {
        let mut id_to_index = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if id_to_index.insert(node.id, index).is_some() {
                return Err(ClusterError::DuplicateNode(node.id));
            }
        }

        Ok(Self {
            config,
            nodes,
            id_to_index,
            contributions: HashMap::new(),
            stats: BuildStats::default(),
        })
    }

    /// Start a graph over a snapshot's vocabulary and add its co-occurrence links
    pub fn from_snapshot(snapshot: &Snapshot, config: &'a ClusteringConfig) -> Result<Self> {
        let nodes = snapshot
            .nodes
            .iter()
            .map(|record| {
                if record.frequency == 0 {
                    log::warn!("Node {} has frequency 0, counting it as 1", record.id);
                }
                Node {
                    id: record.id,
                    label: record.label.clone(),
                    frequency: record.frequency.max(1),
                }
            })
            .collect();

        let mut builder = Self::new(nodes, config)?;
        builder.add_co_occurrence(snapshot.links.iter().map(CoOccurrenceRecord::from))?;
        Ok(builder)
    }

    fn accumulate(&mut self, contribution: EdgeContribution) {
        self.contributions
            .entry((contribution.u, contribution.v))
            .or_default()
            .push(contribution.weight);
    }

    /// Add co-occurrence records; returns how many contributed an edge
    pub fn add_co_occurrence<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = CoOccurrenceRecord>,
    {
        let mut accepted = 0;
        for record in records {
            let adapted = EdgeAdapter::new(&self.id_to_index, self.config).co_occurrence(&record)?;
            match adapted {
                Adapted::Edge(contribution) => {
                    self.accumulate(contribution);
                    accepted += 1;
                }
                Adapted::BelowThreshold => self.stats.below_threshold += 1,
                Adapted::SelfLoop => self.stats.self_loops += 1,
                Adapted::Negligible => {}
            }
        }

        self.stats.co_occurrence_edges += accepted;
        log::info!("Added {} co-occurrence edges", accepted);
        Ok(accepted)
    }

    /// Add semantic neighbor records; returns how many contributed an edge
    pub fn add_semantic<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = SemanticRecord>,
    {
        let mut accepted = 0;
        for record in records {
            let adapted = EdgeAdapter::new(&self.id_to_index, self.config).semantic(&record)?;
            match adapted {
                Adapted::Edge(contribution) => {
                    self.accumulate(contribution);
                    accepted += 1;
                }
                Adapted::SelfLoop => self.stats.self_loops += 1,
                Adapted::Negligible => self.stats.negligible += 1,
                Adapted::BelowThreshold => {}
            }
        }

        self.stats.semantic_edges += accepted;
        log::info!("Added {} semantic edges", accepted);
        Ok(accepted)
    }

    /// Vocabulary nodes whose id has no row in the store
    fn missing_embeddings(&self, store: &EmbeddingStore) -> usize {
        let embedded: HashSet<u32> = store.ids().iter().copied().collect();
        self.nodes.iter().filter(|node| !embedded.contains(&node.id)).count()
    }

    /// Run the k-NN search over the embeddings and add the resulting edges
    pub fn add_embeddings(&mut self, store: &EmbeddingStore) -> Result<usize> {
        let missing = self.missing_embeddings(store);
        if missing > 0 {
            log::warn!("{} vocabulary nodes have no embedding", missing);
        }
        let records = knn::nearest_neighbors(store, self.config.knn_neighbor_count)?;
        self.add_semantic(records)
    }

    /// Materialize one edge per pair with a nonzero summed weight
    pub fn build(self) -> KeywordGraph {
        let mut pairs: Vec<((usize, usize), Vec<f64>)> = self.contributions.into_iter().collect();
        pairs.sort_unstable_by_key(|&(key, _)| key);

        let mut edges = Vec::with_capacity(pairs.len());
        for ((u, v), mut parts) in pairs {
            parts.sort_unstable_by(f64::total_cmp);
            let weight: f64 = parts.iter().sum();
            if weight > 0.0 {
                edges.push(Edge { u, v, weight });
            }
        }

        let triples: Vec<(usize, usize, f64)> = edges.iter().map(|e| (e.u, e.v, e.weight)).collect();
        let adjacency = CompressedGraph::from_edges(self.nodes.len(), &triples);

        log::info!(
            "Built fused graph with {} nodes and {} edges",
            self.nodes.len(),
            edges.len()
        );

        KeywordGraph {
            nodes: self.nodes,
            id_to_index: self.id_to_index,
            edges,
            adjacency,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::snapshot::{LinkRecord, NodeRecord};

    fn vocabulary() -> Vec<Node> {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, label)| Node::new(i as u32, *label, 1))
            .collect()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let config = ClusteringConfig::default();
        let mut nodes = vocabulary();
        nodes.push(Node::new(1, "again", 1));
        assert!(matches!(
            GraphBuilder::new(nodes, &config),
            Err(ClusterError::DuplicateNode(1))
        ));
    }

    #[test]
    fn sums_contributions_from_both_sources() {
        let config = ClusteringConfig {
            co_weight_coefficient: 1.0,
            sem_weight_coefficient: 1.0,
            weight_power: 1.0,
            co_occurrence_threshold: 0.0,
            ..Default::default()
        };
        let mut builder = GraphBuilder::new(vocabulary(), &config).unwrap();

        builder
            .add_co_occurrence([CoOccurrenceRecord { source: 1, target: 0, similarity: 0.5, count: 0 }])
            .unwrap();
        builder
            .add_semantic([
                SemanticRecord { source: 0, target: 1, similarity: 0.25 },
                SemanticRecord { source: 1, target: 0, similarity: 0.25 },
            ])
            .unwrap();

        let graph = builder.build();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!((graph.edges()[0].u, graph.edges()[0].v), (0, 1));
        assert!((graph.edges()[0].weight - 1.0).abs() < 1e-12);
        assert_eq!(graph.build_stats().co_occurrence_edges, 1);
        assert_eq!(graph.build_stats().semantic_edges, 2);
    }

    #[test]
    fn isolated_nodes_stay_in_graph() {
        let config = ClusteringConfig::default();
        let graph = GraphBuilder::new(vocabulary(), &config).unwrap().build();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn snapshot_with_unknown_endpoint_fails() {
        let config = ClusteringConfig::default();
        let snapshot = Snapshot::new(
            vec![NodeRecord::new(0, "a", 1), NodeRecord::new(1, "b", 1)],
            vec![LinkRecord::new(0, 7, 0.9, 1)],
        );
        assert!(matches!(
            GraphBuilder::from_snapshot(&snapshot, &config),
            Err(ClusterError::UnknownNode { id: 7, .. })
        ));
    }

    #[test]
    fn zero_frequency_is_clamped() {
        let config = ClusteringConfig::default();
        let snapshot = Snapshot::new(vec![NodeRecord::new(4, "a", 0)], vec![]);
        let graph = GraphBuilder::from_snapshot(&snapshot, &config).unwrap().build();
        assert_eq!(graph.node(0).frequency, 1);
    }

    #[test]
    fn counts_nodes_without_embedding_by_id() {
        let config = ClusteringConfig::default();
        let builder = GraphBuilder::new(vocabulary(), &config).unwrap();

        // Three rows, but two share id 0, so node 2 is still uncovered
        let store = EmbeddingStore::from_rows(
            vec![0, 0, 1],
            vec!["a".into(), "a2".into(), "b".into()],
            vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]],
        )
        .unwrap();
        assert_eq!(builder.missing_embeddings(&store), 1);

        let duplicated = EmbeddingStore::from_rows(
            vec![0, 0, 0],
            vec!["a".into(), "a2".into(), "a3".into()],
            vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.8, 0.2]],
        )
        .unwrap();
        assert_eq!(builder.missing_embeddings(&duplicated), 2);
    }

    #[test]
    fn embeddings_with_unknown_ids_fail() {
        let config = ClusteringConfig::default();
        let store = EmbeddingStore::from_rows(
            vec![0, 42],
            vec!["a".into(), "zzz".into()],
            vec![vec![1.0, 0.0], vec![0.9, 0.1]],
        )
        .unwrap();

        let mut builder = GraphBuilder::new(vocabulary(), &config).unwrap();
        assert!(matches!(
            builder.add_embeddings(&store),
            Err(ClusterError::UnknownNode { id: 42, .. })
        ));
    }
}
