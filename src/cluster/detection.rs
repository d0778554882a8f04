//! Community detection by resolution-parameterized modularity optimization
//!
//! Louvain-style multi-level optimization of
//!
//! ```text
//! Q = Σ_ij [A_ij − γ · k_i · k_j / 2m] · δ(c_i, c_j)
//! ```
//!
//! where `k_i` is the weighted degree of node `i`, `m` the total edge weight
//! and `γ` the resolution. Each level runs local-move passes, then collapses
//! the communities into the nodes of a coarser graph. Levels are rebuilt from
//! flat arrays rather than mutated in place.
//!
//! The result is fully determined by the graph: nodes are visited in index
//! order, candidate communities in ascending id order, and a node only moves
//! when another community is strictly better than staying. Among equally good
//! candidates the lowest community id wins.

use crate::cluster::Partition;
use crate::config::ClusteringConfig;
use crate::error::{ClusterError, Result};
use crate::graph::{CompressedGraph, KeywordGraph};
use petgraph::unionfind::UnionFind;

/// Gains closer than this, relative to the total weight, are treated as equal
const GAIN_EPSILON: f64 = 1e-12;

/// One level of the coarsening hierarchy
struct Level {
    /// Edges between distinct nodes
    adjacency: CompressedGraph,

    /// Weight folded into each node by earlier aggregation
    self_loops: Vec<f64>,

    /// Weighted degree, self-loops counted twice
    strength: Vec<f64>,
}

impl Level {
    fn new(adjacency: CompressedGraph, self_loops: Vec<f64>) -> Self {
        let strength = (0..adjacency.node_count)
            .map(|node| adjacency.strength(node) + 2.0 * self_loops[node])
            .collect();
        Self {
            adjacency,
            self_loops,
            strength,
        }
    }

    fn node_count(&self) -> usize {
        self.adjacency.node_count
    }

    /// Collapse communities (dense ids `0..count`) into the nodes of a new level
    fn aggregate(&self, communities: &[usize], count: usize) -> Level {
        let mut self_loops = vec![0.0; count];
        let mut crossing: Vec<(usize, usize, f64)> = Vec::new();

        for node in 0..self.node_count() {
            let cu = communities[node];
            self_loops[cu] += self.self_loops[node];

            for (neighbor, weight) in self.adjacency.neighbors(node) {
                if neighbor <= node {
                    continue;
                }
                let cv = communities[neighbor];
                if cu == cv {
                    self_loops[cu] += weight;
                } else {
                    crossing.push((cu.min(cv), cu.max(cv), weight));
                }
            }
        }

        crossing.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(crossing.len());
        for (u, v, w) in crossing {
            match merged.last_mut() {
                Some(last) if last.0 == u && last.1 == v => last.2 += w,
                _ => merged.push((u, v, w)),
            }
        }

        Level::new(CompressedGraph::from_edges(count, &merged), self_loops)
    }
}

/// Dense renumbering in order of first appearance
fn compact(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping = vec![usize::MAX; labels.len()];
    let mut next = 0;
    let compacted = labels
        .iter()
        .map(|&label| {
            if mapping[label] == usize::MAX {
                mapping[label] = next;
                next += 1;
            }
            mapping[label]
        })
        .collect();
    (compacted, next)
}

/// Resolution-parameterized community detector
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    /// Resolution parameter (gamma)
    resolution: f64,

    /// Maximum aggregation levels
    max_levels: usize,

    /// Maximum local-move passes per level
    max_passes: usize,

    /// Split communities that are not internally connected
    split_disconnected: bool,
}

impl CommunityDetector {
    /// Create a detector; the resolution must be positive
    pub fn new(resolution: f64) -> Result<Self> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(ClusterError::invalid_config(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        Ok(Self {
            resolution,
            max_levels: 10,
            max_passes: 100,
            split_disconnected: true,
        })
    }

    pub fn from_config(config: &ClusteringConfig) -> Result<Self> {
        Ok(Self::new(config.resolution)?
            .with_max_levels(config.max_levels)
            .with_max_passes(config.max_passes)
            .with_split_disconnected(config.split_disconnected))
    }

    /// Set maximum aggregation levels
    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels.max(1);
        self
    }

    /// Set maximum local-move passes per level
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    pub fn with_split_disconnected(mut self, split: bool) -> Self {
        self.split_disconnected = split;
        self
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Partition the nodes of a fused keyword graph
    pub fn detect(&self, graph: &KeywordGraph) -> Partition {
        log::info!(
            "Detecting communities in {} nodes, {} edges (resolution {})",
            graph.node_count(),
            graph.edge_count(),
            self.resolution
        );
        let partition = self.detect_compressed(graph.adjacency());
        log::info!("Found {} communities", partition.community_count());
        partition
    }

    /// Partition the nodes of a compressed weighted graph
    pub fn detect_compressed(&self, graph: &CompressedGraph) -> Partition {
        let n = graph.node_count;
        if n == 0 {
            return Partition::from_labels(&[]);
        }

        let mut level = Level::new(graph.clone(), vec![0.0; n]);
        let mut assignment: Vec<usize> = (0..n).collect();

        for depth in 0..self.max_levels {
            let (communities, count) = self.local_moving(&level);
            if count == level.node_count() {
                log::debug!("Level {}: no merges, converged", depth);
                break;
            }

            for community in assignment.iter_mut() {
                *community = communities[*community];
            }
            log::debug!(
                "Level {}: {} nodes collapsed into {} communities",
                depth,
                level.node_count(),
                count
            );
            level = level.aggregate(&communities, count);
        }

        if self.split_disconnected {
            assignment = split_disconnected(graph, &assignment);
        }

        Partition::from_labels(&assignment)
    }

    /// Local-move phase on one level; returns dense community ids and their count
    fn local_moving(&self, level: &Level) -> (Vec<usize>, usize) {
        let n = level.node_count();
        let two_m: f64 = level.strength.iter().sum();
        if two_m <= 0.0 {
            return ((0..n).collect(), n);
        }

        let mut community: Vec<usize> = (0..n).collect();
        let mut total = level.strength.clone();

        // Scratch space reused across nodes
        let mut link_weight = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();

        for pass in 0..self.max_passes {
            let mut moves = 0;

            for node in 0..n {
                let current = community[node];
                let k_i = level.strength[node];

                for (neighbor, weight) in level.adjacency.neighbors(node) {
                    let c = community[neighbor];
                    if link_weight[c] == 0.0 {
                        touched.push(c);
                    }
                    link_weight[c] += weight;
                }

                total[current] -= k_i;
                // Gains are divided by 2m so the comparison does not depend on weight scale
                let gain = |c: usize| (link_weight[c] - self.resolution * total[c] * k_i / two_m) / two_m;

                let stay = gain(current);
                let mut best = current;
                let mut best_gain = stay;

                touched.sort_unstable();
                touched.dedup();
                for &candidate in &touched {
                    if candidate == current {
                        continue;
                    }
                    let g = gain(candidate);
                    if g > best_gain + GAIN_EPSILON {
                        best = candidate;
                        best_gain = g;
                    }
                }

                total[best] += k_i;
                if best != current {
                    community[node] = best;
                    moves += 1;
                }

                for &c in &touched {
                    link_weight[c] = 0.0;
                }
                touched.clear();
            }

            log::debug!("Pass {}: {} moves", pass, moves);
            if moves == 0 {
                break;
            }
        }

        compact(&community)
    }
}

/// Give each connected piece of a community its own label
fn split_disconnected(graph: &CompressedGraph, assignment: &[usize]) -> Vec<usize> {
    let mut components = UnionFind::<usize>::new(assignment.len());
    for node in 0..graph.node_count {
        for (neighbor, _) in graph.neighbors(node) {
            if neighbor > node && assignment[node] == assignment[neighbor] {
                components.union(node, neighbor);
            }
        }
    }
    components.into_labeling()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(resolution: f64) -> CommunityDetector {
        CommunityDetector::new(resolution).unwrap()
    }

    fn two_triangles() -> CompressedGraph {
        CompressedGraph::from_edges(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (2, 3, 0.2),
            ],
        )
    }

    #[test]
    fn rejects_non_positive_resolution() {
        for resolution in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                CommunityDetector::new(resolution),
                Err(ClusterError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn triangle_is_one_community() {
        let graph = CompressedGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
        let partition = detector(1.0).detect_compressed(&graph);
        assert_eq!(partition.membership(), &[0, 0, 0]);
    }

    #[test]
    fn separates_weakly_bridged_triangles() {
        let partition = detector(1.0).detect_compressed(&two_triangles());
        let m = partition.membership();
        assert_eq!(m[0], m[1]);
        assert_eq!(m[1], m[2]);
        assert_eq!(m[3], m[4]);
        assert_eq!(m[4], m[5]);
        assert_ne!(m[0], m[3]);
        assert_eq!(partition.community_count(), 2);
    }

    #[test]
    fn low_resolution_merges_everything() {
        let partition = detector(0.05).detect_compressed(&two_triangles());
        assert_eq!(partition.community_count(), 1);
    }

    #[test]
    fn empty_graph_gives_empty_partition() {
        let partition = detector(1.0).detect_compressed(&CompressedGraph::from_edges(0, &[]));
        assert!(partition.is_empty());
    }

    #[test]
    fn isolated_nodes_are_singletons() {
        let graph = CompressedGraph::from_edges(4, &[(1, 2, 3.0)]);
        let partition = detector(1.0).detect_compressed(&graph);
        assert_eq!(partition.community_count(), 3);
        assert_eq!(partition.community_of(1), partition.community_of(2));
        assert_ne!(partition.community_of(0), partition.community_of(3));
        assert_eq!(partition.community_of(1), 0);
    }

    #[test]
    fn single_node() {
        let partition = detector(1.0).detect_compressed(&CompressedGraph::from_edges(1, &[]));
        assert_eq!(partition.membership(), &[0]);
    }

    #[test]
    fn repeated_runs_agree() {
        let graph = two_triangles();
        let first = detector(0.8).detect_compressed(&graph);
        for _ in 0..5 {
            assert_eq!(detector(0.8).detect_compressed(&graph), first);
        }
    }

    #[test]
    fn weight_scale_does_not_change_partition() {
        let edges = [
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (3, 5, 1.0),
            (2, 3, 0.2),
        ];
        let reference = detector(1.0).detect_compressed(&CompressedGraph::from_edges(6, &edges));

        for scale in [1e-6, 1e-13, 1e6] {
            let scaled: Vec<_> = edges.iter().map(|&(u, v, w)| (u, v, w * scale)).collect();
            let partition = detector(1.0).detect_compressed(&CompressedGraph::from_edges(6, &scaled));
            assert_eq!(partition, reference, "scale {scale}");
        }
    }

    #[test]
    fn tiny_single_edge_still_merges() {
        let graph = CompressedGraph::from_edges(3, &[(0, 1, 8.59e-13)]);
        let partition = detector(0.6).detect_compressed(&graph);
        assert_eq!(partition.membership(), &[0, 0, 1]);
    }

    fn star() -> Level {
        // Node 0 linked to 1 and 2 with equal weight, node 3 isolated
        Level::new(
            CompressedGraph::from_edges(4, &[(0, 1, 1.0), (0, 2, 1.0)]),
            vec![0.0; 4],
        )
    }

    #[test]
    fn equal_gains_go_to_lowest_community_id() {
        // Joining 1 or 2 gains the same for node 0; 1 wins. Node 2 gains
        // nothing from joining {0, 1} at this resolution, and on the second
        // pass community 2 only equals staying, so node 0 does not move.
        let (communities, count) = detector(1.5).local_moving(&star());
        assert_eq!(communities, vec![0, 0, 1, 2]);
        assert_eq!(count, 3);

        let partition = detector(1.5).detect_compressed(&star().adjacency);
        assert_eq!(partition.membership(), &[0, 0, 1, 2]);
    }

    #[test]
    fn star_collapses_at_unit_resolution() {
        let partition = detector(1.0).detect_compressed(&star().adjacency);
        assert_eq!(partition.membership(), &[0, 0, 0, 1]);
    }

    #[test]
    fn aggregation_keeps_total_weight() {
        let graph = two_triangles();
        let level = Level::new(graph.clone(), vec![0.0; 6]);
        let merged = level.aggregate(&[0, 0, 0, 1, 1, 1], 2);

        assert_eq!(merged.self_loops, vec![3.0, 3.0]);
        assert_eq!(merged.adjacency.edge_weight(0, 1), Some(0.2));
        let before: f64 = level.strength.iter().sum();
        let after: f64 = merged.strength.iter().sum();
        assert!((before - after).abs() < 1e-12);
    }

    #[test]
    fn splits_disconnected_communities() {
        let graph = CompressedGraph::from_edges(4, &[(0, 1, 1.0), (2, 3, 1.0)]);
        let labels = split_disconnected(&graph, &[0, 0, 0, 0]);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }
}
