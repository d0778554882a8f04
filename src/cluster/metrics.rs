//! Partition quality and per-cluster structural metrics

use crate::cluster::{ClusterMetrics, Partition};
use crate::graph::{CompressedGraph, KeywordGraph};
use rayon::prelude::*;

/// Number of central keywords reported per cluster
const CENTRAL_KEYWORDS: usize = 5;

/// Resolution-weighted modularity of a partition.
///
/// Returns 0 for graphs without edges.
pub fn modularity(graph: &CompressedGraph, partition: &Partition, resolution: f64) -> f64 {
    let two_m = 2.0 * graph.total_weight();
    if two_m <= 0.0 {
        return 0.0;
    }

    let communities = partition.community_count();
    let mut internal = vec![0.0; communities];
    let mut total = vec![0.0; communities];

    for node in 0..graph.node_count {
        let c = partition.community_of(node) as usize;
        total[c] += graph.strength(node);
        for (neighbor, weight) in graph.neighbors(node) {
            if partition.community_of(neighbor) as usize == c {
                internal[c] += weight;
            }
        }
    }

    internal
        .iter()
        .zip(&total)
        .map(|(&inside, &degree)| inside / two_m - resolution * (degree / two_m).powi(2))
        .sum()
}

/// Size, weight, density and central keywords for every community
pub fn cluster_metrics(graph: &KeywordGraph, partition: &Partition) -> Vec<ClusterMetrics> {
    log::info!("Calculating metrics for {} clusters", partition.community_count());

    let members = partition.members();
    members
        .par_iter()
        .enumerate()
        .map(|(id, nodes)| measure(graph, partition, id as u32, nodes))
        .collect()
}

fn measure(graph: &KeywordGraph, partition: &Partition, id: u32, nodes: &[usize]) -> ClusterMetrics {
    let adjacency = graph.adjacency();
    let mut internal_weight = 0.0;
    let mut boundary_weight = 0.0;
    let mut inner_strength: Vec<(usize, f64)> = Vec::with_capacity(nodes.len());

    for &node in nodes {
        let mut strength = 0.0;
        for (neighbor, weight) in adjacency.neighbors(node) {
            if partition.community_of(neighbor) == id {
                strength += weight;
                if neighbor > node {
                    internal_weight += weight;
                }
            } else {
                boundary_weight += weight;
            }
        }
        inner_strength.push((node, strength));
    }

    let size = nodes.len();
    let density = if size <= 1 {
        // Singletons count as fully dense
        1.0
    } else {
        internal_weight / (size * (size - 1) / 2) as f64
    };

    // Stable sort keeps vocabulary order among equal strengths
    inner_strength.sort_by(|a, b| b.1.total_cmp(&a.1));
    let central_keywords = inner_strength
        .iter()
        .take(CENTRAL_KEYWORDS)
        .map(|&(node, _)| graph.node(node).keyword())
        .collect();

    ClusterMetrics {
        id,
        size,
        internal_weight,
        boundary_weight,
        density,
        central_keywords,
    }
}
