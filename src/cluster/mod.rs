//! Community detection and cluster analysis module

pub mod aggregate;
pub mod detection;
pub mod labeling;
pub mod metrics;

pub use aggregate::{ClusterAggregator, ClusterStats, ClusterSummary, TopKRequest};
pub use detection::CommunityDetector;
pub use labeling::{ClusterLabeler, ClusterLabels, FileLabeler};

use serde::{Deserialize, Serialize};

/// Assignment of every node to a community.
///
/// Community ids are dense, `0..community_count()`, numbered by descending
/// community size with ties going to the community holding the lower node
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    membership: Vec<u32>,
    community_count: usize,
}

impl Partition {
    /// Renumber arbitrary per-node labels into canonical community ids
    pub fn from_labels(labels: &[usize]) -> Self {
        let bound = labels.iter().copied().max().map_or(0, |m| m + 1);

        // (size, first node) per raw label
        let mut groups: Vec<Option<(usize, usize)>> = vec![None; bound];
        for (node, &label) in labels.iter().enumerate() {
            groups[label].get_or_insert((0, node)).0 += 1;
        }

        let mut order: Vec<(usize, usize, usize)> = groups
            .iter()
            .enumerate()
            .filter_map(|(label, group)| group.map(|(size, first)| (size, first, label)))
            .collect();
        order.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut renumbered = vec![0u32; bound];
        for (id, &(_, _, label)) in order.iter().enumerate() {
            renumbered[label] = id as u32;
        }

        Self {
            membership: labels.iter().map(|&label| renumbered[label]).collect(),
            community_count: order.len(),
        }
    }

    /// Every node in its own community
    pub fn singletons(node_count: usize) -> Self {
        Self::from_labels(&(0..node_count).collect::<Vec<_>>())
    }

    /// Number of nodes covered
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    pub fn community_count(&self) -> usize {
        self.community_count
    }

    pub fn community_of(&self, node: usize) -> u32 {
        self.membership[node]
    }

    /// Community id per node index
    pub fn membership(&self) -> &[u32] {
        &self.membership
    }

    /// Node indices of every community, ascending within each
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.community_count];
        for (node, &community) in self.membership.iter().enumerate() {
            members[community as usize].push(node);
        }
        members
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.community_count];
        for &community in &self.membership {
            sizes[community as usize] += 1;
        }
        sizes
    }
}

/// Structural statistics of one community in the fused graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Community id
    pub id: u32,

    /// Number of member keywords
    pub size: usize,

    /// Summed weight of edges with both endpoints inside
    pub internal_weight: f64,

    /// Summed weight of edges leaving the community
    pub boundary_weight: f64,

    /// Internal weight over the number of member pairs
    pub density: f64,

    /// Keywords with the highest weighted degree inside the community
    pub central_keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbers_by_size_then_first_member() {
        let partition = Partition::from_labels(&[7, 3, 7, 5, 3, 7]);
        assert_eq!(partition.membership(), &[0, 1, 0, 2, 1, 0]);
        assert_eq!(partition.community_count(), 3);
        assert_eq!(partition.sizes(), vec![3, 2, 1]);
        assert_eq!(partition.members()[1], vec![1, 4]);
    }

    #[test]
    fn equal_sizes_follow_node_order() {
        let partition = Partition::from_labels(&[2, 0, 1]);
        assert_eq!(partition.membership(), &[0, 1, 2]);
    }

    #[test]
    fn empty_partition() {
        let partition = Partition::singletons(0);
        assert!(partition.is_empty());
        assert_eq!(partition.community_count(), 0);
        assert!(partition.members().is_empty());
    }
}
