//! Memory-efficient weighted graph representation

use std::mem;

/// Compressed sparse row adjacency of an undirected weighted graph.
///
/// Every undirected edge is stored in both endpoint lists. Lists are sorted by
/// neighbor index so traversal order is fixed for a given edge set.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] is the neighbor range of node i
    pub offsets: Vec<u32>,

    /// Concatenated neighbor lists
    pub neighbors: Vec<u32>,

    /// Weight of each entry in `neighbors`
    pub weights: Vec<f64>,
}

impl CompressedGraph {
    /// Create an empty graph with pre-allocated capacity
    pub fn with_capacity(node_count: usize, entry_count: usize) -> Self {
        Self {
            node_count,
            offsets: Vec::with_capacity(node_count + 1),
            neighbors: Vec::with_capacity(entry_count),
            weights: Vec::with_capacity(entry_count),
        }
    }

    /// Build from undirected edges `(u, v, w)` with `u != v`, each pair listed once
    pub fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut degrees = vec![0u32; node_count];
        for &(u, v, _) in edges {
            degrees[u] += 1;
            degrees[v] += 1;
        }

        let mut graph = Self::with_capacity(node_count, edges.len() * 2);
        graph.offsets.push(0);
        let mut offset = 0;
        for &degree in &degrees {
            offset += degree;
            graph.offsets.push(offset);
        }

        graph.neighbors.resize(offset as usize, 0);
        graph.weights.resize(offset as usize, 0.0);

        let mut cursor = vec![0usize; node_count];
        for &(u, v, w) in edges {
            for (from, to) in [(u, v), (v, u)] {
                let pos = graph.offsets[from] as usize + cursor[from];
                graph.neighbors[pos] = to as u32;
                graph.weights[pos] = w;
                cursor[from] += 1;
            }
        }

        graph.sort_adjacency_lists();
        graph
    }

    /// Neighbors of a node with the connecting edge weight
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        self.neighbors[start..end]
            .iter()
            .zip(&self.weights[start..end])
            .map(|(&n, &w)| (n as usize, w))
    }

    /// Sort every adjacency list by neighbor index, carrying weights along
    pub fn sort_adjacency_lists(&mut self) {
        for node in 0..self.node_count {
            let start = self.offsets[node] as usize;
            let end = self.offsets[node + 1] as usize;
            if end - start < 2 {
                continue;
            }
            let mut entries: Vec<(u32, f64)> = self.neighbors[start..end]
                .iter()
                .copied()
                .zip(self.weights[start..end].iter().copied())
                .collect();
            entries.sort_unstable_by_key(|&(n, _)| n);
            for (slot, (n, w)) in entries.into_iter().enumerate() {
                self.neighbors[start + slot] = n;
                self.weights[start + slot] = w;
            }
        }
    }

    /// Weight of the edge between two nodes, if any
    pub fn edge_weight(&self, src: usize, dst: usize) -> Option<f64> {
        let start = self.offsets[src] as usize;
        let end = self.offsets[src + 1] as usize;
        self.neighbors[start..end]
            .binary_search(&(dst as u32))
            .ok()
            .map(|pos| self.weights[start + pos])
    }

    pub fn has_edge(&self, src: usize, dst: usize) -> bool {
        self.edge_weight(src, dst).is_some()
    }

    /// Number of neighbors of a node
    pub fn degree(&self, node: usize) -> usize {
        (self.offsets[node + 1] - self.offsets[node]) as usize
    }

    /// Sum of incident edge weights of a node
    pub fn strength(&self, node: usize) -> f64 {
        self.neighbors(node).map(|(_, w)| w).sum()
    }

    /// Sum of all edge weights, each undirected edge counted once
    pub fn total_weight(&self) -> f64 {
        (0..self.node_count).map(|n| self.strength(n)).sum::<f64>() / 2.0
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        mem::size_of::<Self>()
            + self.offsets.capacity() * mem::size_of::<u32>()
            + self.neighbors.capacity() * mem::size_of::<u32>()
            + self.weights.capacity() * mem::size_of::<f64>()
    }
}
