//! Per-community keyword statistics and top-K keyword lists

use crate::cluster::Partition;
use crate::config::ClusteringConfig;
use crate::error::{ClusterError, Result};
use crate::graph::KeywordGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Keyword frequencies aggregated over one community
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    /// Sum of member frequencies
    pub total: u64,

    /// Aggregated frequency per keyword
    pub keywords: BTreeMap<String, u64>,
}

/// Community id mapped to its most frequent keywords, most frequent first
pub type TopKRequest = BTreeMap<u32, Vec<String>>;

/// Everything the aggregator derives from one partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub stats: BTreeMap<u32, ClusterStats>,
    pub top_keywords: TopKRequest,
}

impl ClusterSummary {
    pub fn community_count(&self) -> usize {
        self.stats.len()
    }
}

/// Accumulator for one community, remembering first-seen keyword order
#[derive(Default)]
struct Tally {
    total: u64,
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl Tally {
    fn add(&mut self, keyword: String, frequency: u64) {
        self.total += frequency;
        match self.counts.get_mut(&keyword) {
            Some(count) => *count += frequency,
            None => {
                self.order.push(keyword.clone());
                self.counts.insert(keyword, frequency);
            }
        }
    }

    /// Keywords by descending frequency; the stable sort keeps first-seen order on ties
    fn top(&self, k: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, u64)> =
            self.order.iter().map(|kw| (kw, self.counts[kw])).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(k).map(|(kw, _)| kw.clone()).collect()
    }

    fn into_stats(self) -> ClusterStats {
        ClusterStats {
            total: self.total,
            keywords: self.counts.into_iter().collect(),
        }
    }
}

/// Turns a partition into keyword statistics
#[derive(Debug, Clone)]
pub struct ClusterAggregator {
    top_k: usize,
}

impl ClusterAggregator {
    pub fn new(top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(ClusterError::invalid_config("topK must be at least 1"));
        }
        Ok(Self { top_k })
    }

    pub fn from_config(config: &ClusteringConfig) -> Result<Self> {
        Self::new(config.top_k)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Aggregate member frequencies per community
    pub fn aggregate(&self, graph: &KeywordGraph, partition: &Partition) -> ClusterSummary {
        let mut tallies: Vec<Tally> = (0..partition.community_count())
            .map(|_| Tally::default())
            .collect();

        for (node, &community) in graph.nodes().iter().zip(partition.membership()) {
            tallies[community as usize].add(node.keyword(), node.frequency);
        }

        let mut summary = ClusterSummary::default();
        for (id, tally) in tallies.into_iter().enumerate() {
            let id = id as u32;
            summary.top_keywords.insert(id, tally.top(self.top_k));
            summary.stats.insert(id, tally.into_stats());
        }

        log::info!(
            "Aggregated keyword statistics for {} communities",
            summary.community_count()
        );
        summary
    }
}
