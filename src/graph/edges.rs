//! Edge source adapters: co-occurrence and semantic relations to weighted pairs

use crate::config::ClusteringConfig;
use crate::data::snapshot::LinkRecord;
use crate::error::{ClusterError, EdgeOrigin, Result};
use std::collections::HashMap;

/// Semantic contributions at or below this weight are not emitted
pub const SEMANTIC_EPSILON: f64 = 1e-12;

/// A raw co-occurrence relation between two keywords
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoOccurrenceRecord {
    pub source: u32,
    pub target: u32,
    pub similarity: f64,
    pub count: u32,
}

impl From<&LinkRecord> for CoOccurrenceRecord {
    fn from(link: &LinkRecord) -> Self {
        Self {
            source: link.source,
            target: link.target,
            similarity: link.similarity,
            count: link.count,
        }
    }
}

/// A nearest-neighbor relation found in embedding space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticRecord {
    pub source: u32,
    pub target: u32,
    pub similarity: f32,
}

/// Weight contribution for one unordered pair of vocabulary indices, `u < v`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeContribution {
    pub u: usize,
    pub v: usize,
    pub weight: f64,
}

/// `coWeight * similarity^power * (1 + ln(1 + count))`
pub fn co_occurrence_weight(similarity: f64, count: u32, config: &ClusteringConfig) -> f64 {
    config.co_weight_coefficient
        * similarity.powf(config.weight_power)
        * (1.0 + (count as f64).ln_1p())
}

/// `semWeight * max(similarity, 0)`, with NaN read as zero
pub fn semantic_weight(similarity: f32, config: &ClusteringConfig) -> f64 {
    let similarity = if similarity.is_nan() { 0.0 } else { similarity.max(0.0) as f64 };
    config.sem_weight_coefficient * similarity
}

/// Order a pair so `(u, v)` and `(v, u)` share one key
pub fn canonical_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// What a single raw record turned into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adapted {
    Edge(EdgeContribution),
    BelowThreshold,
    SelfLoop,
    Negligible,
}

/// Maps raw records onto vocabulary indices and weights them
#[derive(Debug)]
pub struct EdgeAdapter<'a> {
    index: &'a HashMap<u32, usize>,
    config: &'a ClusteringConfig,
}

impl<'a> EdgeAdapter<'a> {
    pub fn new(index: &'a HashMap<u32, usize>, config: &'a ClusteringConfig) -> Self {
        Self { index, config }
    }

    fn resolve(&self, id: u32, origin: EdgeOrigin) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(ClusterError::UnknownNode { id, origin })
    }

    fn endpoints(&self, source: u32, target: u32, origin: EdgeOrigin) -> Result<Option<(usize, usize)>> {
        let a = self.resolve(source, origin)?;
        let b = self.resolve(target, origin)?;
        if a == b {
            return Ok(None);
        }
        Ok(Some(canonical_pair(a, b)))
    }

    /// Weight a co-occurrence record; endpoints are checked before the threshold
    pub fn co_occurrence(&self, record: &CoOccurrenceRecord) -> Result<Adapted> {
        let Some((u, v)) = self.endpoints(record.source, record.target, EdgeOrigin::CoOccurrence)? else {
            return Ok(Adapted::SelfLoop);
        };
        if !(record.similarity >= self.config.co_occurrence_threshold) {
            return Ok(Adapted::BelowThreshold);
        }
        let weight = co_occurrence_weight(record.similarity, record.count, self.config);
        Ok(Adapted::Edge(EdgeContribution { u, v, weight }))
    }

    /// Weight a semantic neighbor record
    pub fn semantic(&self, record: &SemanticRecord) -> Result<Adapted> {
        let Some((u, v)) = self.endpoints(record.source, record.target, EdgeOrigin::Semantic)? else {
            return Ok(Adapted::SelfLoop);
        };
        let weight = semantic_weight(record.similarity, self.config);
        if weight <= SEMANTIC_EPSILON {
            return Ok(Adapted::Negligible);
        }
        Ok(Adapted::Edge(EdgeContribution { u, v, weight }))
    }
}
