//! Configuration management for the keyword clusterer

use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameters for one clustering run.
///
/// Passed explicitly into the graph builder, detector and aggregator so that
/// concurrent runs with different parameters never share state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusteringConfig {
    /// Co-occurrence records with a similarity below this are dropped
    pub co_occurrence_threshold: f64,

    /// Exponent applied to co-occurrence similarity
    pub weight_power: f64,

    /// Scale of co-occurrence edge weights
    pub co_weight_coefficient: f64,

    /// Scale of semantic edge weights
    pub sem_weight_coefficient: f64,

    /// Semantic neighbors per keyword
    pub knn_neighbor_count: usize,

    /// Resolution of the quality function; higher gives smaller communities
    pub resolution: f64,

    /// Keywords per cluster in the labeling request
    pub top_k: usize,

    /// Maximum aggregation levels in the detector
    pub max_levels: usize,

    /// Maximum local-move passes per level
    pub max_passes: usize,

    /// Split communities that are not internally connected
    pub split_disconnected: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            co_occurrence_threshold: 0.15,
            weight_power: 2.0,
            co_weight_coefficient: 0.6,
            sem_weight_coefficient: 0.8,
            knn_neighbor_count: 15,
            resolution: 0.6,
            top_k: 10,
            max_levels: 10,
            max_passes: 100,
            split_disconnected: true,
        }
    }
}

impl ClusteringConfig {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the builder and detector cannot work with
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("coOccurrenceThreshold", self.co_occurrence_threshold),
            ("weightPower", self.weight_power),
            ("coWeightCoefficient", self.co_weight_coefficient),
            ("semWeightCoefficient", self.sem_weight_coefficient),
            ("resolution", self.resolution),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ClusterError::invalid_config(format!("{name} must be finite, got {value}")));
            }
        }

        if self.resolution <= 0.0 {
            return Err(ClusterError::invalid_config(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.co_occurrence_threshold < 0.0 {
            return Err(ClusterError::invalid_config(format!(
                "coOccurrenceThreshold must not be negative, got {}",
                self.co_occurrence_threshold
            )));
        }
        if self.weight_power < 0.0 {
            return Err(ClusterError::invalid_config(format!(
                "weightPower must not be negative, got {}",
                self.weight_power
            )));
        }
        if self.co_weight_coefficient < 0.0 || self.sem_weight_coefficient < 0.0 {
            return Err(ClusterError::invalid_config("edge weight coefficients must not be negative"));
        }
        if self.top_k == 0 {
            return Err(ClusterError::invalid_config("topK must be at least 1"));
        }
        if self.max_levels == 0 || self.max_passes == 0 {
            return Err(ClusterError::invalid_config("maxLevels and maxPasses must be at least 1"));
        }

        Ok(())
    }
}
