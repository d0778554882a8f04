//! Results persistence module

use crate::data::Snapshot;
use crate::error::Result;
use crate::pipeline::ClusteringOutcome;
use serde::Serialize;
use serde_json::json;
use statrs::statistics::{Data, Median, Statistics};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix of the annotated snapshot written for each input
pub const CLUSTERED_SUFFIX: &str = "_clustered";

/// Paths of the files written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFiles {
    /// Input snapshot with groups and cluster sections
    pub snapshot: PathBuf,

    /// Top-K keywords per community, ready for labeling
    pub top_keywords: PathBuf,

    pub summary: PathBuf,

    /// Per-cluster metrics and members
    pub clusters: PathBuf,
}

impl SavedFiles {
    pub fn new(output_dir: &Path, stem: &str) -> Self {
        Self {
            snapshot: output_dir.join(format!("{stem}{CLUSTERED_SUFFIX}.json")),
            top_keywords: output_dir.join(format!("{stem}_top_keywords.json")),
            summary: output_dir.join(format!("{stem}_summary.json")),
            clusters: output_dir.join(format!("{stem}_clusters.json")),
        }
    }
}

/// Mean, median and standard deviation of cluster sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SizeStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl SizeStatistics {
    pub fn from_sizes(sizes: &[usize]) -> Self {
        if sizes.is_empty() {
            return Self::default();
        }
        let values: Vec<f64> = sizes.iter().map(|&s| s as f64).collect();
        let std_dev = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };
        Self {
            mean: values.iter().mean(),
            std_dev,
            median: Data::new(values).median(),
        }
    }
}

/// Save the annotated snapshot and the analysis files for one run
pub fn save_results(
    snapshot: &Snapshot,
    outcome: &ClusteringOutcome,
    output_dir: &Path,
    stem: &str,
) -> Result<SavedFiles> {
    log::info!(
        "Saving {} clusters to {}",
        outcome.partition.community_count(),
        output_dir.display()
    );

    fs::create_dir_all(output_dir)?;
    let files = SavedFiles::new(output_dir, stem);

    snapshot.save(&files.snapshot)?;
    write_json(&files.top_keywords, &outcome.summary.top_keywords)?;
    save_summary(outcome, &files.summary)?;
    save_clusters(outcome, &files.clusters)?;

    log::info!("Results saved to {}", files.snapshot.display());
    Ok(files)
}

/// Save graph and partition statistics
fn save_summary(outcome: &ClusteringOutcome, path: &Path) -> Result<()> {
    log::info!("Saving summary information");

    let graph = &outcome.graph;
    let stats = graph.build_stats();
    let sizes = outcome.partition.sizes();
    let size_stats = SizeStatistics::from_sizes(&sizes);

    let summary = json!({
        "graph_stats": {
            "node_count": graph.node_count(),
            "edge_count": graph.edge_count(),
            "co_occurrence_edges": stats.co_occurrence_edges,
            "semantic_edges": stats.semantic_edges,
            "below_threshold": stats.below_threshold,
            "self_loops": stats.self_loops,
            "negligible_semantic": stats.negligible,
            "total_weight": graph.total_weight(),
        },
        "cluster_stats": {
            "cluster_count": outcome.partition.community_count(),
            "resolution": outcome.resolution,
            "modularity": outcome.modularity,
            "largest_cluster_size": sizes.first().copied().unwrap_or(0),
            "smallest_cluster_size": sizes.last().copied().unwrap_or(0),
            "singleton_count": sizes.iter().filter(|&&s| s == 1).count(),
            "size_mean": size_stats.mean,
            "size_median": size_stats.median,
            "size_std_dev": size_stats.std_dev,
        }
    });

    write_json(path, &summary)
}

/// Save per-cluster metrics with member keywords
fn save_clusters(outcome: &ClusteringOutcome, path: &Path) -> Result<()> {
    log::info!("Saving individual cluster information");

    let members = outcome.partition.members();
    let clusters: Vec<_> = outcome
        .metrics
        .iter()
        .map(|metrics| {
            let keywords: Vec<String> = members[metrics.id as usize]
                .iter()
                .map(|&node| outcome.graph.node(node).keyword())
                .collect();
            json!({
                "id": metrics.id,
                "label": outcome.labels.as_ref().and_then(|labels| labels.get(&metrics.id)),
                "size": metrics.size,
                "internal_weight": metrics.internal_weight,
                "boundary_weight": metrics.boundary_weight,
                "density": metrics.density,
                "central_keywords": metrics.central_keywords,
                "members": keywords,
            })
        })
        .collect();

    write_json(path, &json!({ "clusters": clusters }))
}

/// Write any serializable value as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
