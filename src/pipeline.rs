//! One clustering run end to end, and batch runs over a directory

use crate::cluster::labeling::{request_labels, ClusterLabeler, ClusterLabels};
use crate::cluster::metrics::{cluster_metrics, modularity};
use crate::cluster::{ClusterAggregator, ClusterMetrics, ClusterSummary, CommunityDetector, Partition, TopKRequest};
use crate::config::ClusteringConfig;
use crate::data::{EmbeddingStore, Snapshot};
use crate::error::{ClusterError, Result};
use crate::graph::{GraphBuilder, KeywordGraph};
use crate::storage::{self, SavedFiles};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot section holding per-community keyword statistics
pub const STATS_SECTION: &str = "cluster_stats";

/// Snapshot section holding the top-K request
pub const TOP_KEYWORDS_SECTION: &str = "cluster_top_keywords";

/// Snapshot section holding validated labels
pub const LABELS_SECTION: &str = "cluster_labels";

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub graph: KeywordGraph,
    pub partition: Partition,
    pub summary: ClusterSummary,
    pub metrics: Vec<ClusterMetrics>,
    pub modularity: f64,
    pub resolution: f64,
    pub labels: Option<ClusterLabels>,
}

impl ClusteringOutcome {
    /// Write groups onto the snapshot nodes and attach the cluster sections
    pub fn annotate(&self, snapshot: &mut Snapshot) -> Result<()> {
        for record in &mut snapshot.nodes {
            let index = self.graph.index_of(record.id).ok_or_else(|| {
                ClusterError::MalformedInput(format!("node {} is not part of the clustered graph", record.id))
            })?;
            record.group = Some(i64::from(self.partition.community_of(index)));
        }

        snapshot.set_section(STATS_SECTION, &self.summary.stats)?;
        snapshot.set_section(TOP_KEYWORDS_SECTION, &self.summary.top_keywords)?;
        if let Some(labels) = &self.labels {
            snapshot.set_section(LABELS_SECTION, labels)?;
        }
        Ok(())
    }

    /// Ask a labeler for cluster labels; nothing is attached if validation fails
    pub fn attach_labels(&mut self, labeler: &dyn ClusterLabeler) -> Result<()> {
        let labels = request_labels(labeler, &self.summary.top_keywords)?;
        self.labels = Some(labels);
        Ok(())
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub processed: Vec<SavedFiles>,

    /// Snapshots skipped because their embeddings were missing
    pub skipped: Vec<PathBuf>,
}

/// Graph construction, detection and aggregation with one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ClusteringConfig,
}

impl Pipeline {
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Fuse the snapshot's co-occurrence links with semantic neighbors
    pub fn build_graph(&self, snapshot: &Snapshot, embeddings: Option<&EmbeddingStore>) -> Result<KeywordGraph> {
        let mut builder = GraphBuilder::from_snapshot(snapshot, &self.config)?;
        match embeddings {
            Some(store) => {
                builder.add_embeddings(store)?;
            }
            None => log::warn!("No embeddings given, graph has co-occurrence edges only"),
        }
        Ok(builder.build())
    }

    /// Detect communities and aggregate their statistics
    pub fn cluster(&self, graph: KeywordGraph) -> Result<ClusteringOutcome> {
        let detector = CommunityDetector::from_config(&self.config)?;
        let aggregator = ClusterAggregator::from_config(&self.config)?;

        let partition = detector.detect(&graph);
        let summary = aggregator.aggregate(&graph, &partition);
        let metrics = cluster_metrics(&graph, &partition);
        let modularity = modularity(graph.adjacency(), &partition, detector.resolution());

        log::info!(
            "Partitioned {} keywords into {} communities (modularity {:.4})",
            graph.node_count(),
            partition.community_count(),
            modularity
        );

        Ok(ClusteringOutcome {
            graph,
            partition,
            summary,
            metrics,
            modularity,
            resolution: detector.resolution(),
            labels: None,
        })
    }

    pub fn run(&self, snapshot: &Snapshot, embeddings: Option<&EmbeddingStore>) -> Result<ClusteringOutcome> {
        let graph = self.build_graph(snapshot, embeddings)?;
        self.cluster(graph)
    }

    /// Cluster one snapshot file and write the results into `output_dir`
    pub fn run_file(
        &self,
        snapshot_path: &Path,
        embeddings_path: Option<&Path>,
        output_dir: &Path,
        labeler: Option<&dyn ClusterLabeler>,
    ) -> Result<SavedFiles> {
        let snapshot = Snapshot::load(snapshot_path)?;
        let embeddings = embeddings_path.map(EmbeddingStore::load).transpose()?;
        self.run_snapshot(snapshot, embeddings.as_ref(), output_dir, &file_stem(snapshot_path)?, labeler)
    }

    /// Cluster a loaded snapshot, optionally label it, and write the results
    /// under `output_dir` with file names derived from `stem`
    pub fn run_snapshot(
        &self,
        mut snapshot: Snapshot,
        embeddings: Option<&EmbeddingStore>,
        output_dir: &Path,
        stem: &str,
        labeler: Option<&dyn ClusterLabeler>,
    ) -> Result<SavedFiles> {
        let mut outcome = self.run(&snapshot, embeddings)?;
        if let Some(labeler) = labeler {
            outcome.attach_labels(labeler)?;
        }
        outcome.annotate(&mut snapshot)?;

        storage::save_results(&snapshot, &outcome, output_dir, stem)
    }

    /// Cluster every `*.json` snapshot in `input_dir` that has a matching
    /// `embeddings_<stem>.bin` in `embeddings_dir`
    pub fn run_batch(&self, input_dir: &Path, embeddings_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
        let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "json"))
            .collect();
        inputs.sort();

        log::info!("Found {} snapshots in {}", inputs.len(), input_dir.display());

        let mut report = BatchReport::default();
        for input in inputs {
            let stem = file_stem(&input)?;
            let embeddings = embeddings_dir.join(embeddings_file_name(&stem));
            if !embeddings.is_file() {
                log::warn!("Missing embeddings {}, skipping {}", embeddings.display(), input.display());
                report.skipped.push(input);
                continue;
            }

            log::info!("Processing {}", input.display());
            report
                .processed
                .push(self.run_file(&input, Some(&embeddings), output_dir, None)?);
        }

        log::info!(
            "Batch finished: {} processed, {} skipped",
            report.processed.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// File name of the embedding store that belongs to a snapshot stem
pub fn embeddings_file_name(stem: &str) -> String {
    format!("embeddings_{stem}.bin")
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| ClusterError::MalformedInput(format!("no usable file name in {}", path.display())))
}

/// Label an already annotated snapshot from its stored top-K request
pub fn merge_labels(snapshot: &mut Snapshot, labeler: &dyn ClusterLabeler) -> Result<ClusterLabels> {
    let request: TopKRequest = snapshot.section(TOP_KEYWORDS_SECTION)?.ok_or_else(|| {
        ClusterError::MalformedInput(format!("snapshot has no '{TOP_KEYWORDS_SECTION}' section"))
    })?;

    let labels = request_labels(labeler, &request)?;
    snapshot.set_section(LABELS_SECTION, &labels)?;
    Ok(labels)
}
