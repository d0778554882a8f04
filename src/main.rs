use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use keyword_clusterer::cluster::labeling::FileLabeler;
use keyword_clusterer::cluster::ClusterLabeler;
use keyword_clusterer::data::preprocessing::{prepare_snapshot, read_records};
use keyword_clusterer::data::{parquet, EmbeddingStore, Snapshot};
use keyword_clusterer::pipeline::{self, Pipeline};
use keyword_clusterer::ClusteringConfig;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "keyword-clusterer",
    about = "Community detection over fused keyword co-occurrence and semantic graphs"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0", global = true)]
    threads: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a snapshot and embedding store from raw keyword records
    Prepare {
        /// Text file with one `;`-separated keyword record per line
        #[clap(long)]
        records: PathBuf,

        /// Embedding store keyed by keyword text
        #[clap(long)]
        embeddings: PathBuf,

        /// Output snapshot path
        #[clap(long)]
        output: PathBuf,

        /// Output embedding store, keyed by the new node ids
        #[clap(long)]
        embeddings_output: PathBuf,
    },

    /// Cluster one snapshot
    Run {
        /// Snapshot JSON file
        #[clap(long, conflicts_with = "nodes")]
        input: Option<PathBuf>,

        /// Parquet table of nodes (used with --links)
        #[clap(long, requires = "links")]
        nodes: Option<PathBuf>,

        /// Parquet table of co-occurrence links
        #[clap(long, requires = "nodes")]
        links: Option<PathBuf>,

        /// Embedding store keyed by node id
        #[clap(long)]
        embeddings: Option<PathBuf>,

        /// Output directory for results
        #[clap(long, default_value = "cluster_results")]
        output_dir: PathBuf,

        /// JSON map of cluster labels to attach
        #[clap(long)]
        labels: Option<PathBuf>,

        #[clap(flatten)]
        tuning: TuningArgs,
    },

    /// Cluster every snapshot in a directory
    Batch {
        /// Directory of snapshot JSON files
        #[clap(long)]
        input_dir: PathBuf,

        /// Directory holding `embeddings_<name>.bin` files
        #[clap(long)]
        embeddings_dir: PathBuf,

        /// Output directory (default: <input-dir>/clustered_output)
        #[clap(long)]
        output_dir: Option<PathBuf>,

        #[clap(flatten)]
        tuning: TuningArgs,
    },

    /// Attach externally produced labels to a clustered snapshot
    Label {
        /// Snapshot written by `run` or `batch`
        #[clap(long)]
        input: PathBuf,

        /// JSON map of cluster id to label
        #[clap(long)]
        labels: PathBuf,

        /// Output path (default: overwrite the input)
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

/// Clustering parameters; flags override values from --config
#[derive(Args, Debug)]
struct TuningArgs {
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Minimum co-occurrence similarity
    #[clap(long)]
    threshold: Option<f64>,

    /// Exponent on co-occurrence similarity
    #[clap(long)]
    weight_power: Option<f64>,

    #[clap(long)]
    co_weight: Option<f64>,

    #[clap(long)]
    sem_weight: Option<f64>,

    /// Semantic neighbors per keyword
    #[clap(long)]
    knn: Option<usize>,

    /// Resolution parameter (higher gives smaller clusters)
    #[clap(long)]
    resolution: Option<f64>,

    /// Keywords per cluster in the labeling request
    #[clap(long)]
    top_k: Option<usize>,

    /// Keep communities that are not internally connected
    #[clap(long)]
    keep_disconnected: bool,
}

impl TuningArgs {
    fn resolve(&self) -> Result<ClusteringConfig> {
        let mut config = match &self.config {
            Some(path) => ClusteringConfig::from_file(path)
                .with_context(|| format!("reading configuration {}", path.display()))?,
            None => ClusteringConfig::default(),
        };

        if let Some(v) = self.threshold {
            config.co_occurrence_threshold = v;
        }
        if let Some(v) = self.weight_power {
            config.weight_power = v;
        }
        if let Some(v) = self.co_weight {
            config.co_weight_coefficient = v;
        }
        if let Some(v) = self.sem_weight {
            config.sem_weight_coefficient = v;
        }
        if let Some(v) = self.knn {
            config.knn_neighbor_count = v;
        }
        if let Some(v) = self.resolution {
            config.resolution = v;
        }
        if let Some(v) = self.top_k {
            config.top_k = v;
        }
        if self.keep_disconnected {
            config.split_disconnected = false;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    match args.command {
        Command::Prepare {
            records,
            embeddings,
            output,
            embeddings_output,
        } => prepare(&records, &embeddings, &output, &embeddings_output),
        Command::Run {
            input,
            nodes,
            links,
            embeddings,
            output_dir,
            labels,
            tuning,
        } => {
            let pipeline = Pipeline::new(tuning.resolve()?)?;
            let labeler = labels.map(FileLabeler::new);
            let labeler = labeler.as_ref().map(|l| l as &dyn ClusterLabeler);

            match (input, nodes, links) {
                (Some(input), _, _) => {
                    let files = pipeline.run_file(&input, embeddings.as_deref(), &output_dir, labeler)?;
                    log::info!("Analysis complete. Results saved to {}", files.snapshot.display());
                }
                (None, Some(nodes), Some(links)) => run_parquet(&pipeline, &nodes, &links, embeddings.as_deref(), &output_dir, labeler)?,
                _ => anyhow::bail!("either --input or both --nodes and --links are required"),
            }
            Ok(())
        }
        Command::Batch {
            input_dir,
            embeddings_dir,
            output_dir,
            tuning,
        } => {
            let pipeline = Pipeline::new(tuning.resolve()?)?;
            let output_dir = output_dir.unwrap_or_else(|| input_dir.join("clustered_output"));
            let report = pipeline.run_batch(&input_dir, &embeddings_dir, &output_dir)?;
            log::info!(
                "Batch complete: {} clustered, {} skipped. Results saved to {}",
                report.processed.len(),
                report.skipped.len(),
                output_dir.display()
            );
            Ok(())
        }
        Command::Label { input, labels, output } => {
            let mut snapshot = Snapshot::load(&input)?;
            let merged = pipeline::merge_labels(&mut snapshot, &FileLabeler::new(&labels))
                .with_context(|| format!("labeling {}", input.display()))?;
            let output = output.unwrap_or(input);
            snapshot.save(&output)?;
            log::info!("Attached {} labels to {}", merged.len(), output.display());
            Ok(())
        }
    }
}

fn prepare(records: &Path, embeddings: &Path, output: &Path, embeddings_output: &Path) -> Result<()> {
    let lines = read_records(records)?;
    let keyword_vectors = EmbeddingStore::load(embeddings)?;

    let corpus = prepare_snapshot(&lines, &keyword_vectors)?;
    corpus.snapshot.save(output)?;
    corpus.embeddings.save(embeddings_output)?;

    log::info!(
        "Wrote snapshot {} and embeddings {}",
        output.display(),
        embeddings_output.display()
    );
    Ok(())
}

fn run_parquet(
    pipeline: &Pipeline,
    nodes: &Path,
    links: &Path,
    embeddings: Option<&Path>,
    output_dir: &Path,
    labeler: Option<&dyn ClusterLabeler>,
) -> Result<()> {
    let snapshot = parquet::load_snapshot(nodes, links)?;
    let embeddings = embeddings.map(EmbeddingStore::load).transpose()?;

    let stem = nodes
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot");
    let files = pipeline.run_snapshot(snapshot, embeddings.as_ref(), output_dir, stem, labeler)?;
    log::info!("Analysis complete. Results saved to {}", files.snapshot.display());
    Ok(())
}
