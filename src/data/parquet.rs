//! Parquet file handling for vocabulary and co-occurrence tables

use crate::data::snapshot::{LinkRecord, NodeRecord, Snapshot};
use crate::error::{ClusterError, Result};
use polars::prelude::*;
use std::path::Path;

fn scan(path: &Path) -> Result<DataFrame> {
    log::info!("Reading parquet file: {}", path.display());

    if !path.exists() {
        return Err(ClusterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }

    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::debug!("File schema: {:?}", df.schema());
    Ok(df)
}

/// First column present among `names`, cast to `dtype`
fn optional_column(df: &DataFrame, names: &[&str], dtype: &DataType) -> Result<Option<Column>> {
    for name in names {
        if let Ok(column) = df.column(name) {
            return Ok(Some(column.cast(dtype)?));
        }
    }
    Ok(None)
}

fn required_column(df: &DataFrame, names: &[&str], dtype: &DataType) -> Result<Column> {
    optional_column(df, names, dtype)?
        .ok_or_else(|| ClusterError::MalformedInput(format!("missing column {}", names.join("/"))))
}

/// Load the vocabulary table: `id`, `label`, optional `frequency` (or `size`)
pub fn load_nodes(path: impl AsRef<Path>) -> Result<Vec<NodeRecord>> {
    let df = scan(path.as_ref())?;

    let ids = required_column(&df, &["id"], &DataType::UInt32)?;
    let ids = ids.u32()?;
    let labels = optional_column(&df, &["label"], &DataType::String)?;
    let labels = labels.as_ref().map(|c| c.str()).transpose()?;
    let frequencies = optional_column(&df, &["frequency", "size"], &DataType::UInt64)?;
    let frequencies = frequencies.as_ref().map(|c| c.u64()).transpose()?;

    let mut nodes = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let id = ids
            .get(row)
            .ok_or_else(|| ClusterError::MalformedInput(format!("null node id in row {row}")))?;
        let label = labels.and_then(|c| c.get(row)).unwrap_or_default();
        let frequency = frequencies.and_then(|c| c.get(row)).unwrap_or(1);
        nodes.push(NodeRecord::new(id, label, frequency));
    }

    log::info!("Loaded {} nodes", nodes.len());
    Ok(nodes)
}

/// Load the co-occurrence table: `source`, `target`, `similarity` (or `value`), optional `count`
pub fn load_links(path: impl AsRef<Path>) -> Result<Vec<LinkRecord>> {
    let df = scan(path.as_ref())?;

    let sources = required_column(&df, &["source"], &DataType::UInt32)?;
    let sources = sources.u32()?;
    let targets = required_column(&df, &["target"], &DataType::UInt32)?;
    let targets = targets.u32()?;
    let similarities = required_column(&df, &["similarity", "value"], &DataType::Float64)?;
    let similarities = similarities.f64()?;
    let counts = optional_column(&df, &["count"], &DataType::UInt32)?;
    let counts = counts.as_ref().map(|c| c.u32()).transpose()?;

    let mut links = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let (Some(source), Some(target)) = (sources.get(row), targets.get(row)) else {
            return Err(ClusterError::MalformedInput(format!("null endpoint in link row {row}")));
        };
        let similarity = similarities.get(row).unwrap_or(0.0);
        let count = counts.and_then(|c| c.get(row)).unwrap_or(1);
        links.push(LinkRecord::new(source, target, similarity, count));
    }

    log::info!("Loaded {} links", links.len());
    Ok(links)
}

/// Assemble a snapshot from a nodes table and a links table
pub fn load_snapshot(nodes_path: impl AsRef<Path>, links_path: impl AsRef<Path>) -> Result<Snapshot> {
    Ok(Snapshot::new(load_nodes(nodes_path)?, load_links(links_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn write_table(dir: &Path, name: &str, mut df: DataFrame) -> std::path::PathBuf {
        let path = dir.join(name);
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();
        path
    }

    #[test]
    fn reads_size_alias_for_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!(
            "id" => [0u32, 1],
            "label" => ["rust", "cargo"],
            "size" => [4u64, 2],
        )
        .unwrap();
        let path = write_table(dir.path(), "nodes.parquet", df);

        let nodes = load_nodes(&path).unwrap();
        let rows: Vec<_> = nodes.iter().map(|n| (n.id, n.label.as_str(), n.frequency)).collect();
        assert_eq!(rows, vec![(0, "rust", 4), (1, "cargo", 2)]);
    }

    #[test]
    fn frequency_defaults_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("id" => [7u32], "label" => ["solo"]).unwrap();
        let path = write_table(dir.path(), "nodes.parquet", df);

        let nodes = load_nodes(&path).unwrap();
        assert_eq!(nodes[0].frequency, 1);
    }

    #[test]
    fn reads_value_alias_and_defaults_count() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!(
            "source" => [0u32, 1],
            "target" => [1u32, 2],
            "value" => [0.6f64, 0.3],
        )
        .unwrap();
        let path = write_table(dir.path(), "links.parquet", df);

        let links = load_links(&path).unwrap();
        let rows: Vec<_> = links
            .iter()
            .map(|l| (l.source, l.target, l.similarity, l.count))
            .collect();
        assert_eq!(rows, vec![(0, 1, 0.6, 1), (1, 2, 0.3, 1)]);
    }

    #[test]
    fn explicit_count_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!(
            "source" => [0u32],
            "target" => [1u32],
            "similarity" => [0.5f64],
            "count" => [3u32],
        )
        .unwrap();
        let path = write_table(dir.path(), "links.parquet", df);

        assert_eq!(load_links(&path).unwrap()[0].count, 3);
    }

    #[test]
    fn null_endpoint_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!(
            "source" => [Some(0u32), None],
            "target" => [Some(1u32), Some(2)],
            "similarity" => [0.6f64, 0.4],
        )
        .unwrap();
        let path = write_table(dir.path(), "links.parquet", df);

        assert!(matches!(load_links(&path), Err(ClusterError::MalformedInput(_))));
    }

    #[test]
    fn missing_similarity_column_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("source" => [0u32], "target" => [1u32]).unwrap();
        let path = write_table(dir.path(), "links.parquet", df);

        assert!(matches!(load_links(&path), Err(ClusterError::MalformedInput(_))));
    }

    #[test]
    fn snapshot_joins_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let nodes = write_table(
            dir.path(),
            "nodes.parquet",
            df!("id" => [0u32, 1], "label" => ["a", "b"]).unwrap(),
        );
        let links = write_table(
            dir.path(),
            "links.parquet",
            df!("source" => [0u32], "target" => [1u32], "value" => [0.9f64]).unwrap(),
        );

        let snapshot = load_snapshot(&nodes, &links).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.links.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_nodes(dir.path().join("absent.parquet"));
        assert!(matches!(result, Err(ClusterError::Io(_))));
    }
}
