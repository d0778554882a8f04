//! Turn raw keyword records into a snapshot the graph builder can consume

use crate::data::embeddings::{Embedder, EmbeddingStore};
use crate::data::snapshot::{LinkRecord, NodeRecord, Snapshot};
use crate::error::{ClusterError, Result};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Snapshot plus the embeddings of its vocabulary, keyed by the new node ids
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    pub snapshot: Snapshot,
    pub embeddings: EmbeddingStore,
}

/// Split one record into its distinct keywords.
///
/// Both `;` and the full-width `；` separate keywords; whitespace inside a
/// keyword is removed and duplicates keep their first position.
pub fn split_keywords(record: &str) -> Vec<String> {
    record
        .split([';', '；'])
        .map(|part| part.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|keyword| !keyword.is_empty())
        .unique()
        .collect()
}

/// Read one record per non-empty line
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = fs::read_to_string(path.as_ref())?;
    let records: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    log::info!("Read {} keyword records from {}", records.len(), path.as_ref().display());
    Ok(records)
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Build the vocabulary and co-occurrence links from raw records.
///
/// Node ids follow the sorted order of the distinct keywords; a node's
/// frequency is the number of records mentioning it. Each keyword pair seen
/// together becomes one link whose `count` is the number of such records and
/// whose similarity is the cosine of the two keyword embeddings.
pub fn prepare_snapshot<S: AsRef<str>>(records: &[S], embedder: &dyn Embedder) -> Result<PreparedCorpus> {
    let parsed: Vec<Vec<String>> = records.iter().map(|r| split_keywords(r.as_ref())).collect();

    let mut frequencies: BTreeMap<&str, u64> = BTreeMap::new();
    for keyword in parsed.iter().flatten() {
        *frequencies.entry(keyword.as_str()).or_insert(0) += 1;
    }

    let keywords: Vec<String> = frequencies.keys().map(|k| k.to_string()).collect();
    let index: BTreeMap<&str, u32> = frequencies
        .keys()
        .enumerate()
        .map(|(i, &k)| (k, i as u32))
        .collect();

    log::info!("Found {} unique keywords in {} records", keywords.len(), records.len());

    let mut pair_counts: BTreeMap<(u32, u32), u32> = BTreeMap::new();
    for record in &parsed {
        for (a, b) in record.iter().map(|k| index[k.as_str()]).tuple_combinations() {
            *pair_counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }

    let vectors = embedder.embed(&keywords)?;
    if vectors.len() != keywords.len() {
        return Err(ClusterError::MalformedInput(format!(
            "embedder returned {} vectors for {} keywords",
            vectors.len(),
            keywords.len()
        )));
    }

    let links: Vec<LinkRecord> = pair_counts
        .into_iter()
        .map(|((a, b), count)| {
            let similarity = cosine(&vectors[a as usize], &vectors[b as usize]);
            LinkRecord::new(a, b, similarity, count)
        })
        .collect();

    let nodes: Vec<NodeRecord> = keywords
        .iter()
        .enumerate()
        .map(|(i, keyword)| NodeRecord::new(i as u32, keyword.clone(), frequencies[keyword.as_str()]))
        .collect();

    log::info!("Prepared snapshot with {} nodes and {} links", nodes.len(), links.len());

    let ids = (0..keywords.len() as u32).collect();
    let embeddings = EmbeddingStore::from_rows(ids, keywords, vectors)?;

    Ok(PreparedCorpus {
        snapshot: Snapshot::new(nodes, links),
        embeddings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "graph" => vec![1.0, 0.0],
                    "network" => vec![1.0, 1.0],
                    _ => vec![0.0, 1.0],
                })
                .collect())
        }
    }

    #[test]
    fn splits_on_both_separators() {
        assert_eq!(
            split_keywords("deep learning；graph; ;graph;net work"),
            vec!["deeplearning", "graph", "network"]
        );
    }

    #[test]
    fn counts_pairs_once_per_record() {
        let records = ["graph;network;graph", "network;graph", "tensor"];
        let prepared = prepare_snapshot(&records, &AxisEmbedder).unwrap();
        let snapshot = prepared.snapshot;

        let labels: Vec<_> = snapshot.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["graph", "network", "tensor"]);
        assert_eq!(snapshot.nodes[0].frequency, 2);
        assert_eq!(snapshot.nodes[2].frequency, 1);

        assert_eq!(snapshot.links.len(), 1);
        let link = &snapshot.links[0];
        assert_eq!((link.source, link.target, link.count), (0, 1, 2));
        assert!((link.similarity - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);

        assert_eq!(prepared.embeddings.ids(), &[0, 1, 2]);
        assert_eq!(prepared.embeddings.keywords()[1], "network");
    }

    #[test]
    fn empty_records_give_empty_snapshot() {
        let prepared = prepare_snapshot::<&str>(&[], &AxisEmbedder).unwrap();
        assert!(prepared.snapshot.nodes.is_empty());
        assert!(prepared.embeddings.is_empty());
    }

    #[test]
    fn reads_non_empty_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.txt");
        fs::write(&path, "a;b\n\n  \nc\n").unwrap();
        assert_eq!(read_records(&path).unwrap(), vec!["a;b", "c"]);
    }
}
