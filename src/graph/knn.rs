//! Semantic nearest neighbors over keyword embeddings

use crate::data::embeddings::EmbeddingStore;
use crate::error::Result;
use crate::graph::edges::SemanticRecord;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Higher similarity first, then lower row index
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// Find the `k` most similar other rows for every row of the store.
///
/// Brute-force cosine similarity on unit-normalized rows, parallel over query
/// rows. Output is grouped by query row in store order, each group ranked by
/// descending similarity with ties on the lower row index, so the result does
/// not depend on thread scheduling.
pub fn nearest_neighbors(store: &EmbeddingStore, k: usize) -> Result<Vec<SemanticRecord>> {
    let n = store.len();
    let k = k.min(n.saturating_sub(1));
    if k == 0 {
        return Ok(Vec::new());
    }

    log::info!("Searching {} nearest neighbors for {} embeddings", k, n);

    let matrix = store.normalized_matrix()?;
    let ids = store.ids();

    let per_row: Vec<Vec<SemanticRecord>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let similarities = matrix.dot(&matrix.row(i));
            let mut candidates: Vec<(usize, f32)> = similarities
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, &s)| (j, if s.is_finite() { s } else { 0.0 }))
                .collect();

            if candidates.len() > k {
                candidates.select_nth_unstable_by(k - 1, rank);
                candidates.truncate(k);
            }
            candidates.sort_unstable_by(rank);

            candidates
                .into_iter()
                .map(|(j, similarity)| SemanticRecord {
                    source: ids[i],
                    target: ids[j],
                    similarity,
                })
                .collect()
        })
        .collect();

    let records: Vec<SemanticRecord> = per_row.into_iter().flatten().collect();
    log::info!("Found {} semantic neighbor pairs", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(rows: Vec<Vec<f32>>) -> EmbeddingStore {
        let n = rows.len() as u32;
        let ids: Vec<u32> = (0..n).map(|i| i * 10).collect();
        let keywords = (0..n).map(|i| format!("k{i}")).collect();
        EmbeddingStore::from_rows(ids, keywords, rows).unwrap()
    }

    #[test]
    fn picks_most_similar_excluding_self() {
        let store = store(vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
        ]);

        let records = nearest_neighbors(&store, 1).unwrap();
        let pairs: Vec<_> = records.iter().map(|r| (r.source, r.target)).collect();
        assert_eq!(pairs, vec![(0, 10), (10, 0), (20, 10)]);
    }

    #[test]
    fn k_is_capped_by_row_count() {
        let store = store(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let records = nearest_neighbors(&store, 15).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn ties_prefer_lower_rows() {
        let store = store(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ]);

        let records = nearest_neighbors(&store, 2).unwrap();
        let from_first: Vec<_> = records.iter().filter(|r| r.source == 0).map(|r| r.target).collect();
        assert_eq!(from_first, vec![10, 20]);
    }

    #[test]
    fn single_row_has_no_neighbors() {
        let store = store(vec![vec![1.0, 0.0]]);
        assert!(nearest_neighbors(&store, 3).unwrap().is_empty());
    }
}
