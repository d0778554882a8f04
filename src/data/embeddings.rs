//! Persisted keyword embeddings and the embedding collaborator interface

use crate::error::{ClusterError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Produces one embedding vector per input text.
///
/// Remote embedding services live behind this trait; retries and timeouts are
/// the implementor's business.
pub trait Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Row-major table of embedding vectors keyed by node id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingStore {
    ids: Vec<u32>,
    keywords: Vec<String>,
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingStore {
    /// Create an empty store for vectors of the given dimension
    pub fn new(dim: usize) -> Self {
        Self {
            ids: Vec::new(),
            keywords: Vec::new(),
            dim,
            data: Vec::new(),
        }
    }

    /// Build a store from parallel id / keyword / vector lists
    pub fn from_rows(ids: Vec<u32>, keywords: Vec<String>, rows: Vec<Vec<f32>>) -> Result<Self> {
        if ids.len() != keywords.len() || ids.len() != rows.len() {
            return Err(ClusterError::MalformedInput(format!(
                "embedding rows disagree: {} ids, {} keywords, {} vectors",
                ids.len(),
                keywords.len(),
                rows.len()
            )));
        }

        let dim = rows.first().map_or(0, Vec::len);
        let mut store = Self::new(dim);
        store.data.reserve(dim * rows.len());
        for ((id, keyword), row) in ids.into_iter().zip(keywords).zip(rows) {
            store.push(id, keyword, &row)?;
        }
        Ok(store)
    }

    /// Append one vector
    pub fn push(&mut self, id: u32, keyword: impl Into<String>, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(ClusterError::DimensionMismatch {
                expected: self.dim,
                found: vector.len(),
            });
        }
        self.ids.push(id);
        self.keywords.push(keyword.into());
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Node id of every row
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn vector(&self, row: usize) -> &[f32] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }

    /// Copy the vectors into a matrix with every row scaled to unit length.
    /// Zero rows stay zero.
    pub fn normalized_matrix(&self) -> Result<Array2<f32>> {
        let mut matrix = Array2::from_shape_vec((self.len(), self.dim), self.data.clone())
            .map_err(|e| ClusterError::MalformedInput(e.to_string()))?;

        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 && norm.is_finite() {
                row.mapv_inplace(|x| x / norm);
            }
        }
        Ok(matrix)
    }

    /// Write the store with bincode
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        log::info!(
            "Saved {} embeddings of dimension {} to {}",
            self.len(),
            self.dim,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read a store written by [`EmbeddingStore::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Reading embeddings: {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let store: Self = bincode::deserialize_from(reader)?;

        if store.ids.len() != store.keywords.len() || store.data.len() != store.ids.len() * store.dim {
            return Err(ClusterError::MalformedInput(format!(
                "embedding store {} is inconsistent",
                path.display()
            )));
        }

        log::info!("Loaded {} embeddings of dimension {}", store.len(), store.dim);
        Ok(store)
    }
}

impl Embedder for EmbeddingStore {
    /// Look texts up by keyword; unknown keywords are an error
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let by_keyword: HashMap<&str, usize> = self
            .keywords
            .iter()
            .enumerate()
            .map(|(row, keyword)| (keyword.as_str(), row))
            .collect();

        texts
            .iter()
            .map(|text| {
                by_keyword
                    .get(text.as_str())
                    .map(|&row| self.vector(row).to_vec())
                    .ok_or_else(|| ClusterError::MissingEmbedding(text.clone()))
            })
            .collect()
    }
}
