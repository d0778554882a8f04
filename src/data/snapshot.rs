//! JSON snapshot of a keyword vocabulary and its co-occurrence links

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn default_frequency() -> u64 {
    1
}

fn default_count() -> u32 {
    1
}

/// One keyword of the vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u32,

    #[serde(default)]
    pub label: String,

    /// Occurrence weight; older snapshots call this `size`
    #[serde(default = "default_frequency", alias = "size")]
    pub frequency: u64,

    /// Community assigned by a clustering run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<i64>,

    /// Fields this crate does not interpret, kept for round-trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeRecord {
    pub fn new(id: u32, label: impl Into<String>, frequency: u64) -> Self {
        Self {
            id,
            label: label.into(),
            frequency,
            group: None,
            extra: Map::new(),
        }
    }
}

/// A co-occurrence relation between two keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: u32,
    pub target: u32,

    /// Semantic similarity of the pair; older snapshots call this `value`
    #[serde(default, alias = "value")]
    pub similarity: f64,

    /// Number of source records in which the pair co-occurred
    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LinkRecord {
    pub fn new(source: u32, target: u32, similarity: f64, count: u32) -> Self {
        Self {
            source,
            target,
            similarity,
            count,
            extra: Map::new(),
        }
    }
}

/// Vocabulary plus co-occurrence links, as exchanged with the rest of the system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<NodeRecord>,

    #[serde(default)]
    pub links: Vec<LinkRecord>,

    /// Top-level fields such as `cluster_stats` or unrelated metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    pub fn new(nodes: Vec<NodeRecord>, links: Vec<LinkRecord>) -> Self {
        Self {
            nodes,
            links,
            extra: Map::new(),
        }
    }

    /// Read a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Reading snapshot: {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let snapshot: Self = serde_json::from_reader(reader)?;

        log::info!(
            "Loaded {} nodes and {} links",
            snapshot.nodes.len(),
            snapshot.links.len()
        );
        Ok(snapshot)
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Decode a typed value stored under a top-level key, if present
    pub fn section<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.extra.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Store a typed value under a top-level key
    pub fn set_section<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.extra.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }
}
