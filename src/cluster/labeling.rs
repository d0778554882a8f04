//! Attaching human-readable labels to communities
//!
//! Label text comes from an external collaborator. The crate only hands it
//! the top-K request and checks that the answer covers exactly the requested
//! communities.

use crate::cluster::TopKRequest;
use crate::error::{ClusterError, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Community id mapped to its label
pub type ClusterLabels = BTreeMap<u32, String>;

/// Produces a label for every community in a top-K request
pub trait ClusterLabeler {
    fn label(&self, request: &TopKRequest) -> Result<ClusterLabels>;
}

impl<F> ClusterLabeler for F
where
    F: Fn(&TopKRequest) -> Result<ClusterLabels>,
{
    fn label(&self, request: &TopKRequest) -> Result<ClusterLabels> {
        self(request)
    }
}

/// Labeler answering from a JSON object `{"<id>": "<label>", ...}` on disk
#[derive(Debug, Clone)]
pub struct FileLabeler {
    path: PathBuf,
}

impl FileLabeler {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ClusterLabeler for FileLabeler {
    fn label(&self, _request: &TopKRequest) -> Result<ClusterLabels> {
        log::info!("Reading cluster labels from {}", self.path.display());
        let file = File::open(&self.path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Check that labels cover exactly the requested community ids
pub fn validate_labels(request: &TopKRequest, labels: &ClusterLabels) -> Result<()> {
    if labels.len() != request.len() {
        return Err(ClusterError::LabelCountMismatch {
            expected: request.len(),
            returned: labels.len(),
        });
    }
    if let Some(&id) = labels.keys().find(|&&id| !request.contains_key(&id)) {
        return Err(ClusterError::LabelKeyMismatch(id));
    }
    Ok(())
}

/// Ask the labeler for labels and validate its answer
pub fn request_labels(labeler: &dyn ClusterLabeler, request: &TopKRequest) -> Result<ClusterLabels> {
    let labels = labeler.label(request)?;
    validate_labels(request, &labels)?;
    log::info!("Received {} cluster labels", labels.len());
    Ok(labels)
}
