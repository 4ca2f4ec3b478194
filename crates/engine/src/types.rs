//! Engine type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed-length visual feature vector.
///
/// Two descriptors are only comparable when produced by the same extractor
/// configuration (see [`crate::extractor::Extractor::fingerprint`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// An indexed image: unique identifier (absolute path) and its descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDocument {
    pub identifier: String,
    pub descriptor: Descriptor,
}

impl ImageDocument {
    pub fn new(identifier: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            identifier: identifier.into(),
            descriptor,
        }
    }
}

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Identifier of the matched document
    pub identifier: String,

    /// Distance to the probe (lower is more similar, never negative)
    pub score: f32,

    /// 1-based position in the result order
    pub rank: usize,
}

/// Options for the indexing pipeline.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Number of concurrent decode/extract workers
    pub workers: usize,

    /// Recognized image extensions (case-insensitive, without the dot)
    pub extensions: Vec<String>,

    /// Walk subdirectories as well
    pub recursive: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            workers: 6,
            extensions: crate::filter::default_extensions(),
            recursive: false,
        }
    }
}

/// Summary of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    /// Documents appended to the index
    pub count: u32,

    /// Files that could not be decoded or described
    pub skipped: u32,

    /// Files whose identifier was already indexed
    pub duplicates: u32,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Search results for one probe image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The probe image
    pub probe: PathBuf,

    /// Hits ordered by ascending score
    pub hits: Vec<SearchHit>,

    /// Set when the probe itself could not be processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Results of a file or directory search, in probe order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryReport {
    pub probes: Vec<ProbeResult>,
}

impl QueryReport {
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

/// Statistics for an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Number of indexed documents
    pub documents: u64,

    /// Fingerprint of the extractor bound to the index
    pub extractor: Option<String>,

    /// Size of the backing storage in bytes (0 for in-memory stores)
    pub db_size_bytes: u64,

    /// Time of the most recent append
    pub last_indexed_at: Option<DateTime<Utc>>,
}
