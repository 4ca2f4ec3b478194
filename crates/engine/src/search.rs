//! Similarity search over an index snapshot.

use crate::distance::DistanceMetric;
use crate::extractor::{describe_file, Extractor};
use crate::filter::{default_extensions, is_image_file, list_images};
use crate::store::{QueryHandle, Store};
use crate::types::{Descriptor, ProbeResult, QueryReport, SearchHit};
use futures::stream::{self, StreamExt};
use ris_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Answers top-k queries against a store.
pub struct Searcher {
    store: Arc<dyn Store>,
    extractor: Arc<dyn Extractor>,
    metric: DistanceMetric,
    extensions: Vec<String>,
    workers: usize,
}

impl Searcher {
    pub fn new(store: Arc<dyn Store>, extractor: Arc<dyn Extractor>, metric: DistanceMetric) -> Self {
        Self {
            store,
            extractor,
            metric,
            extensions: default_extensions(),
            workers: 1,
        }
    }

    /// Extensions recognized when searching a directory.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Number of probes processed concurrently by [`Searcher::search_path`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// The `k` documents closest to `probe`, ascending by score.
    pub fn search(&self, probe: &Descriptor, k: usize) -> AppResult<Vec<SearchHit>> {
        validate_k(k)?;
        let handle = self.store.open_for_query()?;
        top_k(&handle, probe, k, self.metric)
    }

    /// Decode `image`, describe it and search for it.
    ///
    /// Fails with `ExtractorMismatch` when the index was built by another
    /// extractor.
    pub fn search_image(&self, image: &Path, k: usize) -> AppResult<Vec<SearchHit>> {
        validate_k(k)?;
        let handle = self.open_checked()?;
        rank_image(&handle, self.extractor.as_ref(), image, k, self.metric)
    }

    /// Search with a single image file or with every image in a directory.
    ///
    /// Each probe is reported independently and in directory order. A path
    /// that matches no image file gives an empty report. Fails with
    /// `NotFound` when `path` does not exist and with `StorageUnavailable`
    /// when the index cannot be read; both are checked before any probe runs.
    pub async fn search_path(&self, path: &Path, k: usize) -> AppResult<QueryReport> {
        validate_k(k)?;

        if !path.exists() {
            return Err(AppError::NotFound(path.display().to_string()));
        }

        let handle = self.open_checked()?;

        let probes: Vec<PathBuf> = if path.is_dir() {
            list_images(path, &self.extensions, false)?
        } else if path.is_file() && is_image_file(path, &self.extensions) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };

        if probes.is_empty() {
            tracing::info!("No image files to search in {:?}", path);
            return Ok(QueryReport::default());
        }

        tracing::info!(
            "Searching {} probe(s) against {} indexed documents",
            probes.len(),
            handle.len()
        );

        let metric = self.metric;
        let results = stream::iter(probes)
            .map(|probe| {
                let handle = handle.clone();
                let extractor = Arc::clone(&self.extractor);
                async move {
                    let task_probe = probe.clone();
                    let joined = tokio::task::spawn_blocking(move || {
                        rank_image(&handle, extractor.as_ref(), &task_probe, k, metric)
                    })
                    .await;

                    let outcome = joined.unwrap_or_else(|e| {
                        Err(AppError::Other(format!("Search worker failed: {}", e)))
                    });

                    match outcome {
                        Ok(hits) => ProbeResult {
                            probe,
                            hits,
                            error: None,
                        },
                        Err(e) => {
                            tracing::warn!("Search failed for {:?}: {}", probe, e);
                            ProbeResult {
                                probe,
                                hits: Vec::new(),
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
            })
            .buffered(self.workers)
            .collect::<Vec<_>>()
            .await;

        Ok(QueryReport { probes: results })
    }

    /// Snapshot the index and make sure it was built with our extractor.
    fn open_checked(&self) -> AppResult<QueryHandle> {
        let handle = self.store.open_for_query()?;
        let fingerprint = self.extractor.fingerprint();
        match handle.extractor() {
            Some(bound) if bound != fingerprint => Err(AppError::ExtractorMismatch {
                expected: bound.to_string(),
                found: fingerprint,
            }),
            _ => Ok(handle),
        }
    }
}

fn rank_image(
    handle: &QueryHandle,
    extractor: &dyn Extractor,
    image: &Path,
    k: usize,
    metric: DistanceMetric,
) -> AppResult<Vec<SearchHit>> {
    let descriptor = describe_file(extractor, image)?;
    top_k(handle, &descriptor, k, metric)
}

fn validate_k(k: usize) -> AppResult<()> {
    if k == 0 {
        return Err(AppError::InvalidArgument(
            "number of hits must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Candidate ordered by score, then identifier. The heap keeps the worst on top.
struct Candidate<'a> {
    score: f32,
    identifier: &'a str,
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.identifier.cmp(other.identifier))
    }
}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

/// Brute-force top-k over a snapshot with a bounded max-heap.
///
/// Hits are ascending by score; equal scores are ordered by identifier.
pub fn top_k(
    handle: &QueryHandle,
    probe: &Descriptor,
    k: usize,
    metric: DistanceMetric,
) -> AppResult<Vec<SearchHit>> {
    validate_k(k)?;

    if let Some(dims) = handle.dimensions() {
        if dims != probe.len() {
            return Err(AppError::ExtractorMismatch {
                expected: handle
                    .extractor()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}-dimensional descriptors", dims)),
                found: format!("{}-dimensional probe", probe.len()),
            });
        }
    }

    let mut heap: BinaryHeap<Candidate<'_>> = BinaryHeap::with_capacity(k + 1);

    for doc in handle.scan() {
        let candidate = Candidate {
            score: metric.distance(probe.as_slice(), doc.descriptor.as_slice()),
            identifier: &doc.identifier,
        };

        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }
    }

    let hits = heap
        .into_sorted_vec()
        .into_iter()
        .enumerate()
        .map(|(i, c)| SearchHit {
            identifier: c.identifier.to_string(),
            score: c.score,
            rank: i + 1,
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        "Retrieved {} hits (requested top-{}) from {} documents",
        hits.len(),
        k,
        handle.len()
    );

    Ok(hits)
}
