//! Indexing pipeline: directory -> descriptors -> store.

use crate::extractor::{describe_file, Extractor};
use crate::filter::list_images;
use crate::progress::ProgressReporter;
use crate::store::Store;
use crate::types::{ImageDocument, IndexOptions, IndexSummary};
use futures::stream::{self, StreamExt};
use ris_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Index every recognized image in `dir`.
///
/// Files are decoded and described on at most `options.workers` blocking
/// tasks at a time. A file that cannot be decoded is logged and counted in
/// `skipped`; a file whose identifier is already indexed is counted in
/// `duplicates`. Only pipeline-level problems fail the run: `dir` is not a
/// directory, the extractor does not match the index, or the store itself
/// fails.
pub async fn index_directory(
    store: Arc<dyn Store>,
    extractor: Arc<dyn Extractor>,
    dir: &Path,
    options: &IndexOptions,
    progress: &ProgressReporter,
) -> AppResult<IndexSummary> {
    let start = Instant::now();

    if options.workers == 0 {
        return Err(AppError::InvalidArgument(
            "worker count must be at least 1".to_string(),
        ));
    }

    if !dir.is_dir() {
        return Err(AppError::NotADirectory(dir.display().to_string()));
    }

    tracing::info!(
        "Indexing images in {:?} with {} workers (extractor {})",
        dir,
        options.workers,
        extractor.fingerprint()
    );

    store.bind_extractor(&extractor.fingerprint())?;

    let files = list_images(dir, &options.extensions, options.recursive)?;
    let total = files.len() as u64;
    progress.discover(total, &dir.display().to_string());

    let mut outcomes = stream::iter(files)
        .map(|file| {
            let store = Arc::clone(&store);
            let extractor = Arc::clone(&extractor);
            async move {
                let task_file = file.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    describe_and_append(store.as_ref(), extractor.as_ref(), &task_file)
                })
                .await;
                (file, joined)
            }
        })
        .buffer_unordered(options.workers);

    let mut summary = IndexSummary::default();
    let mut processed = 0u64;

    while let Some((file, joined)) = outcomes.next().await {
        processed += 1;
        progress.extract(processed, total, &file.display().to_string());

        let result = joined.unwrap_or_else(|e| {
            Err(AppError::Decode(format!("Worker failed on {:?}: {}", file, e)))
        });

        match result {
            Ok(()) => {
                summary.count += 1;
                tracing::debug!("Indexed {:?}", file);
            }
            Err(AppError::DuplicateIdentifier(identifier)) => {
                summary.duplicates += 1;
                tracing::debug!("Already indexed, skipping: {}", identifier);
            }
            Err(e) if e.is_per_file() => {
                summary.skipped += 1;
                tracing::warn!("Skipping {:?}: {}", file, e);
            }
            Err(e) => return Err(e),
        }
    }

    summary.duration_secs = start.elapsed().as_secs_f64();
    progress.finished(summary.count, summary.skipped, summary.duplicates);

    tracing::info!(
        "Indexing completed: {} indexed, {} skipped, {} duplicates in {:.2}s",
        summary.count,
        summary.skipped,
        summary.duplicates,
        summary.duration_secs
    );

    Ok(summary)
}

/// Identifier for a file: its canonical absolute path.
pub fn identifier_for(path: &Path) -> AppResult<String> {
    let absolute: PathBuf = path
        .canonicalize()
        .map_err(|e| AppError::Decode(format!("Failed to resolve {:?}: {}", path, e)))?;
    Ok(absolute.to_string_lossy().into_owned())
}

fn describe_and_append(store: &dyn Store, extractor: &dyn Extractor, file: &Path) -> AppResult<()> {
    let identifier = identifier_for(file)?;
    let descriptor = describe_file(extractor, file)?;
    store.append(ImageDocument::new(identifier, descriptor))
}
