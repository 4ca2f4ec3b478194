//! Reverse image search engine.
//!
//! Images are described by a global colour/edge descriptor, stored in an
//! index and retrieved by top-k distance to a probe image. The two seams are
//! [`Extractor`] (pixels -> descriptor) and [`Store`] (append, snapshot,
//! scan); the pipeline and the searcher receive both explicitly.

pub mod distance;
pub mod extractor;
pub mod filter;
pub mod pipeline;
pub mod pixels;
pub mod progress;
pub mod search;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use distance::DistanceMetric;
pub use extractor::{create_extractor, Extractor};
pub use pipeline::index_directory;
pub use progress::{ProgressEvent, ProgressReporter};
pub use search::Searcher;
pub use store::{MemoryStore, QueryHandle, SqliteStore, Store};
pub use types::{
    Descriptor, ImageDocument, IndexOptions, IndexStats, IndexSummary, ProbeResult, QueryReport,
    SearchHit,
};

use ris_core::{AppConfig, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Index the images in `dir` into the workspace index, creating it if needed.
pub async fn add_directory(
    config: &AppConfig,
    dir: &Path,
    recursive: bool,
    progress: &ProgressReporter,
) -> AppResult<IndexSummary> {
    let extractor = create_extractor(&config.extractor)?;
    let store: Arc<dyn Store> =
        Arc::new(SqliteStore::create(&config.index_path(), config.duplicate_policy)?);

    let options = IndexOptions {
        workers: config.workers,
        extensions: config.extensions.clone(),
        recursive,
    };

    index_directory(store, extractor, dir, &options, progress).await
}

/// Search the workspace index with an image file or a directory of images.
pub async fn search(config: &AppConfig, path: &Path, k: usize) -> AppResult<QueryReport> {
    let searcher = open_searcher(config)?;
    searcher.search_path(path, k).await
}

/// Build a searcher over the existing workspace index.
pub fn open_searcher(config: &AppConfig) -> AppResult<Searcher> {
    let extractor = create_extractor(&config.extractor)?;
    let metric = DistanceMetric::from_name(&config.metric)?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_existing(
        &config.index_path(),
        config.duplicate_policy,
    )?);

    Ok(Searcher::new(store, extractor, metric)
        .with_extensions(config.extensions.clone())
        .with_workers(config.workers))
}

/// Statistics of the workspace index.
pub fn stats(config: &AppConfig) -> AppResult<IndexStats> {
    let store = SqliteStore::open_existing(&config.index_path(), config.duplicate_policy)?;
    store.stats()
}

/// Delete every document from the workspace index.
pub fn clean(config: &AppConfig) -> AppResult<()> {
    let store = SqliteStore::open_existing(&config.index_path(), config.duplicate_policy)?;
    store.clear()
}
