//! Index storage abstraction.
//!
//! A [`Store`] holds `(identifier -> descriptor)` documents. Writers append;
//! readers take a [`QueryHandle`], an immutable snapshot of everything
//! committed before the handle was opened.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{ImageDocument, IndexStats};
use ris_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for index storage backends.
///
/// Implementations serialize appends internally, so a store can be shared
/// between indexing workers as `Arc<dyn Store>`. Identifier uniqueness holds
/// under concurrent appends.
pub trait Store: Send + Sync {
    /// Record the extractor fingerprint on an unbound store, or check that
    /// it matches the recorded one.
    ///
    /// Fails with `ExtractorMismatch` when a different fingerprint is recorded.
    fn bind_extractor(&self, fingerprint: &str) -> AppResult<()>;

    /// Append a document.
    ///
    /// With `DuplicatePolicy::Reject` an existing identifier fails with
    /// `DuplicateIdentifier` and the stored document is left untouched. With
    /// `DuplicatePolicy::Overwrite` the stored descriptor is replaced.
    fn append(&self, doc: ImageDocument) -> AppResult<()>;

    /// Snapshot of all committed documents.
    fn open_for_query(&self) -> AppResult<QueryHandle>;

    /// Document count and storage details.
    fn stats(&self) -> AppResult<IndexStats>;

    /// Remove every document and unbind the extractor.
    fn clear(&self) -> AppResult<()>;
}

/// Read-only snapshot of an index.
///
/// Cloning is cheap; clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct QueryHandle {
    documents: Arc<[ImageDocument]>,
    extractor: Option<String>,
}

impl QueryHandle {
    pub fn new(documents: Vec<ImageDocument>, extractor: Option<String>) -> Self {
        Self {
            documents: documents.into(),
            extractor,
        }
    }

    /// Iterate over the snapshot. Each call starts from the beginning.
    pub fn scan(&self) -> impl Iterator<Item = &ImageDocument> + '_ {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Fingerprint bound to the index when the snapshot was taken.
    pub fn extractor(&self) -> Option<&str> {
        self.extractor.as_deref()
    }

    /// Descriptor length of the indexed documents, if known.
    pub fn dimensions(&self) -> Option<usize> {
        self.extractor
            .as_deref()
            .and_then(fingerprint_dimensions)
            .or_else(|| self.documents.first().map(|d| d.descriptor.len()))
    }
}

/// Dimension encoded in a fingerprint such as `cedd-v1:144`.
pub fn fingerprint_dimensions(fingerprint: &str) -> Option<usize> {
    fingerprint.rsplit_once(':').and_then(|(_, dims)| dims.parse().ok())
}

/// Check a new document against the bound fingerprint, or against an
/// existing document's length when the store is unbound.
pub(crate) fn check_dimensions(
    bound: Option<&str>,
    existing: Option<usize>,
    doc: &ImageDocument,
) -> AppResult<()> {
    let expected = bound.and_then(fingerprint_dimensions).or(existing);
    match expected {
        Some(dims) if dims != doc.descriptor.len() => Err(AppError::ExtractorMismatch {
            expected: bound
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}-dimensional descriptors", dims)),
            found: format!("{}-dimensional descriptor", doc.descriptor.len()),
        }),
        _ => Ok(()),
    }
}

/// Compare a requested fingerprint with the recorded one.
pub(crate) fn check_fingerprint(recorded: Option<&str>, requested: &str) -> AppResult<bool> {
    match recorded {
        None => Ok(false),
        Some(recorded) if recorded == requested => Ok(true),
        Some(recorded) => Err(AppError::ExtractorMismatch {
            expected: recorded.to_string(),
            found: requested.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Descriptor;

    #[test]
    fn test_fingerprint_dimensions() {
        assert_eq!(fingerprint_dimensions("cedd-v1:144"), Some(144));
        assert_eq!(fingerprint_dimensions("no-dims"), None);
    }

    #[test]
    fn test_scan_is_restartable() {
        let handle = QueryHandle::new(
            vec![
                ImageDocument::new("/a.png", Descriptor::new(vec![1.0])),
                ImageDocument::new("/b.png", Descriptor::new(vec![2.0])),
            ],
            None,
        );

        let first: Vec<_> = handle.scan().map(|d| d.identifier.clone()).collect();
        let second: Vec<_> = handle.scan().map(|d| d.identifier.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(handle.len(), 2);
        assert_eq!(handle.dimensions(), Some(1));
    }

    #[test]
    fn test_check_dimensions() {
        let doc = ImageDocument::new("/a.png", Descriptor::new(vec![0.0; 3]));
        assert!(check_dimensions(Some("x-v1:3"), None, &doc).is_ok());
        assert!(check_dimensions(None, None, &doc).is_ok());
        assert!(matches!(
            check_dimensions(Some("x-v1:4"), None, &doc),
            Err(AppError::ExtractorMismatch { .. })
        ));
        assert!(matches!(
            check_dimensions(None, Some(8), &doc),
            Err(AppError::ExtractorMismatch { .. })
        ));
    }
}
