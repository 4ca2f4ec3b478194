//! In-process store.

use super::{check_dimensions, check_fingerprint, QueryHandle, Store};
use crate::types::{Descriptor, ImageDocument, IndexStats};
use chrono::{DateTime, Utc};
use ris_core::{AppError, AppResult, DuplicatePolicy};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, Descriptor>,
    extractor: Option<String>,
    last_indexed_at: Option<DateTime<Utc>>,
}

/// Store that keeps documents in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    policy: DuplicatePolicy,
}

impl MemoryStore {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            policy,
        }
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| AppError::StorageUnavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| AppError::StorageUnavailable("memory store lock poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    fn bind_extractor(&self, fingerprint: &str) -> AppResult<()> {
        let mut inner = self.write()?;
        if !check_fingerprint(inner.extractor.as_deref(), fingerprint)? {
            inner.extractor = Some(fingerprint.to_string());
        }
        Ok(())
    }

    fn append(&self, doc: ImageDocument) -> AppResult<()> {
        let mut inner = self.write()?;

        let existing = inner.documents.values().next().map(Descriptor::len);
        check_dimensions(inner.extractor.as_deref(), existing, &doc)?;

        if self.policy == DuplicatePolicy::Reject && inner.documents.contains_key(&doc.identifier) {
            return Err(AppError::DuplicateIdentifier(doc.identifier));
        }

        inner.documents.insert(doc.identifier, doc.descriptor);
        inner.last_indexed_at = Some(Utc::now());
        Ok(())
    }

    fn open_for_query(&self) -> AppResult<QueryHandle> {
        let inner = self.read()?;
        let documents = inner
            .documents
            .iter()
            .map(|(identifier, descriptor)| ImageDocument::new(identifier.clone(), descriptor.clone()))
            .collect();
        Ok(QueryHandle::new(documents, inner.extractor.clone()))
    }

    fn stats(&self) -> AppResult<IndexStats> {
        let inner = self.read()?;
        Ok(IndexStats {
            documents: inner.documents.len() as u64,
            extractor: inner.extractor.clone(),
            db_size_bytes: 0,
            last_indexed_at: inner.last_indexed_at,
        })
    }

    fn clear(&self) -> AppResult<()> {
        let mut inner = self.write()?;
        *inner = Inner::default();
        Ok(())
    }
}
