//! SQLite-backed index store.
//!
//! Layout: `<index dir>/index.sqlite` with a `documents` table (one row per
//! image, descriptor as little-endian `f32` bytes) and a `meta` key/value
//! table holding the bound extractor fingerprint.

use super::{check_dimensions, check_fingerprint, QueryHandle, Store};
use crate::types::{Descriptor, ImageDocument, IndexStats};
use chrono::{DateTime, Utc};
use ris_core::{AppError, AppResult, DuplicatePolicy};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File name of the database inside the index directory.
pub const INDEX_FILE: &str = "index.sqlite";

const EXTRACTOR_KEY: &str = "extractor";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    identifier TEXT PRIMARY KEY,
    descriptor BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Durable store on top of a single SQLite database.
///
/// The connection sits behind a mutex: appends from concurrent workers are
/// serialized and each one commits on its own.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    policy: DuplicatePolicy,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish()
    }
}

impl SqliteStore {
    /// Open the index in `dir`, creating the directory and schema if needed.
    pub fn create(dir: &Path, policy: DuplicatePolicy) -> AppResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to create index directory {:?}: {}", dir, e))
        })?;

        let path = dir.join(INDEX_FILE);
        let conn = Connection::open(&path).map_err(|e| unavailable(&path, e))?;
        conn.execute_batch(SCHEMA).map_err(|e| unavailable(&path, e))?;

        tracing::debug!("Initialized SQLite index at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            policy,
        })
    }

    /// Open an index that must already exist.
    ///
    /// Fails with `StorageUnavailable` when the directory or database is
    /// missing, unreadable or not an index.
    pub fn open_existing(dir: &Path, policy: DuplicatePolicy) -> AppResult<Self> {
        let path = dir.join(INDEX_FILE);
        if !path.is_file() {
            return Err(AppError::StorageUnavailable(format!(
                "No index found at {:?}. Run `ris add_dir <directory>` first.",
                dir
            )));
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(&path, e))?;

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('documents', 'meta')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| unavailable(&path, e))?;

        if tables != 2 {
            return Err(AppError::StorageUnavailable(format!(
                "{:?} is not a valid image index (missing tables)",
                path
            )));
        }

        tracing::debug!("Opened SQLite index at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            policy,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::StorageUnavailable("index connection lock poisoned".to_string()))
    }

    fn unavailable(&self, err: rusqlite::Error) -> AppError {
        unavailable(&self.path, err)
    }
}

fn unavailable(path: &Path, err: rusqlite::Error) -> AppError {
    AppError::StorageUnavailable(format!("{:?}: {}", path, err))
}

fn read_extractor(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![EXTRACTOR_KEY],
        |row| row.get(0),
    )
    .optional()
}

impl Store for SqliteStore {
    fn bind_extractor(&self, fingerprint: &str) -> AppResult<()> {
        let conn = self.lock()?;
        let recorded = read_extractor(&conn).map_err(|e| self.unavailable(e))?;

        if !check_fingerprint(recorded.as_deref(), fingerprint)? {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                params![EXTRACTOR_KEY, fingerprint],
            )
            .map_err(|e| self.unavailable(e))?;
            tracing::debug!("Bound index {:?} to extractor {}", self.path, fingerprint);
        }

        Ok(())
    }

    fn append(&self, doc: ImageDocument) -> AppResult<()> {
        let conn = self.lock()?;

        let recorded = read_extractor(&conn).map_err(|e| self.unavailable(e))?;
        let existing: Option<i64> = if recorded.is_none() {
            conn.query_row("SELECT dimensions FROM documents LIMIT 1", [], |row| row.get(0))
                .optional()
                .map_err(|e| self.unavailable(e))?
        } else {
            None
        };
        check_dimensions(recorded.as_deref(), existing.map(|d| d as usize), &doc)?;

        let sql = match self.policy {
            DuplicatePolicy::Reject => {
                "INSERT INTO documents (identifier, descriptor, dimensions, indexed_at) VALUES (?1, ?2, ?3, ?4)"
            }
            DuplicatePolicy::Overwrite => {
                "INSERT OR REPLACE INTO documents (identifier, descriptor, dimensions, indexed_at) VALUES (?1, ?2, ?3, ?4)"
            }
        };

        let result = conn.execute(
            sql,
            params![
                doc.identifier,
                descriptor_to_bytes(doc.descriptor.as_slice()),
                doc.descriptor.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                Err(AppError::DuplicateIdentifier(doc.identifier))
            }
            Err(e) => Err(self.unavailable(e)),
        }
    }

    fn open_for_query(&self) -> AppResult<QueryHandle> {
        let mut conn = self.lock()?;
        // One read transaction, so the snapshot is consistent even when
        // another process writes to the same file.
        let tx = conn.transaction().map_err(|e| self.unavailable(e))?;

        let extractor = read_extractor(&tx).map_err(|e| self.unavailable(e))?;

        let documents = {
            let mut stmt = tx
                .prepare("SELECT identifier, descriptor, dimensions FROM documents")
                .map_err(|e| self.unavailable(e))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| self.unavailable(e))?;

            let mut documents = Vec::new();
            for row in rows {
                let (identifier, bytes, dimensions) = row.map_err(|e| self.unavailable(e))?;
                let descriptor = bytes_to_descriptor(&bytes)?;
                if descriptor.len() as i64 != dimensions {
                    return Err(AppError::StorageUnavailable(format!(
                        "Corrupt descriptor for {}: expected {} values, found {}",
                        identifier,
                        dimensions,
                        descriptor.len()
                    )));
                }
                documents.push(ImageDocument::new(identifier, descriptor));
            }
            documents
        };

        tx.commit().map_err(|e| self.unavailable(e))?;

        tracing::debug!("Opened query snapshot with {} documents", documents.len());
        Ok(QueryHandle::new(documents, extractor))
    }

    fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.lock()?;

        let documents: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| self.unavailable(e))?;

        let extractor = read_extractor(&conn).map_err(|e| self.unavailable(e))?;

        let last: Option<String> = conn
            .query_row("SELECT MAX(indexed_at) FROM documents", [], |row| row.get(0))
            .map_err(|e| self.unavailable(e))?;

        let last_indexed_at = last
            .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
            .map(|ts| ts.with_timezone(&Utc));

        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(IndexStats {
            documents: documents as u64,
            extractor,
            db_size_bytes,
            last_indexed_at,
        })
    }

    fn clear(&self) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM documents; DELETE FROM meta;")
            .map_err(|e| self.unavailable(e))?;

        tracing::info!("Cleared index at {:?}", self.path);
        Ok(())
    }
}

/// Convert a descriptor to bytes for storage.
fn descriptor_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for &value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to a descriptor.
fn bytes_to_descriptor(bytes: &[u8]) -> AppResult<Descriptor> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::StorageUnavailable(
            "Invalid descriptor bytes length".to_string(),
        ));
    }

    let values = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(Descriptor::new(values))
}
