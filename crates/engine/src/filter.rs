//! Image file recognition and directory listing.
//!
//! The same filter drives indexing and batch search.

use ris_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized when nothing else is configured.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Case-insensitive match of the file name's suffix against `extensions`.
///
/// Extensions may be given with or without the leading dot.
pub fn is_image_file(path: &Path, extensions: &[String]) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return false,
    };

    extensions.iter().any(|ext| {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        !ext.is_empty() && name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext))
    })
}

/// List recognized image files under `dir`, sorted by path.
///
/// Only the top level is listed unless `recursive` is set. Unreadable
/// entries are logged and skipped.
pub fn list_images(dir: &Path, extensions: &[String], recursive: bool) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::NotADirectory(dir.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_image_file(entry.path(), extensions) {
            images.push(entry.into_path());
        }
    }

    images.sort();
    tracing::debug!("Found {} image files in {:?}", images.len(), dir);
    Ok(images)
}
