//! Descriptor extraction.
//!
//! An [`Extractor`] turns decoded pixels into a fixed-length [`Descriptor`].
//! Extractors are pure: the same pixels always give the same descriptor.

pub mod cedd;
pub mod color_histogram;

pub use cedd::CeddExtractor;
pub use color_histogram::ColorHistogramExtractor;

use crate::pixels::{load_pixels, PixelGrid};
use crate::types::Descriptor;
use ris_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Trait for descriptor extractors.
pub trait Extractor: Send + Sync + std::fmt::Debug {
    /// Extractor name (e.g., "cedd")
    fn name(&self) -> &str;

    /// Algorithm version; bumped whenever output changes for the same input
    fn version(&self) -> u32;

    /// Descriptor length
    fn dimensions(&self) -> usize;

    /// Compute the descriptor of a pixel grid.
    fn extract(&self, pixels: &PixelGrid) -> AppResult<Descriptor>;

    /// Identifies the descriptor configuration, e.g. `cedd-v1:144`.
    ///
    /// Descriptors are only comparable when their fingerprints are equal.
    fn fingerprint(&self) -> String {
        format!("{}-v{}:{}", self.name(), self.version(), self.dimensions())
    }
}

/// Create an extractor by configuration name.
pub fn create_extractor(name: &str) -> AppResult<Arc<dyn Extractor>> {
    match name {
        "cedd" => Ok(Arc::new(CeddExtractor::new())),
        "color-histogram" => Ok(Arc::new(ColorHistogramExtractor::new())),
        _ => Err(AppError::InvalidArgument(format!(
            "Unknown extractor: '{}'. Supported extractors: cedd, color-histogram",
            name
        ))),
    }
}

/// Decode an image file and compute its descriptor.
pub fn describe_file(extractor: &dyn Extractor, path: &Path) -> AppResult<Descriptor> {
    let pixels = load_pixels(path)?;
    let descriptor = extractor.extract(&pixels)?;

    if descriptor.len() != extractor.dimensions() {
        return Err(AppError::ExtractorMismatch {
            expected: extractor.fingerprint(),
            found: format!("{}-dimensional descriptor", descriptor.len()),
        });
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cedd() {
        let extractor = create_extractor("cedd").unwrap();
        assert_eq!(extractor.name(), "cedd");
        assert_eq!(extractor.dimensions(), 144);
        assert_eq!(extractor.fingerprint(), "cedd-v1:144");
    }

    #[test]
    fn test_create_color_histogram() {
        let extractor = create_extractor("color-histogram").unwrap();
        assert_eq!(extractor.fingerprint(), "color-histogram-v1:64");
    }

    #[test]
    fn test_create_unknown_extractor() {
        let err = create_extractor("sift").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(err.to_string().contains("Supported extractors"));
    }
}
