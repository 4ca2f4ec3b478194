//! Plain quantized RGB histogram (4 levels per channel, 64 bins).

use super::Extractor;
use crate::pixels::PixelGrid;
use crate::types::Descriptor;
use ris_core::AppResult;

const LEVELS: usize = 4;
const DIMENSIONS: usize = LEVELS * LEVELS * LEVELS;

/// Global colour histogram normalized to sum 1 (`color-histogram-v1`, 64 dimensions).
#[derive(Debug, Clone, Default)]
pub struct ColorHistogramExtractor;

impl ColorHistogramExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ColorHistogramExtractor {
    fn name(&self) -> &str {
        "color-histogram"
    }

    fn version(&self) -> u32 {
        1
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn extract(&self, pixels: &PixelGrid) -> AppResult<Descriptor> {
        let mut counts = [0u64; DIMENSIONS];
        for &[r, g, b] in pixels.samples() {
            let bin = (r as usize >> 6) * LEVELS * LEVELS + (g as usize >> 6) * LEVELS + (b as usize >> 6);
            counts[bin] += 1;
        }

        let total = pixels.samples().len() as f64;
        let values = counts.iter().map(|&c| (c as f64 / total) as f32).collect();
        Ok(Descriptor::new(values))
    }
}
