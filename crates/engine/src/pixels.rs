//! Decoded pixel data and image file loading.
//!
//! Bit-stream decoding is delegated to the `image` crate; everything past
//! this module works on [`PixelGrid`].

use image::ImageReader;
use ris_core::{AppError, AppResult};
use std::path::Path;

/// One RGB sample.
pub type Rgb = [u8; 3];

/// A validated, non-empty 2D grid of RGB samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    samples: Vec<Rgb>,
}

impl PixelGrid {
    /// Build a grid from row-major samples.
    ///
    /// Fails with `Decode` when the grid is empty or the sample count does
    /// not equal `width * height`.
    pub fn new(width: u32, height: u32, samples: Vec<Rgb>) -> AppResult<Self> {
        if width == 0 || height == 0 {
            return Err(AppError::Decode(format!(
                "Empty pixel grid ({}x{})",
                width, height
            )));
        }

        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(AppError::Decode(format!(
                "Malformed pixel grid: {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                samples.len()
            )));
        }

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a grid from packed `RGBRGB...` bytes.
    pub fn from_raw_rgb(width: u32, height: u32, raw: &[u8]) -> AppResult<Self> {
        if raw.len() % 3 != 0 {
            return Err(AppError::Decode(format!(
                "Packed RGB buffer length {} is not a multiple of 3",
                raw.len()
            )));
        }

        let samples = raw.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Self::new(width, height, samples)
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> AppResult<Self> {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self::new(width, height, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at `(x, y)`. Callers stay within bounds.
    pub fn get(&self, x: u32, y: u32) -> Rgb {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    pub fn samples(&self) -> &[Rgb] {
        &self.samples
    }
}

/// Decode an image file into a pixel grid.
///
/// The format is sniffed from the file contents, so a mislabelled extension
/// still decodes. Every failure is reported as `Decode`.
pub fn load_pixels(path: &Path) -> AppResult<PixelGrid> {
    let reader = ImageReader::open(path)
        .map_err(|e| AppError::Decode(format!("Failed to open {:?}: {}", path, e)))?
        .with_guessed_format()
        .map_err(|e| AppError::Decode(format!("Failed to read {:?}: {}", path, e)))?;

    let image = reader
        .decode()
        .map_err(|e| AppError::Decode(format!("Failed to decode {:?}: {}", path, e)))?;

    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    tracing::trace!("Decoded {:?} ({}x{})", path, width, height);
    PixelGrid::from_raw_rgb(width, height, rgb.as_raw())
}
