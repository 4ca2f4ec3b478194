//! Image fixtures for engine tests.

use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

/// Colours that fall into pairwise different descriptor bins.
pub const PALETTE: [[u8; 3]; 12] = [
    [0, 0, 0],
    [128, 128, 128],
    [250, 250, 250],
    [255, 0, 0],
    [255, 255, 0],
    [0, 255, 0],
    [0, 255, 255],
    [0, 0, 255],
    [255, 0, 255],
    [150, 0, 0],
    [0, 150, 0],
    [0, 0, 150],
];

/// Write a uniform 24x24 image; the format follows the extension.
pub fn write_image(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    let format = match Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    };

    RgbImage::from_pixel(24, 24, image::Rgb(color))
        .save_with_format(&path, format)
        .unwrap();
    path
}

/// Write `count` distinct PNG images named `img_00.png`, `img_01.png`, ...
pub fn write_palette(dir: &Path, count: usize) -> Vec<PathBuf> {
    assert!(count <= PALETTE.len());
    (0..count)
        .map(|i| write_image(dir, &format!("img_{:02}.png", i), PALETTE[i]))
        .collect()
}

/// A file with an image extension that no decoder accepts.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"\xff\xd8\xff\xe0 truncated jpeg header and nothing else").unwrap();
    path
}

/// Deterministic pseudo-random vectors for synthetic indexes.
pub fn synthetic_vectors(count: usize, dims: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) % 8) as f32
    };

    (0..count).map(|_| (0..dims).map(|_| next()).collect()).collect()
}
