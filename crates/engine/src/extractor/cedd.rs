//! Color and edge directivity descriptor.
//!
//! 144 bins: 6 texture classes x 24 colour bins. The image is cut into at
//! most 40x40 blocks; every block votes once, into the bin given by its edge
//! class and its mean colour. The histogram is then quantized to 0..=7
//! relative to its largest bin so that near-duplicates land on the same
//! vector.

use super::Extractor;
use crate::pixels::PixelGrid;
use crate::types::Descriptor;
use ris_core::AppResult;

const COLOR_BINS: usize = 24;
const TEXTURE_CLASSES: usize = 6;
const DIMENSIONS: usize = COLOR_BINS * TEXTURE_CLASSES;

const MAX_BLOCKS: u32 = 40;

/// Strongest edge response below this (in luminance units) is "non-edge".
const EDGE_THRESHOLD: f64 = 14.0;

const QUANTIZATION_LEVELS: f64 = 7.0;

const HUE_SECTORS: usize = 7;

/// Texture classes, in histogram order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Texture {
    NonEdge = 0,
    NonDirectional = 1,
    Horizontal = 2,
    Vertical = 3,
    Diagonal45 = 4,
    Diagonal135 = 5,
}

/// MPEG-7 edge masks over the quadrant means (top-left, top-right, bottom-left, bottom-right).
const EDGE_MASKS: [(Texture, [f64; 4]); 5] = [
    (Texture::Vertical, [1.0, -1.0, 1.0, -1.0]),
    (Texture::Horizontal, [1.0, 1.0, -1.0, -1.0]),
    (Texture::Diagonal45, [std::f64::consts::SQRT_2, 0.0, 0.0, -std::f64::consts::SQRT_2]),
    (Texture::Diagonal135, [0.0, std::f64::consts::SQRT_2, -std::f64::consts::SQRT_2, 0.0]),
    (Texture::NonDirectional, [2.0, -2.0, -2.0, 2.0]),
];

/// CEDD-style global descriptor (`cedd-v1`, 144 dimensions).
#[derive(Debug, Clone, Default)]
pub struct CeddExtractor;

impl CeddExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for CeddExtractor {
    fn name(&self) -> &str {
        "cedd"
    }

    fn version(&self) -> u32 {
        1
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn extract(&self, pixels: &PixelGrid) -> AppResult<Descriptor> {
        let (width, height) = (pixels.width(), pixels.height());
        let blocks_x = (width / 2).clamp(1, MAX_BLOCKS);
        let blocks_y = (height / 2).clamp(1, MAX_BLOCKS);

        let mut histogram = [0u32; DIMENSIONS];

        for by in 0..blocks_y {
            let (y0, y1) = span(by, blocks_y, height);
            for bx in 0..blocks_x {
                let (x0, x1) = span(bx, blocks_x, width);

                let texture = classify_texture(pixels, x0, x1, y0, y1);
                let color = color_bin(mean_rgb(pixels, x0, x1, y0, y1));
                histogram[texture as usize * COLOR_BINS + color] += 1;
            }
        }

        Ok(Descriptor::new(quantize(&histogram)))
    }
}

/// Pixel range `[start, end)` of block `index` out of `count` along an axis of `len` pixels.
fn span(index: u32, count: u32, len: u32) -> (u32, u32) {
    let start = (index as u64 * len as u64 / count as u64) as u32;
    let end = ((index as u64 + 1) * len as u64 / count as u64) as u32;
    (start, end.max(start + 1))
}

/// Split `[start, end)` into two halves; a one-pixel range is used for both.
fn halves(start: u32, end: u32) -> ((u32, u32), (u32, u32)) {
    if end - start < 2 {
        return ((start, end), (start, end));
    }
    let mid = start + (end - start) / 2;
    ((start, mid), (mid, end))
}

fn luminance([r, g, b]: [u8; 3]) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

fn mean_luminance(pixels: &PixelGrid, x0: u32, x1: u32, y0: u32, y1: u32) -> f64 {
    let mut sum = 0.0;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += luminance(pixels.get(x, y));
        }
    }
    sum / ((x1 - x0) as f64 * (y1 - y0) as f64)
}

fn mean_rgb(pixels: &PixelGrid, x0: u32, x1: u32, y0: u32, y1: u32) -> [f64; 3] {
    let mut sum = [0.0f64; 3];
    for y in y0..y1 {
        for x in x0..x1 {
            let p = pixels.get(x, y);
            for (acc, channel) in sum.iter_mut().zip(p) {
                *acc += channel as f64;
            }
        }
    }
    let n = (x1 - x0) as f64 * (y1 - y0) as f64;
    sum.map(|s| s / n)
}

fn classify_texture(pixels: &PixelGrid, x0: u32, x1: u32, y0: u32, y1: u32) -> Texture {
    let ((lx0, lx1), (rx0, rx1)) = halves(x0, x1);
    let ((ty0, ty1), (by0, by1)) = halves(y0, y1);

    let quadrants = [
        mean_luminance(pixels, lx0, lx1, ty0, ty1),
        mean_luminance(pixels, rx0, rx1, ty0, ty1),
        mean_luminance(pixels, lx0, lx1, by0, by1),
        mean_luminance(pixels, rx0, rx1, by0, by1),
    ];

    let mut best = (Texture::NonEdge, EDGE_THRESHOLD);
    for (texture, mask) in EDGE_MASKS.iter() {
        let response: f64 = quadrants.iter().zip(mask).map(|(q, m)| q * m).sum::<f64>().abs();
        // Strictly greater: on ties the earlier mask wins
        if response > best.1 {
            best = (*texture, response);
        }
    }

    best.0
}

/// Map a mean RGB colour to one of 24 bins: black, grey, white, then 7 hue
/// sectors x 3 brightness levels.
fn color_bin([r, g, b]: [f64; 3]) -> usize {
    let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    if value < 0.15 {
        return 0;
    }
    if saturation < 0.2 {
        return if value < 0.65 { 1 } else { 2 };
    }

    let hue = if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let sector = ((hue / (360.0 / HUE_SECTORS as f64)) as usize).min(HUE_SECTORS - 1);
    let level = if value < 0.45 {
        0
    } else if value < 0.75 {
        1
    } else {
        2
    };

    3 + sector * 3 + level
}

fn quantize(histogram: &[u32; DIMENSIONS]) -> Vec<f32> {
    let max = histogram.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; DIMENSIONS];
    }

    histogram
        .iter()
        .map(|&count| (count as f64 / max as f64 * QUANTIZATION_LEVELS).round() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMetric;

    fn two_tone(width: u32, height: u32, left: [u8; 3], right: [u8; 3]) -> PixelGrid {
        PixelGrid::from_fn(width, height, |x, _| if x < width / 2 { left } else { right }).unwrap()
    }

    #[test]
    fn test_dimensions_and_range() {
        let grid = two_tone(64, 48, [200, 30, 30], [20, 20, 220]);
        let descriptor = CeddExtractor::new().extract(&grid).unwrap();

        assert_eq!(descriptor.len(), 144);
        assert!(descriptor.as_slice().iter().all(|v| (0.0..=7.0).contains(v)));
        assert!(descriptor.as_slice().iter().any(|v| *v == 7.0));
    }

    #[test]
    fn test_deterministic() {
        let grid = two_tone(50, 50, [10, 200, 10], [240, 240, 240]);
        let extractor = CeddExtractor::new();
        assert_eq!(extractor.extract(&grid).unwrap(), extractor.extract(&grid).unwrap());
    }

    #[test]
    fn test_uniform_image_is_single_bin() {
        let grid = PixelGrid::from_fn(20, 20, |_, _| [0, 0, 0]).unwrap();
        let descriptor = CeddExtractor::new().extract(&grid).unwrap();

        // Black, non-edge
        assert_eq!(descriptor.as_slice()[0], 7.0);
        assert_eq!(descriptor.as_slice().iter().filter(|v| **v > 0.0).count(), 1);
    }

    #[test]
    fn test_single_pixel_image() {
        let grid = PixelGrid::from_fn(1, 1, |_, _| [255, 255, 255]).unwrap();
        let descriptor = CeddExtractor::new().extract(&grid).unwrap();

        // White, non-edge
        assert_eq!(descriptor.as_slice()[2], 7.0);
    }

    #[test]
    fn test_vertical_edge_detected() {
        // 2x2 image: dark left column, bright right column
        let grid = two_tone(2, 2, [0, 0, 0], [255, 255, 255]);
        let descriptor = CeddExtractor::new().extract(&grid).unwrap();

        // One block with a vertical edge; mean colour is mid grey
        let vertical_grey = Texture::Vertical as usize * COLOR_BINS + 1;
        assert_eq!(descriptor.as_slice()[vertical_grey], 7.0);
    }

    #[test]
    fn test_near_duplicates_are_closer_than_different_images() {
        let extractor = CeddExtractor::new();
        let original = two_tone(80, 60, [200, 40, 40], [40, 40, 200]);
        let brighter = two_tone(80, 60, [206, 46, 46], [46, 46, 206]);
        let different = PixelGrid::from_fn(80, 60, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                [20, 180, 20]
            } else {
                [250, 250, 250]
            }
        })
        .unwrap();

        let a = extractor.extract(&original).unwrap();
        let b = extractor.extract(&brighter).unwrap();
        let c = extractor.extract(&different).unwrap();

        let metric = DistanceMetric::Tanimoto;
        assert!(metric.distance(a.as_slice(), b.as_slice()) < metric.distance(a.as_slice(), c.as_slice()));
    }

    #[test]
    fn test_color_bins() {
        assert_eq!(color_bin([0.0, 0.0, 0.0]), 0);
        assert_eq!(color_bin([128.0, 128.0, 128.0]), 1);
        assert_eq!(color_bin([250.0, 250.0, 250.0]), 2);
        // Bright pure red: sector 0, level 2
        assert_eq!(color_bin([255.0, 0.0, 0.0]), 5);
        // Bright pure blue: hue 240 -> sector 4
        assert_eq!(color_bin([0.0, 0.0, 255.0]), 3 + 4 * 3 + 2);
    }

    #[test]
    fn test_span_covers_axis() {
        let mut covered = 0;
        for i in 0..7 {
            let (start, end) = span(i, 7, 23);
            assert_eq!(start, covered);
            covered = end;
        }
        assert_eq!(covered, 23);
    }
}
