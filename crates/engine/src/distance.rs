//! Distance metrics between descriptors.
//!
//! Every metric returns a non-negative value, 0 for identical descriptors.

use ris_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Distance metric used by the searcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMetric {
    /// `1 - tanimoto coefficient`, in `[0, 1]`
    #[default]
    Tanimoto,
    Euclidean,
    ChiSquare,
}

impl DistanceMetric {
    /// Parse a configuration name ("tanimoto", "euclidean", "chi-square").
    pub fn from_name(name: &str) -> AppResult<Self> {
        match name {
            "tanimoto" => Ok(DistanceMetric::Tanimoto),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "chi-square" => Ok(DistanceMetric::ChiSquare),
            _ => Err(AppError::InvalidArgument(format!(
                "Unknown distance metric: '{}'. Supported metrics: tanimoto, euclidean, chi-square",
                name
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Tanimoto => "tanimoto",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::ChiSquare => "chi-square",
        }
    }

    /// Distance between two equal-length vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Tanimoto => tanimoto(a, b),
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::ChiSquare => chi_square(a, b),
        }
    }
}

fn tanimoto(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a + norm_b - dot;
    if denominator <= 0.0 {
        // Both vectors are zero
        return 0.0;
    }

    (1.0 - dot / denominator).max(0.0) as f32
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

fn chi_square(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .filter_map(|(&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            let sum = x + y;
            (sum > 0.0).then(|| (x - y) * (x - y) / sum)
        })
        .sum::<f64>() as f32
}
