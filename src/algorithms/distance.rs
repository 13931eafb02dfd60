// src/algorithms/distance.rs

//! Distance of every neighborhood row to the unperturbed row 0, in the
//! binary feature space. The exponential kernel is not applied here; the
//! raw distances go to the surrogate fitter untouched.

use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::core::{LimeError, Result};

/// Metric used to weight neighborhood samples by their distance to the
/// unperturbed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl FromStr for DistanceMetric {
    type Err = LimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            other => Err(LimeError::InvalidInput(format!(
                "Unknown distance metric '{}'.",
                other
            ))),
        }
    }
}

impl DistanceMetric {
    fn between(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            DistanceMetric::Cosine => {
                let norm_a = a.dot(&a).sqrt();
                let norm_b = b.dot(&b).sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    // A zero vector has no direction; treat it as maximally
                    // dissimilar, matching sklearn's pairwise behavior.
                    return 1.0;
                }
                1.0 - a.dot(&b) / (norm_a * norm_b)
            }
            DistanceMetric::Euclidean => {
                let mut sum = 0.0;
                for (x, y) in a.iter().zip(b.iter()) {
                    sum += (x - y) * (x - y);
                }
                sum.sqrt()
            }
        }
    }

    /// Distance of every row of `samples` to row 0. Row 0's own entry is
    /// exactly 0.
    pub fn distances_to_baseline(&self, samples: ArrayView2<f64>) -> Array1<f64> {
        let baseline = samples.row(0);
        Array1::from_iter(samples.rows().into_iter().enumerate().map(|(i, row)| {
            if i == 0 {
                0.0
            } else {
                self.between(row, baseline)
            }
        }))
    }
}
