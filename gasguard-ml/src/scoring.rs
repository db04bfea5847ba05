//! Anomaly score calculation
//!
//! Converts average path lengths into normalized scores and calibrates the
//! decision threshold from the training score distribution.

use serde::Serialize;

use crate::average_path_length;

/// Anomaly score result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyScore {
    /// Normalized score (near 1.0 = outlier, well below 0.5 = normal)
    pub score: f64,
    /// Average path length across trees
    pub avg_path_length: f64,
    /// Number of trees used
    pub num_trees: usize,
}

impl AnomalyScore {
    /// Create a new anomaly score
    pub fn new(score: f64, avg_path_length: f64, num_trees: usize) -> Self {
        Self {
            score,
            avg_path_length,
            num_trees,
        }
    }

    /// Strictly above `threshold`
    pub fn is_anomaly(&self, threshold: f64) -> bool {
        self.score > threshold
    }
}

/// Calculate anomaly score from path lengths
///
/// Uses the formula: score = 2^(-E(h(x))/c(n))
/// where E(h(x)) is expected path length and c(n) is average path length
/// for the per-tree subsample size `n`.
pub fn calculate_anomaly_score(avg_path_length: f64, subsample_size: usize) -> f64 {
    let expected_path = average_path_length(subsample_size);
    if expected_path == 0.0 {
        return 0.5; // Neutral score
    }
    2.0_f64.powf(-avg_path_length / expected_path)
}

/// Linear-interpolated `q` quantile (`0.0..=1.0`) of unsorted scores
pub(crate) fn quantile(scores: &[f64], q: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
