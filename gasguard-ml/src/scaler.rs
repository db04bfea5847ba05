//! Per-feature standardization
//!
//! `z = (x - mean) / scale`, with `scale` the population standard deviation
//! of the training column. A constant column gets scale 1.0 so it maps to
//! `x - mean` instead of dividing by zero.

use gasguard_core::{FeatureScaler, ModelError, ModelResult};
use serde::{Deserialize, Serialize};

use crate::{MLError, MLResult};

/// Standard scaler fitted on a training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit column statistics over `rows`; every row has one value per name
    pub fn fit(feature_names: Vec<String>, rows: &[Vec<f64>]) -> MLResult<Self> {
        if feature_names.is_empty() {
            return Err(MLError::InvalidFeature("no feature columns".to_string()));
        }
        if rows.is_empty() {
            return Err(MLError::InsufficientData);
        }

        let width = feature_names.len();
        if let Some(row) = rows.iter().find(|row| row.len() != width) {
            return Err(MLError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((scale, mean), value) in scales.iter_mut().zip(&means).zip(row) {
                *scale += (value - mean).powi(2);
            }
        }
        for scale in &mut scales {
            let std_dev = (*scale / n).sqrt();
            *scale = if std_dev > 0.0 && std_dev.is_finite() { std_dev } else { 1.0 };
        }

        if means.iter().any(|m| !m.is_finite()) {
            return Err(MLError::InvalidFeature("column mean is not finite".to_string()));
        }

        Ok(Self {
            feature_names,
            means,
            scales,
        })
    }

    /// Column means
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Column divisors
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Check a deserialized scaler before it is used
    pub fn check_structure(&self) -> MLResult<()> {
        let width = self.feature_names.len();
        if width == 0 {
            return Err(MLError::NotFitted);
        }
        for len in [self.means.len(), self.scales.len()] {
            if len != width {
                return Err(MLError::DimensionMismatch { expected: width, actual: len });
            }
        }
        if self.scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) || self.means.iter().any(|m| !m.is_finite()) {
            return Err(MLError::InvalidFeature("scaler statistics are not finite".to_string()));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, features: &[f64]) -> ModelResult<Vec<f64>> {
        if self.means.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if features.len() != self.means.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.means.len(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn standardizes_columns() {
        let rows = vec![vec![100.0, 20.0], vec![200.0, 20.0], vec![300.0, 20.0]];
        let scaler = StandardScaler::fit(names(&["mq5_01", "temp_01"]), &rows).unwrap();

        assert_eq!(scaler.means(), &[200.0, 20.0]);
        // Population std of 100/200/300
        assert!((scaler.scales()[0] - 81.649_658_092_772_6).abs() < 1e-9);
        // Constant column
        assert_eq!(scaler.scales()[1], 1.0);

        let z = scaler.transform(&[200.0, 25.0]).unwrap();
        assert_eq!(z, vec![0.0, 5.0]);
    }

    #[test]
    fn transform_checks_width() {
        let scaler = StandardScaler::fit(names(&["mq5_01"]), &[vec![1.0], vec![3.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(ModelError::DimensionMismatch { expected: 1, actual: 2 })
        ));
        assert_eq!(scaler.feature_names(), &["mq5_01".to_string()]);
    }

    #[test]
    fn fit_rejects_bad_input() {
        assert!(matches!(
            StandardScaler::fit(names(&["mq5_01"]), &[]),
            Err(MLError::InsufficientData)
        ));
        assert!(matches!(
            StandardScaler::fit(names(&["a", "b"]), &[vec![1.0]]),
            Err(MLError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(StandardScaler::fit(Vec::new(), &[vec![1.0]]).is_err());
    }

    #[test]
    fn structure_check_catches_truncated_stats() {
        let mut scaler = StandardScaler::fit(names(&["a", "b"]), &[vec![1.0, 2.0], vec![3.0, 5.0]]).unwrap();
        assert!(scaler.check_structure().is_ok());
        scaler.scales.pop();
        assert!(matches!(scaler.check_structure(), Err(MLError::DimensionMismatch { .. })));
    }
}
