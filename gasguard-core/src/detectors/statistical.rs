//! Outlier-model channel
//!
//! Adapts one candidate into the model's feature space: a vector over the
//! scaler's feature columns with the candidate's column set to its value and
//! every other column 0.0. The vector is standardized by the paired scaler
//! and classified by the model.
//!
//! The channel is optional. Without a model it never fires, and a scaler or
//! model that disagrees with the candidate (unknown sensor type, dimension
//! mismatch) makes it report not-detected for that reading.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::detection::{DetectionMethod, DetectionResult, Label};
use crate::errors::{ModelError, ModelResult};
use crate::reading::Candidate;
use crate::traits::{Detector, FeatureScaler, OutlierLabel, OutlierModel};

/// Statistical detector backed by an injected scaler/model pair
#[derive(Clone, Default)]
pub struct StatisticalDetector {
    model: Option<(Arc<dyn FeatureScaler>, Arc<dyn OutlierModel>)>,
}

impl StatisticalDetector {
    /// Enabled detector
    pub fn new(scaler: Arc<dyn FeatureScaler>, model: Arc<dyn OutlierModel>) -> Self {
        Self {
            model: Some((scaler, model)),
        }
    }

    /// Detector with no model; never fires
    pub fn disabled() -> Self {
        Self { model: None }
    }

    /// Whether a model is configured
    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Whether the model classifies `value` for `sensor_type` as an outlier
    pub fn detect_statistical(&self, value: f64, sensor_type: &str) -> bool {
        let Some((scaler, model)) = &self.model else {
            return false;
        };

        match score(scaler.as_ref(), model.as_ref(), value, sensor_type) {
            Ok(label) => label.is_outlier(),
            Err(ModelError::UnknownFeature(feature)) => {
                debug!("No model feature for sensor type {}", feature);
                false
            }
            Err(e) => {
                warn!("Statistical detection skipped for {}: {}", sensor_type, e);
                false
            }
        }
    }

    fn label(&self) -> Label {
        if self.is_enabled() {
            Label::IsolationForest
        } else {
            Label::ModelUnavailable
        }
    }
}

fn score(
    scaler: &dyn FeatureScaler,
    model: &dyn OutlierModel,
    value: f64,
    sensor_type: &str,
) -> ModelResult<OutlierLabel> {
    let names = scaler.feature_names();
    let index = names
        .iter()
        .position(|name| name == sensor_type)
        .ok_or_else(|| ModelError::UnknownFeature(sensor_type.to_string()))?;

    if names.len() != model.num_features() {
        return Err(ModelError::DimensionMismatch {
            expected: model.num_features(),
            actual: names.len(),
        });
    }

    let mut features = vec![0.0; names.len()];
    features[index] = value;

    let scaled = scaler.transform(&features)?;
    model.predict(&scaled)
}

impl fmt::Debug for StatisticalDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features = self.model.as_ref().map(|(scaler, _)| scaler.feature_names());
        f.debug_struct("StatisticalDetector")
            .field("enabled", &self.is_enabled())
            .field("features", &features)
            .finish()
    }
}

impl Detector for StatisticalDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Statistical
    }

    fn name(&self) -> &'static str {
        "statistical"
    }

    fn detect(&self, candidate: &Candidate) -> DetectionResult {
        DetectionResult {
            detected: self.detect_statistical(candidate.value(), candidate.sensor_type()),
            label: self.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity scaler over fixed names
    struct Names(Vec<String>);

    impl FeatureScaler for Names {
        fn feature_names(&self) -> &[String] {
            &self.0
        }

        fn transform(&self, features: &[f64]) -> ModelResult<Vec<f64>> {
            Ok(features.to_vec())
        }
    }

    /// Flags any component above a cutoff
    struct Cutoff {
        dims: usize,
        cutoff: f64,
    }

    impl OutlierModel for Cutoff {
        fn num_features(&self) -> usize {
            self.dims
        }

        fn predict(&self, features: &[f64]) -> ModelResult<OutlierLabel> {
            if features.len() != self.dims {
                return Err(ModelError::DimensionMismatch {
                    expected: self.dims,
                    actual: features.len(),
                });
            }
            if features.iter().any(|&f| f > self.cutoff) {
                Ok(OutlierLabel::Outlier)
            } else {
                Ok(OutlierLabel::Inlier)
            }
        }
    }

    fn enabled(names: &[&str], dims: usize) -> StatisticalDetector {
        StatisticalDetector::new(
            Arc::new(Names(names.iter().map(|s| s.to_string()).collect())),
            Arc::new(Cutoff { dims, cutoff: 700.0 }),
        )
    }

    #[test]
    fn disabled_never_fires() {
        let detector = StatisticalDetector::disabled();
        assert!(!detector.detect_statistical(1.0e9, "mq5_01"));

        let candidate = Candidate::new(1.0e9, "mq5_01", chrono::Utc::now()).unwrap();
        assert_eq!(detector.detect(&candidate), DetectionResult::clear(Label::ModelUnavailable));
    }

    #[test]
    fn outlier_maps_to_detected() {
        let detector = enabled(&["mq5_01"], 1);
        assert!(detector.detect_statistical(900.0, "mq5_01"));
        assert!(!detector.detect_statistical(120.0, "mq5_01"));
    }

    #[test]
    fn other_columns_are_zero() {
        let detector = enabled(&["temp_01", "mq5_01"], 2);
        assert!(detector.detect_statistical(900.0, "mq5_01"));
        assert!(!detector.detect_statistical(20.0, "temp_01"));
    }

    #[test]
    fn unknown_sensor_type_is_not_detected() {
        let detector = enabled(&["mq5_01"], 1);
        assert!(!detector.detect_statistical(9000.0, "light_01"));
    }

    #[test]
    fn scaler_model_mismatch_is_not_detected() {
        let detector = enabled(&["mq5_01"], 3);
        assert!(!detector.detect_statistical(9000.0, "mq5_01"));
    }
}
