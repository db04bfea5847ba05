//! Core traits for the detection engine
//!
//! Four seams, each with one job:
//! - [`Detector`]: one detection signal, evaluated per candidate reading
//! - [`ReadingStore`]: the append-only history the windowed detectors read
//! - [`FeatureScaler`] / [`OutlierModel`]: the pre-fitted statistical model,
//!   implemented outside this crate (see `gasguard-ml`) or by test fakes

use crate::detection::{DetectionMethod, DetectionResult};
use crate::errors::{ModelResult, StoreResult};
use crate::reading::{Candidate, Reading};

/// One detection signal of the ensemble
///
/// Implementations must not fail: internal faults are folded into the
/// returned [`DetectionResult`] (typically not-detected with an `ERROR`
/// label) so the other signals still contribute.
pub trait Detector: Send + Sync {
    /// Slot this detector fills in the verdict details
    fn method(&self) -> DetectionMethod;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Evaluate one validated candidate
    fn detect(&self, candidate: &Candidate) -> DetectionResult;
}

/// Append-only log of past readings, grouped by sensor type
pub trait ReadingStore: Send + Sync {
    /// Persist a reading; visible to `recent` once this returns
    fn append(&self, reading: Reading) -> StoreResult<()>;

    /// Last `count` readings of `sensor_type`, oldest first
    fn recent(&self, sensor_type: &str, count: usize) -> StoreResult<Vec<Reading>>;
}

/// Standardization fitted alongside the outlier model
pub trait FeatureScaler: Send + Sync {
    /// Ordered feature columns (canonical sensor type ids)
    fn feature_names(&self) -> &[String];

    /// Map a raw feature vector into the model's input space
    fn transform(&self, features: &[f64]) -> ModelResult<Vec<f64>>;
}

/// Verdict of the outlier model for one scaled vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierLabel {
    /// Consistent with the training distribution
    Inlier,
    /// Isolated from the training distribution
    Outlier,
}

impl OutlierLabel {
    /// Whether the model flagged the vector
    pub fn is_outlier(self) -> bool {
        matches!(self, OutlierLabel::Outlier)
    }
}

/// Pre-fitted outlier scorer
pub trait OutlierModel: Send + Sync {
    /// Input dimension the model was fitted on
    fn num_features(&self) -> usize;

    /// Classify one scaled feature vector
    fn predict(&self, features: &[f64]) -> ModelResult<OutlierLabel>;
}
