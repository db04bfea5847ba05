//! Versioned on-disk model artifact
//!
//! One JSON document holding the scaler and the forest together, so the
//! two can never be deployed out of step. Loading checks the format version,
//! that scaler and forest agree on the feature columns, and that every tree
//! is well-formed before anything is scored.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use gasguard_core::{FeatureScaler, ModelError, StatisticalDetector, Timestamp};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{AnomalyScore, IsolationForest, MLError, MLResult, Sample, StandardScaler};

/// Artifact layout version this build reads and writes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Trained scaler + forest pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layout version
    pub format_version: u32,
    /// When training finished
    pub trained_at: Timestamp,
    /// Feature columns, in model order
    pub feature_names: Vec<String>,
    /// Standardization applied before scoring
    pub scaler: StandardScaler,
    /// Fitted outlier model
    pub forest: IsolationForest,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
}

impl ModelArtifact {
    /// Pair a fitted scaler and forest
    pub fn new(trained_at: Timestamp, scaler: StandardScaler, forest: IsolationForest) -> MLResult<Self> {
        let artifact = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at,
            feature_names: scaler.feature_names().to_vec(),
            scaler,
            forest,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check version, feature agreement and tree structure
    pub fn validate(&self) -> MLResult<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(MLError::VersionMismatch {
                expected: ARTIFACT_FORMAT_VERSION,
                found: self.format_version,
            });
        }
        if self.scaler.feature_names() != self.feature_names.as_slice() {
            return Err(MLError::FeatureMismatch(format!(
                "artifact lists {:?}, scaler was fitted on {:?}",
                self.feature_names,
                self.scaler.feature_names()
            )));
        }
        self.scaler.check_structure()?;
        self.forest.check_structure()?;
        if self.forest.num_features() != self.feature_names.len() {
            return Err(MLError::FeatureMismatch(format!(
                "forest expects {} features, artifact lists {}",
                self.forest.num_features(),
                self.feature_names.len()
            )));
        }
        Ok(())
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> MLResult<()> {
        let path = path.as_ref();
        let io_err = |source| MLError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    /// Read and validate an artifact
    pub fn load(path: impl AsRef<Path>) -> MLResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| MLError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse and validate an artifact document
    pub fn from_json_str(json: &str) -> MLResult<Self> {
        // Version first, so an old layout reports a version error rather than a shape error
        let header: Header = serde_json::from_str(json)?;
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(MLError::VersionMismatch {
                expected: ARTIFACT_FORMAT_VERSION,
                found: header.format_version,
            });
        }

        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Score `value` as a reading of `sensor_type`; other columns are 0.0
    pub fn score(&self, sensor_type: &str, value: f64) -> MLResult<AnomalyScore> {
        let index = self
            .feature_names
            .iter()
            .position(|name| name == sensor_type)
            .ok_or_else(|| ModelError::UnknownFeature(sensor_type.to_string()))?;

        let mut features = vec![0.0; self.feature_names.len()];
        features[index] = value;

        let scaled = self.scaler.transform(&features)?;
        self.forest.anomaly_score(&Sample::new(&scaled)?)
    }

    /// Whether the forest classifies `value` as an outlier
    pub fn predict(&self, sensor_type: &str, value: f64) -> MLResult<bool> {
        Ok(self.score(sensor_type, value)?.is_anomaly(self.forest.threshold()))
    }

    /// Enabled statistical detector backed by this artifact
    pub fn into_detector(self) -> StatisticalDetector {
        StatisticalDetector::new(Arc::new(self.scaler), Arc::new(self.forest))
    }
}

/// Statistical detector from an artifact file
///
/// A missing, unreadable or inconsistent artifact disables the channel
/// instead of failing startup.
pub fn load_statistical_detector(path: impl AsRef<Path>) -> StatisticalDetector {
    let path = path.as_ref();
    match ModelArtifact::load(path) {
        Ok(artifact) => {
            info!(
                "Loaded outlier model from {} (trained {}, features {:?})",
                path.display(),
                artifact.trained_at,
                artifact.feature_names
            );
            artifact.into_detector()
        }
        Err(e) => {
            warn!("Statistical detection disabled: {}", e);
            StatisticalDetector::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ForestConfig;
    use chrono::{TimeZone, Utc};

    fn artifact() -> ModelArtifact {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![100.0 + (i % 16) as f64]).collect();
        let scaler = StandardScaler::fit(vec!["mq5_01".to_string()], &rows).unwrap();
        let samples: Vec<Sample> = rows
            .iter()
            .map(|r| Sample::new(&scaler.transform(r).unwrap()).unwrap())
            .collect();

        let mut forest = IsolationForest::new(ForestConfig {
            num_trees: 20,
            ..ForestConfig::default()
        })
        .unwrap();
        forest.fit(&samples).unwrap();

        let trained_at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        ModelArtifact::new(trained_at, scaler, forest).unwrap()
    }

    #[test]
    fn json_document_reloads_identically() {
        let original = artifact();
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(ModelArtifact::from_json_str(&json).unwrap(), original);
    }

    #[test]
    fn version_checked_before_shape() {
        let err = ModelArtifact::from_json_str(r#"{"format_version": 7}"#).unwrap_err();
        assert!(matches!(err, MLError::VersionMismatch { expected: 1, found: 7 }));
    }

    #[test]
    fn feature_mismatch_rejected() {
        let mut broken = artifact();
        broken.feature_names = vec!["temp_01".to_string()];
        let json = serde_json::to_string(&broken).unwrap();
        assert!(matches!(
            ModelArtifact::from_json_str(&json),
            Err(MLError::FeatureMismatch(_))
        ));
    }

    #[test]
    fn unknown_sensor_type_is_a_model_error() {
        let err = artifact().predict("temp_01", 20.0).unwrap_err();
        assert!(matches!(err, MLError::Model(ModelError::UnknownFeature(_))));
    }

    #[test]
    fn far_values_are_outliers() {
        let artifact = artifact();
        assert!(artifact.predict("mq5_01", 10_000.0).unwrap());
        assert!(!artifact.predict("mq5_01", 107.0).unwrap());
    }

    #[test]
    fn missing_file_disables_detector() {
        let detector = load_statistical_detector("/nonexistent/gasguard/model.json");
        assert!(!detector.is_enabled());
    }
}
