//! Training pipeline: reading log → feature matrix → fitted artifact

use std::collections::BTreeMap;

use chrono::Utc;
use gasguard_core::sensors::DEFAULT_MODEL_FEATURES;
use gasguard_core::{FeatureScaler, Reading, Timestamp};
use log::{debug, info};

use crate::{ForestConfig, IsolationForest, MLError, MLResult, ModelArtifact, Sample, StandardScaler};

/// Readings pivoted to one row per distinct timestamp
///
/// Columns follow `feature_names`. Several readings of one type at the same
/// timestamp are averaged; a type with no reading at a timestamp is 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names (canonical sensor type ids)
    pub feature_names: Vec<String>,
    /// Row timestamps, ascending
    pub timestamps: Vec<Timestamp>,
    /// One row per timestamp
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Pivot `readings` onto `features`
    ///
    /// Readings of other sensor types and non-finite values are skipped.
    pub fn pivot(readings: &[Reading], features: &[String]) -> Self {
        let width = features.len();
        let mut cells: BTreeMap<Timestamp, Vec<(f64, usize)>> = BTreeMap::new();
        let mut skipped = 0usize;

        for reading in readings {
            let Some(column) = features.iter().position(|f| *f == reading.sensor_type) else {
                continue;
            };
            if !reading.value.is_finite() {
                skipped += 1;
                continue;
            }
            let row = cells
                .entry(reading.timestamp)
                .or_insert_with(|| vec![(0.0, 0); width]);
            row[column].0 += reading.value;
            row[column].1 += 1;
        }

        if skipped > 0 {
            debug!("Skipped {} non-finite readings while pivoting", skipped);
        }

        let (timestamps, rows): (Vec<_>, Vec<_>) = cells
            .into_iter()
            .map(|(timestamp, row)| {
                let values: Vec<f64> = row
                    .into_iter()
                    .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f64 })
                    .collect();
                (timestamp, values)
            })
            .unzip();

        Self {
            feature_names: features.to_vec(),
            timestamps,
            rows,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fits a scaler and forest from a reading log
#[derive(Debug, Clone)]
pub struct Trainer {
    /// Feature columns, in model order
    pub features: Vec<String>,
    /// Forest settings
    pub forest: ForestConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            features: DEFAULT_MODEL_FEATURES.iter().map(|f| f.to_string()).collect(),
            forest: ForestConfig::default(),
        }
    }
}

impl Trainer {
    /// Trainer over custom feature columns
    pub fn new(features: Vec<String>, forest: ForestConfig) -> Self {
        Self { features, forest }
    }

    /// Pivot, standardize and fit
    pub fn train(&self, readings: &[Reading]) -> MLResult<ModelArtifact> {
        if self.features.is_empty() {
            return Err(MLError::InvalidFeature("no feature columns".to_string()));
        }

        let matrix = FeatureMatrix::pivot(readings, &self.features);
        if matrix.is_empty() {
            return Err(MLError::InsufficientData);
        }
        info!(
            "Training on {} rows over features {:?}",
            matrix.len(),
            matrix.feature_names
        );

        let scaler = StandardScaler::fit(matrix.feature_names.clone(), &matrix.rows)?;
        let samples = matrix
            .rows
            .iter()
            .map(|row| Sample::new(&scaler.transform(row)?))
            .collect::<MLResult<Vec<_>>>()?;

        let mut forest = IsolationForest::new(self.forest.clone())?;
        forest.fit(&samples)?;

        let stats = forest.stats();
        info!(
            "Fitted {} trees ({} nodes, subsample {}), threshold {:.4}",
            stats.num_trees, stats.total_nodes, stats.subsample_size, stats.threshold
        );

        ModelArtifact::new(Utc::now(), scaler, forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn features(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pivot_one_row_per_timestamp() {
        let readings = vec![
            Reading::new(t(10), "esp32", "mq5_01", 120.0),
            Reading::new(t(0), "esp32", "mq5_01", 100.0),
            Reading::new(t(0), "esp32", "temp_01", 21.5),
            Reading::new(t(10), "esp32", "mq5_01", 140.0),
            Reading::new(t(20), "esp32", "temp_01", 22.0),
            Reading::new(t(20), "esp32", "light_01", 300.0),
        ];

        let matrix = FeatureMatrix::pivot(&readings, &features(&["mq5_01", "temp_01"]));

        assert_eq!(matrix.timestamps, vec![t(0), t(10), t(20)]);
        assert_eq!(
            matrix.rows,
            vec![vec![100.0, 21.5], vec![130.0, 0.0], vec![0.0, 22.0]]
        );
    }

    #[test]
    fn pivot_ignores_other_types_and_non_finite() {
        let readings = vec![
            Reading::new(t(0), "esp32", "light_01", 300.0),
            Reading::new(t(5), "esp32", "mq5_01", f64::NAN),
        ];
        let matrix = FeatureMatrix::pivot(&readings, &features(&["mq5_01"]));
        assert!(matrix.is_empty());
    }

    #[test]
    fn empty_log_is_insufficient() {
        let readings = vec![Reading::new(t(0), "esp32", "temp_01", 20.0)];
        assert!(matches!(
            Trainer::default().train(&readings),
            Err(MLError::InsufficientData)
        ));
    }

    #[test]
    fn trains_on_gas_readings() {
        let readings: Vec<Reading> = (0..120)
            .map(|i| Reading::new(t(i * 5), "esp32", "mq5_01", 150.0 + (i % 15) as f64))
            .collect();

        let trainer = Trainer {
            forest: ForestConfig {
                num_trees: 30,
                ..ForestConfig::default()
            },
            ..Trainer::default()
        };
        let artifact = trainer.train(&readings).unwrap();

        assert_eq!(artifact.feature_names, vec!["mq5_01".to_string()]);
        assert_eq!(artifact.forest.stats().num_trees, 30);
        assert_eq!(artifact.forest.stats().subsample_size, 120);
        assert!(artifact.predict("mq5_01", 2_000.0).unwrap());
    }
}
