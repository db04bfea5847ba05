//! Reading-log summaries and model probes
//!
//! Used offline to check what a log looks like before training and where a
//! trained model puts its decision boundary.

use std::fmt;

use gasguard_core::Reading;
use serde::Serialize;

use crate::{MLResult, ModelArtifact};

/// Probe values (ppm) covering the normal band through gross outliers
pub const DEFAULT_SWEEP_VALUES: &[f64] = &[
    50.0, 100.0, 150.0, 200.0, 250.0, 300.0, 400.0, 500.0, 600.0, 700.0, 1_000.0, 5_000.0, 10_000.0,
    50_000.0, 100_000.0,
];

/// Descriptive statistics of a value set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueStats {
    /// Number of values
    pub count: usize,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0.0 for a single value
    pub std: f64,
}

impl ValueStats {
    /// Statistics of `values`; `None` when empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self { count, min, max, mean, std })
    }
}

impl fmt::Display for ValueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} min={:.2} max={:.2} mean={:.2} std={:.2}",
            self.count, self.min, self.max, self.mean, self.std
        )
    }
}

/// Breakdown of one sensor type in a reading log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    /// Sensor type summarized
    pub sensor_type: String,
    /// Rows of this type (finite values only)
    pub total: usize,
    /// Rows flagged normal
    pub normal: usize,
    /// Rows flagged anomalous
    pub anomalous: usize,
    /// `anomalous / total`, 0.0 for an empty log
    pub anomaly_rate: f64,
    /// Statistics over every row
    pub all: Option<ValueStats>,
    /// Statistics over normal rows
    pub normal_values: Option<ValueStats>,
    /// Statistics over anomalous rows
    pub anomalous_values: Option<ValueStats>,
}

impl LogSummary {
    /// Summarize the finite-valued rows of `sensor_type`
    pub fn from_readings(readings: &[Reading], sensor_type: &str) -> Self {
        let (mut all, mut normal, mut anomalous) = (Vec::new(), Vec::new(), Vec::new());
        for reading in readings
            .iter()
            .filter(|r| r.sensor_type == sensor_type && r.value.is_finite())
        {
            all.push(reading.value);
            if reading.is_anomaly {
                anomalous.push(reading.value);
            } else {
                normal.push(reading.value);
            }
        }

        let anomaly_rate = if all.is_empty() {
            0.0
        } else {
            anomalous.len() as f64 / all.len() as f64
        };

        Self {
            sensor_type: sensor_type.to_string(),
            total: all.len(),
            normal: normal.len(),
            anomalous: anomalous.len(),
            anomaly_rate,
            all: ValueStats::from_values(&all),
            normal_values: ValueStats::from_values(&normal),
            anomalous_values: ValueStats::from_values(&anomalous),
        }
    }
}

impl fmt::Display for LogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} rows, {} normal, {} anomalous ({:.1}%)",
            self.sensor_type,
            self.total,
            self.normal,
            self.anomalous,
            self.anomaly_rate * 100.0
        )?;
        let sections = [
            ("all", &self.all),
            ("normal", &self.normal_values),
            ("anomalous", &self.anomalous_values),
        ];
        for (name, stats) in sections {
            match stats {
                Some(stats) => writeln!(f, "  {name:<10} {stats}")?,
                None => writeln!(f, "  {name:<10} -")?,
            }
        }
        Ok(())
    }
}

/// Model verdict for one probe value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Probe value
    pub value: f64,
    /// Anomaly score
    pub score: f64,
    /// Score above the artifact's threshold
    pub outlier: bool,
}

/// Score each of `values` as a reading of `sensor_type`
pub fn sweep(artifact: &ModelArtifact, sensor_type: &str, values: &[f64]) -> MLResult<Vec<SweepPoint>> {
    let threshold = artifact.forest.threshold();
    values
        .iter()
        .map(|&value| -> MLResult<SweepPoint> {
            let score = artifact.score(sensor_type, value)?;
            Ok(SweepPoint {
                value,
                score: score.score,
                outlier: score.is_anomaly(threshold),
            })
        })
        .collect()
}
