//! Readings and evaluation candidates

use serde::{Deserialize, Serialize};

use crate::errors::{IngestError, IngestResult};
use crate::time::Timestamp;

/// One timestamped scalar measurement, as held by the reading store
///
/// Immutable once appended. `is_anomaly` is attached at the moment of
/// storage from the verdict computed for this reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the measurement was taken (UTC)
    pub timestamp: Timestamp,
    /// Reporting device
    pub sensor_id: String,
    /// Canonical sensor type id (e.g. `mq5_01`)
    pub sensor_type: String,
    /// Measured value (ppm for gas sensors)
    pub value: f64,
    /// Final verdict flag
    pub is_anomaly: bool,
}

impl Reading {
    /// Unflagged reading
    pub fn new(
        timestamp: Timestamp,
        sensor_id: impl Into<String>,
        sensor_type: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            timestamp,
            sensor_id: sensor_id.into(),
            sensor_type: sensor_type.into(),
            value,
            is_anomaly: false,
        }
    }

    /// Attach the anomaly flag computed for this reading
    pub fn with_anomaly(mut self, is_anomaly: bool) -> Self {
        self.is_anomaly = is_anomaly;
        self
    }
}

/// A reading that has passed input validation and awaits a verdict
///
/// Construction is the only place non-finite values and blank sensor types
/// are rejected; everything downstream may rely on both.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    value: f64,
    sensor_type: String,
    timestamp: Timestamp,
}

impl Candidate {
    /// Validate a value for evaluation
    pub fn new(value: f64, sensor_type: impl Into<String>, timestamp: Timestamp) -> IngestResult<Self> {
        let sensor_type = sensor_type.into();
        if sensor_type.trim().is_empty() {
            return Err(IngestError::MissingSensorType);
        }
        if !value.is_finite() {
            return Err(IngestError::NonFiniteValue);
        }

        Ok(Self {
            value,
            sensor_type,
            timestamp,
        })
    }

    /// Measured value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Canonical sensor type id
    pub fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    /// Measurement time
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Turn the candidate into the reading that gets persisted
    pub fn into_reading(self, sensor_id: impl Into<String>, is_anomaly: bool) -> Reading {
        Reading {
            timestamp: self.timestamp,
            sensor_id: sensor_id.into(),
            sensor_type: self.sensor_type,
            value: self.value,
            is_anomaly,
        }
    }
}
