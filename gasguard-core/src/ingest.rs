//! Ingestion boundary
//!
//! Turns a raw request into a validated candidate, evaluates it and
//! persists the reading with its anomaly flag. Requests are rejected here,
//! before the engine sees them, when a field is missing or unusable.
//!
//! Readings of one sensor type are serialized by a per-type ordering lock
//! held from evaluation through append, so every verdict is computed
//! against the history left by the previous reading of that type. Different
//! sensor types proceed in parallel.
//!
//! ```rust
//! use std::sync::Arc;
//! use gasguard_core::{EnsembleDetector, IngestRequest, Ingestor, MemoryStore, SystemClock, ThresholdSet};
//!
//! let engine = EnsembleDetector::new(ThresholdSet::default(), Arc::new(MemoryStore::new()));
//! let ingestor = Ingestor::new(engine, Arc::new(SystemClock));
//!
//! let request: IngestRequest = serde_json::from_str(r#"{"sensor_type": "MQ-5", "value": "1250"}"#)?;
//! let outcome = ingestor.ingest(request)?;
//! assert_eq!(outcome.reading.sensor_type, "mq5_01");
//! assert!(outcome.reading.is_anomaly);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::detection::Verdict;
use crate::ensemble::EnsembleDetector;
use crate::errors::{IngestError, IngestResult};
use crate::reading::{Candidate, Reading};
use crate::sensors;
use crate::time::{TimeSource, Timestamp};

/// Sensor id recorded when the request carries none
pub const UNKNOWN_SENSOR_ID: &str = "unknown";

/// Raw reading as submitted by a field device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Display name or canonical id
    pub sensor_type: Option<String>,
    /// JSON number or numeric string
    pub value: Option<Value>,
    /// Reporting device
    pub sensor_id: Option<String>,
    /// Measurement time; defaults to now
    pub timestamp: Option<Timestamp>,
}

impl IngestRequest {
    /// Request for `value` from `sensor_type`
    pub fn new(sensor_type: impl Into<String>, value: f64) -> Self {
        Self {
            sensor_type: Some(sensor_type.into()),
            value: Some(Value::from(value)),
            ..Self::default()
        }
    }

    /// Set the reporting device
    pub fn with_sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    /// Set the measurement time
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Evaluated and persisted reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    /// Combined verdict
    pub verdict: Verdict,
    /// Row that was appended to the store
    pub reading: Reading,
}

/// Validates, evaluates and persists incoming readings
pub struct Ingestor {
    engine: EnsembleDetector,
    clock: Arc<dyn TimeSource>,
    ordering: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Ingestor {
    /// Ingestor over `engine`, stamping undated requests from `clock`
    pub fn new(engine: EnsembleDetector, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            engine,
            clock,
            ordering: Mutex::new(HashMap::new()),
        }
    }

    /// Engine readings are evaluated with
    pub fn engine(&self) -> &EnsembleDetector {
        &self.engine
    }

    /// Validate, evaluate and append one reading
    pub fn ingest(&self, request: IngestRequest) -> IngestResult<IngestOutcome> {
        let sensor_type = match request.sensor_type.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => sensors::resolve(name)
                .map(|kind| kind.id)
                .ok_or_else(|| IngestError::UnsupportedSensorType(name.to_string()))?,
            _ => return Err(IngestError::MissingSensorType),
        };

        let value = parse_value(request.value.as_ref())?;

        let sensor_id = match request.sensor_id {
            Some(id) if id.trim().is_empty() => return Err(IngestError::EmptySensorId),
            Some(id) => id,
            None => UNKNOWN_SENSOR_ID.to_string(),
        };

        let timestamp = request.timestamp.unwrap_or_else(|| self.clock.now());
        let candidate = Candidate::new(value, sensor_type, timestamp)?;

        let lock = self.ordering_lock(sensor_type)?;
        let _held = lock
            .lock()
            .map_err(|_| IngestError::LockPoisoned(sensor_type.to_string()))?;
        debug!("Ordering lock held for {}", sensor_type);

        let verdict = self.engine.evaluate_candidate(&candidate);
        let reading = candidate.into_reading(sensor_id, verdict.anomaly_detected);
        self.engine.store().append(reading.clone())?;

        Ok(IngestOutcome { verdict, reading })
    }

    fn ordering_lock(&self, sensor_type: &str) -> IngestResult<Arc<Mutex<()>>> {
        let mut locks = self
            .ordering
            .lock()
            .map_err(|_| IngestError::LockPoisoned(sensor_type.to_string()))?;
        Ok(locks.entry(sensor_type.to_string()).or_default().clone())
    }
}

/// Accept a JSON number or a numeric string
pub fn parse_value(value: Option<&Value>) -> IngestResult<f64> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(IngestError::MissingValue),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| IngestError::NonNumericValue(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| IngestError::NonNumericValue(s.clone()))?,
        Some(other) => return Err(IngestError::NonNumericValue(other.to_string())),
    };

    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(IngestError::NonFiniteValue)
    }
}
