//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use gasguard_core::{
    Candidate, DetectionMethod, DetectionResult, Detector, Label, MemoryStore, Reading,
    ReadingStore, Timestamp,
};

pub const GAS: &str = "mq5_01";

/// Fixed start of every generated series
pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap()
}

/// Readings spaced `step_secs` apart starting at `t0`
pub fn series(sensor_type: &str, values: &[f64], step_secs: i64) -> Vec<Reading> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            Reading::new(t0() + Duration::seconds(step_secs * i as i64), "fixture", sensor_type, value)
        })
        .collect()
}

/// Memory store holding one gas series, one reading per minute
pub fn gas_store(values: &[f64]) -> Arc<MemoryStore> {
    let store = MemoryStore::with_readings(series(GAS, values, 60)).unwrap();
    Arc::new(store)
}

/// Timestamp right after the last reading of a per-minute series
pub fn after(values: &[f64]) -> Timestamp {
    t0() + Duration::minutes(values.len() as i64)
}

/// Detector that always returns the same result for one method
pub struct Fixed {
    pub method: DetectionMethod,
    pub result: DetectionResult,
}

impl Fixed {
    pub fn fires(method: DetectionMethod, tag: &str) -> Box<dyn Detector> {
        Box::new(Self {
            method,
            result: DetectionResult::detected(Label::Custom(tag.to_string())),
        })
    }

    pub fn quiet(method: DetectionMethod) -> Box<dyn Detector> {
        Box::new(Self {
            method,
            result: DetectionResult::clear(Label::Custom("QUIET".to_string())),
        })
    }
}

impl Detector for Fixed {
    fn method(&self) -> DetectionMethod {
        self.method
    }

    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&self, _candidate: &Candidate) -> DetectionResult {
        self.result.clone()
    }
}

/// Store that refuses appends, for checking the engine never writes
pub struct ReadOnlyStore {
    pub inner: Arc<MemoryStore>,
}

impl ReadingStore for ReadOnlyStore {
    fn append(&self, _reading: Reading) -> gasguard_core::StoreResult<()> {
        panic!("engine must not append during evaluation");
    }

    fn recent(&self, sensor_type: &str, count: usize) -> gasguard_core::StoreResult<Vec<Reading>> {
        self.inner.recent(sensor_type, count)
    }
}
