//! Detection Signals
//!
//! ## Overview
//!
//! The ensemble runs four independent detectors per reading. None of them
//! sees another's result, and none of them can fail the evaluation:
//!
//! | detector                  | input                         | fires on                       |
//! |---------------------------|-------------------------------|--------------------------------|
//! | [`ThresholdDetector`]     | the candidate value           | value >= warning level         |
//! | [`TrendDetector`]         | last `trend_window + 1` rows  | run of increases or 3-pt rise  |
//! | [`VelocityDetector`]      | last `velocity_window + 1`    | rate > limit (per minute)      |
//! | [`StatisticalDetector`]   | the candidate value           | outlier model says outlier     |
//!
//! ## History
//!
//! The windowed detectors read the reading store for the candidate's sensor
//! type. The candidate itself is not in the store yet: the ingestion boundary
//! persists it only after the verdict is known, so windows cover the readings
//! that came before it.
//!
//! ## Fault isolation
//!
//! A store failure or a non-finite value in the history becomes a
//! [`DetectorFault`](crate::errors::DetectorFault) inside the detector, is
//! logged with `warn!`, and is reported as not-detected with the `ERROR`
//! label. Missing history is not a fault; it is `INSUFFICIENT_DATA`.

mod statistical;
mod threshold;
mod trend;
mod velocity;

pub use statistical::StatisticalDetector;
pub use threshold::ThresholdDetector;
pub use trend::TrendDetector;
pub use velocity::VelocityDetector;

use crate::errors::DetectorFault;
use crate::reading::Reading;
use crate::traits::ReadingStore;

/// Read `window + 1` readings and reject non-finite values
pub(crate) fn load_window(
    store: &dyn ReadingStore,
    sensor_type: &str,
    window: usize,
) -> Result<Vec<Reading>, DetectorFault> {
    let readings = store.recent(sensor_type, window.saturating_add(1))?;
    if readings.iter().any(|r| !r.value.is_finite()) {
        return Err(DetectorFault::NonFinite {
            what: "stored value",
            sensor_type: sensor_type.to_string(),
        });
    }
    Ok(readings)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stores for detector tests

    use std::sync::Mutex;

    use chrono::{Duration, TimeZone, Utc};

    use crate::errors::{StoreError, StoreResult};
    use crate::reading::Reading;
    use crate::time::Timestamp;
    use crate::traits::ReadingStore;

    pub fn base_time() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    /// Readings one minute apart starting at `base_time`
    pub fn minute_series(sensor_type: &str, values: &[f64]) -> Vec<Reading> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Reading::new(base_time() + Duration::minutes(i as i64), "test", sensor_type, v))
            .collect()
    }

    /// Flat store without a per-type index
    #[derive(Default)]
    pub struct VecStore {
        rows: Mutex<Vec<Reading>>,
    }

    impl VecStore {
        pub fn with(rows: Vec<Reading>) -> Self {
            Self { rows: Mutex::new(rows) }
        }
    }

    impl ReadingStore for VecStore {
        fn append(&self, reading: Reading) -> StoreResult<()> {
            self.rows.lock().map_err(|_| StoreError::LockPoisoned)?.push(reading);
            Ok(())
        }

        fn recent(&self, sensor_type: &str, count: usize) -> StoreResult<Vec<Reading>> {
            let rows = self.rows.lock().map_err(|_| StoreError::LockPoisoned)?;
            let matching: Vec<Reading> = rows.iter().filter(|r| r.sensor_type == sensor_type).cloned().collect();
            let skip = matching.len().saturating_sub(count);
            Ok(matching.into_iter().skip(skip).collect())
        }
    }

    /// Store whose reads always fail
    pub struct BrokenStore;

    impl ReadingStore for BrokenStore {
        fn append(&self, _reading: Reading) -> StoreResult<()> {
            Err(StoreError::LockPoisoned)
        }

        fn recent(&self, _sensor_type: &str, _count: usize) -> StoreResult<Vec<Reading>> {
            Err(StoreError::Malformed {
                row: 3,
                reason: "value 'abc' is not a number".to_string(),
            })
        }
    }
}
