//! Rate-of-change detection
//!
//! Velocity is the value change per minute between the oldest and newest
//! reading of the window (`velocity_window + 1` readings):
//!
//! ```text
//! velocity = (newest.value - oldest.value) / minutes(oldest -> newest)
//! ```
//!
//! Identical or out-of-order timestamps give a zero or negative span; the
//! velocity is then 0.0, never infinite. The comparison is strict: exactly
//! `velocity_threshold` is not flagged. The rate is reported in the label
//! either way.

use std::sync::Arc;

use log::warn;

use crate::config::ThresholdSet;
use crate::detection::{DetectionMethod, DetectionResult, Label};
use crate::errors::DetectorFault;
use crate::reading::Candidate;
use crate::time::{elapsed_minutes, rate_per_minute};
use crate::traits::{Detector, ReadingStore};

use super::load_window;

/// Surge detector over the reading store
pub struct VelocityDetector {
    store: Arc<dyn ReadingStore>,
    window: usize,
    threshold: f64,
}

impl VelocityDetector {
    /// Velocity detector over `store` with the set's velocity settings
    pub fn new(store: Arc<dyn ReadingStore>, thresholds: &ThresholdSet) -> Self {
        Self {
            store,
            window: thresholds.velocity_window,
            threshold: thresholds.velocity_threshold,
        }
    }

    /// Configured window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Rate of change over the last `window + 1` readings of `sensor_type`
    pub fn detect_velocity(&self, sensor_type: &str, window: usize) -> DetectionResult {
        match self.try_detect(sensor_type, window) {
            Ok(result) => result,
            Err(fault) => {
                warn!("Velocity detection degraded for {}: {}", sensor_type, fault);
                DetectionResult::clear(Label::Error)
            }
        }
    }

    fn try_detect(&self, sensor_type: &str, window: usize) -> Result<DetectionResult, DetectorFault> {
        let readings = load_window(self.store.as_ref(), sensor_type, window)?;
        let (oldest, newest) = match (readings.first(), readings.last()) {
            (Some(oldest), Some(newest)) if readings.len() >= 2 => (oldest, newest),
            _ => return Ok(DetectionResult::clear(Label::InsufficientData)),
        };

        let minutes = elapsed_minutes(oldest.timestamp, newest.timestamp);
        let velocity = rate_per_minute(newest.value - oldest.value, minutes);
        if !velocity.is_finite() {
            return Err(DetectorFault::NonFinite {
                what: "velocity",
                sensor_type: sensor_type.to_string(),
            });
        }

        if velocity > self.threshold {
            Ok(DetectionResult::detected(Label::HighVelocity(velocity)))
        } else {
            Ok(DetectionResult::clear(Label::Velocity(velocity)))
        }
    }
}

impl Detector for VelocityDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Velocity
    }

    fn name(&self) -> &'static str {
        "velocity"
    }

    fn detect(&self, candidate: &Candidate) -> DetectionResult {
        self.detect_velocity(candidate.sensor_type(), self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::testing::{base_time, minute_series, BrokenStore, VecStore};
    use crate::reading::Reading;
    use crate::sensors::GAS_SENSOR;
    use chrono::Duration;
    use proptest::prelude::*;

    fn two_minutes_apart(first: f64, second: f64) -> Arc<VecStore> {
        Arc::new(VecStore::with(vec![
            Reading::new(base_time(), "test", GAS_SENSOR, first),
            Reading::new(base_time() + Duration::minutes(2), "test", GAS_SENSOR, second),
        ]))
    }

    #[test]
    fn needs_two_readings() {
        let store = Arc::new(VecStore::with(minute_series(GAS_SENSOR, &[100.0])));
        let detector = VelocityDetector::new(store, &ThresholdSet::default());
        assert_eq!(
            detector.detect_velocity(GAS_SENSOR, 3),
            DetectionResult::clear(Label::InsufficientData)
        );
    }

    #[test]
    fn threshold_is_strict() {
        let store = two_minutes_apart(100.0, 200.0);

        let at_default = VelocityDetector::new(store.clone(), &ThresholdSet::default());
        assert_eq!(
            at_default.detect_velocity(GAS_SENSOR, 3),
            DetectionResult::clear(Label::Velocity(50.0))
        );

        let lower = ThresholdSet::default().with_velocity(3, 49.0);
        let at_49 = VelocityDetector::new(store, &lower);
        let result = at_49.detect_velocity(GAS_SENSOR, 3);
        assert_eq!(result, DetectionResult::detected(Label::HighVelocity(50.0)));
        assert_eq!(result.label.to_string(), "HIGH_VELOCITY_50.0_ppm_min");
    }

    #[test]
    fn spans_oldest_to_newest_of_window() {
        // Window 3 reads 4 rows: 110 -> 260 over 3 minutes = 50/min
        let store = Arc::new(VecStore::with(minute_series(GAS_SENSOR, &[0.0, 110.0, 150.0, 200.0, 260.0])));
        let detector = VelocityDetector::new(store, &ThresholdSet::default());
        assert_eq!(detector.detect_velocity(GAS_SENSOR, 3).label, Label::Velocity(50.0));
    }

    #[test]
    fn falling_values_report_negative_rate() {
        let detector = VelocityDetector::new(two_minutes_apart(300.0, 200.0), &ThresholdSet::default());
        assert_eq!(detector.detect_velocity(GAS_SENSOR, 3).label, Label::Velocity(-50.0));
    }

    #[test]
    fn identical_timestamps_give_zero_velocity() {
        let store = Arc::new(VecStore::with(vec![
            Reading::new(base_time(), "test", GAS_SENSOR, 100.0),
            Reading::new(base_time(), "test", GAS_SENSOR, 900.0),
        ]));
        let detector = VelocityDetector::new(store, &ThresholdSet::default());
        assert_eq!(
            detector.detect_velocity(GAS_SENSOR, 3),
            DetectionResult::clear(Label::Velocity(0.0))
        );
    }

    #[test]
    fn out_of_order_timestamps_give_zero_velocity() {
        let store = Arc::new(VecStore::with(vec![
            Reading::new(base_time() + Duration::minutes(5), "test", GAS_SENSOR, 100.0),
            Reading::new(base_time(), "test", GAS_SENSOR, 900.0),
        ]));
        let detector = VelocityDetector::new(store, &ThresholdSet::default());
        assert_eq!(detector.detect_velocity(GAS_SENSOR, 3).label, Label::Velocity(0.0));
    }

    #[test]
    fn store_fault_degrades_to_error() {
        let detector = VelocityDetector::new(Arc::new(BrokenStore), &ThresholdSet::default());
        assert_eq!(detector.detect_velocity(GAS_SENSOR, 3), DetectionResult::clear(Label::Error));
    }

    proptest! {
        #[test]
        fn velocity_always_finite(
            first in -1.0e6f64..1.0e6,
            second in -1.0e6f64..1.0e6,
            offset_ms in -600_000i64..600_000,
        ) {
            let store = Arc::new(VecStore::with(vec![
                Reading::new(base_time(), "test", GAS_SENSOR, first),
                Reading::new(base_time() + Duration::milliseconds(offset_ms), "test", GAS_SENSOR, second),
            ]));
            let result = VelocityDetector::new(store, &ThresholdSet::default()).detect_velocity(GAS_SENSOR, 3);

            match result.label {
                Label::Velocity(v) | Label::HighVelocity(v) => prop_assert!(v.is_finite()),
                other => prop_assert!(false, "unexpected label {:?}", other),
            }
        }
    }
}
