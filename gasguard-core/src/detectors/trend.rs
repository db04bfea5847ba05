//! Trend Detection over Recent History
//!
//! ## Signals
//!
//! A trend is sustained upward movement across the last few readings of one
//! sensor type. Two signals are checked, in priority order:
//!
//! 1. **Consecutive increases**: the terminal run of strict increases (the
//!    contiguous rising run ending at the newest reading) is at least
//!    `consecutive_increases` long. Any flat or falling step resets the run.
//! 2. **Relative rise**: over the newest three readings,
//!    `(last - first) / first >= trend_threshold`.
//!
//! ```text
//! values  100  120  140  160  180
//! run       0    1    2    3    4   -> TREND_CONSECUTIVE_4
//!
//! values  100  100  100  100  115
//! run       0    0    0    0    1   -> 3-pt rise 15%  -> TREND_INCREASE_15.0%
//! ```
//!
//! ## Guards
//!
//! - Fewer than `window` readings: `INSUFFICIENT_DATA`, not detected.
//! - Relative rise needs `window >= 3` and three readings; a leading zero
//!   makes the ratio undefined and the sub-check is skipped.
//! - Store failures and non-finite history degrade to `ERROR`.

use std::sync::Arc;

use log::warn;

use crate::config::ThresholdSet;
use crate::detection::{DetectionMethod, DetectionResult, Label};
use crate::errors::DetectorFault;
use crate::reading::Candidate;
use crate::traits::{Detector, ReadingStore};

use super::load_window;

/// Readings spanned by the relative-rise check
pub const RISE_SPAN: usize = 3;

/// Sustained-rise detector over the reading store
pub struct TrendDetector {
    store: Arc<dyn ReadingStore>,
    window: usize,
    threshold: f64,
    consecutive_increases: usize,
}

impl TrendDetector {
    /// Trend detector over `store` with the set's trend settings
    pub fn new(store: Arc<dyn ReadingStore>, thresholds: &ThresholdSet) -> Self {
        Self {
            store,
            window: thresholds.trend_window,
            threshold: thresholds.trend_threshold,
            consecutive_increases: thresholds.consecutive_increases,
        }
    }

    /// Configured window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Inspect the last `window + 1` readings of `sensor_type`
    ///
    /// Never fails; faults surface as not-detected with the `ERROR` label.
    pub fn detect_trend(&self, sensor_type: &str, window: usize) -> DetectionResult {
        match self.try_detect(sensor_type, window) {
            Ok(result) => result,
            Err(fault) => {
                warn!("Trend detection degraded for {}: {}", sensor_type, fault);
                DetectionResult::clear(Label::Error)
            }
        }
    }

    fn try_detect(&self, sensor_type: &str, window: usize) -> Result<DetectionResult, DetectorFault> {
        let readings = load_window(self.store.as_ref(), sensor_type, window)?;
        if readings.len() < window {
            return Ok(DetectionResult::clear(Label::InsufficientData));
        }

        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();

        let run = terminal_increase_run(&values);
        if run >= self.consecutive_increases {
            return Ok(DetectionResult::detected(Label::TrendConsecutive(run)));
        }

        if window >= RISE_SPAN {
            if let Some(ratio) = relative_rise(&values[values.len().saturating_sub(RISE_SPAN)..]) {
                if !ratio.is_finite() {
                    return Err(DetectorFault::NonFinite {
                        what: "relative rise",
                        sensor_type: sensor_type.to_string(),
                    });
                }
                if ratio >= self.threshold {
                    return Ok(DetectionResult::detected(Label::TrendIncrease(ratio)));
                }
            }
        }

        Ok(DetectionResult::clear(Label::NoTrend))
    }
}

impl Detector for TrendDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Trend
    }

    fn name(&self) -> &'static str {
        "trend"
    }

    fn detect(&self, candidate: &Candidate) -> DetectionResult {
        self.detect_trend(candidate.sensor_type(), self.window)
    }
}

/// Length of the run of strict increases ending at the last value
pub fn terminal_increase_run(values: &[f64]) -> usize {
    values
        .windows(2)
        .fold(0, |run, pair| if pair[1] > pair[0] { run + 1 } else { 0 })
}

/// `(last - first) / first` over at least three values
///
/// `None` for short input or a zero first value.
pub fn relative_rise(values: &[f64]) -> Option<f64> {
    if values.len() < RISE_SPAN {
        return None;
    }
    let first = values[0];
    let last = values[values.len() - 1];
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first)
}
