//! Detection results and the combined verdict
//!
//! Each detector reports a [`DetectionResult`]: a flag plus a [`Label`]
//! saying why. The ensemble folds the four results into a [`Verdict`] using
//! a fixed priority cascade, with a vote count as the final catch-all:
//!
//! | # | condition                                   | anomaly type          |
//! |---|---------------------------------------------|-----------------------|
//! | 1 | absolute result is `EXTREME`                | `EXTREME`             |
//! | 2 | absolute result is `CRITICAL`               | `CRITICAL`            |
//! | 3 | trend detected                              | `TREND`               |
//! | 4 | velocity detected with `HIGH_VELOCITY_*`    | `HIGH_VELOCITY`       |
//! | 5 | absolute result is `WARNING`                | `WARNING`             |
//! | 6 | statistical detected                        | `STATISTICAL`         |
//! | 7 | confidence >= 0.5                           | `MULTIPLE_INDICATORS` |
//! | 8 | otherwise                                   | `NORMAL`              |
//!
//! Confidence is the fraction of the four methods that fired.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::time::Timestamp;

/// Number of detection methods the ensemble runs
pub const METHOD_COUNT: usize = 4;

/// Confidence at or above which several weak signals form an anomaly
pub const MULTIPLE_INDICATORS_CONFIDENCE: f64 = 0.5;

/// Detection channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Fixed absolute levels
    Absolute,
    /// Pre-trained outlier model
    Statistical,
    /// Sustained rise across recent readings
    Trend,
    /// Rate of change over recent readings
    Velocity,
}

impl DetectionMethod {
    /// Every method, in details-map order
    pub const ALL: [DetectionMethod; METHOD_COUNT] = [
        DetectionMethod::Absolute,
        DetectionMethod::Statistical,
        DetectionMethod::Trend,
        DetectionMethod::Velocity,
    ];

    /// Key in the details map
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::Absolute => "absolute",
            DetectionMethod::Statistical => "statistical",
            DetectionMethod::Trend => "trend",
            DetectionMethod::Velocity => "velocity",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Why a detector decided what it decided
///
/// Rendered as the wire tag (`TREND_CONSECUTIVE_4`,
/// `HIGH_VELOCITY_62.4_ppm_min`, ...) through `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// Below the warning level
    Normal,
    /// At or above the warning level
    Warning,
    /// At or above the critical level
    Critical,
    /// At or above the extreme level
    Extreme,
    /// Not enough history for the window
    InsufficientData,
    /// History checked, no trend
    NoTrend,
    /// Terminal run of strict increases (run length)
    TrendConsecutive(usize),
    /// Relative rise over the last three readings (ratio, 0.125 = 12.5%)
    TrendIncrease(f64),
    /// Rate of change within limits (per minute)
    Velocity(f64),
    /// Rate of change above the limit (per minute)
    HighVelocity(f64),
    /// Outlier model configured and consulted
    IsolationForest,
    /// No outlier model configured
    ModelUnavailable,
    /// Detector faulted and degraded to not-detected
    Error,
    /// Any other tag, for custom detectors
    Custom(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Normal => f.write_str("NORMAL"),
            Label::Warning => f.write_str("WARNING"),
            Label::Critical => f.write_str("CRITICAL"),
            Label::Extreme => f.write_str("EXTREME"),
            Label::InsufficientData => f.write_str("INSUFFICIENT_DATA"),
            Label::NoTrend => f.write_str("NO_TREND"),
            Label::TrendConsecutive(run) => write!(f, "TREND_CONSECUTIVE_{run}"),
            Label::TrendIncrease(ratio) => write!(f, "TREND_INCREASE_{:.1}%", ratio * 100.0),
            Label::Velocity(rate) => write!(f, "VELOCITY_{rate:.1}_ppm_min"),
            Label::HighVelocity(rate) => write!(f, "HIGH_VELOCITY_{rate:.1}_ppm_min"),
            Label::IsolationForest => f.write_str("ISOLATION_FOREST"),
            Label::ModelUnavailable => f.write_str("MODEL_UNAVAILABLE"),
            Label::Error => f.write_str("ERROR"),
            Label::Custom(tag) => f.write_str(tag),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one detection method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Whether this method flagged the reading
    pub detected: bool,
    /// Reason tag
    #[serde(rename = "type")]
    pub label: Label,
}

impl DetectionResult {
    /// Flagged result
    pub fn detected(label: Label) -> Self {
        Self {
            detected: true,
            label,
        }
    }

    /// Unflagged result
    pub fn clear(label: Label) -> Self {
        Self {
            detected: false,
            label,
        }
    }
}

/// Per-method results of one evaluation
pub type Details = BTreeMap<DetectionMethod, DetectionResult>;

/// Category of the combined verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    /// Nothing fired, or one unnamed weak signal
    Normal,
    /// Single reading at or above the warning level
    Warning,
    /// At or above the critical level
    Critical,
    /// At or above the extreme level
    Extreme,
    /// Sustained rise
    Trend,
    /// Rate of change above the limit
    HighVelocity,
    /// Outlier model only
    Statistical,
    /// Half or more of the methods fired without a named category
    MultipleIndicators,
}

impl AnomalyType {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyType::Normal => "NORMAL",
            AnomalyType::Warning => "WARNING",
            AnomalyType::Critical => "CRITICAL",
            AnomalyType::Extreme => "EXTREME",
            AnomalyType::Trend => "TREND",
            AnomalyType::HighVelocity => "HIGH_VELOCITY",
            AnomalyType::Statistical => "STATISTICAL",
            AnomalyType::MultipleIndicators => "MULTIPLE_INDICATORS",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Fraction of methods that fired, in `[0, 1]`
pub fn confidence(details: &Details) -> f64 {
    let fired = details.values().filter(|result| result.detected).count();
    fired as f64 / METHOD_COUNT as f64
}

/// Apply the priority cascade to the per-method results
///
/// Missing methods count as not detected.
pub fn classify(details: &Details, confidence: f64) -> AnomalyType {
    let absolute = details.get(&DetectionMethod::Absolute).filter(|r| r.detected);
    let absolute_is = |label: &Label| absolute.map_or(false, |r| &r.label == label);
    let high_velocity = details
        .get(&DetectionMethod::Velocity)
        .map_or(false, |r| r.detected && matches!(r.label, Label::HighVelocity(_)));

    if absolute_is(&Label::Extreme) {
        AnomalyType::Extreme
    } else if absolute_is(&Label::Critical) {
        AnomalyType::Critical
    } else if fired(details, DetectionMethod::Trend) {
        AnomalyType::Trend
    } else if high_velocity {
        AnomalyType::HighVelocity
    } else if absolute_is(&Label::Warning) {
        AnomalyType::Warning
    } else if fired(details, DetectionMethod::Statistical) {
        AnomalyType::Statistical
    } else if confidence >= MULTIPLE_INDICATORS_CONFIDENCE {
        AnomalyType::MultipleIndicators
    } else {
        AnomalyType::Normal
    }
}

fn fired(details: &Details, method: DetectionMethod) -> bool {
    details.get(&method).map_or(false, |r| r.detected)
}

/// Combined anomaly decision for one reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Evaluated value
    pub value: f64,
    /// Canonical sensor type id
    pub sensor_type: String,
    /// Timestamp of the evaluated reading
    pub timestamp: Timestamp,
    /// Overall flag; false only for `NORMAL`
    pub anomaly_detected: bool,
    /// Category chosen by the cascade
    pub anomaly_type: AnomalyType,
    /// Fraction of methods that fired
    pub confidence: f64,
    /// Per-method results
    pub details: Details,
}

impl Verdict {
    /// Combine per-method results into a verdict
    pub fn from_details(value: f64, sensor_type: impl Into<String>, timestamp: Timestamp, details: Details) -> Self {
        let confidence = confidence(&details);
        let anomaly_type = classify(&details, confidence);

        Self {
            value,
            sensor_type: sensor_type.into(),
            timestamp,
            anomaly_detected: anomaly_type != AnomalyType::Normal,
            anomaly_type,
            confidence,
            details,
        }
    }

    /// Result of one method, if it ran
    pub fn result(&self, method: DetectionMethod) -> Option<&DetectionResult> {
        self.details.get(&method)
    }
}
