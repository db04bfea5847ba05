//! Engine configuration
//!
//! The [`ThresholdSet`] is process-wide and read-only once the engine is
//! built. Deployments override it from JSON; a partial document only
//! replaces the fields it names:
//!
//! ```rust
//! use gasguard_core::ThresholdSet;
//!
//! let thresholds = ThresholdSet::from_json_str(r#"{ "warning": 250.0, "velocity_threshold": 40.0 }"#)?;
//! assert_eq!(thresholds.warning, 250.0);
//! assert_eq!(thresholds.critical, 500.0);
//! assert_eq!(thresholds.velocity_threshold, 40.0);
//! # Ok::<(), gasguard_core::ConfigError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};

/// Default warning level (ppm)
pub const DEFAULT_WARNING_PPM: f64 = 300.0;
/// Default critical level (ppm)
pub const DEFAULT_CRITICAL_PPM: f64 = 500.0;
/// Default extreme level (ppm)
pub const DEFAULT_EXTREME_PPM: f64 = 1000.0;
/// Default trend window (readings)
pub const DEFAULT_TREND_WINDOW: usize = 5;
/// Default relative rise that counts as a trend (10%)
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.10;
/// Default terminal run of increases that counts as a trend
pub const DEFAULT_CONSECUTIVE_INCREASES: usize = 3;
/// Default velocity window (readings)
pub const DEFAULT_VELOCITY_WINDOW: usize = 3;
/// Default velocity limit (ppm/minute)
pub const DEFAULT_VELOCITY_THRESHOLD: f64 = 50.0;

/// Smallest window either windowed detector accepts
pub const MIN_WINDOW: usize = 2;
/// Largest window or run length either windowed detector accepts
pub const MAX_WINDOW: usize = 10_000;

/// Fixed detection levels and window sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    /// Absolute level for WARNING (inclusive)
    pub warning: f64,
    /// Absolute level for CRITICAL (inclusive)
    pub critical: f64,
    /// Absolute level for EXTREME (inclusive)
    pub extreme: f64,
    /// Readings inspected by the trend detector
    pub trend_window: usize,
    /// Relative 3-point rise that counts as a trend
    pub trend_threshold: f64,
    /// Terminal run of strict increases that counts as a trend
    pub consecutive_increases: usize,
    /// Readings inspected by the velocity detector
    pub velocity_window: usize,
    /// Rate above which velocity is flagged (value per minute, strict)
    pub velocity_threshold: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            warning: DEFAULT_WARNING_PPM,
            critical: DEFAULT_CRITICAL_PPM,
            extreme: DEFAULT_EXTREME_PPM,
            trend_window: DEFAULT_TREND_WINDOW,
            trend_threshold: DEFAULT_TREND_THRESHOLD,
            consecutive_increases: DEFAULT_CONSECUTIVE_INCREASES,
            velocity_window: DEFAULT_VELOCITY_WINDOW,
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
        }
    }
}

impl ThresholdSet {
    /// Override the three absolute levels
    pub fn with_levels(mut self, warning: f64, critical: f64, extreme: f64) -> Self {
        self.warning = warning;
        self.critical = critical;
        self.extreme = extreme;
        self
    }

    /// Override the trend detector settings
    pub fn with_trend(mut self, window: usize, threshold: f64, consecutive_increases: usize) -> Self {
        self.trend_window = window;
        self.trend_threshold = threshold;
        self.consecutive_increases = consecutive_increases;
        self
    }

    /// Override the velocity detector settings
    pub fn with_velocity(mut self, window: usize, threshold: f64) -> Self {
        self.velocity_window = window;
        self.velocity_threshold = threshold;
        self
    }

    /// Check the invariants the detectors rely on
    pub fn validate(&self) -> ConfigResult<()> {
        let numeric = [
            ("warning", self.warning),
            ("critical", self.critical),
            ("extreme", self.extreme),
            ("trend_threshold", self.trend_threshold),
            ("velocity_threshold", self.velocity_threshold),
        ];
        for (field, value) in numeric {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }

        if !(self.warning < self.critical && self.critical < self.extreme) {
            return Err(ConfigError::LevelsNotIncreasing {
                warning: self.warning,
                critical: self.critical,
                extreme: self.extreme,
            });
        }

        let counts = [
            ("trend_window", self.trend_window, MIN_WINDOW),
            ("velocity_window", self.velocity_window, MIN_WINDOW),
            ("consecutive_increases", self.consecutive_increases, 1),
        ];
        for (field, value, min) in counts {
            if value < min {
                return Err(ConfigError::TooSmall { field, min, value });
            }
            if value > MAX_WINDOW {
                return Err(ConfigError::TooLarge {
                    field,
                    max: MAX_WINDOW,
                    value,
                });
            }
        }

        Ok(())
    }

    /// Parse and validate a (possibly partial) JSON document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let thresholds: Self = serde_json::from_str(json)?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }
}

/// Deployment configuration
///
/// Everything the engine needs at startup, loaded once and handed to the
/// constructors by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Detection levels and windows
    pub thresholds: ThresholdSet,
    /// Append-only reading log
    pub reading_log: PathBuf,
    /// Trained outlier model artifact; `None` disables the statistical channel
    pub model_artifact: Option<PathBuf>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSet::default(),
            reading_log: PathBuf::from("sensor_data.csv"),
            model_artifact: Some(PathBuf::from("model/isolation_forest.json")),
        }
    }
}

impl GuardConfig {
    /// Check the threshold invariants
    pub fn validate(&self) -> ConfigResult<()> {
        self.thresholds.validate()
    }

    /// Parse and validate a (possibly partial) JSON document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }
}

fn read_config(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
