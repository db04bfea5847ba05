//! Error Types for the Detection Engine
//!
//! ## Error Categories
//!
//! Errors are split by the boundary they cross:
//!
//! ### Configuration
//! - `ConfigError`: the Threshold Set is inconsistent (levels out of order,
//!   windows too small, non-finite levels) or the config file is unreadable.
//!
//! ### Reading Store
//! - `StoreError`: the append-only reading log could not be read or written,
//!   or a stored row is malformed.
//!
//! ### Ingestion Boundary
//! - `IngestError`: the caller handed us something we refuse to evaluate
//!   (missing or non-numeric value, unsupported sensor type), or persisting
//!   the evaluated reading failed.
//!
//! ### Outlier Model
//! - `ModelError`: scaler and model disagree on the feature space.
//!
//! ## What never becomes an error
//!
//! Detectors do not return errors. A `StoreError` or `ModelError` raised while
//! a detector runs is logged and folded into that detector's degraded result
//! (`ERROR` label, or not-detected for the statistical channel). The ensemble
//! therefore always produces a well-formed verdict:
//!
//! ```rust
//! use std::sync::Arc;
//! use gasguard_core::{EnsembleDetector, MemoryStore, ThresholdSet};
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = EnsembleDetector::new(ThresholdSet::default(), store);
//!
//! // Empty history: trend and velocity report INSUFFICIENT_DATA, no error.
//! let verdict = engine.evaluate(120.0, "mq5_01")?;
//! assert!(!verdict.anomaly_detected);
//! # Ok::<(), gasguard_core::IngestError>(())
//! ```

use thiserror::Error;

/// Result type for configuration loading and validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for reading store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for the ingestion boundary
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for scaler and model queries
pub type ModelResult<T> = Result<T, ModelError>;

/// Threshold Set or deployment config rejected
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Absolute levels must satisfy warning < critical < extreme
    #[error("Levels not strictly increasing: warning {warning}, critical {critical}, extreme {extreme}")]
    LevelsNotIncreasing {
        /// Warning level
        warning: f64,
        /// Critical level
        critical: f64,
        /// Extreme level
        extreme: f64,
    },

    /// A numeric setting is NaN or infinite
    #[error("Invalid value for {field}: not a finite number")]
    NonFinite {
        /// Name of the offending setting
        field: &'static str,
    },

    /// A count or window setting is below its minimum
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        /// Name of the offending setting
        field: &'static str,
        /// Smallest accepted value
        min: usize,
        /// Configured value
        value: usize,
    },

    /// A count or window setting is above its maximum
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        /// Name of the offending setting
        field: &'static str,
        /// Largest accepted value
        max: usize,
        /// Configured value
        value: usize,
    },

    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was opened
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Config document is not valid JSON for the expected shape
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reading store failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file I/O failed
    #[error("Reading log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failed
    #[cfg(feature = "csv-store")]
    #[error("Reading log CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A stored row could not be interpreted
    #[error("Malformed row {row}: {reason}")]
    Malformed {
        /// 1-based data row number (header excluded)
        row: u64,
        /// What was wrong with it
        reason: String,
    },

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Reading store lock poisoned")]
    LockPoisoned,
}

/// Rejections and failures at the ingestion boundary
#[derive(Error, Debug)]
pub enum IngestError {
    /// Request carried no sensor type (or an empty one)
    #[error("Missing 'sensor_type'")]
    MissingSensorType,

    /// Sensor type is neither a known alias nor a canonical id
    #[error("Unsupported sensor_type: {0}")]
    UnsupportedSensorType(String),

    /// Request carried no value
    #[error("Missing 'value'")]
    MissingValue,

    /// Value is present but is not a number
    #[error("Value is not numeric: {0}")]
    NonNumericValue(String),

    /// Value parsed but is NaN or infinite
    #[error("Invalid value: not a finite number")]
    NonFiniteValue,

    /// Sensor id was supplied but blank
    #[error("Empty 'sensor_id'")]
    EmptySensorId,

    /// The evaluated reading could not be persisted
    #[error("Failed to persist reading: {0}")]
    Store(#[from] StoreError),

    /// The per-sensor-type ordering lock was poisoned
    #[error("Ordering lock poisoned for sensor type {0}")]
    LockPoisoned(String),
}

/// Scaler/model disagreements
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Vector length does not match the fitted feature space
    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the scaler or model was fitted on
        expected: usize,
        /// Dimension that was supplied
        actual: usize,
    },

    /// Sensor type is not one of the fitted feature columns
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Model has no trees / scaler has no statistics
    #[error("Model not fitted")]
    NotFitted,

    /// Vector rejected by the model (non-finite component)
    #[error("Invalid model input: {0}")]
    InvalidInput(String),
}

/// Internal fault raised while a windowed detector runs
///
/// Never leaves the detector: it is logged and mapped to the `ERROR` label.
#[derive(Error, Debug)]
pub enum DetectorFault {
    /// History could not be read
    #[error(transparent)]
    Store(#[from] StoreError),

    /// History or a derived quantity is NaN or infinite
    #[error("Non-finite {what} for sensor type {sensor_type}")]
    NonFinite {
        /// Which quantity went non-finite
        what: &'static str,
        /// Sensor type being evaluated
        sensor_type: String,
    },
}
