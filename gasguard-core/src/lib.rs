//! Multi-signal anomaly detection for sensor readings
//!
//! Each reading is checked by four independent detectors and the results
//! are folded into one verdict with a category and a confidence:
//!
//! - **Threshold**: fixed warning / critical / extreme levels
//! - **Trend**: sustained rise across the last few readings of the same type
//! - **Velocity**: change per minute across a short recent window
//! - **Statistical**: a pre-trained outlier model (optional, see `gasguard-ml`)
//!
//! Absolute severity dominates, developing trends and surges outrank a
//! single borderline reading, and several weak signals together still raise
//! `MULTIPLE_INDICATORS`.
//!
//! ```rust
//! use std::sync::Arc;
//! use gasguard_core::{AnomalyType, EnsembleDetector, MemoryStore, ThresholdSet};
//!
//! let engine = EnsembleDetector::new(ThresholdSet::default(), Arc::new(MemoryStore::new()));
//!
//! let verdict = engine.evaluate(1250.0, "mq5_01")?;
//! assert_eq!(verdict.anomaly_type, AnomalyType::Extreme);
//! assert_eq!(verdict.confidence, 0.25);
//! # Ok::<(), gasguard_core::IngestError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod detection;
pub mod detectors;
pub mod ensemble;
pub mod errors;
pub mod ingest;
pub mod reading;
pub mod sensors;
pub mod store;
pub mod time;
pub mod traits;

// Public API
pub use config::{GuardConfig, ThresholdSet};
pub use detection::{AnomalyType, DetectionMethod, DetectionResult, Details, Label, Verdict};
pub use detectors::{StatisticalDetector, ThresholdDetector, TrendDetector, VelocityDetector};
pub use ensemble::{EnsembleBuilder, EnsembleDetector};
pub use errors::{
    ConfigError, ConfigResult, IngestError, IngestResult, ModelError, ModelResult, StoreError,
    StoreResult,
};
pub use ingest::{IngestOutcome, IngestRequest, Ingestor};
pub use reading::{Candidate, Reading};
pub use store::MemoryStore;
#[cfg(feature = "csv-store")]
pub use store::CsvStore;
pub use time::{FixedClock, SystemClock, TimeSource, Timestamp};
pub use traits::{Detector, FeatureScaler, OutlierLabel, OutlierModel, ReadingStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
