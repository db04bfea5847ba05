//! Outlier Model for the GasGuard Detection Engine
//!
//! ## Overview
//!
//! The statistical channel of the engine asks a pre-fitted model whether a
//! reading is an outlier relative to the history it was trained on. This
//! crate provides that model and everything around it:
//!
//! - [`IsolationForest`]: the outlier scorer
//! - [`StandardScaler`]: per-feature standardization fitted alongside it
//! - [`FeatureMatrix`] / [`Trainer`]: reading log → training matrix → model
//! - [`ModelArtifact`]: versioned on-disk form of scaler + forest
//! - [`LogSummary`] / [`sweep`]: what the log and the model look like
//!
//! ## How Isolation Forest Works
//!
//! Random axis-aligned splits isolate unusual points in few steps:
//!
//! ```text
//! Normal points: need many partitions to isolate
//! Outliers:      isolated with few partitions
//!
//! score(x) = 2^(-E[h(x)] / c(n))
//!
//!   h(x)  path length of x in one tree
//!   c(n)  average path length of an unsuccessful BST search over n points
//! ```
//!
//! Scores near 1.0 are outliers, scores well below 0.5 are normal. When a
//! contamination rate is configured the decision threshold is calibrated on
//! the training scores so that that fraction of them lies above it.
//!
//! ## Training
//!
//! ```text
//! reading log ─ pivot (one row per timestamp, missing → 0.0)
//!             ─ standardize (zero mean, unit variance per column)
//!             ─ fit forest (100 trees, 256-point subsamples, seed 42)
//!             ─ calibrate threshold (5% contamination)
//! ```
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use gasguard_core::Reading;
//! use gasguard_ml::Trainer;
//!
//! let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
//! let readings: Vec<Reading> = (0..200)
//!     .map(|i| {
//!         let value = if i % 40 == 0 { 900.0 + i as f64 } else { 150.0 + (i % 20) as f64 };
//!         Reading::new(start + Duration::seconds(5 * i), "esp32", "mq5_01", value)
//!     })
//!     .collect();
//!
//! let artifact = Trainer::default().train(&readings)?;
//! assert!(artifact.predict("mq5_01", 5000.0)?);
//! assert!(!artifact.predict("mq5_01", 160.0)?);
//! # Ok::<(), gasguard_ml::MLError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod analysis;
pub mod artifact;
pub mod forest;
pub mod node;
pub mod scaler;
pub mod scoring;
pub mod training;
pub mod tree;

pub use analysis::{sweep, LogSummary, SweepPoint, ValueStats, DEFAULT_SWEEP_VALUES};
pub use artifact::{load_statistical_detector, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use forest::{ForestConfig, ForestStats, IsolationForest};
pub use node::{average_path_length, Node, NodeType};
pub use scaler::StandardScaler;
pub use scoring::{calculate_anomaly_score, AnomalyScore};
pub use training::{FeatureMatrix, Trainer};
pub use tree::IsolationTree;

use thiserror::Error;

use gasguard_core::{ModelError, StoreError};

/// Default number of trees
pub const DEFAULT_NUM_TREES: usize = 100;

/// Default subsample size per tree
pub const DEFAULT_SAMPLE_SIZE: usize = 256;

/// Default fraction of training points expected to be outliers
pub const DEFAULT_CONTAMINATION: f64 = 0.05;

/// Score above which a point is an outlier when no contamination is set
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.5;

/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// ML error types
#[derive(Error, Debug)]
pub enum MLError {
    /// Not enough data to train or score
    #[error("Insufficient data for training")]
    InsufficientData,

    /// A feature value or name is unusable
    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Vector length does not match the fitted feature space
    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Fitted dimension
        expected: usize,
        /// Supplied dimension
        actual: usize,
    },

    /// Model used before `fit`
    #[error("Model not fitted")]
    NotFitted,

    /// Artifact file could not be read or written
    #[error("Model artifact I/O failed for {path}: {source}")]
    Io {
        /// Artifact path
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Artifact is not valid JSON for the expected shape
    #[error("Model artifact format error: {0}")]
    Format(#[from] serde_json::Error),

    /// Artifact written by an incompatible version
    #[error("Unsupported model artifact version {found} (expected {expected})")]
    VersionMismatch {
        /// Version this build reads
        expected: u32,
        /// Version found in the file
        found: u32,
    },

    /// Artifact parts disagree on the feature columns
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    /// Scaler or model query failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Training log could not be read
    #[error("Failed to read training data: {0}")]
    Store(#[from] StoreError),
}

/// Result type for ML operations
pub type MLResult<T> = Result<T, MLError>;

/// Feature vector for one training or scoring point
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    features: Vec<f64>,
}

impl Sample {
    /// Sample from finite feature values
    pub fn new(features: &[f64]) -> MLResult<Self> {
        if features.is_empty() {
            return Err(MLError::InvalidFeature("empty feature vector".to_string()));
        }
        if let Some(i) = features.iter().position(|f| !f.is_finite()) {
            return Err(MLError::InvalidFeature(format!("feature {i} is not finite")));
        }
        Ok(Self {
            features: features.to_vec(),
        })
    }

    /// Value of one feature
    pub fn get_feature(&self, index: usize) -> Option<f64> {
        self.features.get(index).copied()
    }

    /// Dimension
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// All feature values
    pub fn features(&self) -> &[f64] {
        &self.features
    }
}

/// Small deterministic PRNG (xorshift64*)
///
/// Training must be reproducible from the seed alone, so the forest carries
/// its own generator instead of drawing from a global one.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Generator for `seed` (zero is remapped)
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    /// Next raw value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `[0, n)`; `n` must be non-zero
    pub fn next_range(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Uniform in `[min, max)`
    pub fn next_f64_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}
