//! Isolation Forest implementation
//!
//! This module provides the main Isolation Forest algorithm that combines
//! multiple isolation trees for robust anomaly detection.

use gasguard_core::{ModelError, ModelResult, OutlierLabel, OutlierModel};
use serde::{Deserialize, Serialize};

use crate::scoring::quantile;
use crate::{
    calculate_anomaly_score, AnomalyScore, IsolationTree, MLError, MLResult, Rng, Sample,
    DEFAULT_ANOMALY_THRESHOLD, DEFAULT_CONTAMINATION, DEFAULT_NUM_TREES, DEFAULT_SAMPLE_SIZE,
    DEFAULT_SEED,
};

/// Configuration for Isolation Forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub num_trees: usize,
    /// Sample size for each tree (capped at the training set size)
    pub sample_size: usize,
    /// Maximum tree depth; `None` means ceil(log2(subsample size))
    pub max_depth: Option<usize>,
    /// Random seed
    pub seed: u64,
    /// Expected outlier fraction; calibrates the threshold when set
    pub contamination: Option<f64>,
    /// Fixed score threshold used when `contamination` is `None`
    pub anomaly_threshold: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_depth: None,
            seed: DEFAULT_SEED,
            contamination: Some(DEFAULT_CONTAMINATION),
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
        }
    }
}

impl ForestConfig {
    /// Reject settings the forest cannot train with
    pub fn validate(&self) -> MLResult<()> {
        if self.num_trees == 0 {
            return Err(MLError::InvalidConfig("num_trees must be at least 1".to_string()));
        }
        if self.sample_size == 0 {
            return Err(MLError::InvalidConfig("sample_size must be at least 1".to_string()));
        }
        if let Some(contamination) = self.contamination {
            if !(contamination > 0.0 && contamination <= 0.5) {
                return Err(MLError::InvalidConfig(format!(
                    "contamination must be in (0, 0.5], got {contamination}"
                )));
            }
        }
        if !(self.anomaly_threshold > 0.0 && self.anomaly_threshold < 1.0) {
            return Err(MLError::InvalidConfig(format!(
                "anomaly_threshold must be in (0, 1), got {}",
                self.anomaly_threshold
            )));
        }
        Ok(())
    }
}

/// Isolation Forest for anomaly detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Configuration
    config: ForestConfig,
    /// Individual trees
    trees: Vec<IsolationTree>,
    /// Dimension the forest was fitted on
    num_features: usize,
    /// Points per tree actually used (the `n` of c(n))
    subsample_size: usize,
    /// Decision threshold on the anomaly score
    threshold: f64,
}

impl IsolationForest {
    /// Create an unfitted forest
    pub fn new(config: ForestConfig) -> MLResult<Self> {
        config.validate()?;
        let threshold = config.anomaly_threshold;
        Ok(Self {
            config,
            trees: Vec::new(),
            num_features: 0,
            subsample_size: 0,
            threshold,
        })
    }

    /// Train the forest on samples
    ///
    /// Refitting replaces every tree. With the same samples and seed the
    /// result is identical.
    pub fn fit(&mut self, samples: &[Sample]) -> MLResult<()> {
        let first = samples.first().ok_or(MLError::InsufficientData)?;
        let num_features = first.num_features();
        if let Some(bad) = samples.iter().find(|s| s.num_features() != num_features) {
            return Err(MLError::DimensionMismatch {
                expected: num_features,
                actual: bad.num_features(),
            });
        }

        let subsample_size = self.config.sample_size.min(samples.len());
        let max_depth = self
            .config
            .max_depth
            .unwrap_or_else(|| (subsample_size as f64).log2().ceil() as usize);

        let mut rng = Rng::new(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.num_trees);
        for _ in 0..self.config.num_trees {
            let subset = sample_subset(samples, subsample_size, &mut rng);
            trees.push(IsolationTree::fit(&subset, max_depth, &mut rng)?);
        }

        self.trees = trees;
        self.num_features = num_features;
        self.subsample_size = subsample_size;
        self.threshold = self.config.anomaly_threshold;

        if let Some(contamination) = self.config.contamination {
            let scores = samples
                .iter()
                .map(|s| self.anomaly_score(s).map(|a| a.score))
                .collect::<MLResult<Vec<_>>>()?;
            self.threshold = quantile(&scores, 1.0 - contamination).ok_or(MLError::InsufficientData)?;
        }

        Ok(())
    }

    /// Calculate anomaly score for a sample
    pub fn anomaly_score(&self, sample: &Sample) -> MLResult<AnomalyScore> {
        if self.trees.is_empty() {
            return Err(MLError::NotFitted);
        }
        if sample.num_features() != self.num_features {
            return Err(MLError::DimensionMismatch {
                expected: self.num_features,
                actual: sample.num_features(),
            });
        }

        let mut total_path_length = 0.0;
        for tree in &self.trees {
            total_path_length += tree.path_length(sample)?;
        }
        let avg_path_length = total_path_length / self.trees.len() as f64;
        let score = calculate_anomaly_score(avg_path_length, self.subsample_size);

        Ok(AnomalyScore::new(score, avg_path_length, self.trees.len()))
    }

    /// Check if a sample is an anomaly
    pub fn is_anomaly(&self, sample: &Sample) -> MLResult<bool> {
        Ok(self.anomaly_score(sample)?.is_anomaly(self.threshold))
    }

    /// Predict anomaly scores for multiple samples
    pub fn predict(&self, samples: &[Sample]) -> MLResult<Vec<AnomalyScore>> {
        samples.iter().map(|sample| self.anomaly_score(sample)).collect()
    }

    /// Score above which a sample is an outlier
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Dimension the forest was fitted on (0 before `fit`)
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Settings the forest was built with
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Whether `fit` has run
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Check a deserialized forest before it is used
    pub fn check_structure(&self) -> MLResult<()> {
        if self.trees.is_empty() || self.num_features == 0 || self.subsample_size == 0 {
            return Err(MLError::NotFitted);
        }
        if !self.threshold.is_finite() {
            return Err(MLError::InvalidConfig(format!("threshold {} is not finite", self.threshold)));
        }
        for tree in &self.trees {
            tree.check_structure(self.num_features)?;
        }
        Ok(())
    }

    /// Get forest statistics
    pub fn stats(&self) -> ForestStats {
        let total_nodes: usize = self.trees.iter().map(|t| t.node_count()).sum();

        let max_depth = self.trees.iter().map(|t| t.depth()).max().unwrap_or(0);

        ForestStats {
            num_trees: self.trees.len(),
            total_nodes,
            max_depth,
            subsample_size: self.subsample_size,
            threshold: self.threshold,
        }
    }
}

impl OutlierModel for IsolationForest {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict(&self, features: &[f64]) -> ModelResult<OutlierLabel> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if features.len() != self.num_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.num_features,
                actual: features.len(),
            });
        }

        let sample = Sample::new(features).map_err(|e| ModelError::InvalidInput(e.to_string()))?;
        match self.is_anomaly(&sample) {
            Ok(true) => Ok(OutlierLabel::Outlier),
            Ok(false) => Ok(OutlierLabel::Inlier),
            Err(MLError::Model(e)) => Err(e),
            Err(e) => Err(ModelError::InvalidInput(e.to_string())),
        }
    }
}

/// Random subset without replacement (partial Fisher-Yates)
fn sample_subset(samples: &[Sample], size: usize, rng: &mut Rng) -> Vec<Sample> {
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    for i in 0..size {
        let j = i + rng.next_range(samples.len() - i);
        indices.swap(i, j);
    }
    indices[..size].iter().map(|&i| samples[i].clone()).collect()
}

/// Forest statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForestStats {
    /// Number of trees
    pub num_trees: usize,
    /// Total nodes across all trees
    pub total_nodes: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Points per tree
    pub subsample_size: usize,
    /// Anomaly threshold
    pub threshold: f64,
}
