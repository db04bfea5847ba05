//! Ensemble combiner
//!
//! Owns one detector per [`DetectionMethod`], runs all of them on every
//! candidate and folds the results with the cascade in
//! [`detection`](crate::detection). The engine holds no per-call state: the
//! threshold set and detectors are read-only after construction and the
//! reading store is only read here.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::debug;

use crate::config::ThresholdSet;
use crate::detection::{DetectionMethod, Details, Verdict};
use crate::detectors::{StatisticalDetector, ThresholdDetector, TrendDetector, VelocityDetector};
use crate::errors::{ConfigResult, IngestResult};
use crate::reading::Candidate;
use crate::time::Timestamp;
use crate::traits::{Detector, ReadingStore};

/// Multi-signal anomaly engine
pub struct EnsembleDetector {
    thresholds: ThresholdSet,
    store: Arc<dyn ReadingStore>,
    detectors: BTreeMap<DetectionMethod, Box<dyn Detector>>,
}

impl EnsembleDetector {
    /// Engine with the three rule-based detectors and no outlier model
    ///
    /// `thresholds` is used as given; load it through
    /// [`ThresholdSet::from_json_str`] or use [`EnsembleDetector::builder`]
    /// to have it validated.
    pub fn new(thresholds: ThresholdSet, store: Arc<dyn ReadingStore>) -> Self {
        EnsembleBuilder::new(thresholds, store).assemble()
    }

    /// Builder starting from the stock detectors
    pub fn builder(thresholds: ThresholdSet, store: Arc<dyn ReadingStore>) -> EnsembleBuilder {
        EnsembleBuilder::new(thresholds, store)
    }

    /// Levels and windows in use
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Store the windowed detectors read from
    pub fn store(&self) -> &Arc<dyn ReadingStore> {
        &self.store
    }

    /// Evaluate `value` as if it arrived now
    pub fn evaluate(&self, value: f64, sensor_type: &str) -> IngestResult<Verdict> {
        self.evaluate_at(value, sensor_type, Utc::now())
    }

    /// Evaluate `value` stamped with `timestamp`
    pub fn evaluate_at(&self, value: f64, sensor_type: &str, timestamp: Timestamp) -> IngestResult<Verdict> {
        let candidate = Candidate::new(value, sensor_type, timestamp)?;
        Ok(self.evaluate_candidate(&candidate))
    }

    /// Run every detector on a validated candidate and combine the results
    pub fn evaluate_candidate(&self, candidate: &Candidate) -> Verdict {
        let details: Details = self
            .detectors
            .iter()
            .map(|(&method, detector)| (method, detector.detect(candidate)))
            .collect();

        let verdict = Verdict::from_details(
            candidate.value(),
            candidate.sensor_type(),
            candidate.timestamp(),
            details,
        );
        debug!(
            "{} = {} -> {} (confidence {:.2})",
            verdict.sensor_type, verdict.value, verdict.anomaly_type, verdict.confidence
        );
        verdict
    }

    /// Detector filling `method`
    pub fn detector(&self, method: DetectionMethod) -> Option<&dyn Detector> {
        self.detectors.get(&method).map(|d| d.as_ref())
    }
}

impl fmt::Debug for EnsembleDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.detectors.values().map(|d| d.name()).collect();
        f.debug_struct("EnsembleDetector")
            .field("thresholds", &self.thresholds)
            .field("detectors", &names)
            .finish()
    }
}

/// Builder for [`EnsembleDetector`]
///
/// Starts from the stock detectors; [`with_detector`](Self::with_detector)
/// replaces whichever one fills the same method.
pub struct EnsembleBuilder {
    thresholds: ThresholdSet,
    store: Arc<dyn ReadingStore>,
    statistical: StatisticalDetector,
    overrides: Vec<Box<dyn Detector>>,
}

impl EnsembleBuilder {
    fn new(thresholds: ThresholdSet, store: Arc<dyn ReadingStore>) -> Self {
        Self {
            thresholds,
            store,
            statistical: StatisticalDetector::disabled(),
            overrides: Vec::new(),
        }
    }

    /// Use this outlier-model channel
    pub fn statistical(mut self, detector: StatisticalDetector) -> Self {
        self.statistical = detector;
        self
    }

    /// Replace the stock detector for `detector.method()`
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.overrides.push(detector);
        self
    }

    /// Validate the thresholds and assemble the engine
    pub fn build(self) -> ConfigResult<EnsembleDetector> {
        self.thresholds.validate()?;
        Ok(self.assemble())
    }

    fn assemble(self) -> EnsembleDetector {
        let mut detectors: BTreeMap<DetectionMethod, Box<dyn Detector>> = BTreeMap::new();
        let stock: [Box<dyn Detector>; 4] = [
            Box::new(ThresholdDetector::new(&self.thresholds)),
            Box::new(self.statistical),
            Box::new(TrendDetector::new(self.store.clone(), &self.thresholds)),
            Box::new(VelocityDetector::new(self.store.clone(), &self.thresholds)),
        ];
        for detector in stock.into_iter().chain(self.overrides) {
            detectors.insert(detector.method(), detector);
        }

        EnsembleDetector {
            thresholds: self.thresholds,
            store: self.store,
            detectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{AnomalyType, DetectionResult, Label};
    use crate::detectors::testing::{minute_series, VecStore};
    use crate::sensors::GAS_SENSOR;

    fn engine(history: &[f64]) -> EnsembleDetector {
        let store = Arc::new(VecStore::with(minute_series(GAS_SENSOR, history)));
        EnsembleDetector::new(ThresholdSet::default(), store)
    }

    #[test]
    fn every_method_reported() {
        let verdict = engine(&[]).evaluate(120.0, GAS_SENSOR).unwrap();

        for method in DetectionMethod::ALL {
            assert!(verdict.result(method).is_some(), "missing {method}");
        }
        assert_eq!(verdict.anomaly_type, AnomalyType::Normal);
        assert!(!verdict.anomaly_detected);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(
            verdict.result(DetectionMethod::Statistical),
            Some(&DetectionResult::clear(Label::ModelUnavailable))
        );
    }

    #[test]
    fn invalid_candidate_rejected() {
        assert!(engine(&[]).evaluate(f64::NAN, GAS_SENSOR).is_err());
        assert!(engine(&[]).evaluate(1.0, "").is_err());
    }

    #[test]
    fn override_replaces_stock_detector() {
        struct AlwaysOdor;
        impl Detector for AlwaysOdor {
            fn method(&self) -> DetectionMethod {
                DetectionMethod::Absolute
            }
            fn name(&self) -> &'static str {
                "odor"
            }
            fn detect(&self, _candidate: &Candidate) -> DetectionResult {
                DetectionResult::detected(Label::Custom("ODOR".into()))
            }
        }

        let store = Arc::new(VecStore::default());
        let engine = EnsembleDetector::builder(ThresholdSet::default(), store)
            .with_detector(Box::new(AlwaysOdor))
            .build()
            .unwrap();

        assert_eq!(engine.detector(DetectionMethod::Absolute).map(|d| d.name()), Some("odor"));
        let verdict = engine.evaluate(10.0, GAS_SENSOR).unwrap();
        assert_eq!(verdict.confidence, 0.25);
        assert_eq!(verdict.anomaly_type, AnomalyType::Normal);
    }

    #[test]
    fn builder_validates_thresholds() {
        let bad = ThresholdSet::default().with_levels(900.0, 500.0, 1000.0);
        assert!(EnsembleDetector::builder(bad, Arc::new(VecStore::default())).build().is_err());
    }
}
