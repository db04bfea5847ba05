//! Absolute level classification

use crate::config::ThresholdSet;
use crate::detection::{DetectionMethod, DetectionResult, Label};
use crate::reading::Candidate;
use crate::traits::Detector;

/// Classifies a single value against the warning/critical/extreme levels
///
/// Lower edges are inclusive. Pure: no history, no failure modes. Callers
/// hand it finite values only ([`Candidate`] guarantees that).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdDetector {
    warning: f64,
    critical: f64,
    extreme: f64,
}

impl ThresholdDetector {
    /// Bands from the threshold set
    pub fn new(thresholds: &ThresholdSet) -> Self {
        Self {
            warning: thresholds.warning,
            critical: thresholds.critical,
            extreme: thresholds.extreme,
        }
    }

    /// Most severe level `value` reaches
    pub fn classify(&self, value: f64) -> DetectionResult {
        if value >= self.extreme {
            DetectionResult::detected(Label::Extreme)
        } else if value >= self.critical {
            DetectionResult::detected(Label::Critical)
        } else if value >= self.warning {
            DetectionResult::detected(Label::Warning)
        } else {
            DetectionResult::clear(Label::Normal)
        }
    }
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self::new(&ThresholdSet::default())
    }
}

impl Detector for ThresholdDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Absolute
    }

    fn name(&self) -> &'static str {
        "threshold"
    }

    fn detect(&self, candidate: &Candidate) -> DetectionResult {
        self.classify(candidate.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boundaries_are_inclusive() {
        let detector = ThresholdDetector::default();

        assert_eq!(detector.classify(299.9).label, Label::Normal);
        assert_eq!(detector.classify(300.0).label, Label::Warning);
        assert_eq!(detector.classify(500.0).label, Label::Critical);
        assert_eq!(detector.classify(1000.0).label, Label::Extreme);
        assert!(!detector.classify(0.0).detected);
        assert!(detector.classify(300.0).detected);
    }

    #[test]
    fn custom_levels() {
        let detector = ThresholdDetector::new(&ThresholdSet::default().with_levels(10.0, 20.0, 30.0));
        assert_eq!(detector.classify(25.0).label, Label::Critical);
    }

    proptest! {
        #[test]
        fn bands_partition_the_line(value in -1.0e4f64..1.0e4) {
            let result = ThresholdDetector::default().classify(value);
            let expected = if value >= 1000.0 {
                Label::Extreme
            } else if value >= 500.0 {
                Label::Critical
            } else if value >= 300.0 {
                Label::Warning
            } else {
                Label::Normal
            };
            prop_assert_eq!(result.detected, expected != Label::Normal);
            prop_assert_eq!(result.label, expected);
        }
    }
}
