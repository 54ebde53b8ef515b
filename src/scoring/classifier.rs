//! Risk Classifier - threshold gate, risk score, alert tier
//!
//! State-free apart from the threshold, which uses a single-writer /
//! many-reader atomic swap: updates are whole-value and take effect for
//! every classification issued after the store.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CRITICAL_RISK_SCORE, DEFAULT_FRAUD_THRESHOLD, HIGH_RISK_SCORE, MEDIUM_RISK_SCORE,
};
use crate::error::{CoreError, CoreResult};

/// Alert severity tier, from the fixed risk score bands.
/// Variant order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    /// Map a risk score (0-100) to its tier. Bands are mutually exclusive
    /// and exhaustive: >=90 critical, >=70 high, >=50 medium, else low.
    pub fn from_risk_score(score: u8) -> Self {
        if score >= CRITICAL_RISK_SCORE {
            AlertLevel::Critical
        } else if score >= HIGH_RISK_SCORE {
            AlertLevel::High
        } else if score >= MEDIUM_RISK_SCORE {
            AlertLevel::Medium
        } else {
            AlertLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one probability
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub is_fraud: bool,
    pub risk_score: u8,
    pub alert_level: AlertLevel,
    /// Threshold in effect when this classification was made
    pub threshold: f32,
}

/// Threshold-based fraud classifier
pub struct RiskClassifier {
    // f32 bits; atomic swap keeps updates whole-value under readers
    threshold_bits: AtomicU32,
}

impl RiskClassifier {
    pub fn new(threshold: f32) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold_bits: AtomicU32::new(threshold.to_bits()),
        })
    }

    /// Current threshold
    pub fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold_bits.load(Ordering::Acquire))
    }

    /// Atomically replace the threshold; out-of-range values are rejected
    pub fn set_threshold(&self, threshold: f32) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::InvalidThreshold(threshold));
        }
        self.threshold_bits
            .store(threshold.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Classify an ensemble probability
    pub fn classify(&self, probability: f32) -> Classification {
        let threshold = self.threshold();
        let risk_score = (probability.clamp(0.0, 1.0) * 100.0).round() as u8;

        Classification {
            is_fraud: probability > threshold,
            risk_score,
            alert_level: AlertLevel::from_risk_score(risk_score),
            threshold,
        }
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self {
            threshold_bits: AtomicU32::new(DEFAULT_FRAUD_THRESHOLD.to_bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_score_range_and_bands() {
        let classifier = RiskClassifier::default();

        for i in 0..=100 {
            let p = i as f32 / 100.0;
            let c = classifier.classify(p);
            assert!(c.risk_score <= 100);

            let expected = if c.risk_score >= 90 {
                AlertLevel::Critical
            } else if c.risk_score >= 70 {
                AlertLevel::High
            } else if c.risk_score >= 50 {
                AlertLevel::Medium
            } else {
                AlertLevel::Low
            };
            assert_eq!(c.alert_level, expected);
        }
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(AlertLevel::from_risk_score(90), AlertLevel::Critical);
        assert_eq!(AlertLevel::from_risk_score(89), AlertLevel::High);
        assert_eq!(AlertLevel::from_risk_score(70), AlertLevel::High);
        assert_eq!(AlertLevel::from_risk_score(69), AlertLevel::Medium);
        assert_eq!(AlertLevel::from_risk_score(50), AlertLevel::Medium);
        assert_eq!(AlertLevel::from_risk_score(49), AlertLevel::Low);
        assert_eq!(AlertLevel::from_risk_score(0), AlertLevel::Low);
    }

    #[test]
    fn test_fraud_decision_is_strictly_above_threshold() {
        let classifier = RiskClassifier::default();
        assert!(!classifier.classify(0.7).is_fraud);
        assert!(classifier.classify(0.71).is_fraud);
    }

    #[test]
    fn test_threshold_update_applies_to_later_calls() {
        let classifier = RiskClassifier::default();
        assert!(!classifier.classify(0.6).is_fraud);

        classifier.set_threshold(0.5).unwrap();
        assert!(classifier.classify(0.6).is_fraud);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let classifier = RiskClassifier::default();
        assert!(classifier.set_threshold(1.5).is_err());
        assert!(classifier.set_threshold(-0.1).is_err());
        assert_eq!(classifier.threshold(), 0.7);

        assert!(RiskClassifier::new(2.0).is_err());
        assert!(RiskClassifier::new(0.0).is_ok());
        assert!(RiskClassifier::new(1.0).is_ok());
    }

    #[test]
    fn test_scenario_085_probability() {
        let classifier = RiskClassifier::default();
        let c = classifier.classify(0.85);

        assert!(c.is_fraud);
        assert_eq!(c.risk_score, 85);
        assert_eq!(c.alert_level, AlertLevel::High);
    }
}
