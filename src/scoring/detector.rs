//! Fraud Detector facade: extract -> ensemble -> classify
//!
//! A transaction always receives a ScoreResult; every failure mode below
//! this point degrades (defaults, exclusions, sentinels) instead of erroring.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Transaction;

use super::classifier::{AlertLevel, RiskClassifier};
use super::ensemble::{EnsembleScorer, ScoreStatus};
use super::extractor::{TransactionFeatureExtractor, UNKNOWN_CATEGORY_CODE};
use super::vector::FeatureVector;
use crate::error::CoreResult;

/// Complete scoring outcome for one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub fraud_probability: f32,
    pub is_fraud: bool,
    pub risk_score: u8,
    pub alert_level: AlertLevel,
    pub confidence: f32,
    pub model_predictions: HashMap<String, f32>,
    pub threshold: f32,
    pub status: ScoreStatus,
    pub fraud_reasons: Vec<String>,
}

pub struct FraudDetector {
    extractor: TransactionFeatureExtractor,
    ensemble: EnsembleScorer,
    classifier: RiskClassifier,
}

impl FraudDetector {
    pub fn new(ensemble: EnsembleScorer, classifier: RiskClassifier) -> Self {
        Self {
            extractor: TransactionFeatureExtractor::new(),
            ensemble,
            classifier,
        }
    }

    /// Score one transaction end to end
    pub fn score_transaction(&self, tx: &Transaction) -> ScoreResult {
        let features = self.extractor.extract(tx);
        let output = self.ensemble.score(&features);
        let classification = self.classifier.classify(output.probability);

        let fraud_reasons = if classification.is_fraud {
            fraud_reasons(&features, output.probability)
        } else {
            Vec::new()
        };

        ScoreResult {
            fraud_probability: output.probability,
            is_fraud: classification.is_fraud && output.status == ScoreStatus::Scored,
            risk_score: classification.risk_score,
            alert_level: classification.alert_level,
            confidence: output.confidence,
            model_predictions: output.model_predictions,
            threshold: classification.threshold,
            status: output.status,
            fraud_reasons,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.classifier.threshold()
    }

    pub fn set_threshold(&self, threshold: f32) -> CoreResult<()> {
        self.classifier.set_threshold(threshold)
    }

    pub fn predictor_count(&self) -> usize {
        self.ensemble.predictor_count()
    }
}

/// Human-readable reasons derived from the feature indicators
fn fraud_reasons(features: &FeatureVector, probability: f32) -> Vec<String> {
    let mut reasons = Vec::new();

    if features.get_by_name("high_amount_flag") == Some(1.0) {
        reasons.push("High transaction amount".to_string());
    }
    if features.get_by_name("odd_hour_flag") == Some(1.0) {
        reasons.push("Unusual transaction time".to_string());
    }
    if features.get_by_name("country_code") == Some(UNKNOWN_CATEGORY_CODE) {
        reasons.push("Unrecognized country".to_string());
    }
    if features.get_by_name("merchant_category_code") == Some(UNKNOWN_CATEGORY_CODE) {
        reasons.push("Unrecognized merchant category".to_string());
    }
    if probability >= 0.9 {
        reasons.push("Strong model consensus".to_string());
    }
    if reasons.is_empty() {
        reasons.push("Elevated fraud probability".to_string());
    }

    reasons
}
