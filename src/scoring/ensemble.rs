//! Ensemble Scorer - weighted combination of the predictor set
//!
//! Combination is a fixed weighted sum over named predictors. A predictor
//! that fails is excluded and the remaining weights are renormalized, so the
//! result is always a convex combination of the predictors actually used.
//! Zero usable predictors yield an explicit untrained sentinel, never a
//! fabricated value.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::external::ModelStore;

use super::predictor::{build_predictor, Predictor};
use super::vector::FeatureVector;

/// Whether a real score was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Scored,
    /// No predictor was usable; probability and confidence are sentinels
    Untrained,
}

/// Raw ensemble output, before risk classification
#[derive(Debug, Clone)]
pub struct EnsembleOutput {
    pub probability: f32,
    pub confidence: f32,
    pub model_predictions: HashMap<String, f32>,
    pub status: ScoreStatus,
}

pub struct EnsembleScorer {
    predictors: Vec<Arc<dyn Predictor>>,
    weights: HashMap<String, f32>,
}

impl EnsembleScorer {
    /// Build from an explicit predictor list and per-name weights
    pub fn new(predictors: Vec<Arc<dyn Predictor>>, weights: HashMap<String, f32>) -> Self {
        Self {
            predictors,
            weights,
        }
    }

    /// Load every weighted predictor the model store has available.
    /// Missing or invalid models are logged and skipped; scoring proceeds
    /// with reduced confidence over whatever loaded.
    pub fn from_model_store(store: &dyn ModelStore, weights: &[(&str, f32)]) -> Self {
        let mut predictors: Vec<Arc<dyn Predictor>> = Vec::new();
        let mut weight_map = HashMap::new();

        for &(name, weight) in weights {
            weight_map.insert(name.to_string(), weight);

            if !store.is_available(name) {
                warn!(model = name, "predictor not available in model store, skipping");
                continue;
            }
            match store.load_predictor(name) {
                Ok(spec) => match build_predictor(name, &spec) {
                    Ok(p) => predictors.push(p),
                    Err(e) => warn!(model = name, error = %e, "failed to build predictor"),
                },
                Err(e) => warn!(model = name, error = %e, "failed to load predictor"),
            }
        }

        Self::new(predictors, weight_map)
    }

    /// Number of loaded predictors
    pub fn predictor_count(&self) -> usize {
        self.predictors.len()
    }

    /// Score a feature vector through every loaded predictor
    pub fn score(&self, features: &FeatureVector) -> EnsembleOutput {
        let mut model_predictions = HashMap::new();
        let mut used: Vec<(f32, f32)> = Vec::with_capacity(self.predictors.len());

        for predictor in &self.predictors {
            let name = predictor.name();
            match predictor.score(features) {
                Ok(p) => {
                    model_predictions.insert(name.to_string(), p);
                    let weight = self.weights.get(name).copied().unwrap_or(0.0);
                    if weight > 0.0 {
                        used.push((p, weight));
                    }
                }
                Err(e) => {
                    // Excluded from the sum; remaining weights renormalize
                    warn!(model = name, error = %e, "predictor failed, excluding from ensemble");
                }
            }
        }

        if used.is_empty() {
            return EnsembleOutput {
                probability: 0.0,
                confidence: 0.0,
                model_predictions,
                status: ScoreStatus::Untrained,
            };
        }

        let total_weight: f32 = used.iter().map(|(_, w)| w).sum();
        let probability = used
            .iter()
            .map(|(p, w)| p * (w / total_weight))
            .sum::<f32>()
            .clamp(0.0, 1.0);

        // Confidence from model agreement: 1 - stddev of the individual
        // probabilities, clamped to [0,1]
        let probs: Vec<f32> = used.iter().map(|(p, _)| *p).collect();
        let mean = probs.iter().sum::<f32>() / probs.len() as f32;
        let variance = probs.iter().map(|p| (p - mean).powi(2)).sum::<f32>() / probs.len() as f32;
        let confidence = (1.0 - variance.sqrt()).clamp(0.0, 1.0);

        EnsembleOutput {
            probability,
            confidence,
            model_predictions,
            status: ScoreStatus::Scored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::predictor::PredictorError;

    struct FixedPredictor {
        name: &'static str,
        value: f32,
    }

    impl Predictor for FixedPredictor {
        fn name(&self) -> &str {
            self.name
        }
        fn score(&self, _: &FeatureVector) -> Result<f32, PredictorError> {
            Ok(self.value)
        }
    }

    struct FailingPredictor(&'static str);

    impl Predictor for FailingPredictor {
        fn name(&self) -> &str {
            self.0
        }
        fn score(&self, _: &FeatureVector) -> Result<f32, PredictorError> {
            Err(PredictorError::ScoringFailed {
                model: self.0.to_string(),
                reason: "test".to_string(),
            })
        }
    }

    fn weights(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
        pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    #[test]
    fn test_weighted_combination() {
        let scorer = EnsembleScorer::new(
            vec![
                Arc::new(FixedPredictor { name: "a", value: 0.8 }),
                Arc::new(FixedPredictor { name: "b", value: 0.4 }),
            ],
            weights(&[("a", 0.75), ("b", 0.25)]),
        );

        let out = scorer.score(&FeatureVector::new());
        assert_eq!(out.status, ScoreStatus::Scored);
        assert!((out.probability - 0.7).abs() < 1e-6);
        assert_eq!(out.model_predictions.len(), 2);
    }

    #[test]
    fn test_failed_predictor_renormalizes() {
        let scorer = EnsembleScorer::new(
            vec![
                Arc::new(FixedPredictor { name: "a", value: 0.9 }),
                Arc::new(FailingPredictor("b")),
            ],
            weights(&[("a", 0.5), ("b", 0.5)]),
        );

        // b is excluded; a's weight renormalizes to 1.0
        let out = scorer.score(&FeatureVector::new());
        assert_eq!(out.status, ScoreStatus::Scored);
        assert!((out.probability - 0.9).abs() < 1e-6);
        assert!(!out.model_predictions.contains_key("b"));
    }

    #[test]
    fn test_convexity() {
        let scorer = EnsembleScorer::new(
            vec![
                Arc::new(FixedPredictor { name: "a", value: 0.2 }),
                Arc::new(FixedPredictor { name: "b", value: 0.6 }),
                Arc::new(FixedPredictor { name: "c", value: 0.9 }),
            ],
            weights(&[("a", 0.3), ("b", 0.3), ("c", 0.4)]),
        );

        let out = scorer.score(&FeatureVector::new());
        assert!(out.probability >= 0.2 && out.probability <= 0.9);
    }

    #[test]
    fn test_perfect_agreement_yields_full_confidence() {
        let scorer = EnsembleScorer::new(
            vec![
                Arc::new(FixedPredictor { name: "a", value: 0.7 }),
                Arc::new(FixedPredictor { name: "b", value: 0.7 }),
            ],
            weights(&[("a", 0.5), ("b", 0.5)]),
        );

        let out = scorer.score(&FeatureVector::new());
        assert!((out.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disagreement_lowers_confidence() {
        let scorer = EnsembleScorer::new(
            vec![
                Arc::new(FixedPredictor { name: "a", value: 0.0 }),
                Arc::new(FixedPredictor { name: "b", value: 1.0 }),
            ],
            weights(&[("a", 0.5), ("b", 0.5)]),
        );

        let out = scorer.score(&FeatureVector::new());
        assert!((out.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_untrained_sentinel_when_no_predictors() {
        let scorer = EnsembleScorer::new(vec![], weights(&[]));
        let out = scorer.score(&FeatureVector::new());

        assert_eq!(out.status, ScoreStatus::Untrained);
        assert_eq!(out.probability, 0.0);
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn test_untrained_sentinel_when_all_fail() {
        let scorer = EnsembleScorer::new(
            vec![Arc::new(FailingPredictor("a"))],
            weights(&[("a", 1.0)]),
        );
        let out = scorer.score(&FeatureVector::new());
        assert_eq!(out.status, ScoreStatus::Untrained);
    }
}
