//! Predictor Set - heterogeneous fraud models over loaded parameters
//!
//! Training and artifact persistence belong to the model store
//! collaborator. This module deserializes parameter sets into scorers:
//! tree ensembles (random forest / gradient boosting stumps), a linear
//! model, an MLP, and an unsupervised isolation forest whose raw anomaly
//! score is normalized into [0,1] by a fixed affine-then-clamp transform.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::layout::{validate_layout, FEATURE_COUNT};
use super::vector::FeatureVector;

// ============================================================================
// TRAIT & ERRORS
// ============================================================================

/// One capability: map a feature vector to a fraud probability in [0,1].
/// Implementations are read-only after load; concurrent scoring is safe.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, features: &FeatureVector) -> Result<f32, PredictorError>;
}

#[derive(Debug, Clone, Error)]
pub enum PredictorError {
    #[error("model '{0}' is not available")]
    Unavailable(String),

    #[error("model '{model}' has invalid parameters: {reason}")]
    InvalidParameters { model: String, reason: String },

    #[error("model '{model}' scoring failed: {reason}")]
    ScoringFailed { model: String, reason: String },
}

// ============================================================================
// PARAMETER SPECS (what the model store hands us)
// ============================================================================

/// A loadable predictor definition, tagged with the feature schema it was
/// trained against. Loading rejects specs from a different layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorSpec {
    pub feature_version: u8,
    pub layout_hash: u32,
    /// Optional standard scaling applied before the model
    #[serde(default)]
    pub scaler: Option<ScalerParams>,
    pub model: ModelParams,
}

/// Standard scaler: (x - mean) / std per feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub means: Vec<f32>,
    pub stds: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelParams {
    TreeEnsemble(TreeEnsembleParams),
    Linear(LinearParams),
    Mlp(MlpParams),
    IsolationForest(IsolationForestParams),
}

/// A depth-1 decision tree addressed by feature name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stump {
    pub feature: String,
    pub threshold: f32,
    /// Output when value <= threshold
    pub below: f32,
    /// Output when value > threshold
    pub above: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeAggregation {
    /// Random-forest style: mean of per-stump probabilities
    Average,
    /// Boosting style: sigmoid over bias + sum of stump margins
    LogitSum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsembleParams {
    pub aggregation: TreeAggregation,
    #[serde(default)]
    pub bias: f32,
    pub stumps: Vec<Stump>,
}

/// Logistic regression: sigmoid(w . x + b)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearParams {
    pub weights: Vec<f32>,
    pub bias: f32,
}

/// Fully-connected network: relu hidden layers, sigmoid output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpParams {
    pub layers: Vec<DenseLayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Row-per-output weight matrix
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
}

/// Isolation tree node. Children >= 0 index into the node list; a negative
/// child encodes a leaf whose isolation depth is the absolute value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoNode {
    pub feature: String,
    pub split: f32,
    pub left: i32,
    pub right: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestParams {
    pub trees: Vec<Vec<IsoNode>>,
    /// Average path length normalizer c(n) from training
    pub expected_depth: f32,
}

// ============================================================================
// LOADED MODELS
// ============================================================================

enum ModelKind {
    Trees {
        aggregation: TreeAggregation,
        bias: f32,
        // (feature index, threshold, below, above)
        stumps: Vec<(usize, f32, f32, f32)>,
    },
    Linear {
        weights: Array1<f32>,
        bias: f32,
    },
    Mlp {
        layers: Vec<(Array2<f32>, Array1<f32>)>,
    },
    Iso {
        // (feature index, split, left, right)
        trees: Vec<Vec<(usize, f32, i32, i32)>>,
        expected_depth: f32,
    },
}

/// A predictor built from a validated parameter spec
pub struct LoadedModel {
    name: String,
    scaler: Option<(Vec<f32>, Vec<f32>)>,
    kind: ModelKind,
}

/// Build a predictor from its spec, validating the feature schema and all
/// parameter dimensions up front so scoring itself cannot go out of bounds.
pub fn build_predictor(name: &str, spec: &PredictorSpec) -> Result<Arc<dyn Predictor>, PredictorError> {
    validate_layout(spec.feature_version, spec.layout_hash).map_err(|e| {
        PredictorError::InvalidParameters {
            model: name.to_string(),
            reason: e.to_string(),
        }
    })?;

    let scaler = match &spec.scaler {
        Some(s) => {
            if s.means.len() != FEATURE_COUNT || s.stds.len() != FEATURE_COUNT {
                return Err(invalid(name, "scaler dimensions do not match feature count"));
            }
            Some((s.means.clone(), s.stds.clone()))
        }
        None => None,
    };

    let kind = match &spec.model {
        ModelParams::TreeEnsemble(p) => {
            if p.stumps.is_empty() {
                return Err(invalid(name, "tree ensemble has no stumps"));
            }
            let stumps = p
                .stumps
                .iter()
                .map(|s| {
                    resolve_feature(name, &s.feature).map(|i| (i, s.threshold, s.below, s.above))
                })
                .collect::<Result<Vec<_>, _>>()?;
            ModelKind::Trees {
                aggregation: p.aggregation,
                bias: p.bias,
                stumps,
            }
        }
        ModelParams::Linear(p) => {
            if p.weights.len() != FEATURE_COUNT {
                return Err(invalid(name, "weight vector does not match feature count"));
            }
            ModelKind::Linear {
                weights: Array1::from_vec(p.weights.clone()),
                bias: p.bias,
            }
        }
        ModelParams::Mlp(p) => {
            if p.layers.is_empty() {
                return Err(invalid(name, "mlp has no layers"));
            }
            let mut layers = Vec::with_capacity(p.layers.len());
            let mut input_dim = FEATURE_COUNT;
            for (li, layer) in p.layers.iter().enumerate() {
                let out_dim = layer.weights.len();
                if out_dim == 0 || layer.biases.len() != out_dim {
                    return Err(invalid(name, &format!("layer {li} bias/weight mismatch")));
                }
                let mut flat = Vec::with_capacity(out_dim * input_dim);
                for row in &layer.weights {
                    if row.len() != input_dim {
                        return Err(invalid(name, &format!("layer {li} input width mismatch")));
                    }
                    flat.extend_from_slice(row);
                }
                let w = Array2::from_shape_vec((out_dim, input_dim), flat)
                    .map_err(|e| invalid(name, &e.to_string()))?;
                layers.push((w, Array1::from_vec(layer.biases.clone())));
                input_dim = out_dim;
            }
            if input_dim != 1 {
                return Err(invalid(name, "final layer must have exactly one output"));
            }
            ModelKind::Mlp { layers }
        }
        ModelParams::IsolationForest(p) => {
            if p.trees.is_empty() || p.expected_depth <= 0.0 {
                return Err(invalid(name, "isolation forest needs trees and a positive expected depth"));
            }
            let mut trees = Vec::with_capacity(p.trees.len());
            for nodes in &p.trees {
                if nodes.is_empty() {
                    return Err(invalid(name, "isolation tree has no nodes"));
                }
                let resolved = nodes
                    .iter()
                    .map(|n| {
                        for child in [n.left, n.right] {
                            if child >= 0 && child as usize >= nodes.len() {
                                return Err(invalid(name, "isolation tree child out of range"));
                            }
                        }
                        resolve_feature(name, &n.feature).map(|i| (i, n.split, n.left, n.right))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                trees.push(resolved);
            }
            ModelKind::Iso {
                trees,
                expected_depth: p.expected_depth,
            }
        }
    };

    Ok(Arc::new(LoadedModel {
        name: name.to_string(),
        scaler,
        kind,
    }))
}

fn invalid(model: &str, reason: &str) -> PredictorError {
    PredictorError::InvalidParameters {
        model: model.to_string(),
        reason: reason.to_string(),
    }
}

fn resolve_feature(model: &str, feature: &str) -> Result<usize, PredictorError> {
    super::layout::feature_index(feature).ok_or_else(|| {
        PredictorError::InvalidParameters {
            model: model.to_string(),
            reason: format!("unknown feature '{feature}'"),
        }
    })
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Predictor for LoadedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, features: &FeatureVector) -> Result<f32, PredictorError> {
        features
            .validate()
            .map_err(|e| PredictorError::ScoringFailed {
                model: self.name.clone(),
                reason: e.to_string(),
            })?;

        let mut values = features.values;
        if let Some((means, stds)) = &self.scaler {
            for i in 0..FEATURE_COUNT {
                let std = stds[i].max(1e-8);
                values[i] = (values[i] - means[i]) / std;
            }
        }

        let p = match &self.kind {
            ModelKind::Trees {
                aggregation,
                bias,
                stumps,
            } => {
                let sum: f32 = stumps
                    .iter()
                    .map(|&(i, t, below, above)| if values[i] <= t { below } else { above })
                    .sum();
                match aggregation {
                    TreeAggregation::Average => sum / stumps.len() as f32,
                    TreeAggregation::LogitSum => sigmoid(bias + sum),
                }
            }
            ModelKind::Linear { weights, bias } => {
                let x = Array1::from_vec(values.to_vec());
                sigmoid(weights.dot(&x) + bias)
            }
            ModelKind::Mlp { layers } => {
                let mut x = Array1::from_vec(values.to_vec());
                let last = layers.len() - 1;
                for (li, (w, b)) in layers.iter().enumerate() {
                    x = w.dot(&x) + b;
                    if li < last {
                        x.mapv_inplace(|v| v.max(0.0));
                    }
                }
                sigmoid(x[0])
            }
            ModelKind::Iso {
                trees,
                expected_depth,
            } => {
                let mean_depth: f32 = trees
                    .iter()
                    .map(|t| isolation_depth(t, &values))
                    .sum::<f32>()
                    / trees.len() as f32;
                // sklearn-style decision score in (-0.5, 0.5]: short paths
                // (anomalies) go negative
                let raw = 0.5 - 2f32.powf(-mean_depth / expected_depth);
                // Fixed affine-then-clamp normalization into [0,1]
                ((0.5 - raw) / 0.5).clamp(0.0, 1.0)
            }
        };

        if !p.is_finite() {
            return Err(PredictorError::ScoringFailed {
                model: self.name.clone(),
                reason: "non-finite output".to_string(),
            });
        }

        Ok(p.clamp(0.0, 1.0))
    }
}

/// Walk one isolation tree; returns the depth at which the point isolates
fn isolation_depth(nodes: &[(usize, f32, i32, i32)], values: &[f32; FEATURE_COUNT]) -> f32 {
    let mut idx = 0usize;
    // Bounded by node count; validated trees cannot loop longer than this
    for _ in 0..=nodes.len() {
        let (feature, split, left, right) = nodes[idx];
        let child = if values[feature] <= split { left } else { right };
        if child < 0 {
            return (-child) as f32;
        }
        idx = child as usize;
    }
    nodes.len() as f32
}

// ============================================================================
// TESTS
// ============================================================================
