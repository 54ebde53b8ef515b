//! Scoring Module - feature engineering, predictor set, ensemble, classifier
//!
//! - `layout` / `vector` - versioned feature schema
//! - `extractor` - Transaction -> FeatureVector
//! - `predictor` - model implementations over loaded parameters
//! - `ensemble` - weighted combination with failure renormalization
//! - `classifier` - threshold gate + risk score + alert tier
//! - `detector` - the facade the pipeline calls

pub mod classifier;
pub mod detector;
pub mod ensemble;
pub mod extractor;
pub mod layout;
pub mod predictor;
pub mod vector;

pub use classifier::{AlertLevel, Classification, RiskClassifier};
pub use detector::{FraudDetector, ScoreResult};
pub use ensemble::{EnsembleOutput, EnsembleScorer, ScoreStatus};
pub use extractor::TransactionFeatureExtractor;
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use predictor::{build_predictor, ModelParams, Predictor, PredictorError, PredictorSpec};
pub use vector::FeatureVector;
