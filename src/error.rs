//! Error handling
//!
//! Failure taxonomy for the core pipeline. Extraction never fails (missing
//! fields resolve to documented defaults), predictor failures degrade the
//! ensemble, delivery failures are per-target, and registry inconsistencies
//! are programming-invariant violations: fatal in debug builds, self-healing
//! (and logged as a defect) in release builds.

use thiserror::Error;
use uuid::Uuid;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Threshold updates outside [0, 1] are rejected
    #[error("threshold {0} is outside [0.0, 1.0]")]
    InvalidThreshold(f32),

    /// Operation referenced a session the registry does not know
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    /// Session table and user index disagree (defect signal)
    #[error("registry inconsistency: {0}")]
    RegistryInconsistency(String),

    /// A per-target send or bridge publish failed
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    /// Predictor load or scoring failure
    #[error(transparent)]
    Predictor(#[from] crate::scoring::PredictorError),

    /// Persistence collaborator failure
    #[error("store error: {0}")]
    Store(String),
}
