//! External collaborator seams
//!
//! Everything the pipeline needs from the outside world comes in through
//! these traits: model parameters, alert persistence, authentication, and
//! the fraud ledger. The in-memory implementations back the default wiring
//! and the test suites; production deployments substitute their own.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::alerts::Alert;
use crate::error::CoreResult;
use crate::registry::Role;
use crate::scoring::{PredictorError, PredictorSpec, ScoreResult};

/// An authenticated caller, as resolved by the auth collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

// ============================================
// Model store
// ============================================

/// Source of trained model parameters, keyed by predictor name
pub trait ModelStore: Send + Sync {
    fn load_predictor(&self, name: &str) -> Result<PredictorSpec, PredictorError>;
    fn is_available(&self, name: &str) -> bool;
}

/// Model store over an in-memory map of parameter specs
#[derive(Default)]
pub struct InMemoryModelStore {
    specs: HashMap<String, PredictorSpec>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, spec: PredictorSpec) {
        self.specs.insert(name.to_string(), spec);
    }
}

impl ModelStore for InMemoryModelStore {
    fn load_predictor(&self, name: &str) -> Result<PredictorSpec, PredictorError> {
        self.specs
            .get(name)
            .cloned()
            .ok_or_else(|| PredictorError::Unavailable(name.to_string()))
    }

    fn is_available(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }
}

// ============================================
// Alert store
// ============================================

/// Durable sink for dispatched alerts
pub trait AlertStore: Send + Sync {
    fn save(&self, alert: &Alert) -> CoreResult<()>;
}

/// Alert store over an in-memory vector, idempotent on alert id
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: Mutex<Vec<Alert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn save(&self, alert: &Alert) -> CoreResult<()> {
        let mut alerts = self.alerts.lock();
        if alerts.iter().any(|a| a.id == alert.id) {
            debug!(alert_id = %alert.id, "alert already stored, skipping");
            return Ok(());
        }
        alerts.push(alert.clone());
        Ok(())
    }
}

// ============================================
// Authentication
// ============================================

/// Resolves a bearer token to an identity. `None` means rejected.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<Identity>;
}

/// Token-prefix authenticator: `admin_*` and `analyst_*` tokens map to
/// the elevated roles, anything else non-empty is a regular user whose
/// user id is the token itself.
#[derive(Default)]
pub struct TokenPrefixAuthenticator;

impl TokenPrefixAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

impl Authenticator for TokenPrefixAuthenticator {
    fn authenticate(&self, token: &str) -> Option<Identity> {
        if token.is_empty() {
            return None;
        }
        let role = if token.starts_with("admin_") {
            Role::Admin
        } else if token.starts_with("analyst_") {
            Role::Analyst
        } else {
            Role::User
        };
        Some(Identity {
            user_id: token.to_string(),
            role,
        })
    }
}

// ============================================
// Fraud ledger
// ============================================

/// Records every scoring outcome for audit. Returns a ledger entry id
/// when one was written; recording is best effort and never blocks scoring.
pub trait FraudLedger: Send + Sync {
    fn record(&self, transaction_id: &str, result: &ScoreResult) -> Option<String>;
}

/// Ledger that assigns entry ids but keeps nothing
#[derive(Default)]
pub struct NoopLedger;

impl NoopLedger {
    pub fn new() -> Self {
        Self
    }
}

impl FraudLedger for NoopLedger {
    fn record(&self, transaction_id: &str, result: &ScoreResult) -> Option<String> {
        debug!(
            transaction_id,
            probability = result.fraud_probability,
            is_fraud = result.is_fraud,
            "ledger entry (noop)"
        );
        Some(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_prefix_roles() {
        let auth = TokenPrefixAuthenticator::new();

        assert_eq!(auth.authenticate("admin_7").unwrap().role, Role::Admin);
        assert_eq!(auth.authenticate("analyst_2").unwrap().role, Role::Analyst);
        assert_eq!(auth.authenticate("user_42").unwrap().role, Role::User);
        assert!(auth.authenticate("").is_none());
    }

    #[test]
    fn test_model_store_miss_is_unavailable() {
        let store = InMemoryModelStore::new();
        assert!(!store.is_available("random_forest"));
        assert!(matches!(
            store.load_predictor("random_forest"),
            Err(PredictorError::Unavailable(_))
        ));
    }
}
