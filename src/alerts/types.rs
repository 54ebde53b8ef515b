//! Alert wire type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{AlertLevel, ScoreResult};
use crate::types::{Location, Transaction};

/// A fraud alert, in the shape clients receive it. Field names are the
/// wire contract; do not rename without versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: String,
    pub user_id: String,
    pub amount: f64,
    pub merchant: String,
    pub risk_score: u8,
    pub fraud_probability: f32,
    pub alert_level: AlertLevel,
    pub location: Location,
    pub payment_method: String,
    pub fraud_reasons: Vec<String>,
}

impl Alert {
    /// Build an alert from a flagged transaction and its scoring outcome
    pub fn from_score(tx: &Transaction, result: &ScoreResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            transaction_id: tx.id.clone(),
            user_id: tx.user_id.clone(),
            amount: tx.amount,
            merchant: tx.merchant_name.clone(),
            risk_score: result.risk_score,
            fraud_probability: result.fraud_probability,
            alert_level: result.alert_level,
            location: tx.location.clone(),
            payment_method: tx.payment_method.clone(),
            fraud_reasons: result.fraud_reasons.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_wire_field_names() {
        let alert = Alert {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            transaction_id: "txn_1".to_string(),
            user_id: "user_1".to_string(),
            amount: 1500.0,
            merchant: "Unknown Merchant".to_string(),
            risk_score: 85,
            fraud_probability: 0.85,
            alert_level: AlertLevel::High,
            location: Location::default(),
            payment_method: "card".to_string(),
            fraud_reasons: vec!["High transaction amount".to_string()],
        };

        let v = serde_json::to_value(&alert).unwrap();
        for key in [
            "id",
            "timestamp",
            "transaction_id",
            "user_id",
            "amount",
            "merchant",
            "risk_score",
            "fraud_probability",
            "alert_level",
            "location",
            "payment_method",
            "fraud_reasons",
        ] {
            assert!(v.get(key).is_some(), "missing wire field {key}");
        }
        assert_eq!(v["alert_level"], "high");
    }
}
