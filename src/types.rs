//! Transaction input types
//!
//! Wire shape mirrors the ingestion payload (camelCase field names).
//! Transactions are immutable once received; the core only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geolocation of a transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    /// [latitude, longitude]
    #[serde(default)]
    pub coordinates: [f64; 2],
}

/// Device fingerprint attached to a transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
}

/// A raw transaction record, as produced by the ingestion path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub merchant_name: String,
    #[serde(default)]
    pub merchant_category: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub device_info: DeviceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_missing_optional_fields() {
        let json = r#"{
            "id": "txn_001",
            "userId": "user_42",
            "amount": 250.75,
            "timestamp": "2026-01-15T03:00:00Z"
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, "txn_001");
        assert_eq!(tx.user_id, "user_42");
        assert!(tx.merchant_name.is_empty());
        assert!(tx.location.country.is_empty());
        assert_eq!(tx.location.coordinates, [0.0, 0.0]);
    }

    #[test]
    fn test_camel_case_field_names() {
        let tx = Transaction {
            id: "txn_002".to_string(),
            user_id: "user_7".to_string(),
            amount: 10.0,
            currency: "USD".to_string(),
            merchant_name: "Target".to_string(),
            merchant_category: "grocery".to_string(),
            timestamp: Utc::now(),
            location: Location::default(),
            payment_method: "card".to_string(),
            device_info: DeviceInfo::default(),
        };

        let value = serde_json::to_value(&tx).unwrap();
        assert!(value.get("userId").is_some());
        assert!(value.get("merchantName").is_some());
        assert!(value.get("paymentMethod").is_some());
    }
}
