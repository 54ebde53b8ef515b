//! Feature extraction: Transaction -> FeatureVector
//!
//! Pure and total: the same transaction always yields the same vector, and
//! extraction never fails. Missing or malformed optional fields resolve to
//! documented defaults (0.0, length 0, or the reserved unknown code 0).
//! Anomaly thresholds live in `constants.rs` and are part of the contract.

use std::collections::HashMap;

use chrono::{Datelike, Timelike};
use once_cell::sync::Lazy;

use crate::constants::{
    HIGH_AMOUNT_THRESHOLD, MERCHANT_HASH_BUCKETS, ODD_HOUR_AFTER, ODD_HOUR_BEFORE,
};
use crate::types::Transaction;

use super::vector::FeatureVector;

/// Reserved encoding for categories not present in the tables
pub const UNKNOWN_CATEGORY_CODE: f32 = 0.0;

/// Stable merchant category encoding. Predictors are trained against these
/// codes; never renumber, only append.
static MERCHANT_CATEGORY_CODES: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        ("grocery", 1.0),
        ("electronics", 2.0),
        ("clothing", 3.0),
        ("gas_station", 4.0),
        ("restaurant", 5.0),
        ("travel", 6.0),
        ("entertainment", 7.0),
        ("other", 8.0),
        ("cash_advance", 9.0),
    ])
});

/// Stable payment method encoding
static PAYMENT_METHOD_CODES: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        ("card", 1.0),
        ("wallet", 2.0),
        ("bank_transfer", 3.0),
        ("crypto", 4.0),
    ])
});

/// Stable country encoding
static COUNTRY_CODES: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        ("USA", 1.0),
        ("Canada", 2.0),
        ("Mexico", 3.0),
        ("UK", 4.0),
        ("Germany", 5.0),
        ("France", 6.0),
        ("Japan", 7.0),
        ("Australia", 8.0),
    ])
});

/// Feature extractor for raw transactions
pub struct TransactionFeatureExtractor;

impl TransactionFeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the fixed-layout feature vector from a transaction
    pub fn extract(&self, tx: &Transaction) -> FeatureVector {
        let mut v = FeatureVector::new();

        // Basic transaction features
        v.set_by_name("amount", tx.amount as f32);
        v.set_by_name("user_numeric", user_numeric(&tx.user_id));

        // Time decomposition. Derived only from the transaction's own
        // timestamp, never from the wall clock.
        let ts = tx.timestamp;
        let hour = ts.hour();
        v.set_by_name("hour_of_day", hour as f32);
        v.set_by_name("day_of_week", ts.weekday().num_days_from_monday() as f32);
        v.set_by_name("day_of_month", ts.day() as f32);
        v.set_by_name("month", ts.month() as f32);
        v.set_by_name("unix_time", ts.timestamp() as f32);

        // Location
        v.set_by_name("latitude", tx.location.coordinates[0] as f32);
        v.set_by_name("longitude", tx.location.coordinates[1] as f32);
        v.set_by_name("city_name_len", tx.location.city.len() as f32);

        // Categorical encodings (unknown -> reserved code 0)
        v.set_by_name(
            "merchant_category_code",
            encode(&MERCHANT_CATEGORY_CODES, &tx.merchant_category),
        );
        v.set_by_name(
            "payment_method_code",
            encode(&PAYMENT_METHOD_CODES, &tx.payment_method),
        );
        v.set_by_name("country_code", encode(&COUNTRY_CODES, &tx.location.country));

        // Device & network
        v.set_by_name("device_id_len", tx.device_info.device_id.len() as f32);
        v.set_by_name("user_agent_len", tx.device_info.user_agent.len() as f32);
        v.set_by_name("ip_numeric", ip_to_numeric(&tx.device_info.ip_address));

        // Merchant
        v.set_by_name("merchant_name_len", tx.merchant_name.len() as f32);
        v.set_by_name("merchant_hash_bucket", merchant_hash_bucket(&tx.merchant_name));

        // Engineered amount features
        v.set_by_name("amount_log1p", (tx.amount.max(0.0) + 1.0).ln() as f32);
        v.set_by_name("amount_hundreds", (tx.amount / 100.0) as f32);

        // Velocity features are fed by a history service upstream; here they
        // stay at their documented default of 0.0.

        // Anomaly indicators
        let odd_hour = hour < ODD_HOUR_BEFORE || hour > ODD_HOUR_AFTER;
        v.set_by_name("odd_hour_flag", if odd_hour { 1.0 } else { 0.0 });
        v.set_by_name(
            "high_amount_flag",
            if tx.amount > HIGH_AMOUNT_THRESHOLD { 1.0 } else { 0.0 },
        );

        v
    }
}

impl Default for TransactionFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a categorical code; unseen values map to the reserved unknown code
fn encode(table: &HashMap<&'static str, f32>, value: &str) -> f32 {
    table.get(value).copied().unwrap_or(UNKNOWN_CATEGORY_CODE)
}

/// Numeric part of a user identifier like "user_123"; 0.0 when absent
fn user_numeric(user_id: &str) -> f32 {
    user_id
        .rsplit('_')
        .next()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(0.0)
}

/// IPv4 dotted-decimal to a single numeric value; 0.0 for anything malformed
fn ip_to_numeric(ip: &str) -> f32 {
    let mut parts = ip.split('.');
    let octets: Option<[f32; 4]> = (|| {
        let a = parts.next()?.parse::<f32>().ok()?;
        let b = parts.next()?.parse::<f32>().ok()?;
        let c = parts.next()?.parse::<f32>().ok()?;
        let d = parts.next()?.parse::<f32>().ok()?;
        Some([a, b, c, d])
    })();

    match octets {
        Some([a, b, c, d]) => a * 16_777_216.0 + b * 65_536.0 + c * 256.0 + d,
        None => 0.0,
    }
}

/// Merchant name hashed into a fixed bucket count (crc32 keeps this stable
/// across builds, unlike the std hasher)
fn merchant_hash_bucket(name: &str) -> f32 {
    (crc32fast::hash(name.as_bytes()) % MERCHANT_HASH_BUCKETS) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::layout::FEATURE_COUNT;
    use crate::types::{DeviceInfo, Location};
    use chrono::TimeZone;

    fn sample_transaction() -> Transaction {
        Transaction {
            id: "txn_test".to_string(),
            user_id: "user_123".to_string(),
            amount: 1500.0,
            currency: "USD".to_string(),
            merchant_name: "Unknown Merchant".to_string(),
            merchant_category: "other".to_string(),
            timestamp: chrono::Utc.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap(),
            location: Location {
                country: "XX".to_string(),
                city: "Lagos".to_string(),
                coordinates: [6.5244, 3.3792],
            },
            payment_method: "card".to_string(),
            device_info: DeviceInfo {
                device_id: "device_001".to_string(),
                ip_address: "192.168.1.100".to_string(),
                user_agent: "Mozilla/5.0".to_string(),
            },
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = TransactionFeatureExtractor::new();
        let tx = sample_transaction();

        let a = extractor.extract(&tx);
        let b = extractor.extract(&tx);

        assert_eq!(a, b);
        assert_eq!(a.values.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_anomaly_indicators() {
        let extractor = TransactionFeatureExtractor::new();
        let tx = sample_transaction();
        let v = extractor.extract(&tx);

        // 3am, 1500 USD
        assert_eq!(v.get_by_name("odd_hour_flag"), Some(1.0));
        assert_eq!(v.get_by_name("high_amount_flag"), Some(1.0));
        assert_eq!(v.get_by_name("hour_of_day"), Some(3.0));
    }

    #[test]
    fn test_unknown_categories_map_to_reserved_code() {
        let extractor = TransactionFeatureExtractor::new();
        let tx = sample_transaction();
        let v = extractor.extract(&tx);

        // "XX" is not in the country table, "other" is in the category table
        assert_eq!(v.get_by_name("country_code"), Some(UNKNOWN_CATEGORY_CODE));
        assert_eq!(v.get_by_name("merchant_category_code"), Some(8.0));
        assert_eq!(v.get_by_name("payment_method_code"), Some(1.0));
    }

    #[test]
    fn test_malformed_fields_never_fail() {
        let extractor = TransactionFeatureExtractor::new();
        let mut tx = sample_transaction();
        tx.user_id = "not-numeric".to_string();
        tx.device_info.ip_address = "garbage".to_string();
        tx.merchant_name = String::new();

        let v = extractor.extract(&tx);
        assert_eq!(v.get_by_name("user_numeric"), Some(0.0));
        assert_eq!(v.get_by_name("ip_numeric"), Some(0.0));
        assert_eq!(v.get_by_name("merchant_name_len"), Some(0.0));
    }

    #[test]
    fn test_ip_to_numeric() {
        assert_eq!(ip_to_numeric("0.0.0.1"), 1.0);
        assert_eq!(ip_to_numeric("0.0.1.0"), 256.0);
        assert_eq!(ip_to_numeric("1.2.3"), 0.0);
        assert_eq!(ip_to_numeric(""), 0.0);
    }

    #[test]
    fn test_amount_log1p() {
        let extractor = TransactionFeatureExtractor::new();
        let tx = sample_transaction();
        let v = extractor.extract(&tx);

        let expected = (1500.0f64 + 1.0).ln() as f32;
        assert!((v.get_by_name("amount_log1p").unwrap() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_merchant_hash_bucket_range() {
        for name in ["Walmart", "Target", "Amazon", ""] {
            let bucket = merchant_hash_bucket(name);
            assert!(bucket >= 0.0 && bucket < MERCHANT_HASH_BUCKETS as f32);
        }
    }
}
