//! Feature Layout - Centralized Feature Definition
//!
//! This file controls the feature schema shared by every predictor.
//!
//! ## Rules:
//! 1. Add feature -> increment FEATURE_VERSION
//! 2. Change order -> increment FEATURE_VERSION
//! 3. Remove feature -> increment FEATURE_VERSION
//!
//! Any layout change invalidates all trained predictors; the hash lets
//! the loader reject parameter sets trained against a different schema.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Basic transaction (0-1) ===
    "amount",                // 0: Transaction amount
    "user_numeric",          // 1: Numeric part of the user identifier

    // === Time decomposition (2-6) ===
    "hour_of_day",           // 2: Hour of day (0-23)
    "day_of_week",           // 3: Day of week (0=Monday .. 6=Sunday)
    "day_of_month",          // 4: Day of month (1-31)
    "month",                 // 5: Month (1-12)
    "unix_time",             // 6: Unix timestamp (seconds)

    // === Location (7-9) ===
    "latitude",              // 7: Latitude
    "longitude",             // 8: Longitude
    "city_name_len",         // 9: City name length

    // === Categorical encodings (10-12) ===
    "merchant_category_code",// 10: Encoded merchant category (0 = unknown)
    "payment_method_code",   // 11: Encoded payment method (0 = unknown)
    "country_code",          // 12: Encoded country (0 = unknown)

    // === Device & network (13-15) ===
    "device_id_len",         // 13: Device identifier length
    "user_agent_len",        // 14: Client signature string length
    "ip_numeric",            // 15: IPv4 address as a single number

    // === Merchant (16-17) ===
    "merchant_name_len",     // 16: Merchant name length
    "merchant_hash_bucket",  // 17: Merchant name hash bucket (0-999)

    // === Engineered amount features (18-19) ===
    "amount_log1p",          // 18: ln(1 + amount)
    "amount_hundreds",       // 19: Amount in hundreds

    // === Velocity placeholders (20-22) ===
    "txns_last_hour",        // 20: Transactions in last hour (history feed, 0 here)
    "amount_last_day",       // 21: Amount spent in last 24h (history feed, 0 here)
    "merchants_last_week",   // 22: Distinct merchants last week (history feed, 0 here)

    // === Anomaly indicators (23-24) ===
    "odd_hour_flag",         // 23: 1 when hour < 6 or hour > 22
    "high_amount_flag",      // 24: 1 when amount > 1000
];

/// Total number of features. Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 25;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Get layout hash (inputs are const, so this is stable per build)
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when feature layout doesn't match expected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version, self.expected_hash, self.actual_version, self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name (O(n) but features are few)
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 25);
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());
        assert!(validate_layout(FEATURE_VERSION, layout_hash().wrapping_add(1)).is_err());
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index("amount"), Some(0));
        assert_eq!(feature_index("odd_hour_flag"), Some(23));
        assert_eq!(feature_index("high_amount_flag"), Some(24));
        assert_eq!(feature_index("nonexistent"), None);
    }

    #[test]
    fn test_feature_name() {
        assert_eq!(feature_name(0), Some("amount"));
        assert_eq!(feature_name(24), Some("high_amount_flag"));
        assert_eq!(feature_name(100), None);
    }
}
