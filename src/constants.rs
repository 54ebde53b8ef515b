//! Central Configuration Constants
//!
//! Single source of truth for all scoring and delivery defaults.
//! The extractor's anomaly thresholds are part of the feature contract:
//! changing them changes what trained predictors see.

/// Default fraud probability threshold (probability above this is fraud)
pub const DEFAULT_FRAUD_THRESHOLD: f32 = 0.7;

/// Transactions above this amount raise the high-amount indicator
pub const HIGH_AMOUNT_THRESHOLD: f64 = 1000.0;

/// Hours strictly before this are "odd hours" (00:00-05:59)
pub const ODD_HOUR_BEFORE: u32 = 6;

/// Hours strictly after this are "odd hours" (23:00-23:59)
pub const ODD_HOUR_AFTER: u32 = 22;

/// Merchant names hash into this many buckets
pub const MERCHANT_HASH_BUCKETS: u32 = 1000;

/// Risk score (0-100) bands for alert tiers
pub const CRITICAL_RISK_SCORE: u8 = 90;
pub const HIGH_RISK_SCORE: u8 = 70;
pub const MEDIUM_RISK_SCORE: u8 = 50;

/// Ensemble weights per predictor name. Must sum to 1.0.
pub const ENSEMBLE_WEIGHTS: &[(&str, f32)] = &[
    ("random_forest", 0.25),
    ("gradient_boosting", 0.25),
    ("neural_network", 0.30),
    ("logistic_regression", 0.15),
    ("isolation_forest", 0.05),
];

/// Default health check interval (seconds)
pub const DEFAULT_HEALTH_CHECK_INTERVAL: u64 = 60;

/// Default liveness window (seconds): sessions silent longer are evicted
pub const DEFAULT_LIVENESS_WINDOW: u64 = 600;

/// Default live-stats broadcast interval (seconds)
pub const DEFAULT_STATS_INTERVAL: u64 = 30;

/// Default minimum risk score for fraud_alerts subscriptions
pub const DEFAULT_MIN_RISK_SCORE: u8 = 70;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "SecureCart Core";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get fraud threshold from environment or use default
pub fn get_fraud_threshold() -> f32 {
    std::env::var("FRAUD_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|t| (0.0..=1.0).contains(t))
        .unwrap_or(DEFAULT_FRAUD_THRESHOLD)
}

/// Get health check interval from environment or use default.
/// Zero is rejected: a zero-period interval panics the monitor task.
pub fn get_health_check_interval() -> u64 {
    std::env::var("HEALTH_CHECK_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL)
}

/// Get liveness window from environment or use default. Zero is rejected:
/// it would evict every session on every sweep.
pub fn get_liveness_window() -> u64 {
    std::env::var("LIVENESS_WINDOW")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(DEFAULT_LIVENESS_WINDOW)
}

/// Get stats broadcast interval from environment or use default.
/// Zero is rejected for the same reason as the health interval.
pub fn get_stats_interval() -> u64 {
    std::env::var("STATS_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(DEFAULT_STATS_INTERVAL)
}
