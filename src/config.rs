//! Configuration module

use crate::constants;

/// Core pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Fraud probability threshold (0.0 - 1.0)
    pub fraud_threshold: f32,

    /// Connection health check interval in seconds
    pub health_check_interval_secs: u64,

    /// Session liveness window in seconds
    pub liveness_window_secs: u64,

    /// Live stats broadcast interval in seconds
    pub stats_interval_secs: u64,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            fraud_threshold: constants::get_fraud_threshold(),
            health_check_interval_secs: constants::get_health_check_interval(),
            liveness_window_secs: constants::get_liveness_window(),
            stats_interval_secs: constants::get_stats_interval(),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fraud_threshold: constants::DEFAULT_FRAUD_THRESHOLD,
            health_check_interval_secs: constants::DEFAULT_HEALTH_CHECK_INTERVAL,
            liveness_window_secs: constants::DEFAULT_LIVENESS_WINDOW,
            stats_interval_secs: constants::DEFAULT_STATS_INTERVAL,
            environment: "development".to_string(),
        }
    }
}
