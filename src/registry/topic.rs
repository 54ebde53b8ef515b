//! Topic (room) keys
//!
//! A topic is a string key for one broadcast channel: per-user, per-role,
//! or functional.

use serde::{Deserialize, Serialize};

use super::session::Role;

/// Functional topic: all fraud alerts (per-client filters apply)
pub const FRAUD_ALERTS: &str = "fraud_alerts";

/// Functional topic: periodic live statistics
pub const LIVE_STATS: &str = "live_stats";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Identity-derived topic for one user's sessions
    pub fn user(user_id: &str) -> Self {
        Self(format!("user:{user_id}"))
    }

    /// Identity-derived topic for a role
    pub fn role(role: Role) -> Self {
        Self(format!("role:{}", role.as_str()))
    }

    pub fn fraud_alerts() -> Self {
        Self(FRAUD_ALERTS.to_string())
    }

    pub fn live_stats() -> Self {
        Self(LIVE_STATS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this topic carries filtered fraud alerts
    pub fn is_fraud_alerts(&self) -> bool {
        self.0 == FRAUD_ALERTS
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
