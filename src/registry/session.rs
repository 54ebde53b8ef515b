//! Client sessions and subscription metadata

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::constants::DEFAULT_MIN_RISK_SCORE;

use super::topic::Topic;

pub type SessionId = Uuid;

/// Client role, as reported by the auth collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Analyst,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-client filtering options for the fraud_alerts topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionOptions {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_risk_score")]
    pub min_risk_score: u8,
    #[serde(default)]
    pub include_false_positives: bool,
    #[serde(default = "Utc::now")]
    pub subscribed_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

fn default_min_risk_score() -> u8 {
    DEFAULT_MIN_RISK_SCORE
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_risk_score: DEFAULT_MIN_RISK_SCORE,
            include_false_positives: false,
            subscribed_at: Utc::now(),
        }
    }
}

/// An event on its way to one client. The `event` name is the wire event
/// type; the payload is already in wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl OutboundEvent {
    pub fn new(event: &str, payload: impl Serialize) -> Self {
        let payload = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(event, error = %e, "outbound payload failed to serialize, sending null");
                serde_json::Value::Null
            }
        };
        Self {
            event: event.to_string(),
            payload,
        }
    }
}

/// One connected client. Owned by the registry; the sender half is the
/// transport seam (the receiver lives with whatever carries bytes out).
#[derive(Debug)]
pub struct ClientSession {
    pub session_id: SessionId,
    pub user_id: String,
    pub role: Role,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub topics: HashSet<Topic>,
    /// fraud_alerts filtering options, set on subscribe
    pub alert_options: Option<SubscriptionOptions>,
    pub(super) sender: mpsc::UnboundedSender<OutboundEvent>,
}

impl ClientSession {
    pub(super) fn new(
        user_id: String,
        role: Role,
        sender: mpsc::UnboundedSender<OutboundEvent>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            role,
            connected_at: now,
            last_activity: now,
            topics: HashSet::new(),
            alert_options: None,
            sender,
        }
    }

    /// Best-effort send; a closed receiver (client already gone) is a no-op
    pub(super) fn send(&self, event: OutboundEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub(super) fn sender(&self) -> mpsc::UnboundedSender<OutboundEvent> {
        self.sender.clone()
    }
}

/// Serializable summary of one session (the session itself holds a channel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSessionInfo {
    pub session_id: SessionId,
    pub user_id: String,
    pub role: Role,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub topics: Vec<String>,
}

impl From<&ClientSession> for ClientSessionInfo {
    fn from(s: &ClientSession) -> Self {
        Self {
            session_id: s.session_id,
            user_id: s.user_id.clone(),
            role: s.role,
            connected_at: s.connected_at,
            last_activity: s.last_activity,
            topics: s.topics.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_options_defaults() {
        let opts: SubscriptionOptions = serde_json::from_str("{}").unwrap();
        assert!(opts.enabled);
        assert_eq!(opts.min_risk_score, DEFAULT_MIN_RISK_SCORE);
        assert!(!opts.include_false_positives);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let r: Role = serde_json::from_str("\"analyst\"").unwrap();
        assert_eq!(r, Role::Analyst);
    }

    #[test]
    fn test_unserializable_payload_degrades_to_null() {
        // NaN has no JSON representation; the event still goes out
        let ev = OutboundEvent::new("live_stats_update", f64::NAN);
        assert_eq!(ev.event, "live_stats_update");
        assert_eq!(ev.payload, serde_json::Value::Null);
    }

    #[test]
    fn test_send_to_dropped_receiver_is_noop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ClientSession::new("user_1".to_string(), Role::User, tx);
        drop(rx);

        assert!(!session.send(OutboundEvent::new("ping", serde_json::json!({}))));
    }
}
