//! Subscription Registry - connected clients, topics, fan-out
//!
//! All shared state lives in one owned struct behind a parking_lot RwLock;
//! every mutating operation takes the write lock once and leaves both index
//! structures (session table, user->sessions) consistent before releasing.
//! Publish copies the recipient senders under the read lock, releases, then
//! sends, so no lock is held across a client-facing send.

pub mod session;
pub mod topic;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::alerts::Alert;
use crate::constants::APP_VERSION;
use crate::error::{CoreError, CoreResult};
use crate::external::Identity;

pub use session::{
    ClientSession, ClientSessionInfo, OutboundEvent, Role, SessionId, SubscriptionOptions,
};
pub use topic::Topic;

/// Snapshot of who is connected, for admin surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedClientsInfo {
    pub total_connections: usize,
    pub clients_by_role: HashMap<String, usize>,
    pub active_users: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionId, ClientSession>,
    user_sessions: HashMap<String, HashSet<SessionId>>,
    topic_members: HashMap<Topic, HashSet<SessionId>>,
}

impl RegistryState {
    fn join_topic(&mut self, session_id: SessionId, topic: Topic) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.topics.insert(topic.clone());
            self.topic_members.entry(topic).or_default().insert(session_id);
        }
    }

    fn leave_topic(&mut self, session_id: SessionId, topic: &Topic) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.topics.remove(topic);
        }
        if let Some(members) = self.topic_members.get_mut(topic) {
            members.remove(&session_id);
            if members.is_empty() {
                self.topic_members.remove(topic);
            }
        }
    }

    /// Remove a session from the table, the user index and all topics in
    /// one pass. Detected orphans are healed and reported as defects.
    fn remove_session(&mut self, session_id: SessionId) -> Option<ClientSession> {
        let session = self.sessions.remove(&session_id)?;

        match self.user_sessions.get_mut(&session.user_id) {
            Some(ids) => {
                let was_present = ids.remove(&session_id);
                if !was_present {
                    debug_assert!(false, "session missing from user index");
                    error!(
                        session_id = %session_id,
                        user_id = %session.user_id,
                        "registry inconsistency: session missing from user index"
                    );
                }
                if ids.is_empty() {
                    self.user_sessions.remove(&session.user_id);
                }
            }
            None => {
                debug_assert!(false, "user index entry missing for live session");
                error!(
                    session_id = %session_id,
                    user_id = %session.user_id,
                    "registry inconsistency: user index entry missing"
                );
            }
        }

        for topic in &session.topics {
            if let Some(members) = self.topic_members.get_mut(topic) {
                members.remove(&session_id);
                if members.is_empty() {
                    self.topic_members.remove(topic);
                }
            }
        }

        Some(session)
    }
}

/// Thread-safe registry of connected clients and their topic memberships
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Register an authenticated client. Joins the identity-derived topics
    /// (`user:<id>`, `role:<role>`) automatically and emits
    /// `connection_established`. The returned receiver is the transport end.
    pub fn connect(
        &self,
        identity: &Identity,
    ) -> (SessionId, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ClientSession::new(identity.user_id.clone(), identity.role, tx);
        let session_id = session.session_id;

        let (sender, connected) = {
            let mut state = self.state.write();
            let sender = session.sender();
            state
                .user_sessions
                .entry(identity.user_id.clone())
                .or_default()
                .insert(session_id);
            state.sessions.insert(session_id, session);
            state.join_topic(session_id, Topic::user(&identity.user_id));
            state.join_topic(session_id, Topic::role(identity.role));
            (sender, state.sessions.len())
        };

        info!(session_id = %session_id, user_id = %identity.user_id, role = %identity.role, "client connected");

        let welcome = OutboundEvent::new(
            "connection_established",
            serde_json::json!({
                "session_id": session_id,
                "user_id": identity.user_id,
                "system_status": {
                    "status": "operational",
                    "connected_clients": connected,
                    "version": APP_VERSION,
                }
            }),
        );
        let _ = sender.send(welcome);

        (session_id, rx)
    }

    /// Subscribe a session to a topic. fraud_alerts subscriptions carry
    /// per-client filtering options (stored as subscription metadata).
    pub fn subscribe(
        &self,
        session_id: SessionId,
        topic: Topic,
        options: Option<SubscriptionOptions>,
    ) -> CoreResult<()> {
        let sender = {
            let mut state = self.state.write();
            let session = state
                .sessions
                .get_mut(&session_id)
                .ok_or(CoreError::SessionNotFound(session_id))?;

            if topic.is_fraud_alerts() {
                session.alert_options = Some(options.unwrap_or_default());
            }
            let sender = session.sender();
            state.join_topic(session_id, topic.clone());
            sender
        };

        let _ = sender.send(OutboundEvent::new(
            "subscription_confirmed",
            serde_json::json!({ "topic": topic.as_str() }),
        ));

        debug!(session_id = %session_id, topic = %topic, "subscribed");
        Ok(())
    }

    pub fn unsubscribe(&self, session_id: SessionId, topic: &Topic) -> CoreResult<()> {
        let mut state = self.state.write();
        if !state.sessions.contains_key(&session_id) {
            return Err(CoreError::SessionNotFound(session_id));
        }
        state.leave_topic(session_id, topic);
        Ok(())
    }

    /// Remove a session and every index entry referencing it, atomically.
    /// A publish racing this disconnect may still attempt one send; the
    /// dropped receiver makes that a tolerated no-op.
    pub fn disconnect(&self, session_id: SessionId) -> CoreResult<ClientSessionInfo> {
        let session = {
            let mut state = self.state.write();
            state
                .remove_session(session_id)
                .ok_or(CoreError::SessionNotFound(session_id))?
        };

        info!(session_id = %session_id, user_id = %session.user_id, "client disconnected");
        Ok(ClientSessionInfo::from(&session))
    }

    /// Heartbeat: refresh last_activity under the same lock the health
    /// monitor uses for eviction, so the comparison sees whole values.
    pub fn heartbeat(&self, session_id: SessionId) -> CoreResult<DateTime<Utc>> {
        let (now, sender) = {
            let mut state = self.state.write();
            let session = state
                .sessions
                .get_mut(&session_id)
                .ok_or(CoreError::SessionNotFound(session_id))?;
            let now = Utc::now();
            session.last_activity = now;
            (now, session.sender())
        };

        let _ = sender.send(OutboundEvent::new(
            "pong",
            serde_json::json!({ "timestamp": now }),
        ));
        Ok(now)
    }

    /// Fan an event out to every session currently in the topic.
    /// Returns the number of sessions the event was handed to.
    pub fn publish(&self, topic: &Topic, event: &OutboundEvent) -> usize {
        let recipients: Vec<_> = {
            let state = self.state.read();
            state
                .topic_members
                .get(topic)
                .map(|members| {
                    members
                        .iter()
                        .filter_map(|id| state.sessions.get(id))
                        .map(|s| s.sender())
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut delivered = 0;
        for sender in recipients {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Fan a fraud alert out to fraud_alerts subscribers, honoring each
    /// session's filtering options (minimum risk score, false positives).
    pub fn publish_alert(&self, alert: &Alert, known_false_positive: bool) -> usize {
        let recipients: Vec<_> = {
            let state = self.state.read();
            state
                .topic_members
                .get(&Topic::fraud_alerts())
                .map(|members| {
                    members
                        .iter()
                        .filter_map(|id| state.sessions.get(id))
                        .filter(|s| {
                            let opts = s.alert_options.clone().unwrap_or_default();
                            opts.enabled
                                && alert.risk_score >= opts.min_risk_score
                                && (opts.include_false_positives || !known_false_positive)
                        })
                        .map(|s| s.sender())
                        .collect()
                })
                .unwrap_or_default()
        };

        let event = OutboundEvent::new("fraud_alert", alert);
        let mut delivered = 0;
        for sender in recipients {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Evict sessions idle past the window, as observed at `now`.
    /// One write-lock pass: the snapshot of activity timestamps and the
    /// removal happen under the same lock, so a concurrent heartbeat either
    /// fully precedes the check or fully follows the eviction.
    pub fn evict_idle_since(&self, now: DateTime<Utc>, window: Duration) -> Vec<ClientSessionInfo> {
        let mut state = self.state.write();

        let stale: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|s| now.signed_duration_since(s.last_activity) > window)
            .map(|s| s.session_id)
            .collect();

        stale
            .into_iter()
            .filter_map(|id| state.remove_session(id))
            .map(|s| ClientSessionInfo::from(&s))
            .collect()
    }

    /// Evict sessions idle past the window right now
    pub fn evict_stale(&self, window: Duration) -> Vec<ClientSessionInfo> {
        self.evict_idle_since(Utc::now(), window)
    }

    pub fn get_connected_clients_info(&self) -> ConnectedClientsInfo {
        let state = self.state.read();

        let mut clients_by_role: HashMap<String, usize> = HashMap::new();
        for session in state.sessions.values() {
            *clients_by_role.entry(session.role.to_string()).or_insert(0) += 1;
        }

        ConnectedClientsInfo {
            total_connections: state.sessions.len(),
            clients_by_role,
            active_users: state.user_sessions.len(),
            last_updated: Utc::now(),
        }
    }

    /// Session ids currently in a topic (admin/test surface)
    pub fn sessions_in_topic(&self, topic: &Topic) -> Vec<SessionId> {
        let state = self.state.read();
        state
            .topic_members
            .get(topic)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn session_info(&self, session_id: SessionId) -> Option<ClientSessionInfo> {
        let state = self.state.read();
        state.sessions.get(&session_id).map(ClientSessionInfo::from)
    }

    /// Cross-check the session table, user index and topic memberships.
    /// Any disagreement is a defect signal per the error taxonomy.
    pub fn verify_consistency(&self) -> CoreResult<()> {
        let state = self.state.read();

        for (user_id, ids) in &state.user_sessions {
            for id in ids {
                if !state.sessions.contains_key(id) {
                    return Err(CoreError::RegistryInconsistency(format!(
                        "user index references unknown session {id} for user {user_id}"
                    )));
                }
            }
        }

        for (id, session) in &state.sessions {
            let indexed = state
                .user_sessions
                .get(&session.user_id)
                .map(|ids| ids.contains(id))
                .unwrap_or(false);
            if !indexed {
                return Err(CoreError::RegistryInconsistency(format!(
                    "session {id} missing from user index"
                )));
            }
        }

        for (topic, members) in &state.topic_members {
            for id in members {
                if !state.sessions.contains_key(id) {
                    return Err(CoreError::RegistryInconsistency(format!(
                        "topic {topic} references unknown session {id}"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
