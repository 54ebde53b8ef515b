//! Event Bridge - cross-instance fan-out
//!
//! Alerts and system notifications published on one instance must reach
//! clients connected to every instance. The bridge is a publish/subscribe
//! seam over named channels; `InProcessBus` backs single-process
//! deployments and tests. Every message carries its origin instance id so
//! a listener can skip its own publications (local fan-out already ran).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::{fan_out_local, Alert};
use crate::registry::{OutboundEvent, Role, SubscriptionRegistry, Topic};

/// Channel carrying serialized fraud alerts
pub const CHANNEL_FRAUD_ALERTS: &str = "fraud_alerts";

/// Channel carrying operational notifications (threshold changes etc.)
pub const CHANNEL_SYSTEM_NOTIFICATIONS: &str = "system_notifications";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge publish failed: {0}")]
    Publish(String),
}

/// One message on the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Instance that published this message
    pub origin: Uuid,
    pub channel: String,
    pub payload: serde_json::Value,
}

/// Cross-instance publish/subscribe seam
pub trait EventBridge: Send + Sync {
    fn publish(
        &self,
        origin: Uuid,
        channel: &str,
        payload: serde_json::Value,
    ) -> Result<(), BridgeError>;

    fn subscribe(&self) -> broadcast::Receiver<BridgeMessage>;
}

/// In-process bridge over a tokio broadcast channel. Publishing with no
/// subscribers is not an error; there is simply no one to tell.
pub struct InProcessBus {
    tx: broadcast::Sender<BridgeMessage>,
}

impl InProcessBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBridge for InProcessBus {
    fn publish(
        &self,
        origin: Uuid,
        channel: &str,
        payload: serde_json::Value,
    ) -> Result<(), BridgeError> {
        let message = BridgeMessage {
            origin,
            channel: channel.to_string(),
            payload,
        };
        let _ = self.tx.send(message);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BridgeMessage> {
        self.tx.subscribe()
    }
}

/// Run the bridge listener until cancelled. Messages from this instance
/// are skipped; remote fraud alerts fan out locally (local only, never
/// re-published); remote system notifications go to their target roles.
/// A malformed message is logged and never stops the loop.
pub fn spawn_bridge_listener(
    bridge: Arc<dyn EventBridge>,
    registry: Arc<SubscriptionRegistry>,
    instance_id: Uuid,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bridge.subscribe();

    tokio::spawn(async move {
        info!(instance_id = %instance_id, "bridge listener started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("bridge listener stopping");
                    break;
                }
                msg = rx.recv() => match msg {
                    Ok(message) => handle_bridge_message(&registry, instance_id, message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bridge listener lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("bridge closed, listener stopping");
                        break;
                    }
                },
            }
        }
    })
}

fn handle_bridge_message(
    registry: &SubscriptionRegistry,
    instance_id: Uuid,
    message: BridgeMessage,
) {
    if message.origin == instance_id {
        return;
    }

    match message.channel.as_str() {
        CHANNEL_FRAUD_ALERTS => match serde_json::from_value::<Alert>(message.payload) {
            Ok(alert) => {
                let delivered = fan_out_local(registry, &alert);
                debug!(alert_id = %alert.id, delivered, "remote alert fanned out");
            }
            Err(e) => warn!(error = %e, "malformed alert on bridge, skipping"),
        },
        CHANNEL_SYSTEM_NOTIFICATIONS => {
            deliver_system_notification(registry, message.payload);
        }
        other => debug!(channel = other, "unknown bridge channel, skipping"),
    }
}

/// System notifications carry an optional `roles` list naming the target
/// role topics; absent or empty means analysts and admins.
fn deliver_system_notification(registry: &SubscriptionRegistry, payload: serde_json::Value) {
    let roles: Vec<Role> = payload
        .get("roles")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let roles = if roles.is_empty() {
        vec![Role::Analyst, Role::Admin]
    } else {
        roles
    };

    let event = OutboundEvent::new("system_notification", &payload);
    for role in roles {
        registry.publish(&Topic::role(role), &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::Identity;
    use crate::registry::SubscriptionOptions;
    use crate::scoring::AlertLevel;
    use crate::types::Location;
    use chrono::Utc;

    fn test_alert(risk_score: u8) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            transaction_id: "txn_1".to_string(),
            user_id: "user_1".to_string(),
            amount: 1500.0,
            merchant: "Unknown Merchant".to_string(),
            risk_score,
            fraud_probability: risk_score as f32 / 100.0,
            alert_level: AlertLevel::from_risk_score(risk_score),
            location: Location::default(),
            payment_method: "card".to_string(),
            fraud_reasons: vec![],
        }
    }

    fn subscribed_client(
        registry: &SubscriptionRegistry,
        user_id: &str,
    ) -> tokio::sync::mpsc::UnboundedReceiver<OutboundEvent> {
        let (id, mut rx) = registry.connect(&Identity {
            user_id: user_id.to_string(),
            role: Role::Analyst,
        });
        registry
            .subscribe(id, Topic::fraud_alerts(), Some(SubscriptionOptions::default()))
            .unwrap();
        while rx.try_recv().is_ok() {}
        rx
    }

    #[tokio::test]
    async fn test_listener_skips_own_origin() {
        let bridge: Arc<dyn EventBridge> = Arc::new(InProcessBus::default());
        let registry = Arc::new(SubscriptionRegistry::new());
        let instance_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        let handle =
            spawn_bridge_listener(bridge.clone(), registry.clone(), instance_id, cancel.clone());
        let mut rx = subscribed_client(&registry, "analyst_1");

        // own origin: must not fan out a second time
        bridge
            .publish(
                instance_id,
                CHANNEL_FRAUD_ALERTS,
                serde_json::to_value(test_alert(85)).unwrap(),
            )
            .unwrap();
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        // remote origin: fans out locally
        bridge
            .publish(
                Uuid::new_v4(),
                CHANNEL_FRAUD_ALERTS,
                serde_json::to_value(test_alert(85)).unwrap(),
            )
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_ok());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_stop_listener() {
        let bridge: Arc<dyn EventBridge> = Arc::new(InProcessBus::default());
        let registry = Arc::new(SubscriptionRegistry::new());
        let cancel = CancellationToken::new();

        let handle = spawn_bridge_listener(
            bridge.clone(),
            registry.clone(),
            Uuid::new_v4(),
            cancel.clone(),
        );
        let mut rx = subscribed_client(&registry, "analyst_1");

        bridge
            .publish(
                Uuid::new_v4(),
                CHANNEL_FRAUD_ALERTS,
                serde_json::json!({"not": "an alert"}),
            )
            .unwrap();
        bridge
            .publish(
                Uuid::new_v4(),
                CHANNEL_FRAUD_ALERTS,
                serde_json::to_value(test_alert(90)).unwrap(),
            )
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, "fraud_alert");

        cancel.cancel();
        handle.await.unwrap();
    }
}
