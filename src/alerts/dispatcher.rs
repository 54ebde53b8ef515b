//! Alert Dispatcher - ordered delivery of queued alerts
//!
//! Alerts flow through an unbounded mpsc queue with a single consumer, so
//! delivery order matches enqueue order. For each alert the consumer
//! persists it, fans it out to local subscribers, then publishes it on the
//! bridge for other instances. A failure at any step is logged and the
//! alert is not requeued; the next alert proceeds.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tracing::{debug, info, warn};

use crate::bridge::{EventBridge, CHANNEL_FRAUD_ALERTS};
use crate::external::AlertStore;
use crate::registry::{OutboundEvent, Role, SubscriptionRegistry, Topic};

use super::types::Alert;

/// Everything the dispatch loop needs
pub struct DispatchContext {
    pub registry: Arc<SubscriptionRegistry>,
    pub bridge: Arc<dyn EventBridge>,
    pub store: Arc<dyn AlertStore>,
    pub instance_id: Uuid,
}

/// Producer handle onto the alert queue
#[derive(Clone)]
pub struct AlertDispatcher {
    tx: mpsc::UnboundedSender<Alert>,
}

impl AlertDispatcher {
    /// Queue an alert for delivery. Returns false if the dispatch loop
    /// has already shut down.
    pub fn enqueue(&self, alert: Alert) -> bool {
        self.tx.send(alert).is_ok()
    }
}

/// Start the dispatch loop. It drains the queue until cancelled.
pub fn spawn_dispatcher(
    ctx: DispatchContext,
    cancel: CancellationToken,
) -> (AlertDispatcher, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Alert>();

    let handle = tokio::spawn(async move {
        info!("alert dispatcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("alert dispatcher stopping");
                    break;
                }
                alert = rx.recv() => match alert {
                    Some(alert) => dispatch_one(&ctx, alert),
                    None => break,
                },
            }
        }
    });

    (AlertDispatcher { tx }, handle)
}

fn dispatch_one(ctx: &DispatchContext, alert: Alert) {
    if let Err(e) = ctx.store.save(&alert) {
        warn!(alert_id = %alert.id, error = %e, "failed to persist alert, delivering anyway");
    }

    let delivered = fan_out_local(&ctx.registry, &alert);
    debug!(
        alert_id = %alert.id,
        risk_score = alert.risk_score,
        level = %alert.alert_level,
        delivered,
        "alert dispatched"
    );

    // Other instances fan out to their own clients from the bridge copy
    match serde_json::to_value(&alert) {
        Ok(payload) => {
            if let Err(e) = ctx
                .bridge
                .publish(ctx.instance_id, CHANNEL_FRAUD_ALERTS, payload)
            {
                warn!(alert_id = %alert.id, error = %e, "bridge publish failed");
            }
        }
        Err(e) => warn!(alert_id = %alert.id, error = %e, "alert serialization failed"),
    }
}

/// Fan one alert out to this instance's clients: filtered fraud_alerts
/// subscribers, the affected user's own sessions, and (for critical
/// alerts) every admin session. Returns total deliveries.
pub fn fan_out_local(registry: &SubscriptionRegistry, alert: &Alert) -> usize {
    let mut delivered = registry.publish_alert(alert, false);

    delivered += registry.publish(
        &Topic::user(&alert.user_id),
        &OutboundEvent::new("user_fraud_alert", alert),
    );

    if alert.alert_level == crate::scoring::AlertLevel::Critical {
        delivered += registry.publish(
            &Topic::role(Role::Admin),
            &OutboundEvent::new("critical_fraud_alert", alert),
        );
    }

    delivered
}
