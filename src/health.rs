//! Connection Health Monitor
//!
//! A periodic sweep that evicts sessions silent for longer than the
//! liveness window. Heartbeats refresh `last_activity`; the registry does
//! the comparison and removal under one lock, so the monitor itself is
//! just a timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::SubscriptionRegistry;

/// Run the eviction sweep every `interval` until cancelled
pub fn spawn_health_monitor(
    registry: Arc<SubscriptionRegistry>,
    interval: Duration,
    liveness_window_secs: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            liveness_window_secs, "health monitor started"
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // first tick fires immediately; an eviction sweep at startup is harmless
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("health monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let window = chrono::Duration::seconds(liveness_window_secs as i64);
                    let evicted = registry.evict_stale(window);
                    if !evicted.is_empty() {
                        for session in &evicted {
                            info!(
                                session_id = %session.session_id,
                                user_id = %session.user_id,
                                last_activity = %session.last_activity,
                                "evicted stale session"
                            );
                        }
                    } else {
                        debug!("health sweep: no stale sessions");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::Identity;
    use crate::registry::Role;

    #[tokio::test]
    async fn test_monitor_evicts_stale_sessions() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (_id, _rx) = registry.connect(&Identity {
            user_id: "user_1".to_string(),
            role: Role::User,
        });

        // window of zero seconds: any session older than the tick is stale
        let cancel = CancellationToken::new();
        let handle = spawn_health_monitor(
            registry.clone(),
            Duration::from_millis(10),
            0,
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.get_connected_clients_info().total_connections, 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_monitor_stops_on_cancel() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let cancel = CancellationToken::new();
        let handle = spawn_health_monitor(
            registry,
            Duration::from_secs(60),
            600,
            cancel.clone(),
        );

        cancel.cancel();
        handle.await.unwrap();
    }
}
