//! Fraud Pipeline - the assembled system
//!
//! Owns the detector, registry, stats, dispatcher, bridge listener and
//! health monitor, and ties their lifetimes to one cancellation token.
//! `process_transaction` is the hot path: score, record, count, and queue
//! an alert when the decision is fraud.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alerts::{spawn_dispatcher, Alert, AlertDispatcher, DispatchContext};
use crate::bridge::{spawn_bridge_listener, EventBridge, CHANNEL_SYSTEM_NOTIFICATIONS};
use crate::config::Config;
use crate::error::CoreResult;
use crate::external::{AlertStore, FraudLedger, ModelStore};
use crate::health::spawn_health_monitor;
use crate::registry::{OutboundEvent, Role, SubscriptionRegistry, Topic};
use crate::scoring::{EnsembleScorer, FraudDetector, RiskClassifier, ScoreResult};
use crate::stats::{spawn_stats_broadcaster, LiveStats};
use crate::types::Transaction;

pub struct FraudPipeline {
    detector: Arc<FraudDetector>,
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<LiveStats>,
    dispatcher: AlertDispatcher,
    bridge: Arc<dyn EventBridge>,
    ledger: Arc<dyn FraudLedger>,
    instance_id: Uuid,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl FraudPipeline {
    /// Assemble and start the pipeline: loads the predictor set from the
    /// model store, then spawns the dispatcher, bridge listener, health
    /// monitor and stats broadcaster.
    pub fn start(
        config: &Config,
        model_store: &dyn ModelStore,
        bridge: Arc<dyn EventBridge>,
        alert_store: Arc<dyn AlertStore>,
        ledger: Arc<dyn FraudLedger>,
    ) -> CoreResult<Self> {
        let instance_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        let ensemble =
            EnsembleScorer::from_model_store(model_store, crate::constants::ENSEMBLE_WEIGHTS);
        let loaded = ensemble.predictor_count();
        let detector = Arc::new(FraudDetector::new(
            ensemble,
            RiskClassifier::new(config.fraud_threshold)?,
        ));

        let registry = Arc::new(SubscriptionRegistry::new());
        let stats = Arc::new(LiveStats::new());

        let (dispatcher, dispatch_task) = spawn_dispatcher(
            DispatchContext {
                registry: registry.clone(),
                bridge: bridge.clone(),
                store: alert_store,
                instance_id,
            },
            cancel.clone(),
        );

        let bridge_task =
            spawn_bridge_listener(bridge.clone(), registry.clone(), instance_id, cancel.clone());

        let health_task = spawn_health_monitor(
            registry.clone(),
            Duration::from_secs(config.health_check_interval_secs),
            config.liveness_window_secs,
            cancel.clone(),
        );

        let stats_task = spawn_stats_broadcaster(
            stats.clone(),
            registry.clone(),
            Duration::from_secs(config.stats_interval_secs),
            cancel.clone(),
        );

        info!(
            instance_id = %instance_id,
            predictors = loaded,
            threshold = config.fraud_threshold,
            environment = %config.environment,
            "fraud pipeline started"
        );

        Ok(Self {
            detector,
            registry,
            stats,
            dispatcher,
            bridge,
            ledger,
            instance_id,
            cancel,
            tasks: vec![dispatch_task, bridge_task, health_task, stats_task],
        })
    }

    /// Score one transaction. The result is always returned to the caller;
    /// ledger recording and alert queueing are side effects that never
    /// block or fail scoring.
    pub fn process_transaction(&self, tx: &Transaction) -> ScoreResult {
        let result = self.detector.score_transaction(tx);

        if self.ledger.record(&tx.id, &result).is_none() {
            warn!(transaction_id = %tx.id, "ledger did not record scoring outcome");
        }
        self.stats.record_transaction(&result);

        if result.is_fraud {
            let alert = Alert::from_score(tx, &result);
            if !self.dispatcher.enqueue(alert) {
                warn!(transaction_id = %tx.id, "alert queue closed, alert dropped");
            }
        }

        result
    }

    /// Update the fraud threshold and notify operators on every instance
    pub fn update_threshold(&self, threshold: f32, updated_by: &str) -> CoreResult<()> {
        let previous = self.detector.threshold();
        self.detector.set_threshold(threshold)?;

        info!(previous, threshold, updated_by, "fraud threshold updated");

        let notification = serde_json::json!({
            "kind": "threshold_updated",
            "previous": previous,
            "threshold": threshold,
            "updated_by": updated_by,
            "roles": [Role::Analyst, Role::Admin],
        });

        let event = OutboundEvent::new("system_notification", &notification);
        self.registry.publish(&Topic::role(Role::Analyst), &event);
        self.registry.publish(&Topic::role(Role::Admin), &event);

        if let Err(e) =
            self.bridge
                .publish(self.instance_id, CHANNEL_SYSTEM_NOTIFICATIONS, notification)
        {
            warn!(error = %e, "threshold notification bridge publish failed");
        }
        Ok(())
    }

    pub fn threshold(&self) -> f32 {
        self.detector.threshold()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<LiveStats> {
        &self.stats
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Stop every background task and wait for them to exit
    pub async fn shutdown(self) {
        info!(instance_id = %self.instance_id, "fraud pipeline shutting down");
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background task failed during shutdown");
            }
        }
    }

    /// Whether the loaded predictor set can produce real scores
    pub fn is_trained(&self) -> bool {
        self.detector.predictor_count() > 0
    }
}
