//! Live Statistics
//!
//! Since-startup counters (total, average risk, high-risk count), a
//! one-minute sliding window for throughput, and a per-UTC-day window
//! backing the `*_today` wire fields, which reset at day rollover.
//! Counter updates are atomic; the two windows each take a short lock.
//! A broadcaster task publishes a snapshot to the live_stats topic on a
//! fixed interval.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::{OutboundEvent, SubscriptionRegistry, Topic};
use crate::scoring::{AlertLevel, ScoreResult};

/// One snapshot, in wire shape. The `*_today` fields cover the current
/// UTC day; the rest accumulate since startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveStatsUpdate {
    pub transactions_per_minute: usize,
    pub fraud_detections_today: u64,
    pub fraud_rate_today: f64,
    pub average_risk_score: f64,
    pub high_risk_transactions: u64,
    pub total_transactions: u64,
    pub timestamp: DateTime<Utc>,
}

/// Daily counters, keyed to one UTC date. Stale entries read as zero and
/// are replaced on the next write.
struct DayWindow {
    day: NaiveDate,
    transactions: u64,
    frauds: u64,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            day: Utc::now().date_naive(),
            transactions: 0,
            frauds: 0,
        }
    }
}

#[derive(Default)]
pub struct LiveStats {
    transactions_total: AtomicU64,
    risk_score_sum: AtomicU64,
    high_risk_count: AtomicU64,
    minute_window: Mutex<VecDeque<DateTime<Utc>>>,
    day_window: Mutex<DayWindow>,
}

impl LiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scored transaction
    pub fn record_transaction(&self, result: &ScoreResult) {
        self.record_at(Utc::now(), result);
    }

    /// Record as observed at `now`
    fn record_at(&self, now: DateTime<Utc>, result: &ScoreResult) {
        self.transactions_total.fetch_add(1, Ordering::Relaxed);
        self.risk_score_sum
            .fetch_add(result.risk_score as u64, Ordering::Relaxed);
        if result.alert_level >= AlertLevel::High {
            self.high_risk_count.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut day = self.day_window.lock();
            if day.day != now.date_naive() {
                *day = DayWindow {
                    day: now.date_naive(),
                    transactions: 0,
                    frauds: 0,
                };
            }
            day.transactions += 1;
            if result.is_fraud {
                day.frauds += 1;
            }
        }

        let mut window = self.minute_window.lock();
        window.push_back(now);
        let cutoff = now - chrono::Duration::seconds(60);
        while window.front().is_some_and(|t| *t < cutoff) {
            window.pop_front();
        }
    }

    pub fn snapshot(&self) -> LiveStatsUpdate {
        self.snapshot_at(Utc::now())
    }

    /// Snapshot as observed at `now`
    fn snapshot_at(&self, now: DateTime<Utc>) -> LiveStatsUpdate {
        let total = self.transactions_total.load(Ordering::Relaxed);
        let risk_sum = self.risk_score_sum.load(Ordering::Relaxed);

        // A day window from an earlier date has rolled over: report zero
        let (day_transactions, day_frauds) = {
            let day = self.day_window.lock();
            if day.day == now.date_naive() {
                (day.transactions, day.frauds)
            } else {
                (0, 0)
            }
        };

        let transactions_per_minute = {
            let window = self.minute_window.lock();
            let cutoff = now - chrono::Duration::seconds(60);
            window.iter().filter(|t| **t >= cutoff).count()
        };

        LiveStatsUpdate {
            transactions_per_minute,
            fraud_detections_today: day_frauds,
            fraud_rate_today: if day_transactions > 0 {
                day_frauds as f64 / day_transactions as f64
            } else {
                0.0
            },
            average_risk_score: if total > 0 {
                risk_sum as f64 / total as f64
            } else {
                0.0
            },
            high_risk_transactions: self.high_risk_count.load(Ordering::Relaxed),
            total_transactions: total,
            timestamp: now,
        }
    }
}

/// Publish a stats snapshot to the live_stats topic on every tick
pub fn spawn_stats_broadcaster(
    stats: Arc<LiveStats>,
    registry: Arc<SubscriptionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "stats broadcaster started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("stats broadcaster stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let update = stats.snapshot();
                    let delivered = registry.publish(
                        &Topic::live_stats(),
                        &OutboundEvent::new("live_stats_update", &update),
                    );
                    debug!(
                        total = update.total_transactions,
                        delivered,
                        "live stats broadcast"
                    );
                }
            }
        }
    })
}
