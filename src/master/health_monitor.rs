use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::HeartbeatConfig;
use crate::net::ReplicaClient;

/// Health status of a secondary, from the master's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Suspected,
    Unhealthy,
    Unknown,
}

/// Heartbeat loop and status state machine for one secondary.
///
/// Status starts `Healthy` (optimistic) so a replication worker is never
/// blocked waiting on the first probe. Transitions broadcast on `changed`
/// so a waiting replication worker re-checks immediately instead of polling.
pub struct HealthMonitor {
    url: String,
    config: HeartbeatConfig,
    client: ReplicaClient,
    status: RwLock<HealthStatus>,
    failure_count: AtomicU32,
    changed: Notify,
    stop: Notify,
    stopped: std::sync::atomic::AtomicBool,
}

impl HealthMonitor {
    pub fn new(url: String, config: HeartbeatConfig, client: ReplicaClient) -> Arc<Self> {
        Arc::new(Self {
            url,
            config,
            client,
            status: RwLock::new(HealthStatus::Healthy),
            failure_count: AtomicU32::new(0),
            changed: Notify::new(),
            stop: Notify::new(),
            stopped: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub async fn status(&self) -> HealthStatus {
        *self.status.read().await
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Blocks until status becomes `Healthy`, or the monitor is stopped.
    pub async fn wait_until_healthy(&self) {
        loop {
            if self.status().await == HealthStatus::Healthy {
                return;
            }
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            self.changed.notified().await;
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop.notify_waiters();
        self.changed.notify_waiters();
    }

    /// Runs the heartbeat loop until `stop` is called. Intended to be
    /// spawned as a background task.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn run(self: Arc<Self>) {
        info!("starting health monitor");
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.stop.notified() => {
                    info!("health monitor stopped");
                    return;
                }
            }

            if self.stopped.load(Ordering::SeqCst) {
                return;
            }

            self.probe_once().await;
        }
    }

    async fn probe_once(&self) {
        let outcome = self.client.health(&self.url, self.config.timeout).await;
        let mut status = self.status.write().await;
        let previous = *status;

        match outcome {
            Ok(()) => {
                self.failure_count.store(0, Ordering::SeqCst);
                *status = HealthStatus::Healthy;
            }
            Err(e) => {
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                *status = if failures < self.config.unhealthy_threshold {
                    HealthStatus::Suspected
                } else {
                    HealthStatus::Unhealthy
                };
                warn!(error = %e, failures, "heartbeat probe failed");
            }
        }

        if *status != previous {
            debug!(?previous, current = ?*status, "health status transition");
            self.changed.notify_waiters();
        }
    }
}
