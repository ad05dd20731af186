use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::config::MasterConfig;
use crate::error::MasterError;
use crate::log_store::LogStore;
use crate::master::ack_tracker::AckTracker;
use crate::master::health_monitor::HealthStatus;
use crate::master::registry::{SecondaryHealthEntry, SecondaryRegistry};
use crate::message::{Message, MessageView};

/// Outcome of an `append` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Write concern satisfied before returning.
    Committed { id: u64 },
    /// Timeout elapsed before write concern was satisfied; the message is
    /// on the master's log and continues replicating in the background.
    PartiallyCommitted { id: u64 },
}

/// Master request handler: sequences appends, fans them out to every
/// secondary, and waits on write concern.
pub struct Coordinator {
    log: LogStore,
    next_id: Mutex<u64>,
    registry: SecondaryRegistry,
    ack_tracker: Arc<AckTracker>,
    config: MasterConfig,
}

impl Coordinator {
    pub fn new(config: MasterConfig) -> Arc<Self> {
        let ack_tracker = Arc::new(AckTracker::new());
        let registry = SecondaryRegistry::new(
            config.retry,
            config.heartbeat,
            config.secondary_request_timeout,
            ack_tracker.clone(),
        );

        Arc::new(Self {
            log: LogStore::new(),
            next_id: Mutex::new(1),
            registry,
            ack_tracker,
            config,
        })
    }

    /// Registers every secondary listed in `SECONDARIES` at startup.
    pub async fn register_configured_secondaries(&self) {
        for url in self.config.secondaries.clone() {
            self.register_secondary(url).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn register_secondary(&self, url: String) {
        self.registry.register(url, &self.log).await;
    }

    /// Appends `payload` with write concern `w`, waiting up to `timeout`
    /// (or the configured default) for `w - 1` secondary acks.
    #[instrument(skip(self, payload))]
    pub async fn append(
        &self,
        payload: Option<String>,
        w: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<AppendOutcome, MasterError> {
        let payload = payload
            .ok_or_else(|| MasterError::InvalidArgument("message is required".to_string()))?;

        let secondary_count = self.registry.count().await;
        let max_w = secondary_count + 1;
        let w = w.unwrap_or(max_w);
        if w < 1 || w > max_w {
            return Err(MasterError::InvalidArgument(format!(
                "invalid write concern, must be between 1 and {max_w}"
            )));
        }

        let message = {
            let mut next_id = self.next_id.lock().await;
            let id = *next_id;
            *next_id += 1;
            let message = Message::new(id, payload, Utc::now().to_rfc3339());
            self.log.append(message.clone()).await;
            message
        };

        info!(id = message.id, w, "message appended to master log");

        // Every secondary eventually gets every message, regardless of w.
        self.registry.fan_out(&message).await;

        if w == 1 {
            return Ok(AppendOutcome::Committed { id: message.id });
        }

        let required = w - 1;
        self.ack_tracker.init(message.id).await;
        let timeout = timeout.unwrap_or(self.config.write_concern_timeout);
        let satisfied = self.ack_tracker.wait(message.id, required, timeout).await;
        self.ack_tracker.cleanup(message.id).await;

        if satisfied {
            Ok(AppendOutcome::Committed { id: message.id })
        } else {
            Ok(AppendOutcome::PartiallyCommitted { id: message.id })
        }
    }

    pub async fn get_log(&self) -> Vec<MessageView> {
        self.log.view().await
    }

    pub async fn secondary_health(&self) -> Vec<SecondaryHealthEntry> {
        self.registry.health_snapshot().await
    }

    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SecondaryHealthView {
    pub url: String,
    pub status: HealthStatus,
    pub failure_count: u32,
}

impl From<&SecondaryHealthEntry> for SecondaryHealthView {
    fn from(e: &SecondaryHealthEntry) -> Self {
        Self {
            url: e.url.clone(),
            status: e.status,
            failure_count: e.failure_count,
        }
    }
}
