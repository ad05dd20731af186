use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::config::{HeartbeatConfig, RetryConfig};
use crate::log_store::LogStore;
use crate::master::ack_tracker::AckTracker;
use crate::master::health_monitor::HealthMonitor;
use crate::master::replication_worker::ReplicationWorker;
use crate::message::Message;
use crate::net::ReplicaClient;

/// Everything the master tracks about one registered secondary.
pub struct SecondaryRecord {
    pub worker: Arc<ReplicationWorker>,
    pub health: Arc<HealthMonitor>,
    /// Highest sequence known to have been enqueued to this secondary's
    /// worker. Drives catch-up on (re)registration: only sequences beyond
    /// this watermark need to be replayed.
    last_sequence: AtomicU64,
}

impl SecondaryRecord {
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    fn advance(&self, sequence: u64) {
        self.last_sequence.fetch_max(sequence, Ordering::SeqCst);
    }
}

/// Registry of secondaries known to the master, plus the fan-out and
/// catch-up operations that act on all of them.
pub struct SecondaryRegistry {
    records: RwLock<HashMap<String, Arc<SecondaryRecord>>>,
    client: ReplicaClient,
    retry: RetryConfig,
    heartbeat: HeartbeatConfig,
    request_timeout: Duration,
    ack_tracker: Arc<AckTracker>,
}

impl SecondaryRegistry {
    pub fn new(
        retry: RetryConfig,
        heartbeat: HeartbeatConfig,
        request_timeout: Duration,
        ack_tracker: Arc<AckTracker>,
    ) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            client: ReplicaClient::new(),
            retry,
            heartbeat,
            request_timeout,
            ack_tracker,
        }
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn urls(&self) -> Vec<String> {
        self.records.read().await.keys().cloned().collect()
    }

    /// Registers `url` (idempotently creating its worker and health monitor
    /// the first time) and replays any messages in `log` it has not yet
    /// seen. Re-registering an already-known secondary still replays its
    /// gap, if any — this is the same path a first-time join takes.
    ///
    /// The new record's backlog is replayed to its worker *before* the
    /// record is inserted into `self.records`, all under one held write
    /// lock. `fan_out` only ever sees a record through a `records.read()`
    /// guard, so it cannot observe the record — and therefore cannot
    /// enqueue a message and advance its watermark — until this whole
    /// critical section has completed and the backlog is already queued.
    /// Splitting insert and replay into separate lock acquisitions (the
    /// previous shape of this method) let a concurrent `fan_out` slip in
    /// between them, advance the watermark past an in-flight message, and
    /// make `catch_up` think there was nothing left to replay.
    #[instrument(skip(self, log))]
    pub async fn register(&self, url: String, log: &LogStore) {
        let mut records = self.records.write().await;

        if let Some(record) = records.get(&url).cloned() {
            info!(%url, "re-registering known secondary, replaying gap");
            drop(records);
            Self::replay(&record, log).await;
            return;
        }

        let health = HealthMonitor::new(url.clone(), self.heartbeat, self.client.clone());
        let health_for_loop = health.clone();
        tokio::spawn(async move { health_for_loop.run().await });

        let worker = ReplicationWorker::spawn(
            url.clone(),
            self.client.clone(),
            health.clone(),
            self.ack_tracker.clone(),
            self.retry,
            self.request_timeout,
        );

        let record = Arc::new(SecondaryRecord {
            worker,
            health,
            last_sequence: AtomicU64::new(0),
        });

        Self::replay(&record, log).await;
        records.insert(url.clone(), record);
        info!(%url, "registered new secondary");
    }

    /// Replays all messages in `log` with `sequence > record.last_sequence()`
    /// onto `record`'s worker, in order, then advances the watermark. The
    /// worker's own FIFO ordering guarantees correct delivery order once
    /// enqueued.
    async fn replay(record: &Arc<SecondaryRecord>, log: &LogStore) {
        let missed = log.after(record.last_sequence()).await;
        if missed.is_empty() {
            return;
        }

        info!(count = missed.len(), "replaying missed messages for catch-up");
        for message in &missed {
            record.worker.enqueue(message.clone());
        }
        if let Some(last) = missed.last() {
            record.advance(last.sequence);
        }
    }

    /// Enqueues `message` on every registered secondary's worker, advancing
    /// each one's watermark so a later catch-up never replays it.
    pub async fn fan_out(&self, message: &Message) {
        let records = self.records.read().await;
        for record in records.values() {
            record.worker.enqueue(message.clone());
            record.advance(message.sequence);
        }
    }

    pub async fn health_snapshot(&self) -> Vec<SecondaryHealthEntry> {
        let records = self.records.read().await;
        let mut out = Vec::with_capacity(records.len());
        for (url, record) in records.iter() {
            out.push(SecondaryHealthEntry {
                url: url.clone(),
                status: record.health.status().await,
                failure_count: record.health.failure_count(),
            });
        }
        out
    }

    pub async fn shutdown(&self) {
        let records = self.records.read().await;
        for record in records.values() {
            record.worker.stop();
            record.health.stop();
        }
    }
}

pub struct SecondaryHealthEntry {
    pub url: String,
    pub status: crate::master::health_monitor::HealthStatus,
    pub failure_count: u32,
}
