use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, instrument, warn};

use crate::config::RetryConfig;
use crate::master::ack_tracker::AckTracker;
use crate::master::health_monitor::{HealthMonitor, HealthStatus};
use crate::message::Message;
use crate::net::ReplicaClient;

/// Per-secondary FIFO queue with a single serial consumer.
///
/// Processing the queue strictly serially — and running each message's
/// retry loop to completion before moving to the next — is what guarantees
/// per-replica delivery order equals enqueue order, which equals sequence
/// order because the coordinator enqueues under the same lock it assigns
/// ids under.
pub struct ReplicationWorker {
    secondary_url: String,
    tx: mpsc::UnboundedSender<Message>,
    stop: Arc<Notify>,
    stopped: std::sync::atomic::AtomicBool,
}

impl ReplicationWorker {
    /// Spawns the worker's consumer task and returns a handle to it. The
    /// health monitor must already be running.
    pub fn spawn(
        secondary_url: String,
        client: ReplicaClient,
        health: Arc<HealthMonitor>,
        ack_tracker: Arc<AckTracker>,
        retry: RetryConfig,
        request_timeout: Duration,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(Notify::new());

        let worker = Arc::new(Self {
            secondary_url: secondary_url.clone(),
            tx,
            stop: stop.clone(),
            stopped: std::sync::atomic::AtomicBool::new(false),
        });

        tokio::spawn(Self::consume(
            secondary_url,
            rx,
            client,
            health,
            ack_tracker,
            retry,
            request_timeout,
            stop,
        ));

        worker
    }

    /// Non-blocking, thread-safe. Multiple concurrent appenders may call
    /// this without coordinating among themselves.
    pub fn enqueue(&self, message: Message) {
        // An unbounded channel send only fails once the consumer task has
        // exited (worker stopped); dropping the message is correct then.
        let _ = self.tx.send(message);
    }

    pub fn stop(&self) {
        self.stopped.store(true, std::sync::atomic::Ordering::SeqCst);
        self.stop.notify_waiters();
    }

    async fn consume(
        secondary_url: String,
        mut rx: mpsc::UnboundedReceiver<Message>,
        client: ReplicaClient,
        health: Arc<HealthMonitor>,
        ack_tracker: Arc<AckTracker>,
        retry: RetryConfig,
        request_timeout: Duration,
        stop: Arc<Notify>,
    ) {
        info!(url = %secondary_url, "replication worker started");
        loop {
            let message = tokio::select! {
                m = rx.recv() => match m {
                    Some(m) => m,
                    None => break,
                },
                _ = stop.notified() => break,
            };

            if !Self::deliver_with_retry(
                &secondary_url,
                &message,
                &client,
                &health,
                retry,
                request_timeout,
                &stop,
            )
            .await
            {
                // Stop signal fired mid-delivery; abandon the queue.
                break;
            }

            ack_tracker.ack(message.id, &secondary_url).await;
        }
        info!(url = %secondary_url, "replication worker stopped");
    }

    /// Delivers one message, retrying indefinitely on transient failure.
    /// Returns `false` if the stop signal fired before delivery completed.
    #[instrument(skip(client, health, stop), fields(url = %secondary_url, id = message.id))]
    async fn deliver_with_retry(
        secondary_url: &str,
        message: &Message,
        client: &ReplicaClient,
        health: &Arc<HealthMonitor>,
        retry: RetryConfig,
        request_timeout: Duration,
        stop: &Notify,
    ) -> bool {
        let mut delay = retry.initial_delay;

        loop {
            // Only a confirmed-Unhealthy replica pauses delivery; Suspected
            // keeps retrying, which by itself tames a flapping secondary.
            if health.status().await == HealthStatus::Unhealthy {
                tokio::select! {
                    _ = health.wait_until_healthy() => {}
                    _ = stop.notified() => return false,
                }
            }

            match client.replicate(secondary_url, message, request_timeout).await {
                Ok(_) => return true,
                Err(e) => {
                    warn!(error = %e, delay_ms = delay.as_millis(), "replication attempt failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = stop.notified() => return false,
                    }
                    delay = (delay * 2).min(retry.max_delay);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn secondary_url(&self) -> &str {
        &self.secondary_url
    }
}
