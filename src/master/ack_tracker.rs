use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tracing::{debug, instrument};

/// Per-message set of acking secondaries, with condition-style wait/notify
/// for the append coordinator's write-concern wait.
///
/// One shared `Notify` is broadcast on every `ack`; waiters re-check their
/// own predicate in a `while` loop to defeat spurious wakeups (a broadcast
/// fires for every ack, not just the one a given waiter cares about).
#[derive(Default)]
pub struct AckTracker {
    acks: RwLock<HashMap<u64, HashSet<String>>>,
    changed: Notify,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ack set for `id`. Idempotent.
    #[instrument(skip(self))]
    pub async fn init(&self, id: u64) {
        self.acks.write().await.entry(id).or_default();
    }

    /// Records `secondary_id`'s ack for `id`. No-op if the tracker entry was
    /// already cleaned up (the coordinator has already returned) or the
    /// secondary already acked.
    #[instrument(skip(self))]
    pub async fn ack(&self, id: u64, secondary_id: &str) {
        let mut acks = self.acks.write().await;
        if let Some(set) = acks.get_mut(&id) {
            set.insert(secondary_id.to_string());
            debug!(acks = set.len(), "recorded ack");
        }
        drop(acks);
        self.changed.notify_waiters();
    }

    /// Number of distinct secondaries that have acked `id` so far.
    pub async fn count(&self, id: u64) -> usize {
        self.acks
            .read()
            .await
            .get(&id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Waits until at least `required` secondaries have acked `id`, or
    /// `timeout` elapses. Returns `true` on success, `false` on deadline.
    #[instrument(skip(self))]
    pub async fn wait(&self, id: u64, required: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        while self.count(id).await < required {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;

            tokio::select! {
                _ = self.changed.notified() => {}
                _ = tokio::time::sleep(remaining) => {}
            }
        }
        true
    }

    /// Drops the tracker entry for `id`.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, id: u64) {
        self.acks.write().await.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ack_is_idempotent_per_secondary() {
        let tracker = AckTracker::new();
        tracker.init(1).await;
        tracker.ack(1, "s1").await;
        tracker.ack(1, "s1").await;
        assert_eq!(tracker.count(1).await, 1);
    }

    #[tokio::test]
    async fn distinct_secondaries_count_separately() {
        let tracker = AckTracker::new();
        tracker.init(1).await;
        tracker.ack(1, "s1").await;
        tracker.ack(1, "s2").await;
        assert_eq!(tracker.count(1).await, 2);
    }

    #[tokio::test]
    async fn ack_after_cleanup_is_silently_dropped() {
        let tracker = AckTracker::new();
        tracker.init(1).await;
        tracker.cleanup(1).await;
        tracker.ack(1, "s1").await;
        assert_eq!(tracker.count(1).await, 0);
    }

    #[tokio::test]
    async fn wait_returns_true_once_threshold_reached() {
        let tracker = std::sync::Arc::new(AckTracker::new());
        tracker.init(1).await;

        let t2 = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            t2.ack(1, "s1").await;
        });

        let ok = tracker.wait(1, 1, Duration::from_secs(2)).await;
        assert!(ok);
    }

    #[tokio::test]
    async fn wait_returns_false_on_timeout() {
        let tracker = AckTracker::new();
        tracker.init(1).await;
        let ok = tracker.wait(1, 1, Duration::from_millis(20)).await;
        assert!(!ok);
    }
}
