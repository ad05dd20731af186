use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::SecondaryConfig;
use crate::error::SecondaryError;
use crate::log_store::LogStore;
use crate::message::{Message, MessageView};
use crate::net::ReplicateRequest;

/// Outcome of a successful `replicate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Duplicate,
}

/// Secondary-side dedup, total-order reconstruction, and commit.
///
/// `pending` (messages that arrived ahead of their predecessor) and
/// `next_expected` are guarded by one mutex, separate from the committed
/// log's own lock, so reads of the committed log never contend with the
/// insert path.
pub struct Receiver {
    config: SecondaryConfig,
    committed: LogStore,
    pending: Mutex<Pending>,
    dedup: Mutex<HashSet<String>>,
    error_counter: AtomicU64,
}

struct Pending {
    next_expected: u64,
    buffer: HashMap<u64, Message>,
}

impl Receiver {
    pub fn new(config: SecondaryConfig) -> Self {
        Self {
            config,
            committed: LogStore::new(),
            pending: Mutex::new(Pending {
                next_expected: 1,
                buffer: HashMap::new(),
            }),
            dedup: Mutex::new(HashSet::new()),
            error_counter: AtomicU64::new(0),
        }
    }

    /// Validates, dedups, and commits-in-order a replication request.
    ///
    /// Returns the commit outcome and the committed log length. The caller
    /// (the HTTP handler) decides whether to additionally inject a
    /// post-commit failure for testing (`error_rate`/`replication_delay`).
    #[instrument(skip(self, request))]
    pub async fn replicate(
        &self,
        request: ReplicateRequest,
    ) -> Result<(CommitOutcome, usize), SecondaryError> {
        let message = self.validate(request)?;

        if self.config.replication_delay > std::time::Duration::ZERO {
            sleep(self.config.replication_delay).await;
        }

        let mut dedup = self.dedup.lock().await;
        if dedup.contains(&message.content_hash) {
            debug!(id = message.id, "duplicate delivery, already committed");
            return Ok((CommitOutcome::Duplicate, self.committed.len().await));
        }
        dedup.insert(message.content_hash.clone());
        drop(dedup);

        self.insert_in_order(message).await;
        Ok((CommitOutcome::Committed, self.committed.len().await))
    }

    fn validate(&self, request: ReplicateRequest) -> Result<Message, SecondaryError> {
        let id = request
            .id
            .ok_or_else(|| SecondaryError::BadRequest("missing id".to_string()))?;
        let sequence = request
            .sequence
            .ok_or_else(|| SecondaryError::BadRequest("missing sequence".to_string()))?;
        let payload = request
            .message
            .ok_or_else(|| SecondaryError::BadRequest("missing message".to_string()))?;
        let timestamp = request
            .timestamp
            .ok_or_else(|| SecondaryError::BadRequest("missing timestamp".to_string()))?;
        let content_hash = request
            .hash
            .ok_or_else(|| SecondaryError::BadRequest("missing hash".to_string()))?;

        Ok(Message {
            id,
            sequence,
            payload,
            timestamp,
            content_hash,
        })
    }

    /// Total-order insertion (spec §4.6 step 4):
    /// - `sequence == next_expected`: commit, then drain any now-contiguous
    ///   pending entries.
    /// - `sequence > next_expected`: buffer it.
    /// - `sequence < next_expected`: already committed; ignore (can only
    ///   happen if dedup missed, which the invariant rules out).
    async fn insert_in_order(&self, message: Message) {
        let mut state = self.pending.lock().await;

        if message.sequence < state.next_expected {
            warn!(
                sequence = message.sequence,
                next_expected = state.next_expected,
                "ignoring already-committed sequence"
            );
            return;
        }

        if message.sequence > state.next_expected {
            debug!(sequence = message.sequence, "buffering out-of-order message");
            state.buffer.insert(message.sequence, message);
            return;
        }

        self.committed.append(message).await;
        state.next_expected += 1;

        while let Some(next) = state.buffer.remove(&state.next_expected) {
            self.committed.append(next).await;
            state.next_expected += 1;
        }
    }

    /// Simulated post-commit 5xx, per the test-hook `ERROR_RATE`. Always
    /// called after a commit has already happened, so a retried delivery
    /// is recognised as a duplicate and the second attempt succeeds.
    pub fn maybe_inject_error(&self) -> bool {
        if self.config.error_rate <= 0.0 {
            return false;
        }
        use rand::Rng;
        let roll: f64 = rand::thread_rng().gen();
        let inject = roll < self.config.error_rate;
        if inject {
            self.error_counter.fetch_add(1, Ordering::SeqCst);
        }
        inject
    }

    pub async fn log(&self) -> Vec<MessageView> {
        self.committed.view().await
    }

    pub async fn last_sequence(&self) -> u64 {
        self.committed.len().await as u64
    }

    pub async fn next_expected(&self) -> u64 {
        self.pending.lock().await.next_expected
    }

    pub fn server_id(&self) -> &str {
        &self.config.server_id
    }

    #[instrument(skip(self))]
    pub async fn register_with_master(&self, bind_addr: std::net::SocketAddr) {
        let Some(master_url) = self.config.master_url.clone() else {
            return;
        };
        let client = reqwest::Client::new();
        let self_url = format!("http://{bind_addr}");
        let body = serde_json::json!({ "url": self_url });
        match client
            .post(format!("{master_url}/secondaries"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!(%master_url, "registered with master");
            }
            Ok(resp) => warn!(status = %resp.status(), "master rejected registration"),
            Err(e) => warn!(error = %e, "failed to reach master for self-registration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SecondaryConfig {
        SecondaryConfig {
            master_url: None,
            server_id: "test".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            replication_delay: std::time::Duration::ZERO,
            error_rate: 0.0,
        }
    }

    fn request(id: u64) -> ReplicateRequest {
        let m = Message::new(id, format!("m{id}"), "t".to_string());
        ReplicateRequest::from(&m)
    }

    #[tokio::test]
    async fn in_order_delivery_commits_immediately() {
        let receiver = Receiver::new(config());
        let (outcome, len) = receiver.replicate(request(1)).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(len, 1);
    }

    #[tokio::test]
    async fn out_of_order_arrival_buffers_then_drains() {
        let receiver = Receiver::new(config());

        let (outcome, len) = receiver.replicate(request(2)).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(len, 0, "m2 must be buffered, not committed, until m1 arrives");
        assert_eq!(receiver.next_expected().await, 1);

        receiver.replicate(request(1)).await.unwrap();
        receiver.replicate(request(3)).await.unwrap();

        let log = receiver.log().await;
        assert_eq!(log.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_not_recommitted() {
        let receiver = Receiver::new(config());
        receiver.replicate(request(1)).await.unwrap();
        let (outcome, len) = receiver.replicate(request(1)).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Duplicate);
        assert_eq!(len, 1);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let receiver = Receiver::new(config());
        let mut req = request(1);
        req.hash = None;
        let result = receiver.replicate(req).await;
        assert!(matches!(result, Err(SecondaryError::BadRequest(_))));
    }

    #[tokio::test]
    async fn repeated_legitimate_payloads_both_commit() {
        let receiver = Receiver::new(config());
        let m1 = Message::new(1, "ping".to_string(), "t".to_string());
        let m2 = Message::new(2, "ping".to_string(), "t".to_string());

        receiver.replicate(ReplicateRequest::from(&m1)).await.unwrap();
        let (outcome, len) = receiver.replicate(ReplicateRequest::from(&m2)).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(len, 2);
    }
}
