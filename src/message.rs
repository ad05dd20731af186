use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single entry in the replicated log.
///
/// Immutable after construction. `sequence` duplicates `id` — secondaries
/// order by `sequence` independently of the client-visible `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sequence: u64,
    pub payload: String,
    pub timestamp: String,
    pub content_hash: String,
}

impl Message {
    /// Builds a message for `id`, computing its dedup hash over `(id, payload)`.
    ///
    /// Hashing only the payload would make repeated legitimate messages
    /// (e.g. two separate "ping" appends) collide on a secondary's dedup
    /// set; including `id` keys the hash to *this specific append*, so only
    /// a genuine re-delivery of the same message collapses.
    pub fn new(id: u64, payload: String, timestamp: String) -> Self {
        let content_hash = Self::hash(id, &payload);
        Self {
            id,
            sequence: id,
            payload,
            timestamp,
            content_hash,
        }
    }

    pub fn hash(id: u64, payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(id.to_le_bytes());
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Client-facing projection of a message (id + payload only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: u64,
    pub message: String,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            message: m.payload.clone(),
        }
    }
}
