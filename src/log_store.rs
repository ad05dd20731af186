use tokio::sync::RwLock;

use crate::message::{Message, MessageView};

/// Ordered, append-only message store with monotonic, gap-free sequencing.
///
/// Invariant: for every position `i` in the store, `store[i].sequence ==
/// i + 1`. Enforced by `append`, which is the store's only mutator.
#[derive(Debug, Default)]
pub struct LogStore {
    messages: RwLock<Vec<Message>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
        }
    }

    /// Appends `message`, which must continue the store's sequence exactly.
    pub async fn append(&self, message: Message) {
        let mut guard = self.messages.write().await;
        debug_assert_eq!(
            message.sequence as usize,
            guard.len() + 1,
            "append must preserve the gap-free sequence invariant"
        );
        guard.push(message);
    }

    /// Read-only snapshot, ordered by id.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// Client-facing projection of the snapshot.
    pub async fn view(&self) -> Vec<MessageView> {
        self.messages
            .read()
            .await
            .iter()
            .map(MessageView::from)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Messages whose sequence is strictly greater than `after`, in order.
    pub async fn after(&self, after: u64) -> Vec<Message> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.sequence > after)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: u64) -> Message {
        Message::new(id, format!("m{id}"), "t".to_string())
    }

    #[tokio::test]
    async fn append_and_snapshot_preserve_order() {
        let store = LogStore::new();
        store.append(msg(1)).await;
        store.append(msg(2)).await;
        store.append(msg(3)).await;

        let snap = store.snapshot().await;
        assert_eq!(snap.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn after_returns_only_newer_messages() {
        let store = LogStore::new();
        for id in 1..=5 {
            store.append(msg(id)).await;
        }

        let tail = store.after(3).await;
        assert_eq!(tail.iter().map(|m| m.id).collect::<Vec<_>>(), vec![4, 5]);
    }

    #[tokio::test]
    async fn after_zero_returns_everything() {
        let store = LogStore::new();
        store.append(msg(1)).await;
        store.append(msg(2)).await;

        assert_eq!(store.after(0).await.len(), 2);
    }
}
