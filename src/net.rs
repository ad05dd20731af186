use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ClientError;
use crate::message::Message;

/// Wire body for `POST /replicate`. Fields are optional on the way in so the
/// receiver can validate presence itself and return a uniform `BadRequest`
/// rather than relying on the web framework's own deserialization error.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ReplicateRequest {
    pub id: Option<u64>,
    pub sequence: Option<u64>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
    pub hash: Option<String>,
}

impl From<&Message> for ReplicateRequest {
    fn from(m: &Message) -> Self {
        Self {
            id: Some(m.id),
            sequence: Some(m.sequence),
            message: Some(m.payload.clone()),
            timestamp: Some(m.timestamp.clone()),
            hash: Some(m.content_hash.clone()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub status: String,
    pub message_id: u64,
    pub sequence: u64,
    pub total_messages: usize,
}

/// Outcome of a single `/replicate` call that the replica accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicateOutcome {
    Replicated,
    Duplicate,
}

/// HTTP client used by the replication worker and health monitor to reach a
/// secondary. Carries no retry logic of its own — every failure is reported
/// up as `ClientError::Transient` for the caller to retry.
#[derive(Debug, Clone)]
pub struct ReplicaClient {
    http: reqwest::Client,
}

impl ReplicaClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    #[instrument(skip(self, message), fields(id = message.id))]
    pub async fn replicate(
        &self,
        base_url: &str,
        message: &Message,
        timeout: Duration,
    ) -> Result<ReplicateOutcome, ClientError> {
        let body = ReplicateRequest::from(message);
        let url = format!("{base_url}/replicate");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Transient(format!(
                "secondary returned {}",
                response.status()
            )));
        }

        let parsed: ReplicateResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Transient(e.to_string()))?;

        debug!(status = %parsed.status, "replicate call succeeded");
        match parsed.status.as_str() {
            "duplicate" => Ok(ReplicateOutcome::Duplicate),
            _ => Ok(ReplicateOutcome::Replicated),
        }
    }

    #[instrument(skip(self))]
    pub async fn health(&self, base_url: &str, timeout: Duration) -> Result<(), ClientError> {
        let url = format!("{base_url}/health");
        let response = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transient(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Transient(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }
}

impl Default for ReplicaClient {
    fn default() -> Self {
        Self::new()
    }
}
