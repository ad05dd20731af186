use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::SecondaryError;
use crate::net::{ReplicateRequest, ReplicateResponse};
use crate::secondary::receiver::{CommitOutcome, Receiver};

#[derive(Debug, Serialize)]
pub struct SecondaryLogResponse {
    pub messages: Vec<crate::message::MessageView>,
}

#[derive(Debug, Serialize)]
pub struct SecondaryHealthResponse {
    pub status: &'static str,
    pub role: &'static str,
    pub server_id: String,
    pub message_count: usize,
    pub last_sequence: u64,
    pub next_expected: u64,
}

pub fn router(receiver: Arc<Receiver>) -> Router {
    Router::new()
        .route("/replicate", post(replicate))
        .route("/messages", get(messages))
        .route("/health", get(health))
        .with_state(receiver)
        .layer(TraceLayer::new_for_http())
}

async fn replicate(
    State(receiver): State<Arc<Receiver>>,
    Json(body): Json<ReplicateRequest>,
) -> Result<Response, SecondaryError> {
    let id = body.id;
    let sequence = body.sequence;
    let (outcome, total_messages) = receiver.replicate(body).await?;

    // Failure-injection hook: the insert has already happened, so a retry
    // of this same message will be recognised as a duplicate and succeed.
    if outcome == CommitOutcome::Committed && receiver.maybe_inject_error() {
        return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    let status_str = match outcome {
        CommitOutcome::Committed => "replicated",
        CommitOutcome::Duplicate => "duplicate",
    };

    Ok((
        StatusCode::OK,
        Json(ReplicateResponse {
            status: status_str.to_string(),
            message_id: id.unwrap_or_default(),
            sequence: sequence.unwrap_or_default(),
            total_messages,
        }),
    )
        .into_response())
}

async fn messages(State(receiver): State<Arc<Receiver>>) -> Json<SecondaryLogResponse> {
    Json(SecondaryLogResponse {
        messages: receiver.log().await,
    })
}

async fn health(State(receiver): State<Arc<Receiver>>) -> Json<SecondaryHealthResponse> {
    Json(SecondaryHealthResponse {
        status: "healthy",
        role: "secondary",
        server_id: receiver.server_id().to_string(),
        message_count: receiver.log().await.len(),
        last_sequence: receiver.last_sequence().await,
        next_expected: receiver.next_expected().await,
    })
}
