use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::MasterError;
use crate::master::coordinator::{AppendOutcome, Coordinator, SecondaryHealthView};
use crate::message::MessageView;

#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    pub message: Option<String>,
    pub w: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub id: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSecondaryRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub role: &'static str,
    pub secondaries: Vec<SecondaryHealthView>,
}

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/messages", post(post_message).get(get_messages))
        .route("/secondaries", post(register_secondary))
        .route("/health", get(health))
        .with_state(coordinator)
        .layer(TraceLayer::new_for_http())
}

async fn post_message(
    State(coordinator): State<Arc<Coordinator>>,
    Json(body): Json<AppendRequest>,
) -> Result<Response, MasterError> {
    let timeout = body.timeout_ms.map(Duration::from_millis);
    let payload = body.message.clone();

    match coordinator.append(body.message, body.w, timeout).await? {
        AppendOutcome::Committed { id } => Ok((
            StatusCode::CREATED,
            Json(AppendResponse {
                id,
                message: payload.unwrap_or_default(),
                warning: None,
            }),
        )
            .into_response()),
        AppendOutcome::PartiallyCommitted { id } => Ok((
            StatusCode::ACCEPTED,
            Json(AppendResponse {
                id,
                message: payload.unwrap_or_default(),
                warning: Some("write concern not satisfied before timeout".to_string()),
            }),
        )
            .into_response()),
    }
}

async fn get_messages(State(coordinator): State<Arc<Coordinator>>) -> Json<LogResponse> {
    Json(LogResponse {
        messages: coordinator.get_log().await,
    })
}

async fn register_secondary(
    State(coordinator): State<Arc<Coordinator>>,
    Json(body): Json<RegisterSecondaryRequest>,
) -> impl IntoResponse {
    coordinator.register_secondary(body.url).await;
    StatusCode::OK
}

async fn health(State(coordinator): State<Arc<Coordinator>>) -> Json<HealthResponse> {
    let secondaries = coordinator
        .secondary_health()
        .await
        .iter()
        .map(SecondaryHealthView::from)
        .collect();

    Json(HealthResponse {
        status: "healthy",
        role: "master",
        secondaries,
    })
}
