use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the master's handlers.
#[derive(Error, Debug)]
pub enum MasterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for MasterError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MasterError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MasterError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Errors surfaced by the secondary's handlers.
#[derive(Error, Debug)]
pub enum SecondaryError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for SecondaryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SecondaryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SecondaryError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Transient failures from talking to a replica over HTTP. Never surfaced
/// to a client — the replication worker retries these indefinitely.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("transient replica failure: {0}")]
    Transient(String),
}
