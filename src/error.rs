use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("incoherent batch: {0}")]
    IncoherentBatch(String),

    #[error("no eligible rider")]
    NoEligibleRider,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DispatchError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            DispatchError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DispatchError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            DispatchError::IncoherentBatch(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DispatchError::NoEligibleRider => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no eligible rider".to_string(),
            ),
            DispatchError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
