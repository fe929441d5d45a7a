use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use chatter_shared::{ProtocolError, UserId};
use chatter_store::StoreError;

/// Failures inside the real-time core.
///
/// None of these are fatal: each is logged where it happens and only the
/// affected step (one frame, one message, one recipient) is skipped.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No live connection is registered for the identity.
    #[error("No connection registered for {0}")]
    ConnectionNotFound(UserId),

    /// A directory or store lookup missed.
    #[error("{0} not found")]
    NotFound(String),

    /// A frame could not be decoded, or a message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// A read or write on a client connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::NotFound(_) | ChatError::ConnectionNotFound(_))
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ChatError::NotFound(what.to_string()),
            other => ChatError::Storage(other),
        }
    }
}

impl From<tokio::task::JoinError> for ChatError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChatError::Internal(format!("blocking task failed: {err}"))
    }
}

/// Errors returned by the REST handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotFound(_) | ChatError::ConnectionNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ChatError::Protocol(e) => ApiError::BadRequest(e.to_string()),
            ChatError::Storage(e @ StoreError::Conflict(_)) => ApiError::Conflict(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
