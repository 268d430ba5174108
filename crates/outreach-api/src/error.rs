//! Error types for outreach-api

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use outreach_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for outreach-api handlers
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the HTTP control surface.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// Error from the campaign runner
    #[error(transparent)]
    Campaign(#[from] CoreError),

    /// Malformed request parameter
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Campaign(e) => match e {
                CoreError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
                CoreError::AlreadyRunning { .. } | CoreError::NotRunning { .. } => {
                    StatusCode::CONFLICT
                }
                CoreError::ChannelNotReady { .. } => StatusCode::FAILED_DEPENDENCY,
                CoreError::Discovery { .. } => StatusCode::BAD_GATEWAY,
                CoreError::RunNotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable error category.
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Campaign(e) => match e {
                CoreError::InvalidConfig { .. } => "invalid_config",
                CoreError::AlreadyRunning { .. } => "already_running",
                CoreError::NotRunning { .. } => "not_running",
                CoreError::ChannelNotReady { .. } => "channel_not_ready",
                CoreError::Discovery { .. } => "discovery_failed",
                CoreError::RunNotFound { .. } => "run_not_found",
                _ => "internal",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        let body = json!({
            "error": {
                "category": self.category(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
