//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; clients only see a generic message
//! for those.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::TrackingError;

/// Application-level error type for the order tracker.
#[derive(Debug, Error)]
pub enum AppError {
    /// Tracking operation failed.
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Tracking(err) => match err {
                TrackingError::OrderNotFound => StatusCode::NOT_FOUND,
                TrackingError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TrackingError::Validation(_) => StatusCode::BAD_REQUEST,
                TrackingError::Conflict(_) => StatusCode::CONFLICT,
                TrackingError::Forbidden => StatusCode::FORBIDDEN,
                TrackingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Tracking(TrackingError::Repository(_)) => "Internal server error".to_string(),
            Self::Tracking(err) => match err {
                TrackingError::OrderNotFound => "Order not found".to_string(),
                TrackingError::Forbidden => "Admin role required".to_string(),
                other => other.to_string(),
            },
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::CONFLICT {
            tracing::warn!(error = %self, "Request conflict");
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
