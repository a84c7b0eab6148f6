//! Error types for authgate
//!
//! Forwarded authentication traffic never passes through `AppError`: the
//! engine's response is returned as-is. This type covers what the gateway
//! itself can get wrong (startup, configuration, session lookup, rendering).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body exceeded the forwarding limit (413)
    #[error("Payload too large: limit is {0} bytes")]
    PayloadTooLarge(usize),

    /// Request body could not be read from the client (400)
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// Upstream authentication service unreachable or misbehaving (502)
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Session document from the engine could not be decoded (502)
    #[error("Invalid session document: {0}")]
    InvalidSession(String),

    /// A component asked for the session outside of any provider (500)
    #[error("Session context requested outside of a session provider")]
    MissingSessionContext,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code and metric label for this error
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::BodyRead(_) => (StatusCode::BAD_REQUEST, "body_read"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
            AppError::InvalidSession(_) => (StatusCode::BAD_GATEWAY, "invalid_session"),
            AppError::MissingSessionContext => {
                (StatusCode::INTERNAL_SERVER_ERROR, "missing_session_context")
            }
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.status_and_kind();
        let error_message = match &self {
            AppError::Upstream(_) => "Authentication service unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
