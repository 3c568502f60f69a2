//! Error types for the relay.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lifeclock_core::dream::AnalyzeResponse;
use lifeclock_core::GatewayError;
use thiserror::Error;

/// Startup failures.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to load server config from {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Invalid value in {source_name}: {message}")]
    InvalidSetting {
        source_name: String,
        message: String,
    },

    #[error("OPENAI_API_KEY is not set; the relay cannot reach the completion service")]
    MissingApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn invalid(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// A failed request, rendered as the standard failure envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn from_gateway(err: &GatewayError, request_id: &str) -> Self {
        let status = StatusCode::from_u16(err.kind().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.to_string(),
            request_id: Some(request_id.to_string()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: GatewayError::NotFound.to_string(),
            request_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = AnalyzeResponse::failed(self.message, self.request_id);
        (self.status, Json(body)).into_response()
    }
}
