//! Core error types for lifeclock-core.
//!
//! Gateway failures form a closed taxonomy ([`ErrorKind`]) so the HTTP layer
//! and the fallback caller can treat them uniformly. Every gateway variant has
//! a stable, non-leaking `Display`; upstream detail is kept only for logs.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for lifeclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Snapshot/kv storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dream analysis gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The scheduler task has shut down and no longer accepts commands
    #[error("Timer scheduler is not running")]
    SchedulerUnavailable,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dotted configuration key
    #[error("Unknown config key: {0}")]
    UnknownKey(String),
}

/// Validation errors for caller-supplied input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value outside an inclusive range
    #[error("{field} must be between {min} and {max} {unit} (got {actual})")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        unit: &'static str,
        actual: u64,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure taxonomy shared by the gateway, the HTTP relay and its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    RateLimit,
    UpstreamFormat,
    UpstreamQuota,
    Timeout,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::RateLimit => "RateLimitError",
            ErrorKind::UpstreamFormat => "UpstreamFormatError",
            ErrorKind::UpstreamQuota => "UpstreamQuotaError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Internal => "InternalError",
        }
    }

    /// HTTP status the relay answers with for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::RateLimit => 429,
            ErrorKind::UpstreamFormat => 502,
            ErrorKind::UpstreamQuota => 503,
            ErrorKind::Timeout => 504,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

/// Dream analysis gateway errors.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Too many dream analysis requests from this client, please try again after 15 minutes.")]
    RateLimited { retry_after_secs: u64 },

    /// Upstream text was not JSON or did not match the analysis schema.
    #[error("Dream analysis service returned an unreadable response")]
    UpstreamFormat { detail: String },

    #[error("Dream analysis service quota exhausted, please try again later")]
    UpstreamQuota,

    #[error("Dream analysis timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Endpoint not found")]
    NotFound,

    #[error("Dream analysis failed, please try again later")]
    Internal { detail: String },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::RateLimited { .. } => ErrorKind::RateLimit,
            GatewayError::UpstreamFormat { .. } => ErrorKind::UpstreamFormat,
            GatewayError::UpstreamQuota => ErrorKind::UpstreamQuota,
            GatewayError::Timeout { .. } => ErrorKind::Timeout,
            GatewayError::NotFound => ErrorKind::NotFound,
            GatewayError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn upstream_format(detail: impl Into<String>) -> Self {
        GatewayError::UpstreamFormat {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        GatewayError::Internal {
            detail: detail.into(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_messages_do_not_leak_detail() {
        let err = GatewayError::upstream_format("Unexpected token < in JSON at position 0");
        assert!(!err.to_string().contains("Unexpected token"));

        let err = GatewayError::internal("connection refused (os error 111)");
        assert!(!err.to_string().contains("refused"));
    }

    #[test]
    fn kinds_map_to_statuses() {
        let err = GatewayError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.kind().http_status(), 429);
        assert_eq!(ErrorKind::Validation.as_str(), "ValidationError");
    }

    #[test]
    fn out_of_range_names_field_and_constraint() {
        let err = ValidationError::OutOfRange {
            field: "dreamText",
            min: 20,
            max: 2000,
            unit: "characters",
            actual: 19,
        };
        assert_eq!(
            err.to_string(),
            "dreamText must be between 20 and 2000 characters (got 19)"
        );
    }
}
