//! # Lifeclock dream relay
//!
//! A small axum service in front of the completion API. It owns the API key,
//! enforces the per-client quota and answers with the `{success, data | error,
//! requestId}` envelope the Lifeclock clients expect.

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use routes::{build_router, AppState};
