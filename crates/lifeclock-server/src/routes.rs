//! Router and request handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use lifeclock_core::dream::{new_request_id, AnalyzeRequest, AnalyzeResponse, DreamGateway};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ApiError;

pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<DreamGateway>,
}

impl AppState {
    pub fn new(gateway: DreamGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }

    pub fn gateway(&self) -> &DreamGateway {
        &self.gateway
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub version: &'static str,
}

/// Browser extensions and local pages only.
pub fn is_allowed_origin(origin: &str) -> bool {
    origin.contains("-extension://") || origin.contains("localhost") || origin.contains("127.0.0.1")
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.to_str().map(is_allowed_origin).unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyzeDream", post(analyze_dream))
        .route("/api/health", get(health))
        .fallback(not_found)
        .with_state(state)
        // Enforced by the body extractor, so oversized requests still get the
        // JSON failure envelope.
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn analyze_dream(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request_id = new_request_id();
    let client = peer.ip().to_string();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(request_id = %request_id, client = %client, error = %rejection.body_text(), "rejected dream analysis body");
            let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                format!("Request body exceeds {MAX_BODY_BYTES} bytes")
            } else {
                "Request body must be JSON with a dreamText string".to_string()
            };
            return ApiError {
                status,
                message,
                request_id: Some(request_id),
            }
            .into_response();
        }
    };

    match state.gateway.analyze(&client, &request).await {
        Ok(result) => {
            info!(request_id = %request_id, client = %client, confidence = result.confidence, "dream analysis succeeded");
            Json(AnalyzeResponse::ok(result, request_id)).into_response()
        }
        Err(e) => {
            warn!(request_id = %request_id, client = %client, kind = e.kind().as_str(), "dream analysis failed");
            ApiError::from_gateway(&e, &request_id).into_response()
        }
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Lifeclock dream relay is running",
        timestamp: Utc::now().timestamp_millis(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use lifeclock_core::dream::{CompletionBackend, RateLimiter};
    use lifeclock_core::GatewayError;
    use std::time::Duration;

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionBackend for Fixed {
        async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
            Ok(self.0.to_string())
        }
    }

    const GOOD: &str = r#"{"emotions":["joy"],"themes":["flying"],"interpretation":"Freedom.","symbols":["sky"],"confidence":0.8}"#;
    const DREAM: &str = "I was flying over a beautiful landscape and felt free";

    fn state(reply: &'static str) -> AppState {
        AppState::new(DreamGateway::new(Arc::new(Fixed(reply))))
    }

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 50000)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_success_envelope() {
        let response = analyze_dream(
            State(state(GOOD)),
            peer(),
            Ok(Json(AnalyzeRequest::new(DREAM))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["themes"][0], "flying");
        assert!(json["requestId"].as_str().unwrap().starts_with("req_"));
    }

    #[tokio::test]
    async fn short_dream_is_bad_request() {
        let response = analyze_dream(
            State(state(GOOD)),
            peer(),
            Ok(Json(AnalyzeRequest::new("too short"))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("dreamText"));
    }

    #[tokio::test]
    async fn format_error_is_bad_gateway_without_detail() {
        let response = analyze_dream(
            State(state("Here is my analysis in prose.")),
            peer(),
            Ok(Json(AnalyzeRequest::new(DREAM))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert!(!json["error"].as_str().unwrap().contains("prose"));
    }

    #[tokio::test]
    async fn rate_limit_uses_fixed_message() {
        let gateway = DreamGateway::new(Arc::new(Fixed(GOOD)))
            .with_limiter(RateLimiter::new(1, Duration::from_secs(900)));
        let state = AppState::new(gateway);

        let first = analyze_dream(
            State(state.clone()),
            peer(),
            Ok(Json(AnalyzeRequest::new(DREAM))),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = analyze_dream(State(state), peer(), Ok(Json(AnalyzeRequest::new(DREAM)))).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(second).await;
        assert_eq!(
            json["error"],
            "Too many dream analysis requests from this client, please try again after 15 minutes."
        );
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(body) = health().await;
        assert!(body.success);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["timestamp"].is_number());
        assert!(body.timestamp > 0);
    }

    #[tokio::test]
    async fn fallback_is_not_found_envelope() {
        let response = not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": false, "error": "Endpoint not found", "requestId": null})
        );
    }

    #[test]
    fn cors_origin_rules() {
        assert!(is_allowed_origin("chrome-extension://abcdefghijklmnop"));
        assert!(is_allowed_origin("moz-extension://1234"));
        assert!(is_allowed_origin("http://localhost:5173"));
        assert!(is_allowed_origin("http://127.0.0.1:8080"));
        assert!(!is_allowed_origin("https://evil.example.com"));
    }
}
