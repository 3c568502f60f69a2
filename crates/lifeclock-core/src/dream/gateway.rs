//! Dream analysis gateway.
//!
//! Order of checks: length validation, then the per-client quota, then the
//! bounded upstream call, then strict parsing of the reply. Malformed input
//! never reaches upstream and never consumes quota.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::ratelimit::{RateDecision, RateLimiter};
use super::schema::{build_prompt, parse_model_reply, ModelAnalysis};
use super::types::{AnalyzeRequest, DreamAnalysisResult};
use super::upstream::CompletionBackend;
use crate::error::GatewayError;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DreamGateway {
    backend: Arc<dyn CompletionBackend>,
    limiter: RateLimiter,
    timeout: Duration,
}

impl DreamGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            limiter: RateLimiter::default(),
            timeout: UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Analyze a dream on behalf of `client` (the caller's network origin).
    pub async fn analyze(
        &self,
        client: &str,
        request: &AnalyzeRequest,
    ) -> Result<DreamAnalysisResult, GatewayError> {
        let text = request.validated_text()?;

        if let RateDecision::Limited { retry_after } = self.limiter.check(client) {
            warn!(client, retry_after_secs = retry_after.as_secs(), "dream analysis rate limited");
            return Err(GatewayError::RateLimited {
                retry_after_secs: retry_after.as_secs(),
            });
        }

        info!(
            client,
            user_id = request.user_id.as_deref().unwrap_or("-"),
            chars = text.chars().count(),
            "dream analysis accepted"
        );

        let prompt = build_prompt(text);
        // Dropping the future on timeout aborts the outbound request.
        let reply = match tokio::time::timeout(self.timeout, self.backend.complete(&prompt)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(client, "completion service timed out");
                return Err(GatewayError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };
        let raw = reply.inspect_err(|e| log_failure(client, e))?;
        let analysis = parse_model_reply(&raw).inspect_err(|e| log_failure(client, e))?;

        Ok(normalize(analysis))
    }
}

fn log_failure(client: &str, err: &GatewayError) {
    match err {
        GatewayError::UpstreamFormat { detail } | GatewayError::Internal { detail } => {
            warn!(client, kind = err.kind().as_str(), detail = %detail, "dream analysis failed")
        }
        other => warn!(client, kind = other.kind().as_str(), "dream analysis failed"),
    }
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize(analysis: ModelAnalysis) -> DreamAnalysisResult {
    let or_default = |items: Vec<String>, fallback: &str| {
        let items = clean(items);
        if items.is_empty() {
            vec![fallback.to_string()]
        } else {
            items
        }
    };
    DreamAnalysisResult {
        emotions: or_default(analysis.emotions, "neutral"),
        themes: or_default(analysis.themes, "general"),
        interpretation: analysis.interpretation.trim().to_string(),
        symbols: clean(analysis.symbols),
        confidence: analysis.confidence,
        timestamp_ms: Utc::now().timestamp_millis(),
    }
}
