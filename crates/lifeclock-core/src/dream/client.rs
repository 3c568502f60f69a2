//! Client side of the dream relay with local fallback.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::heuristic;
use super::types::{AnalyzeRequest, AnalyzeResponse, DreamAnalysisResult};
use crate::error::{GatewayError, ValidationError};
use crate::storage::GatewayConfig;

/// Which path produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    Gateway,
    Heuristic,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Gateway => "gateway",
            AnalysisSource::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: DreamAnalysisResult,
    pub source: AnalysisSource,
}

pub struct DreamClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    user_id: Option<String>,
}

impl DreamClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ValidationError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ValidationError::invalid("gateway.endpoint", e.to_string()))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            timeout,
            user_id: None,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ValidationError> {
        let mut client = Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))?;
        client.user_id = config.user_id.clone();
        Ok(client)
    }

    /// Relay `dream_text` to the gateway. Fails on transport errors, non-success
    /// envelopes, and results that are not well formed.
    pub async fn analyze(&self, dream_text: &str) -> Result<DreamAnalysisResult, GatewayError> {
        let mut request = AnalyzeRequest::new(dream_text);
        request.user_id = self.user_id.clone();
        request.timestamp = Some(chrono::Utc::now().timestamp_millis());

        let resp = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    GatewayError::internal(format!("gateway unreachable: {e}"))
                }
            })?;

        let status = resp.status();
        let envelope: AnalyzeResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::upstream_format(format!("gateway envelope ({status}): {e}")))?;

        match envelope {
            AnalyzeResponse {
                success: true,
                data: Some(result),
                ..
            } if result.is_well_formed() => Ok(result),
            AnalyzeResponse {
                success: true,
                request_id,
                ..
            } => Err(GatewayError::upstream_format(format!(
                "malformed result for {}",
                request_id.as_deref().unwrap_or("unknown request")
            ))),
            AnalyzeResponse {
                error, request_id, ..
            } => Err(GatewayError::internal(format!(
                "gateway answered {status} for {}: {}",
                request_id.as_deref().unwrap_or("unknown request"),
                error.as_deref().unwrap_or("no message")
            ))),
        }
    }

    /// Analyze through the gateway, falling back to the local heuristic on
    /// any failure. Always yields a usable result.
    pub async fn analyze_or_fallback(&self, dream_text: &str) -> Analysis {
        match self.analyze(dream_text).await {
            Ok(result) => {
                debug!(endpoint = %self.endpoint, "dream analyzed by gateway");
                Analysis {
                    result,
                    source: AnalysisSource::Gateway,
                }
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind().as_str(), "gateway analysis failed, using local heuristic");
                Analysis {
                    result: heuristic::analyze(dream_text),
                    source: AnalysisSource::Heuristic,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dream::heuristic::HEURISTIC_CONFIDENCE;

    const DREAM: &str = "I was flying over a beautiful landscape and felt free";

    fn client(server: &mockito::ServerGuard) -> DreamClient {
        DreamClient::new(&format!("{}/api/analyzeDream", server.url()), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn uses_gateway_result_when_well_formed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/analyzeDream")
            .match_body(mockito::Matcher::PartialJsonString(format!(
                r#"{{"dreamText":"{DREAM}"}}"#
            )))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"requestId":"req_1","data":{"emotions":["joy"],"themes":["flying"],"interpretation":"Freedom.","symbols":["sky"],"confidence":0.9,"timestampMs":1}}"#,
            )
            .create_async()
            .await;

        let analysis = client(&server).analyze_or_fallback(DREAM).await;
        assert_eq!(analysis.source, AnalysisSource::Gateway);
        assert_eq!(analysis.result.confidence, 0.9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn falls_back_on_error_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/analyzeDream")
            .with_status(502)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"error":"Dream analysis service returned an unreadable response","requestId":"req_2"}"#)
            .create_async()
            .await;

        let analysis = client(&server).analyze_or_fallback(DREAM).await;
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
        assert_eq!(analysis.result.confidence, HEURISTIC_CONFIDENCE);
        assert!(analysis.result.themes.contains(&"flying".to_string()));
    }

    #[tokio::test]
    async fn falls_back_on_malformed_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/analyzeDream")
            .with_status(200)
            .with_body(r#"{"success":true,"requestId":"req_3","data":{"emotions":[],"themes":[],"interpretation":"","symbols":[],"confidence":7,"timestampMs":1}}"#)
            .create_async()
            .await;

        let c = client(&server);
        assert_eq!(
            c.analyze(DREAM).await.unwrap_err().kind(),
            crate::error::ErrorKind::UpstreamFormat
        );
        assert_eq!(c.analyze_or_fallback(DREAM).await.source, AnalysisSource::Heuristic);
    }

    #[tokio::test]
    async fn falls_back_when_unreachable() {
        // Nothing listens on the discard port.
        let c = DreamClient::new("http://127.0.0.1:9/api/analyzeDream", Duration::from_secs(2)).unwrap();
        let analysis = c.analyze_or_fallback(DREAM).await;
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
        assert!(analysis.result.is_well_formed());
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let err = DreamClient::new("not a url", Duration::from_secs(1)).err().unwrap();
        assert!(err.to_string().contains("gateway.endpoint"));
    }
}
