//! Completion service client.
//!
//! [`CompletionBackend`] is the seam between the gateway and the language
//! model. [`OpenAiBackend`] speaks the OpenAI-compatible chat completions API;
//! tests substitute canned backends.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::schema::SYSTEM_PROMPT;
use crate::error::GatewayError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `prompt` and return the model's raw text.
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Map a non-success upstream status to the gateway taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> GatewayError {
    let quota_code = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|b| {
            b.error.code.as_deref() == Some("insufficient_quota")
                || b.error.kind.as_deref() == Some("insufficient_quota")
        })
        .unwrap_or(false);
    if status == StatusCode::TOO_MANY_REQUESTS || quota_code {
        GatewayError::UpstreamQuota
    } else {
        GatewayError::internal(format!("upstream HTTP {status}"))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::internal(format!("upstream request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::internal(format!("upstream body unreadable: {e}")))?;

        if !status.is_success() {
            warn!(%status, body = %text, "completion service returned an error");
            return Err(classify_failure(status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::upstream_format(format!("completion envelope: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::upstream_format("completion has no content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn backend(server: &mockito::ServerGuard) -> OpenAiBackend {
        OpenAiBackend::new("sk-test").with_base_url(server.url())
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#)
            .create_async()
            .await;

        let text = backend(&server).complete("prompt").await.unwrap();
        assert_eq!(text, r#"{"a":1}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn quota_errors_are_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#)
            .create_async()
            .await;

        let err = backend(&server).complete("prompt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamQuota);
        assert!(!err.to_string().contains("exceeded"));
    }

    #[tokio::test]
    async fn server_errors_are_internal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let err = backend(&server).complete("prompt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn malformed_envelope_is_format_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = backend(&server).complete("prompt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamFormat);
    }

    #[test]
    fn classify_quota_code_on_other_status() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":"insufficient_quota"}}"#,
        );
        assert_eq!(err.kind(), ErrorKind::UpstreamQuota);
    }
}
