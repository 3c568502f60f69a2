use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub const MIN_DREAM_CHARS: usize = 20;
pub const MAX_DREAM_CHARS: usize = 2000;

/// Normalized dream analysis, identical in shape whichever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamAnalysisResult {
    pub emotions: Vec<String>,
    pub themes: Vec<String>,
    pub interpretation: String,
    pub symbols: Vec<String>,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub timestamp_ms: i64,
}

impl DreamAnalysisResult {
    /// Structural check used by clients before trusting a relayed result.
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
            && !self.interpretation.trim().is_empty()
            && !self.emotions.is_empty()
            && !self.themes.is_empty()
    }
}

/// Body of `POST /api/analyzeDream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub dream_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl AnalyzeRequest {
    pub fn new(dream_text: impl Into<String>) -> Self {
        Self {
            dream_text: dream_text.into(),
            user_id: None,
            timestamp: None,
        }
    }

    /// Check the length precondition and return the trimmed text.
    pub fn validated_text(&self) -> Result<&str, ValidationError> {
        let text = self.dream_text.trim();
        let chars = text.chars().count();
        if !(MIN_DREAM_CHARS..=MAX_DREAM_CHARS).contains(&chars) {
            return Err(ValidationError::OutOfRange {
                field: "dreamText",
                min: MIN_DREAM_CHARS as u64,
                max: MAX_DREAM_CHARS as u64,
                unit: "characters",
                actual: chars as u64,
            });
        }
        Ok(text)
    }
}

/// Envelope returned by the relay for every dream analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DreamAnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Null only for requests that never reached a handler.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl AnalyzeResponse {
    pub fn ok(data: DreamAnalysisResult, request_id: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: Some(request_id.into()),
        }
    }

    pub fn failed(error: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            request_id,
        }
    }
}

/// Fresh identifier of the form `req_<32 hex digits>`.
pub fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(AnalyzeRequest::new("a".repeat(19)).validated_text().is_err());
        assert!(AnalyzeRequest::new("a".repeat(20)).validated_text().is_ok());
        assert!(AnalyzeRequest::new("a".repeat(2000)).validated_text().is_ok());
        assert!(AnalyzeRequest::new("a".repeat(2001)).validated_text().is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 20 multi-byte characters.
        assert!(AnalyzeRequest::new("夢".repeat(20)).validated_text().is_ok());
        assert!(AnalyzeRequest::new("夢".repeat(2001)).validated_text().is_err());
    }

    #[test]
    fn surrounding_whitespace_does_not_count() {
        let padded = format!("   {}   ", "a".repeat(19));
        assert!(AnalyzeRequest::new(padded).validated_text().is_err());
    }

    #[test]
    fn request_wire_names() {
        let req: AnalyzeRequest = serde_json::from_str(
            r#"{"dreamText":"I was flying over the sea","userId":"u1","timestamp":5}"#,
        )
        .unwrap();
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.timestamp, Some(5));
    }

    #[test]
    fn failure_envelope_keeps_null_request_id() {
        let json = serde_json::to_value(AnalyzeResponse::failed("Endpoint not found", None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Endpoint not found", "requestId": null})
        );
    }

    #[test]
    fn request_ids_are_unique_and_prefixed() {
        let a = new_request_id();
        let b = new_request_id();
        assert!(a.starts_with("req_"));
        assert_eq!(a.len(), 4 + 32);
        assert_ne!(a, b);
    }
}
