//! Prompt contract with the completion service and strict parsing of its reply.

use serde::Deserialize;

use crate::error::GatewayError;

pub const SYSTEM_PROMPT: &str = "You are an expert dream analyst. Respond only with a single \
JSON object and no other text.";

/// Wrap the dream in the fixed instructional prompt.
pub fn build_prompt(dream_text: &str) -> String {
    format!(
        "Analyze the following dream and respond with a JSON object with exactly these keys:\n\
         - \"emotions\": array of strings naming the main emotions present\n\
         - \"themes\": array of strings naming the main themes\n\
         - \"interpretation\": string, a thoughtful interpretation in 2-4 sentences\n\
         - \"symbols\": array of strings naming key symbols and objects\n\
         - \"confidence\": number between 0 and 1\n\n\
         Dream: \"{dream_text}\""
    )
}

/// The five keys the model must return, nothing more.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelAnalysis {
    pub emotions: Vec<String>,
    pub themes: Vec<String>,
    pub interpretation: String,
    pub symbols: Vec<String>,
    pub confidence: f64,
}

/// Strip one surrounding Markdown code fence, if present.
fn unfence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim_start().starts_with('{') => inner.trim(),
        _ => body.trim(),
    }
}

/// Parse the model's text. Anything that is not a JSON object with the
/// expected schema is an `UpstreamFormat` error.
pub fn parse_model_reply(text: &str) -> Result<ModelAnalysis, GatewayError> {
    let body = unfence(text);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::upstream_format(format!("not JSON: {e}")))?;
    if !value.is_object() {
        return Err(GatewayError::upstream_format("reply is not a JSON object"));
    }
    let analysis: ModelAnalysis = serde_json::from_value(value)
        .map_err(|e| GatewayError::upstream_format(format!("schema mismatch: {e}")))?;

    if !(0.0..=1.0).contains(&analysis.confidence) {
        return Err(GatewayError::upstream_format(format!(
            "confidence {} outside [0, 1]",
            analysis.confidence
        )));
    }
    if analysis.interpretation.trim().is_empty() {
        return Err(GatewayError::upstream_format("empty interpretation"));
    }
    Ok(analysis)
}
