//! Dream analysis: gateway, relay client, heuristic fallback.

mod client;
mod gateway;
pub mod heuristic;
pub mod ratelimit;
mod schema;
mod types;
pub mod upstream;

pub use client::{Analysis, AnalysisSource, DreamClient};
pub use gateway::{DreamGateway, UPSTREAM_TIMEOUT};
pub use ratelimit::{RateDecision, RateLimiter};
pub use schema::{build_prompt, parse_model_reply, ModelAnalysis, SYSTEM_PROMPT};
pub use types::{
    new_request_id, AnalyzeRequest, AnalyzeResponse, DreamAnalysisResult, MAX_DREAM_CHARS,
    MIN_DREAM_CHARS,
};
pub use upstream::{CompletionBackend, OpenAiBackend};
