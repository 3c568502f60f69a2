//! Integration tests for the dream analysis path: gateway over a mocked
//! completion service, then the client-side fallback.

use std::sync::Arc;
use std::time::Duration;

use lifeclock_core::dream::{
    heuristic, AnalysisSource, AnalyzeRequest, DreamClient, DreamGateway, OpenAiBackend,
};
use lifeclock_core::ErrorKind;

const DREAM: &str = "I was being chased through my childhood house and felt afraid";

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

#[tokio::test]
async fn test_gateway_over_mocked_completion_service() {
    let mut server = mockito::Server::new_async().await;
    let reply = "```json\n{\"emotions\":[\"fear\"],\"themes\":[\"chase\",\"home\"],\"interpretation\":\"Something from your past feels unresolved.\",\"symbols\":[\"house\"],\"confidence\":0.7}\n```";
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::Regex("childhood house".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(reply))
        .create_async()
        .await;

    let backend = OpenAiBackend::new("sk-test").with_base_url(server.url());
    let gateway = DreamGateway::new(Arc::new(backend));
    let result = gateway
        .analyze("127.0.0.1", &AnalyzeRequest::new(DREAM))
        .await
        .unwrap();

    assert_eq!(result.emotions, vec!["fear"]);
    assert_eq!(result.themes, vec!["chase", "home"]);
    assert_eq!(result.confidence, 0.7);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_prose_reply_is_rejected_and_heuristic_covers() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion_body("This dream shows you are running from something."))
        .create_async()
        .await;

    let backend = OpenAiBackend::new("sk-test").with_base_url(server.url());
    let gateway = DreamGateway::new(Arc::new(backend));
    let err = gateway
        .analyze("127.0.0.1", &AnalyzeRequest::new(DREAM))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamFormat);
    assert_eq!(err.kind().http_status(), 502);

    let fallback = heuristic::analyze(DREAM);
    assert_eq!(fallback.emotions, vec!["fear"]);
    assert_eq!(fallback.themes, vec!["chase", "home"]);
    assert_eq!(fallback.symbols, vec!["house"]);
}

#[tokio::test]
async fn test_client_falls_back_on_rate_limit_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/analyzeDream")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":false,"error":"Too many dream analysis requests from this client, please try again after 15 minutes.","requestId":"req_0"}"#)
        .create_async()
        .await;

    let client = DreamClient::new(
        &format!("{}/api/analyzeDream", server.url()),
        Duration::from_secs(5),
    )
    .unwrap();
    let analysis = client.analyze_or_fallback(DREAM).await;
    assert_eq!(analysis.source, AnalysisSource::Heuristic);
    assert!(analysis.result.is_well_formed());
}
