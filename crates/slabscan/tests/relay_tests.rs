//! End-to-end tests for the analyze endpoint against a scripted provider.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use common::{chunked, data_url, two_card_document, FakeAnalyzer, StalledAnalyzer};
use slabscan::provider::CardAnalyzer;
use slabscan::relay::{create_router, AppState, DEFAULT_REQUEST_TIMEOUT};

fn router_with(analyzer: Arc<dyn CardAnalyzer>, timeout: Duration) -> Router {
    create_router(AppState::new(analyzer, timeout))
}

fn analyze_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_empty_batch_is_rejected_without_provider_call() {
    let analyzer = Arc::new(FakeAnalyzer::streaming(&[]));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({ "images": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"No images provided");
    assert_eq!(analyzer.call_count(), 0);
}

#[tokio::test]
async fn test_missing_images_field_is_rejected() {
    let analyzer = Arc::new(FakeAnalyzer::streaming(&[]));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(analyzer.call_count(), 0);
}

#[tokio::test]
async fn test_batch_streams_through_verbatim() {
    let document = two_card_document();
    let chunks = chunked(&document, 16);
    let chunk_refs: Vec<&str> = chunks.iter().map(|s| s.as_str()).collect();
    let analyzer = Arc::new(FakeAnalyzer::streaming(&chunk_refs));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({
            "images": [data_url("first"), data_url("second")]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    // Forwarded as received: byte-identical to the provider output.
    assert_eq!(text, document);

    // The final object conforms to the contract and preserves order.
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    slabscan::schema::validate_batch(&value).unwrap();
    assert_eq!(value["cards"].as_array().unwrap().len(), 2);
    assert_eq!(value["cards"][0]["isValid"], serde_json::json!(true));
    assert_eq!(value["cards"][1]["validationError"], "Image too blurry");
}

#[tokio::test]
async fn test_provider_receives_prompts_and_ordered_images() {
    let analyzer = Arc::new(FakeAnalyzer::streaming(&["{\"cards\":[]}"]));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({
            "images": [data_url("AAAA"), data_url("BBBB"), data_url("CCCC")]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = analyzer.calls();
    assert_eq!(calls.len(), 1);

    let call = &calls[0];
    assert_eq!(call.system_instruction, slabscan::prompt::CARD_ANALYSIS_PROMPT);
    assert!(call.user_instruction.contains("ALL 3 image(s)"));
    assert!(call.user_instruction.contains("Return 3 card object(s)"));

    let payloads: Vec<&str> = call.images.iter().map(|i| i.data.as_str()).collect();
    assert_eq!(payloads, ["AAAA", "BBBB", "CCCC"]);
    assert!(call.images.iter().all(|i| i.mime_type == "image/jpeg"));
}

#[tokio::test]
async fn test_setup_failure_becomes_json_500() {
    let analyzer = Arc::new(FakeAnalyzer::failing_setup("quota exhausted"));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({ "images": [data_url("AAAA")] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(std::str::from_utf8(&body).unwrap()).unwrap();
    assert_eq!(value["error"], "Failed to analyze card");
    let details = value["details"].as_str().unwrap();
    assert!(!details.is_empty());
    assert!(details.contains("quota exhausted"));
}

#[tokio::test]
async fn test_malformed_data_url_fails_before_provider_call() {
    let analyzer = Arc::new(FakeAnalyzer::streaming(&[]));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({ "images": ["not-a-data-url"] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(std::str::from_utf8(&body).unwrap()).unwrap();
    assert_eq!(value["error"], "Failed to analyze card");
    assert_eq!(analyzer.call_count(), 0);
}

#[tokio::test]
async fn test_mid_stream_failure_aborts_the_body() {
    let analyzer = Arc::new(FakeAnalyzer::with_stream_failure(
        &["{\"cards\":[{\"isValid\":true"],
        "connection reset by provider",
    ));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let response = router
        .oneshot(analyze_request(serde_json::json!({ "images": [data_url("AAAA")] })))
        .await
        .unwrap();

    // Streaming had already begun, so the status is 200 and the failure
    // surfaces as body termination.
    assert_eq!(response.status(), StatusCode::OK);
    let result = axum::body::to_bytes(response.into_body(), usize::MAX).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_stalled_setup_hits_the_deadline() {
    let router = router_with(Arc::new(StalledAnalyzer), Duration::from_millis(50));

    let response = router
        .oneshot(analyze_request(serde_json::json!({ "images": [data_url("AAAA")] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(std::str::from_utf8(&body).unwrap()).unwrap();
    assert_eq!(value["error"], "Failed to analyze card");
    assert!(value["details"].as_str().unwrap().contains("did not start"));
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let analyzer = Arc::new(FakeAnalyzer::streaming(&["{\"cards\":[]}"]));
    let router = router_with(analyzer.clone(), DEFAULT_REQUEST_TIMEOUT);

    let first = router
        .clone()
        .oneshot(analyze_request(serde_json::json!({ "images": [data_url("AAAA")] })));
    let second = router
        .clone()
        .oneshot(analyze_request(serde_json::json!({ "images": [data_url("BBBB")] })));

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    assert_eq!(analyzer.call_count(), 2);
}
