//! Exercises the Gemini client against a local stand-in server

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parley_core::{CompletionClient, CompletionError, LlmConfig};
use parley_llm::{create_completion_client, GeminiClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn generate(
    State(recorded): State<Recorded>,
    Path(model_action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    recorded
        .requests
        .lock()
        .unwrap()
        .push((model_action.clone(), query.get("key").cloned(), body.clone()));

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    match prompt.as_str() {
        "busy" => {
            let mut headers = HeaderMap::new();
            headers.insert("retry-after", "7".parse().unwrap());
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(json!({
                    "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
                })),
            )
                .into_response()
        }
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"code": 500, "message": "internal", "status": "INTERNAL"}})),
        )
            .into_response(),
        _ => Json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": format!("echo: {prompt}")}]}}]
        }))
        .into_response(),
    }
}

async fn spawn_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1beta/models/{model_action}", post(generate))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

fn config_for(base: &str, api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        api_base: base.to_string(),
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
        ..LlmConfig::default()
    }
}

#[tokio::test]
async fn test_successful_generation_sends_user_content() {
    let (base, recorded) = spawn_server().await;
    let client = GeminiClient::new(config_for(&base, Some("secret"))).unwrap();

    let reply = client.generate("Hello").await.unwrap();
    assert_eq!(reply, "echo: Hello");

    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (path, key, body) = &requests[0];
    assert_eq!(path, "gemini-pro:generateContent");
    assert_eq!(key.as_deref(), Some("secret"));
    assert_eq!(
        body,
        &json!({"contents": [{"role": "user", "parts": [{"text": "Hello"}]}]})
    );
}

#[tokio::test]
async fn test_http_429_maps_to_rate_limited() {
    let (base, _) = spawn_server().await;
    let client = GeminiClient::new(config_for(&base, Some("secret"))).unwrap();

    let err = client.generate("busy").await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after_ms(), Some(7000));
}

#[tokio::test]
async fn test_server_error_is_not_rate_limited() {
    let (base, _) = spawn_server().await;
    let client = GeminiClient::new(config_for(&base, Some("secret"))).unwrap();

    match client.generate("broken").await {
        Err(CompletionError::Provider { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_api_key_fails_before_any_request() {
    let (base, recorded) = spawn_server().await;
    let client = GeminiClient::new(config_for(&base, None)).unwrap();

    let err = client.generate("Hello").await.unwrap_err();
    assert!(matches!(err, CompletionError::Config { .. }));
    assert!(recorded.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Nothing listens on port 9 on the loopback interface.
    let client = GeminiClient::new(config_for("http://127.0.0.1:9", Some("k"))).unwrap();
    let err = client.generate("Hello").await.unwrap_err();
    assert!(matches!(err, CompletionError::Transport { .. }));
}

#[test]
fn test_unknown_provider_is_rejected() {
    let config = LlmConfig {
        provider: "carrier-pigeon".to_string(),
        ..LlmConfig::default()
    };
    match create_completion_client(config) {
        Err(CompletionError::Config { message }) => {
            assert!(message.contains("carrier-pigeon"))
        }
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected an error"),
    }
}
