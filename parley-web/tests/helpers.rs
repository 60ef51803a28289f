//! Shared fixtures for the web integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use parley_core::{CompletionClient, CompletionError};
use parley_web::{create_app, AppState, WebConfig};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BOUNDARY: &str = "parley-test-boundary";

/// Completion client that replays scripted outcomes, then repeats the fallback
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: fn() -> Result<String, CompletionError>,
    calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(
        script: Vec<Result<String, CompletionError>>,
        fallback: fn() -> Result<String, CompletionError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &'static str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())], always_rate_limited)
    }

    pub fn rate_limited() -> Arc<Self> {
        Self::new(Vec::new(), always_rate_limited)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(self.fallback)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn always_rate_limited() -> Result<String, CompletionError> {
    Err(CompletionError::RateLimited {
        message: "429 Too Many Requests".to_string(),
        retry_after_ms: None,
    })
}

/// A running app plus the directories it writes to
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

pub struct TestOptions {
    /// Use an in-memory SQLite database instead of the in-process stores
    pub sqlite: bool,
    pub require_auth_for_chat: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            sqlite: true,
            require_auth_for_chat: false,
        }
    }
}

pub async fn spawn_app(client: Arc<ScriptedClient>, options: TestOptions) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();

    let mut config = WebConfig::default();
    config.app.storage.upload_dir = uploads.path().to_string_lossy().into_owned();
    config.app.storage.database_url = if options.sqlite {
        "sqlite::memory:".to_string()
    } else {
        String::new()
    };
    config.app.auth.jwt_secret = Some("integration-test-secret".to_string());
    config.app.auth.require_auth_for_chat = options.require_auth_for_chat;

    let state = AppState::with_completion(config, client).await.unwrap();
    let app = create_app(state.clone());

    TestApp {
        app,
        state,
        uploads,
    }
}

pub fn create_request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Multipart chat request with an optional message and file
pub fn multipart_request(
    uri: &str,
    message: Option<&str>,
    file: Option<(&str, &[u8])>,
    token: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(message) = message {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"message\"\r\n\r\n{message}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn extract_json_response(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Wait for the upload directory to be emptied by the background removals
pub async fn wait_until_empty(dir: &Path) {
    for _ in 0..100 {
        let empty = std::fs::read_dir(dir).unwrap().next().is_none();
        if empty {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
        tokio::task::yield_now().await;
    }
    panic!("{} still holds uploaded files", dir.display());
}
