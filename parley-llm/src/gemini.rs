//! Gemini `generateContent` client
//!
//! Talks to the Google Generative Language REST API with a shared
//! `reqwest::Client` and turns every failure into a `CompletionError`, so the
//! retry layer can tell rate limits apart from everything else.

use async_trait::async_trait;
use parley_core::{CompletionClient, CompletionError, LlmConfig};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Completion client backed by the Gemini REST API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: LlmConfig,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self::with_http_client(http, config))
    }

    /// Build on top of an existing `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client, config: LlmConfig) -> Self {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            normalize_api_base(&config.api_base),
            config.model
        );

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Self {
            http,
            config,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = retry_after_ms(response.headers());
            let text = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                retry_after_ms = ?retry_after_ms,
                "Gemini request failed"
            );
            return Err(classify_failure(status, &text, retry_after_ms));
        }

        let payload: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::InvalidResponse {
                    message: format!("Failed to decode response body: {}", e),
                })?;

        extract_text(payload)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CompletionError::Config {
                message: "GOOGLE_API_KEY is not set".to_string(),
            })?;

        let start_time = Instant::now();
        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Sending generateContent request"
        );

        let result = self.send(api_key, prompt).await;

        match &result {
            Ok(text) => info!(
                "Generated response in {:?} ({} chars)",
                start_time.elapsed(),
                text.len()
            ),
            Err(e) if e.is_rate_limited() => {
                warn!(model = %self.config.model, error = %e, "Gemini rate limit hit")
            }
            Err(e) => warn!(model = %self.config.model, error = %e, "Gemini request failed"),
        }

        result
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn transport_error(e: reqwest::Error) -> CompletionError {
    let message = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        e.to_string()
    };
    CompletionError::Transport { message }
}

/// Map a non-success HTTP response to an error kind
fn classify_failure(status: StatusCode, body: &str, retry_after_ms: Option<u64>) -> CompletionError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("{} {}", status.as_u16(), body.trim()));
    let exhausted = envelope
        .as_ref()
        .and_then(|e| e.error.status.as_deref())
        .is_some_and(|s| s == RESOURCE_EXHAUSTED);

    if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
        CompletionError::RateLimited {
            message,
            retry_after_ms,
        }
    } else {
        CompletionError::Provider {
            status: status.as_u16(),
            message,
        }
    }
}

fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
}

fn extract_text(payload: GenerateResponse) -> Result<String, CompletionError> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    let message = match payload.prompt_feedback.and_then(|f| f.block_reason) {
        Some(reason) => format!("prompt blocked: {}", reason),
        None => "response contained no text".to_string(),
    };
    Err(CompletionError::InvalidResponse { message })
}

fn normalize_api_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.ends_with("/v1beta") {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}
