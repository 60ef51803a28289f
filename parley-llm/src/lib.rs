//! Completion backends for parley
//!
//! Currently a single backend: the Gemini `generateContent` REST API.

pub mod gemini;

pub use gemini::GeminiClient;

use parley_core::{CompletionClient, CompletionError, LlmConfig};
use std::sync::Arc;

/// Build the completion client selected by `config.provider`
pub fn create_completion_client(
    config: LlmConfig,
) -> Result<Arc<dyn CompletionClient>, CompletionError> {
    match config.provider.as_str() {
        "gemini" | "google" => Ok(Arc::new(GeminiClient::new(config)?)),
        provider => Err(CompletionError::Config {
            message: format!("Unsupported LLM provider: {}", provider),
        }),
    }
}
