//! Chat request pipeline
//!
//! Reads the optional upload, builds the prompt, asks the completion backend
//! for a reply (retrying on rate limits) and records the exchange. A record is
//! written only when a reply was obtained.

use crate::upload::{UploadError, UploadedFile};
use parley_core::performance::measure_async;
use parley_core::{
    retry_async, CompletionClient, CompletionError, NewChatRecord, RetryConfig, RetryError,
    StoreError, TranscriptStore,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Inserted between the user's message and the text of an attached file
pub const FILE_CONTENT_SEPARATOR: &str = "\n\nFile content:\n";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Failed to read uploaded file: {0}")]
    UploadRead(#[source] UploadError),

    #[error("Failed to generate response: {0}")]
    Completion(#[source] CompletionError),

    #[error("Failed to save chat record: {0}")]
    Persistence(#[source] StoreError),
}

impl ChatError {
    /// Message safe to show to the caller
    pub fn public_message(&self) -> &'static str {
        match self {
            ChatError::UploadRead(_) => "Failed to read uploaded file",
            ChatError::Completion(_) | ChatError::Persistence(_) => "Failed to generate response",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub record_id: String,
}

/// The message followed by the file text, if any
pub fn build_prompt(message: Option<&str>, file_text: Option<&str>) -> String {
    let mut prompt = message.unwrap_or_default().to_string();
    if let Some(text) = file_text {
        prompt.push_str(FILE_CONTENT_SEPARATOR);
        prompt.push_str(text);
    }
    prompt
}

/// Call `client` with exponential backoff on rate-limit errors.
///
/// Non-rate-limit errors are returned as-is after a single call. When the
/// retries run out the last rate-limit error is wrapped in
/// `CompletionError::RetriesExhausted`.
pub async fn attempt_completion(
    client: &dyn CompletionClient,
    prompt: &str,
    retry: &RetryConfig,
) -> Result<String, CompletionError> {
    retry_async(
        move || client.generate(prompt),
        retry,
        "completion",
        CompletionError::is_rate_limited,
    )
    .await
    .map_err(|e| match e {
        RetryError::Exhausted { attempts, last } => CompletionError::RetriesExhausted {
            attempts,
            source: Box::new(last),
        },
        RetryError::Fatal(e) => e,
    })
}

/// Orchestrates a single chat exchange
#[derive(Clone)]
pub struct ChatService {
    completion: Arc<dyn CompletionClient>,
    transcripts: Arc<dyn TranscriptStore>,
    retry: RetryConfig,
}

impl ChatService {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        transcripts: Arc<dyn TranscriptStore>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            completion,
            transcripts,
            retry,
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn transcripts(&self) -> &Arc<dyn TranscriptStore> {
        &self.transcripts
    }

    /// Run the full pipeline for one request.
    ///
    /// `upload` is held until the exchange is finished and removed when it
    /// goes out of scope, whatever the outcome.
    pub async fn handle_chat(
        &self,
        message: Option<String>,
        upload: Option<UploadedFile>,
    ) -> Result<ChatReply, ChatError> {
        let file_text = match &upload {
            Some(file) => match file.read_text().await {
                Ok(text) => Some(text),
                Err(e) => {
                    error!(
                        file = ?file.original_name(),
                        error = %e,
                        "Error reading uploaded file"
                    );
                    return Err(ChatError::UploadRead(e));
                }
            },
            None => None,
        };

        let prompt = build_prompt(message.as_deref(), file_text.as_deref());

        info!(
            model = self.completion.model(),
            prompt_chars = prompt.len(),
            has_upload = upload.is_some(),
            "Handling chat request"
        );

        let reply = measure_async(
            "chat_completion",
            attempt_completion(self.completion.as_ref(), &prompt, &self.retry),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Error generating response");
            ChatError::Completion(e)
        })?;

        let record_id = self
            .transcripts
            .insert(NewChatRecord::new(prompt, reply.clone()))
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to save chat record");
                ChatError::Persistence(e)
            })?;

        drop(upload);

        Ok(ChatReply { reply, record_id })
    }
}
