//! Core trait definitions

use crate::error::{CompletionError, StoreError};
use crate::types::{AuthStatus, ChatRecord, NewChatRecord};
use async_trait::async_trait;

/// A single text-generation call against an external model
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a reply for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Model identifier, used for logging
    fn model(&self) -> &str;
}

/// Append-only persistence for chat exchanges
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Store a record and return its id
    async fn insert(&self, record: NewChatRecord) -> Result<String, StoreError>;

    /// Most recent records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, StoreError>;
}

/// Validates bearer tokens issued by the auth layer
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn validate(&self, token: Option<&str>) -> AuthStatus;
}
