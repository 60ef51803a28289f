//! Core data type definitions

use crate::async_utils::RetryConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted chat exchange. Written once after a successful completion and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    /// The full prompt sent to the model, including any attached file text
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a transcript store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChatRecord {
    pub user_message: String,
    pub ai_response: String,
}

impl NewChatRecord {
    pub fn new(user_message: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ai_response: ai_response.into(),
        }
    }
}

/// Result of checking a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    /// Identity the token was issued to
    pub subject: Option<String>,
    pub username: Option<String>,
}

impl AuthStatus {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            subject: None,
            username: None,
        }
    }

    pub fn authenticated(subject: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            subject: Some(subject.into()),
            username: Some(username.into()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
    /// Directory uploaded files are staged in while a request is handled
    pub upload_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
    /// Put the bearer-token guard in front of the chat endpoint
    pub require_auth_for_chat: bool,
}
