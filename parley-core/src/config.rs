//! Configuration loading and validation

use crate::error::{ErrorContext, ParleyError, ParleyResult};
use crate::types::{AuthConfig, LlmConfig, ParleyConfig, StorageConfig};
use crate::validation_error;

use std::path::Path;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Longest accepted bearer token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-pro".to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/parley.db".to_string(),
            upload_dir: "uploads".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
            require_auth_for_chat: false,
        }
    }
}

impl ParleyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ParleyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ParleyError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        toml::from_str(&content).map_err(|e| ParleyError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ParleyResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ParleyError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| ParleyError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Overlay values from the process environment
    pub fn apply_env(mut self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok());
        self
    }

    fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GOOGLE_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("PARLEY_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(dir) = lookup("PARLEY_UPLOAD_DIR") {
            self.storage.upload_dir = dir;
        }
        if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(flag) = lookup("PARLEY_REQUIRE_AUTH") {
            self.auth.require_auth_for_chat = matches!(flag.as_str(), "1" | "true" | "yes");
        }
    }

    pub fn validate(&self) -> ParleyResult<()> {
        if self.llm.model.trim().is_empty() {
            return Err(validation_error!(
                "LLM model must not be empty",
                "llm.model",
                "config"
            ));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(validation_error!(
                "Backoff multiplier must be at least 1.0",
                "retry.backoff_multiplier",
                "config"
            ));
        }

        if self.storage.upload_dir.trim().is_empty() {
            return Err(validation_error!(
                "Upload directory must not be empty",
                "storage.upload_dir",
                "config"
            ));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(ParleyError::Config {
                message: "Token lifetime must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set auth.token_ttl_secs to a positive value"),
            });
        }

        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(validation_error!(
                format!(
                    "Token lifetime must not exceed {} seconds",
                    MAX_TOKEN_TTL_SECS
                ),
                "auth.token_ttl_secs",
                "config"
            ));
        }

        Ok(())
    }
}
