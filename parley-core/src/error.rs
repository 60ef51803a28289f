//! Unified error handling system
//!
//! Structured error types shared by every parley crate. `ParleyError` covers
//! configuration and infrastructure failures, `CompletionError` classifies what
//! went wrong while talking to the generative backend, and `StoreError` is what
//! transcript persistence reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

pub type ParleyResult<T> = Result<T, ParleyError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    pub operation: Option<String>,
    pub metadata: HashMap<String, String>,
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Infrastructure error type for configuration, storage and IO failures
#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ParleyError {
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ParleyError::Config { context, .. } => Some(context),
            ParleyError::Storage { context, .. } => Some(context),
            ParleyError::Validation { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            ParleyError::Config { .. } | ParleyError::Validation { .. } => {
                error!(error_id = ?error_id, error = %self, "Configuration or validation error");
            }
            ParleyError::Io(_) => {
                warn!(error = %self, "IO error");
            }
            _ => {
                error!(error_id = ?error_id, error = %self, "Error occurred");
            }
        }
    }
}

/// Failure of a single call to the completion backend.
///
/// Only `RateLimited` is worth retrying; every other kind fails the request
/// immediately.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("Provider returned status {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Invalid completion response: {message}")]
    InvalidResponse { message: String },

    #[error("Completion client misconfigured: {message}")]
    Config { message: String },

    #[error("Rate limit persisted after {attempts} attempts")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: Box<CompletionError>,
    },
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CompletionError::RateLimited { .. })
    }

    /// Server-suggested wait, when the backend sent one
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            CompletionError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

/// Failure reported by a transcript store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Record could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::ParleyError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::ParleyError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}
