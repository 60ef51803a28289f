//! Parley Core - shared types, traits and infrastructure
//!
//! Defines the error types, retry policy, configuration and the seams
//! (`CompletionClient`, `TranscriptStore`, `AuthGateway`) the rest of the
//! parley workspace plugs into.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
