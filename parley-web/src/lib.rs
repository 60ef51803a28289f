//! Parley Web Server
//!
//! HTTP front for the chat pipeline: multipart chat submissions, user
//! registration and login with bearer tokens, and a SQLite transcript.

pub mod auth;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::{ParleyServer, ParleyServerBuilder};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    Router,
};
use parley_core::{LogFormat, LoggingConfig, ParleyConfig};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    // Any origin may call the API, with credentials
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let mut router = Router::new()
        .merge(routes::api_routes(&state))
        .nest("/api", routes::api_routes(&state));

    if let Some(static_dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}

/// Initialize logging for the web server.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str, format: LogFormat) -> WebResult<()> {
    let config = LoggingConfig {
        level: level.to_string(),
        format,
        filter_directives: vec![
            format!("parley_web={}", level),
            format!("parley_chat={}", level),
            format!("parley_llm={}", level),
            "tower_http=debug".to_string(),
        ],
        ..LoggingConfig::default()
    };

    parley_core::init_logging(&config)
        .map_err(|e| WebError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the built front end, served for unknown paths
    pub static_dir: Option<String>,
    /// Largest accepted request body, uploads included
    pub max_upload_bytes: usize,
    /// Model, retry, storage and auth settings
    pub app: ParleyConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: None,
            max_upload_bytes: 10 * 1024 * 1024,
            app: ParleyConfig::default(),
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// `PARLEY_CONFIG` names an optional TOML file; environment values are
    /// applied on top of it.
    pub fn from_env() -> WebResult<Self> {
        let config_path = std::env::var("PARLEY_CONFIG").ok();
        Self::load(config_path.as_deref())
    }

    /// Load configuration from `config_path`, if given, then the environment
    pub fn load(config_path: Option<&str>) -> WebResult<Self> {
        let app = match config_path {
            Some(path) => ParleyConfig::from_file(path)
                .map_err(|e| WebError::Config(format!("{}: {}", path, e)))?,
            None => ParleyConfig::default(),
        }
        .apply_env();

        let port = std::env::var("PORT")
            .or_else(|_| std::env::var("PARLEY_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Ok(Self {
            host: std::env::var("PARLEY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            static_dir: std::env::var("PARLEY_STATIC_DIR").ok(),
            max_upload_bytes: 10 * 1024 * 1024,
            app,
        })
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
