//! Parley web server
//!
//! Binds the listener and serves the router built by [`create_app`].

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use parley_core::ParleyConfig;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// The HTTP server together with its shared state
pub struct ParleyServer {
    config: WebConfig,
    state: AppState,
}

impl ParleyServer {
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;

        Ok(Self { config, state })
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting Parley Web Server");
        info!("Server address: http://{}", address);
        info!(
            model = %self.config.app.llm.model,
            require_auth_for_chat = self.config.app.auth.require_auth_for_chat,
            "Chat configuration"
        );

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Builder for [`ParleyServer`]
pub struct ParleyServerBuilder {
    config: WebConfig,
}

impl ParleyServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. one read from the environment
    pub fn from_config(config: WebConfig) -> Self {
        Self { config }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Directory served for paths no route matches
    pub fn static_dir<S: Into<String>>(mut self, static_dir: S) -> Self {
        self.config.static_dir = Some(static_dir.into());
        self
    }

    /// SQLite URL for transcripts and accounts. Empty keeps both in memory.
    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.app.storage.database_url = database_url.into();
        self
    }

    pub fn upload_dir<S: Into<String>>(mut self, upload_dir: S) -> Self {
        self.config.app.storage.upload_dir = upload_dir.into();
        self
    }

    pub fn app_config(mut self, app: ParleyConfig) -> Self {
        self.config.app = app;
        self
    }

    pub async fn build(self) -> WebResult<ParleyServer> {
        ParleyServer::new(self.config).await
    }
}

impl Default for ParleyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
