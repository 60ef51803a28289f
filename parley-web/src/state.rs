//! Application state shared by every request

use crate::{
    auth::{
        database::DatabaseUserStore,
        jwt::JwtAuthGateway,
        users::{UserService, UserStore},
    },
    database::{Database, SqliteTranscriptStore},
    WebConfig, WebError, WebResult,
};
use parley_chat::{ChatService, InMemoryTranscriptStore, UploadDir};
use parley_core::{AuthGateway, CompletionClient, TranscriptStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Long-lived collaborators, built once at startup and cloned into handlers
#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    /// Chat pipeline
    pub chat: ChatService,
    pub transcripts: Arc<dyn TranscriptStore>,
    /// Staging directory for uploads
    pub uploads: UploadDir,
    /// Database handle, absent when running without one
    pub database: Option<Database>,
    /// User registration and login
    pub user_service: UserService,
    /// Bearer token validation
    pub auth_gateway: Arc<dyn AuthGateway>,
}

impl AppState {
    /// Build the state with the completion client named in the configuration
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let completion = parley_llm::create_completion_client(config.app.llm.clone())
            .map_err(|e| WebError::Config(format!("Failed to create completion client: {}", e)))?;

        if config.app.llm.api_key.is_none() {
            warn!("GOOGLE_API_KEY is not set; chat requests will fail until it is configured");
        }

        Self::with_completion(config, completion).await
    }

    /// Build the state around an existing completion client
    pub async fn with_completion(
        config: WebConfig,
        completion: Arc<dyn CompletionClient>,
    ) -> WebResult<Self> {
        config
            .app
            .validate()
            .map_err(|e| WebError::Config(e.to_string()))?;

        let uploads = UploadDir::new(&config.app.storage.upload_dir)
            .map_err(|e| WebError::Config(format!("Failed to prepare upload directory: {}", e)))?;

        let jwt = Arc::new(JwtAuthGateway::from_config(&config.app.auth));

        let database_url = config.app.storage.database_url.trim();
        let (database, transcripts, user_store) = if database_url.is_empty() {
            warn!("No database configured; transcripts and accounts are kept in memory");
            let transcripts: Arc<dyn TranscriptStore> = Arc::new(InMemoryTranscriptStore::new());
            (None, transcripts, UserStore::memory())
        } else {
            let database = Database::connect(database_url).await?;
            let transcripts: Arc<dyn TranscriptStore> = Arc::new(
                SqliteTranscriptStore::new(database.pool().clone())
                    .await
                    .map_err(|e| WebError::Database(e.to_string()))?,
            );
            let users = DatabaseUserStore::new(database.pool().clone())
                .await
                .map_err(|e| WebError::Database(e.to_string()))?;
            info!("Database initialized successfully");
            (Some(database), transcripts, UserStore::database(users))
        };

        let chat = ChatService::new(completion, transcripts.clone(), config.app.retry.clone());
        let user_service = UserService::new(user_store, jwt.clone());

        Ok(Self {
            config,
            chat,
            transcripts,
            uploads,
            database,
            user_service,
            auth_gateway: jwt,
        })
    }
}
