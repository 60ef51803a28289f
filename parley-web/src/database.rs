//! SQLite connection management and the transcript table

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{ChatRecord, NewChatRecord, StoreError, TranscriptStore};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::str::FromStr;
use tracing::{debug, error, info};

use crate::{WebError, WebResult};

/// Shared SQLite pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open `database_url`, creating the file and its directory if needed
    pub async fn connect(database_url: &str) -> WebResult<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| WebError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let pool = if in_memory {
            // Every connection to an in-memory database is a fresh database,
            // so the pool must keep exactly one connection alive.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    info!("Creating parent directory: {}", parent.display());
                    std::fs::create_dir_all(parent).map_err(|e| {
                        error!("Failed to create directory: {}", e);
                        WebError::Database(format!("Failed to create directory: {}", e))
                    })?;
                }
            }
            SqlitePoolOptions::new().connect_with(options).await
        }
        .map_err(|e| {
            error!("Database connection failed: {}", e);
            WebError::Database(format!("Failed to connect to database: {}", e))
        })?;

        info!("Database connection established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Transcript store over the `chat_records` table
#[derive(Debug, Clone)]
pub struct SqliteTranscriptStore {
    pool: SqlitePool,
}

impl SqliteTranscriptStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_records (
                id TEXT PRIMARY KEY,
                user_message TEXT NOT NULL,
                ai_response TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create chat_records table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_records_created_at ON chat_records(created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create chat_records index", e))?;

        debug!("chat_records table ready");
        Ok(())
    }
}

fn db_error(context: &str, e: sqlx::Error) -> StoreError {
    error!("{}: {}", context, e);
    StoreError::Database {
        message: format!("{}: {}", context, e),
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn insert(&self, record: NewChatRecord) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO chat_records (id, user_message, ai_response, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.user_message)
        .bind(&record.ai_response)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save chat record", e))?;

        debug!(record_id = %id, "Saved chat record");
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_message, ai_response, created_at
            FROM chat_records
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load chat records", e))?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| StoreError::Database {
                        message: format!("Invalid created_at '{}': {}", created_at, e),
                    })?;

                Ok(ChatRecord {
                    id: row.get("id"),
                    user_message: row.get("user_message"),
                    ai_response: row.get("ai_response"),
                    created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteTranscriptStore {
        let database = Database::connect("sqlite::memory:").await.unwrap();
        SqliteTranscriptStore::new(database.pool().clone())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = memory_store().await;

        let id = store
            .insert(NewChatRecord::new("Hello", "Hi there"))
            .await
            .unwrap();

        let records = store.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].user_message, "Hello");
        assert_eq!(records[0].ai_response, "Hi there");
    }

    #[tokio::test]
    async fn test_recent_respects_limit_and_order() {
        let store = memory_store().await;
        for i in 0..5 {
            store
                .insert(NewChatRecord::new(format!("q{i}"), format!("a{i}")))
                .await
                .unwrap();
        }

        let records = store.recent(2).await.unwrap();
        let questions: Vec<_> = records.iter().map(|r| r.user_message.as_str()).collect();
        assert_eq!(questions, vec!["q4", "q3"]);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("nested/parley.db").display());

        let database = Database::connect(&url).await.unwrap();
        SqliteTranscriptStore::new(database.pool().clone())
            .await
            .unwrap();

        assert!(dir.path().join("nested/parley.db").exists());
    }
}
