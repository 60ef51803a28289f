//! Database-backed user storage implementation

use super::{jwt::AuthError, users::UserData};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, error, info};

/// Database-backed user store
#[derive(Debug, Clone)]
pub struct DatabaseUserStore {
    pool: SqlitePool,
}

impl DatabaseUserStore {
    /// Create the store, making sure the `users` table exists
    pub async fn new(pool: SqlitePool) -> Result<Self, AuthError> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to create users table", e))?;

        info!("Users table ready");
        Ok(())
    }

    /// Insert a new user. Usernames are unique.
    pub async fn register_user(&self, user: UserData) -> Result<UserData, AuthError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("User inserted successfully: {}", user.username);
                Ok(user)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Registration failed: username '{}' already exists", user.username);
                Err(AuthError::UsernameTaken)
            }
            Err(e) => Err(storage_error("Failed to insert user", e)),
        }
    }

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserData>, AuthError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to query user by username", e))?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserData>, AuthError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to query user by ID", e))?;

        row.map(|row| user_from_row(&row)).transpose()
    }
}

fn user_from_row(row: &SqliteRow) -> Result<UserData, AuthError> {
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AuthError::Storage(format!("Invalid created_at: {}", e)))?;

    Ok(UserData {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at,
    })
}

fn storage_error(context: &str, e: sqlx::Error) -> AuthError {
    error!("{}: {}", context, e);
    AuthError::Storage(format!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn store() -> DatabaseUserStore {
        let database = Database::connect("sqlite::memory:").await.unwrap();
        DatabaseUserStore::new(database.pool().clone()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = store().await;
        let user = UserData::new("alice".to_string(), "secret123").unwrap();
        let id = user.id.clone();
        store.register_user(user).await.unwrap();

        let by_name = store.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert!(by_name.verify_password("secret123"));

        let by_id = store.get_user_by_id(&id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(store.get_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_username() {
        let store = store().await;
        store
            .register_user(UserData::new("alice".to_string(), "secret123").unwrap())
            .await
            .unwrap();

        let duplicate = UserData::new("alice".to_string(), "other-pass").unwrap();
        assert!(matches!(
            store.register_user(duplicate).await,
            Err(AuthError::UsernameTaken)
        ));
    }
}
