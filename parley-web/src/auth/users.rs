//! User management and authentication

use super::{
    database::DatabaseUserStore,
    jwt::{AuthError, IssuedToken, JwtAuthGateway},
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

/// User registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "correct-horse")]
    pub password: String,
}

/// User login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public user information
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Registration response
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "User registered successfully")]
    pub message: String,
    pub user: UserInfo,
}

/// Login response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: UserInfo,
}

/// Internal user data with password hash
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl UserData {
    /// Create new user with hashed password
    pub fn new(username: String, password: &str) -> Result<Self, AuthError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash: hash_password(password)?,
            created_at: chrono::Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    pub fn to_user_info(&self) -> UserInfo {
        UserInfo {
            id: self.id.clone(),
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!("Failed to hash password: {}", e);
            AuthError::PasswordHash
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// User store abstraction supporting both in-memory and database storage
#[derive(Debug, Clone)]
pub enum UserStore {
    /// In-memory storage, keyed by username
    Memory {
        users: Arc<RwLock<HashMap<String, UserData>>>,
    },
    Database(DatabaseUserStore),
}

impl Default for UserStore {
    fn default() -> Self {
        Self::memory()
    }
}

impl UserStore {
    pub fn memory() -> Self {
        Self::Memory {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn database(database_store: DatabaseUserStore) -> Self {
        Self::Database(database_store)
    }

    /// Register new user
    pub async fn register_user(&self, request: RegisterRequest) -> Result<UserData, AuthError> {
        let username = request.username.trim().to_string();
        debug!("Starting user registration for: {}", username);

        if username.is_empty() || request.password.is_empty() {
            debug!("Registration failed: missing credentials");
            return Err(AuthError::MissingCredentials);
        }

        if request.password.chars().count() < MIN_PASSWORD_LEN {
            debug!("Registration failed: password too short");
            return Err(AuthError::WeakPassword);
        }

        let user_data = UserData::new(username, &request.password)?;

        match self {
            Self::Memory { users } => {
                let mut users = users.write().await;
                if users.contains_key(&user_data.username) {
                    debug!(
                        "Registration failed: username '{}' already exists",
                        user_data.username
                    );
                    return Err(AuthError::UsernameTaken);
                }

                users.insert(user_data.username.clone(), user_data.clone());
                Ok(user_data)
            }
            Self::Database(db_store) => db_store.register_user(user_data).await,
        }
    }

    /// Authenticate user
    pub async fn authenticate_user(&self, request: LoginRequest) -> Result<UserData, AuthError> {
        let user = self
            .get_user_by_username(request.username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.verify_password(&request.password) {
            warn!("Invalid password for user: {}", request.username);
            return Err(AuthError::InvalidCredentials);
        }

        debug!("User authenticated: {}", user.username);
        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserData>, AuthError> {
        match self {
            Self::Memory { users } => Ok(users
                .read()
                .await
                .values()
                .find(|u| u.id == user_id)
                .cloned()),
            Self::Database(db_store) => db_store.get_user_by_id(user_id).await,
        }
    }

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserData>, AuthError> {
        match self {
            Self::Memory { users } => Ok(users.read().await.get(username).cloned()),
            Self::Database(db_store) => db_store.get_user_by_username(username).await,
        }
    }
}

/// User service for authentication operations
#[derive(Clone)]
pub struct UserService {
    store: UserStore,
    tokens: Arc<JwtAuthGateway>,
}

impl UserService {
    pub fn new(store: UserStore, tokens: Arc<JwtAuthGateway>) -> Self {
        Self { store, tokens }
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserData>, AuthError> {
        self.store.get_user_by_id(user_id).await
    }

    /// Register new user. No token is issued; the client logs in afterwards.
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let user_data = self.store.register_user(request).await?;
        info!("Registered new user: {}", user_data.username);

        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: user_data.to_user_info(),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user_data = self.store.authenticate_user(request).await?;
        let token = self.tokens.issue(&user_data.id, &user_data.username)?;

        Ok(LoginResponse {
            token,
            user: user_data.to_user_info(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> UserService {
        UserService::new(
            UserStore::memory(),
            Arc::new(JwtAuthGateway::new(b"users-test", 3600)),
        )
    }

    fn register(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let user = UserData::new("alice".to_string(), "secret123").unwrap();
        assert_ne!(user.password_hash, "secret123");
        assert!(user.verify_password("secret123"));
        assert!(!user.verify_password("secret124"));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let users = service();
        let registered = users.register(register("alice", "secret123")).await.unwrap();
        assert_eq!(registered.user.username, "alice");

        let logged_in = users.login(login("alice", "secret123")).await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
        assert_eq!(logged_in.token.token_type, "Bearer");
        assert!(!logged_in.token.token.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let users = service();
        users.register(register("alice", "secret123")).await.unwrap();

        assert!(matches!(
            users.register(register("alice", "another1")).await,
            Err(AuthError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let users = service();
        assert!(matches!(
            users.register(register("", "secret123")).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            users.register(register("bob", "12345")).await,
            Err(AuthError::WeakPassword)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_registrations_for_one_username() {
        let users = service();
        let (first, second) = tokio::join!(
            users.register(register("alice", "secret123")),
            users.register(register("alice", "secret456")),
        );

        let taken = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(AuthError::UsernameTaken)))
            .count();
        assert_eq!(taken, 1);
        assert!(first.is_ok() || second.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let users = service();
        users.register(register("alice", "secret123")).await.unwrap();

        assert!(matches!(
            users.login(login("alice", "nope-nope")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            users.login(login("mallory", "secret123")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
