//! JWT issuing and validation

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use parley_core::{AuthConfig, AuthGateway, AuthStatus, MAX_TOKEN_TTL_SECS};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// JWT signing and verification keys
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl Claims {
    /// Lifetimes above `MAX_TOKEN_TTL_SECS` are capped
    pub fn new(user_id: String, username: String, ttl_secs: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64);

        Self {
            sub: user_id,
            username,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

/// Bearer token returned by a successful login
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IssuedToken {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    #[schema(example = 3600)]
    pub expires_in: u64,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Password too short")]
    WeakPassword,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Token creation failed")]
    TokenCreation,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Password hashing failed")]
    PasswordHash,
    #[error("User storage failure: {0}")]
    Storage(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid username or password",
            ),
            AuthError::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                "missing_credentials",
                "Username and password are required",
            ),
            AuthError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "weak_password",
                "Password must be at least 6 characters",
            ),
            AuthError::UsernameTaken => (
                StatusCode::CONFLICT,
                "username_taken",
                "Username already exists",
            ),
            AuthError::TokenCreation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_creation_failed",
                "Failed to create authentication token",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid or malformed token",
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Token has expired",
            ),
            AuthError::MissingAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "missing_auth_header",
                "Authorization header is required",
            ),
            AuthError::PasswordHash => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "password_hash_failed",
                "Failed to process password",
            ),
            AuthError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to access user storage",
            ),
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Issues and validates HS256 bearer tokens
pub struct JwtAuthGateway {
    keys: Keys,
    ttl_secs: u64,
}

impl JwtAuthGateway {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        if ttl_secs > MAX_TOKEN_TTL_SECS {
            warn!(
                "Token lifetime {}s exceeds the maximum, using {}s",
                ttl_secs, MAX_TOKEN_TTL_SECS
            );
        }

        Self {
            keys: Keys::new(secret),
            ttl_secs: ttl_secs.min(MAX_TOKEN_TTL_SECS),
        }
    }

    /// Use the configured secret, or a random one when none is set
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret.as_bytes(), config.token_ttl_secs),
            None => {
                warn!("JWT_SECRET is not set; using a random secret, tokens will not survive a restart");
                let mut secret = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                Self::new(&secret, config.token_ttl_secs)
            }
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: &str, username: &str) -> Result<IssuedToken, AuthError> {
        let claims = Claims::new(user_id.to_string(), username.to_string(), self.ttl_secs);
        let token = encode(&Header::default(), &claims, &self.keys.encoding).map_err(|e| {
            warn!("Failed to encode JWT token: {}", e);
            AuthError::TokenCreation
        })?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl_secs,
        })
    }

    /// Verify and decode token
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    debug!("Token verification failed: {}", e);
                    AuthError::InvalidToken
                }
            })
    }
}

#[async_trait]
impl AuthGateway for JwtAuthGateway {
    async fn validate(&self, token: Option<&str>) -> AuthStatus {
        match token.map(|t| self.verify(t)) {
            Some(Ok(claims)) => AuthStatus::authenticated(claims.sub, claims.username),
            Some(Err(e)) => {
                debug!(error = %e, "Rejected bearer token");
                AuthStatus::anonymous()
            }
            None => AuthStatus::anonymous(),
        }
    }
}
