//! Authentication handlers for registration, login and identity

use super::{
    jwt::AuthError,
    users::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserInfo},
    AuthenticatedUser,
};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Json as JsonExtractor};
use tracing::info;

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Missing username or password too short"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register_user(
    State(app_state): State<AppState>,
    JsonExtractor(request): JsonExtractor<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    info!("User registration attempt: {}", request.username);

    let response = app_state.user_service.register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login_user(
    State(app_state): State<AppState>,
    JsonExtractor(request): JsonExtractor<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    info!("User login attempt: {}", request.username);

    let response = app_state.user_service.login(request).await?;

    info!("User logged in successfully: {}", response.user.username);
    Ok(Json(response))
}

/// Current user information
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Authenticated user", body = UserInfo),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserInfo>, AuthError> {
    let user_data = app_state
        .user_service
        .get_user_by_id(&user.id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(Json(user_data.to_user_info()))
}
