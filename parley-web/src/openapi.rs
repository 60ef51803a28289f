//! OpenAPI document for the Parley API

use axum::response::Json;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::auth::{
    jwt::IssuedToken,
    users::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserInfo},
};
use crate::handlers::{
    ChatRecordView, ChatRequestBody, ChatResponse, ErrorResponse, HealthResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parley API",
        description = "Chat with a hosted language model, optionally about an uploaded text file"
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::chat,
        crate::handlers::chat_history,
        crate::auth::handlers::register_user,
        crate::auth::handlers::login_user,
        crate::auth::handlers::get_current_user,
    ),
    components(
        schemas(
            HealthResponse,
            ChatRequestBody,
            ChatResponse,
            ChatRecordView,
            ErrorResponse,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            IssuedToken,
            UserInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Chat", description = "Chat with the model"),
        (name = "Auth", description = "Registration and login")
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
