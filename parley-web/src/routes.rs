//! Route definitions for the Parley web server

use crate::{auth, handlers, middleware::require_auth, openapi, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

/// Create API routes. `create_app` mounts them at the root and under `/api`.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let mut chat = Router::new().route("/chat", post(handlers::chat));
    if state.config.app.auth.require_auth_for_chat {
        chat = chat.route_layer(from_fn_with_state(state.clone(), require_auth));
    }

    Router::new()
        .merge(chat)
        .route("/chat/history", get(handlers::chat_history))
        // Authentication
        .route("/auth/register", post(auth::handlers::register_user))
        .route("/auth/login", post(auth::handlers::login_user))
        .route("/auth/me", get(auth::handlers::get_current_user))
        // Service information
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
}
