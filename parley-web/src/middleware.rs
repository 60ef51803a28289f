//! Bearer token guard for protected routes

use crate::{
    auth::{authenticate, jwt::AuthError},
    AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Reject requests without a valid bearer token.
///
/// On success the caller's [`AuthenticatedUser`](crate::auth::AuthenticatedUser)
/// is stored in the request extensions, where the extractor picks it up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&state, request.headers()).await.map_err(|e| {
        warn!(path = %request.uri().path(), error = %e, "Unauthenticated request rejected");
        e
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
