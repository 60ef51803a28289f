//! Tests for the bearer token extractor

use super::*;
use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request},
};

/// Request parts carrying `headers`, plus an in-memory AppState
async fn create_test_parts_with_headers(
    headers: HeaderMap,
) -> (Parts, crate::AppState, tempfile::TempDir) {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/test")
        .body(Body::empty())
        .unwrap();

    *request.headers_mut() = headers;

    let uploads = tempfile::tempdir().unwrap();
    let mut config = crate::WebConfig::default();
    config.app.storage.database_url = String::new();
    config.app.storage.upload_dir = uploads.path().to_string_lossy().into_owned();
    config.app.auth.jwt_secret = Some("extractor-test".to_string());

    let (parts, _) = request.into_parts();
    let state = crate::AppState::new(config).await.unwrap();
    (parts, state, uploads)
}

fn headers_with_bearer_token(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let auth_value = format!("Bearer {}", token);
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth_value).unwrap());
    headers
}

#[test]
fn test_bearer_token_parsing() {
    let headers = headers_with_bearer_token("abc.def.ghi");
    assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");

    assert!(matches!(
        bearer_token(&HeaderMap::new()),
        Err(AuthError::MissingAuthHeader)
    ));

    let mut basic = HeaderMap::new();
    basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert!(matches!(bearer_token(&basic), Err(AuthError::InvalidToken)));

    let mut empty = HeaderMap::new();
    empty.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert!(matches!(bearer_token(&empty), Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_extractor_accepts_issued_token() {
    let (_, state, _uploads) = create_test_parts_with_headers(HeaderMap::new()).await;
    let registered = state
        .user_service
        .register(users::RegisterRequest {
            username: "alice".to_string(),
            password: "secret123".to_string(),
        })
        .await
        .unwrap();
    let login = state
        .user_service
        .login(users::LoginRequest {
            username: "alice".to_string(),
            password: "secret123".to_string(),
        })
        .await
        .unwrap();

    let mut request = Request::builder()
        .uri("/test")
        .body(Body::empty())
        .unwrap();
    *request.headers_mut() = headers_with_bearer_token(&login.token.token);
    let (mut parts, _) = request.into_parts();

    let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(user.id, registered.user.id);
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_extractor_rejects_missing_and_bad_tokens() {
    let (mut parts, state, _uploads) = create_test_parts_with_headers(HeaderMap::new()).await;
    assert!(matches!(
        AuthenticatedUser::from_request_parts(&mut parts, &state).await,
        Err(AuthError::MissingAuthHeader)
    ));

    let (mut parts, state, _uploads) =
        create_test_parts_with_headers(headers_with_bearer_token("not-a-jwt")).await;
    assert!(matches!(
        AuthenticatedUser::from_request_parts(&mut parts, &state).await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_extractor_prefers_extension_set_by_middleware() {
    let (mut parts, state, _uploads) = create_test_parts_with_headers(HeaderMap::new()).await;
    let user = AuthenticatedUser {
        id: "user-1".to_string(),
        username: "alice".to_string(),
    };
    parts.extensions.insert(user.clone());

    let extracted = AuthenticatedUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(extracted, user);
}
