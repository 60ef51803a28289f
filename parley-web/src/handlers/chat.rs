//! Chat handlers

use super::types::{ChatRecordView, ChatRequestBody, ChatResponse, ErrorResponse, HistoryQuery};
use crate::{auth::AuthenticatedUser, AppState};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, FromRequest, Multipart, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use parley_chat::{ChatError, UploadedFile};
use tracing::{debug, error, info, warn};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

/// A chat request as submitted by the client.
///
/// Accepts `multipart/form-data` with a `message` text field and an optional
/// `file` field, or a JSON body `{"message": ...}`. An attached file is staged
/// in the upload directory before the handler runs.
#[derive(Debug, Default)]
pub struct ChatSubmission {
    pub message: Option<String>,
    pub upload: Option<UploadedFile>,
}

/// Rejection for a chat body that could not be parsed or staged
#[derive(Debug)]
pub struct ChatRejection {
    status: StatusCode,
    error: String,
}

impl ChatRejection {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<MultipartError> for ChatRejection {
    fn from(e: MultipartError) -> Self {
        warn!(error = %e, "Malformed multipart body");
        Self {
            status: e.status(),
            error: e.body_text(),
        }
    }
}

impl IntoResponse for ChatRejection {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.error))).into_response()
    }
}

impl FromRequest<AppState> for ChatSubmission {
    type Rejection = ChatRejection;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ChatRejection {
                    status: e.status(),
                    error: e.body_text(),
                })?;
            return read_multipart(multipart, state).await;
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<ChatRequestBody>::from_request(req, state)
                .await
                .map_err(|e| ChatRejection {
                    status: e.status(),
                    error: e.body_text(),
                })?;
            return Ok(Self {
                message: body.message,
                upload: None,
            });
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ChatRejection {
                status: e.status(),
                error: e.body_text(),
            })?;

        if body.is_empty() {
            Ok(Self::default())
        } else {
            Err(ChatRejection::bad_request(
                "Expected a multipart/form-data or application/json body",
            ))
        }
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    state: &AppState,
) -> Result<ChatSubmission, ChatRejection> {
    let mut submission = ChatSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("message") => {
                submission.message = Some(field.text().await?);
            }
            Some("file") if submission.upload.is_none() => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let bytes = field.bytes().await?;

                // A form submitted with no file selected still sends an empty part
                if file_name.is_none() && bytes.is_empty() {
                    debug!("Skipping empty file part");
                    continue;
                }

                let upload = state
                    .uploads
                    .store(file_name.as_deref(), &bytes)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to stage uploaded file");
                        ChatRejection {
                            status: StatusCode::INTERNAL_SERVER_ERROR,
                            error: "Failed to read uploaded file".to_string(),
                        }
                    })?;
                submission.upload = Some(upload);
            }
            other => {
                debug!(field = ?other, "Ignoring multipart field");
            }
        }
    }

    Ok(submission)
}

/// Pipeline failure mapped to a 500 with a caller-safe message
#[derive(Debug)]
pub struct ChatFailure(pub ChatError);

impl IntoResponse for ChatFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(self.0.public_message())),
        )
            .into_response()
    }
}

/// Send a message, optionally with a text file, and get the model's reply
#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chat",
    request_body(
        content(
            (crate::handlers::types::ChatUploadForm = "multipart/form-data"),
            (ChatRequestBody = "application/json")
        )
    ),
    responses(
        (status = 200, description = "Model reply", body = ChatResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Token required", body = ErrorResponse),
        (status = 500, description = "Upload could not be read or no reply was generated", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    submission: ChatSubmission,
) -> Result<Json<ChatResponse>, ChatFailure> {
    let ChatSubmission { message, upload } = submission;

    match state.chat.handle_chat(message, upload).await {
        Ok(reply) => {
            info!(record_id = %reply.record_id, "Chat reply sent");
            Ok(Json(ChatResponse { reply: reply.reply }))
        }
        Err(e) => {
            error!(error = %e, "Chat request failed");
            Err(ChatFailure(e))
        }
    }
}

/// Most recent chat exchanges, newest first
#[utoipa::path(
    get,
    path = "/chat/history",
    tag = "Chat",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Stored exchanges", body = [ChatRecordView]),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Transcript store failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn chat_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatRecordView>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    debug!(user = %user.username, limit, "Listing chat history");

    let records = state.transcripts.recent(limit).await.map_err(|e| {
        error!(error = %e, "Failed to load chat history");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to load chat history")),
        )
    })?;

    Ok(Json(records.into_iter().map(ChatRecordView::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_failure_messages() {
        use parley_core::CompletionError;

        let response = ChatFailure(ChatError::Completion(CompletionError::Transport {
            message: "connection reset".to_string(),
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rejection_is_bad_request() {
        let rejection = ChatRejection::bad_request("nope");
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
