//! Chat-related types

use parley_core::ChatRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON form of a chat submission, for clients that send no file
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatRequestBody {
    #[schema(example = "Hello")]
    pub message: Option<String>,
}

/// Multipart form of a chat submission
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ChatUploadForm {
    /// Text typed by the user
    pub message: Option<String>,
    /// Optional text file appended to the prompt
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
}

/// Successful chat reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    #[schema(example = "Hi there")]
    pub reply: String,
}

/// Query parameters for the transcript listing
#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Number of records, newest first (1 to 100, default 20)
    pub limit: Option<usize>,
}

/// One stored exchange as returned by the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRecordView {
    pub id: String,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ChatRecord> for ChatRecordView {
    fn from(record: ChatRecord) -> Self {
        Self {
            id: record.id,
            user_message: record.user_message,
            ai_response: record.ai_response,
            created_at: record.created_at,
        }
    }
}
