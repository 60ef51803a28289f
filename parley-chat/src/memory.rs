//! In-process transcript store, used when no database is configured

use async_trait::async_trait;
use chrono::Utc;
use parley_core::{ChatRecord, NewChatRecord, StoreError, TranscriptStore};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryTranscriptStore {
    records: RwLock<Vec<ChatRecord>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All records in insertion order
    pub async fn all(&self) -> Vec<ChatRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn insert(&self, record: NewChatRecord) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.write().await.push(ChatRecord {
            id: id.clone(),
            user_message: record.user_message,
            ai_response: record.ai_response,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
