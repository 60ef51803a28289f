//! Parley Chat - the chat request pipeline
//!
//! Built on the seams in `parley-core`:
//!
//! - Upload staging with guaranteed cleanup
//! - Rate-limit aware completion retries
//! - Transcript persistence after a successful reply

pub mod chat;
pub mod memory;
pub mod upload;

pub use chat::{
    attempt_completion, build_prompt, ChatError, ChatReply, ChatService, FILE_CONTENT_SEPARATOR,
};
pub use memory::InMemoryTranscriptStore;
pub use upload::{UploadDir, UploadError, UploadedFile};
