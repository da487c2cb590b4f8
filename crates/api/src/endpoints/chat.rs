//! `/chat` endpoints: conversation listing and message history.
//!
//! Live delivery happens over the realtime connection; these endpoints
//! only back-fill history and the conversation list.

use tradewire_core::chat::{ChatMessage, Conversation};
use tradewire_core::types::EntityId;

use crate::client::ApiClient;
use crate::error::ApiResult;

impl ApiClient {
    /// All conversations the authenticated user participates in.
    pub async fn conversations(&self) -> ApiResult<Vec<Conversation>> {
        self.get("/chat/conversations").await
    }

    /// Message history of one conversation, oldest first.
    pub async fn conversation_messages(&self, id: &EntityId) -> ApiResult<Vec<ChatMessage>> {
        self.get(&format!("/chat/conversations/{id}/messages")).await
    }
}
