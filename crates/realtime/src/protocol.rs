//! Wire protocol: JSON text frames in both directions with the shape
//! `{"type": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use tradewire_core::chat::{ChatMessage, MessageKind};
use tradewire_core::types::EntityId;

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    SendMessage {
        receiver_id: EntityId,
        content: String,
        kind: MessageKind,
        /// Client-generated correlation id echoed back in `message_sent`.
        client_ref: String,
    },
    MarkAsRead {
        conversation_id: EntityId,
        message_ids: Vec<EntityId>,
    },
    JoinConversation {
        conversation_id: EntityId,
    },
    LeaveConversation {
        conversation_id: EntityId,
    },
    TypingStart {
        conversation_id: EntityId,
        receiver_id: EntityId,
    },
    TypingStop {
        conversation_id: EntityId,
        receiver_id: EntityId,
    },
}

/// Frames sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake token accepted; the session is live.
    Authenticated { user_id: EntityId },

    /// A message addressed to this user arrived.
    NewMessage(ChatMessage),

    /// The server accepted a message this client sent.
    MessageSent {
        message_id: EntityId,
        conversation_id: EntityId,
        /// The `client_ref` from the originating `send_message` frame.
        #[serde(default)]
        client_ref: Option<String>,
    },

    /// A sent message reached its recipient.
    MessageDelivered {
        message_id: EntityId,
        conversation_id: EntityId,
    },

    /// The peer read the referenced messages.
    MessagesRead {
        conversation_id: EntityId,
        message_ids: Vec<EntityId>,
        reader_id: EntityId,
    },

    UserTyping {
        conversation_id: EntityId,
        user_id: EntityId,
    },

    UserStopTyping {
        conversation_id: EntityId,
        user_id: EntityId,
    },

    UserOnline { user_id: EntityId },

    UserOffline { user_id: EntityId },

    /// Server-side error report for this session.
    Error { message: String },
}

/// Parse a server text frame into a typed enum.
///
/// Returns `Err` for malformed JSON or unknown `type` values. Callers
/// should log unknown types and continue.
pub fn parse_frame(text: &str) -> Result<ServerFrame, serde_json::Error> {
    serde_json::from_str(text)
}
