//! Chat conversations and messages.
//!
//! [`MessageStatus`] is totally ordered (`Sent < Delivered < Read`) and
//! only ever advances forward; [`MessageStatus::advance`] is the single
//! place that rule is enforced.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

/// Payload kind of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
}

/// Delivery state of a message.
///
/// Variant order matters: the derived `Ord` gives
/// `Sent < Delivered < Read`, which is the only legal direction of
/// travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Move to `next` if it is strictly further along than `self`.
    ///
    /// Returns `true` when the transition was applied, `false` when
    /// `next` would move the status backward (or is a no-op repeat).
    pub fn advance(&mut self, next: MessageStatus) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// A single chat message.
///
/// Message ids are unique within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: EntityId,
    pub conversation_id: EntityId,
    pub sender_id: EntityId,
    pub receiver_id: EntityId,
    pub content: String,
    pub kind: MessageKind,
    pub status: MessageStatus,
    pub created_at: Timestamp,
}

/// A conversation between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: EntityId,
    pub participant_ids: Vec<EntityId>,
    /// Most recent message, if the conversation has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<ChatMessage>,
    /// Messages not yet read by the requesting user.
    #[serde(default)]
    pub unread_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_forward() {
        let mut status = MessageStatus::Sent;

        assert!(status.advance(MessageStatus::Delivered));
        assert_eq!(status, MessageStatus::Delivered);

        assert!(status.advance(MessageStatus::Read));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn status_never_moves_backward() {
        let mut status = MessageStatus::Read;

        assert!(!status.advance(MessageStatus::Delivered));
        assert!(!status.advance(MessageStatus::Sent));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn repeated_status_is_rejected() {
        let mut status = MessageStatus::Delivered;

        assert!(!status.advance(MessageStatus::Delivered));
        assert_eq!(status, MessageStatus::Delivered);
    }

    #[test]
    fn status_can_skip_delivered() {
        // A read receipt may arrive before the delivery receipt; the
        // jump straight to Read is still a forward move.
        let mut status = MessageStatus::Sent;

        assert!(status.advance(MessageStatus::Read));
        assert_eq!(status, MessageStatus::Read);
    }

    #[test]
    fn status_uses_lowercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::Delivered).unwrap(),
            r#""delivered""#
        );
        let parsed: MessageStatus = serde_json::from_str(r#""read""#).unwrap();
        assert_eq!(parsed, MessageStatus::Read);
    }
}
