//! Events surfaced to subscribers.
//!
//! [`RealtimeEvent`] covers both server frames (messages, receipts,
//! presence) and connection lifecycle changes the UI needs to react to
//! (reconnecting spinner, terminal reconnect failure).

use std::time::Duration;

use tradewire_core::chat::ChatMessage;
use tradewire_core::types::EntityId;

/// An event delivered to [`subscribe`](crate::connection::RealtimeClient::subscribe)d
/// handlers.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// The transport is up (fires again after each reconnect).
    Connected,
    /// The server accepted the handshake token.
    Authenticated { user_id: EntityId },
    /// The transport dropped (user-initiated teardown does not fire this).
    Disconnected { reason: String },
    /// An automatic reconnection attempt is scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnection gave up after the attempt ceiling; a fresh
    /// `connect()` is required.
    ReconnectFailed { attempts: u32 },

    NewMessage(ChatMessage),
    MessageSent {
        message_id: EntityId,
        conversation_id: EntityId,
        client_ref: Option<String>,
    },
    MessageDelivered {
        message_id: EntityId,
        conversation_id: EntityId,
    },
    MessagesRead {
        conversation_id: EntityId,
        message_ids: Vec<EntityId>,
        reader_id: EntityId,
    },
    UserTyping {
        conversation_id: EntityId,
        user_id: EntityId,
    },
    /// Explicit stop from the peer, or the 3-second typing timer firing.
    UserStopTyping {
        conversation_id: EntityId,
        user_id: EntityId,
    },
    UserOnline { user_id: EntityId },
    UserOffline { user_id: EntityId },
    /// Server-side error report for this session.
    ServerError { message: String },
}

/// Subscription key: which events a handler wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Authenticated,
    Disconnected,
    Reconnecting,
    ReconnectFailed,
    NewMessage,
    MessageSent,
    MessageDelivered,
    MessagesRead,
    UserTyping,
    UserStopTyping,
    UserOnline,
    UserOffline,
    ServerError,
}

impl EventKind {
    /// Every subscription key, for callers that want a firehose.
    pub const ALL: [EventKind; 14] = [
        EventKind::Connected,
        EventKind::Authenticated,
        EventKind::Disconnected,
        EventKind::Reconnecting,
        EventKind::ReconnectFailed,
        EventKind::NewMessage,
        EventKind::MessageSent,
        EventKind::MessageDelivered,
        EventKind::MessagesRead,
        EventKind::UserTyping,
        EventKind::UserStopTyping,
        EventKind::UserOnline,
        EventKind::UserOffline,
        EventKind::ServerError,
    ];
}

impl RealtimeEvent {
    /// The subscription key this event is dispatched under.
    pub fn kind(&self) -> EventKind {
        match self {
            RealtimeEvent::Connected => EventKind::Connected,
            RealtimeEvent::Authenticated { .. } => EventKind::Authenticated,
            RealtimeEvent::Disconnected { .. } => EventKind::Disconnected,
            RealtimeEvent::Reconnecting { .. } => EventKind::Reconnecting,
            RealtimeEvent::ReconnectFailed { .. } => EventKind::ReconnectFailed,
            RealtimeEvent::NewMessage(_) => EventKind::NewMessage,
            RealtimeEvent::MessageSent { .. } => EventKind::MessageSent,
            RealtimeEvent::MessageDelivered { .. } => EventKind::MessageDelivered,
            RealtimeEvent::MessagesRead { .. } => EventKind::MessagesRead,
            RealtimeEvent::UserTyping { .. } => EventKind::UserTyping,
            RealtimeEvent::UserStopTyping { .. } => EventKind::UserStopTyping,
            RealtimeEvent::UserOnline { .. } => EventKind::UserOnline,
            RealtimeEvent::UserOffline { .. } => EventKind::UserOffline,
            RealtimeEvent::ServerError { .. } => EventKind::ServerError,
        }
    }
}
