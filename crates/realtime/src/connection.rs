//! The realtime connection client.
//!
//! [`RealtimeClient`] owns at most one live WebSocket session at a
//! time. `connect` is single-flight (concurrent calls share one
//! outcome), unexpected closures enter the backoff-driven reconnect
//! loop, and `disconnect` tears everything down deterministically:
//! once it returns, no further events are dispatched and no reconnect
//! attempt is made.
//!
//! State and session bookkeeping use synchronous locks that are never
//! held across an `.await`, so check-then-act sequences cannot
//! interleave with each other.

use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use tradewire_core::chat::{MessageKind, MessageStatus};
use tradewire_core::types::EntityId;

use crate::config::RealtimeConfig;
use crate::dispatcher::{EventDispatcher, SubscriptionToken};
use crate::error::RealtimeError;
use crate::events::{EventKind, RealtimeEvent};
use crate::protocol::{parse_frame, ClientFrame, ServerFrame};
use crate::status::StatusLedger;
use crate::typing::TypingTracker;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFlight = Shared<BoxFuture<'static, Result<(), RealtimeError>>>;

/// Lifecycle of the realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
    Reconnecting,
}

/// How a session's select loop ended.
enum SessionEnd {
    /// `disconnect()` was called (or the client was dropped).
    Cancelled,
    /// The transport closed unexpectedly.
    Closed(String),
}

/// Control handles for the live session.
struct SessionControl {
    /// Distinguishes this session from any successor, so a winding-down
    /// task never tears down a session it does not own.
    generation: u64,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<ClientFrame>,
}

/// Realtime client handle. Clone freely; all clones share the single
/// underlying connection.
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<ClientShared>,
}

struct ClientShared {
    config: RealtimeConfig,
    dispatcher: EventDispatcher,
    status: StatusLedger,
    state: Mutex<ConnectionState>,
    session: Mutex<Option<SessionControl>>,
    next_generation: std::sync::atomic::AtomicU64,
    connect_flight: tokio::sync::Mutex<Option<ConnectFlight>>,
}

impl Default for RealtimeClient {
    fn default() -> Self {
        Self::new(RealtimeConfig::default())
    }
}

impl RealtimeClient {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            shared: Arc::new(ClientShared {
                config,
                dispatcher: EventDispatcher::new(),
                status: StatusLedger::new(),
                state: Mutex::new(ConnectionState::Disconnected),
                session: Mutex::new(None),
                next_generation: std::sync::atomic::AtomicU64::new(0),
                connect_flight: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().expect("state lock poisoned")
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Open the transport and hand the session to a background task.
    ///
    /// The bearer token is presented as a query parameter during the
    /// handshake; the server confirms it with an `authenticated` frame.
    /// Resolves once the transport is up; rejects on handshake failure.
    /// Initial failures are not retried; reconnection backoff only
    /// applies to unexpected closures of an established session.
    ///
    /// Concurrent calls while a connect is in flight join that flight
    /// and resolve with its outcome; no second transport is opened.
    /// Calling while already connected is a no-op success.
    pub async fn connect(&self, token: &str, server_url: &str) -> Result<(), RealtimeError> {
        let flight = {
            let mut slot = self.shared.connect_flight.lock().await;
            match slot.as_ref() {
                Some(flight) => flight.clone(),
                None => {
                    let shared = Arc::clone(&self.shared);
                    let token = token.to_string();
                    let url = server_url.to_string();
                    let flight = async move { ClientShared::establish(shared, token, url).await }
                        .boxed()
                        .shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let result = flight.clone().await;

        // Close the flight so a later connect starts fresh, unless a
        // newer flight already replaced it.
        let mut slot = self.shared.connect_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }

        result
    }

    /// Tear the connection down.
    ///
    /// Safe to call in any state. After this returns the state is
    /// `Disconnected`, sends are refused, pending reconnect attempts
    /// are abandoned, and no further events reach subscribers.
    pub fn disconnect(&self) {
        let control = self
            .shared
            .session
            .lock()
            .expect("session lock poisoned")
            .take();

        if let Some(control) = control {
            control.cancel.cancel();
            tracing::info!("Realtime connection closed by caller");
        }

        *self.shared.state.lock().expect("state lock poisoned") = ConnectionState::Disconnected;
    }

    // -----------------------------------------------------------------
    // Outbound operations
    // -----------------------------------------------------------------

    /// Fire-and-forget message send. Returns `false` when not
    /// connected, so callers can fall back to an error path without a
    /// failed future.
    pub fn send_message(&self, receiver_id: &str, content: &str, kind: MessageKind) -> bool {
        self.send_frame(ClientFrame::SendMessage {
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            kind,
            client_ref: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Subscribe to delivery for a conversation. Join before expecting
    /// `new_message` events for it.
    pub fn join_conversation(&self, conversation_id: &str) -> bool {
        self.send_frame(ClientFrame::JoinConversation {
            conversation_id: conversation_id.to_string(),
        })
    }

    pub fn leave_conversation(&self, conversation_id: &str) -> bool {
        self.send_frame(ClientFrame::LeaveConversation {
            conversation_id: conversation_id.to_string(),
        })
    }

    /// Best-effort presence signal; no acknowledgment expected.
    pub fn start_typing(&self, conversation_id: &str, receiver_id: &str) -> bool {
        self.send_frame(ClientFrame::TypingStart {
            conversation_id: conversation_id.to_string(),
            receiver_id: receiver_id.to_string(),
        })
    }

    pub fn stop_typing(&self, conversation_id: &str, receiver_id: &str) -> bool {
        self.send_frame(ClientFrame::TypingStop {
            conversation_id: conversation_id.to_string(),
            receiver_id: receiver_id.to_string(),
        })
    }

    /// Report read-state; the referenced messages transition to `read`
    /// when the server echoes the receipt.
    pub fn mark_as_read(&self, conversation_id: &str, message_ids: Vec<EntityId>) -> bool {
        self.send_frame(ClientFrame::MarkAsRead {
            conversation_id: conversation_id.to_string(),
            message_ids,
        })
    }

    fn send_frame(&self, frame: ClientFrame) -> bool {
        if !matches!(
            self.state(),
            ConnectionState::Connected | ConnectionState::Authenticated
        ) {
            return false;
        }

        let slot = self.shared.session.lock().expect("session lock poisoned");
        match slot.as_ref() {
            Some(control) => control.outbound.send(frame).is_ok(),
            None => false,
        }
    }

    // -----------------------------------------------------------------
    // Event subscription
    // -----------------------------------------------------------------

    /// Register a handler for one event kind; handlers fire in
    /// registration order.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.subscribe(kind, handler)
    }

    /// Remove one handler.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.shared.dispatcher.unsubscribe(token)
    }

    /// Remove every handler for the given kind.
    pub fn clear_subscriptions(&self, kind: EventKind) {
        self.shared.dispatcher.clear(kind)
    }
}

impl ClientShared {
    /// The connect flight body: claim the `Connecting` state, open the
    /// transport, and spawn the session task.
    async fn establish(
        shared: Arc<ClientShared>,
        token: String,
        url: String,
    ) -> Result<(), RealtimeError> {
        {
            let mut state = shared.state.lock().expect("state lock poisoned");
            if *state != ConnectionState::Disconnected {
                // Already live; nothing to do.
                return Ok(());
            }
            *state = ConnectionState::Connecting;
        }

        match open_transport(&shared.config, &token, &url).await {
            Ok(ws) => {
                ClientShared::start_session(&shared, ws, token, url);
                Ok(())
            }
            Err(e) => {
                *shared.state.lock().expect("state lock poisoned") =
                    ConnectionState::Disconnected;
                tracing::warn!(error = %e, url = %url, "Realtime connect failed");
                Err(e)
            }
        }
    }

    /// Install session control handles and spawn the supervisor task.
    fn start_session(shared: &Arc<Self>, ws: WsStream, token: String, url: String) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let generation = shared
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        *shared.session.lock().expect("session lock poisoned") = Some(SessionControl {
            generation,
            cancel: cancel.clone(),
            outbound: out_tx,
        });
        *shared.state.lock().expect("state lock poisoned") = ConnectionState::Connected;

        tracing::info!(url = %url, "Realtime connection established");
        shared.dispatcher.emit(&RealtimeEvent::Connected);

        let task_shared = Arc::clone(shared);
        tokio::spawn(async move {
            task_shared
                .run(ws, out_rx, token, url, cancel, generation)
                .await;
        });
    }

    /// Supervisor: drive the session, reconnect on unexpected closure,
    /// stop on cancellation or backoff exhaustion.
    async fn run(
        self: Arc<Self>,
        mut ws: WsStream,
        mut out_rx: mpsc::UnboundedReceiver<ClientFrame>,
        token: String,
        url: String,
        cancel: CancellationToken,
        generation: u64,
    ) {
        loop {
            match self.run_session(ws, &mut out_rx, &cancel).await {
                SessionEnd::Cancelled => {
                    self.teardown(generation);
                    return;
                }
                SessionEnd::Closed(reason) => {
                    tracing::warn!(reason = %reason, "Realtime connection lost");
                    self.dispatcher
                        .emit(&RealtimeEvent::Disconnected { reason });

                    if cancel.is_cancelled() {
                        self.teardown(generation);
                        return;
                    }

                    *self.state.lock().expect("state lock poisoned") =
                        ConnectionState::Reconnecting;

                    match self.reconnect(&token, &url, &cancel).await {
                        Some(new_ws) => {
                            *self.state.lock().expect("state lock poisoned") =
                                ConnectionState::Connected;
                            self.dispatcher.emit(&RealtimeEvent::Connected);
                            ws = new_ws;
                        }
                        None => {
                            if !cancel.is_cancelled() {
                                self.dispatcher.emit(&RealtimeEvent::ReconnectFailed {
                                    attempts: self.config.reconnect.max_attempts,
                                });
                            }
                            self.teardown(generation);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One session: pump outbound frames, inbound frames, and typing
    /// expirations until the transport closes or the token fires.
    async fn run_session(
        &self,
        ws: WsStream,
        out_rx: &mut mpsc::UnboundedReceiver<ClientFrame>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let (typing, mut expirations) = TypingTracker::new(self.config.typing_timeout);

        loop {
            tokio::select! {
                // Cancellation wins over queued work so nothing fires
                // after `disconnect()`.
                biased;

                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Cancelled;
                }

                Some(expiry) = expirations.recv() => {
                    if typing.expire(&expiry) {
                        self.dispatcher.emit(&RealtimeEvent::UserStopTyping {
                            conversation_id: expiry.conversation_id,
                            user_id: expiry.user_id,
                        });
                    }
                }

                frame = out_rx.recv() => match frame {
                    Some(frame) => {
                        let json = serde_json::to_string(&frame)
                            .expect("client frames are always serialisable");
                        if let Err(e) = sink.send(Message::Text(json)).await {
                            return SessionEnd::Closed(format!("send failed: {e}"));
                        }
                    }
                    // All senders gone: the client itself was dropped.
                    None => return SessionEnd::Cancelled,
                },

                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text, &typing),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return SessionEnd::Closed(match frame {
                            Some(frame) => format!("server closed: {}", frame.reason),
                            None => "server closed".to_string(),
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Closed(e.to_string()),
                    None => return SessionEnd::Closed("stream exhausted".to_string()),
                },
            }
        }
    }

    fn handle_text(&self, text: &str, typing: &TypingTracker) {
        match parse_frame(text) {
            Ok(frame) => self.handle_server_frame(frame, typing),
            Err(e) => {
                tracing::warn!(error = %e, raw = %text, "Unknown or malformed server frame");
            }
        }
    }

    fn handle_server_frame(&self, frame: ServerFrame, typing: &TypingTracker) {
        match frame {
            ServerFrame::Authenticated { user_id } => {
                *self.state.lock().expect("state lock poisoned") = ConnectionState::Authenticated;
                tracing::info!(user_id = %user_id, "Realtime session authenticated");
                self.dispatcher
                    .emit(&RealtimeEvent::Authenticated { user_id });
            }

            ServerFrame::NewMessage(message) => {
                // Seed the ledger so later receipts are ordered against
                // the status the message arrived with.
                self.status.observe(&message.id, message.status);
                self.dispatcher.emit(&RealtimeEvent::NewMessage(message));
            }

            ServerFrame::MessageSent {
                message_id,
                conversation_id,
                client_ref,
            } => {
                if self.status.observe(&message_id, MessageStatus::Sent) {
                    self.dispatcher.emit(&RealtimeEvent::MessageSent {
                        message_id,
                        conversation_id,
                        client_ref,
                    });
                }
            }

            ServerFrame::MessageDelivered {
                message_id,
                conversation_id,
            } => {
                if self.status.observe(&message_id, MessageStatus::Delivered) {
                    self.dispatcher.emit(&RealtimeEvent::MessageDelivered {
                        message_id,
                        conversation_id,
                    });
                } else {
                    tracing::debug!(message_id = %message_id, "Suppressed backward delivery receipt");
                }
            }

            ServerFrame::MessagesRead {
                conversation_id,
                mut message_ids,
                reader_id,
            } => {
                message_ids.retain(|id| self.status.observe(id, MessageStatus::Read));
                if !message_ids.is_empty() {
                    self.dispatcher.emit(&RealtimeEvent::MessagesRead {
                        conversation_id,
                        message_ids,
                        reader_id,
                    });
                }
            }

            ServerFrame::UserTyping {
                conversation_id,
                user_id,
            } => {
                typing.touch(&conversation_id, &user_id);
                self.dispatcher.emit(&RealtimeEvent::UserTyping {
                    conversation_id,
                    user_id,
                });
            }

            ServerFrame::UserStopTyping {
                conversation_id,
                user_id,
            } => {
                typing.clear(&conversation_id, &user_id);
                self.dispatcher.emit(&RealtimeEvent::UserStopTyping {
                    conversation_id,
                    user_id,
                });
            }

            ServerFrame::UserOnline { user_id } => {
                self.dispatcher.emit(&RealtimeEvent::UserOnline { user_id });
            }

            ServerFrame::UserOffline { user_id } => {
                self.dispatcher
                    .emit(&RealtimeEvent::UserOffline { user_id });
            }

            ServerFrame::Error { message } => {
                tracing::error!(message = %message, "Server reported realtime error");
                self.dispatcher.emit(&RealtimeEvent::ServerError { message });
            }
        }
    }

    /// Retry the transport with exponential backoff until it opens,
    /// the token fires, or the attempt ceiling is exceeded.
    async fn reconnect(
        &self,
        token: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Option<WsStream> {
        let policy = &self.config.reconnect;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let Some(delay) = policy.delay_for(attempt) else {
                tracing::warn!(
                    attempts = attempt - 1,
                    "Reconnect attempts exhausted, giving up",
                );
                return None;
            };

            self.dispatcher
                .emit(&RealtimeEvent::Reconnecting { attempt, delay });
            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to realtime server",
            );

            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => return None,
                result = open_transport(&self.config, token, url) => match result {
                    Ok(ws) => {
                        tracing::info!(attempt, "Reconnected to realtime server");
                        return Some(ws);
                    }
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                    }
                }
            }
        }
    }

    /// Drop this session's control handles, unless a newer session has
    /// already replaced them.
    fn teardown(&self, generation: u64) {
        let owned = {
            let mut slot = self.session.lock().expect("session lock poisoned");
            if slot
                .as_ref()
                .is_some_and(|control| control.generation == generation)
            {
                *slot = None;
                true
            } else {
                false
            }
        };

        if owned {
            *self.state.lock().expect("state lock poisoned") = ConnectionState::Disconnected;
        }
    }
}

/// Open the WebSocket transport, presenting the token as a query
/// parameter, bounded by the handshake timeout.
async fn open_transport(
    config: &RealtimeConfig,
    token: &str,
    url: &str,
) -> Result<WsStream, RealtimeError> {
    let separator = if url.contains('?') { '&' } else { '?' };
    let request_url = format!("{url}{separator}token={token}");

    match tokio::time::timeout(config.handshake_timeout, connect_async(&request_url)).await {
        Err(_) => Err(RealtimeError::HandshakeTimeout(config.handshake_timeout)),
        Ok(Err(e)) => Err(RealtimeError::Handshake(e.to_string())),
        Ok(Ok((ws, _response))) => Ok(ws),
    }
}
