//! Realtime connection client for the Tradewire chat service.
//!
//! [`RealtimeClient`](connection::RealtimeClient) manages one
//! persistent WebSocket connection: token-authenticated handshake,
//! exponential-backoff reconnection on unexpected closure, and a typed
//! publish/subscribe event surface for UI layers. Incoming receipts
//! pass through a monotonicity guard so message status only ever moves
//! forward, and typing indicators auto-clear on a per-conversation
//! timer.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod protocol;
pub mod status;
pub mod typing;

pub use backoff::ReconnectPolicy;
pub use config::RealtimeConfig;
pub use connection::{ConnectionState, RealtimeClient};
pub use dispatcher::SubscriptionToken;
pub use error::RealtimeError;
pub use events::{EventKind, RealtimeEvent};
