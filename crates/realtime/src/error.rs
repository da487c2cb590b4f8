use std::time::Duration;

/// Errors surfaced by [`RealtimeClient`](crate::connection::RealtimeClient).
///
/// `Clone` because concurrent `connect` callers share one outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RealtimeError {
    /// The WebSocket handshake failed (refused, TLS, bad upgrade).
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The handshake did not complete within the configured timeout.
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}
