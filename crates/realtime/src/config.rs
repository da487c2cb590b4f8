use std::time::Duration;

use crate::backoff::ReconnectPolicy;

/// Realtime client configuration.
///
/// The server URL is an argument to
/// [`connect`](crate::connection::RealtimeClient::connect), not part of
/// the configuration, so one client value can reconnect to whichever
/// endpoint the caller resolves at runtime.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Upper bound on the WebSocket handshake.
    pub handshake_timeout: Duration,
    /// Inactivity window after which a typing indicator auto-clears.
    pub typing_timeout: Duration,
    /// Backoff policy for automatic reconnection.
    pub reconnect: ReconnectPolicy,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(20),
            typing_timeout: Duration::from_secs(3),
            reconnect: ReconnectPolicy::default(),
        }
    }
}
