//! Error taxonomy for the REST client.
//!
//! Transport and HTTP failures are translated once, here, into a
//! human-readable message; nothing above this boundary re-wraps them.
//! The enum is `Clone` because a single refresh failure is fanned out
//! to every request waiting on that refresh.

/// Errors surfaced by [`ApiClient`](crate::client::ApiClient).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, TLS,
    /// timeout). Never retried automatically.
    #[error("Network error: {0}")]
    Network(String),

    /// Authorization failed and could not be recovered by a token
    /// refresh (second 401/403 on the same logical request, or an auth
    /// endpoint rejecting credentials).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token refresh itself failed. The stored session has been
    /// cleared; the caller must route the user back to login.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// The server answered with a non-auth error status. The message is
    /// the server-provided one when present.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-provided `message`/`error` body field, or a generic
        /// fallback.
        message: String,
    },

    /// The response body could not be decoded into the expected type.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Convenience alias for client call results.
pub type ApiResult<T> = Result<T, ApiError>;
