//! The authenticated HTTP client.
//!
//! Every endpoint wrapper funnels through [`ApiClient::request`]: the
//! bearer token is attached, the response envelope is decoded, and an
//! authorization failure is recovered exactly once per request via the
//! shared single-flight refresh (see [`crate::refresh`]).

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::refresh::RefreshCoordinator;
use crate::session::{FileSessionStore, SessionHandle, SessionStore};
use tradewire_core::session::AuthTokens;

/// REST client for the Tradewire platform.
///
/// Cheap to clone via internal `Arc`s in the session handle and
/// `reqwest::Client`; share one value per process so that all requests
/// coordinate on the same refresh flight.
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    session: SessionHandle,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Build a client over an explicit session store.
    pub fn new(config: ApiConfig, store: Box<dyn SessionStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            http,
            config,
            session: SessionHandle::new(store),
            refresh: RefreshCoordinator::new(),
        }
    }

    /// Build a client from environment configuration with the default
    /// file-backed session store.
    pub fn from_env() -> Self {
        let store = FileSessionStore::new(FileSessionStore::default_path());
        Self::new(ApiConfig::from_env(), Box::new(store))
    }

    /// Handle to the live session (shared with the caller's UI layer).
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    // -----------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Issue a request, recovering from an expired access token at most
    /// once.
    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let payload: Option<Value> = match body {
            Some(body) => {
                Some(serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?)
            }
            None => None,
        };

        let token = self.session.access_token();
        let (status, bytes) = self
            .send_once(&method, path, payload.as_ref(), token.as_deref())
            .await?;

        if status.is_success() {
            return decode_payload(&bytes);
        }

        if is_auth_failure(status) && !is_auth_endpoint(path) {
            tracing::debug!(path, status = status.as_u16(), "Access token rejected, refreshing");

            let tokens = self.refresh_session().await?;
            let (retry_status, retry_bytes) = self
                .send_once(&method, path, payload.as_ref(), Some(&tokens.access_token))
                .await?;

            if retry_status.is_success() {
                return decode_payload(&retry_bytes);
            }
            if is_auth_failure(retry_status) {
                // Second rejection on the same logical request: terminal,
                // never a second refresh.
                return Err(ApiError::Unauthorized(error_message(&retry_bytes)));
            }
            return Err(decode_error(retry_status, &retry_bytes));
        }

        Err(decode_error(status, &bytes))
    }

    /// One wire round-trip. Transport failures (no response) map to
    /// [`ApiError::Network`].
    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        payload: Option<&Value>,
        token: Option<&str>,
    ) -> ApiResult<(StatusCode, Vec<u8>)> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder = self.http.request(method.clone(), &url);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(payload) = payload {
            builder = builder.json(payload);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok((status, bytes.to_vec()))
    }

    /// Refresh the token pair, shared across concurrent failures.
    ///
    /// Success persists the new pair atomically before any waiter is
    /// released; failure clears the session and is terminal.
    pub(crate) async fn refresh_session(&self) -> ApiResult<AuthTokens> {
        self.refresh
            .run(|| async {
                let refresh_token = self.session.refresh_token().ok_or_else(|| {
                    ApiError::SessionExpired("no stored session to refresh".into())
                })?;

                let body = serde_json::json!({ "refresh_token": refresh_token });
                let (status, bytes) = self
                    .send_once(&Method::POST, "/auth/new-token", Some(&body), None)
                    .await?;

                if !status.is_success() {
                    tracing::warn!(status = status.as_u16(), "Token refresh rejected, clearing session");
                    self.session.clear();
                    return Err(ApiError::SessionExpired(error_message(&bytes)));
                }

                let tokens: AuthTokens = decode_payload(&bytes)?;
                self.session.replace_tokens(tokens.clone());
                tracing::debug!("Token pair refreshed");
                Ok(tokens)
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Statuses treated as an authorization failure.
fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// The auth endpoints never trigger a refresh, or a rejected login
/// would recurse into refresh attempts.
fn is_auth_endpoint(path: &str) -> bool {
    path.starts_with("/auth/")
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    metadata: T,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Decode a success body, accepting either the `{"metadata": ...}`
/// envelope or the plain payload.
pub(crate) fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    if let Ok(envelope) = serde_json::from_slice::<Envelope<T>>(bytes) {
        return Ok(envelope.metadata);
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull the server-provided message out of an error body, falling back
/// to a generic one.
pub(crate) fn error_message(bytes: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(bytes)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| "Request failed".to_string())
}

/// Classify a non-success status into the error taxonomy.
pub(crate) fn decode_error(status: StatusCode, bytes: &[u8]) -> ApiError {
    let message = error_message(bytes);
    if is_auth_failure(status) {
        ApiError::Unauthorized(message)
    } else {
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn decode_payload_accepts_metadata_envelope() {
        let bytes = br#"{"metadata": {"value": 7}}"#;

        #[derive(serde::Deserialize)]
        struct Payload {
            value: i32,
        }

        let payload: Payload = decode_payload(bytes).unwrap();
        assert_eq!(payload.value, 7);
    }

    #[test]
    fn decode_payload_accepts_plain_body() {
        let bytes = br#"{"value": 7}"#;

        #[derive(serde::Deserialize)]
        struct Payload {
            value: i32,
        }

        let payload: Payload = decode_payload(bytes).unwrap();
        assert_eq!(payload.value, 7);
    }

    #[test]
    fn decode_payload_reports_malformed_body() {
        let result: ApiResult<Vec<i32>> = decode_payload(b"not json");
        assert_matches!(result, Err(ApiError::Decode(_)));
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(br#"{"message": "Insufficient funds"}"#),
            "Insufficient funds"
        );
        assert_eq!(error_message(br#"{"error": "Symbol not found"}"#), "Symbol not found");
        assert_eq!(error_message(b"<html>"), "Request failed");
    }

    #[test]
    fn decode_error_classifies_statuses() {
        assert_matches!(
            decode_error(StatusCode::UNAUTHORIZED, b"{}"),
            ApiError::Unauthorized(_)
        );
        assert_matches!(
            decode_error(StatusCode::UNPROCESSABLE_ENTITY, br#"{"message": "bad qty"}"#),
            ApiError::Api { status: 422, message } if message == "bad qty"
        );
    }

    #[test]
    fn auth_endpoints_are_recognised() {
        assert!(is_auth_endpoint("/auth/login"));
        assert!(is_auth_endpoint("/auth/new-token"));
        assert!(!is_auth_endpoint("/user/profile"));
        assert!(!is_auth_endpoint("/market"));
    }
}
