//! Integration tests for the refresh-and-replay flow, driven against a
//! mock HTTP server.
//!
//! These cover the core contract: at most one refresh per burst of
//! authorization failures, at most one replay per request, terminal
//! session teardown when the refresh itself is rejected.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradewire_api::session::MemorySessionStore;
use tradewire_api::{ApiClient, ApiConfig, ApiError};
use tradewire_core::session::{AuthTokens, Session};
use tradewire_core::user::UserProfile;

fn test_user() -> UserProfile {
    UserProfile {
        id: "u-1".into(),
        username: "alice".into(),
        email: "alice@example.com".into(),
        display_name: None,
        balance: None,
    }
}

/// A client whose stored session carries the given token pair.
fn client_with_session(server_uri: &str, access: &str, refresh: &str) -> ApiClient {
    let client = ApiClient::new(
        ApiConfig::with_base_url(server_uri),
        Box::new(MemorySessionStore::new()),
    );
    client.session().set(Session::new(
        AuthTokens {
            access_token: access.into(),
            refresh_token: refresh.into(),
        },
        test_user(),
    ));
    client
}

fn profile_body() -> serde_json::Value {
    json!({
        "id": "u-1",
        "username": "alice",
        "email": "alice@example.com",
        "balance": 1250.75
    })
}

// ---------------------------------------------------------------------------
// Test: expired token -> one refresh round-trip -> replay succeeds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_and_replay_recovers_expired_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_session(&server.uri(), "expired", "r1");

    let profile = client.profile().await.expect("replay should succeed");
    assert_eq!(profile.username, "alice");

    // The replacement pair was stored atomically.
    assert_eq!(client.session().access_token().as_deref(), Some("fresh"));
    assert_eq!(client.session().refresh_token().as_deref(), Some("r2"));
}

// ---------------------------------------------------------------------------
// Test: N concurrent 401s -> exactly one refresh call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_failures_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    // Delay the refresh response so every request is already queued
    // behind the flight before it settles.
    Mock::given(method("POST"))
        .and(path("/auth/new-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "fresh",
                    "refresh_token": "r2"
                }))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = std::sync::Arc::new(client_with_session(&server.uri(), "expired", "r1"));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let client = std::sync::Arc::clone(&client);
        handles.push(tokio::spawn(async move { client.profile().await }));
    }

    for handle in handles {
        let profile = handle.await.unwrap().expect("every request should be replayed");
        assert_eq!(profile.id, "u-1");
    }
    // `.expect(1)` on the refresh mock is verified when `server` drops.
}

// ---------------------------------------------------------------------------
// Test: a second 401 after a successful refresh is terminal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_rejection_is_not_retried() {
    let server = MockServer::start().await;

    // The profile endpoint rejects every token, including the fresh one.
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "nope"})))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_session(&server.uri(), "expired", "r1");

    let result = client.profile().await;
    assert!(
        matches!(result, Err(ApiError::Unauthorized(ref m)) if m == "nope"),
        "expected terminal Unauthorized, got {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Test: refresh rejection clears the session for good
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_refresh_clears_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/new-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "invalid refresh token"})),
        )
        .mount(&server)
        .await;

    let client = client_with_session(&server.uri(), "expired", "r1");

    let result = client.profile().await;
    assert!(
        matches!(result, Err(ApiError::SessionExpired(ref m)) if m == "invalid refresh token"),
        "expected SessionExpired, got {result:?}"
    );
    assert!(!client.session().is_authenticated(), "session must be cleared");
}

// ---------------------------------------------------------------------------
// Test: auth endpoints never trigger a refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_login_does_not_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Invalid username or password"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = ApiClient::new(
        ApiConfig::with_base_url(&server.uri()),
        Box::new(MemorySessionStore::new()),
    );

    let result = client.login("alice", "wrong").await;
    assert!(
        matches!(result, Err(ApiError::Unauthorized(ref m)) if m == "Invalid username or password")
    );
}

// ---------------------------------------------------------------------------
// Test: 401 with no stored session is surfaced as session-expired
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthenticated_rejection_surfaces_session_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "no token"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(
        ApiConfig::with_base_url(&server.uri()),
        Box::new(MemorySessionStore::new()),
    );

    let result = client.profile().await;
    assert!(matches!(result, Err(ApiError::SessionExpired(_))));
}
