//! `/auth` endpoints: login, sign-up, logout.
//!
//! The token-refresh endpoint lives in the client core
//! ([`ApiClient::refresh_session`](crate::client::ApiClient)) because
//! it is driven by authorization failures, not by callers.

use serde::{Deserialize, Serialize};

use tradewire_core::session::{AuthTokens, Session};
use tradewire_core::user::UserProfile;

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Request body for `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/sign-up`.
#[derive(Debug, Serialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful authentication response returned by login and sign-up.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Session::new(
            AuthTokens {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
            },
            response.user,
        )
    }
}

impl ApiClient {
    /// Authenticate with username + password and install the returned
    /// session (tokens and user stored together).
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserProfile> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.post("/auth/login", &request).await?;
        let session: Session = response.into();
        let user = session.user.clone();
        self.session().set(session);

        tracing::info!(username = %user.username, "Logged in");
        Ok(user)
    }

    /// Create an account and install the returned session.
    pub async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<UserProfile> {
        let response: AuthResponse = self.post("/auth/sign-up", request).await?;
        let session: Session = response.into();
        let user = session.user.clone();
        self.session().set(session);

        tracing::info!(username = %user.username, "Account created");
        Ok(user)
    }

    /// Log out: best-effort server call, then drop the session
    /// unconditionally.
    pub async fn logout(&self) -> ApiResult<()> {
        if self.session().is_authenticated() {
            if let Err(e) = self.post::<serde_json::Value, _>("/auth/logout", &()).await {
                tracing::warn!(error = %e, "Logout call failed, clearing session anyway");
            }
        }
        self.session().clear();
        Ok(())
    }
}
