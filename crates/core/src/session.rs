//! Authenticated session state: the access/refresh token pair plus the
//! user it belongs to.
//!
//! Tokens are always replaced as a pair via
//! [`Session::replace_tokens`] so that a stale access token is never
//! paired with a newer refresh token.

use serde::{Deserialize, Serialize};

use crate::user::UserProfile;

/// The credential pair issued by the authentication endpoints.
///
/// The access token is short-lived and sent as a bearer header on
/// every request; the refresh token is long-lived and only presented
/// to the token-refresh endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// A logged-in session: token pair plus the owning user.
///
/// Created on login/sign-up, token pair swapped on refresh, dropped
/// entirely on logout or unrecoverable refresh failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub tokens: AuthTokens,
    pub user: UserProfile,
}

impl Session {
    pub fn new(tokens: AuthTokens, user: UserProfile) -> Self {
        Self { tokens, user }
    }

    /// Swap in a freshly-issued token pair.
    ///
    /// Both tokens are replaced together; callers must never update
    /// one half of the pair in isolation.
    pub fn replace_tokens(&mut self, tokens: AuthTokens) {
        self.tokens = tokens;
    }

    /// The current bearer token for REST calls.
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    /// The long-lived token presented to the refresh endpoint.
    pub fn refresh_token(&self) -> &str {
        &self.tokens.refresh_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserProfile;

    fn test_session() -> Session {
        Session::new(
            AuthTokens {
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
            },
            UserProfile {
                id: "u-1".into(),
                username: "alice".into(),
                email: "alice@example.com".into(),
                display_name: None,
                balance: None,
            },
        )
    }

    #[test]
    fn replace_tokens_swaps_both_halves() {
        let mut session = test_session();

        session.replace_tokens(AuthTokens {
            access_token: "access-2".into(),
            refresh_token: "refresh-2".into(),
        });

        assert_eq!(session.access_token(), "access-2");
        assert_eq!(session.refresh_token(), "refresh-2");
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = test_session();

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.access_token(), "access-1");
        assert_eq!(restored.user.username, "alice");
    }
}
