//! User profile returned by the authentication and profile endpoints.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Public profile of a platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    /// Optional human-friendly display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Available cash balance in account currency, when the endpoint
    /// exposes it (the profile endpoint does, the auth envelope may not).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}
