//! `/user` endpoints.

use tradewire_core::user::UserProfile;

use crate::client::ApiClient;
use crate::error::ApiResult;

impl ApiClient {
    /// Fetch the authenticated user's profile.
    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.get("/user/profile").await
    }
}
