//! `/stock-transactions` endpoints.

use tradewire_core::trade::StockTransaction;
use tradewire_core::types::EntityId;

use crate::client::ApiClient;
use crate::error::ApiResult;

impl ApiClient {
    /// Transaction history of the authenticated user.
    pub async fn transactions(&self) -> ApiResult<Vec<StockTransaction>> {
        self.get("/stock-transactions/transactions").await
    }

    /// Transaction history of a specific user (requires permission
    /// server-side).
    pub async fn transactions_for(&self, user_id: &EntityId) -> ApiResult<Vec<StockTransaction>> {
        self.get(&format!("/stock-transactions/transactions/{user_id}"))
            .await
    }
}
