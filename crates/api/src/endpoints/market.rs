//! `/market` endpoints: the overview snapshot and per-symbol detail.

use tradewire_core::market::{StockDetail, StockQuote};

use crate::client::ApiClient;
use crate::error::ApiResult;

impl ApiClient {
    /// Fetch the market overview rows.
    pub async fn market_overview(&self) -> ApiResult<Vec<StockQuote>> {
        self.get("/market").await
    }

    /// Fetch the detail page data for one symbol.
    pub async fn stock(&self, symbol: &str) -> ApiResult<StockDetail> {
        self.get(&format!("/market/stock/{symbol}")).await
    }
}
