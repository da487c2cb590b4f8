//! Market data types: the overview snapshot rows and the per-symbol
//! detail returned by `/market` and `/market/stock/:symbol`.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// One row of the market overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    /// Ticker symbol, e.g. `AAPL`.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Last traded price.
    pub price: f64,
    /// Absolute change since previous close.
    pub change: f64,
    /// Percentage change since previous close.
    pub change_percent: f64,
    /// Shares traded in the current session.
    pub volume: u64,
    pub updated_at: Timestamp,
}

/// A single point on a price history series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: f64,
}

/// Per-symbol detail for the stock page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDetail {
    #[serde(flatten)]
    pub quote: StockQuote,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    /// Recent intraday price points, oldest first.
    #[serde(default)]
    pub history: Vec<PricePoint>,
}
