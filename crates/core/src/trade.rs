//! Stock transaction types for the order wizard and transaction
//! history endpoints.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSide {
    Buy,
    Sell,
}

/// Lifecycle of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A buy/sell order as reported by the transaction-history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: EntityId,
    pub user_id: EntityId,
    pub symbol: String,
    pub side: TransactionSide,
    pub quantity: u64,
    /// Price per share at execution.
    pub unit_price: f64,
    /// Total order value (quantity x unit price, plus fees if any).
    pub total: f64,
    pub status: TransactionStatus,
    pub executed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_and_status_use_lowercase_wire_names() {
        let json = r#"{
            "id": "tx-1",
            "user_id": "u-1",
            "symbol": "TSLA",
            "side": "sell",
            "quantity": 10,
            "unit_price": 242.0,
            "total": 2420.0,
            "status": "completed",
            "executed_at": "2026-08-06T09:15:00Z"
        }"#;

        let tx: StockTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.side, TransactionSide::Sell);
        assert_eq!(tx.status, TransactionStatus::Completed);
    }
}
