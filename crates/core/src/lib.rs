//! Shared domain types for the Tradewire client SDK.
//!
//! Sessions and token pairs, user profiles, market data, stock
//! transactions, and chat conversations/messages. These types are
//! consumed by both the REST client (`tradewire-api`) and the realtime
//! client (`tradewire-realtime`).

pub mod chat;
pub mod market;
pub mod session;
pub mod trade;
pub mod types;
pub mod user;
