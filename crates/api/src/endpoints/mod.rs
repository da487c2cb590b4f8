//! Typed wrappers over the REST endpoints, grouped by resource.

pub mod auth;
pub mod chat;
pub mod market;
pub mod transactions;
pub mod user;
