//! REST client for the Tradewire platform.
//!
//! [`ApiClient`](client::ApiClient) issues authenticated requests and
//! transparently recovers from an expired access token exactly once per
//! request: concurrent failures share a single in-flight refresh call
//! (see [`refresh`]), and the replacement token pair is persisted
//! atomically through the configured [`session::SessionStore`].

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod refresh;
pub mod session;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::ApiError;
