use std::time::Duration;

/// REST client configuration loaded from environment variables.
///
/// All fields have local-development defaults; override via environment
/// variables in real deployments.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

impl ApiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                        |
    /// |----------------------------------|--------------------------------|
    /// | `TRADEWIRE_API_URL`              | `http://localhost:3000/api/v1` |
    /// | `TRADEWIRE_REQUEST_TIMEOUT_SECS` | `10`                           |
    pub fn from_env() -> Self {
        let base_url = std::env::var("TRADEWIRE_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/v1".into());

        let request_timeout_secs: u64 = std::env::var("TRADEWIRE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    /// Configuration pointing at an explicit base URL, with the default
    /// timeout. Used by tests and the probe binary.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}
