//! Upstream endpoints and HTTP client settings.

use std::time::Duration;

use serde::Deserialize;

/// Odds provider endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Base URL of the REST odds API (`/odds`, `/sports`, ...).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// URL of the push endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

fn default_api_url() -> String {
    "http://localhost:8080/api".into()
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws/odds".into()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }
}

/// HTTP client behavior for REST calls.
///
/// Retries here are transport-level and happen inside a single guarded call;
/// the breaker sees one outcome per refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout (milliseconds).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Attempts per request, including the first. Only timeouts and connect
    /// failures are retried.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Pause between attempts (milliseconds).
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_connect_timeout_ms() -> u64 {
    3_000
}

const fn default_retry_max_attempts() -> u32 {
    2
}

const fn default_retry_backoff_ms() -> u64 {
    250
}

impl HttpConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}
