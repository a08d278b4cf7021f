use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// The breaker refused the call without contacting the upstream.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("circuit open for {endpoint}, next probe in {}ms", retry_in.as_millis())]
pub struct CircuitOpenError {
    /// Name of the guarded dependency.
    pub endpoint: &'static str,
    /// Time left until the breaker admits a probe. Zero while a probe is running.
    pub retry_in: Duration,
}

/// Failure of a single odds refresh.
///
/// `Clone` so that every caller coalesced onto one in-flight request
/// receives the same result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The endpoint could not be reached (connect failure, timeout, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The breaker rejected the call.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The endpoint answered, but with a failure status or an unusable payload.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The refresh was abandoned because its topic was stopped.
    #[error("refresh cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this error should count against the upstream's breaker.
    #[must_use]
    pub const fn counts_as_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Upstream(_))
    }

    /// Whether the caller should present this as degraded service rather
    /// than a generic error.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_status() {
            Self::Upstream(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Push transport failures. These never escape the realtime connection;
/// they only drive its reconnect state machine.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
