//! Top-level configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Every section and field has a
//! default, so an empty file is valid. The upstream URLs can be overridden
//! from the environment (`ODDSYNC_API_URL`, `ODDSYNC_WS_URL`), which is
//! populated from `.env` by the binary.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::logging::LoggingConfig;
use super::network::{HttpConfig, NetworkConfig};
use super::policy::{BreakerConfig, PollingConfig, ReconnectConfig};
use crate::error::{ConfigError, Result};

const API_URL_ENV: &str = "ODDSYNC_API_URL";
const WS_URL_ENV: &str = "ODDSYNC_WS_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(api_url) = std::env::var(API_URL_ENV) {
            config.network.api_url = api_url;
        }
        if let Ok(ws_url) = std::env::var(WS_URL_ENV) {
            config.network.ws_url = ws_url;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.network.api_url.is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.network.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }
        Self::check_url("api_url", &self.network.api_url, &["http", "https"])?;
        Self::check_url("ws_url", &self.network.ws_url, &["ws", "wss"])?;

        if self.polling.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.polling.popular_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "popular_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "failure_threshold",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "base_delay_ms",
                reason: "must not exceed max_delay_ms".to_string(),
            }
            .into());
        }
        if self.reconnect.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.reconnect.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "channel_capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn check_url(field: &'static str, value: &str, schemes: &[&str]) -> Result<()> {
        let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })?;
        if !schemes.contains(&url.scheme()) {
            return Err(ConfigError::InvalidValue {
                field,
                reason: format!("scheme must be one of {schemes:?}, got {}", url.scheme()),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.polling.interval_ms, 300_000);
        assert_eq!(config.polling.popular_interval_ms, 600_000);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.cooldown_ms, 30_000);
        assert_eq!(config.reconnect.base_delay_ms, 1_000);
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
            [polling]
            interval_ms = 60000

            [breaker]
            failure_threshold = 3
            cooldown_ms = 5000

            [reconnect]
            base_delay_ms = 500
            max_delay_ms = 8000
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.interval_ms, 60_000);
        assert_eq!(config.polling.popular_interval_ms, 600_000);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.reconnect.max_delay_ms, 8_000);
    }

    #[test]
    fn rejects_zero_threshold() {
        let result = Config::parse_toml("[breaker]\nfailure_threshold = 0\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "failure_threshold", .. }))
        ));
    }

    #[test]
    fn rejects_zero_push_connect_timeout() {
        let result = Config::parse_toml("[reconnect]\nconnect_timeout_ms = 0\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "connect_timeout_ms", .. }))
        ));
    }

    #[test]
    fn rejects_base_delay_above_cap() {
        let result = Config::parse_toml("[reconnect]\nbase_delay_ms = 5000\nmax_delay_ms = 1000\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "base_delay_ms", .. }))
        ));
    }

    #[test]
    fn rejects_wrong_url_scheme() {
        let result = Config::parse_toml("[network]\nws_url = \"https://example.com/ws\"\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "ws_url", .. }))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let result = Config::parse_toml("[polling\ninterval_ms = 1");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
