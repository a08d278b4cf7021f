//! HTTP client for the REST odds API.
//!
//! Endpoints:
//! - `GET /odds?sport={key}`: odds for one sport
//! - `GET /odds/popular`: odds across the default sports
//! - `GET /popular-games`: featured games grouped by league
//! - `GET /sports`: sports catalog
//!
//! Timeouts and connect failures are retried a bounded number of times
//! inside a single call, so the circuit breaker sees one outcome per fetch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::dto::{OddsResponse, PopularGamesResponse, SportsResponse};
use crate::domain::{Game, Sport, Topic};
use crate::error::FetchError;
use crate::infrastructure::config::{HttpConfig, NetworkConfig};
use crate::port::OddsFetcher;

/// Endpoint name reported in breaker errors and logs.
pub const ENDPOINT: &str = "odds-api";

/// Client for the REST odds API.
pub struct OddsApiClient {
    http: HttpClient,
    base_url: String,
    retry_max_attempts: u32,
    retry_backoff_ms: u64,
}

impl OddsApiClient {
    /// Create a client with default HTTP settings and a single attempt.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: trim_base(base_url.into()),
            retry_max_attempts: 1,
            retry_backoff_ms: 0,
        }
    }

    #[must_use]
    pub fn from_config(network: &NetworkConfig, http: &HttpConfig) -> Self {
        let client = HttpClient::builder()
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout())
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http: client,
            base_url: trim_base(network.api_url.clone()),
            retry_max_attempts: http.retry_max_attempts,
            retry_backoff_ms: http.retry_backoff_ms,
        }
    }

    async fn get_with_retry<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        let max_attempts = self.retry_max_attempts.max(1);

        loop {
            attempt += 1;
            let response = match self.http.get(&url).query(query).send().await {
                Ok(response) => response,
                Err(err) => {
                    if attempt >= max_attempts || !Self::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.backoff(attempt, max_attempts, &err).await;
                    continue;
                }
            };

            let response = response.error_for_status()?;

            match response.json::<T>().await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    if attempt >= max_attempts || !Self::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.backoff(attempt, max_attempts, &err).await;
                }
            }
        }
    }

    fn should_retry(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    async fn backoff(&self, attempt: u32, max_attempts: u32, err: &reqwest::Error) {
        warn!(
            attempt,
            max_attempts,
            error = %err,
            "HTTP request failed, retrying"
        );
        if self.retry_backoff_ms > 0 {
            sleep(Duration::from_millis(self.retry_backoff_ms)).await;
        }
    }

    /// Fetch odds for one sport key.
    ///
    /// # Errors
    ///
    /// Transport failures, HTTP error statuses, malformed bodies, and
    /// non-success envelopes.
    pub async fn get_odds(&self, sport: &str) -> Result<Vec<Game>, FetchError> {
        info!(sport, "Fetching odds");
        let response: OddsResponse = self.get_with_retry("/odds", &[("sport", sport)]).await?;
        let games = response.into_games()?;
        debug!(sport, count = games.len(), "Fetched odds");
        Ok(games)
    }

    /// Fetch odds across the provider's default sports.
    ///
    /// # Errors
    ///
    /// As [`get_odds`](Self::get_odds).
    pub async fn get_popular_odds(&self) -> Result<Vec<Game>, FetchError> {
        info!("Fetching popular odds");
        let response: OddsResponse = self.get_with_retry("/odds/popular", &[]).await?;
        response.into_games()
    }

    /// Fetch featured games, flattened in league display order.
    ///
    /// # Errors
    ///
    /// As [`get_odds`](Self::get_odds).
    pub async fn get_popular_games(&self) -> Result<Vec<Game>, FetchError> {
        info!("Fetching popular games");
        let response: PopularGamesResponse = self.get_with_retry("/popular-games", &[]).await?;
        let games = response.into_games()?;
        debug!(count = games.len(), "Fetched popular games");
        Ok(games)
    }

    /// Fetch the sports catalog.
    ///
    /// # Errors
    ///
    /// As [`get_odds`](Self::get_odds).
    pub async fn get_sports(&self) -> Result<Vec<Sport>, FetchError> {
        let response: SportsResponse = self.get_with_retry("/sports", &[]).await?;
        let sports = response.into_sports()?;
        debug!(count = sports.len(), "Fetched sports");
        Ok(sports)
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[async_trait]
impl OddsFetcher for OddsApiClient {
    async fn fetch_games(&self, topic: &Topic) -> Result<Vec<Game>, FetchError> {
        match topic {
            Topic::Sport(key) => self.get_odds(key).await,
            Topic::Popular => self.get_popular_odds().await,
            Topic::PopularGames => self.get_popular_games().await,
        }
    }

    async fn fetch_sports(&self) -> Result<Vec<Sport>, FetchError> {
        self.get_sports().await
    }

    fn endpoint_name(&self) -> &'static str {
        ENDPOINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_dropped() {
        let client = OddsApiClient::new("http://localhost:8080/api//");
        assert_eq!(client.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn from_config_keeps_retry_policy() {
        let network = NetworkConfig::default();
        let http = HttpConfig {
            retry_max_attempts: 4,
            retry_backoff_ms: 10,
            ..Default::default()
        };
        let client = OddsApiClient::from_config(&network, &http);
        assert_eq!(client.retry_max_attempts, 4);
        assert_eq!(client.retry_backoff_ms, 10);
        assert_eq!(client.endpoint_name(), ENDPOINT);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let client = OddsApiClient::from_config(
            &NetworkConfig {
                api_url: "http://127.0.0.1:9".into(),
                ..Default::default()
            },
            &HttpConfig {
                timeout_ms: 200,
                connect_timeout_ms: 200,
                retry_max_attempts: 1,
                retry_backoff_ms: 0,
            },
        );
        let err = client.get_sports().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
    }
}
