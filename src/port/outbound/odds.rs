//! REST odds provider port.

use async_trait::async_trait;

use crate::domain::{Game, Sport, Topic};
use crate::error::FetchError;

/// Pull-side access to the odds provider.
///
/// Implementations classify failures: unreachable endpoints are
/// [`FetchError::Transport`], reachable endpoints that answer with a failure
/// status or an unusable payload are [`FetchError::Upstream`].
#[async_trait]
pub trait OddsFetcher: Send + Sync {
    /// Fetch the full game list for a topic, in provider order.
    async fn fetch_games(&self, topic: &Topic) -> Result<Vec<Game>, FetchError>;

    /// Fetch the sports catalog.
    async fn fetch_sports(&self) -> Result<Vec<Sport>, FetchError>;

    /// Name of the upstream endpoint, used for logging and breaker errors.
    fn endpoint_name(&self) -> &'static str;
}
