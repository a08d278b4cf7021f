//! Registry of running topics.
//!
//! The hub guarantees at most one [`OddsTopic`] per topic so no topic polls
//! or connects twice. Every topic shares the hub's single breaker for the
//! REST endpoint, which also gates the sports catalog.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::breaker::{CircuitBreaker, CircuitBreakerState};
use super::topic::OddsTopic;
use crate::domain::{Sport, Topic};
use crate::error::FetchError;
use crate::infrastructure::config::Config;
use crate::port::{OddsFetcher, PushStream};

/// Opens a push stream for a topic, or `None` when the topic has no push feed.
pub type PushFactory = Arc<dyn Fn(&Topic) -> Option<Box<dyn PushStream>> + Send + Sync>;

/// Owns every running topic and the shared REST breaker.
pub struct OddsHub {
    config: Config,
    fetcher: Arc<dyn OddsFetcher>,
    breaker: Arc<CircuitBreaker>,
    push: Option<PushFactory>,
    topics: RwLock<HashMap<Topic, Arc<OddsTopic>>>,
    sports: RwLock<Arc<Vec<Sport>>>,
}

impl OddsHub {
    #[must_use]
    pub fn new(fetcher: Arc<dyn OddsFetcher>, config: Config) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(fetcher.endpoint_name(), &config.breaker));
        Self {
            config,
            fetcher,
            breaker,
            push: None,
            topics: RwLock::new(HashMap::new()),
            sports: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Open push feeds for new topics through `factory`.
    #[must_use]
    pub fn with_push(mut self, factory: PushFactory) -> Self {
        self.push = Some(factory);
        self
    }

    /// The running topic for `topic`, starting it on first use.
    pub fn topic(&self, topic: &Topic) -> Arc<OddsTopic> {
        if let Some(existing) = self.topics.read().get(topic) {
            return Arc::clone(existing);
        }

        let mut topics = self.topics.write();
        // Another caller may have won the race between the two locks.
        if let Some(existing) = topics.get(topic) {
            return Arc::clone(existing);
        }

        let owner = Arc::new(OddsTopic::new(
            topic.clone(),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.breaker),
            &self.config,
        ));
        let push = self.push.as_ref().and_then(|factory| factory(topic));
        owner.start(push);
        info!(topic = %topic, running = topics.len() + 1, "Registered topic");
        topics.insert(topic.clone(), Arc::clone(&owner));
        owner
    }

    /// The running topic, if any.
    #[must_use]
    pub fn get(&self, topic: &Topic) -> Option<Arc<OddsTopic>> {
        self.topics.read().get(topic).cloned()
    }

    /// Stop and forget a topic. Returns `false` if it was not running.
    pub fn release(&self, topic: &Topic) -> bool {
        let Some(owner) = self.topics.write().remove(topic) else {
            return false;
        };
        owner.stop();
        info!(topic = %topic, "Released topic");
        true
    }

    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.topics.read().keys().cloned().collect()
    }

    #[must_use]
    pub const fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    #[must_use]
    pub fn breaker_state(&self) -> CircuitBreakerState {
        self.breaker.state()
    }

    /// Refetch the sports catalog through the shared breaker.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous catalog is kept.
    pub async fn refresh_sports(&self) -> Result<Arc<Vec<Sport>>, FetchError> {
        match self.breaker.guard(|| self.fetcher.fetch_sports()).await {
            Ok(sports) => {
                let sports = Arc::new(sports);
                *self.sports.write() = Arc::clone(&sports);
                info!(count = sports.len(), "Refreshed sports catalog");
                Ok(sports)
            }
            Err(err) => {
                warn!(error = %err, "Sports refresh failed, keeping previous catalog");
                Err(err)
            }
        }
    }

    /// The last fetched sports catalog.
    #[must_use]
    pub fn sports(&self) -> Arc<Vec<Sport>> {
        Arc::clone(&self.sports.read())
    }

    /// Stop every topic.
    pub fn shutdown(&self) {
        let topics: Vec<_> = self.topics.write().drain().collect();
        for (_, owner) in &topics {
            owner.stop();
        }
        info!(stopped = topics.len(), "Hub shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::breaker::CircuitState;
    use crate::testkit::config::fast_config;
    use crate::testkit::domain::sport;
    use crate::testkit::fetcher::ScriptedFetcher;
    use crate::testkit::stream::ScriptedPushStream;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn hub(fetcher: &Arc<ScriptedFetcher>) -> OddsHub {
        OddsHub::new(Arc::clone(fetcher) as Arc<dyn OddsFetcher>, fast_config())
    }

    #[tokio::test(start_paused = true)]
    async fn one_owner_per_topic() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let opened = Arc::new(AtomicU32::new(0));
        let factory: PushFactory = {
            let opened = Arc::clone(&opened);
            Arc::new(move |_topic: &Topic| {
                opened.fetch_add(1, Ordering::SeqCst);
                Some(Box::new(ScriptedPushStream::new()) as Box<dyn PushStream>)
            })
        };
        let hub = hub(&fetcher).with_push(factory);

        let nba = Topic::sport("basketball_nba");
        let first = hub.topic(&nba);
        let second = hub.topic(&nba);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        hub.topic(&Topic::PopularGames);
        assert_eq!(hub.topics().len(), 2);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn topics_share_one_breaker() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        for _ in 0..3 {
            fetcher.push_error(FetchError::Transport("timeout".into()));
        }
        let hub = hub(&fetcher);
        let threshold = fast_config().breaker.failure_threshold;
        assert_eq!(threshold, 3);

        let nba = hub.topic(&Topic::sport("basketball_nba"));
        let nfl = hub.topic(&Topic::sport("americanfootball_nfl"));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let _ = nba.refresh_now(false).await;
        assert_eq!(hub.breaker_state().state, CircuitState::Open);

        let err = nfl.refresh_now(false).await.unwrap_err();
        assert!(matches!(err, FetchError::CircuitOpen(_)));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn release_stops_and_forgets() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let hub = hub(&fetcher);
        let nba = Topic::sport("basketball_nba");
        hub.topic(&nba);
        assert!(hub.release(&nba));
        assert!(!hub.release(&nba));
        assert!(hub.get(&nba).is_none());
    }

    #[tokio::test]
    async fn sports_catalog_survives_failed_refresh() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_sports(Ok(vec![sport("basketball_nba", "NBA")]));
        fetcher.push_sports(Err(FetchError::Upstream("status: error".into())));
        let hub = hub(&fetcher);

        assert_eq!(hub.refresh_sports().await.unwrap().len(), 1);
        assert!(hub.refresh_sports().await.is_err());
        assert_eq!(hub.sports().len(), 1);
        assert_eq!(hub.sports()[0].key, "basketball_nba");
    }
}
