//! One owner per odds topic.
//!
//! An [`OddsTopic`] wires a [`PollingScheduler`], a [`RealtimeConnection`]
//! and the [`OddsAggregator`] they both feed. A forwarder task moves pushed
//! deltas from the connection into the aggregator.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::aggregator::{AggregatorUpdate, OddsAggregator};
use super::breaker::{CircuitBreaker, CircuitBreakerState};
use super::connection::{ConnectionStatus, RealtimeConnection};
use super::scheduler::{PollStatus, PollingScheduler, RefreshResult};
use crate::domain::{DeltaOutcome, OddsDelta, StaleDataWarning, Topic};
use crate::infrastructure::config::Config;
use crate::port::{OddsFetcher, PushStream};

/// Scheduler, push connection and read model for one topic.
pub struct OddsTopic {
    topic: Topic,
    interval: Duration,
    aggregator: Arc<OddsAggregator>,
    scheduler: PollingScheduler,
    connection: RealtimeConnection,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl OddsTopic {
    /// Build a stopped topic. `breaker` is the shared gate for the REST
    /// endpoint `fetcher` talks to.
    #[must_use]
    pub fn new(
        topic: Topic,
        fetcher: Arc<dyn OddsFetcher>,
        breaker: Arc<CircuitBreaker>,
        config: &Config,
    ) -> Self {
        let (aggregator, _rx) =
            OddsAggregator::with_notifications(topic.clone(), config.reconnect.channel_capacity);
        let aggregator = Arc::new(aggregator);
        let scheduler =
            PollingScheduler::new(topic.clone(), fetcher, breaker, Arc::clone(&aggregator));
        let connection = RealtimeConnection::new(topic.clone(), config.reconnect.clone());

        Self {
            interval: config.polling.interval_for(&topic),
            topic,
            aggregator,
            scheduler,
            connection,
            forwarder: Mutex::new(None),
        }
    }

    /// Start polling and, when `push` is given, the realtime feed.
    ///
    /// Starting a running topic does nothing.
    pub fn start(&self, push: Option<Box<dyn PushStream>>) {
        self.scheduler.start(self.interval);

        let Some(stream) = push else {
            return;
        };
        let Some(deltas) = self.connection.take_deltas() else {
            debug!(topic = %self.topic, "Push feed already started");
            return;
        };
        let aggregator = Arc::clone(&self.aggregator);
        *self.forwarder.lock() = Some(tokio::spawn(forward_deltas(deltas, aggregator)));
        self.connection.start(stream);
        info!(topic = %self.topic, "Topic started with push feed");
    }

    /// Stop the timer, in-flight fetch, push connection and forwarder.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.connection.stop();
        if let Some(forwarder) = self.forwarder.lock().take() {
            forwarder.abort();
        }
        info!(topic = %self.topic, "Topic stopped");
    }

    /// Refresh through the shared breaker, joining an in-flight fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the aggregator keeps serving stale data.
    pub async fn refresh_now(&self, visible: bool) -> RefreshResult {
        self.scheduler.refresh_now(visible).await
    }

    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn aggregator(&self) -> &Arc<OddsAggregator> {
        &self.aggregator
    }

    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<AggregatorUpdate>> {
        self.aggregator.subscribe()
    }

    #[must_use]
    pub fn poll_status(&self) -> PollStatus {
        self.scheduler.status()
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    #[must_use]
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.subscribe_status()
    }

    #[must_use]
    pub fn breaker_state(&self) -> CircuitBreakerState {
        self.scheduler.breaker().state()
    }

    /// Breaker transitions for the endpoint this topic polls.
    #[must_use]
    pub fn subscribe_breaker(&self) -> watch::Receiver<CircuitBreakerState> {
        self.scheduler.breaker().subscribe()
    }

    /// Warning when the held data is older than one poll interval.
    #[must_use]
    pub fn freshness(&self) -> Option<StaleDataWarning> {
        self.aggregator.freshness(self.interval)
    }
}

impl Drop for OddsTopic {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.get_mut().take() {
            forwarder.abort();
        }
    }
}

async fn forward_deltas(mut deltas: mpsc::Receiver<OddsDelta>, aggregator: Arc<OddsAggregator>) {
    while let Some(delta) = deltas.recv().await {
        let game = delta.game_id.clone();
        match aggregator.apply_delta(delta) {
            DeltaOutcome::Applied { recomputed } => {
                trace!(topic = %aggregator.topic(), game = %game, recomputed, "Delta applied");
            }
            outcome => {
                debug!(topic = %aggregator.topic(), game = %game, ?outcome, "Delta ignored");
            }
        }
    }
}
