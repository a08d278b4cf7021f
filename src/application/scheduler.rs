//! Periodic and on-demand REST refreshes for one topic.
//!
//! Every fetch goes through the shared [`CircuitBreaker`]. At most one
//! request per topic is in flight: a refresh requested while another is
//! running joins it and receives the same result.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::aggregator::OddsAggregator;
use super::breaker::CircuitBreaker;
use crate::domain::{OddsSnapshot, SnapshotSource, Topic};
use crate::error::FetchError;
use crate::port::OddsFetcher;

/// Outcome shared by every caller of one coalesced fetch.
pub type RefreshResult = Result<Arc<OddsSnapshot>, FetchError>;

type SharedFetch = Shared<BoxFuture<'static, RefreshResult>>;

/// Observable polling status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStatus {
    /// A user-visible refresh is waiting on a fetch.
    pub loading: bool,
    /// A fetch is currently in flight.
    pub in_flight: bool,
    /// The last completed fetch succeeded.
    pub healthy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<FetchError>,
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
    abort: AbortHandle,
}

struct PollState {
    topic: Topic,
    fetcher: Arc<dyn OddsFetcher>,
    breaker: Arc<CircuitBreaker>,
    aggregator: Arc<OddsAggregator>,
    in_flight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    /// Bumped by `stop`; fetches started under an older epoch are ignored.
    epoch: AtomicU64,
    visible_waiters: AtomicUsize,
    status: watch::Sender<PollStatus>,
}

/// Drives REST refreshes for one topic.
pub struct PollingScheduler {
    shared: Arc<PollState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PollingScheduler {
    #[must_use]
    pub fn new(
        topic: Topic,
        fetcher: Arc<dyn OddsFetcher>,
        breaker: Arc<CircuitBreaker>,
        aggregator: Arc<OddsAggregator>,
    ) -> Self {
        let (status, _rx) = watch::channel(PollStatus::default());
        Self {
            shared: Arc::new(PollState {
                topic,
                fetcher,
                breaker,
                aggregator,
                in_flight: Mutex::new(None),
                next_id: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                visible_waiters: AtomicUsize::new(0),
                status,
            }),
            timer: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.shared.topic
    }

    #[must_use]
    pub fn aggregator(&self) -> &Arc<OddsAggregator> {
        &self.shared.aggregator
    }

    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.shared.breaker
    }

    #[must_use]
    pub fn status(&self) -> PollStatus {
        self.shared.status.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<PollStatus> {
        self.shared.status.subscribe()
    }

    /// Whether the interval timer is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start the interval timer. The first tick fires immediately.
    ///
    /// Calling `start` while already running does nothing.
    pub fn start(&self, interval: Duration) {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!(topic = %self.shared.topic, "Scheduler already running");
            return;
        }

        let shared = Arc::clone(&self.shared);
        info!(
            topic = %shared.topic,
            interval_ms = interval.as_millis() as u64,
            "Starting poll scheduler"
        );
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Outcome is already logged and reflected in the status.
                let _ = shared.fetch_coalesced().await;
            }
        }));
    }

    /// Stop the timer and cancel any in-flight fetch.
    ///
    /// Callers waiting on the cancelled fetch receive [`FetchError::Cancelled`].
    /// Manual refreshes remain possible afterwards.
    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
            info!(topic = %self.shared.topic, "Stopped poll scheduler");
        }
        self.shared.cancel_in_flight();
    }

    /// Fetch now, joining an in-flight fetch if there is one.
    ///
    /// Does not bypass the circuit breaker and does not reset the interval.
    /// `visible` only toggles [`PollStatus::loading`].
    ///
    /// # Errors
    ///
    /// Returns the fetch error, including [`FetchError::CircuitOpen`] when
    /// the breaker rejects the call. The aggregator keeps the last good data
    /// flagged stale.
    pub async fn refresh_now(&self, visible: bool) -> RefreshResult {
        let _loading = visible.then(|| LoadingGuard::new(&self.shared));
        self.shared.fetch_coalesced().await
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
        self.shared.cancel_in_flight();
    }
}

impl PollState {
    fn fetch_coalesced(self: &Arc<Self>) -> SharedFetch {
        let mut slot = self.in_flight.lock();
        if let Some(in_flight) = slot.as_ref() {
            debug!(topic = %self.topic, id = in_flight.id, "Joining in-flight refresh");
            return in_flight.fetch.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.load(Ordering::Acquire);
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move { shared.fetch_once(id, epoch).await });
        let abort = handle.abort_handle();
        let fetch = async move { handle.await.unwrap_or(Err(FetchError::Cancelled)) }
            .boxed()
            .shared();

        *slot = Some(InFlight {
            id,
            fetch: fetch.clone(),
            abort,
        });
        self.status.send_modify(|s| s.in_flight = true);
        fetch
    }

    async fn fetch_once(&self, id: u64, epoch: u64) -> RefreshResult {
        debug!(topic = %self.topic, id, "Fetching odds");
        let result = self
            .breaker
            .guard(|| self.fetcher.fetch_games(&self.topic))
            .await
            .map(|games| Arc::new(OddsSnapshot::new(games, Utc::now(), SnapshotSource::Poll)));

        {
            let mut slot = self.in_flight.lock();
            if slot.as_ref().is_some_and(|f| f.id == id) {
                *slot = None;
            }
        }

        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(topic = %self.topic, id, "Ignoring fetch completed after stop");
            return Err(FetchError::Cancelled);
        }

        match &result {
            Ok(snapshot) => {
                let outcome = self.aggregator.apply_snapshot(Arc::clone(snapshot));
                info!(
                    topic = %self.topic,
                    games = snapshot.games().len(),
                    ?outcome,
                    "Refreshed odds"
                );
                self.status.send_modify(|s| {
                    s.in_flight = false;
                    s.healthy = true;
                    s.last_success = Some(snapshot.fetched_at);
                    s.last_error = None;
                });
            }
            Err(err) => {
                self.aggregator.mark_stale();
                if err.is_degraded() {
                    debug!(topic = %self.topic, error = %err, "Refresh skipped, serving stale data");
                } else {
                    warn!(topic = %self.topic, error = %err, "Refresh failed, serving stale data");
                }
                self.status.send_modify(|s| {
                    s.in_flight = false;
                    s.healthy = false;
                    s.last_error = Some(err.clone());
                });
            }
        }
        result
    }

    fn cancel_in_flight(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(in_flight) = self.in_flight.lock().take() {
            in_flight.abort.abort();
            debug!(topic = %self.topic, id = in_flight.id, "Cancelled in-flight refresh");
        }
        self.status.send_modify(|s| s.in_flight = false);
    }
}

/// Holds [`PollStatus::loading`] up while a visible refresh waits.
struct LoadingGuard {
    shared: Arc<PollState>,
}

impl LoadingGuard {
    fn new(shared: &Arc<PollState>) -> Self {
        if shared.visible_waiters.fetch_add(1, Ordering::AcqRel) == 0 {
            shared.status.send_modify(|s| s.loading = true);
        }
        Self {
            shared: Arc::clone(shared),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.shared.visible_waiters.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.status.send_modify(|s| s.loading = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::breaker::CircuitState;
    use crate::infrastructure::config::BreakerConfig;
    use crate::testkit::domain::{bookmaker, game, h2h};
    use crate::testkit::fetcher::ScriptedFetcher;

    fn breaker(threshold: u32) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            "odds-api",
            &BreakerConfig {
                failure_threshold: threshold,
                cooldown_ms: 30_000,
            },
        ))
    }

    fn scheduler(fetcher: &Arc<ScriptedFetcher>, breaker: Arc<CircuitBreaker>) -> PollingScheduler {
        let topic = Topic::sport("basketball_nba");
        let aggregator = Arc::new(OddsAggregator::new(topic.clone()));
        PollingScheduler::new(topic, Arc::clone(fetcher) as Arc<dyn OddsFetcher>, breaker, aggregator)
    }

    fn games() -> Vec<crate::domain::Game> {
        vec![game(
            "g1",
            vec![bookmaker("booka", vec![h2h(&[("Lakers", -110), ("Celtics", -105)])])],
        )]
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_refreshes_share_one_request() {
        let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(200)));
        fetcher.push_games(games());
        let scheduler = Arc::new(scheduler(&fetcher, breaker(5)));

        let first = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.refresh_now(true).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.status().in_flight);
        let second = scheduler.refresh_now(false).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(scheduler.aggregator().current_games().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_refreshes_fetch_again() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_games(games());
        fetcher.push_games(games());
        let scheduler = scheduler(&fetcher, breaker(5));

        scheduler.refresh_now(false).await.unwrap();
        scheduler.refresh_now(false).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_good_data_flagged_stale() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_games(games());
        fetcher.push_error(FetchError::Transport("connection reset".into()));
        let scheduler = scheduler(&fetcher, breaker(5));

        scheduler.refresh_now(false).await.unwrap();
        assert!(scheduler.status().healthy);

        let err = scheduler.refresh_now(false).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));

        let aggregator = scheduler.aggregator();
        assert!(aggregator.is_stale());
        assert_eq!(aggregator.current_games().len(), 1);
        let status = scheduler.status();
        assert!(!status.healthy);
        assert_eq!(status.last_error, Some(err));
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_surfaces_without_upstream_call() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_error(FetchError::Upstream("status: error".into()));
        let breaker = breaker(1);
        let scheduler = scheduler(&fetcher, Arc::clone(&breaker));

        assert!(scheduler.refresh_now(false).await.is_err());
        assert_eq!(breaker.state().state, CircuitState::Open);

        let err = scheduler.refresh_now(true).await.unwrap_err();
        assert!(matches!(err, FetchError::CircuitOpen(_)));
        assert_eq!(fetcher.calls(), 1);
        assert!(scheduler.aggregator().is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fetches_every_interval() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        for _ in 0..4 {
            fetcher.push_games(games());
        }
        let scheduler = scheduler(&fetcher, breaker(5));

        scheduler.start(Duration::from_secs(300));
        scheduler.start(Duration::from_secs(300));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetcher.calls(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(fetcher.calls(), 2);

        scheduler.refresh_now(false).await.unwrap();
        assert_eq!(fetcher.calls(), 3);

        // Manual refresh does not reset the timer.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(fetcher.calls(), 4);
        assert!(scheduler.is_running());

        scheduler.stop();
        assert!(!scheduler.is_running());
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_in_flight_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_secs(5)));
        fetcher.push_games(games());
        let scheduler = Arc::new(scheduler(&fetcher, breaker(5)));

        let pending = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.refresh_now(false).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.stop();

        assert!(matches!(pending.await.unwrap(), Err(FetchError::Cancelled)));
        assert!(scheduler.aggregator().snapshot().is_initial());
        assert!(!scheduler.status().in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn visible_refresh_toggles_loading() {
        let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(100)));
        fetcher.push_games(games());
        let scheduler = Arc::new(scheduler(&fetcher, breaker(5)));
        let mut status = scheduler.subscribe_status();

        let refresh = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.refresh_now(true).await })
        };
        status.wait_for(|s| s.loading).await.unwrap();
        refresh.await.unwrap().unwrap();
        assert!(!scheduler.status().loading);
    }
}
