//! Scripted [`OddsFetcher`] for scheduler and hub tests.
//!
//! Responses are popped in order. Once the games script runs out, the last
//! successful game list is served again, like a steady upstream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{Game, Sport, Topic};
use crate::error::FetchError;
use crate::port::OddsFetcher;

pub struct ScriptedFetcher {
    games: Mutex<VecDeque<Result<Vec<Game>, FetchError>>>,
    last_games: Mutex<Vec<Game>>,
    sports: Mutex<VecDeque<Result<Vec<Sport>, FetchError>>>,
    delay: Duration,
    calls: AtomicU32,
    sports_calls: AtomicU32,
    topics: Mutex<Vec<Topic>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            games: Mutex::new(VecDeque::new()),
            last_games: Mutex::new(Vec::new()),
            sports: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            sports_calls: AtomicU32::new(0),
            topics: Mutex::new(Vec::new()),
        }
    }

    /// Simulate upstream latency on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_games(&self, games: Vec<Game>) {
        self.games.lock().push_back(Ok(games));
    }

    pub fn push_error(&self, error: FetchError) {
        self.games.lock().push_back(Err(error));
    }

    pub fn push_sports(&self, result: Result<Vec<Sport>, FetchError>) {
        self.sports.lock().push_back(result);
    }

    /// Game fetches that reached the fetcher.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sports_calls(&self) -> u32 {
        self.sports_calls.load(Ordering::SeqCst)
    }

    /// Topics requested, in call order.
    pub fn requested_topics(&self) -> Vec<Topic> {
        self.topics.lock().clone()
    }
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OddsFetcher for ScriptedFetcher {
    async fn fetch_games(&self, topic: &Topic) -> Result<Vec<Game>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().push(topic.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.games.lock().pop_front();
        match next {
            Some(Ok(games)) => {
                *self.last_games.lock() = games.clone();
                Ok(games)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.last_games.lock().clone()),
        }
    }

    async fn fetch_sports(&self) -> Result<Vec<Sport>, FetchError> {
        self.sports_calls.fetch_add(1, Ordering::SeqCst);
        self.sports.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn endpoint_name(&self) -> &'static str {
        "scripted"
    }
}
