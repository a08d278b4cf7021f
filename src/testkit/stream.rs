//! Mock [`PushStream`] implementations for testing.
//!
//! - [`ScriptedPushStream`]: pre-loaded connect results and events. Best
//!   for reconnect and backoff behavior.
//! - [`ChannelPushStream`]: events fed on demand through a handle. Best for
//!   integration tests that interleave polls and pushes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::Topic;
use crate::error::ConnectionError;
use crate::port::{PushEvent, PushStream};

/// Shared call counter that outlives the stream it was taken from.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU32>);

impl Counter {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// ScriptedPushStream
// ---------------------------------------------------------------------------

/// A mock stream with scripted connect results and one event queue shared
/// by every session.
///
/// `connect()` pops the next result (`Ok(())` when exhausted). A `None`
/// entry in the event queue closes the session; an empty queue keeps the
/// session open and silent.
pub struct ScriptedPushStream {
    connect_results: VecDeque<Result<(), ConnectionError>>,
    events: VecDeque<Option<PushEvent>>,
    connect_delay: Duration,
    connects: Counter,
    topics: Arc<Mutex<Vec<Topic>>>,
}

impl ScriptedPushStream {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            events: VecDeque::new(),
            connect_delay: Duration::ZERO,
            connects: Counter::default(),
            topics: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<(), ConnectionError>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<Option<PushEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Delay every connect attempt.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Counter of connect attempts.
    pub fn connect_counter(&self) -> Counter {
        self.connects.clone()
    }

    /// Topics passed to `connect`, shared with the stream.
    pub fn subscribed_topics(&self) -> Arc<Mutex<Vec<Topic>>> {
        Arc::clone(&self.topics)
    }
}

impl Default for ScriptedPushStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushStream for ScriptedPushStream {
    async fn connect(&mut self, topic: &Topic) -> Result<(), ConnectionError> {
        self.connects.bump();
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        self.topics.lock().push(topic.clone());
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<PushEvent> {
        match self.events.pop_front() {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// ChannelPushStream
// ---------------------------------------------------------------------------

/// A stream whose events come from a [`PushHandle`].
///
/// Connecting always succeeds. Dropping every handle ends the session.
pub struct ChannelPushStream {
    rx: mpsc::UnboundedReceiver<PushEvent>,
    connects: Counter,
}

/// Sender side of a [`ChannelPushStream`].
#[derive(Clone)]
pub struct PushHandle {
    tx: mpsc::UnboundedSender<PushEvent>,
}

impl PushHandle {
    /// Deliver an event. Returns `false` once the stream is gone.
    pub fn send(&self, event: PushEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl ChannelPushStream {
    pub fn new() -> (Self, PushHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx,
                connects: Counter::default(),
            },
            PushHandle { tx },
        )
    }

    pub fn connect_counter(&self) -> Counter {
        self.connects.clone()
    }
}

#[async_trait]
impl PushStream for ChannelPushStream {
    async fn connect(&mut self, _topic: &Topic) -> Result<(), ConnectionError> {
        self.connects.bump();
        Ok(())
    }

    async fn next_event(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    fn provider_name(&self) -> &'static str {
        "channel"
    }
}
