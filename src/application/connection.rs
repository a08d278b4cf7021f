//! Long-lived push connection with its own reconnect loop.
//!
//! ```text
//! Disconnected ──start──▶ Connecting ──ok──▶ Connected
//!                             ▲   │               │
//!                  backoff ───┘   └─fail          │ close / idle timeout
//!                             ▲                   │
//!                             └───────────────────┘
//! stop() from any state ──▶ Disconnected (terminal)
//! ```
//!
//! Backoff after `N` consecutive failed attempts is
//! `min(base * 2^(N-1), cap)` and is unrelated to the REST circuit breaker.
//! A connect that outlasts `connect_timeout` is a failed attempt. A session
//! that closes within `base` of connecting is one too, so a server that
//! accepts and then hangs up is retried with backoff rather than in a loop.
//! Failures never surface as errors; they only show up in
//! [`ConnectionStatus`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{OddsDelta, Topic};
use crate::error::ConnectionError;
use crate::infrastructure::config::ReconnectConfig;
use crate::port::{PushEvent, PushStream};

/// Connection lifecycle position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Connectivity as shown to a status indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    /// Connecting again after a lost session or failed attempt.
    pub reconnecting: bool,
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Consecutive failed attempts since the last successful connect.
    pub reconnect_attempts: u32,
}

/// Why a connected session ended.
enum SessionEnd {
    /// The session delivered at least one message before closing. Only a
    /// session that also stayed up for `stable_after` resets the backoff.
    Lost(String),
    /// The session closed before delivering anything.
    Dropped(String),
    /// Nobody is reading deltas anymore.
    ConsumerGone,
}

/// Push feed for one topic.
pub struct RealtimeConnection {
    topic: Topic,
    config: ReconnectConfig,
    status: Arc<watch::Sender<ConnectionStatus>>,
    deltas_tx: mpsc::Sender<OddsDelta>,
    deltas_rx: Mutex<Option<mpsc::Receiver<OddsDelta>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl RealtimeConnection {
    #[must_use]
    pub fn new(topic: Topic, config: ReconnectConfig) -> Self {
        let (status, _rx) = watch::channel(ConnectionStatus::default());
        let (deltas_tx, deltas_rx) = mpsc::channel(config.channel_capacity.max(1));
        Self {
            topic,
            config,
            status: Arc::new(status),
            deltas_tx,
            deltas_rx: Mutex::new(Some(deltas_rx)),
            task: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Take the delta receiver. Only the first call returns `Some`.
    pub fn take_deltas(&self) -> Option<mpsc::Receiver<OddsDelta>> {
        self.deltas_rx.lock().take()
    }

    /// Start connecting with `stream`.
    ///
    /// Ignored if the connection is already running or has been stopped.
    pub fn start<S>(&self, stream: S)
    where
        S: PushStream + 'static,
    {
        if self.stopped.load(Ordering::Acquire) {
            debug!(topic = %self.topic, "Connection stopped, not starting");
            return;
        }
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!(topic = %self.topic, "Connection already running");
            return;
        }

        let session = Session {
            topic: self.topic.clone(),
            config: self.config.clone(),
            status: Arc::clone(&self.status),
            deltas: self.deltas_tx.clone(),
        };
        *task = Some(tokio::spawn(session.run(stream)));
    }

    /// Abort any attempt or session and stay disconnected.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!(topic = %self.topic, "Stopped push connection");
        }
        self.status.send_modify(|s| {
            s.state = ConnectionState::Disconnected;
            s.connected = false;
            s.reconnecting = false;
        });
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// State owned by the connection task.
struct Session {
    topic: Topic,
    config: ReconnectConfig,
    status: Arc<watch::Sender<ConnectionStatus>>,
    deltas: mpsc::Sender<OddsDelta>,
}

impl Session {
    async fn run<S: PushStream>(self, mut stream: S) {
        let mut failures: u32 = 0;
        loop {
            self.status.send_modify(|s| {
                s.state = ConnectionState::Connecting;
                s.connected = false;
            });
            debug!(topic = %self.topic, attempt = failures + 1, "Connecting push feed");

            let connect_timeout = self.config.connect_timeout();
            let attempt = tokio::time::timeout(connect_timeout, stream.connect(&self.topic))
                .await
                .unwrap_or_else(|_| {
                    Err(ConnectionError::Connect(format!(
                        "timed out after {}ms",
                        connect_timeout.as_millis()
                    )))
                });

            match attempt {
                Ok(()) => {
                    let connected_at = Instant::now();
                    self.status.send_modify(|s| {
                        s.state = ConnectionState::Connected;
                        s.connected = true;
                        s.reconnecting = false;
                        s.last_connected_at = Some(Utc::now());
                        s.reconnect_attempts = 0;
                    });
                    info!(
                        topic = %self.topic,
                        provider = stream.provider_name(),
                        "Push feed connected"
                    );

                    match self.pump(&mut stream).await {
                        SessionEnd::ConsumerGone => {
                            debug!(topic = %self.topic, "Delta consumer gone, closing push feed");
                            self.status.send_modify(|s| {
                                s.state = ConnectionState::Disconnected;
                                s.connected = false;
                                s.reconnecting = false;
                            });
                            return;
                        }
                        SessionEnd::Lost(reason)
                            if connected_at.elapsed() >= self.config.stable_after() =>
                        {
                            failures = 0;
                            warn!(topic = %self.topic, reason = %reason, "Push feed lost, reconnecting");
                            self.status.send_modify(|s| s.reconnecting = true);
                            continue;
                        }
                        SessionEnd::Lost(reason) => {
                            // Too short to trust; keep backing off.
                            failures = failures.saturating_add(1);
                            warn!(
                                topic = %self.topic,
                                reason = %reason,
                                attempt = failures,
                                "Push feed closed shortly after connecting"
                            );
                        }
                        SessionEnd::Dropped(reason) => {
                            // A session that never delivered anything counts as a failed attempt.
                            failures = failures.saturating_add(1);
                            warn!(
                                topic = %self.topic,
                                reason = %reason,
                                attempt = failures,
                                "Push feed closed before any message"
                            );
                        }
                    }
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    warn!(topic = %self.topic, attempt = failures, error = %err, "Push connect failed");
                }
            }

            let delay = self.config.backoff(failures);
            self.status.send_modify(|s| {
                s.state = ConnectionState::Connecting;
                s.connected = false;
                s.reconnecting = true;
                s.reconnect_attempts = failures;
            });
            debug!(
                topic = %self.topic,
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                "Backing off before reconnect"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn pump<S: PushStream>(&self, stream: &mut S) -> SessionEnd {
        let idle_timeout = self.config.idle_timeout();
        let mut delivered = false;
        loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, stream.next_event()).await {
                    Ok(event) => event,
                    Err(_) => {
                        return self.end(delivered, format!("no message for {}ms", limit.as_millis()));
                    }
                },
                None => stream.next_event().await,
            };

            match next {
                Some(PushEvent::Delta(delta)) => {
                    delivered = true;
                    if self.deltas.send(delta).await.is_err() {
                        return SessionEnd::ConsumerGone;
                    }
                }
                Some(PushEvent::Heartbeat) => {
                    delivered = true;
                    debug!(topic = %self.topic, "Push heartbeat");
                }
                Some(PushEvent::Disconnected { reason }) => return self.end(delivered, reason),
                None => return self.end(delivered, "stream ended".to_string()),
            }
        }
    }

    fn end(&self, delivered: bool, reason: String) -> SessionEnd {
        self.status.send_modify(|s| {
            s.state = ConnectionState::Disconnected;
            s.connected = false;
        });
        if delivered {
            SessionEnd::Lost(reason)
        } else {
            SessionEnd::Dropped(reason)
        }
    }
}
