//! Circuit breaker guarding an upstream dependency.
//!
//! # States
//!
//! ```text
//! Closed ──(failures == threshold)──▶ Open
//! Open ──(now >= next_probe_at, next call)──▶ HalfOpen (one probe admitted)
//! HalfOpen ──(probe ok)──▶ Closed
//! HalfOpen ──(probe failed)──▶ Open (same cooldown)
//! ```
//!
//! One breaker instance guards one upstream endpoint and is shared by every
//! caller of that endpoint. The breaker has no backoff growth of its own;
//! cooldown is constant.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{CircuitOpenError, FetchError};
use crate::infrastructure::config::BreakerConfig;

/// Gate position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast until the cooldown expires.
    Open,
    /// One probe call is allowed to test recovery.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Observable breaker state, for a degraded-service banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
    pub next_probe_at: Option<Instant>,
}

impl CircuitBreakerState {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            next_probe_at: None,
        }
    }

    /// Whether callers should present the dependency as degraded.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !matches!(self.state, CircuitState::Closed)
    }
}

/// Decides which operation errors count toward opening the circuit.
pub trait FailureClass {
    fn counts_as_failure(&self) -> bool {
        true
    }
}

impl FailureClass for FetchError {
    fn counts_as_failure(&self) -> bool {
        FetchError::counts_as_failure(self)
    }
}

struct Inner {
    state: CircuitBreakerState,
    probe_in_flight: bool,
}

/// Three-state circuit breaker.
pub struct CircuitBreaker {
    endpoint: &'static str,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
    tx: watch::Sender<CircuitBreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker for `endpoint`.
    #[must_use]
    pub fn new(endpoint: &'static str, config: &BreakerConfig) -> Self {
        let (tx, _rx) = watch::channel(CircuitBreakerState::closed());
        Self {
            endpoint,
            failure_threshold: config.failure_threshold.max(1),
            cooldown: config.cooldown(),
            inner: Mutex::new(Inner {
                state: CircuitBreakerState::closed(),
                probe_in_flight: false,
            }),
            tx,
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        self.inner.lock().state
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CircuitBreakerState> {
        self.tx.subscribe()
    }

    /// Run `operation` if the breaker admits it and record its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitOpenError`] (converted into `E`) without running the
    /// operation when the circuit is open or a half-open probe is already
    /// running. Otherwise returns the operation's own result.
    pub async fn guard<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError> + FailureClass,
    {
        let permit = self.admit()?;
        let result = operation().await;
        match &result {
            Ok(_) => permit.succeeded(),
            Err(err) if err.counts_as_failure() => permit.failed(),
            Err(_) => permit.release(),
        }
        result
    }

    fn admit(&self) -> Result<Permit<'_>, CircuitOpenError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        match inner.state.state {
            CircuitState::Closed => Ok(Permit::new(self, false)),
            CircuitState::Open => {
                let next_probe_at = inner.state.next_probe_at.unwrap_or(now);
                if now < next_probe_at {
                    return Err(self.rejection(next_probe_at - now));
                }
                inner.state.state = CircuitState::HalfOpen;
                inner.probe_in_flight = true;
                info!(endpoint = self.endpoint, "Circuit half-open, admitting probe");
                self.publish(&inner);
                Ok(Permit::new(self, true))
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    debug!(endpoint = self.endpoint, "Probe in flight, rejecting call");
                    return Err(self.rejection(Duration::ZERO));
                }
                inner.probe_in_flight = true;
                Ok(Permit::new(self, true))
            }
        }
    }

    const fn rejection(&self, retry_in: Duration) -> CircuitOpenError {
        CircuitOpenError {
            endpoint: self.endpoint,
            retry_in,
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.inner.lock();
        match inner.state.state {
            CircuitState::Closed => {
                if inner.state.consecutive_failures == 0 {
                    return;
                }
                inner.state.consecutive_failures = 0;
            }
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                inner.state = CircuitBreakerState::closed();
                info!(endpoint = self.endpoint, "Probe succeeded, circuit closed");
            }
            // A call admitted before the circuit opened; only the probe decides.
            CircuitState::HalfOpen | CircuitState::Open => return,
        }
        self.publish(&inner);
    }

    fn on_failure(&self, probe: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.state.consecutive_failures = inner.state.consecutive_failures.saturating_add(1);

        match inner.state.state {
            CircuitState::Closed => {
                if inner.state.consecutive_failures >= self.failure_threshold {
                    self.open(&mut inner, now);
                    warn!(
                        endpoint = self.endpoint,
                        failures = inner.state.consecutive_failures,
                        cooldown_ms = self.cooldown.as_millis() as u64,
                        "Circuit breaker tripped"
                    );
                }
            }
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                self.open(&mut inner, now);
                warn!(
                    endpoint = self.endpoint,
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    "Probe failed, circuit reopened"
                );
            }
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
        self.publish(&inner);
    }

    fn on_release(&self, probe: bool) {
        if !probe {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
            debug!(endpoint = self.endpoint, "Probe abandoned, slot released");
        }
    }

    fn open(&self, inner: &mut Inner, now: Instant) {
        inner.state.state = CircuitState::Open;
        inner.state.opened_at = Some(now);
        inner.state.next_probe_at = Some(now + self.cooldown);
    }

    fn publish(&self, inner: &Inner) {
        self.tx.send_replace(inner.state);
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("endpoint", &self.endpoint)
            .field("failure_threshold", &self.failure_threshold)
            .field("cooldown", &self.cooldown)
            .field("state", &self.state())
            .finish()
    }
}

/// Admission ticket for one guarded call.
///
/// Dropping a permit without recording an outcome (the caller's future was
/// cancelled) releases a probe slot without changing the state.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    const fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    fn succeeded(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    fn failed(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }

    fn release(mut self) {
        self.settled = true;
        self.breaker.on_release(self.probe);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_release(self.probe);
        }
    }
}
