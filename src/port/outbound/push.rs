//! Push channel port.

use async_trait::async_trait;

use crate::domain::{OddsDelta, Topic};
use crate::error::ConnectionError;

/// Events received from a push stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Partial odds update for one bookmaker's market.
    Delta(OddsDelta),
    /// Keepalive from the server; carries no data.
    Heartbeat,
    /// The connection was lost.
    Disconnected {
        /// Human-readable reason.
        reason: String,
    },
}

/// Long-lived push connection to the odds provider.
///
/// The same stream is reconnected by calling [`connect`](Self::connect)
/// again after it reports a disconnect or ends.
#[async_trait]
pub trait PushStream: Send {
    /// Open (or reopen) the connection and subscribe to `topic`.
    async fn connect(&mut self, topic: &Topic) -> Result<(), ConnectionError>;

    /// Receive the next event.
    ///
    /// Blocks until an event is available. Returns `None` when the stream is
    /// closed.
    async fn next_event(&mut self) -> Option<PushEvent>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl PushStream for Box<dyn PushStream> {
    async fn connect(&mut self, topic: &Topic) -> Result<(), ConnectionError> {
        (**self).connect(topic).await
    }

    async fn next_event(&mut self) -> Option<PushEvent> {
        (**self).next_event().await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
