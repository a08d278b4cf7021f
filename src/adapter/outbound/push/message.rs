//! Push channel wire messages.
//!
//! Frames are JSON text tagged by `type`:
//!
//! ```json
//! {"type":"odds_delta","game_id":"g1","bookmaker_key":"draftkings","market":"h2h","outcomes":[{"name":"Lakers","price":-105}]}
//! {"type":"heartbeat"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::OddsDelta;
use crate::port::PushEvent;

/// Subscription request sent after connecting.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage<'a> {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub topic: &'a str,
}

impl<'a> SubscribeMessage<'a> {
    #[must_use]
    pub const fn new(topic: &'a str) -> Self {
        Self {
            msg_type: "subscribe",
            topic,
        }
    }
}

/// Messages received from the push channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    OddsDelta(OddsDelta),
    Heartbeat,
    /// Any other message type; ignored.
    #[serde(other)]
    Unknown,
}

impl PushMessage {
    /// Convert into a push event. Unknown messages yield `None`.
    #[must_use]
    pub fn into_event(self) -> Option<PushEvent> {
        match self {
            Self::OddsDelta(delta) => Some(PushEvent::Delta(delta)),
            Self::Heartbeat => Some(PushEvent::Heartbeat),
            Self::Unknown => None,
        }
    }
}
