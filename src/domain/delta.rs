//! Incremental odds updates delivered over the push channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::{Market, Outcome};
use super::id::{BookmakerKey, GameId};

/// A partial update: one bookmaker's full outcome list for one market of
/// one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsDelta {
    pub game_id: GameId,
    pub bookmaker_key: BookmakerKey,
    pub market: String,
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl OddsDelta {
    pub(crate) fn into_market(self) -> Market {
        Market::new(self.market, self.outcomes)
    }
}

/// What happened when a delta was offered to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// The bookmaker's market was replaced; this many best-price keys were
    /// recomputed.
    Applied { recomputed: usize },
    /// The game is not part of the current generation.
    UnknownGame,
    /// The game exists but the bookmaker does not quote it in this generation.
    UnknownBookmaker,
}
