//! Best-price read model for one topic.
//!
//! The aggregator holds the current generation behind an `Arc`. Poll
//! snapshots replace it wholesale; push deltas edit it copy-on-write, so a
//! [`GamesView`] obtained before a delta keeps seeing the generation it was
//! taken from.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::domain::{
    BestPriceView, DeltaOutcome, Game, GameId, OddsDelta, OddsSnapshot, SnapshotSource,
    SpreadLine, StaleDataWarning, Topic, TotalLine,
};

/// Notification sent when the read model changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatorUpdate {
    /// A new generation replaced the previous one.
    Generation { games: usize },
    /// A delta changed one game.
    Delta { game_id: GameId },
    /// The current generation is being served past a failed refresh.
    Stale,
}

/// Result of offering a poll snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied,
    /// Older than the generation already held; ignored.
    Discarded,
}

/// Ordered, restartable view of one generation's games.
#[derive(Debug, Clone)]
pub struct GamesView {
    snapshot: Arc<OddsSnapshot>,
}

impl GamesView {
    pub fn iter(&self) -> std::slice::Iter<'_, Game> {
        self.snapshot.games().iter()
    }

    #[must_use]
    pub fn get(&self, id: &GameId) -> Option<&Game> {
        self.snapshot.game(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.games().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// The generation this view was taken from.
    #[must_use]
    pub fn snapshot(&self) -> &OddsSnapshot {
        &self.snapshot
    }
}

impl<'a> IntoIterator for &'a GamesView {
    type Item = &'a Game;
    type IntoIter = std::slice::Iter<'a, Game>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Merges poll snapshots and push deltas into best-price views.
pub struct OddsAggregator {
    topic: Topic,
    current: RwLock<Arc<OddsSnapshot>>,
    tx: Option<broadcast::Sender<AggregatorUpdate>>,
}

impl OddsAggregator {
    /// Create an empty aggregator without notifications.
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            current: RwLock::new(Arc::new(OddsSnapshot::empty())),
            tx: None,
        }
    }

    /// Create an empty aggregator with broadcast notifications.
    #[must_use]
    pub fn with_notifications(
        topic: Topic,
        capacity: usize,
    ) -> (Self, broadcast::Receiver<AggregatorUpdate>) {
        let (tx, rx) = broadcast::channel(capacity);
        let aggregator = Self {
            topic,
            current: RwLock::new(Arc::new(OddsSnapshot::empty())),
            tx: Some(tx),
        };
        (aggregator, rx)
    }

    /// Subscribe to update notifications.
    ///
    /// Returns `None` if the aggregator was created without notifications.
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<AggregatorUpdate>> {
        self.tx.as_ref().map(broadcast::Sender::subscribe)
    }

    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Replace the current generation.
    ///
    /// Generations apply in completion order: a snapshot fetched before the
    /// one already held is discarded. Applying an identical snapshot again
    /// leaves best prices unchanged.
    pub fn apply_snapshot(&self, snapshot: impl Into<Arc<OddsSnapshot>>) -> SnapshotOutcome {
        let snapshot = snapshot.into();
        let games = snapshot.games().len();
        {
            let mut current = self.current.write();
            if !current.is_initial() && snapshot.fetched_at < current.fetched_at {
                debug!(
                    topic = %self.topic,
                    late = %snapshot.fetched_at,
                    held = %current.fetched_at,
                    "Discarding out-of-order snapshot"
                );
                return SnapshotOutcome::Discarded;
            }
            *current = snapshot;
        }
        debug!(topic = %self.topic, games, "Applied snapshot generation");
        self.notify(AggregatorUpdate::Generation { games });
        SnapshotOutcome::Applied
    }

    /// Apply a push delta to the current generation.
    ///
    /// Only the addressed bookmaker's market changes, and only the best
    /// prices for that market's outcomes (before and after the update) are
    /// recomputed.
    pub fn apply_delta(&self, delta: OddsDelta) -> DeltaOutcome {
        let game_id = delta.game_id.clone();
        let outcome = {
            let mut current = self.current.write();
            if current.game(&game_id).is_none() {
                return DeltaOutcome::UnknownGame;
            }
            let known_bookmaker = current
                .game(&game_id)
                .and_then(|g| g.bookmaker(&delta.bookmaker_key))
                .is_some();
            if !known_bookmaker {
                return DeltaOutcome::UnknownBookmaker;
            }

            let snapshot = Arc::make_mut(&mut *current);
            let Some((game, best)) = snapshot.game_mut(&game_id) else {
                return DeltaOutcome::UnknownGame;
            };
            let Some(bookmaker) = game.bookmaker_mut(&delta.bookmaker_key) else {
                return DeltaOutcome::UnknownBookmaker;
            };

            let market_key = delta.market.clone();
            let timestamp = delta.timestamp.unwrap_or_else(Utc::now);
            let mut affected: BTreeSet<String> =
                delta.outcomes.iter().map(|o| o.name.clone()).collect();
            if let Some(previous) = bookmaker.replace_market(delta.into_market()) {
                affected.extend(previous.outcomes.into_iter().map(|o| o.name));
            }
            bookmaker.last_update = Some(timestamp);

            for name in &affected {
                best.recompute(game, &market_key, name);
            }
            snapshot.source = SnapshotSource::Push;

            trace!(
                topic = %self.topic,
                game = %game_id,
                market = %market_key,
                recomputed = affected.len(),
                "Applied delta"
            );
            DeltaOutcome::Applied {
                recomputed: affected.len(),
            }
        };
        self.notify(AggregatorUpdate::Delta { game_id });
        outcome
    }

    /// Flag the held generation as stale after a failed refresh.
    pub fn mark_stale(&self) {
        {
            let mut current = self.current.write();
            if current.stale {
                return;
            }
            Arc::make_mut(&mut *current).stale = true;
        }
        self.notify(AggregatorUpdate::Stale);
    }

    /// Best price for an outcome, or `None` when no bookmaker offers it.
    #[must_use]
    pub fn best_price(&self, game: &GameId, market: &str, outcome: &str) -> Option<BestPriceView> {
        self.current.read().best_price(game, market, outcome).cloned()
    }

    /// Games of the current generation, in provider order.
    #[must_use]
    pub fn current_games(&self) -> GamesView {
        GamesView {
            snapshot: self.snapshot(),
        }
    }

    /// The current generation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<OddsSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Spread line for a game, from the first bookmaker quoting it.
    #[must_use]
    pub fn spread(&self, game: &GameId) -> Option<SpreadLine> {
        self.current.read().game(game)?.spread()
    }

    /// Total line for a game, from the first bookmaker quoting it.
    #[must_use]
    pub fn total(&self, game: &GameId) -> Option<TotalLine> {
        self.current.read().game(game)?.total()
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.current.read().stale
    }

    /// A warning when the held generation is older than `interval`.
    #[must_use]
    pub fn freshness(&self, interval: Duration) -> Option<StaleDataWarning> {
        self.current.read().staleness(Utc::now(), interval)
    }

    fn notify(&self, update: AggregatorUpdate) {
        // No receivers is fine.
        if let Some(ref tx) = self.tx {
            let _ = tx.send(update);
        }
    }
}
