//! Snapshot generations and best-price computation.
//!
//! An [`OddsSnapshot`] is one complete generation of games plus the best
//! price for every (game, market, outcome) it contains. Best prices are
//! computed when the generation is built, by scanning every bookmaker once.
//!
//! Best price is the numerically greatest American-odds value. Ties go to
//! the bookmaker that appears first in provider order, so the answer is
//! deterministic for a given input.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::game::Game;
use super::id::{BookmakerKey, GameId};

/// Where the current contents of a generation last came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Poll,
    Push,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll => write!(f, "poll"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// The best price for one outcome and the bookmaker offering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestPriceView {
    pub price: i32,
    pub bookmaker_key: BookmakerKey,
    pub bookmaker_title: String,
}

/// Best prices for one game, keyed by market then outcome name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameBestPrices {
    markets: HashMap<String, HashMap<String, BestPriceView>>,
}

impl GameBestPrices {
    /// Scan every bookmaker of `game` in provider order.
    #[must_use]
    pub fn compute(game: &Game) -> Self {
        let mut best = Self::default();
        for bookmaker in &game.bookmakers {
            for market in &bookmaker.markets {
                let outcomes = best.markets.entry(market.key.clone()).or_default();
                for outcome in &market.outcomes {
                    match outcomes.get(&outcome.name) {
                        Some(current) if current.price >= outcome.price => {}
                        _ => {
                            outcomes.insert(
                                outcome.name.clone(),
                                BestPriceView {
                                    price: outcome.price,
                                    bookmaker_key: bookmaker.key.clone(),
                                    bookmaker_title: bookmaker.title.clone(),
                                },
                            );
                        }
                    }
                }
            }
        }
        best.markets.retain(|_, outcomes| !outcomes.is_empty());
        best
    }

    #[must_use]
    pub fn get(&self, market: &str, outcome: &str) -> Option<&BestPriceView> {
        self.markets.get(market)?.get(outcome)
    }

    /// Recompute a single key against `game`, removing it when no bookmaker
    /// offers the outcome any more.
    pub(crate) fn recompute(&mut self, game: &Game, market: &str, outcome: &str) {
        match best_for(game, market, outcome) {
            Some(view) => {
                self.markets
                    .entry(market.to_string())
                    .or_default()
                    .insert(outcome.to_string(), view);
            }
            None => {
                if let Some(outcomes) = self.markets.get_mut(market) {
                    outcomes.remove(outcome);
                    if outcomes.is_empty() {
                        self.markets.remove(market);
                    }
                }
            }
        }
    }

    /// Number of (market, outcome) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Same rule as [`GameBestPrices::compute`], restricted to one key: every
/// market and outcome with a matching name counts, first seen wins ties.
fn best_for(game: &Game, market: &str, outcome: &str) -> Option<BestPriceView> {
    let mut best: Option<BestPriceView> = None;
    for bookmaker in &game.bookmakers {
        let offered = bookmaker
            .markets
            .iter()
            .filter(|m| m.key == market)
            .flat_map(|m| m.outcomes.iter())
            .filter(|o| o.name == outcome);
        for o in offered {
            if best.as_ref().map_or(true, |b| o.price > b.price) {
                best = Some(BestPriceView {
                    price: o.price,
                    bookmaker_key: bookmaker.key.clone(),
                    bookmaker_title: bookmaker.title.clone(),
                });
            }
        }
    }
    best
}

/// Signal that the data being served is older than one refresh interval.
/// Not a failure; the data is still the last known good generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleDataWarning {
    pub age: Duration,
    pub interval: Duration,
}

impl fmt::Display for StaleDataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "odds are {}s old (refresh interval {}s)",
            self.age.as_secs(),
            self.interval.as_secs()
        )
    }
}

/// One complete, atomically replaced generation of odds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsSnapshot {
    games: Vec<Game>,
    #[serde(skip)]
    index: HashMap<GameId, usize>,
    per_game: HashMap<GameId, GameBestPrices>,
    pub fetched_at: DateTime<Utc>,
    pub source: SnapshotSource,
    pub stale: bool,
}

impl OddsSnapshot {
    /// Build a generation and its best-price views.
    ///
    /// Games keep provider order. A repeated game id keeps its first
    /// occurrence.
    #[must_use]
    pub fn new(games: Vec<Game>, fetched_at: DateTime<Utc>, source: SnapshotSource) -> Self {
        let mut index = HashMap::with_capacity(games.len());
        let mut kept = Vec::with_capacity(games.len());
        for game in games {
            if index.contains_key(&game.id) {
                continue;
            }
            index.insert(game.id.clone(), kept.len());
            kept.push(game);
        }

        let per_game = kept
            .iter()
            .map(|game| (game.id.clone(), GameBestPrices::compute(game)))
            .collect();

        Self {
            games: kept,
            index,
            per_game,
            fetched_at,
            source,
            stale: false,
        }
    }

    /// An empty generation used before the first fetch lands.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), DateTime::<Utc>::MIN_UTC, SnapshotSource::Poll)
    }

    #[must_use]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    #[must_use]
    pub fn game(&self, id: &GameId) -> Option<&Game> {
        self.index.get(id).map(|&i| &self.games[i])
    }

    #[must_use]
    pub fn per_game(&self) -> &HashMap<GameId, GameBestPrices> {
        &self.per_game
    }

    #[must_use]
    pub fn best_price(&self, game: &GameId, market: &str, outcome: &str) -> Option<&BestPriceView> {
        self.per_game.get(game)?.get(market, outcome)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Whether this generation has never been filled by a fetch.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.fetched_at == DateTime::<Utc>::MIN_UTC
    }

    /// A warning when the generation is older than `interval` at `now`.
    #[must_use]
    pub fn staleness(&self, now: DateTime<Utc>, interval: Duration) -> Option<StaleDataWarning> {
        if self.is_initial() {
            return None;
        }
        let age = (now - self.fetched_at).to_std().unwrap_or_default();
        (age > interval).then_some(StaleDataWarning { age, interval })
    }

    /// Mutable access to one game together with its best-price entry.
    pub(crate) fn game_mut(&mut self, id: &GameId) -> Option<(&mut Game, &mut GameBestPrices)> {
        let &i = self.index.get(id)?;
        let best = self.per_game.get_mut(id)?;
        Some((&mut self.games[i], best))
    }
}
