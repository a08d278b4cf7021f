//! Games and the per-bookmaker price data nested inside them.
//!
//! A [`Game`] is replaced wholesale on every refresh; nothing in this module
//! patches one generation with data from another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BookmakerKey, GameId};
use super::line::{SpreadLine, TotalLine};

/// Moneyline market key.
pub const H2H: &str = "h2h";
/// Point-spread market key.
pub const SPREADS: &str = "spreads";
/// Over/under market key.
pub const TOTALS: &str = "totals";

const OVER: &str = "Over";
const UNDER: &str = "Under";

/// A single priced outcome within a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    /// American odds.
    pub price: i32,
    /// Line value; only present for spread and total markets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
}

impl Outcome {
    pub fn new(name: impl Into<String>, price: i32) -> Self {
        Self {
            name: name.into(),
            price,
            point: None,
        }
    }

    #[must_use]
    pub fn with_point(mut self, point: f64) -> Self {
        self.point = Some(point);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// `h2h`, `spreads`, `totals`, ...
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl Market {
    pub fn new(key: impl Into<String>, outcomes: Vec<Outcome>) -> Self {
        Self {
            key: key.into(),
            outcomes,
        }
    }

    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// One upstream provider's prices for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub key: BookmakerKey,
    pub title: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub markets: Vec<Market>,
}

impl Bookmaker {
    #[must_use]
    pub fn market(&self, key: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.key == key)
    }

    /// Replace (or add) the market with the same key.
    pub(crate) fn replace_market(&mut self, market: Market) -> Option<Market> {
        match self.markets.iter_mut().find(|m| m.key == market.key) {
            Some(existing) => Some(std::mem::replace(existing, market)),
            None => {
                self.markets.push(market);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub sport_key: String,
    #[serde(rename = "commence_time", alias = "start_time")]
    pub start_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    /// Provider-supplied order; it decides best-price ties.
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

impl Game {
    #[must_use]
    pub fn bookmaker(&self, key: &BookmakerKey) -> Option<&Bookmaker> {
        self.bookmakers.iter().find(|b| &b.key == key)
    }

    pub(crate) fn bookmaker_mut(&mut self, key: &BookmakerKey) -> Option<&mut Bookmaker> {
        self.bookmakers.iter_mut().find(|b| &b.key == key)
    }

    /// Spread line from the first bookmaker quoting both sides.
    ///
    /// Points and prices always come from the same bookmaker; lines are never
    /// mixed across providers.
    #[must_use]
    pub fn spread(&self) -> Option<SpreadLine> {
        self.bookmakers.iter().find_map(|bookmaker| {
            let market = bookmaker.market(SPREADS)?;
            let home = market.outcome(&self.home_team)?;
            let away = market.outcome(&self.away_team)?;
            Some(SpreadLine {
                bookmaker_title: bookmaker.title.clone(),
                home_point: home.point?,
                home_price: home.price,
                away_point: away.point?,
                away_price: away.price,
            })
        })
    }

    /// Total (over/under) line from the first bookmaker quoting both sides.
    #[must_use]
    pub fn total(&self) -> Option<TotalLine> {
        self.bookmakers.iter().find_map(|bookmaker| {
            let market = bookmaker.market(TOTALS)?;
            let over = market.outcome(OVER)?;
            let under = market.outcome(UNDER)?;
            Some(TotalLine {
                bookmaker_title: bookmaker.title.clone(),
                over_point: over.point?,
                over_price: over.price,
                under_point: under.point?,
                under_price: under.price,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{bookmaker, game};

    #[test]
    fn spread_comes_from_first_bookmaker_with_the_market() {
        let g = game(
            "g1",
            vec![
                bookmaker("a", vec![Market::new(H2H, vec![Outcome::new("Lakers", -110)])]),
                bookmaker(
                    "b",
                    vec![Market::new(
                        SPREADS,
                        vec![
                            Outcome::new("Lakers", -105).with_point(-3.5),
                            Outcome::new("Celtics", -115).with_point(3.5),
                        ],
                    )],
                ),
                bookmaker(
                    "c",
                    vec![Market::new(
                        SPREADS,
                        vec![
                            Outcome::new("Lakers", 100).with_point(-2.5),
                            Outcome::new("Celtics", -120).with_point(2.5),
                        ],
                    )],
                ),
            ],
        );

        let spread = g.spread().unwrap();
        assert_eq!(spread.bookmaker_title, "B");
        assert_eq!(spread.home_point, -3.5);
        assert_eq!(spread.home_price, -105);
        assert_eq!(spread.away_point, 3.5);
        assert_eq!(spread.away_price, -115);
    }

    #[test]
    fn total_skips_one_sided_lines() {
        let g = game(
            "g1",
            vec![
                bookmaker(
                    "a",
                    vec![Market::new(TOTALS, vec![Outcome::new("Over", -110).with_point(220.5)])],
                ),
                bookmaker(
                    "b",
                    vec![Market::new(
                        TOTALS,
                        vec![
                            Outcome::new("Over", -108).with_point(221.0),
                            Outcome::new("Under", -112).with_point(221.0),
                        ],
                    )],
                ),
            ],
        );

        let total = g.total().unwrap();
        assert_eq!(total.bookmaker_title, "B");
        assert_eq!(total.over_point, 221.0);
        assert_eq!(total.under_price, -112);
    }

    #[test]
    fn no_lines_without_markets() {
        let g = game("g1", vec![]);
        assert!(g.spread().is_none());
        assert!(g.total().is_none());
    }

    #[test]
    fn deserializes_provider_payload() {
        let json = r#"{
            "id": "abc",
            "sport_key": "basketball_nba",
            "commence_time": "2026-01-05T00:10:00Z",
            "home_team": "Lakers",
            "away_team": "Celtics",
            "bookmakers": [{
                "key": "draftkings",
                "title": "DraftKings",
                "last_update": "2026-01-04T20:00:00Z",
                "markets": [{"key": "spreads", "outcomes": [
                    {"name": "Lakers", "price": -110, "point": -2.5},
                    {"name": "Celtics", "price": -110, "point": 2.5}
                ]}]
            }]
        }"#;
        let g: Game = serde_json::from_str(json).unwrap();
        assert_eq!(g.id.as_str(), "abc");
        assert_eq!(g.bookmakers[0].markets[0].outcomes[0].point, Some(-2.5));
        assert_eq!(g.spread().unwrap().bookmaker_title, "DraftKings");
    }
}
