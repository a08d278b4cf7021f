//! Builders for domain primitives used across tests.
//!
//! Every built game is Lakers (home) vs Celtics (away) in
//! `basketball_nba`. Bookmaker titles are the uppercased key.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{
    Bookmaker, BookmakerKey, Game, GameId, Market, OddsDelta, OddsSnapshot, Outcome,
    SnapshotSource, Sport, H2H,
};

/// Tip-off used for every built game.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 10, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Create a moneyline market from `(outcome, price)` pairs.
pub fn h2h(prices: &[(&str, i32)]) -> Market {
    Market::new(
        H2H,
        prices.iter().map(|(name, price)| Outcome::new(*name, *price)).collect(),
    )
}

/// Create a bookmaker titled with its uppercased key.
pub fn bookmaker(key: &str, markets: Vec<Market>) -> Bookmaker {
    Bookmaker {
        key: BookmakerKey::from(key),
        title: key.to_uppercase(),
        last_update: None,
        markets,
    }
}

/// Create a Lakers vs Celtics game.
pub fn game(id: &str, bookmakers: Vec<Bookmaker>) -> Game {
    Game {
        id: GameId::from(id),
        sport_key: "basketball_nba".to_string(),
        start_time: start_time(),
        home_team: "Lakers".to_string(),
        away_team: "Celtics".to_string(),
        bookmakers,
    }
}

/// Create a poll snapshot fetched at `fetched_at`.
pub fn poll_snapshot(games: Vec<Game>, fetched_at: DateTime<Utc>) -> OddsSnapshot {
    OddsSnapshot::new(games, fetched_at, SnapshotSource::Poll)
}

/// Create a moneyline delta for one bookmaker.
pub fn delta(game: &str, bookmaker: &str, prices: &[(&str, i32)]) -> OddsDelta {
    OddsDelta {
        game_id: GameId::from(game),
        bookmaker_key: BookmakerKey::from(bookmaker),
        market: H2H.to_string(),
        outcomes: prices.iter().map(|(name, price)| Outcome::new(*name, *price)).collect(),
        timestamp: None,
    }
}

/// Create an active sport.
pub fn sport(key: &str, title: &str) -> Sport {
    Sport {
        key: key.to_string(),
        title: title.to_string(),
        category: String::new(),
        active: true,
    }
}
