//! Odds topics: the unit of ownership for polling and push connections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Leagues aggregated by the popular-games endpoint, in display order.
pub const POPULAR_LEAGUES: [&str; 4] = ["nfl", "nba", "mlb", "nhl"];

/// A group of odds that has exactly one poller and one push connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Odds for one sport key, e.g. `basketball_nba`.
    Sport(String),
    /// Odds aggregated across the provider's default sports.
    Popular,
    /// Featured games grouped by league.
    PopularGames,
}

impl Topic {
    pub fn sport(key: impl Into<String>) -> Self {
        Self::Sport(key.into())
    }

    /// Whether this topic polls on the slower aggregated-view cadence.
    #[must_use]
    pub const fn is_aggregated(&self) -> bool {
        matches!(self, Self::PopularGames)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sport(key) => write!(f, "{key}"),
            Self::Popular => write!(f, "popular"),
            Self::PopularGames => write!(f, "popular-games"),
        }
    }
}

impl FromStr for Topic {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "popular" => Self::Popular,
            "popular-games" | "popular_games" => Self::PopularGames,
            key => Self::Sport(key.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_round_trip_through_display() {
        for topic in [Topic::sport("basketball_nba"), Topic::Popular, Topic::PopularGames] {
            assert_eq!(topic.to_string().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn only_popular_games_is_aggregated() {
        assert!(Topic::PopularGames.is_aggregated());
        assert!(!Topic::Popular.is_aggregated());
        assert!(!Topic::sport("icehockey_nhl").is_aggregated());
    }
}
