//! Response envelopes of the REST odds API.
//!
//! Every envelope carries a `status`; anything other than `"success"` is an
//! upstream failure even when the HTTP status is 200.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{Game, Sport, POPULAR_LEAGUES};
use crate::error::FetchError;

const SUCCESS: &str = "success";

/// `GET /odds?sport=` and `GET /odds/popular`.
#[derive(Debug, Deserialize)]
pub struct OddsResponse {
    pub status: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /sports`.
#[derive(Debug, Deserialize)]
pub struct SportsResponse {
    pub status: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub sports: Vec<Sport>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /popular-games`: featured games keyed by league.
#[derive(Debug, Deserialize)]
pub struct PopularGamesResponse {
    pub status: String,
    #[serde(default)]
    pub popular_games: BTreeMap<String, Vec<Game>>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub message: Option<String>,
}

fn check(status: &str, message: Option<&str>) -> Result<(), FetchError> {
    if status == SUCCESS {
        return Ok(());
    }
    Err(FetchError::Upstream(match message {
        Some(message) => format!("status {status}: {message}"),
        None => format!("status {status}"),
    }))
}

impl OddsResponse {
    /// Unwrap the game list.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Upstream`] for a non-success status.
    pub fn into_games(self) -> Result<Vec<Game>, FetchError> {
        check(&self.status, self.message.as_deref())?;
        Ok(self.games)
    }
}

impl SportsResponse {
    /// Unwrap the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Upstream`] for a non-success status.
    pub fn into_sports(self) -> Result<Vec<Sport>, FetchError> {
        check(&self.status, self.message.as_deref())?;
        Ok(self.sports)
    }
}

impl PopularGamesResponse {
    /// Flatten the leagues into one list: the known leagues first in display
    /// order, then any others by key.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Upstream`] for a non-success status.
    pub fn into_games(mut self) -> Result<Vec<Game>, FetchError> {
        check(&self.status, self.message.as_deref())?;
        let mut games = Vec::new();
        for league in POPULAR_LEAGUES {
            if let Some(league_games) = self.popular_games.remove(league) {
                games.extend(league_games);
            }
        }
        for (_, league_games) in self.popular_games {
            games.extend(league_games);
        }
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = r#"{
        "id": "g1",
        "sport_key": "basketball_nba",
        "commence_time": "2026-01-05T00:10:00Z",
        "home_team": "Lakers",
        "away_team": "Celtics",
        "bookmakers": []
    }"#;

    fn game_with_id(id: &str) -> String {
        GAME.replace("\"g1\"", &format!("\"{id}\""))
    }

    #[test]
    fn odds_envelope_yields_games() {
        let json = format!(
            r#"{{"status":"success","sport":"basketball_nba","count":1,"games":[{GAME}],"cached":true,"last_updated":"2026-01-04T20:00:00Z"}}"#
        );
        let response: OddsResponse = serde_json::from_str(&json).unwrap();
        assert!(response.cached);
        let games = response.into_games().unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home_team, "Lakers");
    }

    #[test]
    fn error_status_is_upstream_failure() {
        let json = r#"{"status":"error","message":"quota exceeded","games":[]}"#;
        let response: OddsResponse = serde_json::from_str(json).unwrap();
        match response.into_games() {
            Err(FetchError::Upstream(msg)) => assert!(msg.contains("quota exceeded")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn sports_envelope_reads_group_as_category() {
        let json = r#"{"status":"success","count":1,"sports":[{"key":"basketball_nba","title":"NBA","group":"Basketball","active":true}],"cached":false}"#;
        let response: SportsResponse = serde_json::from_str(json).unwrap();
        let sports = response.into_sports().unwrap();
        assert_eq!(sports[0].category, "Basketball");
        assert!(sports[0].active);
    }

    #[test]
    fn popular_games_flatten_in_league_order() {
        let json = format!(
            r#"{{"status":"success","popular_games":{{"nhl":[{}],"mlb":[],"nba":[{}],"nfl":[{}],"mls":[{}]}},"total_count":4}}"#,
            game_with_id("hockey"),
            game_with_id("hoops"),
            game_with_id("football"),
            game_with_id("soccer"),
        );
        let response: PopularGamesResponse = serde_json::from_str(&json).unwrap();
        let ids: Vec<String> = response
            .into_games()
            .unwrap()
            .into_iter()
            .map(|g| g.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["football", "hoops", "hockey", "soccer"]);
    }

    #[test]
    fn popular_games_ignore_reported_total() {
        let json = r#"{"status":"success","popular_games":{},"total_count":18446744073709551615}"#;
        let response: PopularGamesResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_games().unwrap().is_empty());
    }
}
