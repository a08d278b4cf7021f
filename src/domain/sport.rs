//! Sport reference data.

use serde::{Deserialize, Serialize};

/// A sport offered by the odds provider. Immutable; the whole catalog is
/// replaced on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    /// Provider key, e.g. `basketball_nba`.
    pub key: String,
    pub title: String,
    /// Grouping such as "Basketball".
    #[serde(rename = "group", alias = "category", default)]
    pub category: String,
    #[serde(default)]
    pub active: bool,
}
