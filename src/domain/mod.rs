//! Provider-agnostic odds types.

pub mod delta;
pub mod game;
pub mod id;
pub mod line;
pub mod snapshot;
pub mod sport;
pub mod topic;

pub use delta::{DeltaOutcome, OddsDelta};
pub use game::{Bookmaker, Game, Market, Outcome, H2H, SPREADS, TOTALS};
pub use id::{BookmakerKey, GameId};
pub use line::{SpreadLine, TotalLine};
pub use snapshot::{BestPriceView, GameBestPrices, OddsSnapshot, SnapshotSource, StaleDataWarning};
pub use sport::Sport;
pub use topic::{Topic, POPULAR_LEAGUES};
