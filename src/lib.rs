//! Oddsync - resilient sportsbook odds synchronization.
//!
//! Keeps a per-topic read model of sportsbook odds current by combining
//! periodic REST polling with a realtime push feed, and degrades to serving
//! stale data when the upstream misbehaves.
//!
//! # Architecture
//!
//! - **`domain`** - Games, bookmakers, markets, snapshots, deltas, topics
//! - **`port`** - Traits the core needs from the outside world
//!   - `OddsFetcher` - REST odds and sports catalog
//!   - `PushStream` - Realtime delta feed
//! - **`application`** - The synchronization core
//!   - `CircuitBreaker` - Fail-fast gate per upstream endpoint
//!   - `PollingScheduler` - Timer plus coalesced on-demand refresh
//!   - `RealtimeConnection` - Push session with exponential reconnect
//!   - `OddsAggregator` - Copy-on-write read model with best prices
//!   - `OddsTopic` / `OddsHub` - One owner per topic, shared breaker
//! - **`adapter`** - REST client, WebSocket feed, and the CLI
//! - **`infrastructure`** - Configuration and component factories
//!
//! # Example
//!
//! ```no_run
//! use oddsync::domain::Topic;
//! use oddsync::infrastructure::config::Config;
//! use oddsync::infrastructure::factory;
//!
//! # async fn run() -> oddsync::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let hub = factory::build_hub(&config, false);
//! let nba = hub.topic(&Topic::sport("basketball_nba"));
//! let _ = nba.refresh_now(true).await;
//! for game in &nba.aggregator().current_games() {
//!     println!("{} @ {}", game.away_team, game.home_team);
//! }
//! hub.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
