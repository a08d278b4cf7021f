//! Application services.
//!
//! ```text
//! OddsHub ── one OddsTopic per topic
//!              ├─ PollingScheduler ──▶ CircuitBreaker ──▶ OddsFetcher
//!              ├─ RealtimeConnection ──▶ PushStream
//!              └─ OddsAggregator ◀── snapshots + deltas
//! ```

pub mod aggregator;
pub mod breaker;
pub mod connection;
pub mod hub;
pub mod scheduler;
pub mod topic;

pub use aggregator::{AggregatorUpdate, GamesView, OddsAggregator, SnapshotOutcome};
pub use breaker::{CircuitBreaker, CircuitBreakerState, CircuitState, FailureClass};
pub use connection::{ConnectionState, ConnectionStatus, RealtimeConnection};
pub use hub::{OddsHub, PushFactory};
pub use scheduler::{PollStatus, PollingScheduler, RefreshResult};
pub use topic::OddsTopic;
