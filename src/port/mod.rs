//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams where the synchronization core meets the outside
//! world. Adapters implement them; the application layer consumes them.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  breaker · scheduler    │
//!                    │  connection · aggregator│
//!                    └───────────┬─────────────┘
//!                  ┌─────────────┴─────────────┐
//!                  ▼                           ▼
//!           ┌─────────────┐             ┌─────────────┐
//!           │ OddsFetcher │             │ PushStream  │
//!           │ (REST)      │             │ (WebSocket) │
//!           └─────────────┘             └─────────────┘
//! ```

pub mod outbound;

pub use outbound::odds::OddsFetcher;
pub use outbound::push::{PushEvent, PushStream};
