//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`fetcher`]: Scripted [`OddsFetcher`](crate::port::OddsFetcher) with
//!   call counting and optional latency.
//! - [`stream`]: Mock [`PushStream`](crate::port::PushStream)
//!   implementations: `ScriptedPushStream`, `ChannelPushStream`.
//! - [`domain`]: Builders for games, bookmakers, markets, and deltas.
//! - [`config`]: Canonical test configurations.

pub mod config;
pub mod domain;
pub mod fetcher;
pub mod stream;
