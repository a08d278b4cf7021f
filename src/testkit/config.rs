//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::infrastructure::config::{
    BreakerConfig, Config, PollingConfig, ReconnectConfig,
};

/// Config with short intervals, a three-failure breaker, and quick
/// reconnects. Idle detection is off.
pub fn fast_config() -> Config {
    Config {
        polling: PollingConfig {
            interval_ms: 60_000,
            popular_interval_ms: 120_000,
        },
        breaker: BreakerConfig {
            failure_threshold: 3,
            cooldown_ms: 5_000,
        },
        reconnect: reconnect(),
        ..Config::default()
    }
}

/// Reconnect policy of 100ms doubling to 1s, without idle detection.
pub fn reconnect() -> ReconnectConfig {
    ReconnectConfig {
        base_delay_ms: 100,
        max_delay_ms: 1_000,
        idle_timeout_ms: 0,
        connect_timeout_ms: 1_000,
        channel_capacity: 64,
    }
}
