//! Fault-tolerance and scheduling policy.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::Topic;

/// Poll cadence per topic kind.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Interval for sport and popular-odds topics (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Interval for the aggregated popular-games view (milliseconds).
    #[serde(default = "default_popular_interval_ms")]
    pub popular_interval_ms: u64,
}

const fn default_interval_ms() -> u64 {
    300_000 // 5 minutes
}

const fn default_popular_interval_ms() -> u64 {
    600_000 // 10 minutes
}

impl PollingConfig {
    /// Poll interval for `topic`.
    #[must_use]
    pub fn interval_for(&self, topic: &Topic) -> Duration {
        if topic.is_aggregated() {
            Duration::from_millis(self.popular_interval_ms)
        } else {
            Duration::from_millis(self.interval_ms)
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            popular_interval_ms: default_popular_interval_ms(),
        }
    }
}

/// Circuit breaker settings for the REST endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Time the circuit stays open before a probe is admitted (milliseconds).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_cooldown_ms() -> u64 {
    30_000
}

impl BreakerConfig {
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Push connection reconnect backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Delay after the first failed attempt (milliseconds).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on the delay (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Treat a connected session as dead after this long without any
    /// message (milliseconds). Zero disables the check.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Give up on a connect attempt (handshake included) after this long
    /// (milliseconds). A timed-out attempt counts as a failure.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Buffered deltas between the connection and its consumer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_base_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_idle_timeout_ms() -> u64 {
    90_000
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_channel_capacity() -> usize {
    1_024
}

impl ReconnectConfig {
    /// Delay after `failures` consecutive failed attempts:
    /// `min(base * 2^(failures - 1), cap)`. Zero failures means no wait.
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(failures - 1).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// How long a session must stay up before its loss resets the backoff.
    /// Shorter sessions count as failed attempts.
    #[must_use]
    pub const fn stable_after(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.idle_timeout_ms))
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let config = ReconnectConfig::default();
        let delays: Vec<u64> = (1..=7).map(|n| config.backoff(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn backoff_survives_huge_attempt_counts() {
        let config = ReconnectConfig::default();
        assert_eq!(config.backoff(200), Duration::from_secs(30));
        assert_eq!(config.backoff(0), Duration::ZERO);
    }

    #[test]
    fn aggregated_topics_poll_slower() {
        let polling = PollingConfig::default();
        assert_eq!(polling.interval_for(&Topic::sport("basketball_nba")), Duration::from_secs(300));
        assert_eq!(polling.interval_for(&Topic::PopularGames), Duration::from_secs(600));
    }

    #[test]
    fn zero_idle_timeout_disables_check() {
        let config = ReconnectConfig {
            idle_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.idle_timeout().is_none());
    }
}
