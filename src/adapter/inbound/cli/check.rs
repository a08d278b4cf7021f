//! Handler for the `check-config` command.

use std::path::Path;

use anyhow::Context;
use serde_json::json;

use super::output;
use crate::domain::Topic;
use crate::infrastructure::config::Config;

/// Validate a configuration file and print the effective settings.
pub fn execute(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;

    if output::is_json() {
        output::json_output(
            "config",
            json!({
                "path": config_path.display().to_string(),
                "api_url": config.network.api_url,
                "ws_url": config.network.ws_url,
                "interval_ms": config.polling.interval_ms,
                "popular_interval_ms": config.polling.popular_interval_ms,
                "failure_threshold": config.breaker.failure_threshold,
                "cooldown_ms": config.breaker.cooldown_ms,
                "reconnect_base_ms": config.reconnect.base_delay_ms,
                "reconnect_max_ms": config.reconnect.max_delay_ms,
            }),
        );
        return Ok(());
    }

    output::section("Network");
    output::field("API", &config.network.api_url);
    output::field("Push", &config.network.ws_url);
    output::field("Timeout", format!("{}ms", config.http.timeout_ms));
    output::field("Retries", config.http.retry_max_attempts);

    output::section("Polling");
    output::field(
        "Sport",
        format!("{}s", config.polling.interval_for(&Topic::sport("any")).as_secs()),
    );
    output::field(
        "Popular",
        format!("{}s", config.polling.interval_for(&Topic::PopularGames).as_secs()),
    );

    output::section("Resilience");
    output::field("Threshold", config.breaker.failure_threshold);
    output::field("Cooldown", format!("{}ms", config.breaker.cooldown_ms));
    output::field(
        "Reconnect",
        format!(
            "{}ms .. {}ms",
            config.reconnect.base_delay_ms, config.reconnect.max_delay_ms
        ),
    );

    output::section("Result");
    output::success(&format!("{} is valid", config_path.display()));
    Ok(())
}
