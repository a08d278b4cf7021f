//! Handler for the `watch` command.
//!
//! Starts one topic through the hub and prints the best moneyline for each
//! game whenever the read model changes, plus breaker and connection
//! transitions, until Ctrl+C or the optional duration elapses.

use std::future::pending;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use tabled::{Table, Tabled};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use super::command::WatchArgs;
use super::output;
use crate::application::{AggregatorUpdate, CircuitBreakerState, CircuitState, OddsTopic};
use crate::domain::{Game, OddsSnapshot, Topic, H2H};
use crate::infrastructure::config::Config;
use crate::infrastructure::factory;

/// One row of the best-price table.
#[derive(Debug, Tabled)]
pub struct PriceRow {
    #[tabled(rename = "Game")]
    pub game: String,
    #[tabled(rename = "Starts")]
    pub starts: String,
    #[tabled(rename = "Home")]
    pub home: String,
    #[tabled(rename = "Away")]
    pub away: String,
    #[tabled(rename = "Spread")]
    pub spread: String,
    #[tabled(rename = "Total")]
    pub total: String,
}

/// Load config, apply command-line overrides, and watch the topic.
pub async fn execute(args: &WatchArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config, args)?;
    config.init_logging();

    let topic = args.topic.parse::<Topic>().unwrap_or_else(|never| match never {});
    let interval = config.polling.interval_for(&topic);

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Topic", output::highlight(&topic));
    output::field("API", &config.network.api_url);
    output::field("Interval", format!("{}s", interval.as_secs()));
    output::field(
        "Push",
        if args.no_push || topic.is_aggregated() {
            output::muted("off")
        } else {
            config.network.ws_url.clone()
        },
    );

    let hub = factory::build_hub(&config, args.no_push);
    let owner = hub.topic(&topic);
    info!(topic = %topic, "Watching topic");

    let result = watch(&owner, args.duration.map(Duration::from_secs)).await;
    hub.shutdown();
    result
}

fn load_config(path: &Path, args: &WatchArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(secs) = args.interval {
        let ms = interval_ms(secs)?;
        config.polling.interval_ms = ms;
        config.polling.popular_interval_ms = ms;
    }
    Ok(config)
}

/// `--interval` seconds as the millisecond value the polling config holds.
fn interval_ms(secs: u64) -> anyhow::Result<u64> {
    anyhow::ensure!(secs > 0, "--interval must be greater than 0");
    secs.checked_mul(1_000).context("--interval is too large")
}

async fn watch(owner: &OddsTopic, duration: Option<Duration>) -> anyhow::Result<()> {
    let mut updates = owner
        .subscribe()
        .context("topic was built without update notifications")?;
    let mut breaker = owner.subscribe_breaker();
    let mut last_breaker = breaker.borrow_and_update().state;
    let mut connection = owner.subscribe_connection();

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    // The first poll may have landed before we subscribed.
    let current = owner.aggregator().snapshot();
    if !current.is_initial() {
        render(&current);
    }

    let mut feed_open = true;
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(AggregatorUpdate::Generation { games }) => {
                    output::event(&timestamp(), "poll", &format!("{games} games"));
                    render(&owner.aggregator().snapshot());
                }
                Ok(AggregatorUpdate::Delta { game_id }) => {
                    output::event(&timestamp(), "push", &format!("update for {game_id}"));
                    render(&owner.aggregator().snapshot());
                }
                Ok(AggregatorUpdate::Stale) => {
                    output::warning("Refresh failed, showing last known odds");
                }
                Err(RecvError::Lagged(skipped)) => {
                    output::warning(&format!("Display fell behind by {skipped} updates"));
                    render(&owner.aggregator().snapshot());
                }
                Err(RecvError::Closed) => break,
            },
            changed = breaker.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *breaker.borrow_and_update();
                report_breaker(last_breaker, &state);
                last_breaker = state.state;
            }
            changed = connection.changed(), if feed_open => {
                if changed.is_err() {
                    feed_open = false;
                    continue;
                }
                let status = connection.borrow_and_update().clone();
                output::json_output("connection", json!(status));
                let label = if status.reconnecting {
                    format!("{} (attempt {})", status.state, status.reconnect_attempts)
                } else {
                    status.state.to_string()
                };
                output::event(&timestamp(), "feed", &label);
            }
            () = &mut deadline => {
                info!("Watch duration elapsed");
                break;
            }
            _ = signal::ctrl_c() => {
                output::success("Interrupted, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// What a breaker state change means for someone watching the odds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerNotice {
    Degraded,
    Probing,
    Recovered,
}

/// The notice for a move from `previous` to `current`, if any. Repeated
/// publications of the same state say nothing, and only a successful
/// half-open trial counts as recovery.
#[must_use]
pub fn breaker_notice(previous: CircuitState, current: CircuitState) -> Option<BreakerNotice> {
    match (previous, current) {
        (p, c) if p == c => None,
        (_, CircuitState::Open) => Some(BreakerNotice::Degraded),
        (_, CircuitState::HalfOpen) => Some(BreakerNotice::Probing),
        (CircuitState::HalfOpen, CircuitState::Closed) => Some(BreakerNotice::Recovered),
        (_, CircuitState::Closed) => None,
    }
}

fn report_breaker(previous: CircuitState, state: &CircuitBreakerState) {
    output::json_output(
        "breaker",
        json!({
            "state": state.state,
            "consecutive_failures": state.consecutive_failures,
        }),
    );
    match breaker_notice(previous, state.state) {
        Some(BreakerNotice::Degraded) => output::warning(&format!(
            "Odds service degraded: circuit {} after {} failures",
            state.state, state.consecutive_failures
        )),
        Some(BreakerNotice::Probing) => {
            output::event(&timestamp(), "breaker", "trying the odds service again");
        }
        Some(BreakerNotice::Recovered) => output::success("Odds service recovered"),
        None => {}
    }
}

fn render(snapshot: &OddsSnapshot) {
    if output::is_json() {
        output::json_output("snapshot", json!(snapshot));
        return;
    }
    let rows = price_rows(snapshot);
    if rows.is_empty() {
        output::field("Games", output::muted("none"));
        return;
    }
    output::lines(&Table::new(rows).to_string());
    if snapshot.stale {
        output::warning("Odds may be out of date");
    }
}

/// Best moneyline per side, plus the first quoted spread and total.
#[must_use]
pub fn price_rows(snapshot: &OddsSnapshot) -> Vec<PriceRow> {
    snapshot
        .games()
        .iter()
        .map(|game| PriceRow {
            game: format!("{} @ {}", game.away_team, game.home_team),
            starts: game.start_time.format("%a %H:%M").to_string(),
            home: best_side(snapshot, game, &game.home_team),
            away: best_side(snapshot, game, &game.away_team),
            spread: game.spread().map_or_else(
                || "-".to_string(),
                |line| format!("{:+} ({})", line.home_point, format_price(line.home_price)),
            ),
            total: game.total().map_or_else(
                || "-".to_string(),
                |line| format!("{} ({})", line.over_point, format_price(line.over_price)),
            ),
        })
        .collect()
}

fn best_side(snapshot: &OddsSnapshot, game: &Game, team: &str) -> String {
    snapshot.best_price(&game.id, H2H, team).map_or_else(
        || "-".to_string(),
        |best| format!("{} {}", format_price(best.price), best.bookmaker_title),
    )
}

/// American odds with an explicit sign on underdog prices.
#[must_use]
pub fn format_price(price: i32) -> String {
    if price > 0 {
        format!("+{price}")
    } else {
        price.to_string()
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
