//! Handler for the `sports` command.

use std::path::Path;

use anyhow::Context;
use serde_json::json;
use tabled::{Table, Tabled};

use super::output;
use crate::domain::Sport;
use crate::infrastructure::config::Config;
use crate::infrastructure::factory;

#[derive(Debug, Tabled)]
pub struct SportRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

impl From<&Sport> for SportRow {
    fn from(sport: &Sport) -> Self {
        Self {
            key: sport.key.clone(),
            title: sport.title.clone(),
            group: sport.category.clone(),
            active: if sport.active { "yes" } else { "no" }.to_string(),
        }
    }
}

/// Fetch the sports catalog once through the breaker-gated client.
pub async fn execute(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.init_logging();

    let hub = factory::build_hub(&config, true);
    let sports = hub
        .refresh_sports()
        .await
        .context("failed to fetch sports catalog")?;

    if output::is_json() {
        output::json_output("sports", json!(sports.as_slice()));
        return Ok(());
    }

    output::section(&format!("Sports ({})", sports.len()));
    if sports.is_empty() {
        output::field("Sports", output::muted("none"));
        return Ok(());
    }
    let rows: Vec<SportRow> = sports.iter().map(SportRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}
