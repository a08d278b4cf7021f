//! Component factories.
//!
//! Builds the REST client, push streams, and the hub from configuration.
//! This is the only place that picks concrete adapters.

use std::sync::Arc;

use crate::adapter::outbound::odds_api::OddsApiClient;
use crate::adapter::outbound::push::WebSocketPushStream;
use crate::application::{OddsHub, PushFactory};
use crate::domain::Topic;
use crate::port::{OddsFetcher, PushStream};

use super::config::Config;

/// REST fetcher for the configured API.
#[must_use]
pub fn build_fetcher(config: &Config) -> Arc<dyn OddsFetcher> {
    Arc::new(OddsApiClient::from_config(&config.network, &config.http))
}

/// Push factory opening a WebSocket per topic.
///
/// The aggregated popular-games view has no push feed.
#[must_use]
pub fn build_push_factory(config: &Config) -> PushFactory {
    let url = config.network.ws_url.clone();
    Arc::new(move |topic: &Topic| {
        if topic.is_aggregated() {
            return None;
        }
        Some(Box::new(WebSocketPushStream::new(url.clone())) as Box<dyn PushStream>)
    })
}

/// Hub wired to the configured REST API, with push feeds unless `poll_only`.
#[must_use]
pub fn build_hub(config: &Config, poll_only: bool) -> OddsHub {
    let hub = OddsHub::new(build_fetcher(config), config.clone());
    if poll_only {
        hub
    } else {
        hub.with_push(build_push_factory(config))
    }
}
