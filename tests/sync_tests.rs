//! End-to-end synchronization through the hub: polling, push deltas,
//! breaker degradation, and teardown.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use oddsync::application::{AggregatorUpdate, CircuitState, ConnectionState, OddsHub, PushFactory};
use oddsync::domain::{GameId, Topic, H2H};
use oddsync::error::FetchError;
use oddsync::port::{OddsFetcher, PushEvent, PushStream};
use oddsync::testkit::config::fast_config;
use oddsync::testkit::domain::{bookmaker, delta, game, h2h};
use oddsync::testkit::fetcher::ScriptedFetcher;
use oddsync::testkit::stream::{ChannelPushStream, Counter, PushHandle};

fn nba() -> Topic {
    Topic::sport("basketball_nba")
}

fn lakers_celtics(book: &str, lakers: i32, celtics: i32) -> Vec<oddsync::domain::Game> {
    vec![game(
        "g1",
        vec![bookmaker(book, vec![h2h(&[("Lakers", lakers), ("Celtics", celtics)])])],
    )]
}

/// Hub whose first push stream is fed through the returned handle.
fn hub_with_channel(fetcher: &Arc<ScriptedFetcher>) -> (OddsHub, PushHandle, Counter) {
    let (stream, handle) = ChannelPushStream::new();
    let connects = stream.connect_counter();
    let slot = Arc::new(Mutex::new(Some(stream)));
    let factory: PushFactory = Arc::new(move |_topic: &Topic| {
        slot.lock()
            .take()
            .map(|stream| Box::new(stream) as Box<dyn PushStream>)
    });
    let hub = OddsHub::new(Arc::clone(fetcher) as Arc<dyn OddsFetcher>, fast_config())
        .with_push(factory);
    (hub, handle, connects)
}

#[tokio::test(start_paused = true)]
async fn push_updates_between_polls_then_next_generation_wins() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_games(lakers_celtics("booka", -110, -105));
    fetcher.push_games(lakers_celtics("booka", -120, 100));
    let (hub, push, connects) = hub_with_channel(&fetcher);

    let owner = hub.topic(&nba());
    let mut updates = owner.subscribe().unwrap();
    assert_eq!(updates.recv().await.unwrap(), AggregatorUpdate::Generation { games: 1 });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(connects.get(), 1);
    assert_eq!(owner.connection_status().state, ConnectionState::Connected);

    assert!(push.send(PushEvent::Delta(delta("g1", "booka", &[("Lakers", 130), ("Celtics", -150)]))));
    assert_eq!(
        updates.recv().await.unwrap(),
        AggregatorUpdate::Delta { game_id: GameId::from("g1") }
    );
    let id = GameId::from("g1");
    assert_eq!(owner.aggregator().best_price(&id, H2H, "Lakers").unwrap().price, 130);

    tokio::time::sleep(owner.interval()).await;
    assert_eq!(updates.recv().await.unwrap(), AggregatorUpdate::Generation { games: 1 });
    assert_eq!(owner.aggregator().best_price(&id, H2H, "Lakers").unwrap().price, -120);
    assert_eq!(owner.aggregator().best_price(&id, H2H, "Celtics").unwrap().price, 100);
    assert_eq!(fetcher.calls(), 2);

    hub.shutdown();
}

#[tokio::test(start_paused = true)]
async fn lost_push_session_reconnects_and_keeps_delivering() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_games(lakers_celtics("booka", -110, -105));
    let (hub, push, connects) = hub_with_channel(&fetcher);

    let owner = hub.topic(&nba());
    let mut updates = owner.subscribe().unwrap();
    updates.recv().await.unwrap();

    push.send(PushEvent::Heartbeat);
    // Outlast the base delay so the loss counts as a stable session.
    tokio::time::sleep(Duration::from_millis(200)).await;
    push.send(PushEvent::Disconnected { reason: "server restart".into() });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(connects.get(), 2);
    assert!(owner.connection_status().connected);

    push.send(PushEvent::Delta(delta("g1", "booka", &[("Lakers", 140)])));
    assert!(matches!(updates.recv().await.unwrap(), AggregatorUpdate::Delta { .. }));
    assert_eq!(
        owner.aggregator().best_price(&GameId::from("g1"), H2H, "Lakers").unwrap().price,
        140
    );

    hub.shutdown();
}

#[tokio::test(start_paused = true)]
async fn failing_upstream_serves_stale_data_then_recovers() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_games(lakers_celtics("booka", -110, -105));
    for _ in 0..3 {
        fetcher.push_error(FetchError::Transport("connection reset".into()));
    }
    fetcher.push_games(lakers_celtics("booka", -115, -105));
    let hub = OddsHub::new(Arc::clone(&fetcher) as Arc<dyn OddsFetcher>, fast_config());

    let owner = hub.topic(&nba());
    owner.refresh_now(true).await.unwrap();
    let calls = fetcher.calls();

    for _ in 0..3 {
        let err = owner.refresh_now(true).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
    assert!(owner.aggregator().is_stale());
    assert_eq!(owner.aggregator().current_games().len(), 1);
    assert_eq!(hub.breaker_state().state, CircuitState::Open);

    let err = owner.refresh_now(true).await.unwrap_err();
    assert!(err.is_degraded());
    assert_eq!(fetcher.calls(), calls + 3);

    tokio::time::sleep(Duration::from_millis(fast_config().breaker.cooldown_ms)).await;
    owner.refresh_now(true).await.unwrap();
    assert_eq!(hub.breaker_state().state, CircuitState::Closed);
    assert!(!owner.aggregator().is_stale());
    assert_eq!(
        owner.aggregator().best_price(&GameId::from("g1"), H2H, "Lakers").unwrap().price,
        -115
    );

    hub.shutdown();
}

#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_share_one_request() {
    let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(200)));
    fetcher.push_games(lakers_celtics("booka", -110, -105));
    let hub = OddsHub::new(Arc::clone(&fetcher) as Arc<dyn OddsFetcher>, fast_config());
    let owner = hub.topic(&nba());

    let (a, b, c) = tokio::join!(
        owner.refresh_now(true),
        owner.refresh_now(false),
        owner.refresh_now(true)
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(fetcher.calls(), 1);

    hub.shutdown();
}

#[tokio::test(start_paused = true)]
async fn released_topic_stops_polling() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_games(lakers_celtics("booka", -110, -105));
    let hub = OddsHub::new(Arc::clone(&fetcher) as Arc<dyn OddsFetcher>, fast_config());

    let owner = hub.topic(&nba());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.calls(), 1);

    assert!(hub.release(&nba()));
    tokio::time::sleep(owner.interval() * 3).await;
    assert_eq!(fetcher.calls(), 1);
    assert!(!owner.poll_status().in_flight);
}
