//! Player loop behaviour, driven through the registry.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{make_track, wait_until, StubSink};
use jamplayer::{AudioSink, EngineConfig, PlayerError, PlayerRegistry, PlayerState};
use jamsource::SessionId;
use tokio::time;

const SESSION: SessionId = SessionId(7);

fn registry(sink: &Arc<StubSink>, config: EngineConfig) -> PlayerRegistry {
    let sink_dyn: Arc<dyn AudioSink> = sink.clone();
    PlayerRegistry::new(sink_dyn, &config)
}

#[tokio::test(start_paused = true)]
async fn tracks_play_in_enqueue_order() {
    let sink = StubSink::instant();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    player.enqueue(make_track("b")).await.unwrap();
    player.enqueue(make_track("c")).await.unwrap();

    wait_until(|| sink.opened().len() == 3).await;
    assert_eq!(
        sink.opened(),
        vec!["stream://a", "stream://b", "stream://c"]
    );
}

#[tokio::test(start_paused = true)]
async fn loop_current_repeats_before_advancing() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    player.enqueue(make_track("b")).await.unwrap();
    wait_until(|| sink.opened().len() == 1).await;

    assert!(player.toggle_loop().await.unwrap());
    sink.finish_current();
    // the same track plays again before b
    wait_until(|| sink.opened().len() == 2).await;
    assert_eq!(sink.opened()[1], "stream://a");

    assert!(!player.toggle_loop().await.unwrap());
    sink.finish_current();
    wait_until(|| sink.opened().len() == 3).await;
    assert_eq!(sink.opened()[2], "stream://b");
}

#[tokio::test(start_paused = true)]
async fn paused_time_is_excluded_from_elapsed() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    loop {
        if player.snapshot().await.unwrap().state == PlayerState::Playing {
            break;
        }
        time::sleep(Duration::from_millis(10)).await;
    }

    time::sleep(Duration::from_secs(30)).await;
    player.pause().await.unwrap();
    time::sleep(Duration::from_secs(10)).await;
    player.resume().await.unwrap();
    time::sleep(Duration::from_secs(5)).await;

    let snapshot = player.snapshot().await.unwrap();
    let elapsed = snapshot.elapsed.unwrap().as_secs_f64();
    assert!(
        (34.9..36.5).contains(&elapsed),
        "paused interval leaked into elapsed: {elapsed}"
    );
    assert_eq!(sink.pause_calls(), 1);
    assert_eq!(sink.resume_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn elapsed_is_frozen_while_paused() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    wait_until(|| sink.opened().len() == 1).await;

    time::sleep(Duration::from_secs(20)).await;
    player.pause().await.unwrap();
    let frozen = player.snapshot().await.unwrap().elapsed.unwrap();
    time::sleep(Duration::from_secs(60)).await;
    let later = player.snapshot().await.unwrap().elapsed.unwrap();
    assert_eq!(frozen, later);
    assert_eq!(
        player.snapshot().await.unwrap().state,
        PlayerState::Paused
    );
}

#[tokio::test(start_paused = true)]
async fn skip_advances_without_sink_completion() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    player.enqueue(make_track("b")).await.unwrap();
    wait_until(|| sink.opened().len() == 1).await;

    player.skip().await.unwrap();
    wait_until(|| sink.opened().len() == 2).await;
    assert_eq!(sink.opened()[1], "stream://b");
}

#[tokio::test(start_paused = true)]
async fn control_commands_are_invalid_outside_their_state() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    // nothing playing yet
    assert!(matches!(
        player.pause().await,
        Err(PlayerError::InvalidCommand(_))
    ));
    assert!(matches!(
        player.skip().await,
        Err(PlayerError::InvalidCommand(_))
    ));

    player.enqueue(make_track("a")).await.unwrap();
    wait_until(|| sink.opened().len() == 1).await;

    // resume without a pause
    assert!(matches!(
        player.resume().await,
        Err(PlayerError::InvalidCommand(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn volume_set_while_idle_applies_to_next_track() {
    let sink = StubSink::instant();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.set_volume(0.8).await.unwrap();
    player.enqueue(make_track("a")).await.unwrap();
    wait_until(|| !sink.opened().is_empty()).await;
    assert_eq!(sink.volumes()[0], 0.8);
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_tears_the_player_down() {
    let sink = StubSink::manual();
    let config = EngineConfig {
        idle_timeout: Duration::from_secs(2),
        ..EngineConfig::default()
    };
    let registry = registry(&sink, config);
    let player = registry.get_or_create(SESSION).await;

    // no enqueue within the idle window
    loop {
        if registry.get(SESSION).await.is_none() {
            break;
        }
        time::sleep(Duration::from_millis(50)).await;
    }
    assert!(player.is_stopped());
    assert_eq!(sink.disconnected(), vec![SESSION]);
    assert!(matches!(
        player.enqueue(make_track("late")).await,
        Err(PlayerError::Stopped)
    ));

    // a later get_or_create yields a fresh, live instance
    let fresh = registry.get_or_create(SESSION).await;
    assert!(!fresh.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn teardown_of_a_replaced_player_leaves_the_successor_registered() {
    let sink = StubSink::manual_with_held_disconnect();
    let config = EngineConfig {
        idle_timeout: Duration::from_secs(1),
        ..EngineConfig::default()
    };
    let registry = registry(&sink, config);
    let stale = registry.get_or_create(SESSION).await;

    // idle out; the old loop's teardown is now parked inside the sink
    // disconnect, after flagging itself stopped
    wait_until(|| stale.is_stopped()).await;

    let fresh = registry.get_or_create(SESSION).await;
    assert!(!fresh.is_stopped());

    sink.release_disconnect();
    wait_until(|| !sink.disconnected().is_empty()).await;

    // the resumed teardown must not have removed its successor
    let live = registry
        .get(SESSION)
        .await
        .expect("replacement player still registered");
    assert!(!live.is_stopped());
    live.snapshot().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn queue_summaries_carry_enqueue_time() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    wait_until(|| sink.opened().len() == 1).await;
    player.enqueue(make_track("b")).await.unwrap();

    let snapshot = player.snapshot().await.unwrap();
    let current = snapshot.current.unwrap();
    assert!(current.enqueued_at <= snapshot.queue[0].enqueued_at);
}

#[tokio::test(start_paused = true)]
async fn leave_stops_regardless_of_queue_state() {
    let sink = StubSink::manual();
    let registry = registry(&sink, EngineConfig::default());
    let player = registry.get_or_create(SESSION).await;

    player.enqueue(make_track("a")).await.unwrap();
    player.enqueue(make_track("b")).await.unwrap();
    wait_until(|| sink.opened().len() == 1).await;

    player.stop().await.unwrap();
    wait_until(|| !sink.disconnected().is_empty()).await;
    assert!(registry.get(SESSION).await.is_none());
    // queued b never played
    assert_eq!(sink.opened(), vec!["stream://a"]);
}
