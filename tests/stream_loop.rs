// tests/stream_loop.rs
// Push-source lifecycle: connect, consume, reconnect, stop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use lead_scanner::error::ControlError;
use lead_scanner::lead::LeadSource;
use lead_scanner::scanner::{ScanContext, ScannerController, ScannerState};
use lead_scanner::store::{LeadStore, MemoryStore};

fn discord_controller(ctx: Arc<ScanContext>, chat: Arc<FakeChat>) -> ScannerController {
    ScannerController::new(ctx).with_stream(chat)
}

#[tokio::test(start_paused = true)]
async fn messages_are_matched_inline() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let (ctx, _) = context(store.clone(), notifier.clone(), discord_settings(&["arm64"]));
    let (chat, tx) = FakeChat::new();
    let ctl = discord_controller(ctx, chat.clone());

    assert_eq!(ctl.start(LeadSource::Discord).unwrap(), ScannerState::Starting);
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Running).await);

    let mut hit = item("dc_100", "Discord message from ana");
    hit.content = "Undefined symbols for architecture arm64".into();
    tx.send(ChatEvent::Message(hit)).unwrap();
    tx.send(ChatEvent::Message(item("dc_101", "Discord message from bo")))
        .unwrap();

    assert!(wait_until(|| store.len() == 1).await);
    assert!(wait_until(|| notifier.count() == 1).await);
    let lead = store.get("dc_100").await.unwrap().expect("lead");
    assert_eq!(lead.source(), LeadSource::Discord);
    assert_eq!(lead.tag(), "arm64");
    assert!(!store.exists("dc_101").await.unwrap());

    ctl.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn stop_closes_the_connection() {
    let (ctx, _) = context(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
        discord_settings(&["arm64"]),
    );
    let (chat, _tx) = FakeChat::new();
    let ctl = discord_controller(ctx, chat.clone());

    ctl.start(LeadSource::Discord).unwrap();
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Running).await);

    assert_eq!(ctl.stop(LeadSource::Discord), ScannerState::Stopping);
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Stopped).await);
    assert_eq!(chat.close_count(), 1);
    assert_eq!(chat.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_reconnects() {
    let (ctx, _) = context(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
        discord_settings(&["arm64"]),
    );
    let (chat, tx) = FakeChat::new();
    let ctl = discord_controller(ctx, chat.clone());

    ctl.start(LeadSource::Discord).unwrap();
    assert!(wait_until(|| chat.connect_count() == 1).await);
    tx.send(ChatEvent::Drop).unwrap();

    assert!(wait_until(|| chat.connect_count() == 2).await);
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Running).await);
    ctl.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn failed_connect_waits_one_interval() {
    let (ctx, _) = context(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
        discord_settings(&["arm64"]),
    );
    let (chat, _tx) = FakeChat::new();
    chat.failing_connects
        .store(1, std::sync::atomic::Ordering::SeqCst);
    let ctl = discord_controller(ctx, chat.clone());

    let started = tokio::time::Instant::now();
    ctl.start(LeadSource::Discord).unwrap();
    assert!(wait_until(|| chat.connect_count() == 1).await);
    assert_eq!(ctl.state(LeadSource::Discord), ScannerState::Starting);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(chat.connect_count(), 2);
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(ctl.state(LeadSource::Discord), ScannerState::Running);
    ctl.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn stop_while_starting_skips_the_reconnect_wait() {
    let (ctx, _) = context(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
        discord_settings(&["arm64"]),
    );
    let (chat, _tx) = FakeChat::new();
    chat.failing_connects
        .store(1, std::sync::atomic::Ordering::SeqCst);
    let ctl = discord_controller(ctx, chat.clone());

    ctl.start(LeadSource::Discord).unwrap();
    assert!(wait_until(|| chat.connect_count() == 1).await);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(ctl.state(LeadSource::Discord), ScannerState::Starting);

    let asked = tokio::time::Instant::now();
    assert_eq!(ctl.stop(LeadSource::Discord), ScannerState::Stopping);
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Stopped).await);
    assert!(asked.elapsed() < Duration::from_secs(1));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(chat.connect_count(), 1);
    assert_eq!(chat.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn settings_are_read_once_per_connection() {
    let store = Arc::new(MemoryStore::new());
    let (ctx, provider) = context(
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        discord_settings(&["arm64"]),
    );
    let (chat, tx) = FakeChat::new();
    let ctl = discord_controller(ctx, chat.clone());

    ctl.start(LeadSource::Discord).unwrap();
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Running).await);
    for n in 0..5 {
        tx.send(ChatEvent::Message(item(&format!("dc_{n}"), "arm64 link error")))
            .unwrap();
    }
    assert!(wait_until(|| store.len() == 5).await);
    assert_eq!(provider.load_count(), 1);

    tx.send(ChatEvent::Drop).unwrap();
    assert!(wait_until(|| chat.connect_count() == 2).await);
    assert_eq!(provider.load_count(), 2);
    ctl.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn store_outage_drops_the_connection_until_it_recovers() {
    let store = FlakyStore::down();
    let (ctx, _) = context(
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        discord_settings(&["arm64"]),
    );
    let (chat, tx) = FakeChat::new();
    let ctl = discord_controller(ctx, chat.clone());

    ctl.start(LeadSource::Discord).unwrap();
    assert!(wait_until(|| ctl.state(LeadSource::Discord) == ScannerState::Running).await);
    tx.send(ChatEvent::Message(item("dc_1", "arm64 link error")))
        .unwrap();

    assert!(wait_until(|| chat.close_count() == 1).await);
    store.set_down(false);
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(store.ping_count(), 1);
    assert!(wait_until(|| chat.connect_count() == 2).await);

    tx.send(ChatEvent::Message(item("dc_2", "arm64 again"))).unwrap();
    assert!(wait_until(|| store.inserts.load(std::sync::atomic::Ordering::SeqCst) == 1).await);
    assert!(store.exists("dc_2").await.unwrap());
    ctl.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn missing_token_refuses_to_start() {
    let mut settings = discord_settings(&["arm64"]);
    settings.discord.bot_token.clear();
    let (ctx, _) = context(
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingNotifier::default()),
        settings,
    );
    let (chat, _tx) = FakeChat::new();
    let ctl = discord_controller(ctx, chat.clone());

    assert!(matches!(
        ctl.start(LeadSource::Discord),
        Err(ControlError::MissingConfig { .. })
    ));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(chat.connect_count(), 0);
}
