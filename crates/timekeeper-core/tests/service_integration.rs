//! End-to-end tests for the scheduler service on a paused tokio clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{advance, sleep};

use timekeeper_core::service::{self, ServiceHandle};
use timekeeper_core::{
    Alert, Config, CoreError, Event, MemorySettingsStore, PointDraft, SettingsStore, TickerMode,
    TimerStatus, Urgency,
};

const MINUTE: u64 = 60_000;

fn test_config() -> Config {
    let mut config = Config::default();
    // Runtime-driven ticks follow the paused clock.
    config.scheduler.ticker = TickerMode::Interval;
    config
}

fn spawn_recording(store: MemorySettingsStore) -> (ServiceHandle, mpsc::UnboundedReceiver<Alert>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = move |alert: &Alert| {
        let _ = tx.send(alert.clone());
    };
    let handle = service::spawn(&test_config(), Box::new(store), Box::new(sink)).unwrap();
    (handle, rx)
}

async fn fired_flags(handle: &ServiceHandle) -> Vec<bool> {
    handle.points().await.unwrap().iter().map(|p| p.fired).collect()
}

#[tokio::test(start_paused = true)]
async fn simultaneous_crossings_are_delivered_in_order_and_staggered() {
    let (handle, mut alerts) = spawn_recording(MemorySettingsStore::new());
    let mut events = handle.subscribe_events();

    handle
        .add_point(PointDraft::new(25 * MINUTE, "Wrap up", Urgency::Urgent))
        .await
        .unwrap();
    handle
        .add_point(PointDraft::new(MINUTE, "Warm up", Urgency::Info))
        .await
        .unwrap();
    handle.start().await.unwrap();

    advance(Duration::from_millis(25 * MINUTE + 1)).await;

    let first = alerts.recv().await.unwrap();
    let second = alerts.recv().await.unwrap();
    assert_eq!(first.point.time_ms, MINUTE);
    assert_eq!(first.point.urgency, Urgency::Info);
    assert_eq!(second.point.time_ms, 25 * MINUTE);
    assert!(second.elapsed_ms - first.elapsed_ms >= 500);
    assert_eq!(fired_flags(&handle).await, vec![true, true]);

    let mut fired = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::PointFired { time_ms, .. } = event {
            fired.push(time_ms);
        }
    }
    assert_eq!(fired, vec![MINUTE, 25 * MINUTE]);

    // Each crossing is delivered once.
    sleep(Duration::from_secs(5)).await;
    assert!(alerts.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_pending_deliveries() {
    let (handle, mut alerts) = spawn_recording(MemorySettingsStore::new());
    for label in ["a", "b", "c"] {
        handle
            .add_point(PointDraft::new(MINUTE, label, Urgency::Warning))
            .await
            .unwrap();
    }
    handle.start().await.unwrap();
    advance(Duration::from_millis(MINUTE)).await;

    let first = alerts.recv().await.unwrap();
    assert_eq!(first.point.label, "a");

    let reset = handle.reset().await.unwrap();
    assert!(matches!(reset, Event::TimerReset { cancelled: 2, .. }));

    sleep(Duration::from_secs(5)).await;
    assert!(alerts.try_recv().is_err());
    match handle.snapshot().await.unwrap() {
        Event::StateSnapshot {
            status,
            elapsed_ms,
            pending_deliveries,
            ..
        } => {
            assert_eq!(status, TimerStatus::Stopped);
            assert_eq!(elapsed_ms, 0);
            assert_eq!(pending_deliveries, 0);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn preset_applied_mid_session_does_not_fire_retroactively() {
    let (handle, mut alerts) = spawn_recording(MemorySettingsStore::new());

    handle.apply_preset("30min").await.unwrap();
    assert_eq!(fired_flags(&handle).await, vec![false; 4]);

    // Nothing in the 90 minute preset is due in the first 26 minutes.
    handle.apply_preset("90min").await.unwrap();
    handle.start().await.unwrap();
    advance(Duration::from_millis(26 * MINUTE)).await;
    sleep(Duration::from_millis(500)).await;
    assert!(alerts.try_recv().is_err());

    let applied = handle.apply_preset("30min").await.unwrap();
    assert!(matches!(
        applied,
        Event::PresetApplied {
            point_count: 4,
            already_passed: 2,
            ..
        }
    ));
    assert_eq!(fired_flags(&handle).await, vec![true, true, false, false]);

    sleep(Duration::from_secs(2)).await;
    assert!(alerts.try_recv().is_err());

    // Later points still fire normally.
    advance(Duration::from_millis(3 * MINUTE)).await;
    let next = alerts.recv().await.unwrap();
    assert_eq!(next.point.time_ms, 29 * MINUTE);
    assert_eq!(next.point.label, "1 min left");
}

#[tokio::test(start_paused = true)]
async fn paused_timer_does_not_detect() {
    let (handle, mut alerts) = spawn_recording(MemorySettingsStore::new());
    handle
        .add_point(PointDraft::new(2 * MINUTE, "", Urgency::Info))
        .await
        .unwrap();
    handle.start().await.unwrap();
    advance(Duration::from_millis(MINUTE)).await;
    handle.pause().await.unwrap();
    assert_eq!(handle.status(), TimerStatus::Paused);

    advance(Duration::from_millis(10 * MINUTE)).await;
    sleep(Duration::from_secs(1)).await;
    assert!(alerts.try_recv().is_err());

    handle.start().await.unwrap();
    advance(Duration::from_millis(MINUTE)).await;
    let alert = alerts.recv().await.unwrap();
    assert_eq!(alert.point.time_ms, 2 * MINUTE);
    assert!(alert.elapsed_ms >= 2 * MINUTE);
}

#[tokio::test(start_paused = true)]
async fn alerts_carry_visibility_and_sound_preferences() {
    let (handle, mut alerts) = spawn_recording(MemorySettingsStore::new());
    handle.set_visibility(false).await.unwrap();
    let prefs = handle.set_sound(Some(true), Some(4.0)).await.unwrap();
    assert_eq!(prefs.volume, 1.0);

    handle
        .add_point(PointDraft::new(MINUTE, "ping", Urgency::Info))
        .await
        .unwrap();
    handle.start().await.unwrap();
    advance(Duration::from_millis(MINUTE + 250)).await;

    let alert = alerts.recv().await.unwrap();
    assert!(!alert.host_visible);
    assert!(alert.sound.enabled);
    assert_eq!(alert.sound.volume, 1.0);
}

#[tokio::test(start_paused = true)]
async fn edits_are_saved_after_debounce_and_restored() {
    let store = MemorySettingsStore::new();
    let (handle, _alerts) = spawn_recording(store.clone());

    handle
        .add_point(PointDraft::new(5 * MINUTE, "stretch", Urgency::Warning))
        .await
        .unwrap();
    assert_eq!(store.save_count(), 0);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(store.save_count(), 1);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.notification_points.len(), 1);
    assert_eq!(saved.notification_points[0].label, "stretch");
    assert_eq!(saved.active_preset_id.as_deref(), Some("custom"));

    handle.shutdown().await.unwrap();

    let (restored, _alerts) = spawn_recording(store.clone());
    let points = restored.points().await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].time_ms, 5 * MINUTE);
    assert!(!points[0].fired);
    let settings = restored.settings().await.unwrap();
    assert_eq!(settings.active_preset_id.as_deref(), Some("custom"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_pending_save() {
    let store = MemorySettingsStore::new();
    let (handle, _alerts) = spawn_recording(store.clone());
    handle.apply_preset("60min").await.unwrap();
    handle.shutdown().await.unwrap();

    assert_eq!(store.save_count(), 1);
    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.active_preset_id.as_deref(), Some("60min"));
    assert_eq!(saved.notification_points.len(), 4);

    assert!(matches!(
        handle.start().await,
        Err(CoreError::ServiceClosed)
    ));
}

#[tokio::test(start_paused = true)]
async fn rejected_edits_leave_points_untouched() {
    let (handle, _alerts) = spawn_recording(MemorySettingsStore::new());
    let err = handle
        .add_point(PointDraft::new(30_000, "too soon", Urgency::Info))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(handle.apply_preset("45min").await.is_err());
    assert!(handle.points().await.unwrap().is_empty());
}

#[test]
fn spawn_needs_a_runtime() {
    let result = service::spawn(
        &test_config(),
        Box::new(MemorySettingsStore::new()),
        Box::new(|_: &Alert| {}),
    );
    assert!(matches!(
        result,
        Err(CoreError::EnvironmentUnavailable { .. })
    ));
}
