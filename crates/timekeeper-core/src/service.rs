//! Async host for the [`Scheduler`].
//!
//! One tokio task owns the scheduler. Commands from [`ServiceHandle`]s,
//! ticks from the tick source, the staggered-delivery deadline and the
//! settings save deadline are all multiplexed by a single `select!`, so
//! everything that touches scheduler state runs one step at a time. A reset
//! handled in this loop can therefore never race a delivery.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::clock::MonotonicClock;
use crate::delivery::{Alert, Delivery, SoundPrefs};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::points::{NotificationPoint, PointDraft, PointPatch};
use crate::scheduler::Scheduler;
use crate::storage::{Config, Settings, SettingsStore, Theme};
use crate::ticker::{tick_channel, TickReceiver};
use crate::timer::TimerStatus;

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 64;

enum Command {
    Start {
        reply: oneshot::Sender<Option<Event>>,
    },
    Pause {
        reply: oneshot::Sender<Option<Event>>,
    },
    Reset {
        reply: oneshot::Sender<Event>,
    },
    AddPoint {
        draft: PointDraft,
        reply: oneshot::Sender<Result<Event>>,
    },
    UpdatePoint {
        id: Uuid,
        patch: PointPatch,
        reply: oneshot::Sender<Result<Event>>,
    },
    RemovePoint {
        id: Uuid,
        reply: oneshot::Sender<Result<Event>>,
    },
    ApplyPreset {
        id: String,
        reply: oneshot::Sender<Result<Event>>,
    },
    SetVisibility {
        visible: bool,
        reply: oneshot::Sender<Option<Event>>,
    },
    SetSound {
        enabled: Option<bool>,
        volume: Option<f64>,
        reply: oneshot::Sender<SoundPrefs>,
    },
    SetTheme {
        theme: Theme,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Event>,
    },
    GetPoints {
        reply: oneshot::Sender<Vec<NotificationPoint>>,
    },
    GetSettings {
        reply: oneshot::Sender<Settings>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to a running scheduler service.
#[derive(Clone)]
pub struct ServiceHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<TimerStatus>,
    points: watch::Receiver<Vec<NotificationPoint>>,
    events: broadcast::Sender<Event>,
}

/// Spawn the scheduler service on the current tokio runtime.
///
/// Settings are read from `store` once at startup; edits are written back
/// after the configured debounce and on shutdown. Every fired point goes
/// to `delivery`.
///
/// # Errors
/// Returns [`CoreError::EnvironmentUnavailable`] outside a tokio runtime.
pub fn spawn(
    config: &Config,
    store: Box<dyn SettingsStore>,
    delivery: Box<dyn Delivery>,
) -> Result<ServiceHandle> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| CoreError::environment("async runtime", e.to_string()))?;

    let clock = MonotonicClock::new();
    let origin = clock.origin();
    let (tick_tx, tick_rx) = tick_channel();
    let ticker = config.scheduler.ticker.build(config.tick_interval(), tick_tx);
    let mut scheduler = Scheduler::new(clock, ticker, config.scheduler.stagger_ms);

    let settings = Settings::load_or_default(store.as_ref());
    scheduler.load_settings(&settings);
    tracing::info!(
        points = settings.notification_points.len(),
        preset = ?settings.active_preset_id,
        "scheduler service starting"
    );

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let handle = ServiceHandle {
        commands: command_tx,
        status: scheduler.subscribe_status(),
        points: scheduler.subscribe_points(),
        events: events.clone(),
    };

    let worker = Worker {
        scheduler,
        settings,
        store,
        delivery,
        events,
        origin,
        debounce: config.debounce(),
        save_at: None,
    };
    runtime.spawn(worker.run(command_rx, tick_rx));
    Ok(handle)
}

impl ServiceHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| CoreError::ServiceClosed)?;
        response.await.map_err(|_| CoreError::ServiceClosed)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TimerStatus> {
        self.status.clone()
    }

    pub fn subscribe_points(&self) -> watch::Receiver<Vec<NotificationPoint>> {
        self.points.clone()
    }

    /// Every event the service emits, including `PointFired`.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Result<Event> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn points(&self) -> Result<Vec<NotificationPoint>> {
        self.request(|reply| Command::GetPoints { reply }).await
    }

    pub async fn settings(&self) -> Result<Settings> {
        self.request(|reply| Command::GetSettings { reply }).await
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn start(&self) -> Result<Option<Event>> {
        self.request(|reply| Command::Start { reply }).await
    }

    pub async fn pause(&self) -> Result<Option<Event>> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn reset(&self) -> Result<Event> {
        self.request(|reply| Command::Reset { reply }).await
    }

    pub async fn add_point(&self, draft: PointDraft) -> Result<Event> {
        self.request(|reply| Command::AddPoint { draft, reply }).await?
    }

    pub async fn update_point(&self, id: Uuid, patch: PointPatch) -> Result<Event> {
        self.request(|reply| Command::UpdatePoint { id, patch, reply }).await?
    }

    pub async fn remove_point(&self, id: Uuid) -> Result<Event> {
        self.request(|reply| Command::RemovePoint { id, reply }).await?
    }

    pub async fn apply_preset(&self, id: impl Into<String>) -> Result<Event> {
        let id = id.into();
        self.request(|reply| Command::ApplyPreset { id, reply }).await?
    }

    pub async fn set_visibility(&self, visible: bool) -> Result<Option<Event>> {
        self.request(|reply| Command::SetVisibility { visible, reply }).await
    }

    /// Update sound preferences. The volume is clamped to `0.0..=1.0`.
    pub async fn set_sound(
        &self,
        enabled: Option<bool>,
        volume: Option<f64>,
    ) -> Result<SoundPrefs> {
        self.request(|reply| Command::SetSound {
            enabled,
            volume,
            reply,
        })
        .await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.request(|reply| Command::SetTheme { theme, reply }).await
    }

    /// Stop ticking, flush pending settings and end the service task.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

struct Worker {
    scheduler: Scheduler<MonotonicClock>,
    settings: Settings,
    store: Box<dyn SettingsStore>,
    delivery: Box<dyn Delivery>,
    events: broadcast::Sender<Event>,
    origin: Instant,
    debounce: Duration,
    save_at: Option<Instant>,
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut ticks: TickReceiver) {
        let mut shutdown_reply = None;
        loop {
            let drain_at = self
                .scheduler
                .next_delivery_at()
                .map(|ms| self.origin + Duration::from_millis(ms));

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(command) => self.handle(command),
                    // Every handle dropped.
                    None => break,
                },
                Some(tick) = ticks.recv() => {
                    tracing::trace!(seq = tick.seq, source = ?tick.source, "tick");
                    if let Some(event) = self.scheduler.on_tick() {
                        self.emit(event);
                    }
                }
                _ = deadline(drain_at) => {}
                _ = deadline(self.save_at) => self.flush(),
            }

            self.drain();
        }

        self.scheduler.shutdown();
        if self.save_at.is_some() {
            self.flush();
        }
        tracing::info!("scheduler service stopped");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start { reply } => {
                let event = self.scheduler.start();
                self.emit_opt(&event);
                let _ = reply.send(event);
            }
            Command::Pause { reply } => {
                let event = self.scheduler.pause();
                self.emit_opt(&event);
                let _ = reply.send(event);
            }
            Command::Reset { reply } => {
                let event = self.scheduler.reset();
                self.emit(event.clone());
                let _ = reply.send(event);
            }
            Command::AddPoint { draft, reply } => {
                let result = self.scheduler.add_point(draft);
                self.after_edit(&result);
                let _ = reply.send(result);
            }
            Command::UpdatePoint { id, patch, reply } => {
                let result = self.scheduler.update_point(id, patch);
                self.after_edit(&result);
                let _ = reply.send(result);
            }
            Command::RemovePoint { id, reply } => {
                let result = self.scheduler.remove_point(id);
                self.after_edit(&result);
                let _ = reply.send(result);
            }
            Command::ApplyPreset { id, reply } => {
                let result = self.scheduler.apply_preset_id(&id);
                self.after_edit(&result);
                let _ = reply.send(result);
            }
            Command::SetVisibility { visible, reply } => {
                let event = self.scheduler.set_visibility(visible);
                self.emit_opt(&event);
                let _ = reply.send(event);
            }
            Command::SetSound {
                enabled,
                volume,
                reply,
            } => {
                self.settings.set_sound(enabled, volume);
                self.schedule_save();
                let _ = reply.send(self.settings.sound_prefs());
            }
            Command::SetTheme { theme, reply } => {
                self.settings.theme = theme;
                self.schedule_save();
                let _ = reply.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.scheduler.snapshot());
            }
            Command::GetPoints { reply } => {
                let _ = reply.send(self.scheduler.points().to_vec());
            }
            Command::GetSettings { reply } => {
                self.sync_settings();
                let _ = reply.send(self.settings.clone());
            }
            // Handled by the run loop.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Hand every point that is due to the delivery sink.
    fn drain(&mut self) {
        while let Some(point) = self.scheduler.poll_delivery() {
            let alert = Alert {
                elapsed_ms: self.scheduler.elapsed_ms(),
                host_visible: self.scheduler.host_visible(),
                sound: self.settings.sound_prefs(),
                point,
            };
            self.delivery.deliver(&alert);
            let point = alert.point;
            self.emit(Event::PointFired {
                point_id: point.id,
                time_ms: point.time_ms,
                label: point.label,
                urgency: point.urgency,
                at: Utc::now(),
            });
        }
    }

    fn after_edit(&mut self, result: &Result<Event>) {
        match result {
            Ok(event) => {
                self.emit(event.clone());
                self.schedule_save();
            }
            Err(err) => tracing::debug!(error = %err, "edit rejected"),
        }
    }

    fn emit(&self, event: Event) {
        tracing::debug!(event = event.kind(), "event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_opt(&self, event: &Option<Event>) {
        if let Some(event) = event {
            self.emit(event.clone());
        }
    }

    fn schedule_save(&mut self) {
        self.save_at = Some(Instant::now() + self.debounce);
    }

    fn sync_settings(&mut self) {
        self.settings.notification_points = self.scheduler.points().to_vec();
        self.settings.active_preset_id = self.scheduler.active_preset_id().map(str::to_string);
    }

    fn flush(&mut self) {
        self.save_at = None;
        self.sync_settings();
        if let Err(err) = self.store.save(&self.settings) {
            tracing::warn!(error = %err, "failed to save settings");
        }
    }
}
