//! Notification scheduler.
//!
//! Owns the timer state, the point store and the delivery queue, and drives
//! the tick source's lifecycle from timer transitions. It is a plain
//! single-threaded state machine: the caller feeds it ticks and commands
//! one at a time and polls it for deliveries. Time comes from the injected
//! [`Clock`], so tests can step it deterministically.
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = Scheduler::new(clock, Box::new(ticker), DEFAULT_STAGGER_MS);
//! scheduler.start();
//! // Each tick:
//! scheduler.on_tick();
//! while let Some(point) = scheduler.poll_delivery() { /* alert */ }
//! ```

use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::points::{NotificationPoint, PointDraft, PointPatch, PointStore};
use crate::presets::{find_preset, Preset, CUSTOM_PRESET_ID};
use crate::queue::DeliveryQueue;
use crate::storage::Settings;
use crate::ticker::{Ticker, TickerKind};
use crate::timer::{StartKind, TimerState, TimerStatus};

pub struct Scheduler<C: Clock> {
    clock: C,
    timer: TimerState,
    points: PointStore,
    queue: DeliveryQueue,
    ticker: Box<dyn Ticker>,
    active_preset_id: Option<String>,
    host_visible: bool,
    status_tx: watch::Sender<TimerStatus>,
    points_tx: watch::Sender<Vec<NotificationPoint>>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, ticker: Box<dyn Ticker>, stagger_ms: u64) -> Self {
        let (status_tx, _) = watch::channel(TimerStatus::Stopped);
        let (points_tx, _) = watch::channel(Vec::new());
        Self {
            clock,
            timer: TimerState::new(),
            points: PointStore::new(),
            queue: DeliveryQueue::new(stagger_ms),
            ticker,
            active_preset_id: None,
            host_visible: true,
            status_tx,
            points_tx,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.timer.status()
    }

    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.timer.elapsed_ms(self.clock.now_ms())
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn points(&self) -> &[NotificationPoint] {
        self.points.list()
    }

    pub fn active_preset_id(&self) -> Option<&str> {
        self.active_preset_id.as_deref()
    }

    pub fn host_visible(&self) -> bool {
        self.host_visible
    }

    pub fn pending_deliveries(&self) -> usize {
        self.queue.len()
    }

    /// Clock reading at which the next staggered delivery is due, if the
    /// drain timer is armed.
    pub fn next_delivery_at(&self) -> Option<u64> {
        self.queue.next_pop_at()
    }

    pub fn ticker_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn ticker_kind(&self) -> TickerKind {
        self.ticker.kind()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TimerStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_points(&self) -> watch::Receiver<Vec<NotificationPoint>> {
        self.points_tx.subscribe()
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            status: self.status(),
            elapsed_ms: self.elapsed_ms(),
            pending_deliveries: self.queue.len(),
            active_preset_id: self.active_preset_id.clone(),
            at: Utc::now(),
        }
    }

    // ── Timer commands ───────────────────────────────────────────────

    /// Fresh start from Stopped, resume from Paused, no-op when Running.
    pub fn start(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let event = match self.timer.start(now)? {
            StartKind::Fresh => {
                self.points.reset_fired();
                self.publish_points();
                Event::TimerStarted { at: Utc::now() }
            }
            StartKind::Resume { elapsed_ms } => Event::TimerResumed {
                elapsed_ms,
                at: Utc::now(),
            },
        };
        if let Err(err) = self.ticker.start() {
            // Detection still runs on visibility recovery and host ticks.
            tracing::warn!(error = %err, "tick source failed to start");
        }
        self.publish_status();
        tracing::debug!(event = event.kind(), ticker = ?self.ticker.kind(), "timer running");
        Some(event)
    }

    /// Freeze elapsed time and stop ticking. Queued deliveries keep draining.
    pub fn pause(&mut self) -> Option<Event> {
        let elapsed_ms = self.timer.pause(self.clock.now_ms())?;
        self.ticker.stop();
        self.publish_status();
        tracing::debug!(elapsed_ms, "timer paused");
        Some(Event::TimerPaused {
            elapsed_ms,
            at: Utc::now(),
        })
    }

    /// Back to zero. Cancels every queued delivery.
    pub fn reset(&mut self) -> Event {
        let previous = self.timer.reset();
        self.ticker.stop();
        let cancelled = self.queue.clear();
        self.points.reset_fired();
        self.publish_points();
        self.publish_status();
        tracing::debug!(from = previous.as_str(), cancelled, "timer reset");
        Event::TimerReset {
            cancelled,
            at: Utc::now(),
        }
    }

    // ── Detection ────────────────────────────────────────────────────

    /// Handle one tick. Ticks that arrive while not running are ignored.
    pub fn on_tick(&mut self) -> Option<Event> {
        if !self.timer.is_running() {
            return None;
        }
        self.detect()
    }

    /// Record host visibility. Coming back into view while running
    /// triggers an immediate catch-up detection, since ticks may have been
    /// throttled or suspended while hidden.
    pub fn set_visibility(&mut self, visible: bool) -> Option<Event> {
        let recovered = visible && !self.host_visible;
        self.host_visible = visible;
        if recovered && self.timer.is_running() {
            tracing::debug!("visibility recovered, catching up");
            return self.detect();
        }
        None
    }

    fn detect(&mut self) -> Option<Event> {
        let elapsed_ms = self.elapsed_ms();
        // Already sorted by time_ms.
        let batch = self.points.mark_due(elapsed_ms);
        if batch.is_empty() {
            return None;
        }
        let point_ids: Vec<Uuid> = batch.iter().map(|p| p.id).collect();
        tracing::debug!(elapsed_ms, count = batch.len(), "points crossed");
        self.queue.extend(batch);
        self.publish_points();
        Some(Event::PointsDetected {
            elapsed_ms,
            point_ids,
            at: Utc::now(),
        })
    }

    /// Next point to deliver, honouring the stagger gap.
    pub fn poll_delivery(&mut self) -> Option<NotificationPoint> {
        self.queue.poll(self.clock.now_ms())
    }

    // ── Point commands ───────────────────────────────────────────────

    pub fn add_point(&mut self, draft: PointDraft) -> Result<Event> {
        let running_elapsed = self.running_elapsed();
        let point = self.points.add(draft, running_elapsed)?;
        self.mark_custom();
        self.publish_points();
        Ok(Event::PointAdded {
            point_id: point.id,
            time_ms: point.time_ms,
            fired: point.fired,
            at: Utc::now(),
        })
    }

    pub fn update_point(&mut self, id: Uuid, patch: PointPatch) -> Result<Event> {
        let running_elapsed = self.running_elapsed();
        let point = self.points.update(id, patch, running_elapsed)?;
        self.mark_custom();
        self.publish_points();
        Ok(Event::PointUpdated {
            point_id: point.id,
            time_ms: point.time_ms,
            fired: point.fired,
            at: Utc::now(),
        })
    }

    pub fn remove_point(&mut self, id: Uuid) -> Result<Event> {
        let point = self.points.remove(id)?;
        self.mark_custom();
        self.publish_points();
        Ok(Event::PointRemoved {
            point_id: point.id,
            at: Utc::now(),
        })
    }

    /// Replace every point with the preset's templates. Points the running
    /// timer has already passed are pre-marked fired and never delivered.
    /// The custom preset keeps the current points.
    pub fn apply_preset(&mut self, preset: &Preset) -> Event {
        let (point_count, already_passed) = if preset.is_custom() {
            (self.points.len(), 0)
        } else {
            let running_elapsed = self.running_elapsed();
            let passed = self.points.replace_all(preset.instantiate(), running_elapsed);
            self.publish_points();
            (self.points.len(), passed)
        };
        self.active_preset_id = Some(preset.id.clone());
        tracing::debug!(preset = %preset.id, point_count, already_passed, "preset applied");
        Event::PresetApplied {
            preset_id: preset.id.clone(),
            point_count,
            already_passed,
            at: Utc::now(),
        }
    }

    pub fn apply_preset_id(&mut self, id: &str) -> Result<Event> {
        let preset = find_preset(id)?;
        Ok(self.apply_preset(&preset))
    }

    /// Install persisted points and the active preset id.
    pub fn load_settings(&mut self, settings: &Settings) {
        let running_elapsed = self.running_elapsed();
        self.points
            .replace_all(settings.notification_points.clone(), running_elapsed);
        self.active_preset_id = settings.active_preset_id.clone();
        self.publish_points();
    }

    /// Stop the tick source for good. Used when the owner shuts down.
    pub fn shutdown(&mut self) {
        self.ticker.stop();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn running_elapsed(&self) -> Option<u64> {
        self.timer.is_running().then(|| self.elapsed_ms())
    }

    fn mark_custom(&mut self) {
        self.active_preset_id = Some(CUSTOM_PRESET_ID.to_string());
    }

    fn publish_status(&self) {
        let status = self.timer.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn publish_points(&self) {
        self.points_tx.send_replace(self.points.list().to_vec());
    }
}
