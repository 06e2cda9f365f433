//! Alert delivery: what happens when a point leaves the queue.
//!
//! The scheduler hands each fired point to a [`Delivery`] sink exactly once.
//! [`AlertDispatcher`] is the stock sink: it plays a sound when enabled and
//! posts an OS notification only while the host surface is hidden.

use std::io::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::points::{NotificationPoint, Urgency};
use crate::timer::format_offset;

/// How long non-urgent OS notifications stay up.
pub const AUTO_CLOSE_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundPrefs {
    pub enabled: bool,
    /// 0.0 ..= 1.0
    pub volume: f64,
}

impl Default for SoundPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.7,
        }
    }
}

/// A fired point plus the context a sink needs to decide how to present it.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub point: NotificationPoint,
    pub elapsed_ms: u64,
    /// Whether the host surface is focused/visible right now.
    pub host_visible: bool,
    pub sound: SoundPrefs,
}

/// Receives every fired point, one call per crossing.
pub trait Delivery: Send {
    fn deliver(&mut self, alert: &Alert);
}

impl<F> Delivery for F
where
    F: FnMut(&Alert) + Send,
{
    fn deliver(&mut self, alert: &Alert) {
        (self)(alert)
    }
}

pub trait SoundPlayer: Send {
    fn play(&mut self, urgency: Urgency, volume: f64) -> Result<()>;
}

pub trait Notifier: Send {
    fn notify(&mut self, notification: &OsNotification) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsNotification {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification for the same point.
    pub tag: String,
    pub require_interaction: bool,
    pub auto_close: Option<Duration>,
}

impl OsNotification {
    pub fn for_point(point: &NotificationPoint) -> Self {
        let time = format_offset(point.time_ms);
        let body = if point.label.is_empty() {
            format!("Timer reached {time}")
        } else {
            format!("{} ({time})", point.label)
        };
        let urgent = point.urgency == Urgency::Urgent;
        Self {
            title: format!("Timekeeper - {}", point.urgency.title()),
            body,
            tag: format!("timekeeper-{}", point.id),
            require_interaction: urgent,
            auto_close: (!urgent).then_some(AUTO_CLOSE_AFTER),
        }
    }
}

pub struct AlertDispatcher {
    sound: Option<Box<dyn SoundPlayer>>,
    notifier: Option<Box<dyn Notifier>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self {
            sound: None,
            notifier: None,
        }
    }

    pub fn with_sound(mut self, player: impl SoundPlayer + 'static) -> Self {
        self.sound = Some(Box::new(player));
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Delivery for AlertDispatcher {
    fn deliver(&mut self, alert: &Alert) {
        let point = &alert.point;
        tracing::info!(
            point_id = %point.id,
            time_ms = point.time_ms,
            urgency = %point.urgency,
            label = %point.label,
            "notification point fired"
        );

        if alert.sound.enabled {
            if let Some(player) = self.sound.as_mut() {
                if let Err(err) = player.play(point.urgency, alert.sound.volume) {
                    tracing::warn!(error = %err, "sound playback failed");
                }
            }
        }

        if alert.host_visible {
            return;
        }
        if let Some(notifier) = self.notifier.as_mut() {
            match notifier.notify(&OsNotification::for_point(point)) {
                Ok(()) => {}
                Err(CoreError::EnvironmentUnavailable { .. }) => {
                    tracing::debug!("os notifications unavailable, skipped");
                }
                Err(err) => tracing::warn!(error = %err, "os notification failed"),
            }
        }
    }
}

/// Rings the terminal bell: once for info, twice for warning, three times
/// for urgent. Silent at zero volume.
pub struct TerminalBell<W: Write + Send> {
    out: W,
}

impl TerminalBell<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            out: std::io::stderr(),
        }
    }
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> SoundPlayer for TerminalBell<W> {
    fn play(&mut self, urgency: Urgency, volume: f64) -> Result<()> {
        if volume <= 0.0 {
            return Ok(());
        }
        let rings = match urgency {
            Urgency::Info => 1,
            Urgency::Warning => 2,
            Urgency::Urgent => 3,
        };
        self.out.write_all("\x07".repeat(rings).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Writes notifications to the log instead of the desktop.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notification: &OsNotification) -> Result<()> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            require_interaction = notification.require_interaction,
            "notification"
        );
        Ok(())
    }
}

/// Desktop notifications through the platform notification service.
#[cfg(feature = "desktop-notifications")]
#[derive(Debug, Default)]
pub struct DesktopNotifier;

#[cfg(feature = "desktop-notifications")]
impl Notifier for DesktopNotifier {
    fn notify(&mut self, notification: &OsNotification) -> Result<()> {
        let mut native = notify_rust::Notification::new();
        native
            .appname("Timekeeper")
            .summary(&notification.title)
            .body(&notification.body);
        if notification.require_interaction {
            native.timeout(notify_rust::Timeout::Never);
        } else if let Some(after) = notification.auto_close {
            native.timeout(notify_rust::Timeout::Milliseconds(after.as_millis() as u32));
        }
        native
            .show()
            .map(|_| ())
            .map_err(|e| CoreError::environment("os notifications", e.to_string()))
    }
}
